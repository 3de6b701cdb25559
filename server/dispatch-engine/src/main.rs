//! Binary entrypoint: read operator commands as JSON lines from stdin, write
//! JSON lines to stdout.
//!
//! Each input line is a `Command`. Output lines are either:
//! - the command's result (record, listing, summary)
//! - an ErrorOutput (when the line is unparsable or the engine rejects it)
//! - an EventOutput for every bus notification, including scheduler sweeps
//!
//! Logs go to stderr; set RUST_LOG to adjust verbosity.

use std::io::{self, Write};
use std::sync::Arc;

use dispatch_engine::command::{self, Command, ErrorOutput, EventOutput};
use dispatch_engine::{Config, Engine, EscalationScheduler, Event};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn write_line<T: serde::Serialize>(out: &mut impl Write, value: &T) {
  let _ = serde_json::to_writer(&mut *out, value);
  let _ = writeln!(out);
}

fn write_event(out: &mut impl Write, event: &Event) {
  write_line(out, &EventOutput { event });
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let config = match Config::from_env() {
    Ok(c) => c,
    Err(e) => {
      error!("invalid configuration: {}", e);
      std::process::exit(2);
    }
  };

  let engine = Arc::new(Engine::new(config));
  let mut events = engine.subscribe();
  let scheduler = match EscalationScheduler::spawn(engine.clone()) {
    Ok(h) => h,
    Err(e) => {
      error!("cannot start escalation scheduler: {}", e);
      std::process::exit(2);
    }
  };
  info!("dispatch-engine ready, reading commands from stdin");

  let mut out = io::BufWriter::new(io::stdout());
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    tokio::select! {
      line = lines.next_line() => {
        let line = match line {
          Ok(Some(l)) => l,
          Ok(None) => break,
          Err(e) => {
            error!("read error: {}", e);
            break;
          }
        };

        // Skip blank lines.
        let trimmed = line.trim();
        if trimmed.is_empty() {
          continue;
        }

        let result = Command::parse(trimmed).and_then(|cmd| command::execute(&engine, cmd));

        // Events the command produced go out before its result.
        while let Ok(event) = events.try_recv() {
          write_event(&mut out, &event);
        }
        match result {
          Ok(value) => write_line(&mut out, &value),
          Err(e) => write_line(&mut out, &ErrorOutput::from(&e)),
        }
        let _ = out.flush();
      }
      Some(event) = events.recv() => {
        write_event(&mut out, &event);
        let _ = out.flush();
      }
    }
  }

  let sweeps = scheduler.shutdown().await;
  while let Ok(event) = events.try_recv() {
    write_event(&mut out, &event);
  }
  let _ = out.flush();
  info!(sweeps, "dispatch-engine shut down");
}
