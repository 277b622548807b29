// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! `copiloto` - a hands-free route copilot.
//!
//! While scanning, this application periodically asks a grounded language
//! model for the nearest fuel stop on the route ahead, together with traffic
//! and weather on their own slower schedules, and narrates whatever needs the
//! driver's attention. Voice-style commands arrive as transcripts on stdin.

mod app_core;
mod model;
mod nodes;
mod query;
mod scan;

use app_core::AppCore;

use eyre::Result;
use tokio::{signal, sync::mpsc};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


#[derive(Debug)]
enum ShutdownCause {
  AppStopped,
  AppFailed,
  CtrlC,
}


#[tokio::main]
async fn main() -> Result<()> {
  setup()?;
  info!("logging and tracing setup complete, copiloto starting up");

  // this channel is used by service tasks communicate back to main
  let (tx, mut rx) = mpsc::unbounded_channel();

  info!("Ctrl+C listener starting up...");
  let main_tx = tx.clone();
  tokio::spawn(async move {
    if let Err(e) = signal::ctrl_c().await {
      error!("unable to listen for Ctrl+C event: {}", e);
      return;
    }

    info!("received Ctrl+C signal");
    if let Err(e) = main_tx.send(ShutdownCause::CtrlC) {
      error!("unable to inform copiloto main task: {}", e);
    }
  });

  info!("reading command line arguments and config file...");
  let app_core = AppCore::init()?;
  info!(?app_core);

  let main_tx = tx.clone();
  let app_task = tokio::spawn(async move {
    let cause = match app_core.run().await {
      Ok(()) => {
        info!("copiloto has stopped");
        ShutdownCause::AppStopped
      }
      Err(e) => {
        error!("copiloto failed: {:#}", e);
        ShutdownCause::AppFailed
      }
    };
    if let Err(e) = main_tx.send(cause) {
      error!("unable to inform copiloto main task: {}", e);
    }
  });

  info!("copiloto up and running!");
  match rx.recv().await {
    Some(ShutdownCause::AppStopped) => (),
    Some(ShutdownCause::AppFailed) => eyre::bail!("copiloto shut down on error"),
    Some(ShutdownCause::CtrlC) | None => app_task.abort(),
  }

  info!("copiloto has shut down");
  Ok(())
}

/// Initalizes backtracing and error handling capabilities and sets up the
/// tracing infrastructure for outputting logs from all components. Logs go to
/// stderr so they do not interleave with the dashboard and narration.
fn setup() -> Result<()> {
  // set up eyre with colors
  const BT_ENVVAR: &str = "RUST_LIB_BACKTRACE";
  if std::env::var(BT_ENVVAR).is_err() {
    std::env::set_var(BT_ENVVAR, "1")
  }
  color_eyre::install()?;

  // set up format layer with filtering for tracing
  const LG_ENVVAR: &str = "RUST_LOG";
  if std::env::var(LG_ENVVAR).is_err() {
    std::env::set_var(LG_ENVVAR, "info")
  }
  let format_layer = fmt::layer().with_writer(std::io::stderr)
                                 .with_filter(EnvFilter::from_default_env());

  tracing_subscriber::registry().with(format_layer).init();

  Ok(())
}

// fin --------------------------------------------------------------------- //
