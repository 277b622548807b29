// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::{settings::SettingsStore, util};
use crate::{model::SearchPreferences,
            nodes::{CommandFeed, Control, Dashboard, Input, NarrationSink,
                    TerminalNarrator, TrackReplay},
            query::GeminiClient,
            scan::{CommandRouter, CycleTiming, ScanOrchestrator}};

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::{fs, path::PathBuf, sync::Arc};
use tokio::{io, sync::mpsc};
use tracing::{error, info, warn};


#[derive(Debug, Deserialize)]
/// Deserialized from config file. Initializes core elements of `copiloto`.
pub struct AppCore {
  #[serde(default)]
  cycle:         CycleTiming,
  #[serde(default)]
  query:         GeminiClient,
  position:      TrackReplay,
  #[serde(default)]
  narration:     TerminalNarrator,
  #[serde(default)]
  commands:      CommandFeed,
  #[serde(default)]
  dashboard:     Dashboard,
  #[serde(default)]
  preferences:   SearchPreferences,
  #[serde(skip)]
  settings_path: Option<PathBuf>,
}

impl AppCore {
  /// Method does not require parameters; options are taken from command line,
  /// parameters are parsed from a (required) config file.
  pub fn init() -> Result<Self> {
    let args = util::CommandLineArgs::parse();
    let config = fs::read_to_string(&args.config_path).wrap_err_with(|| {
                   format!("unable to read config file {}", args.config_path)
                 })?;

    let mut app_core: Self = toml::from_str(&config)?;
    app_core.settings_path = args.settings_path.map(PathBuf::from);

    Ok(app_core)
  }

  /// Runs the application until the user quits or the input feed ends.
  /// Consumes the `AppCore` object.
  pub async fn run(self) -> Result<()> {
    // decompose self into contained handles
    let Self { cycle,
               query,
               position,
               narration,
               mut commands,
               dashboard,
               preferences,
               settings_path, } = self;

    let settings_path =
      settings_path.or_else(SettingsStore::default_path)
                   .ok_or_else(|| eyre!("no location for settings available"))?;
    let settings = SettingsStore::load(settings_path, preferences)?;

    info!("starting position task...");
    let position_handle = position.handle();
    let position_task = tokio::spawn(async move {
      if let Err(e) = position.run().await {
        error!("position replay stopped: {:#}", e);
      }
    });

    let narrator = Arc::new(narration);
    let query = Arc::new(query.init(settings.api_key())?);
    let orchestrator = ScanOrchestrator::new(cycle,
                                             settings.preferences(),
                                             Arc::new(position_handle.clone()),
                                             query,
                                             narrator.clone());
    let router = CommandRouter::new(orchestrator.clone());
    let preferences_task =
      tokio::spawn(orchestrator.clone().follow_preferences());

    info!("starting dashboard task...");
    let listening = commands.initialize();
    let snapshots = orchestrator.subscribe();
    let dashboard_task = tokio::spawn(async move {
      if let Err(e) = dashboard.run(snapshots, position_handle, listening).await
      {
        error!("dashboard stopped: {:#}", e);
      }
    });

    info!("starting command feed...");
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    let commands_task = tokio::spawn(async move {
      if let Err(e) = commands.run(io::stdin, input_tx).await {
        error!("command feed stopped: {:#}", e);
      }
    });

    info!("copiloto ready, type ':scan' to start or talk to it");
    while let Some(input) = input_rx.recv().await {
      let keep_running = match input {
        Input::Transcript(phrase) => {
          router.route(&phrase).await;
          true
        }
        Input::Control(control) => {
          handle_control(control, &settings, &orchestrator).await
        }
      };
      if !keep_running {
        break;
      }
    }

    // wind down the loop before the tasks feeding it go away
    info!("input finished, stopping all tasks...");
    orchestrator.stop().await;
    narrator.cancel();
    preferences_task.abort();
    commands_task.abort();
    dashboard_task.abort();
    position_task.abort();

    Ok(())
  }
}

/// Applies one keyboard control. Returns `false` when the application should
/// quit. Settings errors are reported and otherwise ignored.
async fn handle_control(control: Control,
                        settings: &SettingsStore,
                        orchestrator: &ScanOrchestrator)
                        -> bool {
  let outcome = match control {
    Control::ToggleScan => {
      if orchestrator.is_scanning().await {
        orchestrator.stop().await;
      } else {
        orchestrator.start().await;
      }
      Ok(())
    }
    Control::ToggleExtended => {
      orchestrator.toggle_extended_search().await;
      Ok(())
    }
    Control::ForceSync => {
      orchestrator.force_sync().await;
      Ok(())
    }
    // handled inside the feed, nothing left to do here
    Control::ToggleVoice => Ok(()),
    Control::ToggleDisplay => {
      orchestrator.toggle_display_mode().await;
      Ok(())
    }
    Control::Emergency => {
      orchestrator.trigger_emergency().await;
      Ok(())
    }
    Control::Destination(destination) => settings.set_destination(&destination),
    Control::ApiKey(api_key) => settings.set_api_key(&api_key),
    Control::Set { key, value } => settings.apply(&key, &value),
    Control::Quit => return false,
  };

  if let Err(e) = outcome {
    warn!("control rejected: {:#}", e);
  }
  true
}

// fin --------------------------------------------------------------------- //
