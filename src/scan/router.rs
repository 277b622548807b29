// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::ScanOrchestrator;

use tracing::{debug, info};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceCommand {
  Start,
  Stop,
  ForceTraffic,
  ToggleDisplay,
  Emergency,
}

/// Keywords per command, in matching priority.
const LEXICON: &[(VoiceCommand, &[&str])] =
  &[(VoiceCommand::Start, &["copiloto", "iniciar"]),
    (VoiceCommand::Stop, &["parar", "detener"]),
    (VoiceCommand::ForceTraffic, &["tráfico"]),
    (VoiceCommand::ToggleDisplay, &["hud", "pantalla"]),
    (VoiceCommand::Emergency, &["ayuda", "emergencia"])];

impl VoiceCommand {
  /// First command with a keyword contained in the phrase, ignoring case.
  pub fn parse(phrase: &str) -> Option<Self> {
    let phrase = phrase.to_lowercase();
    LEXICON.iter()
           .find(|(_, keywords)| keywords.iter().any(|k| phrase.contains(k)))
           .map(|(command, _)| *command)
  }
}


#[derive(Clone, Debug)]
/// Maps recognized phrases onto [`ScanOrchestrator`] operations.
pub struct CommandRouter {
  orchestrator: ScanOrchestrator,
}

impl CommandRouter {
  pub fn new(orchestrator: ScanOrchestrator) -> Self {
    Self { orchestrator }
  }

  /// Routes one phrase. Returns the matched command, even when its gate
  /// (start only while idle, stop only while scanning) turned it into a
  /// no-op. Unmatched phrases are dropped.
  pub async fn route(&self, phrase: &str) -> Option<VoiceCommand> {
    let command = match VoiceCommand::parse(phrase) {
      Some(command) => command,
      None => {
        debug!(phrase, "no command recognized");
        return None;
      }
    };
    info!(phrase, ?command, "voice command");

    match command {
      VoiceCommand::Start => {
        if !self.orchestrator.is_scanning().await {
          self.orchestrator.start().await;
        }
      }
      VoiceCommand::Stop => {
        if self.orchestrator.is_scanning().await {
          self.orchestrator.stop().await;
        }
      }
      VoiceCommand::ForceTraffic => self.orchestrator.force_traffic_scan().await,
      VoiceCommand::ToggleDisplay => {
        self.orchestrator.toggle_display_mode().await
      }
      VoiceCommand::Emergency => {
        // narration of the outcome happens on the spawned task
        let _ = self.orchestrator.trigger_emergency().await;
      }
    }
    Some(command)
  }
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::{CommandRouter, VoiceCommand};
  use crate::{model::SearchPreferences,
              scan::{cadence::CycleTiming,
                     session::{DisplayMode, ScanStatus},
                     testing::{FakePosition, RecordingNarrator,
                               ScriptedQuery},
                     ScanOrchestrator}};

  use pretty_assertions::assert_eq;
  use std::{sync::Arc, time::Duration};
  use tokio::{sync::watch, time};


  fn router() -> (CommandRouter, Arc<RecordingNarrator>, Arc<ScriptedQuery>) {
    let narrator = Arc::new(RecordingNarrator::default());
    let query = Arc::new(ScriptedQuery::new());
    let (_, prefs_rx) = watch::channel(SearchPreferences::default());
    let orchestrator = ScanOrchestrator::new(CycleTiming::default(),
                                             prefs_rx,
                                             Arc::new(FakePosition::with_fix()),
                                             query.clone(),
                                             narrator.clone());

    (CommandRouter::new(orchestrator), narrator, query)
  }

  #[test]
  fn parse_test() {
    assert_eq!(VoiceCommand::parse("oye copiloto"), Some(VoiceCommand::Start));
    assert_eq!(VoiceCommand::parse("iniciar ruta"), Some(VoiceCommand::Start));
    assert_eq!(VoiceCommand::parse("detener"), Some(VoiceCommand::Stop));
    assert_eq!(VoiceCommand::parse("¿cómo está el tráfico?"),
               Some(VoiceCommand::ForceTraffic));
    assert_eq!(VoiceCommand::parse("cambia la pantalla"),
               Some(VoiceCommand::ToggleDisplay));
    assert_eq!(VoiceCommand::parse("modo hud"),
               Some(VoiceCommand::ToggleDisplay));
    assert_eq!(VoiceCommand::parse("necesito ayuda"),
               Some(VoiceCommand::Emergency));
    assert_eq!(VoiceCommand::parse("pon música"), None);
    assert_eq!(VoiceCommand::parse(""), None);
  }

  #[test]
  fn parse_priority_test() {
    assert_eq!(VoiceCommand::parse("ayuda para iniciar el tráfico"),
               Some(VoiceCommand::Start));
    assert_eq!(VoiceCommand::parse("parar el tráfico"),
               Some(VoiceCommand::Stop));
    assert_eq!(VoiceCommand::parse("emergencia en pantalla"),
               Some(VoiceCommand::ToggleDisplay));
  }

  #[test]
  fn parse_ignores_case_test() {
    assert_eq!(VoiceCommand::parse("TRÁFICO"), Some(VoiceCommand::ForceTraffic));
    assert_eq!(VoiceCommand::parse("Copiloto"), Some(VoiceCommand::Start));
  }

  #[tokio::test(start_paused = true)]
  async fn start_stop_gating_test() {
    let (router, narrator, query) = router();

    assert_eq!(router.route("parar").await, Some(VoiceCommand::Stop));
    assert_eq!(narrator.cancels(), 0);

    assert_eq!(router.route("copiloto").await, Some(VoiceCommand::Start));
    assert_eq!(router.route("iniciar").await, Some(VoiceCommand::Start));
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(query.count(), 1);
    assert_eq!(narrator.spoken().len(), 1);

    assert_eq!(router.route("detener").await, Some(VoiceCommand::Stop));
    assert_eq!(narrator.cancels(), 1);
    assert!(!router.orchestrator.is_scanning().await);
  }

  #[tokio::test(start_paused = true)]
  async fn display_and_unknown_test() {
    let (router, narrator, query) = router();

    assert_eq!(router.route("pantalla").await,
               Some(VoiceCommand::ToggleDisplay));
    assert_eq!(router.orchestrator.snapshot().display_mode,
               DisplayMode::Mirrored);

    assert_eq!(router.route("qué hora es").await, None);
    assert_eq!(narrator.spoken(), Vec::<String>::new());
    assert_eq!(query.count(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn emergency_is_unconditional_test() {
    let (router, _, query) = router();

    assert_eq!(router.route("emergencia").await, Some(VoiceCommand::Emergency));
    assert_eq!(router.orchestrator.snapshot().status, ScanStatus::Emergency);
    time::sleep(Duration::from_secs(1)).await;

    let requests = query.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].1.emergency);
  }

  #[tokio::test(start_paused = true)]
  async fn traffic_command_test() {
    let (router, _, query) = router();

    router.route("copiloto").await;
    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(router.route("tráfico").await,
               Some(VoiceCommand::ForceTraffic));
    time::sleep(Duration::from_secs(40)).await;

    let requests = query.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].1.scan_traffic_now);
    assert!(!requests[1].1.scan_weather_now);
  }
}
