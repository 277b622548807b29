// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::{cadence::CycleTiming,
            session::{DisplayMode, ScanSession, ScanStatus, SessionSnapshot}};
use crate::{model::{ScanResult, SearchPreferences},
            nodes::{NarrationSink, PositionSource},
            query::{ContextQuery, QueryRequest}};

use derivative::Derivative;
use eyre::{eyre, Result};
use std::{sync::Arc, time::Duration};
use tokio::{sync::{watch, Mutex},
            task::JoinHandle,
            time::{self, Instant}};
use tracing::{debug, error, info, warn};


const ACTIVATED: &str = "Copiloto activado. Monitoreando ruta.";
const SYNCING: &str = "Sincronizando GPS.";
const EMERGENCY_ACTIVATED: &str =
  "Modo emergencia activado. Buscando ayuda médica o policial cercana.";
const EMERGENCY_FAILED: &str =
  "No se ha podido localizar ayuda cercana. Llame al 112.";


#[derive(Clone, Debug)]
/// Drives the scan cycle: decides when to query, which sub-scans ride along,
/// merges results and decides what gets narrated. Cheap to clone, all clones
/// control the same session.
pub struct ScanOrchestrator {
  shared: Arc<Shared>,
}

#[derive(Derivative)]
#[derivative(Debug)]
struct Shared {
  timing:      CycleTiming,
  state:       Mutex<State>,
  preferences: watch::Receiver<SearchPreferences>,
  position:    Arc<dyn PositionSource>,
  query:       Arc<dyn ContextQuery>,
  narrator:    Arc<dyn NarrationSink>,
  #[derivative(Debug = "ignore")]
  snapshot_tx: watch::Sender<SessionSnapshot>,
  /// Bumped by `start()` and `stop()`; the loop cuts its pause short when it
  /// moves.
  #[derivative(Debug = "ignore")]
  wake:        watch::Sender<u64>,
}

#[derive(Debug)]
struct State {
  session:    ScanSession,
  result:     Option<ScanResult>,
  loop_alive: bool,
  /// Mirroring preference the display mode was last aligned with.
  mirrored:   bool,
}

impl ScanOrchestrator {
  /// Preferences are read through the live handle on every cycle; the
  /// initial display mode follows the mirroring preference.
  pub fn new(timing: CycleTiming,
             preferences: watch::Receiver<SearchPreferences>,
             position: Arc<dyn PositionSource>,
             query: Arc<dyn ContextQuery>,
             narrator: Arc<dyn NarrationSink>)
             -> Self {
    let mirrored = preferences.borrow().mirrored_display;
    let session = ScanSession::new(DisplayMode::from_mirrored(mirrored));
    let (snapshot_tx, _) = watch::channel(session.snapshot(None));

    let (wake, _) = watch::channel(0);

    let state = Mutex::new(State { session,
                                   result: None,
                                   loop_alive: false,
                                   mirrored });

    Self { shared: Arc::new(Shared { timing,
                                     state,
                                     preferences,
                                     position,
                                     query,
                                     narrator,
                                     snapshot_tx,
                                     wake }) }
  }

  pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
    self.shared.snapshot_tx.subscribe()
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    self.shared.snapshot_tx.borrow().clone()
  }

  pub async fn is_scanning(&self) -> bool {
    self.shared.state.lock().await.session.scanning
  }

  /// Starts scanning and announces it. No-op when already scanning. A loop
  /// that is still winding down from an earlier `stop()` is woken up and
  /// reused instead of spawning a second one.
  pub async fn start(&self) {
    let mut state = self.shared.state.lock().await;
    if state.session.scanning {
      return;
    }

    state.session.scanning = true;
    state.session.status = ScanStatus::scanning(state.session.extended_search);
    self.shared.narrator.speak(ACTIVATED);
    self.shared.publish(&mut state);

    if state.loop_alive {
      debug!("scan loop still alive, waking it up");
      self.shared.wake_loop();
    } else {
      state.loop_alive = true;
      tokio::spawn(Shared::scan_loop(self.shared.clone()));
    }
    info!("scanning started");
  }

  /// Stops scanning and silences narration. An in-flight query is not
  /// aborted; its result is still merged but no further cycle follows.
  pub async fn stop(&self) {
    let mut state = self.shared.state.lock().await;
    state.session.scanning = false;
    state.session.status = ScanStatus::Idle;
    self.shared.narrator.cancel();
    self.shared.publish(&mut state);
    self.shared.wake_loop();
    info!("scanning stopped");
  }

  /// Flips extended search. Takes effect with the next dispatch.
  pub async fn toggle_extended_search(&self) {
    let mut state = self.shared.state.lock().await;
    state.session.extended_search = !state.session.extended_search;
    info!(extended_search = state.session.extended_search,
          "extended search toggled");
    self.shared.publish(&mut state);
  }

  /// Flips the display mode. A later change of the mirroring preference
  /// overrides the toggle again.
  pub async fn toggle_display_mode(&self) {
    let mut state = self.shared.state.lock().await;
    self.shared.follow_mirroring(&mut state);
    state.session.display_mode = state.session.display_mode.toggled();
    debug!(display_mode = ?state.session.display_mode, "display mode toggled");
    self.shared.publish(&mut state);
  }

  /// Requests a fresh position fix and, while scanning, makes both sub-scans
  /// due on the next cycle.
  pub async fn force_sync(&self) {
    self.shared.narrator.speak(SYNCING);
    self.shared.position.refresh_now();

    let mut state = self.shared.state.lock().await;
    if state.session.scanning {
      state.session.reset_cadence();
    }
    info!("position sync forced");
  }

  /// Makes the traffic sub-scan due on the next cycle only.
  pub async fn force_traffic_scan(&self) {
    self.shared.state.lock().await.session.reset_traffic();
    info!("traffic scan forced");
  }

  /// Republishes the snapshot on every preference change, so a new mirroring
  /// preference shows while idle too. Runs until the preferences go away.
  pub async fn follow_preferences(self) {
    let mut preferences = self.shared.preferences.clone();
    while preferences.changed().await.is_ok() {
      let mut state = self.shared.state.lock().await;
      self.shared.publish(&mut state);
    }
    debug!("preferences gone");
  }

  /// Runs one emergency query outside the cycle and narrates its outcome.
  /// Returns `None` without doing anything when there is no position fix.
  pub async fn trigger_emergency(&self) -> Option<JoinHandle<()>> {
    let sample = match self.shared.position.latest() {
      Some(sample) => sample,
      None => {
        warn!("emergency requested without a position fix, ignoring");
        return None;
      }
    };
    let preferences = self.shared.preferences.borrow().clone();

    {
      let mut state = self.shared.state.lock().await;
      state.session.status = ScanStatus::Emergency;
      self.shared.publish(&mut state);
    }
    self.shared.narrator.speak(EMERGENCY_ACTIVATED);
    info!(?sample, "emergency mode triggered");

    let shared = self.shared.clone();
    let request = QueryRequest::emergency(sample, preferences);
    Some(tokio::spawn(async move { shared.run_emergency(request).await }))
  }
}

impl Shared {
  /// Aligns the display mode with the mirroring preference, if that changed
  /// since the last look.
  fn follow_mirroring(&self, state: &mut State) {
    let mirrored = self.preferences.borrow().mirrored_display;
    if mirrored != state.mirrored {
      state.mirrored = mirrored;
      state.session.display_mode = DisplayMode::from_mirrored(mirrored);
    }
  }

  fn publish(&self, state: &mut State) {
    self.follow_mirroring(state);
    self.snapshot_tx
        .send_replace(state.session.snapshot(state.result.as_ref()));
  }

  fn wake_loop(&self) {
    self.wake
        .send_modify(|generation| *generation = generation.wrapping_add(1));
  }

  async fn scan_loop(self: Arc<Self>) {
    info!("scan loop started");
    let mut wake = self.wake.subscribe();
    loop {
      // start/stop calls up to here are covered by the check below
      wake.borrow_and_update();
      if !self.still_scanning().await {
        break;
      }
      let delay = self.run_cycle().await;
      debug!(?delay, "next cycle scheduled");
      self.pause(delay, &mut wake).await;
    }
    info!("scan loop finished");
  }

  /// Checks the current scanning flag. Marks the loop as gone in the same
  /// critical section, so `start()` never sees a loop that is about to exit.
  async fn still_scanning(&self) -> bool {
    let mut state = self.state.lock().await;
    if !state.session.scanning {
      state.loop_alive = false;
    }
    state.session.scanning
  }

  async fn pause(&self, delay: Duration, wake: &mut watch::Receiver<u64>) {
    tokio::select! {
      _ = time::sleep(delay) => {}
      _ = wake.changed() => debug!("pause interrupted"),
    }
  }

  /// One pass of the scan cycle. Never fails; returns the delay until the
  /// next pass.
  async fn run_cycle(&self) -> Duration {
    let sample = match self.position.latest() {
      Some(sample) => sample,
      None => {
        debug!("waiting for a position fix");
        return self.timing.position_retry();
      }
    };
    let preferences = self.preferences.borrow().clone();
    let now = Instant::now();

    let (request, due) = {
      let mut state = self.state.lock().await;
      let due = state.session.due_sub_scans(&preferences, now);
      let extended_search = state.session.extended_search;
      state.session.status = ScanStatus::scanning(extended_search);
      self.publish(&mut state);

      let request = QueryRequest { sample,
                                   preferences,
                                   extended_search,
                                   scan_traffic_now: due.traffic,
                                   scan_weather_now: due.weather,
                                   emergency: false };
      (request, due)
    };
    debug!(?due, extended_search = request.extended_search, "dispatching");

    let outcome = self.dispatch(request).await;

    let mut state = self.state.lock().await;
    let alert_active = match outcome {
      Ok(result) => {
        if result.is_failure() {
          warn!(summary = %result.traffic.summary, "context query failed");
        }
        state.session.mark_scanned(due, now);

        if let Some(text) = state.session.announcement(&result, due) {
          info!(%text, "announcing");
          self.narrator.speak(&text);
        }

        let alert_active = result.alert_triggered;
        state.result = Some(result);
        alert_active
      }
      Err(e) => {
        error!("context query failed: {}", e);
        false
      }
    };
    self.publish(&mut state);

    self.timing
        .next_delay(alert_active, state.session.extended_search)
  }

  async fn dispatch(&self, request: QueryRequest) -> Result<ScanResult> {
    let query = self.query.query(request);
    match self.timing.query_timeout() {
      Some(limit) => time::timeout(limit, query).await.map_err(|_| {
                       eyre!("context query timed out after {:?}", limit)
                     })?,
      None => query.await,
    }
  }

  async fn run_emergency(&self, request: QueryRequest) {
    let outcome = self.dispatch(request).await;

    let mut state = self.state.lock().await;
    match outcome {
      Ok(result) if !result.is_failure() => {
        let station = &result.nearest_station;
        self.narrator.speak(&format!("Emergencia. Dirígete a {}. Distancia {}.",
                                     station.name, station.distance));
        state.result = Some(result);
      }
      Ok(result) => {
        warn!(summary = %result.traffic.summary, "emergency query failed");
        self.narrator.speak(EMERGENCY_FAILED);
        state.result = Some(result);
      }
      Err(e) => {
        error!("emergency query failed: {}", e);
        self.narrator.speak(EMERGENCY_FAILED);
      }
    }
    self.publish(&mut state);
  }
}

// fin --------------------------------------------------------------------- //
