// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! Text rendering of the session for a terminal.

use super::{PositionHandle, PositionSource};
use crate::{model::CoordinateSample,
            scan::{DisplayMode, ScanStatus, SessionSnapshot}};

use eyre::Result;
use serde::Deserialize;
use std::time::Duration;
use tokio::{sync::watch, time};
use tracing::info;


/// Everything one frame of the dashboard shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashboardView {
  pub snapshot:  SessionSnapshot,
  pub sample:    Option<CoordinateSample>,
  pub gps_error: Option<String>,
  pub listening: bool,
  /// Whether the screen is being kept on.
  pub held:      bool,
}

pub fn status_label(status: ScanStatus) -> &'static str {
  match status {
    ScanStatus::Idle => "EN ESPERA",
    ScanStatus::Scanning => "EN RUTA",
    ScanStatus::ExtendedScanning => "RADAR AMPLIADO",
    ScanStatus::Emergency => "EMERGENCIA",
  }
}

/// Renders a frame. Mirrored mode is the compact HUD with its lines in
/// reverse order, to be read off a windshield reflection.
pub fn render(view: &DashboardView) -> Vec<String> {
  let mut lines = Vec::new();
  if let Some(error) = &view.gps_error {
    lines.push(format!("!! GPS: {}", error));
  }

  let speed = view.sample.map_or(0, |s| s.speed_kmh());
  match view.snapshot.display_mode {
    DisplayMode::Normal => lines.extend(render_normal(view, speed)),
    DisplayMode::Mirrored => lines.extend(render_hud(view, speed).into_iter()
                                                                 .rev()),
  }
  lines
}

fn render_normal(view: &DashboardView, speed: u32) -> Vec<String> {
  let snapshot = &view.snapshot;
  let mut header = format!("[ {} ]  {} km/h  {}",
                           status_label(snapshot.status),
                           speed,
                           if view.held { "☀ WAKE" } else { "☾ DIM" });
  if view.listening {
    header.push_str("  · voz activa");
  }
  let mut lines = vec![header];

  let result = match &snapshot.result {
    Some(result) => result,
    None => {
      lines.push("Sin datos todavía".to_owned());
      return lines;
    }
  };

  let station = &result.nearest_station;
  let open = if station.is_open { "abierta" } else { "cerrada" };
  let marker = if result.alert_triggered { ">> " } else { "" };
  lines.push(format!("{}Gasolinera: {} ({}) a {}",
                     marker, station.name, open, station.distance));
  lines.push(format!("  {}", station.location_details));
  lines.push(format!("Siguiente: {} a {}",
                     result.next_station.name, result.next_station.distance));

  let traffic = &result.traffic;
  let delay = if traffic.delay_minutes > 0 {
    format!(" (+{} min)", traffic.delay_minutes)
  } else {
    String::new()
  };
  lines.push(format!("Tráfico: {}{}. {}", traffic.status, delay, traffic.summary));
  lines.push(format!("Clima: {}. {}",
                     result.weather.condition, result.weather.summary));
  if !result.poi.rest_areas.is_empty() {
    lines.push(format!("Áreas de descanso: {}", result.poi.rest_areas));
  }
  if !result.grounding_urls.is_empty() {
    lines.push(format!("Fuentes: {}", result.grounding_urls.join(" ")));
  }
  lines
}

fn render_hud(view: &DashboardView, speed: u32) -> Vec<String> {
  let mut lines = vec![format!("{} KM/H", speed)];
  match &view.snapshot.result {
    Some(result) => {
      lines.push(result.nearest_station.name.to_uppercase());
      lines.push(result.nearest_station.distance.clone());
      lines.push(format!("TRÁFICO {}", result.traffic.status.to_uppercase()));
    }
    None => lines.push(status_label(view.snapshot.status).to_owned()),
  }
  lines
}


#[derive(Debug, Deserialize)]
#[serde(default)]
/// Redraws the terminal dashboard whenever the session or the position
/// changes. Deserialized from the `[dashboard]` section of the config file.
pub struct Dashboard {
  refresh_millis: u64,
  /// Keep the screen on while scanning. Off for displays that cannot.
  keep_awake:     bool,
}

impl Default for Dashboard {
  fn default() -> Self {
    Self { refresh_millis: 1_000,
           keep_awake:     true, }
  }
}

impl Dashboard {
  /// The screen is held for exactly as long as a scan is running.
  pub fn screen_held(&self, snapshot: &SessionSnapshot) -> bool {
    self.keep_awake && snapshot.scanning
  }

  /// Runs until the snapshot channel closes. Only frames that differ from the
  /// previous one are printed.
  pub async fn run(self,
                   mut snapshots: watch::Receiver<SessionSnapshot>,
                   position: PositionHandle,
                   listening: watch::Receiver<bool>)
                   -> Result<()> {
    let mut interval =
      time::interval(Duration::from_millis(self.refresh_millis.max(1)));
    let mut previous = Vec::new();

    loop {
      tokio::select! {
        changed = snapshots.changed() => {
          if changed.is_err() {
            info!("session gone, dashboard stopping");
            return Ok(());
          }
        }
        _ = interval.tick() => {}
      }

      let snapshot = snapshots.borrow_and_update().clone();
      let view = DashboardView { held:      self.screen_held(&snapshot),
                                 snapshot,
                                 sample:    position.latest(),
                                 gps_error: position.last_error(),
                                 listening: *listening.borrow(), };
      let frame = render(&view);
      if frame != previous {
        println!("{}", "-".repeat(48));
        for line in &frame {
          println!("{}", line);
        }
        previous = frame;
      }
    }
  }
}

// fin --------------------------------------------------------------------- //
