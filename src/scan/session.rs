// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::cadence::{is_due, SubScans};
use crate::model::{ScanResult, SearchPreferences};

use tokio::time::Instant;


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// What the session is visibly doing.
pub enum ScanStatus {
  #[default]
  Idle,
  Scanning,
  ExtendedScanning,
  Emergency,
}

impl ScanStatus {
  pub fn scanning(extended_search: bool) -> Self {
    if extended_search {
      Self::ExtendedScanning
    } else {
      Self::Scanning
    }
  }
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Presentation variant. The core only flips it, renderers decide what it
/// looks like.
pub enum DisplayMode {
  #[default]
  Normal,
  Mirrored,
}

impl DisplayMode {
  pub fn from_mirrored(mirrored: bool) -> Self {
    if mirrored {
      Self::Mirrored
    } else {
      Self::Normal
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      Self::Normal => Self::Mirrored,
      Self::Mirrored => Self::Normal,
    }
  }
}


#[derive(Clone, Debug, Default, PartialEq)]
/// Read-only copy of the session handed out to presentation and the command
/// router.
pub struct SessionSnapshot {
  pub status:          ScanStatus,
  pub scanning:        bool,
  pub extended_search: bool,
  pub display_mode:    DisplayMode,
  pub result:          Option<ScanResult>,
  pub last_announced:  Option<String>,
}


#[derive(Debug, Default)]
/// Private state of the scan orchestrator: the scanning toggles, the sub-scan
/// cadence bookkeeping and the announcement dedup.
pub struct ScanSession {
  pub scanning:        bool,
  pub extended_search: bool,
  pub status:          ScanStatus,
  pub display_mode:    DisplayMode,
  last_traffic_scan:   Option<Instant>,
  last_weather_scan:   Option<Instant>,
  last_announced:      Option<String>,
}

impl ScanSession {
  pub fn new(display_mode: DisplayMode) -> Self {
    Self { display_mode,
           ..Default::default() }
  }

  /// Evaluates both sub-scans against their own timestamps with one `now`.
  pub fn due_sub_scans(&self,
                       preferences: &SearchPreferences,
                       now: Instant)
                       -> SubScans {
    SubScans { traffic: is_due(preferences.monitor_traffic,
                               self.last_traffic_scan,
                               preferences.traffic_interval(),
                               now),
               weather: is_due(preferences.monitor_weather,
                               self.last_weather_scan,
                               preferences.weather_interval(),
                               now), }
  }

  /// Advances the timestamps of the sub-scans that actually ran.
  pub fn mark_scanned(&mut self, due: SubScans, now: Instant) {
    if due.traffic {
      self.last_traffic_scan = Some(now);
    }
    if due.weather {
      self.last_weather_scan = Some(now);
    }
  }

  pub fn reset_cadence(&mut self) {
    self.last_traffic_scan = None;
    self.last_weather_scan = None;
  }

  pub fn reset_traffic(&mut self) {
    self.last_traffic_scan = None;
  }

  /// Decides what, if anything, to say about a fresh result. Only an alert
  /// for a station other than the last announced one is spoken; the traffic
  /// follow-up rides along when traffic was scanned this cycle and is not
  /// clear. Records the announced station.
  pub fn announcement(&mut self,
                      result: &ScanResult,
                      due: SubScans)
                      -> Option<String> {
    if !result.alert_triggered {
      return None;
    }

    let station = &result.nearest_station;
    if self.last_announced.as_deref() == Some(station.name.as_str()) {
      return None;
    }
    self.last_announced = Some(station.name.clone());

    let mut text = format!("Atención. {} a {}.", station.name, station.distance);
    if due.traffic && !result.traffic_is_clear() {
      text.push_str(&format!(" Tráfico {}. {}",
                             result.traffic.status, result.traffic.summary));
    }
    Some(text)
  }

  pub fn snapshot(&self, result: Option<&ScanResult>) -> SessionSnapshot {
    SessionSnapshot { status:          self.status,
                      scanning:        self.scanning,
                      extended_search: self.extended_search,
                      display_mode:    self.display_mode,
                      result:          result.cloned(),
                      last_announced:  self.last_announced.clone(), }
  }
}

// fin --------------------------------------------------------------------- //
