// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Fuel brands the station search can be restricted to.
pub enum FuelBrand {
  #[default]
  Repsol,
  Moeve,
  Bp,
  Galp,
  Shell,
  All,
}

impl fmt::Display for FuelBrand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Repsol => "repsol",
      Self::Moeve => "moeve",
      Self::Bp => "bp",
      Self::Galp => "galp",
      Self::Shell => "shell",
      Self::All => "all",
    };
    write!(f, "{}", name)
  }
}


#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// What the driver is looking for and how often the slower sub-scans run.
/// Only the destination is persisted across sessions, everything else starts
/// from the defaults below (or the `[preferences]` config section).
pub struct SearchPreferences {
  pub destination:              String,
  pub fuel_brand:               FuelBrand,
  pub filter_rest_areas:        bool,
  pub mirrored_display:         bool,
  pub monitor_traffic:          bool,
  pub traffic_interval_minutes: u32,
  pub monitor_weather:          bool,
  pub weather_interval_minutes: u32,
}

impl SearchPreferences {
  pub const TRAFFIC_INTERVAL_RANGE: (u32, u32) = (10, 60);
  pub const WEATHER_INTERVAL_RANGE: (u32, u32) = (10, 120);

  pub fn traffic_interval(&self) -> Duration {
    minutes(self.traffic_interval_minutes)
  }

  pub fn weather_interval(&self) -> Duration {
    minutes(self.weather_interval_minutes)
  }

  /// Pulls both intervals into the ranges the settings editor offers.
  pub fn clamp_intervals(&mut self) {
    let (lo, hi) = Self::TRAFFIC_INTERVAL_RANGE;
    self.traffic_interval_minutes = self.traffic_interval_minutes.clamp(lo, hi);
    let (lo, hi) = Self::WEATHER_INTERVAL_RANGE;
    self.weather_interval_minutes = self.weather_interval_minutes.clamp(lo, hi);
  }
}

impl Default for SearchPreferences {
  fn default() -> Self {
    Self { destination:              String::new(),
           fuel_brand:               FuelBrand::Repsol,
           filter_rest_areas:        false,
           mirrored_display:         false,
           monitor_traffic:          true,
           traffic_interval_minutes: 20,
           monitor_weather:          true,
           weather_interval_minutes: 60, }
  }
}

fn minutes(m: u32) -> Duration {
  Duration::from_secs(u64::from(m) * 60)
}

// fin --------------------------------------------------------------------- //
