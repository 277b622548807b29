// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use eyre::{bail, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::str::FromStr;


#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
/// Most recent position fix. Speed and heading are absent when the sensor
/// cannot determine them (stationary vehicle, degraded fix).
pub struct CoordinateSample {
  pub latitude:    f64,
  pub longitude:   f64,
  pub speed_mps:   Option<f64>,
  pub heading_deg: Option<f64>,
}

impl CoordinateSample {
  pub fn new(latitude: f64, longitude: f64) -> Self {
    Self { latitude,
           longitude,
           speed_mps: None,
           heading_deg: None }
  }

  pub fn with_speed(mut self, speed_mps: f64) -> Self {
    self.speed_mps = Some(speed_mps);
    self
  }

  pub fn with_heading(mut self, heading_deg: f64) -> Self {
    self.heading_deg = Some(heading_deg);
    self
  }

  /// Speed rounded to whole km/h, zero when unknown.
  pub fn speed_kmh(&self) -> u32 {
    self.speed_mps
        .map(|mps| (mps * 3.6).round().max(0.0) as u32)
        .unwrap_or(0)
  }
}

impl FromStr for CoordinateSample {
  type Err = eyre::Report;

  /// Parses a track line of the form `lat,lon[,speed_mps[,heading_deg]]`.
  /// Empty optional columns are read as absent.
  fn from_str(line: &str) -> Result<Self> {
    let mut columns = line.split(',').map(str::trim);

    let latitude = parse_required(columns.next(), "latitude")?;
    let longitude = parse_required(columns.next(), "longitude")?;
    let speed_mps = parse_optional(columns.next(), "speed")?;
    let heading_deg = parse_optional(columns.next(), "heading")?;

    if columns.next().is_some() {
      bail!("too many columns in track line '{}'", line);
    }
    if !(-90.0..=90.0).contains(&latitude)
       || !(-180.0..=180.0).contains(&longitude)
    {
      bail!("coordinates out of range: {}, {}", latitude, longitude);
    }

    Ok(Self { latitude,
              longitude,
              speed_mps,
              heading_deg })
  }
}

fn parse_required(column: Option<&str>, name: &str) -> Result<f64> {
  let column = column.filter(|c| !c.is_empty())
                     .ok_or_else(|| eyre!("missing {}", name))?;
  column.parse()
        .wrap_err_with(|| format!("invalid {} '{}'", name, column))
}

fn parse_optional(column: Option<&str>, name: &str) -> Result<Option<f64>> {
  match column {
    None | Some("") => Ok(None),
    Some(column) => {
      let value = column.parse()
                        .wrap_err_with(|| {
                          format!("invalid {} '{}'", name, column)
                        })?;
      Ok(Some(value))
    }
  }
}

// fin --------------------------------------------------------------------- //
