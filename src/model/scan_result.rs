// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use serde::{Deserialize, Serialize};


/// Traffic status meaning "nothing to report". Any other status is worth a
/// spoken follow-up when a traffic sub-scan was due.
pub const TRAFFIC_CLEAR: &str = "Fluido";

/// Traffic status and weather condition of a result produced from a failed
/// query.
pub const QUERY_ERROR: &str = "Error";


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Last known answer of the context query. Every field is always populated;
/// missing data is carried as sentinel text ("N/A", "---", "--") or an empty
/// list, so presentation never has to special-case absent fields.
pub struct ScanResult {
  pub alert_triggered: bool,
  pub nearest_station: StationInfo,
  pub next_station:    StationSummary,
  pub traffic:         TrafficInfo,
  pub weather:         WeatherInfo,
  pub poi:             PointsOfInterest,
  pub grounding_urls:  Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationInfo {
  pub name:             String,
  pub distance:         String,
  pub is_open:          bool,
  pub location_details: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSummary {
  pub name:     String,
  pub distance: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficInfo {
  pub status:        String,
  pub summary:       String,
  pub delay_minutes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherInfo {
  pub condition: String,
  pub summary:   String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsOfInterest {
  pub rest_areas: String,
}

impl ScanResult {
  /// Sentinel result standing in for a query that could not be completed.
  pub fn connection_error() -> Self {
    Self { alert_triggered: false,
           nearest_station: StationInfo { name:             "Error Conexión".into(),
                                          distance:         "--".into(),
                                          is_open:          false,
                                          location_details: "---".into(), },
           next_station:    StationSummary { name:     "---".into(),
                                             distance: "--".into(), },
           traffic:         TrafficInfo { status:        QUERY_ERROR.into(),
                                          summary:       "Verifique su API Key o conexión.".into(),
                                          delay_minutes: 0, },
           weather:         WeatherInfo { condition: QUERY_ERROR.into(),
                                          summary:   "Reintentando...".into(), },
           poi:             PointsOfInterest { rest_areas: String::new() },
           grounding_urls:  Vec::new(), }
  }

  /// True for results produced by a failed query rather than real data.
  pub fn is_failure(&self) -> bool {
    self.traffic.status == QUERY_ERROR
  }

  pub fn traffic_is_clear(&self) -> bool {
    self.traffic.status == TRAFFIC_CLEAR
  }
}

// fin --------------------------------------------------------------------- //
