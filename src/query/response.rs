// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use crate::model::{PointsOfInterest, ScanResult, StationInfo, StationSummary,
                   TrafficInfo, WeatherInfo};

use eyre::{bail, Result, WrapErr};
use itertools::Itertools;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;


#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// The parts of a `generateContent` response the client looks at.
pub struct GenerateResponse {
  pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
  pub content:            Option<Content>,
  pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Content {
  pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Part {
  pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingMetadata {
  pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroundingChunk {
  pub web:  Option<ChunkSource>,
  pub maps: Option<ChunkSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChunkSource {
  pub uri: Option<String>,
}

impl GenerateResponse {
  /// Concatenated text parts of the first candidate, `"{}"` when there are
  /// none.
  pub fn text(&self) -> String {
    let text = self.candidates
                   .first()
                   .and_then(|c| c.content.as_ref())
                   .map(|content| {
                     content.parts
                            .iter()
                            .filter_map(|part| part.text.as_deref())
                            .collect::<String>()
                   })
                   .unwrap_or_default();

    if text.trim().is_empty() {
      "{}".to_owned()
    } else {
      text
    }
  }

  /// Web and maps attribution URIs of the first candidate, deduplicated in
  /// first-seen order.
  pub fn grounding_urls(&self) -> Vec<String> {
    self.candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|metadata| {
          metadata.grounding_chunks
                  .iter()
                  .flat_map(|chunk| [chunk.web.as_ref(), chunk.maps.as_ref()])
                  .flatten()
                  .filter_map(|source| source.uri.clone())
                  .unique()
                  .collect()
        })
        .unwrap_or_default()
  }
}


/// Pulls a JSON value out of free model text: the whole text, then a fenced
/// ```` ```json ```` block, then the span from the first `{` to the last `}`.
pub fn parse_json_from_text(text: &str) -> Result<Value> {
  if let Ok(value) = serde_json::from_str(text) {
    return Ok(value);
  }

  if let Some(block) = fence_pattern()?.captures(text)
                                      .and_then(|caps| caps.get(1))
  {
    if let Ok(value) = serde_json::from_str(block.as_str()) {
      return Ok(value);
    }
  }

  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      if let Ok(value) = serde_json::from_str(&text[start..=end]) {
        return Ok(value);
      }
    }
  }

  bail!("no valid JSON found in model response")
}

/// The ```` ```json ```` fence matcher, compiled on first use.
fn fence_pattern() -> Result<&'static Regex> {
  static FENCE: OnceLock<Regex> = OnceLock::new();
  if let Some(fence) = FENCE.get() {
    return Ok(fence);
  }

  let fence = Regex::new(r"```json\s*([\s\S]*?)\s*```")
    .wrap_err("invalid JSON fence pattern")?;
  Ok(FENCE.get_or_init(|| fence))
}


#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Model answer as it comes, every field optional.
pub struct RawScan {
  alert_triggered: Option<bool>,
  nearest_station: Option<RawStation>,
  next_station:    Option<RawStation>,
  traffic:         Option<RawTraffic>,
  weather:         Option<RawWeather>,
  poi:             Option<RawPoi>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawStation {
  name:             Option<String>,
  distance:         Option<String>,
  is_open:          Option<bool>,
  location_details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTraffic {
  status:        Option<String>,
  summary:       Option<String>,
  delay_minutes: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWeather {
  condition: Option<String>,
  summary:   Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPoi {
  rest_areas: Option<String>,
}

/// Empty strings count as missing.
fn or_sentinel(value: Option<String>, fallback: &str) -> String {
  value.filter(|v| !v.trim().is_empty())
       .unwrap_or_else(|| fallback.to_owned())
}

impl RawScan {
  /// Tolerates any JSON: values of the wrong shape read as an empty answer.
  pub fn from_value(value: Value) -> Self {
    serde_json::from_value(value).unwrap_or_default()
  }

  pub fn into_scan_result(self, grounding_urls: Vec<String>) -> ScanResult {
    let nearest = self.nearest_station.unwrap_or_default();
    let next = self.next_station.unwrap_or_default();
    let traffic = self.traffic.unwrap_or_default();
    let weather = self.weather.unwrap_or_default();
    let poi = self.poi.unwrap_or_default();

    let nearest_station =
      StationInfo { name:             or_sentinel(nearest.name, "Buscando..."),
                    distance:         or_sentinel(nearest.distance, "--"),
                    is_open:          nearest.is_open.unwrap_or(false),
                    location_details: or_sentinel(nearest.location_details,
                                                  "Ubicación desconocida"), };
    let next_station = StationSummary { name:     or_sentinel(next.name, "---"),
                                        distance: or_sentinel(next.distance,
                                                              "--"), };

    let delay_minutes = traffic.delay_minutes
                               .filter(|d| d.is_finite() && *d > 0.0)
                               .map_or(0, |d| d.round() as u32);
    let traffic =
      TrafficInfo { status: or_sentinel(traffic.status, "N/A"),
                    summary: or_sentinel(traffic.summary,
                                         "Sin incidencias reportadas"),
                    delay_minutes };

    let weather =
      WeatherInfo { condition: or_sentinel(weather.condition, "N/A"),
                    summary:   or_sentinel(weather.summary,
                                           "Sin datos recientes"), };
    let poi = PointsOfInterest { rest_areas: or_sentinel(poi.rest_areas,
                                                         "Sin resultados") };

    ScanResult { alert_triggered: self.alert_triggered.unwrap_or(false),
                 nearest_station,
                 next_station,
                 traffic,
                 weather,
                 poi,
                 grounding_urls }
  }

  /// Emergency answers always alert and always read as urgent traffic.
  pub fn into_emergency_result(self) -> ScanResult {
    let nearest = self.nearest_station.unwrap_or_default();
    let traffic = self.traffic.unwrap_or_default();

    let nearest_station =
      StationInfo { name:             or_sentinel(nearest.name,
                                                  "BUSCANDO AYUDA"),
                    distance:         or_sentinel(nearest.distance, "..."),
                    is_open:          true,
                    location_details: or_sentinel(nearest.location_details,
                                                  "Ubicación de emergencia"), };
    let traffic =
      TrafficInfo { status:        "URGENTE".into(),
                    summary:       or_sentinel(traffic.summary,
                                               "Modo emergencia activo"),
                    delay_minutes: 0, };

    ScanResult { alert_triggered: true,
                 nearest_station,
                 next_station: StationSummary { name:     "---".into(),
                                                distance: "---".into(), },
                 traffic,
                 weather: WeatherInfo { condition: "N/A".into(),
                                        summary:   String::new(), },
                 poi: PointsOfInterest { rest_areas: String::new() },
                 grounding_urls: Vec::new() }
  }
}

// fin --------------------------------------------------------------------- //
