// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! The context query: everything the scan core knows about a trip goes out in
//! a [`QueryRequest`], a [`ScanResult`] comes back.

mod gemini;
mod prompt;
mod response;

pub use gemini::GeminiClient;

// fin re-exports ---------------------------------------------------------- //

use crate::model::{CoordinateSample, ScanResult, SearchPreferences};

use async_trait::async_trait;
use eyre::Result;
use std::fmt;


#[derive(Clone, Debug, PartialEq)]
/// Trip context of a single dispatch. Sample and preferences are snapshots
/// taken at dispatch time.
pub struct QueryRequest {
  pub sample:           CoordinateSample,
  pub preferences:      SearchPreferences,
  pub extended_search:  bool,
  pub scan_traffic_now: bool,
  pub scan_weather_now: bool,
  pub emergency:        bool,
}

impl QueryRequest {
  /// Emergency requests carry no sub-scans and never widen the search.
  pub fn emergency(sample: CoordinateSample,
                   preferences: SearchPreferences)
                   -> Self {
    Self { sample,
           preferences,
           extended_search: false,
           scan_traffic_now: false,
           scan_weather_now: false,
           emergency: true }
  }
}


#[async_trait]
/// Anything able to answer a [`QueryRequest`]. Implementors may fail in two
/// ways: by returning an `Err`, or by returning
/// [`ScanResult::connection_error`]. Latency is unbounded.
pub trait ContextQuery: fmt::Debug + Send + Sync {
  async fn query(&self, request: QueryRequest) -> Result<ScanResult>;
}
