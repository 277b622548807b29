// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! Test doubles for the boundaries of the scan core.

use crate::{model::{CoordinateSample, PointsOfInterest, ScanResult,
                    StationInfo, StationSummary, TrafficInfo, WeatherInfo,
                    TRAFFIC_CLEAR},
            nodes::{NarrationSink, PositionSource},
            query::{ContextQuery, QueryRequest}};

use async_trait::async_trait;
use eyre::{bail, Result};
use std::{collections::VecDeque,
          sync::{atomic::{AtomicUsize, Ordering},
                 Mutex},
          time::Duration};
use tokio::time::{self, Instant};


pub fn alert_result(name: &str, distance: &str) -> ScanResult {
  ScanResult { alert_triggered: true,
               nearest_station: StationInfo { name:             name.into(),
                                              distance:         distance.into(),
                                              is_open:          true,
                                              location_details: "A-6, Km 35".into(), },
               next_station:    StationSummary { name:     "---".into(),
                                                 distance: "--".into(), },
               traffic:         TrafficInfo { status:        TRAFFIC_CLEAR.into(),
                                              summary:       "Sin incidencias".into(),
                                              delay_minutes: 0, },
               weather:         WeatherInfo { condition: "Soleado".into(),
                                              summary:   "Despejado".into(), },
               poi:             PointsOfInterest { rest_areas: "N/A".into() },
               grounding_urls:  Vec::new(), }
}

pub fn quiet_result() -> ScanResult {
  let mut result = alert_result("Buscando...", "--");
  result.alert_triggered = false;
  result
}


#[derive(Debug, Default)]
pub struct FakePosition {
  sample:    Mutex<Option<CoordinateSample>>,
  refreshes: AtomicUsize,
}

impl FakePosition {
  pub fn with_fix() -> Self {
    let position = Self::default();
    position.set(CoordinateSample::new(40.4168, -3.7038).with_speed(25.0));
    position
  }

  pub fn set(&self, sample: CoordinateSample) {
    *self.sample.lock().unwrap() = Some(sample);
  }

  pub fn refreshes(&self) -> usize {
    self.refreshes.load(Ordering::SeqCst)
  }
}

impl PositionSource for FakePosition {
  fn latest(&self) -> Option<CoordinateSample> {
    *self.sample.lock().unwrap()
  }

  fn last_error(&self) -> Option<String> {
    None
  }

  fn refresh_now(&self) {
    self.refreshes.fetch_add(1, Ordering::SeqCst);
  }
}


#[derive(Debug, Default)]
pub struct RecordingNarrator {
  spoken:  Mutex<Vec<String>>,
  cancels: AtomicUsize,
}

impl RecordingNarrator {
  pub fn spoken(&self) -> Vec<String> {
    self.spoken.lock().unwrap().clone()
  }

  pub fn cancels(&self) -> usize {
    self.cancels.load(Ordering::SeqCst)
  }
}

impl NarrationSink for RecordingNarrator {
  fn speak(&self, text: &str) {
    self.spoken.lock().unwrap().push(text.to_owned());
  }

  fn cancel(&self) {
    self.cancels.fetch_add(1, Ordering::SeqCst);
  }
}


#[derive(Debug)]
/// Answers from a queue of scripted responses, falling back to a quiet
/// result once the queue is empty. Every request is recorded with the
/// (paused) clock time it arrived at.
pub struct ScriptedQuery {
  responses:       Mutex<VecDeque<Result<ScanResult, String>>>,
  requests:        Mutex<Vec<(Instant, QueryRequest)>>,
  delay:           Duration,
  outstanding:     AtomicUsize,
  max_outstanding: AtomicUsize,
}

impl ScriptedQuery {
  pub fn new() -> Self {
    Self::with_delay(Duration::ZERO)
  }

  pub fn with_delay(delay: Duration) -> Self {
    Self { responses: Mutex::new(VecDeque::new()),
           requests: Mutex::new(Vec::new()),
           delay,
           outstanding: AtomicUsize::new(0),
           max_outstanding: AtomicUsize::new(0) }
  }

  pub fn push_ok(&self, result: ScanResult) {
    self.responses.lock().unwrap().push_back(Ok(result));
  }

  pub fn push_err(&self, message: &str) {
    self.responses.lock().unwrap().push_back(Err(message.to_owned()));
  }

  pub fn requests(&self) -> Vec<(Instant, QueryRequest)> {
    self.requests.lock().unwrap().clone()
  }

  pub fn count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn max_outstanding(&self) -> usize {
    self.max_outstanding.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ContextQuery for ScriptedQuery {
  async fn query(&self, request: QueryRequest) -> Result<ScanResult> {
    self.requests.lock().unwrap().push((Instant::now(), request));

    let outstanding = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_outstanding.fetch_max(outstanding, Ordering::SeqCst);
    if !self.delay.is_zero() {
      time::sleep(self.delay).await;
    }
    self.outstanding.fetch_sub(1, Ordering::SeqCst);

    let next = self.responses.lock().unwrap().pop_front();
    match next {
      Some(Ok(result)) => Ok(result),
      Some(Err(message)) => bail!(message),
      None => Ok(quiet_result()),
    }
  }
}
