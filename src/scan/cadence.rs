// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use boolinator::Boolinator;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;


#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Holds the timing parameters of the scan loop. Deserialized from the
/// `[cycle]` section of the config file, every field falls back to the values
/// the loop was tuned with.
pub struct CycleTiming {
  pub base_millis:           u64,
  pub alert_millis:          u64,
  pub extended_millis:       u64,
  pub position_retry_millis: u64,
  /// Watchdog around the context query. `0` disables it.
  pub query_timeout_secs:    u64,
}

impl CycleTiming {
  /// Delay before the next cycle. Extended search is the fastest cadence and
  /// wins over an active alert when both hold.
  pub fn next_delay(&self,
                    alert_active: bool,
                    extended_search: bool)
                    -> Duration {
    let millis = if extended_search {
      self.extended_millis
    } else if alert_active {
      self.alert_millis
    } else {
      self.base_millis
    };
    Duration::from_millis(millis)
  }

  pub fn position_retry(&self) -> Duration {
    Duration::from_millis(self.position_retry_millis)
  }

  pub fn query_timeout(&self) -> Option<Duration> {
    let limit = Duration::from_secs(self.query_timeout_secs);
    (self.query_timeout_secs > 0).as_some(limit)
  }
}

impl Default for CycleTiming {
  fn default() -> Self {
    Self { base_millis:           45_000,
           alert_millis:          30_000,
           extended_millis:       20_000,
           position_retry_millis: 2_000,
           query_timeout_secs:    120, }
  }
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Which of the throttled sub-scans ride along with a cycle's query.
pub struct SubScans {
  pub traffic: bool,
  pub weather: bool,
}

impl SubScans {
  pub fn both() -> Self {
    Self { traffic: true,
           weather: true }
  }
}


/// A sub-scan is due when it is enabled and strictly more than `interval` has
/// passed since it last ran. A sub-scan that never ran is always due.
pub fn is_due(enabled: bool,
              last_scan: Option<Instant>,
              interval: Duration,
              now: Instant)
              -> bool {
  enabled
  && last_scan.map_or(true, |last| {
                now.saturating_duration_since(last) > interval
              })
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::{is_due, CycleTiming};

  use pretty_assertions::assert_eq;
  use std::time::Duration;
  use tokio::time::Instant;


  #[test]
  fn next_delay_test() {
    let timing = CycleTiming::default();

    assert_eq!(timing.next_delay(false, false), Duration::from_millis(45_000));
    assert_eq!(timing.next_delay(true, false), Duration::from_millis(30_000));
    assert_eq!(timing.next_delay(false, true), Duration::from_millis(20_000));
    // extended search beats the alert cadence
    assert_eq!(timing.next_delay(true, true), Duration::from_millis(20_000));
  }

  #[test]
  fn query_timeout_test() {
    let mut timing = CycleTiming::default();
    assert_eq!(timing.query_timeout(), Some(Duration::from_secs(120)));

    timing.query_timeout_secs = 0;
    assert_eq!(timing.query_timeout(), None);
    assert_eq!(timing.position_retry(), Duration::from_secs(2));
  }

  #[test]
  fn is_due_test() {
    let interval = Duration::from_secs(20 * 60);
    let t0 = Instant::now();

    assert!(is_due(true, None, interval, t0));
    assert!(!is_due(false, None, interval, t0));
    assert!(!is_due(true, Some(t0), interval, t0 + interval));
    assert!(is_due(true,
                   Some(t0),
                   interval,
                   t0 + interval + Duration::from_millis(1)));
  }

  #[test]
  fn partial_timing_config_test() {
    let timing: CycleTiming = toml::from_str("base_millis = 60000").unwrap();

    assert_eq!(timing.base_millis, 60_000);
    assert_eq!(timing.alert_millis, 30_000);
    assert_eq!(timing.query_timeout_secs, 120);
  }
}
