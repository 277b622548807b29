// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::PositionSource;
use crate::model::CoordinateSample;

use eyre::{bail, Result, WrapErr};
use serde::Deserialize;
use std::{fs, path::PathBuf, sync::Arc, time::Duration};
use tokio::{sync::{watch, Notify},
            time::{self, MissedTickBehavior}};
use tracing::{info, warn};


#[derive(Debug, Deserialize)]
/// Replays a recorded GPS track as if it came from a live sensor. Deserialized
/// from the `[position]` section of the config file.
///
/// Track files hold one `lat,lon[,speed_mps[,heading_deg]]` line per sample;
/// blank lines and lines starting with `#` are ignored.
pub struct TrackReplay {
  track_path:        PathBuf,
  #[serde(default = "default_millis_per_sample")]
  millis_per_sample: u64,
  #[serde(default)]
  loop_track:        bool,
  #[serde(skip)]
  handle:            PositionHandle,
}

fn default_millis_per_sample() -> u64 {
  1_000
}

impl TrackReplay {
  /// Handle through which the rest of the application reads the replay.
  pub fn handle(&self) -> PositionHandle {
    self.handle.clone()
  }

  /// Reads and parses the track file. Malformed lines are logged and
  /// skipped; a missing file or a track without a single usable sample is an
  /// error, also published on the error channel.
  pub fn load(&self) -> Result<Vec<CoordinateSample>> {
    let contents = match fs::read_to_string(&self.track_path) {
      Ok(contents) => contents,
      Err(e) => {
        let message = format!("No se puede leer la pista {}: {}",
                              self.track_path.display(),
                              e);
        self.handle.publish_error(message.clone());
        return Err(e).wrap_err(message);
      }
    };

    let samples = parse_track(&contents);
    if samples.is_empty() {
      let message = format!("La pista {} no contiene posiciones válidas",
                            self.track_path.display());
      self.handle.publish_error(message.clone());
      bail!(message);
    }

    info!(samples = samples.len(), path = %self.track_path.display(),
          "track loaded");
    Ok(samples)
  }

  /// Loads the track and replays it. Consumes the `TrackReplay`.
  pub async fn run(self) -> Result<()> {
    let samples = self.load()?;
    self.replay(samples).await
  }

  /// Publishes one sample per period. At the end of the track the last fix is
  /// held, or the track starts over with `loop_track`. A refresh request
  /// republishes the current fix at once and restarts the period.
  async fn replay(self, samples: Vec<CoordinateSample>) -> Result<()> {
    let period = Duration::from_millis(self.millis_per_sample.max(1));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut index = 0;
    let mut current = None;
    loop {
      tokio::select! {
        _ = interval.tick() => {
          current = samples.get(index).copied();
          if index + 1 < samples.len() {
            index += 1;
          } else if self.loop_track {
            index = 0;
          }
        }
        _ = self.handle.inner.refresh.notified() => {
          info!("position refresh requested");
          interval.reset();
        }
      }

      if let Some(sample) = current {
        self.handle.publish(sample);
      }
    }
  }
}


#[derive(Clone, Debug)]
/// Cheap handle on the most recent fix of a [`TrackReplay`].
pub struct PositionHandle {
  inner: Arc<PositionState>,
}

#[derive(Debug)]
struct PositionState {
  sample_tx: watch::Sender<Option<CoordinateSample>>,
  error_tx:  watch::Sender<Option<String>>,
  refresh:   Notify,
}

impl Default for PositionHandle {
  fn default() -> Self {
    let (sample_tx, _) = watch::channel(None);
    let (error_tx, _) = watch::channel(None);

    Self { inner: Arc::new(PositionState { sample_tx,
                                           error_tx,
                                           refresh: Notify::new() }) }
  }
}

impl PositionHandle {
  pub fn subscribe(&self) -> watch::Receiver<Option<CoordinateSample>> {
    self.inner.sample_tx.subscribe()
  }

  /// A fresh fix clears any earlier error.
  fn publish(&self, sample: CoordinateSample) {
    self.inner.sample_tx.send_replace(Some(sample));
    self.inner.error_tx.send_if_modified(|error| error.take().is_some());
  }

  fn publish_error(&self, message: String) {
    warn!("{}", message);
    self.inner.error_tx.send_replace(Some(message));
  }
}

impl PositionSource for PositionHandle {
  fn latest(&self) -> Option<CoordinateSample> {
    *self.inner.sample_tx.borrow()
  }

  fn last_error(&self) -> Option<String> {
    self.inner.error_tx.borrow().clone()
  }

  fn refresh_now(&self) {
    self.inner.refresh.notify_one();
  }
}


/// Parses a whole track, skipping comments, blank and malformed lines.
pub fn parse_track(contents: &str) -> Vec<CoordinateSample> {
  contents.lines()
          .enumerate()
          .map(|(number, line)| (number + 1, line.trim()))
          .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
          .filter_map(|(number, line)| match line.parse() {
            Ok(sample) => Some(sample),
            Err(e) => {
              warn!("skipping track line {}: {:#}", number, e);
              None
            }
          })
          .collect()
}

// fin --------------------------------------------------------------------- //
