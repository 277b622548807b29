// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! Nodes sit at the edges of `copiloto` and connect the scan core to the
//! outside world.
//!
//! The [`PositionSource`] and [`NarrationSink`] traits are the seams the
//! [`ScanOrchestrator`](crate::scan::ScanOrchestrator) talks through; the
//! concrete nodes in this module implement them for a terminal session
//! (replayed GPS track, transcripts on stdin, paced narration on stdout and a
//! text dashboard).

mod commands;
mod narration;
mod position;

pub mod dashboard;
pub use commands::{CommandFeed, Control, Input};
pub use dashboard::Dashboard;
pub use narration::TerminalNarrator;
pub use position::{PositionHandle, TrackReplay};

// fin re-exports ---------------------------------------------------------- //

use crate::model::CoordinateSample;

use std::fmt;


/// Latest-fix view of a position sensor. Implementors keep only the most
/// recent sample, no history.
pub trait PositionSource: fmt::Debug + Send + Sync {
  /// Most recent sample, `None` until the first fix arrives.
  fn latest(&self) -> Option<CoordinateSample>;
  /// Human-readable description of the last sensor problem, if any.
  fn last_error(&self) -> Option<String>;
  /// Produces one immediate sample and restarts the continuous watch.
  fn refresh_now(&self);
}


/// Speech output. Both operations are fire-and-forget.
pub trait NarrationSink: fmt::Debug + Send + Sync {
  /// Speaks `text`, cutting off whatever utterance is still playing.
  fn speak(&self, text: &str);
  /// Silences the current utterance without replacement.
  fn cancel(&self);
}
