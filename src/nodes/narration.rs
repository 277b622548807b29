// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::NarrationSink;

use serde::Deserialize;
use std::{io::{self, Write},
          sync::Mutex,
          time::Duration};
use tokio::{task::JoinHandle, time};
use tracing::{debug, error};


#[derive(Debug, Deserialize)]
#[serde(default)]
/// "Speaks" by writing utterances to stdout word by word at a speaking pace.
/// Deserialized from the `[narration]` section of the config file.
pub struct TerminalNarrator {
  words_per_minute: u32,
  #[serde(skip)]
  current:          Mutex<Option<JoinHandle<()>>>,
}

impl Default for TerminalNarrator {
  fn default() -> Self {
    Self { words_per_minute: 180,
           current:          Mutex::new(None), }
  }
}

impl TerminalNarrator {
  fn word_pause(&self) -> Duration {
    Duration::from_millis(60_000 / u64::from(self.words_per_minute.max(1)))
  }

  /// True while an utterance is still being played.
  pub fn is_speaking(&self) -> bool {
    match self.current.lock() {
      Ok(current) => current.as_ref().map_or(false, |task| !task.is_finished()),
      Err(_) => false,
    }
  }

  /// Aborts the running utterance, if any. Returns whether one was cut off.
  fn interrupt(&self) -> bool {
    let previous = match self.current.lock() {
      Ok(mut current) => current.take(),
      Err(e) => {
        error!("narrator state poisoned: {}", e);
        None
      }
    };

    match previous {
      Some(task) if !task.is_finished() => {
        task.abort();
        println!(" ...");
        true
      }
      _ => false,
    }
  }
}

impl NarrationSink for TerminalNarrator {
  fn speak(&self, text: &str) {
    if self.interrupt() {
      debug!("utterance interrupted");
    }

    let words = text.split_whitespace()
                    .map(str::to_owned)
                    .collect::<Vec<_>>();
    let pause = self.word_pause();
    let task = tokio::spawn(async move {
      let mut stdout = io::stdout();
      let _ = write!(stdout, "» ");
      for word in words {
        let _ = write!(stdout, "{} ", word);
        let _ = stdout.flush();
        time::sleep(pause).await;
      }
      let _ = writeln!(stdout);
    });

    if let Ok(mut current) = self.current.lock() {
      *current = Some(task);
    }
  }

  fn cancel(&self) {
    if self.interrupt() {
      debug!("narration cancelled");
    }
  }
}

// fin --------------------------------------------------------------------- //
