// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use eyre::Result;
use serde::Deserialize;
use std::time::Duration;
use tokio::{io::{AsyncBufReadExt, AsyncRead, BufReader},
            sync::{mpsc, watch},
            time};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::{debug, info, warn};


#[derive(Clone, Debug, PartialEq, Eq)]
/// Something the user typed or said.
pub enum Input {
  /// Recognized speech, trimmed and lower-cased.
  Transcript(String),
  Control(Control),
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Keyboard controls, entered as lines starting with `:`.
pub enum Control {
  ToggleScan,
  ToggleExtended,
  ForceSync,
  ToggleVoice,
  ToggleDisplay,
  Emergency,
  Destination(String),
  ApiKey(String),
  Set { key: String, value: String },
  Quit,
}

impl Control {
  /// Parses the text after the leading `:`.
  pub fn parse(text: &str) -> Option<Self> {
    let (word, rest) = match text.trim().split_once(char::is_whitespace) {
      Some((word, rest)) => (word, rest.trim()),
      None => (text.trim(), ""),
    };

    let control = match (word.to_lowercase().as_str(), rest) {
      ("scan", "") => Self::ToggleScan,
      ("extended", "") => Self::ToggleExtended,
      ("sync", "") => Self::ForceSync,
      ("voice", "") => Self::ToggleVoice,
      ("hud", "") => Self::ToggleDisplay,
      ("sos", "") => Self::Emergency,
      ("quit", "") => Self::Quit,
      ("destination", destination) => Self::Destination(destination.to_owned()),
      ("apikey", key) if !key.is_empty() => Self::ApiKey(key.to_owned()),
      ("set", assignment) => {
        let (key, value) = assignment.split_once('=')?;
        Self::Set { key:   key.trim().to_owned(),
                    value: value.trim().to_owned(), }
      }
      _ => return None,
    };
    Some(control)
  }
}

/// Turns a raw line into an [`Input`]. Blank lines yield nothing.
pub fn parse_line(line: &str) -> Option<Input> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }

  match line.strip_prefix(':') {
    Some(control) => {
      let parsed = Control::parse(control).map(Input::Control);
      if parsed.is_none() {
        warn!("unknown control ':{}'", control);
      }
      parsed
    }
    None => Some(Input::Transcript(line.to_lowercase())),
  }
}


#[derive(Debug, Deserialize)]
#[serde(default)]
/// Reads transcripts and controls line by line. Deserialized from the
/// `[commands]` section of the config file.
///
/// Transcripts only pass while the feed is active; controls always pass.
/// `:voice` flips the active state. When the reader stops while active, it is
/// reopened after `restart_delay_millis`; a reader that ends without a single
/// line is exhausted and ends the feed.
pub struct CommandFeed {
  active_on_start:      bool,
  restart_delay_millis: u64,
  #[serde(skip)]
  active:               Option<watch::Sender<bool>>,
}

impl Default for CommandFeed {
  fn default() -> Self {
    Self { active_on_start:      true,
           restart_delay_millis: 1_000,
           active:               None, }
  }
}

impl CommandFeed {
  /// Sets up the active state; the returned receiver follows it.
  pub fn initialize(&mut self) -> watch::Receiver<bool> {
    let (active_tx, active_rx) = watch::channel(self.active_on_start);
    self.active = Some(active_tx);
    active_rx
  }

  /// Runs the feed until the input channel closes, the input is exhausted, or
  /// the reader stops while the feed is inactive. `open` is called for every (re)start of the
  /// reader. Consumes the `CommandFeed`.
  pub async fn run<R, F>(mut self,
                         mut open: F,
                         input_tx: mpsc::UnboundedSender<Input>)
                         -> Result<()>
    where R: AsyncRead + Unpin,
          F: FnMut() -> R
  {
    let active = match self.active.take() {
      Some(active) => active,
      None => {
        let (active, _) = watch::channel(self.active_on_start);
        active
      }
    };
    let restart_delay = Duration::from_millis(self.restart_delay_millis);

    loop {
      let mut lines = LinesStream::new(BufReader::new(open()).lines());
      info!("command reader started");

      let mut lines_read = 0_usize;
      let mut failed = false;
      while let Some(line) = lines.next().await {
        let line = match line {
          Ok(line) => line,
          Err(e) => {
            warn!("command reader failed: {}", e);
            failed = true;
            break;
          }
        };
        lines_read += 1;

        let input = match parse_line(&line) {
          Some(input) => input,
          None => continue,
        };

        match &input {
          Input::Transcript(_) if !*active.borrow() => {
            debug!(?input, "feed inactive, transcript dropped");
            continue;
          }
          Input::Control(Control::ToggleVoice) => {
            active.send_modify(|active| *active = !*active);
            info!(active = *active.borrow(), "voice commands toggled");
          }
          _ => (),
        }

        if input_tx.send(input).is_err() {
          info!("input channel closed, command feed stopping");
          return Ok(());
        }
      }

      if !*active.borrow() {
        info!("command reader stopped while inactive");
        return Ok(());
      }
      if !failed && lines_read == 0 {
        info!("command input exhausted, feed stopping");
        return Ok(());
      }
      warn!("command reader stopped, restarting in {:?}", restart_delay);
      time::sleep(restart_delay).await;
    }
  }
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::{parse_line, CommandFeed, Control, Input};

  use pretty_assertions::assert_eq;
  use std::collections::VecDeque;
  use tokio::sync::mpsc;


  fn transcript(text: &str) -> Input {
    Input::Transcript(text.to_owned())
  }

  async fn collect(mut rx: mpsc::UnboundedReceiver<Input>) -> Vec<Input> {
    let mut inputs = Vec::new();
    while let Some(input) = rx.recv().await {
      inputs.push(input);
    }
    inputs
  }

  #[test]
  fn parse_line_test() {
    assert_eq!(parse_line("  Oye COPILOTO  "), Some(transcript("oye copiloto")));
    assert_eq!(parse_line("   "), None);
    assert_eq!(parse_line(":extended"),
               Some(Input::Control(Control::ToggleExtended)));
    assert_eq!(parse_line(":SYNC"), Some(Input::Control(Control::ForceSync)));
    assert_eq!(parse_line(":destination  Segovia centro "),
               Some(Input::Control(Control::Destination("Segovia centro".into()))));
    assert_eq!(parse_line(":destination"),
               Some(Input::Control(Control::Destination(String::new()))));
    assert_eq!(parse_line(":set fuel_brand = shell"),
               Some(Input::Control(Control::Set { key:   "fuel_brand".into(),
                                                  value: "shell".into(), })));
    assert_eq!(parse_line(":apikey"), None);
    assert_eq!(parse_line(":set fuel_brand"), None);
    assert_eq!(parse_line(":bogus"), None);
  }

  #[tokio::test]
  async fn active_gating_test() {
    let mut feed = CommandFeed::default();
    let active = feed.initialize();
    let (tx, rx) = mpsc::unbounded_channel();

    let input: &[u8] = b"copiloto\n:voice\nparar\n:voice\ntr\xc3\xa1fico\n:voice\n";
    feed.run(|| input, tx).await.unwrap();

    assert_eq!(collect(rx).await,
               vec![transcript("copiloto"),
                    Input::Control(Control::ToggleVoice),
                    Input::Control(Control::ToggleVoice),
                    transcript("tráfico"),
                    Input::Control(Control::ToggleVoice)]);
    assert!(!*active.borrow());
  }

  #[tokio::test(start_paused = true)]
  async fn restart_test() {
    let feed = CommandFeed::default();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut readers: VecDeque<&'static [u8]> =
      VecDeque::from(vec![&b"hola\n"[..], &b"parar\n:voice\n"[..]]);
    let mut opened = 0;
    let open = || {
      opened += 1;
      readers.pop_front().unwrap_or(&b""[..])
    };
    feed.run(open, tx).await.unwrap();

    assert_eq!(opened, 2);
    assert_eq!(collect(rx).await,
               vec![transcript("hola"),
                    transcript("parar"),
                    Input::Control(Control::ToggleVoice)]);
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_input_test() {
    let feed = CommandFeed::default();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut opened = 0;
    let open = || {
      opened += 1;
      &b""[..]
    };
    feed.run(open, tx).await.unwrap();

    assert_eq!(opened, 1);
    assert_eq!(collect(rx).await, Vec::<Input>::new());
  }

  #[tokio::test(start_paused = true)]
  async fn end_of_script_test() {
    let feed = CommandFeed::default();
    let (tx, rx) = mpsc::unbounded_channel();

    // a piped script: lines, then nothing but end of input
    let mut readers: VecDeque<&'static [u8]> =
      VecDeque::from(vec![&b"copiloto\n:sync\n"[..]]);
    let mut opened = 0;
    let open = || {
      opened += 1;
      readers.pop_front().unwrap_or(&b""[..])
    };
    feed.run(open, tx).await.unwrap();

    assert_eq!(opened, 2);
    assert_eq!(collect(rx).await,
               vec![transcript("copiloto"), Input::Control(Control::ForceSync)]);
  }

  #[tokio::test]
  async fn closed_channel_test() {
    let feed = CommandFeed::default();
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let input: &[u8] = b"copiloto\n";
    assert!(feed.run(|| input, tx).await.is_ok());
  }
}
