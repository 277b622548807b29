// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use crate::model::{FuelBrand, SearchPreferences};

use eyre::{bail, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use tokio::sync::watch;
use tracing::{debug, info};


/// Environment variable read when no credential has been stored yet.
const API_KEY_ENVVAR: &str = "GEMINI_API_KEY";


#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// What survives a restart.
struct PersistedSettings {
  destination: String,
  api_key:     String,
}


#[derive(Debug)]
/// Owns the search preferences and the API credential. Both are handed out as
/// live `watch` receivers; the destination and the credential are written
/// back to disk on every change.
pub struct SettingsStore {
  path:        PathBuf,
  preferences: watch::Sender<SearchPreferences>,
  api_key:     watch::Sender<String>,
}

impl SettingsStore {
  /// Default location: `copiloto/settings.toml` under the user config dir.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("copiloto").join("settings.toml"))
  }

  /// Loads persisted settings on top of the session `defaults`. A missing
  /// file is not an error.
  pub fn load(path: PathBuf, defaults: SearchPreferences) -> Result<Self> {
    let persisted: PersistedSettings = if path.exists() {
      let contents = fs::read_to_string(&path).wrap_err_with(|| {
                       format!("failed to read {}", path.display())
                     })?;
      toml::from_str(&contents).wrap_err_with(|| {
                                  format!("invalid settings at {}",
                                          path.display())
                                })?
    } else {
      debug!(path = %path.display(), "no stored settings");
      PersistedSettings::default()
    };

    let mut preferences = defaults;
    if !persisted.destination.is_empty() {
      preferences.destination = persisted.destination;
    }

    let api_key = if persisted.api_key.is_empty() {
      env::var(API_KEY_ENVVAR).unwrap_or_default()
    } else {
      persisted.api_key
    };

    info!(path = %path.display(),
          destination = %preferences.destination,
          has_api_key = !api_key.is_empty(),
          "settings loaded");

    let (preferences, _) = watch::channel(preferences);
    let (api_key, _) = watch::channel(api_key);
    Ok(Self { path,
              preferences,
              api_key })
  }

  pub fn preferences(&self) -> watch::Receiver<SearchPreferences> {
    self.preferences.subscribe()
  }

  pub fn api_key(&self) -> watch::Receiver<String> {
    self.api_key.subscribe()
  }

  pub fn current(&self) -> SearchPreferences {
    self.preferences.borrow().clone()
  }

  pub fn set_destination(&self, destination: &str) -> Result<()> {
    let destination = destination.trim().to_owned();
    self.preferences
        .send_modify(|prefs| prefs.destination = destination);
    self.save()
  }

  pub fn set_api_key(&self, api_key: &str) -> Result<()> {
    self.api_key.send_replace(api_key.trim().to_owned());
    self.save()
  }

  /// Applies a session edit. Intervals are pulled into the editor ranges.
  pub fn edit_preferences<F>(&self, edit: F) -> Result<()>
    where F: FnOnce(&mut SearchPreferences)
  {
    let before = self.current().destination;
    self.preferences.send_modify(|prefs| {
                      edit(prefs);
                      prefs.clamp_intervals();
                    });

    if self.preferences.borrow().destination != before {
      self.save()?;
    }
    Ok(())
  }

  /// Sets a single preference from its textual form, as typed by the user.
  pub fn apply(&self, key: &str, value: &str) -> Result<()> {
    match key {
      "destination" => self.set_destination(value),
      "fuel_brand" => {
        let brand = parse_brand(value)?;
        self.edit_preferences(|prefs| prefs.fuel_brand = brand)
      }
      "filter_rest_areas" => {
        let flag = parse_flag(value)?;
        self.edit_preferences(|prefs| prefs.filter_rest_areas = flag)
      }
      "mirrored_display" => {
        let flag = parse_flag(value)?;
        self.edit_preferences(|prefs| prefs.mirrored_display = flag)
      }
      "monitor_traffic" => {
        let flag = parse_flag(value)?;
        self.edit_preferences(|prefs| prefs.monitor_traffic = flag)
      }
      "monitor_weather" => {
        let flag = parse_flag(value)?;
        self.edit_preferences(|prefs| prefs.monitor_weather = flag)
      }
      "traffic_interval_minutes" => {
        let minutes = parse_minutes(value)?;
        self.edit_preferences(|prefs| prefs.traffic_interval_minutes = minutes)
      }
      "weather_interval_minutes" => {
        let minutes = parse_minutes(value)?;
        self.edit_preferences(|prefs| prefs.weather_interval_minutes = minutes)
      }
      _ => bail!("unknown preference '{}'", key),
    }
  }

  fn save(&self) -> Result<()> {
    let persisted =
      PersistedSettings { destination: self.preferences.borrow().destination.clone(),
                          api_key:     self.api_key.borrow().clone(), };

    if let Some(dir) = self.path.parent() {
      fs::create_dir_all(dir).wrap_err_with(|| {
                                format!("failed to create {}", dir.display())
                              })?;
    }
    fs::write(&self.path, toml::to_string(&persisted)?).wrap_err_with(|| {
      format!("failed to write {}", self.path.display())
    })?;

    debug!(path = %self.path.display(), "settings saved");
    Ok(())
  }
}

fn parse_brand(value: &str) -> Result<FuelBrand> {
  // reuse the serde names so config file and editor agree
  let brand: FuelBrand = toml::Value::String(value.trim().to_lowercase())
    .try_into()
    .map_err(|_| eyre!("unknown fuel brand '{}'", value))?;
  Ok(brand)
}

fn parse_flag(value: &str) -> Result<bool> {
  match value.trim().to_lowercase().as_str() {
    "true" | "on" | "si" | "sí" | "1" => Ok(true),
    "false" | "off" | "no" | "0" => Ok(false),
    other => bail!("expected on/off, got '{}'", other),
  }
}

fn parse_minutes(value: &str) -> Result<u32> {
  let minutes: u32 = value.trim()
                          .parse()
                          .wrap_err_with(|| format!("invalid minutes '{}'", value))?;
  if minutes == 0 {
    bail!("intervals must be positive");
  }
  Ok(minutes)
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::SettingsStore;
  use crate::model::{FuelBrand, SearchPreferences};

  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use std::fs;
  use tempfile::TempDir;


  #[test]
  fn missing_file_test() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");

    let store = SettingsStore::load(path.clone(), SearchPreferences::default())
      .unwrap();

    assert_eq!(*store.preferences().borrow(), SearchPreferences::default());
    assert!(!path.exists());
  }

  #[test]
  fn persistence_test() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.toml");

    let store = SettingsStore::load(path.clone(), SearchPreferences::default())
      .unwrap();
    let prefs = store.preferences();
    let key = store.api_key();

    store.set_destination("  Segovia ").unwrap();
    store.set_api_key("abc123").unwrap();
    assert_eq!(prefs.borrow().destination, "Segovia");
    assert_eq!(*key.borrow(), "abc123");

    // session-scoped preferences are not persisted
    store.apply("fuel_brand", "shell").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(),
               indoc! {r#"
                 destination = "Segovia"
                 api_key = "abc123"
               "#});

    let reloaded =
      SettingsStore::load(path, SearchPreferences::default()).unwrap();
    assert_eq!(reloaded.current().destination, "Segovia");
    assert_eq!(reloaded.current().fuel_brand, FuelBrand::Repsol);
    assert_eq!(*reloaded.api_key().borrow(), "abc123");
  }

  #[test]
  fn apply_test() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::load(dir.path().join("settings.toml"),
                                    SearchPreferences::default()).unwrap();

    store.apply("fuel_brand", "BP").unwrap();
    store.apply("filter_rest_areas", "on").unwrap();
    store.apply("monitor_weather", "no").unwrap();
    store.apply("traffic_interval_minutes", "5").unwrap();
    store.apply("weather_interval_minutes", "90").unwrap();

    let prefs = store.current();
    assert_eq!(prefs.fuel_brand, FuelBrand::Bp);
    assert!(prefs.filter_rest_areas);
    assert!(!prefs.monitor_weather);
    assert_eq!(prefs.traffic_interval_minutes, 10);
    assert_eq!(prefs.weather_interval_minutes, 90);

    assert!(store.apply("fuel_brand", "cepsa").is_err());
    assert!(store.apply("monitor_traffic", "maybe").is_err());
    assert!(store.apply("traffic_interval_minutes", "0").is_err());
    assert!(store.apply("colour", "red").is_err());
  }

  #[test]
  fn invalid_file_test() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "destination = [").unwrap();

    assert!(SettingsStore::load(path, SearchPreferences::default()).is_err());
  }
}
