// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! Contains the core functionality components of `copiloto`.
//!
//! This includes the [`AppCore`] struct, which sets up and runs the
//! application, the [`SettingsStore`] holding the live preferences and the
//! persisted destination and credential, and the command line [`util`]s.

mod app_core;
mod settings;
pub mod util;

pub use app_core::AppCore;
pub use settings::SettingsStore;
