// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! The scan core of `copiloto`.
//!
//! The [`ScanOrchestrator`] owns the [`session`](ScanSession) and the latest
//! result and runs the polling loop; the [`CommandRouter`] turns recognized
//! phrases into orchestrator operations. Presentation only ever sees
//! [`SessionSnapshot`]s.

mod cadence;
mod orchestrator;
mod router;
mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use cadence::CycleTiming;
pub use orchestrator::ScanOrchestrator;
pub use router::CommandRouter;
pub use session::{DisplayMode, ScanStatus, SessionSnapshot};
