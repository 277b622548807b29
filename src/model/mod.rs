// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

//! Plain data shared between the scan core, the external boundaries and the
//! presentation: position fixes, search preferences and scan results.

mod coordinates;
mod preferences;
mod scan_result;

pub use coordinates::CoordinateSample;
pub use preferences::{FuelBrand, SearchPreferences};
pub use scan_result::{PointsOfInterest,
                      ScanResult,
                      StationInfo,
                      StationSummary,
                      TrafficInfo,
                      WeatherInfo,
                      QUERY_ERROR,
                      TRAFFIC_CLEAR};
