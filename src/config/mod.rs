// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gateway and device configuration.
//!
//! All types deserialize from JSON with `serde`; ranges are validated at
//! deserialization time by the value types in [`crate::types`].

mod device_config;
mod gateway_config;

pub use device_config::{
    BinarySensorConfig, CoverConfig, DimmerConfig, SensorKind, SwitchConfig, TravelTimes,
};
pub use gateway_config::{GatewayConfig, GatewayModel};
