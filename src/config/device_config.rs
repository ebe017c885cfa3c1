// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device configuration types.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::{Address, TravelTime};

/// Motor travel times of a cover.
///
/// Position control needs both `opens` and `closes`; tilt control needs
/// `tilts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TravelTimes {
    /// Seconds for a full opening.
    #[serde(default, rename = "time_opens")]
    pub opens: Option<TravelTime>,
    /// Seconds for a full closing.
    #[serde(default, rename = "time_closes")]
    pub closes: Option<TravelTime>,
    /// Seconds for a full tilt.
    #[serde(default, rename = "time_tilts")]
    pub tilts: Option<TravelTime>,
}

impl TravelTimes {
    /// Creates travel times from raw seconds.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if any given value is zero.
    pub fn new(opens: Option<u8>, closes: Option<u8>, tilts: Option<u8>) -> Result<Self, ValueError> {
        Ok(Self {
            opens: opens.map(TravelTime::new).transpose()?,
            closes: closes.map(TravelTime::new).transpose()?,
            tilts: tilts.map(TravelTime::new).transpose()?,
        })
    }

    /// Returns `true` if position control is possible.
    #[must_use]
    pub fn supports_position(&self) -> bool {
        self.opens.is_some() && self.closes.is_some()
    }

    /// Returns `true` if tilt control is possible.
    #[must_use]
    pub fn supports_tilt(&self) -> bool {
        self.tilts.is_some()
    }
}

/// Configuration of a cover actuator.
///
/// # Examples
///
/// ```
/// use eltako_bridge::config::CoverConfig;
///
/// let config: CoverConfig = serde_json::from_str(r#"{
///     "address": "00-00-00-0B",
///     "sender_id": "00-00-B0-0B",
///     "time_opens": 20,
///     "time_closes": 18
/// }"#).unwrap();
///
/// assert!(config.times.supports_position());
/// assert!(!config.times.supports_tilt());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Address the actuator reports from.
    pub address: Address,
    /// Address the bridge sends commands from.
    pub sender_id: Address,
    /// Travel times.
    #[serde(flatten)]
    pub times: TravelTimes,
}

impl CoverConfig {
    /// Creates a configuration without travel times.
    #[must_use]
    pub fn new(address: Address, sender_id: Address) -> Self {
        Self {
            address,
            sender_id,
            times: TravelTimes::default(),
        }
    }

    /// Sets the full opening time.
    #[must_use]
    pub fn with_time_opens(mut self, time: TravelTime) -> Self {
        self.times.opens = Some(time);
        self
    }

    /// Sets the full closing time.
    #[must_use]
    pub fn with_time_closes(mut self, time: TravelTime) -> Self {
        self.times.closes = Some(time);
        self
    }

    /// Sets the full tilt time.
    #[must_use]
    pub fn with_time_tilts(mut self, time: TravelTime) -> Self {
        self.times.tilts = Some(time);
        self
    }
}

/// Configuration of a switching actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Address the actuator reports from.
    pub address: Address,
    /// Address the bridge sends commands from.
    pub sender_id: Address,
}

impl SwitchConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(address: Address, sender_id: Address) -> Self {
        Self { address, sender_id }
    }
}

/// Configuration of a dimming actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimmerConfig {
    /// Address the actuator reports from.
    pub address: Address,
    /// Address the bridge sends commands from.
    pub sender_id: Address,
}

impl DimmerConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(address: Address, sender_id: Address) -> Self {
        Self { address, sender_id }
    }
}

/// What a binary sensor reports as "on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// D5-00-01 contact: on while the contact is closed.
    Contact,
    /// F6-10-00 window handle: on unless the handle is in the closed
    /// position.
    Window,
    /// F6-10-00 window handle: on while the handle is in the tilt position.
    WindowTilt,
}

/// Configuration of a receive-only binary sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinarySensorConfig {
    /// Address the sensor reports from.
    pub address: Address,
    /// How the sensor's telegrams are read.
    pub kind: SensorKind,
}

impl BinarySensorConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(address: Address, kind: SensorKind) -> Self {
        Self { address, kind }
    }
}
