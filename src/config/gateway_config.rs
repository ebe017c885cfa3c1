// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gateway configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Address;

/// Supported gateway hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayModel {
    /// FAM14 bus gateway.
    #[serde(rename = "FAM14")]
    Fam14,
    /// FGW14-USB bus gateway.
    #[serde(rename = "FGW14USB")]
    Fgw14Usb,
    /// FAM-USB radio gateway.
    #[serde(rename = "FAMUSB")]
    FamUsb,
    /// USB300 radio stick.
    #[serde(rename = "USB300")]
    Usb300,
    /// Generic ESP3 gateway.
    #[serde(rename = "ESP3")]
    Esp3,
}

impl GatewayModel {
    /// Serial baud rate of the gateway.
    #[must_use]
    pub const fn baud_rate(self) -> u32 {
        match self {
            Self::FamUsb => 9_600,
            Self::Fam14 | Self::Fgw14Usb | Self::Usb300 | Self::Esp3 => 57_600,
        }
    }

    /// Returns `true` for gateways attached to the RS485 bus.
    #[must_use]
    pub const fn is_bus_gateway(self) -> bool {
        matches!(self, Self::Fam14 | Self::Fgw14Usb | Self::FamUsb)
    }

    /// Display name of the model.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fam14 => "FAM14",
            Self::Fgw14Usb => "FGW14USB",
            Self::FamUsb => "FAMUSB",
            Self::Usb300 => "USB300",
            Self::Esp3 => "ESP3 Gateway",
        }
    }
}

impl fmt::Display for GatewayModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_name() -> String {
    "Eltako Gateway".to_string()
}

fn default_base_id() -> Address {
    Address::new([0x00, 0x00, 0xb0, 0x00])
}

fn default_true() -> bool {
    true
}

fn default_message_delay() -> f64 {
    0.01
}

fn default_reconnect_interval() -> f64 {
    5.0
}

/// Configuration of one gateway.
///
/// # Examples
///
/// ```
/// use eltako_bridge::config::{GatewayConfig, GatewayModel};
///
/// let config = GatewayConfig::from_json(r#"{
///     "model": "FAM14",
///     "serial_port": "/dev/ttyUSB0",
///     "fast_status_change": true
/// }"#).unwrap();
///
/// assert_eq!(config.model, GatewayModel::Fam14);
/// assert!(config.auto_reconnect);
/// assert_eq!(config.message_delay().as_millis(), 10);
///
/// // Or built in code
/// let config = GatewayConfig::new("/dev/ttyUSB1", GatewayModel::Usb300)
///     .with_auto_reconnect(false)
///     .with_name("Attic");
/// assert_eq!(config.name, "Attic");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Gateway hardware model.
    pub model: GatewayModel,
    /// Serial device path.
    pub serial_port: String,
    /// Base address of the gateway.
    #[serde(default = "default_base_id")]
    pub base_id: Address,
    /// Rebuild the transport automatically when it goes down.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// Pause after each outbound telegram, in seconds.
    #[serde(default = "default_message_delay")]
    pub message_delay: f64,
    /// Update device state optimistically when issuing commands.
    #[serde(default)]
    pub fast_status_change: bool,
    /// Wait before an automatic reconnect attempt, in seconds.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval: f64,
}

impl GatewayConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(serial_port: impl Into<String>, model: GatewayModel) -> Self {
        Self {
            name: default_name(),
            model,
            serial_port: serial_port.into(),
            base_id: default_base_id(),
            auto_reconnect: true,
            message_delay: default_message_delay(),
            fast_status_change: false,
            reconnect_interval: default_reconnect_interval(),
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the JSON is malformed and
    /// `ConfigError::Invalid` if a value fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an empty serial port or a
    /// negative/non-finite delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial_port.trim().is_empty() {
            return Err(ConfigError::Invalid("serial_port is required".to_string()));
        }
        for (field, value) in [
            ("message_delay", self.message_delay),
            ("reconnect_interval", self.reconnect_interval),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the base address.
    #[must_use]
    pub fn with_base_id(mut self, base_id: Address) -> Self {
        self.base_id = base_id;
        self
    }

    /// Enables or disables automatic reconnection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the pause after each outbound telegram.
    #[must_use]
    pub fn with_message_delay(mut self, delay: Duration) -> Self {
        self.message_delay = delay.as_secs_f64();
        self
    }

    /// Enables or disables optimistic state updates.
    #[must_use]
    pub fn with_fast_status_change(mut self, enabled: bool) -> Self {
        self.fast_status_change = enabled;
        self
    }

    /// Sets the wait before an automatic reconnect attempt.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval.as_secs_f64();
        self
    }

    /// Pause after each outbound telegram.
    #[must_use]
    pub fn message_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.message_delay).unwrap_or_default()
    }

    /// Wait before an automatic reconnect attempt.
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.reconnect_interval).unwrap_or_default()
    }
}
