// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device handlers.
//!
//! Each handler subscribes to its address on a [`GatewayRouter`], decodes
//! the telegrams routed to it, keeps its state and notifies observers
//! through [`Subscribable`]. Commands go out through the same router.
//!
//! [`GatewayRouter`]: crate::protocol::GatewayRouter
//! [`Subscribable`]: crate::subscription::Subscribable

mod binary_sensor;
mod cover;
mod dimmer;
mod switch;

pub use binary_sensor::{BinarySensor, BinarySensorCallback};
pub use cover::{Cover, CoverCallback};
pub use dimmer::{Dimmer, DimmerCallback};
pub use switch::{Switch, SwitchCallback};

/// A device registered with a gateway.
#[derive(Debug, Clone)]
pub enum Device {
    /// A cover actuator.
    Cover(Cover),
    /// A switching actuator.
    Switch(Switch),
    /// A dimming actuator.
    Dimmer(Dimmer),
    /// A receive-only binary sensor.
    BinarySensor(BinarySensor),
}

impl Device {
    /// Address the device reports from.
    #[must_use]
    pub fn address(&self) -> crate::types::Address {
        match self {
            Self::Cover(cover) => cover.address(),
            Self::Switch(switch) => switch.address(),
            Self::Dimmer(dimmer) => dimmer.address(),
            Self::BinarySensor(sensor) => sensor.address(),
        }
    }

    /// Stops routing telegrams to the device and cancels pending work.
    pub fn detach(&self) -> bool {
        match self {
            Self::Cover(cover) => cover.detach(),
            Self::Switch(switch) => switch.detach(),
            Self::Dimmer(dimmer) => dimmer.detach(),
            Self::BinarySensor(sensor) => sensor.detach(),
        }
    }
}

impl From<Cover> for Device {
    fn from(cover: Cover) -> Self {
        Self::Cover(cover)
    }
}

impl From<Switch> for Device {
    fn from(switch: Switch) -> Self {
        Self::Switch(switch)
    }
}

impl From<Dimmer> for Device {
    fn from(dimmer: Dimmer) -> Self {
        Self::Dimmer(dimmer)
    }
}

impl From<BinarySensor> for Device {
    fn from(sensor: BinarySensor) -> Self {
        Self::BinarySensor(sensor)
    }
}
