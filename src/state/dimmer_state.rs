// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimming actuator state.

use crate::profile::DimmerStatus;
use crate::types::Percent;

/// Tracked state of a dimming actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct DimmerState {
    /// Output state, `None` until first reported or commanded.
    pub is_on: Option<bool>,
    /// Last known brightness.
    pub brightness: Option<Percent>,
}

impl DimmerState {
    /// Creates an unknown state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a status report. Returns `true` if the state changed.
    ///
    /// Switching reports leave the brightness as it was.
    pub fn apply(&mut self, status: DimmerStatus) -> bool {
        let before = *self;
        self.is_on = Some(status.is_on);
        if let Some(brightness) = status.brightness {
            self.brightness = Some(brightness);
        }
        *self != before
    }
}
