// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switching actuator state.

use crate::profile::SwitchStatus;

/// Tracked state of a switching actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SwitchState {
    /// Relay state, `None` until first reported or commanded.
    pub is_on: Option<bool>,
}

impl SwitchState {
    /// Creates an unknown state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a status report. Returns `true` if the state changed.
    pub fn apply(&mut self, status: SwitchStatus) -> bool {
        let changed = self.is_on != Some(status.is_on);
        self.is_on = Some(status.is_on);
        changed
    }
}
