// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary sensor state.

/// Tracked state of a binary sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct BinarySensorState {
    /// Sensor reading, `None` until the first report.
    pub is_on: Option<bool>,
}

impl BinarySensorState {
    /// Creates an unknown state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reading. Returns `true` if the state changed.
    pub fn apply(&mut self, is_on: bool) -> bool {
        let changed = self.is_on != Some(is_on);
        self.is_on = Some(is_on);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reports_changes_only() {
        let mut state = BinarySensorState::new();
        assert!(state.apply(false));
        assert!(!state.apply(false));
        assert!(state.apply(true));
        assert_eq!(state.is_on, Some(true));
    }
}
