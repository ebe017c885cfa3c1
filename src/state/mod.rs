// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state types.
//!
//! State structs here are plain snapshots with pure update methods; the
//! device handlers in [`crate::device`] own them behind locks, feed them
//! decoded telegrams and notify observers.
//!
//! # Examples
//!
//! ```
//! use eltako_bridge::config::TravelTimes;
//! use eltako_bridge::profile::CoverStatus;
//! use eltako_bridge::state::CoverState;
//!
//! let mut state = CoverState::new();
//! state.apply(CoverStatus::Closed, &TravelTimes::default());
//!
//! assert_eq!(state.is_closed, Some(true));
//! ```

mod binary_sensor_state;
mod cover_state;
mod dimmer_state;
mod switch_state;

pub use binary_sensor_state::BinarySensorState;
pub use cover_state::{CoverState, Direction};
pub use dimmer_state::DimmerState;
pub use switch_state::SwitchState;
