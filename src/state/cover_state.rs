// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover position and tilt estimation state.

use crate::config::TravelTimes;
use crate::profile::{CoverStatus, MoveDirection};
use crate::types::{Percent, TravelTime};

/// What the cover motor is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum Direction {
    /// Not moving (or not known to be moving).
    #[default]
    Idle,
    /// Moving towards fully open.
    Opening,
    /// Moving towards fully closed.
    Closing,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Self::Opening,
            MoveDirection::Down => Self::Closing,
        }
    }
}

/// Estimated state of a motor-driven cover.
///
/// Position and tilt are best-effort estimates: they are integrated from
/// running-time reports and reset exactly by end-stop reports. `None` means
/// unknown.
///
/// # Examples
///
/// ```
/// use eltako_bridge::config::TravelTimes;
/// use eltako_bridge::profile::{CoverStatus, MoveDirection};
/// use eltako_bridge::state::{CoverState, Direction};
///
/// let times = TravelTimes::new(Some(20), Some(20), None).unwrap();
/// let mut state = CoverState::new();
///
/// // Ran up for 10 seconds from an unknown position
/// state.apply(
///     CoverStatus::Travelled { time: 100, direction: MoveDirection::Up },
///     &times,
/// );
/// assert_eq!(state.position.map(|p| p.value()), Some(50));
/// assert_eq!(state.direction, Direction::Idle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct CoverState {
    /// Estimated position, 0 = closed, 100 = open.
    pub position: Option<Percent>,
    /// Estimated tilt, 0 = closed, 100 = open.
    pub tilt: Option<Percent>,
    /// Current motor direction.
    pub direction: Direction,
    /// Whether the cover is closed.
    pub is_closed: Option<bool>,
}

impl CoverState {
    /// Creates a state with everything unknown and the motor idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while opening.
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.direction == Direction::Opening
    }

    /// Returns `true` while closing.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.direction == Direction::Closing
    }

    /// Applies a status report from the actuator.
    ///
    /// Returns `true` if the state changed. Unknown status codes, and
    /// running-time reports for covers without both travel times, leave
    /// the state untouched.
    pub fn apply(&mut self, status: CoverStatus, times: &TravelTimes) -> bool {
        let before = *self;
        match status {
            CoverStatus::MovingDown => {
                self.direction = Direction::Closing;
                self.is_closed = Some(false);
            }
            CoverStatus::Closed => {
                self.direction = Direction::Idle;
                self.is_closed = Some(true);
                self.position = Some(Percent::CLOSED);
                self.tilt = Some(Percent::CLOSED);
            }
            CoverStatus::MovingUp => {
                self.direction = Direction::Opening;
                self.is_closed = Some(false);
            }
            CoverStatus::Open => {
                self.direction = Direction::Idle;
                self.is_closed = Some(false);
                self.position = Some(Percent::OPEN);
                self.tilt = Some(Percent::OPEN);
            }
            CoverStatus::Travelled { time, direction } => {
                let (Some(opens), Some(closes)) = (times.opens, times.closes) else {
                    return false;
                };
                let elapsed = f64::from(time) / 10.0;
                let travel = match direction {
                    MoveDirection::Up => opens,
                    MoveDirection::Down => closes,
                };

                self.position = Some(integrate(self.position, elapsed, travel, direction));
                if let Some(tilts) = times.tilts {
                    self.tilt = Some(integrate(self.tilt, elapsed, tilts, direction));
                }
                self.is_closed = Some(self.position == Some(Percent::CLOSED));
                self.direction = Direction::Idle;
            }
            CoverStatus::Unknown(_) => return false,
        }
        *self != before
    }
}

/// Advances an estimate by `elapsed` seconds of travel.
///
/// An unknown start is seeded at the end opposite to the direction of
/// travel, since only a bound on the distance covered is known.
fn integrate(
    current: Option<Percent>,
    elapsed: f64,
    full_travel: TravelTime,
    direction: MoveDirection,
) -> Percent {
    let delta = (elapsed / full_travel.as_secs_f64() * 100.0).trunc();
    match direction {
        MoveDirection::Up => {
            let start = current.unwrap_or(Percent::CLOSED);
            Percent::saturating_from_f64(f64::from(start.value()) + delta)
        }
        MoveDirection::Down => {
            let start = current.unwrap_or(Percent::OPEN);
            Percent::saturating_from_f64(f64::from(start.value()) - delta)
        }
    }
}
