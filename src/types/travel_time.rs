// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motor travel time type.

use std::fmt;

use crate::error::ValueError;

/// A motor travel time in whole seconds (1-255).
///
/// Covers are configured with how long the motor needs for a full opening,
/// closing or tilt movement. The same range bounds the moving time carried
/// in a move command.
///
/// # Examples
///
/// ```
/// use eltako_bridge::types::TravelTime;
///
/// let opens = TravelTime::new(20).unwrap();
/// assert_eq!(opens.seconds(), 20);
///
/// assert!(TravelTime::new(0).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct TravelTime(u8);

impl TravelTime {
    /// Shortest travel time (1 second).
    pub const MIN: Self = Self(1);

    /// Longest travel time (255 seconds).
    pub const MAX: Self = Self(255);

    /// Creates a new travel time.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `seconds` is zero.
    pub fn new(seconds: u8) -> Result<Self, ValueError> {
        if seconds == 0 {
            return Err(ValueError::OutOfRange {
                min: 1,
                max: 255,
                actual: 0,
            });
        }
        Ok(Self(seconds))
    }

    /// Returns the number of seconds.
    #[must_use]
    pub const fn seconds(self) -> u8 {
        self.0
    }

    /// Returns the number of seconds as a float.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for TravelTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl TryFrom<u8> for TravelTime {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TravelTime> for u8 {
    fn from(time: TravelTime) -> Self {
        time.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(matches!(
            TravelTime::new(0),
            Err(ValueError::OutOfRange { min: 1, .. })
        ));
    }

    #[test]
    fn bounds() {
        assert_eq!(TravelTime::new(1).unwrap(), TravelTime::MIN);
        assert_eq!(TravelTime::new(255).unwrap(), TravelTime::MAX);
    }

    #[test]
    fn as_secs_f64() {
        let t = TravelTime::new(15).unwrap();
        assert!((t.as_secs_f64() - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serde_rejects_zero() {
        assert!(serde_json::from_str::<TravelTime>("0").is_err());
        assert!(serde_json::from_str::<TravelTime>("256").is_err());
        let t: TravelTime = serde_json::from_str("30").unwrap();
        assert_eq!(t.seconds(), 30);
    }
}
