// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimming actuator profile (A5-38-08, central commands 0x01 and 0x02).
//!
//! ```text
//! DB3       DB2            DB1          DB0
//! command   dimming value  ramp (s)     ....LRSO
//!                                           │││└ switched on
//!                                           ││└─ store final value
//!                                           │└── value is a percentage
//!                                           └─── data telegram (not learn)
//! ```

use crate::error::ProfileError;
use crate::telegram::Telegram;
use crate::types::{Address, Percent};

use super::{CMD_DIMMING, CMD_SWITCHING, DATA_TELEGRAM, expect_four_bs};

const PROFILE: &str = "A5-38-08";

/// DB0 flag: the dimming value is a percentage rather than 0-255.
const PERCENT_RANGE: u8 = 0x04;

/// DB0 flag: output switched on.
const SWITCHED_ON: u8 = 0x01;

/// Dimming command sent to a dimming actuator.
///
/// # Examples
///
/// ```
/// use eltako_bridge::profile::DimmerCommand;
/// use eltako_bridge::types::{Address, Percent};
///
/// let sender = Address::new([0xff, 0x80, 0x80, 0x02]);
/// let telegram = DimmerCommand::on(Percent::new(60)?).encode(sender);
///
/// assert_eq!(telegram.radio().unwrap().data, [0x02, 60, 0x00, 0x0d]);
/// # Ok::<(), eltako_bridge::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmerCommand {
    /// Target brightness.
    pub brightness: Percent,
    /// Ramp time in seconds; zero uses the actuator's own setting.
    pub ramp: u8,
    /// Whether the output ends up on.
    pub on: bool,
}

impl DimmerCommand {
    /// Switches on at `brightness`.
    #[must_use]
    pub const fn on(brightness: Percent) -> Self {
        Self {
            brightness,
            ramp: 0,
            on: true,
        }
    }

    /// Switches off.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            brightness: Percent::CLOSED,
            ramp: 0,
            on: false,
        }
    }

    /// Sets the ramp time.
    #[must_use]
    pub const fn with_ramp(mut self, seconds: u8) -> Self {
        self.ramp = seconds;
        self
    }

    /// Encodes the command as a 4BS telegram from `sender`.
    #[must_use]
    pub const fn encode(&self, sender: Address) -> Telegram {
        let db0 = DATA_TELEGRAM | PERCENT_RANGE | if self.on { SWITCHED_ON } else { 0 };
        Telegram::four_bs(
            sender,
            [CMD_DIMMING, self.brightness.value(), self.ramp, db0],
        )
    }

    /// Decodes a dimming command telegram.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for non-4BS telegrams and
    /// `ProfileError::UnexpectedPayload` for other central commands.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let t = expect_four_bs(telegram, PROFILE)?;
        if t.data[0] != CMD_DIMMING {
            return Err(ProfileError::UnexpectedPayload {
                profile: PROFILE,
                data: t.data.to_vec(),
            });
        }
        Ok(Self {
            brightness: brightness(t.data[1], t.data[3]),
            ramp: t.data[2],
            on: t.data[3] & SWITCHED_ON != 0,
        })
    }
}

/// State reported by a dimming actuator.
///
/// Dimmers answer with either central command: "switching" carries only
/// on/off, "dimming" also carries the brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmerStatus {
    /// Whether the output is on.
    pub is_on: bool,
    /// Reported brightness, absent in switching reports.
    pub brightness: Option<Percent>,
}

impl DimmerStatus {
    /// Decodes a status telegram.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for non-4BS telegrams and
    /// `ProfileError::UnexpectedPayload` for unknown central commands.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let t = expect_four_bs(telegram, PROFILE)?;
        let is_on = t.data[3] & SWITCHED_ON != 0;
        match t.data[0] {
            CMD_SWITCHING => Ok(Self {
                is_on,
                brightness: None,
            }),
            CMD_DIMMING => Ok(Self {
                is_on,
                brightness: Some(brightness(t.data[1], t.data[3])),
            }),
            _ => Err(ProfileError::UnexpectedPayload {
                profile: PROFILE,
                data: t.data.to_vec(),
            }),
        }
    }
}

/// Reads DB2 as a percentage, scaling absolute (0-255) values.
fn brightness(value: u8, db0: u8) -> Percent {
    if db0 & PERCENT_RANGE != 0 {
        Percent::clamped(value)
    } else {
        Percent::saturating_from_f64(f64::from(value) * 100.0 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Address = Address::new([0, 0, 0, 0x0d]);

    fn pct(v: u8) -> Percent {
        Percent::new(v).unwrap()
    }

    #[test]
    fn command_layout() {
        let on = DimmerCommand::on(pct(45)).with_ramp(3).encode(ADDR);
        assert_eq!(on.radio().unwrap().data, [0x02, 45, 3, 0x0d]);
        assert!(!on.is_learn());

        let off = DimmerCommand::off().encode(ADDR);
        assert_eq!(off.radio().unwrap().data, [0x02, 0, 0, 0x0c]);

        assert_eq!(
            DimmerCommand::decode(&on).unwrap(),
            DimmerCommand::on(pct(45)).with_ramp(3)
        );
    }

    #[test]
    fn command_decode_rejects_switching() {
        let switching = Telegram::four_bs(ADDR, [0x01, 0, 0, 0x09]);
        assert!(matches!(
            DimmerCommand::decode(&switching),
            Err(ProfileError::UnexpectedPayload { .. })
        ));
    }

    #[test]
    fn status_percent_range() {
        let status = DimmerStatus::decode(&Telegram::four_bs(ADDR, [0x02, 70, 0, 0x0d])).unwrap();
        assert_eq!(
            status,
            DimmerStatus {
                is_on: true,
                brightness: Some(pct(70)),
            }
        );
    }

    #[test]
    fn status_absolute_range_is_scaled() {
        let status = DimmerStatus::decode(&Telegram::four_bs(ADDR, [0x02, 128, 0, 0x09])).unwrap();
        // 128 / 255 = 50.2%
        assert_eq!(status.brightness, Some(pct(50)));
    }

    #[test]
    fn status_percent_above_100_is_clamped() {
        let status = DimmerStatus::decode(&Telegram::four_bs(ADDR, [0x02, 140, 0, 0x0d])).unwrap();
        assert_eq!(status.brightness, Some(Percent::OPEN));
    }

    #[test]
    fn status_switching_has_no_brightness() {
        let status = DimmerStatus::decode(&Telegram::four_bs(ADDR, [0x01, 0, 0, 0x08])).unwrap();
        assert_eq!(
            status,
            DimmerStatus {
                is_on: false,
                brightness: None,
            }
        );
    }

    #[test]
    fn status_rejects_other_orgs_and_commands() {
        assert!(matches!(
            DimmerStatus::decode(&Telegram::rps(ADDR, 0x70)),
            Err(ProfileError::WrongOrg { actual: "RPS", .. })
        ));
        assert!(matches!(
            DimmerStatus::decode(&Telegram::four_bs(ADDR, [0x05, 0, 0, 0x08])),
            Err(ProfileError::UnexpectedPayload { .. })
        ));
    }
}
