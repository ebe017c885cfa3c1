// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover actuator profiles (G5-3F-7F status, H5-3F-7F command).

use crate::error::ProfileError;
use crate::telegram::Telegram;
use crate::types::Address;

use super::{DATA_TELEGRAM, expect_four_bs};

const STATUS_PROFILE: &str = "G5-3F-7F";
const COMMAND_PROFILE: &str = "H5-3F-7F";

/// Direction of a cover movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// Towards fully open.
    Up,
    /// Towards fully closed.
    Down,
}

/// Status reported by a cover actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverStatus {
    /// Motor started moving up.
    MovingUp,
    /// Motor started moving down.
    MovingDown,
    /// End stop reached: fully open.
    Open,
    /// End stop reached: fully closed.
    Closed,
    /// Motor stopped at an intermediate point after running for a while.
    Travelled {
        /// Elapsed running time in tenths of a second.
        time: u16,
        /// Direction the motor was running.
        direction: MoveDirection,
    },
    /// A state code this profile does not define.
    Unknown(u8),
}

impl CoverStatus {
    /// Decodes a status telegram.
    ///
    /// RPS telegrams carry a state code in their data byte; 4BS
    /// telegrams report the running time (DB3..DB2, tenths of a second) and
    /// the direction (DB1, `0x01` up, anything else down).
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for any telegram that is neither
    /// RPS nor 4BS.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        match telegram {
            Telegram::Rps(t) => Ok(match t.data[0] {
                0x01 => Self::MovingUp,
                0x02 => Self::MovingDown,
                0x50 => Self::Closed,
                0x70 => Self::Open,
                code => Self::Unknown(code),
            }),
            Telegram::FourBs(t) => {
                let time = u16::from_be_bytes([t.data[0], t.data[1]]);
                let direction = if t.data[2] == 0x01 {
                    MoveDirection::Up
                } else {
                    MoveDirection::Down
                };
                Ok(Self::Travelled { time, direction })
            }
            other => Err(ProfileError::WrongOrg {
                profile: STATUS_PROFILE,
                expected: "RPS or 4BS",
                actual: other.kind_name(),
            }),
        }
    }
}

/// What a cover command asks the motor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverAction {
    /// Stop immediately.
    Stop,
    /// Move up.
    Up,
    /// Move down.
    Down,
}

impl CoverAction {
    const fn code(self) -> u8 {
        match self {
            Self::Stop => 0x00,
            Self::Up => 0x01,
            Self::Down => 0x02,
        }
    }

    const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Stop),
            0x01 => Some(Self::Up),
            0x02 => Some(Self::Down),
            _ => None,
        }
    }
}

impl From<MoveDirection> for CoverAction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Self::Up,
            MoveDirection::Down => Self::Down,
        }
    }
}

/// Move command sent to a cover actuator.
///
/// `moving_time` is in seconds; zero means "until the end stop or the next
/// stop command".
///
/// # Examples
///
/// ```
/// use eltako_bridge::profile::{CoverAction, CoverCommand};
/// use eltako_bridge::types::Address;
///
/// let sender = Address::new([0xff, 0x80, 0x80, 0x01]);
/// let telegram = CoverCommand::new(CoverAction::Up, 21).encode(sender);
///
/// assert_eq!(telegram.radio().unwrap().data, [0x00, 21, 0x01, 0x08]);
/// assert_eq!(
///     CoverCommand::decode(&telegram).unwrap(),
///     CoverCommand::new(CoverAction::Up, 21)
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoverCommand {
    /// Requested action.
    pub action: CoverAction,
    /// Moving time in seconds.
    pub moving_time: u8,
}

impl CoverCommand {
    /// Creates a command.
    #[must_use]
    pub const fn new(action: CoverAction, moving_time: u8) -> Self {
        Self {
            action,
            moving_time,
        }
    }

    /// Creates a stop command.
    #[must_use]
    pub const fn stop() -> Self {
        Self::new(CoverAction::Stop, 0)
    }

    /// Encodes the command as a 4BS telegram from `sender`.
    #[must_use]
    pub const fn encode(&self, sender: Address) -> Telegram {
        Telegram::four_bs(
            sender,
            [0x00, self.moving_time, self.action.code(), DATA_TELEGRAM],
        )
    }

    /// Decodes a command telegram.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for non-4BS telegrams and
    /// `ProfileError::UnexpectedPayload` for an unknown action code.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let t = expect_four_bs(telegram, COMMAND_PROFILE)?;
        let action =
            CoverAction::from_code(t.data[2]).ok_or_else(|| ProfileError::UnexpectedPayload {
                profile: COMMAND_PROFILE,
                data: t.data.to_vec(),
            })?;
        Ok(Self::new(action, t.data[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Address = Address::new([0, 0, 0, 0x0b]);

    #[test]
    fn decode_rps_state_codes() {
        let cases = [
            (0x01, CoverStatus::MovingUp),
            (0x02, CoverStatus::MovingDown),
            (0x50, CoverStatus::Closed),
            (0x70, CoverStatus::Open),
            (0x33, CoverStatus::Unknown(0x33)),
        ];
        for (code, expected) in cases {
            assert_eq!(
                CoverStatus::decode(&Telegram::rps(ADDR, code)).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn decode_travel_report() {
        let up = Telegram::four_bs(ADDR, [0x00, 0x64, 0x01, 0x0a]);
        assert_eq!(
            CoverStatus::decode(&up).unwrap(),
            CoverStatus::Travelled {
                time: 100,
                direction: MoveDirection::Up
            }
        );

        let down = Telegram::four_bs(ADDR, [0x01, 0x2c, 0x02, 0x0a]);
        assert_eq!(
            CoverStatus::decode(&down).unwrap(),
            CoverStatus::Travelled {
                time: 300,
                direction: MoveDirection::Down
            }
        );
    }

    #[test]
    fn decode_one_bs_is_wrong_org() {
        let err = CoverStatus::decode(&Telegram::one_bs(ADDR, 0x09)).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::WrongOrg {
                profile: "G5-3F-7F",
                actual: "1BS",
                ..
            }
        ));
    }

    #[test]
    fn stop_command_layout() {
        let telegram = CoverCommand::stop().encode(ADDR);
        assert_eq!(telegram.radio().unwrap().data, [0x00, 0x00, 0x00, 0x08]);
        assert!(!telegram.is_learn());
    }

    #[test]
    fn command_decode_rejects_unknown_action() {
        let telegram = Telegram::four_bs(ADDR, [0x00, 0x05, 0x07, 0x08]);
        assert!(matches!(
            CoverCommand::decode(&telegram),
            Err(ProfileError::UnexpectedPayload { .. })
        ));
        assert!(CoverCommand::decode(&Telegram::rps(ADDR, 0x01)).is_err());
    }
}
