// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switching actuator profiles (M5-38-08 status, A5-38-08 command).

use crate::error::ProfileError;
use crate::telegram::Telegram;
use crate::types::Address;

use super::{CMD_SWITCHING, DATA_TELEGRAM, expect_four_bs};

const STATUS_PROFILE: &str = "M5-38-08";
const COMMAND_PROFILE: &str = "A5-38-08";

/// Relay state reported by a switching actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchStatus {
    /// Whether the relay is closed.
    pub is_on: bool,
}

impl SwitchStatus {
    /// Decodes a status telegram.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for non-RPS telegrams and
    /// `ProfileError::UnexpectedPayload` for codes other than on/off.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let Telegram::Rps(t) = telegram else {
            return Err(ProfileError::WrongOrg {
                profile: STATUS_PROFILE,
                expected: "RPS",
                actual: telegram.kind_name(),
            });
        };
        match t.data[0] {
            0x70 => Ok(Self { is_on: true }),
            0x50 => Ok(Self { is_on: false }),
            _ => Err(ProfileError::UnexpectedPayload {
                profile: STATUS_PROFILE,
                data: t.data.to_vec(),
            }),
        }
    }
}

/// Central switching command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCommand {
    /// Requested relay state.
    pub on: bool,
}

impl SwitchCommand {
    /// Creates a switch-on command.
    #[must_use]
    pub const fn on() -> Self {
        Self { on: true }
    }

    /// Creates a switch-off command.
    #[must_use]
    pub const fn off() -> Self {
        Self { on: false }
    }

    /// Encodes the command as a 4BS telegram from `sender`.
    #[must_use]
    pub const fn encode(&self, sender: Address) -> Telegram {
        let db0 = DATA_TELEGRAM | if self.on { 0x01 } else { 0x00 };
        Telegram::four_bs(sender, [CMD_SWITCHING, 0x00, 0x00, db0])
    }

    /// Decodes a command telegram.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for non-4BS telegrams and
    /// `ProfileError::UnexpectedPayload` for other central commands.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let t = expect_four_bs(telegram, COMMAND_PROFILE)?;
        if t.data[0] != CMD_SWITCHING {
            return Err(ProfileError::UnexpectedPayload {
                profile: COMMAND_PROFILE,
                data: t.data.to_vec(),
            });
        }
        Ok(Self {
            on: t.data[3] & 0x01 == 0x01,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Address = Address::new([0, 0, 0, 0x0c]);

    #[test]
    fn decode_status() {
        assert!(SwitchStatus::decode(&Telegram::rps(ADDR, 0x70)).unwrap().is_on);
        assert!(!SwitchStatus::decode(&Telegram::rps(ADDR, 0x50)).unwrap().is_on);
    }

    #[test]
    fn decode_status_rejects_other_codes() {
        assert!(matches!(
            SwitchStatus::decode(&Telegram::rps(ADDR, 0x30)),
            Err(ProfileError::UnexpectedPayload { .. })
        ));
        assert!(matches!(
            SwitchStatus::decode(&Telegram::four_bs(ADDR, [0; 4])),
            Err(ProfileError::WrongOrg { actual: "4BS", .. })
        ));
    }

    #[test]
    fn command_layout() {
        let on = SwitchCommand::on().encode(ADDR);
        assert_eq!(on.radio().unwrap().data, [0x01, 0x00, 0x00, 0x09]);
        let off = SwitchCommand::off().encode(ADDR);
        assert_eq!(off.radio().unwrap().data, [0x01, 0x00, 0x00, 0x08]);

        assert_eq!(SwitchCommand::decode(&on).unwrap(), SwitchCommand::on());
        assert_eq!(SwitchCommand::decode(&off).unwrap(), SwitchCommand::off());
    }
}
