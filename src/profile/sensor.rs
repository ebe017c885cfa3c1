// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor profiles (D5-00-01 contact, F6-10-00 window handle).

use crate::error::ProfileError;
use crate::telegram::Telegram;

const CONTACT_PROFILE: &str = "D5-00-01";
const HANDLE_PROFILE: &str = "F6-10-00";

/// Report of a single-input contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactStatus {
    /// Whether the contact is closed.
    pub closed: bool,
}

impl ContactStatus {
    /// Decodes a 1BS contact telegram (bit 0 of DB0).
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for any telegram that is not 1BS.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let Telegram::OneBs(t) = telegram else {
            return Err(ProfileError::WrongOrg {
                profile: CONTACT_PROFILE,
                expected: "1BS",
                actual: telegram.kind_name(),
            });
        };
        Ok(Self {
            closed: t.data[0] & 0x01 != 0,
        })
    }
}

/// Position of a window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlePosition {
    /// Pointing down.
    Closed,
    /// Horizontal.
    Open,
    /// Pointing up.
    Tilted,
}

impl HandlePosition {
    /// Decodes an RPS window handle telegram (upper nibble of DB0).
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` for non-RPS telegrams and
    /// `ProfileError::UnexpectedPayload` for undefined positions.
    pub fn decode(telegram: &Telegram) -> Result<Self, ProfileError> {
        let Telegram::Rps(t) = telegram else {
            return Err(ProfileError::WrongOrg {
                profile: HANDLE_PROFILE,
                expected: "RPS",
                actual: telegram.kind_name(),
            });
        };
        match t.data[0] & 0xf0 {
            0xf0 => Ok(Self::Closed),
            0xd0 => Ok(Self::Tilted),
            0xc0 | 0xe0 => Ok(Self::Open),
            _ => Err(ProfileError::UnexpectedPayload {
                profile: HANDLE_PROFILE,
                data: t.data.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    const ADDR: Address = Address::new([0, 0, 0, 0x0e]);

    #[test]
    fn contact_bit() {
        assert!(ContactStatus::decode(&Telegram::one_bs(ADDR, 0x09)).unwrap().closed);
        assert!(!ContactStatus::decode(&Telegram::one_bs(ADDR, 0x08)).unwrap().closed);
    }

    #[test]
    fn contact_rejects_rps() {
        assert!(matches!(
            ContactStatus::decode(&Telegram::rps(ADDR, 0x01)),
            Err(ProfileError::WrongOrg {
                profile: "D5-00-01",
                ..
            })
        ));
    }

    #[test]
    fn handle_positions() {
        let cases = [
            (0xf0, HandlePosition::Closed),
            (0xd0, HandlePosition::Tilted),
            (0xc0, HandlePosition::Open),
            (0xe0, HandlePosition::Open),
        ];
        for (code, expected) in cases {
            assert_eq!(
                HandlePosition::decode(&Telegram::rps(ADDR, code)).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn handle_rejects_undefined_codes() {
        assert!(matches!(
            HandlePosition::decode(&Telegram::rps(ADDR, 0x70)),
            Err(ProfileError::UnexpectedPayload { .. })
        ));
        assert!(HandlePosition::decode(&Telegram::one_bs(ADDR, 0x09)).is_err());
    }
}
