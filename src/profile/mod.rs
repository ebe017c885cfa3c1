// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Equipment profiles.
//!
//! A profile is the schema that gives meaning to a telegram's data bytes for
//! one class of device. Decoding happens inside the device handler that
//! subscribed to an address, never in the router: the router only knows
//! telegram kinds, the handler knows which profile its device speaks.
//!
//! | Profile  | Direction | Org      | Record            |
//! |----------|-----------|----------|-------------------|
//! | G5-3F-7F | inbound   | RPS, 4BS | [`CoverStatus`]   |
//! | H5-3F-7F | outbound  | 4BS      | [`CoverCommand`]  |
//! | M5-38-08 | inbound   | RPS      | [`SwitchStatus`]  |
//! | A5-38-08 | outbound  | 4BS      | [`SwitchCommand`] |
//! | A5-38-08 | both      | 4BS      | [`DimmerCommand`], [`DimmerStatus`] |
//! | D5-00-01 | inbound   | 1BS      | [`ContactStatus`] |
//! | F6-10-00 | inbound   | RPS      | [`HandlePosition`] |

mod cover;
mod dimmer;
mod sensor;
mod switch;

pub use cover::{CoverAction, CoverCommand, CoverStatus, MoveDirection};
pub use dimmer::{DimmerCommand, DimmerStatus};
pub use sensor::{ContactStatus, HandlePosition};
pub use switch::{SwitchCommand, SwitchStatus};

use crate::error::ProfileError;
use crate::telegram::{RadioTelegram, Telegram};

/// A5-38-08 central command identifier for "switching".
pub(crate) const CMD_SWITCHING: u8 = 0x01;

/// A5-38-08 central command identifier for "dimming".
pub(crate) const CMD_DIMMING: u8 = 0x02;

/// Learn bit in DB0: set for data telegrams, cleared for teach-in.
pub(crate) const DATA_TELEGRAM: u8 = 0x08;

/// Returns the payload if the telegram is a 4BS, else a `WrongOrg` error.
pub(crate) fn expect_four_bs(
    telegram: &Telegram,
    profile: &'static str,
) -> Result<RadioTelegram, ProfileError> {
    match telegram {
        Telegram::FourBs(t) => Ok(*t),
        other => Err(ProfileError::WrongOrg {
            profile,
            expected: "4BS",
            actual: other.kind_name(),
        }),
    }
}
