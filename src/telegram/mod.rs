// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus telegrams.
//!
//! A [`Telegram`] is one decoded frame. The set of kinds is closed: the
//! router only forwards the payload-bearing kinds ([`Telegram::Rps`],
//! [`Telegram::OneBs`], [`Telegram::FourBs`]) to address subscribers, drops
//! bus polls, and leaves everything else to broadcast subscribers.
//!
//! Interpreting the payload is the job of an equipment profile (see
//! [`crate::profile`]), not of the telegram itself.

mod codec;

pub use codec::{Esp2Codec, FRAME_LEN, FrameCodec};

use std::fmt;

use crate::types::Address;

/// Organisation (telegram type) marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Org {
    /// Repeated switch communication (rocker/state telegrams).
    Rps,
    /// One-byte communication.
    OneBs,
    /// Four-byte communication.
    FourBs,
}

impl Org {
    /// Returns the ORG byte used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Rps => 0x05,
            Self::OneBs => 0x06,
            Self::FourBs => 0x07,
        }
    }

    /// Parses an ORG byte.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x05 => Some(Self::Rps),
            0x06 => Some(Self::OneBs),
            0x07 => Some(Self::FourBs),
            _ => None,
        }
    }

    /// Short human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rps => "RPS",
            Self::OneBs => "1BS",
            Self::FourBs => "4BS",
        }
    }
}

impl fmt::Display for Org {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a data-carrying telegram.
///
/// `data` holds the four data bytes DB3..DB0 in wire order. RPS and 1BS
/// telegrams only use `data[0]`; the rest is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RadioTelegram {
    /// Source address (or target address for outbound telegrams).
    pub address: Address,
    /// Data bytes DB3..DB0.
    pub data: [u8; 4],
    /// Status byte.
    pub status: u8,
    /// `true` when the telegram was wrapped by a bus device rather than
    /// received over the air.
    pub wrapped: bool,
}

impl RadioTelegram {
    /// Creates a regular (not wrapped) telegram.
    #[must_use]
    pub const fn new(address: Address, data: [u8; 4], status: u8) -> Self {
        Self {
            address,
            data,
            status,
            wrapped: false,
        }
    }
}

/// One decoded bus telegram.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Telegram {
    /// Bus keep-alive/poll frame. Never forwarded to subscribers.
    Poll {
        /// Address being polled.
        address: Address,
    },
    /// RPS telegram.
    Rps(RadioTelegram),
    /// 1BS telegram.
    OneBs(RadioTelegram),
    /// 4BS telegram.
    FourBs(RadioTelegram),
    /// Any other organisation; seen by broadcast subscribers only.
    Other {
        /// Raw ORG byte.
        org: u8,
        /// Address carried by the frame.
        address: Address,
        /// Data bytes.
        data: [u8; 4],
    },
}

impl Telegram {
    /// Creates a regular RPS telegram carrying a single data byte.
    #[must_use]
    pub const fn rps(address: Address, value: u8) -> Self {
        Self::Rps(RadioTelegram::new(address, [value, 0, 0, 0], 0x30))
    }

    /// Creates a regular 1BS telegram.
    #[must_use]
    pub const fn one_bs(address: Address, value: u8) -> Self {
        Self::OneBs(RadioTelegram::new(address, [value, 0, 0, 0], 0x00))
    }

    /// Creates a regular 4BS telegram.
    #[must_use]
    pub const fn four_bs(address: Address, data: [u8; 4]) -> Self {
        Self::FourBs(RadioTelegram::new(address, data, 0x00))
    }

    /// Returns the source address.
    #[must_use]
    pub const fn address(&self) -> Address {
        match self {
            Self::Poll { address } | Self::Other { address, .. } => *address,
            Self::Rps(t) | Self::OneBs(t) | Self::FourBs(t) => t.address,
        }
    }

    /// Returns the organisation of a payload-bearing telegram.
    #[must_use]
    pub const fn org(&self) -> Option<Org> {
        match self {
            Self::Rps(_) => Some(Org::Rps),
            Self::OneBs(_) => Some(Org::OneBs),
            Self::FourBs(_) => Some(Org::FourBs),
            Self::Poll { .. } | Self::Other { .. } => None,
        }
    }

    /// Short name of the telegram kind, for logs and errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Poll { .. } => "poll",
            Self::Other { .. } => "other",
            Self::Rps(_) => Org::Rps.name(),
            Self::OneBs(_) => Org::OneBs.name(),
            Self::FourBs(_) => Org::FourBs.name(),
        }
    }

    /// Returns the payload of a payload-bearing telegram.
    #[must_use]
    pub const fn radio(&self) -> Option<&RadioTelegram> {
        match self {
            Self::Rps(t) | Self::OneBs(t) | Self::FourBs(t) => Some(t),
            Self::Poll { .. } | Self::Other { .. } => None,
        }
    }

    /// Returns `true` for bus keep-alive/poll frames.
    #[must_use]
    pub const fn is_poll(&self) -> bool {
        matches!(self, Self::Poll { .. })
    }

    /// Returns `true` for the kinds that are routed to address subscribers.
    #[must_use]
    pub const fn is_routable(&self) -> bool {
        self.radio().is_some()
    }

    /// Returns `true` for teach-in (learn) telegrams.
    ///
    /// 1BS and 4BS telegrams carry the learn flag in bit 3 of DB0, where a
    /// cleared bit means learn. RPS telegrams never are.
    #[must_use]
    pub const fn is_learn(&self) -> bool {
        match self {
            Self::OneBs(t) => t.data[0] & 0x08 == 0,
            Self::FourBs(t) => t.data[3] & 0x08 == 0,
            _ => false,
        }
    }
}

impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll { address } => write!(f, "Poll({address})"),
            Self::Other { org, address, data } => {
                write!(f, "Other(org={org:#04x}, {address}, {data:02x?})")
            }
            Self::Rps(t) | Self::OneBs(t) | Self::FourBs(t) => write!(
                f,
                "{}({}, {:02x?}, status={:#04x}{})",
                self.kind_name(),
                t.address,
                t.data,
                t.status,
                if t.wrapped { ", wrapped" } else { "" }
            ),
        }
    }
}
