// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Failures inside the routing core are absorbed and logged; the types here
//! surface at the edges: validating configuration values, decoding frames,
//! decoding equipment-profile payloads and talking to the transport.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A telegram payload did not match the expected equipment profile.
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// A raw frame could not be decoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// An address string is not in `XX-XX-XX-XX` hex notation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Decode mismatch between a telegram and an equipment profile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// The telegram's organisation is not one the profile accepts.
    #[error("{profile} cannot decode {actual} telegram (expected {expected})")]
    WrongOrg {
        /// Profile that attempted the decode.
        profile: &'static str,
        /// Organisations the profile accepts.
        expected: &'static str,
        /// Organisation of the telegram.
        actual: &'static str,
    },

    /// The payload carries a value the profile does not define.
    #[error("{profile}: unexpected payload {data:02x?}")]
    UnexpectedPayload {
        /// Profile that attempted the decode.
        profile: &'static str,
        /// The offending data bytes.
        data: Vec<u8>,
    },
}

/// Errors raised while decoding raw frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than a complete frame.
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// The frame does not start with the sync bytes.
    #[error("missing sync bytes")]
    MissingSync,

    /// Checksum mismatch.
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum {
        /// Checksum computed over the frame.
        expected: u8,
        /// Checksum carried by the frame.
        actual: u8,
    },
}

/// Errors related to the physical transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport is not running.
    #[error("transport is not active")]
    NotActive,

    /// The port could not be opened.
    #[error("failed to open {port}: {message}")]
    Open {
        /// Serial port path.
        port: String,
        /// Description of the failure.
        message: String,
    },

    /// Reading or writing failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required setting is missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 1,
            max: 255,
            actual: 0,
        };
        assert_eq!(err.to_string(), "value 0 is out of range [1, 255]");
    }

    #[test]
    fn error_from_profile_error() {
        let profile_err = ProfileError::WrongOrg {
            profile: "G5-3F-7F",
            expected: "RPS or 4BS",
            actual: "1BS",
        };
        let err: Error = profile_err.into();
        assert!(matches!(err, Error::Profile(ProfileError::WrongOrg { .. })));
    }

    #[test]
    fn profile_error_display() {
        let err = ProfileError::WrongOrg {
            profile: "M5-38-08",
            expected: "RPS",
            actual: "4BS",
        };
        assert_eq!(
            err.to_string(),
            "M5-38-08 cannot decode 4BS telegram (expected RPS)"
        );
    }

    #[test]
    fn frame_error_display() {
        let err = FrameError::Checksum {
            expected: 0x1a,
            actual: 0x00,
        };
        assert_eq!(err.to_string(), "checksum mismatch: expected 0x1a, got 0x00");
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::Open {
            port: "/dev/ttyUSB0".to_string(),
            message: "no such file".to_string(),
        };
        assert_eq!(err.to_string(), "failed to open /dev/ttyUSB0: no such file");
    }
}
