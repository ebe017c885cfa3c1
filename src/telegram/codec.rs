// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame codec.
//!
//! ```text
//! +------+------+---------+-----+-----------+---------+--------+-----+
//! | 0xA5 | 0x5A | hseq|len| ORG | DB3..DB0  | ID3..ID0| status | chk |
//! +------+------+---------+-----+-----------+---------+--------+-----+
//!    0      1       2       3      4..8        8..12     12      13
//! ```
//!
//! `hseq` is the upper three bits of byte 2, the length (always 11) the
//! lower five. The checksum is the low byte of the sum of bytes 2..13.

use crate::error::FrameError;
use crate::types::Address;

use super::{Org, RadioTelegram, Telegram};

/// Length of one ESP2 frame in bytes.
pub const FRAME_LEN: usize = 14;

const SYNC: [u8; 2] = [0xa5, 0x5a];
const BODY_LEN: u8 = 0x0b;

/// Received radio telegram.
const HSEQ_RRT: u8 = 0b000;
/// Transmit radio telegram.
const HSEQ_TRT: u8 = 0b011;
/// Received message telegram, used by bus devices to wrap their payloads.
const HSEQ_RMT: u8 = 0b100;

/// ORG byte of the bus poll frame.
const ORG_POLL: u8 = 0xfc;

/// Turns raw frames into telegrams and back.
///
/// The router is generic over the codec so that gateways speaking other
/// framings can be plugged in.
pub trait FrameCodec: Send + Sync {
    /// Decodes a single complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the bytes are not a valid frame.
    fn decode(&self, frame: &[u8]) -> Result<Telegram, FrameError>;

    /// Encodes a telegram into a frame.
    fn encode(&self, telegram: &Telegram) -> Vec<u8>;
}

/// ESP2 framing as spoken by Eltako bus and USB gateways.
#[derive(Debug, Clone, Copy, Default)]
pub struct Esp2Codec;

impl Esp2Codec {
    /// Creates a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extracts all complete frames from the front of `buffer`.
    ///
    /// Bytes before a sync marker are discarded. An incomplete frame at the
    /// end stays in the buffer for the next read.
    pub fn split_frames(buffer: &mut Vec<u8>) -> Vec<[u8; FRAME_LEN]> {
        let mut frames = Vec::new();
        loop {
            let Some(start) = buffer.windows(2).position(|w| w == SYNC) else {
                // Keep a trailing first sync byte; drop everything else
                let keep = usize::from(buffer.last() == Some(&SYNC[0]));
                let drain_to = buffer.len() - keep;
                buffer.drain(..drain_to);
                break;
            };
            buffer.drain(..start);
            if buffer.len() < FRAME_LEN {
                break;
            }
            let mut frame = [0u8; FRAME_LEN];
            frame.copy_from_slice(&buffer[..FRAME_LEN]);
            buffer.drain(..FRAME_LEN);
            frames.push(frame);
        }
        frames
    }
}

fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

impl FrameCodec for Esp2Codec {
    fn decode(&self, frame: &[u8]) -> Result<Telegram, FrameError> {
        if frame.len() < FRAME_LEN {
            return Err(FrameError::TooShort(frame.len()));
        }
        if frame[..2] != SYNC {
            return Err(FrameError::MissingSync);
        }
        let expected = checksum(&frame[2..13]);
        if expected != frame[13] {
            return Err(FrameError::Checksum {
                expected,
                actual: frame[13],
            });
        }

        let hseq = frame[2] >> 5;
        let org = frame[3];
        let data = [frame[4], frame[5], frame[6], frame[7]];
        let address = Address::new([frame[8], frame[9], frame[10], frame[11]]);
        let status = frame[12];

        if org == ORG_POLL {
            return Ok(Telegram::Poll { address });
        }

        let Some(org) = Org::from_code(org) else {
            return Ok(Telegram::Other { org, address, data });
        };

        let radio = RadioTelegram {
            address,
            data,
            status,
            wrapped: hseq == HSEQ_RMT,
        };
        Ok(match org {
            Org::Rps => Telegram::Rps(radio),
            Org::OneBs => Telegram::OneBs(radio),
            Org::FourBs => Telegram::FourBs(radio),
        })
    }

    fn encode(&self, telegram: &Telegram) -> Vec<u8> {
        let (hseq, org, data, address, status) = match telegram {
            Telegram::Poll { address } => (HSEQ_RRT, ORG_POLL, [0; 4], *address, 0),
            Telegram::Other { org, address, data } => (HSEQ_TRT, *org, *data, *address, 0),
            Telegram::Rps(t) | Telegram::OneBs(t) | Telegram::FourBs(t) => {
                let hseq = if t.wrapped { HSEQ_RMT } else { HSEQ_TRT };
                // Safe: payload-bearing telegrams always have an org
                let org = telegram.org().map_or(0, Org::code);
                (hseq, org, t.data, t.address, t.status)
            }
        };

        let mut frame = Vec::with_capacity(FRAME_LEN);
        frame.extend_from_slice(&SYNC);
        frame.push((hseq << 5) | BODY_LEN);
        frame.push(org);
        frame.extend_from_slice(&data);
        frame.extend_from_slice(address.as_bytes());
        frame.push(status);
        frame.push(checksum(&frame[2..]));
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Address = Address::new([0x00, 0x00, 0x00, 0x0b]);

    fn frame(hseq: u8, org: u8, data: [u8; 4], id: [u8; 4], status: u8) -> Vec<u8> {
        let mut f = vec![0xa5, 0x5a, (hseq << 5) | 0x0b, org];
        f.extend_from_slice(&data);
        f.extend_from_slice(&id);
        f.push(status);
        let chk = checksum(&f[2..]);
        f.push(chk);
        f
    }

    #[test]
    fn decode_received_four_bs() {
        let raw = frame(HSEQ_RRT, 0x07, [0x00, 0x64, 0x01, 0x0a], [0, 0, 0, 0x0b], 0x00);
        let telegram = Esp2Codec.decode(&raw).unwrap();
        let Telegram::FourBs(t) = telegram else {
            panic!("expected 4BS, got {telegram:?}");
        };
        assert_eq!(t.address, ADDR);
        assert_eq!(t.data, [0x00, 0x64, 0x01, 0x0a]);
        assert!(!t.wrapped);
    }

    #[test]
    fn decode_wrapped_rps() {
        let raw = frame(HSEQ_RMT, 0x05, [0x70, 0, 0, 0], [0, 0, 0, 0x0b], 0x30);
        let Telegram::Rps(t) = Esp2Codec.decode(&raw).unwrap() else {
            panic!("expected RPS");
        };
        assert!(t.wrapped);
        assert_eq!(t.data[0], 0x70);
        assert_eq!(t.status, 0x30);
    }

    #[test]
    fn decode_poll() {
        let raw = frame(HSEQ_RRT, ORG_POLL, [0; 4], [0, 0, 0, 0x0b], 0);
        assert_eq!(
            Esp2Codec.decode(&raw).unwrap(),
            Telegram::Poll { address: ADDR }
        );
    }

    #[test]
    fn decode_unknown_org() {
        let raw = frame(HSEQ_RRT, 0xf0, [1, 2, 3, 4], [0, 0, 0, 0x0b], 0);
        assert!(matches!(
            Esp2Codec.decode(&raw).unwrap(),
            Telegram::Other { org: 0xf0, .. }
        ));
    }

    #[test]
    fn decode_rejects_bad_frames() {
        assert_eq!(
            Esp2Codec.decode(&[0xa5, 0x5a]),
            Err(FrameError::TooShort(2))
        );

        let mut raw = frame(HSEQ_RRT, 0x07, [0; 4], [0; 4], 0);
        raw[0] = 0x00;
        assert_eq!(Esp2Codec.decode(&raw), Err(FrameError::MissingSync));

        let mut raw = frame(HSEQ_RRT, 0x07, [0; 4], [0; 4], 0);
        raw[13] = raw[13].wrapping_add(1);
        assert!(matches!(
            Esp2Codec.decode(&raw),
            Err(FrameError::Checksum { .. })
        ));
    }

    #[test]
    fn encode_command_layout() {
        let telegram = Telegram::four_bs(ADDR, [0x00, 21, 0x01, 0x08]);
        let raw = Esp2Codec.encode(&telegram);
        assert_eq!(raw.len(), FRAME_LEN);
        assert_eq!(&raw[..4], &[0xa5, 0x5a, 0x6b, 0x07]);
        assert_eq!(&raw[4..8], &[0x00, 21, 0x01, 0x08]);
        assert_eq!(&raw[8..12], ADDR.as_bytes());
        assert_eq!(Esp2Codec.decode(&raw).unwrap(), telegram);
    }

    #[test]
    fn split_frames_resyncs_and_keeps_partial() {
        let a = frame(HSEQ_RRT, 0x05, [0x50, 0, 0, 0], [0, 0, 0, 1], 0x30);
        let b = frame(HSEQ_RRT, 0x05, [0x70, 0, 0, 0], [0, 0, 0, 2], 0x30);

        let mut buffer = vec![0x00, 0x13];
        buffer.extend_from_slice(&a);
        buffer.extend_from_slice(&b[..6]);

        let frames = Esp2Codec::split_frames(&mut buffer);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_slice(), a.as_slice());
        assert_eq!(buffer, b[..6].to_vec());

        buffer.extend_from_slice(&b[6..]);
        let frames = Esp2Codec::split_frames(&mut buffer);
        assert_eq!(frames.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn split_frames_keeps_trailing_sync_byte() {
        let mut buffer = vec![0x01, 0x02, 0xa5];
        assert!(Esp2Codec::split_frames(&mut buffer).is_empty());
        assert_eq!(buffer, vec![0xa5]);
    }
}
