// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport, routing and connection supervision.
//!
//! # Architecture
//!
//! ```text
//! Transport (serial reader thread / mock)
//!        ↓ raw frame
//! GatewayRouter.receive_frame()
//!        ↓ Esp2Codec::decode
//! GatewayRouter.dispatch()
//!        ├── broadcast callbacks (every accepted telegram)
//!        └── address callbacks (source address match)
//!                 ↓
//!           Cover / Switch handlers
//! ```
//!
//! Outbound telegrams take the opposite path: a device asks the router to
//! send, the router checks the [`ConnectionSupervisor`] is up, encodes the
//! telegram and writes it to the current transport.

mod mock;
mod router;
#[cfg(feature = "serial")]
mod serial;
mod supervisor;

pub use mock::{MockBus, MockTransport};
pub use router::{GatewayRouter, SendOutcome};
#[cfg(feature = "serial")]
pub use serial::{SerialTransport, serial_factory};
pub use supervisor::{ConnectionCallback, ConnectionStatus, ConnectionSupervisor};

use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;

/// Handler invoked with every raw frame a transport reads.
pub type FrameHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Handler invoked when a transport comes up (`true`) or goes down (`false`).
pub type StatusHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Builds a fresh transport for the given settings.
///
/// The supervisor calls the factory once on start and once per reconnect.
pub type TransportFactory = Arc<dyn Fn(TransportSettings) -> Box<dyn Transport> + Send + Sync>;

/// A byte-stream duplex to the gateway hardware.
///
/// Implementations deliver frames and status changes through the handlers
/// in their [`TransportSettings`], usually from a background thread.
pub trait Transport: Send + Sync {
    /// Opens the link and starts background I/O.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the link cannot be opened.
    fn start(&self) -> Result<(), TransportError>;

    /// Asks background I/O to finish.
    fn stop(&self);

    /// Waits until background I/O has finished.
    fn join(&self);

    /// Writes one encoded frame.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the transport is inactive or the write
    /// fails.
    fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Returns `true` while the link is usable.
    fn is_active(&self) -> bool;
}

/// Everything a transport needs to be built.
#[derive(Clone)]
pub struct TransportSettings {
    /// Serial device path.
    pub port: String,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Receives raw inbound frames.
    pub on_frame: FrameHandler,
    /// Receives status changes.
    pub on_status: StatusHandler,
}

impl fmt::Debug for TransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSettings")
            .field("port", &self.port)
            .field("baud_rate", &self.baud_rate)
            .finish_non_exhaustive()
    }
}
