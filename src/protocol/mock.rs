// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport for tests and simulations.
//!
//! A [`MockBus`] stands in for the physical bus. Its [`factory`] builds
//! [`MockTransport`]s the supervisor can start, stop and rebuild; the bus
//! records every frame they send and lets callers inject inbound frames or
//! drop the link.
//!
//! [`factory`]: MockBus::factory
//!
//! # Examples
//!
//! ```
//! use eltako_bridge::protocol::{MockBus, Transport, TransportSettings};
//! use std::sync::Arc;
//!
//! let bus = MockBus::new();
//! let transport = (bus.factory())(TransportSettings {
//!     port: "/dev/null".to_string(),
//!     baud_rate: 57_600,
//!     on_frame: Arc::new(|_| {}),
//!     on_status: Arc::new(|_| {}),
//! });
//!
//! transport.start().unwrap();
//! transport.send(&[0xa5, 0x5a]).unwrap();
//! assert_eq!(bus.sent_frames().len(), 1);
//! assert_eq!(bus.live_count(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::telegram::{Esp2Codec, FrameCodec, Telegram};

use super::{Transport, TransportFactory, TransportSettings};

/// Simulated bus shared by all transports built from its factory.
#[derive(Clone, Default)]
pub struct MockBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    link_down: AtomicBool,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<Vec<u8>>>,
    current: Mutex<Option<Arc<MockLink>>>,
    created: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

struct MockLink {
    settings: TransportSettings,
    active: AtomicBool,
}

impl BusInner {
    fn deactivate(&self, link: &Arc<MockLink>) -> bool {
        if !link.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.live.fetch_sub(1, Ordering::AcqRel);
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, link)) {
            *current = None;
        }
        true
    }
}

impl MockBus {
    /// Creates a bus with the link available.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a factory that builds transports attached to this bus.
    #[must_use]
    pub fn factory(&self) -> TransportFactory {
        let bus = self.clone();
        Arc::new(move |settings| {
            bus.inner.created.fetch_add(1, Ordering::AcqRel);
            Box::new(MockTransport {
                bus: Arc::clone(&bus.inner),
                link: Arc::new(MockLink {
                    settings,
                    active: AtomicBool::new(false),
                }),
            }) as Box<dyn Transport>
        })
    }

    /// Delivers a raw frame through the active transport.
    ///
    /// Returns `false` if no transport is active.
    pub fn inject(&self, frame: &[u8]) -> bool {
        let link = self.inner.current.lock().clone();
        match link {
            Some(link) if link.active.load(Ordering::Acquire) => {
                (link.settings.on_frame)(frame);
                true
            }
            _ => false,
        }
    }

    /// Encodes a telegram as an ESP2 frame and delivers it.
    pub fn inject_telegram(&self, telegram: &Telegram) -> bool {
        self.inject(&Esp2Codec::new().encode(telegram))
    }

    /// Makes the link unavailable and takes the active transport down.
    ///
    /// Transports started while the link is down fail to open.
    pub fn drop_link(&self) {
        self.inner.link_down.store(true, Ordering::Release);
        let link = self.inner.current.lock().clone();
        if let Some(link) = link
            && self.inner.deactivate(&link)
        {
            (link.settings.on_status)(false);
        }
    }

    /// Makes the link available again for future starts.
    pub fn restore_link(&self) {
        self.inner.link_down.store(false, Ordering::Release);
    }

    /// Makes every send fail with an I/O error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.fail_sends.store(fail, Ordering::Release);
    }

    /// Returns all frames sent so far, oldest first.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.inner.sent.lock().clone()
    }

    /// Decodes all frames sent so far.
    ///
    /// Frames that fail to decode are skipped.
    #[must_use]
    pub fn sent_telegrams(&self) -> Vec<Telegram> {
        let codec = Esp2Codec::new();
        self.inner
            .sent
            .lock()
            .iter()
            .filter_map(|frame| codec.decode(frame).ok())
            .collect()
    }

    /// Forgets all recorded frames.
    pub fn clear_sent(&self) {
        self.inner.sent.lock().clear();
    }

    /// Number of transports the factory has built.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.inner.created.load(Ordering::Acquire)
    }

    /// Number of transports currently active.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Highest number of simultaneously active transports seen.
    #[must_use]
    pub fn max_live_count(&self) -> usize {
        self.inner.max_live.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MockBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBus")
            .field("created", &self.created_count())
            .field("live", &self.live_count())
            .field("sent", &self.inner.sent.lock().len())
            .finish()
    }
}

/// Transport attached to a [`MockBus`].
pub struct MockTransport {
    bus: Arc<BusInner>,
    link: Arc<MockLink>,
}

impl Transport for MockTransport {
    fn start(&self) -> Result<(), TransportError> {
        if self.bus.link_down.load(Ordering::Acquire) {
            return Err(TransportError::Open {
                port: self.link.settings.port.clone(),
                message: "link unavailable".to_string(),
            });
        }
        if self.link.active.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let live = self.bus.live.fetch_add(1, Ordering::AcqRel) + 1;
        self.bus.max_live.fetch_max(live, Ordering::AcqRel);
        *self.bus.current.lock() = Some(Arc::clone(&self.link));
        (self.link.settings.on_status)(true);
        Ok(())
    }

    fn stop(&self) {
        if self.bus.deactivate(&self.link) {
            (self.link.settings.on_status)(false);
        }
    }

    fn join(&self) {}

    fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.is_active() {
            return Err(TransportError::NotActive);
        }
        if self.bus.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }
        self.bus.sent.lock().push(frame.to_vec());
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.link.active.load(Ordering::Acquire)
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.bus.deactivate(&self.link);
    }
}
