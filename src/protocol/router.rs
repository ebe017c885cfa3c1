// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telegram routing for one gateway.
//!
//! The [`GatewayRouter`] turns the stream of inbound frames into
//! per-address notifications and serializes outbound telegrams onto the
//! supervised transport.
//!
//! # Dispatch
//!
//! ```text
//! Frame: A5 5A 6B 05 70 00 00 00 FF 80 80 01 30 ..
//!                     ↓
//!          Esp2Codec::decode → Telegram::Rps(FF-80-80-01)
//!                     ↓
//!          poll? ── yes ──→ discarded
//!                     ↓ no
//!          every broadcast callback, in registration order
//!                     ↓
//!          RPS/1BS/4BS with subscribers on FF-80-80-01?
//!                     ↓ yes
//!          every address callback, in registration order
//!          (profile errors are logged, dispatch continues)
//! ```
//!
//! Dispatch is synchronous: every subscriber has seen a telegram before the
//! next frame is decoded.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ProfileError;
use crate::subscription::{SubscriptionId, SubscriptionRegistry};
use crate::telegram::{Esp2Codec, FrameCodec, Telegram};
use crate::types::{Address, GatewayId};

use super::ConnectionSupervisor;

/// Result of an outbound send.
///
/// Sends never fail loudly: problems are logged and reported here so
/// callers can react if they care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// The frame was written to the transport.
    Sent,
    /// The connection was not up; nothing was written.
    Dropped,
    /// The transport rejected the write.
    Failed,
    /// The command was a no-op and nothing needed sending.
    Skipped,
}

impl SendOutcome {
    /// Returns `true` if a frame reached the transport.
    #[must_use]
    pub const fn is_sent(self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Routes telegrams between the transport and subscribers.
pub struct GatewayRouter {
    gateway: GatewayId,
    registry: SubscriptionRegistry,
    codec: Box<dyn FrameCodec>,
    supervisor: ConnectionSupervisor,
    message_delay: Duration,
    send_lock: tokio::sync::Mutex<()>,
}

impl GatewayRouter {
    /// Creates a router sending through `supervisor`.
    ///
    /// Every outbound telegram is followed by a pause of `message_delay`
    /// before the next one may be written.
    #[must_use]
    pub fn new(gateway: GatewayId, supervisor: ConnectionSupervisor, message_delay: Duration) -> Self {
        Self {
            gateway,
            registry: SubscriptionRegistry::new(),
            codec: Box::new(Esp2Codec::new()),
            supervisor,
            message_delay,
            send_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the frame codec.
    #[must_use]
    pub fn with_codec(mut self, codec: impl FrameCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Returns the gateway this router belongs to.
    #[must_use]
    pub fn gateway(&self) -> GatewayId {
        self.gateway
    }

    /// Returns the supervisor outbound telegrams go through.
    #[must_use]
    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    /// Returns the subscription registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Registers a callback for telegrams from `address`.
    pub fn subscribe<F>(&self, address: Address, callback: F) -> SubscriptionId
    where
        F: Fn(&Telegram) -> Result<(), ProfileError> + Send + Sync + 'static,
    {
        tracing::debug!(gateway = %self.gateway, address = %address, "Registering address subscriber");
        self.registry.subscribe(address, callback)
    }

    /// Registers a callback for every accepted telegram.
    pub fn subscribe_broadcast<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Telegram) + Send + Sync + 'static,
    {
        self.registry.subscribe_broadcast(callback)
    }

    /// Removes a subscription. Unknown handles are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    /// Decodes a raw frame and dispatches it.
    ///
    /// Malformed frames are logged and dropped.
    pub fn receive_frame(&self, frame: &[u8]) {
        match self.codec.decode(frame) {
            Ok(telegram) => self.dispatch(&telegram),
            Err(e) => {
                tracing::warn!(
                    gateway = %self.gateway,
                    error = %e,
                    frame = ?frame,
                    "Discarding malformed frame"
                );
            }
        }
    }

    /// Delivers one telegram to its subscribers.
    pub fn dispatch(&self, telegram: &Telegram) {
        if telegram.is_poll() {
            tracing::trace!(gateway = %self.gateway, address = %telegram.address(), "Ignoring poll");
            return;
        }

        tracing::debug!(gateway = %self.gateway, telegram = %telegram, "Received telegram");

        for callback in self.registry.broadcast_callbacks() {
            callback(telegram);
        }

        if !telegram.is_routable() {
            return;
        }

        let address = telegram.address();
        let callbacks = self.registry.address_callbacks(&address);
        if callbacks.is_empty() {
            tracing::trace!(gateway = %self.gateway, address = %address, "No subscriber for address");
            return;
        }

        for callback in callbacks {
            if let Err(e) = callback(telegram) {
                tracing::warn!(
                    gateway = %self.gateway,
                    address = %address,
                    error = %e,
                    "Could not decode telegram"
                );
            }
        }
    }

    /// Encodes and writes one telegram.
    ///
    /// Only permitted while the connection is up; otherwise the telegram is
    /// dropped with a warning. Sends are serialized and each is followed by
    /// the configured inter-message delay.
    pub async fn send(&self, telegram: &Telegram) -> SendOutcome {
        if !self.supervisor.is_up() {
            tracing::warn!(
                gateway = %self.gateway,
                telegram = %telegram,
                status = %self.supervisor.status(),
                "Gateway not connected, dropping telegram"
            );
            return SendOutcome::Dropped;
        }

        let _guard = self.send_lock.lock().await;
        let frame = self.codec.encode(telegram);
        tracing::debug!(gateway = %self.gateway, telegram = %telegram, frame = ?frame, "Sending telegram");

        let outcome = match self.supervisor.send_frame(&frame) {
            Ok(()) => SendOutcome::Sent,
            Err(e) => {
                tracing::warn!(
                    gateway = %self.gateway,
                    telegram = %telegram,
                    error = %e,
                    "Failed to send telegram"
                );
                SendOutcome::Failed
            }
        };

        if !self.message_delay.is_zero() {
            tokio::time::sleep(self.message_delay).await;
        }
        outcome
    }
}

impl fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("gateway", &self.gateway)
            .field("registry", &self.registry)
            .field("status", &self.supervisor.status())
            .field("message_delay", &self.message_delay)
            .finish_non_exhaustive()
    }
}
