// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection supervision for one gateway.
//!
//! The [`ConnectionSupervisor`] owns the gateway's transport. It builds a
//! fresh transport from the factory on start and on every reconnect,
//! tracks the link status reported by the transport, and rebuilds the
//! transport in the background when the link drops and automatic
//! reconnection is enabled.
//!
//! # States
//!
//! ```text
//!            start / reconnect
//!   DOWN ───────────────────────→ (transport reports up) ──→ UP
//!    ↑                                                       │
//!    │ stop (terminal)             transport reports down    │
//!    │                                                       ↓
//!    └──────── auto-reconnect off ─────────────── RECONNECTING
//!                                  (wait, then rebuild transport)
//! ```
//!
//! Every transport is tagged with a generation number. Status reports from
//! a transport that has since been replaced are ignored, so a stale
//! "down" from a transport being torn down never leaks into the current
//! status.
//!
//! Connection-state observers are never called while a start, reconnect
//! or stop holds the lifecycle lock, so an observer may itself call
//! [`ConnectionSupervisor::reconnect`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::error::TransportError;
use crate::subscription::{CallbackList, SubscriptionId};
use crate::types::GatewayId;

use super::{FrameHandler, Transport, TransportFactory, TransportSettings};

/// Callback receiving the connection state (`true` = up).
pub type ConnectionCallback = dyn Fn(bool) + Send + Sync;

/// Connection status of a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No usable link.
    #[default]
    Down,
    /// The transport reported the link up.
    Up,
    /// The link dropped and an automatic reconnect is pending.
    Reconnecting,
}

impl ConnectionStatus {
    /// Returns `true` only for [`ConnectionStatus::Up`].
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }

    /// Returns the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Start,
    Manual,
    Automatic,
}

impl Trigger {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Manual => "reconnect",
            Self::Automatic => "auto-reconnect",
        }
    }
}

/// Owns and supervises the transport of one gateway.
///
/// Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    gateway: GatewayId,
    port: String,
    baud_rate: u32,
    auto_reconnect: bool,
    reconnect_interval: Duration,
    factory: TransportFactory,
    on_frame: FrameHandler,
    /// Serializes start, reconnect and stop.
    lifecycle: Mutex<()>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    generation: AtomicU64,
    status: RwLock<ConnectionStatus>,
    stopped: AtomicBool,
    observers: CallbackList<ConnectionCallback>,
    /// Up/down changes not yet delivered to observers.
    pending: Mutex<VecDeque<bool>>,
    notifying: Mutex<()>,
    retry_tx: Mutex<Option<mpsc::UnboundedSender<u64>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor for the gateway described by `config`.
    ///
    /// Nothing is opened until [`start`](Self::start) is called. Inbound
    /// frames from every transport the supervisor builds go to `on_frame`.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        gateway: GatewayId,
        factory: TransportFactory,
        on_frame: FrameHandler,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                gateway,
                port: config.serial_port.clone(),
                baud_rate: config.model.baud_rate(),
                auto_reconnect: config.auto_reconnect,
                reconnect_interval: config.reconnect_interval(),
                factory,
                on_frame,
                lifecycle: Mutex::new(()),
                transport: Mutex::new(None),
                generation: AtomicU64::new(0),
                status: RwLock::new(ConnectionStatus::Down),
                stopped: AtomicBool::new(false),
                observers: CallbackList::new(),
                pending: Mutex::new(VecDeque::new()),
                notifying: Mutex::new(()),
                retry_tx: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Builds and starts the first transport.
    ///
    /// The status follows the transport's first report. Calling `start`
    /// on a running supervisor does nothing.
    ///
    /// Automatic reconnection needs a Tokio runtime; without one, a lost
    /// link stays down until [`reconnect`](Self::reconnect) is called.
    pub fn start(&self) {
        if self.inner.transport.lock().is_some() {
            tracing::debug!(gateway = %self.inner.gateway, "Supervisor already started");
            return;
        }
        self.spawn_worker();
        self.inner.restart(Trigger::Start);
    }

    /// Replaces the current transport with a fresh one.
    ///
    /// Safe to call in any state and repeatedly; the old transport is
    /// stopped and joined before the new one starts, so at most one
    /// transport is ever active. Ignored after [`stop`](Self::stop).
    pub fn reconnect(&self) {
        self.inner.restart(Trigger::Manual);
    }

    /// Stops the transport and waits for its background I/O.
    ///
    /// The supervisor ends DOWN and never reconnects again.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.retry_tx.lock().take();
        if let Some(worker) = self.inner.worker.lock().take() {
            worker.abort();
        }

        {
            let _guard = self.inner.lifecycle.lock();
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
            let transport = self.inner.transport.lock().take();
            if let Some(transport) = transport {
                transport.stop();
                transport.join();
            }
            self.inner.set_status(ConnectionStatus::Down);
        }
        self.inner.notify_observers();
        tracing::info!(
            gateway = %self.inner.gateway,
            port = %self.inner.port,
            "Gateway connection stopped"
        );
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.read()
    }

    /// Returns `true` while the link is up.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status().is_up()
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Registers an observer of the connection state.
    ///
    /// The observer is called immediately with the current state, then on
    /// every change between up and down.
    pub fn register_connection_state_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let callback: Arc<ConnectionCallback> = Arc::new(callback);
        let id = self.inner.observers.insert(Arc::clone(&callback));
        callback(self.is_up());
        id
    }

    /// Removes a connection-state observer.
    ///
    /// Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.remove(id)
    }

    /// Writes one frame to the current transport.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotActive` if there is no transport, or the
    /// transport's own error if the write fails.
    pub fn send_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        let transport = self.inner.transport.lock().clone();
        transport.ok_or(TransportError::NotActive)?.send(frame)
    }

    /// Returns the number of transports built so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    fn spawn_worker(&self) {
        if !self.inner.auto_reconnect {
            return;
        }
        let mut worker = self.inner.worker.lock();
        if worker.is_some() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                gateway = %self.inner.gateway,
                "No Tokio runtime available, automatic reconnect disabled"
            );
            return;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.retry_tx.lock() = Some(tx);
        *worker = Some(handle.spawn(run_reconnect_worker(
            Arc::downgrade(&self.inner),
            rx,
            self.inner.reconnect_interval,
        )));
    }
}

impl SupervisorInner {
    fn restart(self: &Arc<Self>, trigger: Trigger) {
        self.restart_locked(trigger);
        self.notify_observers();
    }

    fn restart_locked(self: &Arc<Self>, trigger: Trigger) {
        let _guard = self.lifecycle.lock();
        if self.stopped.load(Ordering::Acquire) {
            tracing::debug!(
                gateway = %self.gateway,
                trigger = trigger.as_str(),
                "Ignoring request on stopped gateway"
            );
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let previous = self.transport.lock().take();
        if let Some(previous) = previous {
            previous.stop();
            previous.join();
        }
        if *self.status.read() != ConnectionStatus::Reconnecting {
            self.set_status(ConnectionStatus::Down);
        }

        tracing::info!(
            gateway = %self.gateway,
            port = %self.port,
            baud_rate = self.baud_rate,
            generation,
            trigger = trigger.as_str(),
            "Starting gateway transport"
        );

        let transport: Arc<dyn Transport> = Arc::from((self.factory)(self.settings(generation)));
        *self.transport.lock() = Some(Arc::clone(&transport));
        if let Err(e) = transport.start() {
            tracing::warn!(
                gateway = %self.gateway,
                port = %self.port,
                error = %e,
                "Failed to start gateway transport"
            );
            self.on_transport_status(generation, false);
        }
    }

    fn settings(self: &Arc<Self>, generation: u64) -> TransportSettings {
        let weak = Arc::downgrade(self);
        TransportSettings {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            on_frame: Arc::clone(&self.on_frame),
            on_status: Arc::new(move |up| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_transport_status(generation, up);
                }
            }),
        }
    }

    fn on_transport_status(&self, generation: u64, up: bool) {
        if generation != self.generation.load(Ordering::Acquire) {
            tracing::trace!(
                gateway = %self.gateway,
                generation,
                up,
                "Ignoring status of replaced transport"
            );
            return;
        }

        if up {
            tracing::info!(gateway = %self.gateway, port = %self.port, "Gateway connected");
            self.set_status(ConnectionStatus::Up);
            return;
        }

        if self.stopped.load(Ordering::Acquire) || !self.auto_reconnect {
            tracing::warn!(gateway = %self.gateway, port = %self.port, "Gateway disconnected");
            self.set_status(ConnectionStatus::Down);
            return;
        }

        let scheduled = self
            .retry_tx
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(generation).is_ok());
        if scheduled {
            tracing::warn!(
                gateway = %self.gateway,
                port = %self.port,
                retry_in = ?self.reconnect_interval,
                "Gateway disconnected, reconnect scheduled"
            );
            self.set_status(ConnectionStatus::Reconnecting);
        } else {
            tracing::warn!(gateway = %self.gateway, port = %self.port, "Gateway disconnected");
            self.set_status(ConnectionStatus::Down);
        }
    }

    /// Records a status change and queues an observer notification when
    /// the link flips between up and down.
    ///
    /// Delivery happens here only if no lifecycle operation is running;
    /// otherwise the operation delivers once it releases the lock.
    fn set_status(&self, next: ConnectionStatus) {
        {
            let mut status = self.status.write();
            let previous = std::mem::replace(&mut *status, next);
            if previous == next {
                return;
            }
            tracing::debug!(
                gateway = %self.gateway,
                from = %previous,
                to = %next,
                "Connection status changed"
            );
            if previous.is_up() != next.is_up() {
                self.pending.lock().push_back(next.is_up());
            }
        }
        if !self.lifecycle.is_locked() {
            self.notify_observers();
        }
    }

    /// Delivers queued up/down changes in order.
    ///
    /// A call made while another delivery is in progress (including one
    /// from inside an observer) returns at once; the running delivery picks
    /// up whatever was queued.
    fn notify_observers(&self) {
        loop {
            {
                let Some(_delivering) = self.notifying.try_lock() else {
                    return;
                };
                loop {
                    let next = self.pending.lock().pop_front();
                    let Some(up) = next else { break };
                    for observer in self.observers.snapshot() {
                        observer(up);
                    }
                }
            }
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }
}

impl Drop for SupervisorInner {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.abort();
        }
        if let Some(transport) = self.transport.get_mut().take() {
            transport.stop();
        }
    }
}

async fn run_reconnect_worker(
    inner: Weak<SupervisorInner>,
    mut requests: mpsc::UnboundedReceiver<u64>,
    interval: Duration,
) {
    while let Some(generation) = requests.recv().await {
        tokio::time::sleep(interval).await;

        let Some(supervisor) = inner.upgrade() else {
            break;
        };
        if supervisor.stopped.load(Ordering::Acquire) {
            break;
        }
        if supervisor.generation.load(Ordering::Acquire) != generation {
            tracing::trace!(
                gateway = %supervisor.gateway,
                generation,
                "Transport already replaced, skipping auto-reconnect"
            );
            continue;
        }

        let gateway = supervisor.gateway;
        let task = tokio::task::spawn_blocking(move || supervisor.restart(Trigger::Automatic));
        if let Err(e) = task.await {
            tracing::warn!(gateway = %gateway, error = %e, "Auto-reconnect task failed");
        }
    }
}

impl fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("gateway", &self.inner.gateway)
            .field("port", &self.inner.port)
            .field("status", &self.status())
            .field("generation", &self.generation())
            .field("auto_reconnect", &self.inner.auto_reconnect)
            .finish_non_exhaustive()
    }
}
