// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receive-only binary sensors: contacts and window handles.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{BinarySensorConfig, SensorKind};
use crate::error::ProfileError;
use crate::profile::{ContactStatus, HandlePosition};
use crate::protocol::GatewayRouter;
use crate::state::BinarySensorState;
use crate::subscription::{CallbackList, Subscribable, SubscriptionId};
use crate::telegram::Telegram;
use crate::types::Address;

/// Callback receiving a sensor's new state.
pub type BinarySensorCallback = dyn Fn(&BinarySensorState) + Send + Sync;

/// A binary sensor attached to a gateway.
///
/// What counts as "on" depends on the configured [`SensorKind`]. Cheap to
/// clone; clones share state.
#[derive(Clone)]
pub struct BinarySensor {
    inner: Arc<SensorInner>,
}

struct SensorInner {
    config: BinarySensorConfig,
    router: Arc<GatewayRouter>,
    state: RwLock<BinarySensorState>,
    observers: CallbackList<BinarySensorCallback>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl BinarySensor {
    /// Creates a sensor and subscribes it to its address on `router`.
    #[must_use]
    pub fn new(config: BinarySensorConfig, router: Arc<GatewayRouter>) -> Self {
        let inner = Arc::new(SensorInner {
            config,
            router,
            state: RwLock::new(BinarySensorState::new()),
            observers: CallbackList::new(),
            subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let id = inner.router.subscribe(config.address, move |telegram| {
            weak.upgrade()
                .map_or(Ok(()), |inner| inner.handle_telegram(telegram))
        });
        *inner.subscription.lock() = Some(id);

        Self { inner }
    }

    /// Address the sensor reports from.
    #[must_use]
    pub fn address(&self) -> Address {
        self.inner.config.address
    }

    /// How the sensor's telegrams are read.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.inner.config.kind
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> BinarySensorState {
        *self.inner.state.read()
    }

    /// Current reading, `None` until the first report.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.inner.state.read().is_on
    }

    /// Applies one telegram from the sensor's address.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if the telegram does not match the sensor's
    /// profile.
    pub fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        self.inner.handle_telegram(telegram)
    }

    /// Stops listening on the sensor's address.
    pub fn detach(&self) -> bool {
        let id = self.inner.subscription.lock().take();
        id.is_some_and(|id| self.inner.router.unsubscribe(id))
    }
}

impl SensorInner {
    fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        let is_on = match self.config.kind {
            SensorKind::Contact => {
                if telegram.is_learn() {
                    tracing::trace!(address = %self.config.address, "Ignoring contact teach-in telegram");
                    return Ok(());
                }
                ContactStatus::decode(telegram)?.closed
            }
            SensorKind::Window => HandlePosition::decode(telegram)? != HandlePosition::Closed,
            SensorKind::WindowTilt => HandlePosition::decode(telegram)? == HandlePosition::Tilted,
        };
        tracing::debug!(
            address = %self.config.address,
            kind = ?self.config.kind,
            is_on,
            "Sensor reading received"
        );

        let changed = {
            let mut state = self.state.write();
            state.apply(is_on).then_some(*state)
        };
        if let Some(state) = changed {
            for observer in self.observers.snapshot() {
                observer(&state);
            }
        }
        Ok(())
    }
}

impl Drop for SensorInner {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().take() {
            self.router.unsubscribe(id);
        }
    }
}

impl Subscribable for BinarySensor {
    type State = BinarySensorState;

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&BinarySensorState) + Send + Sync + 'static,
    {
        self.inner.observers.insert(Arc::new(callback))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.remove(id)
    }
}

impl fmt::Debug for BinarySensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinarySensor")
            .field("address", &self.inner.config.address)
            .field("kind", &self.inner.config.kind)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
