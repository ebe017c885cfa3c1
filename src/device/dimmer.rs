// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimming actuator.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::DimmerConfig;
use crate::error::ProfileError;
use crate::profile::{DimmerCommand, DimmerStatus};
use crate::protocol::{GatewayRouter, SendOutcome};
use crate::state::DimmerState;
use crate::subscription::{CallbackList, Subscribable, SubscriptionId};
use crate::telegram::Telegram;
use crate::types::{Address, Percent};

/// Callback receiving a dimmer's new state.
pub type DimmerCallback = dyn Fn(&DimmerState) + Send + Sync;

/// A dimming actuator attached to a gateway.
///
/// Cheap to clone; clones share state.
///
/// # Examples
///
/// ```no_run
/// use eltako_bridge::types::Percent;
/// # async fn example(light: eltako_bridge::device::Dimmer) -> eltako_bridge::Result<()> {
/// light.turn_on(Percent::new(60)?).await;
/// light.turn_off().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dimmer {
    inner: Arc<DimmerInner>,
}

struct DimmerInner {
    config: DimmerConfig,
    fast_status_change: bool,
    router: Arc<GatewayRouter>,
    state: RwLock<DimmerState>,
    observers: CallbackList<DimmerCallback>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Dimmer {
    /// Creates a dimmer and subscribes it to its address on `router`.
    #[must_use]
    pub fn new(config: DimmerConfig, fast_status_change: bool, router: Arc<GatewayRouter>) -> Self {
        let inner = Arc::new(DimmerInner {
            config,
            fast_status_change,
            router,
            state: RwLock::new(DimmerState::new()),
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

    /// Address the actuator reports from.
    #[must_use]
    pub fn address(&self) -> Address {
        self.inner.config.address
    }

    /// Address commands are sent from.
    #[must_use]
    pub fn sender_id(&self) -> Address {
        self.inner.config.sender_id
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> DimmerState {
        *self.inner.state.read()
    }

    /// Whether the output is on, `None` while unknown.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.inner.state.read().is_on
    }

    /// Last known brightness.
    #[must_use]
    pub fn brightness(&self) -> Option<Percent> {
        self.inner.state.read().brightness
    }

    /// Switches on at `brightness`.
    pub async fn turn_on(&self, brightness: Percent) -> SendOutcome {
        self.inner.dim(DimmerCommand::on(brightness)).await
    }

    /// Switches off.
    pub async fn turn_off(&self) -> SendOutcome {
        self.inner.dim(DimmerCommand::off()).await
    }

    /// Applies one telegram from the dimmer's address.
    ///
    /// Teach-in telegrams are ignored.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if the telegram is not a dimmer status.
    pub fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        self.inner.handle_telegram(telegram)
    }

    /// Stops listening on the dimmer's address.
    pub fn detach(&self) -> bool {
        let id = self.inner.subscription.lock().take();
        id.is_some_and(|id| self.inner.router.unsubscribe(id))
    }
}

impl DimmerInner {
    async fn dim(&self, command: DimmerCommand) -> SendOutcome {
        let outcome = self
            .router
            .send(&command.encode(self.config.sender_id))
            .await;
        if outcome.is_sent() && self.fast_status_change {
            self.apply(DimmerStatus {
                is_on: command.on,
                brightness: Some(command.brightness),
            });
        }
        outcome
    }

    fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        if telegram.is_learn() {
            tracing::trace!(address = %self.config.address, "Ignoring dimmer teach-in telegram");
            return Ok(());
        }
        let status = DimmerStatus::decode(telegram)?;
        tracing::debug!(
            address = %self.config.address,
            is_on = status.is_on,
            brightness = ?status.brightness.map(Percent::value),
            "Dimmer status received"
        );
        self.apply(status);
        Ok(())
    }

    fn apply(&self, status: DimmerStatus) {
        let changed = {
            let mut state = self.state.write();
            state.apply(status).then_some(*state)
        };
        if let Some(state) = changed {
            for observer in self.observers.snapshot() {
                observer(&state);
            }
        }
    }
}

impl Drop for DimmerInner {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().take() {
            self.router.unsubscribe(id);
        }
    }
}

impl Subscribable for Dimmer {
    type State = DimmerState;

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DimmerState) + Send + Sync + 'static,
    {
        self.inner.observers.insert(Arc::new(callback))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.remove(id)
    }
}

impl fmt::Debug for Dimmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimmer")
            .field("address", &self.inner.config.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
