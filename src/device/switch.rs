// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switching actuator.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::SwitchConfig;
use crate::error::ProfileError;
use crate::profile::{SwitchCommand, SwitchStatus};
use crate::protocol::{GatewayRouter, SendOutcome};
use crate::state::SwitchState;
use crate::subscription::{CallbackList, Subscribable, SubscriptionId};
use crate::telegram::Telegram;
use crate::types::Address;

/// Callback receiving a switch's new state.
pub type SwitchCallback = dyn Fn(&SwitchState) + Send + Sync;

/// A switching actuator attached to a gateway.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Switch {
    inner: Arc<SwitchInner>,
}

struct SwitchInner {
    config: SwitchConfig,
    fast_status_change: bool,
    router: Arc<GatewayRouter>,
    state: RwLock<SwitchState>,
    observers: CallbackList<SwitchCallback>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Switch {
    /// Creates a switch and subscribes it to its address on `router`.
    #[must_use]
    pub fn new(config: SwitchConfig, fast_status_change: bool, router: Arc<GatewayRouter>) -> Self {
        let inner = Arc::new(SwitchInner {
            config,
            fast_status_change,
            router,
            state: RwLock::new(SwitchState::new()),
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
    pub fn state(&self) -> SwitchState {
        *self.inner.state.read()
    }

    /// Whether the output is on, `None` while unknown.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.inner.state.read().is_on
    }

    /// Switches the output on.
    pub async fn turn_on(&self) -> SendOutcome {
        self.inner.switch(SwitchCommand::on()).await
    }

    /// Switches the output off.
    pub async fn turn_off(&self) -> SendOutcome {
        self.inner.switch(SwitchCommand::off()).await
    }

    /// Applies one telegram from the switch's address.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if the telegram is not a switch status.
    pub fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        self.inner.handle_telegram(telegram)
    }

    /// Stops listening on the switch's address.
    pub fn detach(&self) -> bool {
        let id = self.inner.subscription.lock().take();
        id.is_some_and(|id| self.inner.router.unsubscribe(id))
    }
}

impl SwitchInner {
    async fn switch(&self, command: SwitchCommand) -> SendOutcome {
        let outcome = self
            .router
            .send(&command.encode(self.config.sender_id))
            .await;
        if outcome.is_sent() && self.fast_status_change {
            self.apply(SwitchStatus { is_on: command.on });
        }
        outcome
    }

    fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        let status = SwitchStatus::decode(telegram)?;
        tracing::debug!(address = %self.config.address, is_on = status.is_on, "Switch status received");
        self.apply(status);
        Ok(())
    }

    fn apply(&self, status: SwitchStatus) {
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

impl Drop for SwitchInner {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().take() {
            self.router.unsubscribe(id);
        }
    }
}

impl Subscribable for Switch {
    type State = SwitchState;

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SwitchState) + Send + Sync + 'static,
    {
        self.inner.observers.insert(Arc::new(callback))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.remove(id)
    }
}

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("address", &self.inner.config.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
