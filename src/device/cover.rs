// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motor-driven cover with position estimation.
//!
//! Cover actuators report only discrete events: "moving up", "fully
//! closed", or how long the motor ran before it stopped. [`Cover`] turns
//! these into a best-effort position and tilt estimate, and turns position
//! and tilt targets into timed move commands.
//!
//! The estimate drifts; end-stop telegrams ("fully open", "fully closed")
//! snap it back to an exact value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::CoverConfig;
use crate::error::ProfileError;
use crate::profile::{CoverAction, CoverCommand, CoverStatus, MoveDirection};
use crate::protocol::{GatewayRouter, SendOutcome};
use crate::state::{CoverState, Direction};
use crate::subscription::{CallbackList, Subscribable, SubscriptionId};
use crate::telegram::Telegram;
use crate::types::{Address, Percent, TravelTime};

/// Moving time used when no travel time is configured.
const FULL_TRAVEL: u8 = 255;

/// Upper bound of a tilt movement, in seconds.
const MAX_TILT_SECONDS: f64 = 255.0;

/// Callback receiving a cover's new state.
pub type CoverCallback = dyn Fn(&CoverState) + Send + Sync;

/// A cover actuator attached to a gateway.
///
/// Cheap to clone; clones share state. The cover listens on its address
/// from construction until [`detach`](Self::detach) is called or the last
/// clone is dropped.
///
/// # Examples
///
/// ```no_run
/// use eltako_bridge::types::Percent;
/// # async fn example(cover: eltako_bridge::device::Cover) -> eltako_bridge::Result<()> {
/// cover.set_position(Percent::new(40)?).await;
///
/// if let Some(position) = cover.position() {
///     println!("cover is at {position}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cover {
    inner: Arc<CoverInner>,
}

struct CoverInner {
    config: CoverConfig,
    fast_status_change: bool,
    router: Arc<GatewayRouter>,
    state: RwLock<CoverState>,
    observers: CallbackList<CoverCallback>,
    subscription: Mutex<Option<SubscriptionId>>,
    tilt_task: Mutex<Option<JoinHandle<()>>>,
}

impl Cover {
    /// Creates a cover and subscribes it to its address on `router`.
    ///
    /// All runtime state starts unknown and idle.
    #[must_use]
    pub fn new(config: CoverConfig, fast_status_change: bool, router: Arc<GatewayRouter>) -> Self {
        let inner = Arc::new(CoverInner {
            config,
            fast_status_change,
            router,
            state: RwLock::new(CoverState::new()),
            observers: CallbackList::new(),
            subscription: Mutex::new(None),
            tilt_task: Mutex::new(None),
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

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CoverConfig {
        &self.inner.config
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> CoverState {
        *self.inner.state.read()
    }

    /// Estimated position, `None` while unknown.
    #[must_use]
    pub fn position(&self) -> Option<Percent> {
        self.inner.state.read().position
    }

    /// Estimated tilt, `None` while unknown or untracked.
    #[must_use]
    pub fn tilt(&self) -> Option<Percent> {
        self.inner.state.read().tilt
    }

    /// Current direction of travel.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.inner.state.read().direction
    }

    /// Whether the cover is closed, `None` while unknown.
    #[must_use]
    pub fn is_closed(&self) -> Option<bool> {
        self.inner.state.read().is_closed
    }

    /// Returns `true` while the cover is opening.
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.inner.state.read().is_opening()
    }

    /// Returns `true` while the cover is closing.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.inner.state.read().is_closing()
    }

    /// Returns `true` if [`set_position`](Self::set_position) is available.
    #[must_use]
    pub fn supports_position(&self) -> bool {
        self.inner.config.times.supports_position()
    }

    /// Returns `true` if [`set_tilt`](Self::set_tilt) is available.
    #[must_use]
    pub fn supports_tilt(&self) -> bool {
        self.inner.config.times.supports_tilt()
    }

    /// Returns `true` while a tilt movement waits for its stop command.
    #[must_use]
    pub fn has_pending_tilt(&self) -> bool {
        self.inner
            .tilt_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Opens the cover fully.
    ///
    /// The motor runs for one second longer than the configured opening
    /// time, or for the longest possible time if none is configured.
    pub async fn open(&self) -> SendOutcome {
        let moving_time = full_travel(self.inner.config.times.opens);
        self.inner.move_cover(MoveDirection::Up, moving_time).await
    }

    /// Closes the cover fully.
    pub async fn close(&self) -> SendOutcome {
        let moving_time = full_travel(self.inner.config.times.closes);
        self.inner.move_cover(MoveDirection::Down, moving_time).await
    }

    /// Stops the motor.
    ///
    /// Cancels the pending stop of a running tilt.
    pub async fn stop(&self) -> SendOutcome {
        self.inner.cancel_tilt();
        let outcome = self.inner.send(CoverCommand::stop()).await;
        if outcome.is_sent() && self.inner.fast_status_change {
            self.inner.update(|state| state.direction = Direction::Idle);
        }
        outcome
    }

    /// Moves the cover to `target`.
    ///
    /// Needs both travel times. Targets of 0 and 100 run the motor for a
    /// full travel; anything in between needs a known position and runs
    /// the motor for the interpolated share of the travel time. Returns
    /// [`SendOutcome::Skipped`] when nothing had to be sent.
    pub async fn set_position(&self, target: Percent) -> SendOutcome {
        let times = self.inner.config.times;
        let (Some(opens), Some(closes)) = (times.opens, times.closes) else {
            tracing::debug!(address = %self.address(), "Position control needs both travel times");
            return SendOutcome::Skipped;
        };

        let current = self.position();
        if current == Some(target) {
            return SendOutcome::Skipped;
        }

        let (direction, moving_time) = match (target, current) {
            (Percent::OPEN, _) => (MoveDirection::Up, full_travel(Some(opens))),
            (Percent::CLOSED, _) => (MoveDirection::Down, full_travel(Some(closes))),
            (target, Some(current)) if target > current => (
                MoveDirection::Up,
                partial_travel(target.value() - current.value(), opens),
            ),
            (target, Some(current)) => (
                MoveDirection::Down,
                partial_travel(current.value() - target.value(), closes),
            ),
            (target, None) => {
                tracing::debug!(
                    address = %self.address(),
                    target = %target,
                    "Position unknown, cannot interpolate"
                );
                return SendOutcome::Skipped;
            }
        };

        tracing::debug!(
            address = %self.address(),
            target = %target,
            current = ?current.map(Percent::value),
            moving_time,
            "Moving cover to position"
        );
        self.inner.move_cover(direction, moving_time).await
    }

    /// Tilts the slats to `target`.
    ///
    /// Needs the tilt time and a known tilt. Sends a move command, then
    /// schedules the stop command on a separate task after the
    /// proportional share of the tilt time (capped at 255 seconds), so
    /// telegram dispatch carries on meanwhile. A newer tilt request
    /// cancels a pending stop.
    pub async fn set_tilt(&self, target: Percent) -> SendOutcome {
        let Some(tilts) = self.inner.config.times.tilts else {
            tracing::debug!(address = %self.address(), "Tilt control needs a tilt time");
            return SendOutcome::Skipped;
        };
        let Some(current) = self.tilt() else {
            tracing::debug!(address = %self.address(), target = %target, "Tilt unknown, ignoring");
            return SendOutcome::Skipped;
        };
        if current == target {
            return SendOutcome::Skipped;
        }

        let (direction, delta) = if target > current {
            (MoveDirection::Up, target.value() - current.value())
        } else {
            (MoveDirection::Down, current.value() - target.value())
        };
        let seconds = (f64::from(delta) / 100.0 * tilts.as_secs_f64()).min(MAX_TILT_SECONDS);

        self.inner.cancel_tilt();
        let outcome = self
            .inner
            .send(CoverCommand::new(direction.into(), 0))
            .await;
        if !outcome.is_sent() {
            return outcome;
        }

        tracing::debug!(
            address = %self.address(),
            target = %target,
            seconds,
            "Tilting cover"
        );
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            inner.send(CoverCommand::stop()).await;
        });
        if let Some(previous) = self.inner.tilt_task.lock().replace(task) {
            previous.abort();
        }
        outcome
    }

    /// Applies one telegram from the cover's address.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::WrongOrg` if the telegram is not a cover
    /// status telegram.
    pub fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        self.inner.handle_telegram(telegram)
    }

    /// Stops listening on the cover's address and cancels a pending tilt.
    ///
    /// A tilt movement cut short this way would leave the motor running
    /// towards the end stop, so its stop command is sent right away
    /// instead. Returns `true` if the cover was attached.
    pub fn detach(&self) -> bool {
        if self.inner.cancel_tilt() {
            self.inner.stop_interrupted_tilt();
        }
        let id = self.inner.subscription.lock().take();
        id.is_some_and(|id| self.inner.router.unsubscribe(id))
    }
}

impl CoverInner {
    async fn send(&self, command: CoverCommand) -> SendOutcome {
        self.router
            .send(&command.encode(self.config.sender_id))
            .await
    }

    async fn move_cover(&self, direction: MoveDirection, moving_time: u8) -> SendOutcome {
        self.cancel_tilt();
        let outcome = self
            .send(CoverCommand::new(CoverAction::from(direction), moving_time))
            .await;
        if outcome.is_sent() && self.fast_status_change {
            self.update(|state| state.direction = direction.into());
        }
        outcome
    }

    fn handle_telegram(&self, telegram: &Telegram) -> Result<(), ProfileError> {
        let status = CoverStatus::decode(telegram)?;
        let changed = {
            let mut state = self.state.write();
            state.apply(status, &self.config.times).then_some(*state)
        };

        match changed {
            Some(state) => {
                tracing::debug!(
                    address = %self.config.address,
                    status = ?status,
                    position = ?state.position.map(Percent::value),
                    tilt = ?state.tilt.map(Percent::value),
                    direction = ?state.direction,
                    "Cover state updated"
                );
                self.notify(&state);
            }
            None => {
                tracing::trace!(address = %self.config.address, status = ?status, "Cover state unchanged");
            }
        }
        Ok(())
    }

    fn update(&self, mutate: impl FnOnce(&mut CoverState)) {
        let changed = {
            let mut state = self.state.write();
            let before = *state;
            mutate(&mut state);
            (*state != before).then_some(*state)
        };
        if let Some(state) = changed {
            self.notify(&state);
        }
    }

    fn notify(&self, state: &CoverState) {
        for observer in self.observers.snapshot() {
            observer(state);
        }
    }

    /// Aborts the pending tilt stop. Returns `true` if one was still
    /// waiting.
    fn cancel_tilt(&self) -> bool {
        let Some(task) = self.tilt_task.lock().take() else {
            return false;
        };
        let pending = !task.is_finished();
        task.abort();
        pending
    }

    fn stop_interrupted_tilt(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                address = %self.config.address,
                "No Tokio runtime available, cannot stop interrupted tilt"
            );
            return;
        };
        tracing::debug!(address = %self.config.address, "Stopping interrupted tilt");
        let inner = Arc::clone(self);
        runtime.spawn(async move {
            inner.send(CoverCommand::stop()).await;
        });
    }
}

impl Drop for CoverInner {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().take() {
            self.router.unsubscribe(id);
        }
    }
}

impl Subscribable for Cover {
    type State = CoverState;

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CoverState) + Send + Sync + 'static,
    {
        self.inner.observers.insert(Arc::new(callback))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.remove(id)
    }
}

impl fmt::Debug for Cover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cover")
            .field("address", &self.inner.config.address)
            .field("sender_id", &self.inner.config.sender_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Moving time for a full travel: one second of margin over the
/// configured time.
fn full_travel(time: Option<TravelTime>) -> u8 {
    time.map_or(FULL_TRAVEL, |t| t.seconds().saturating_add(1))
}

/// Moving time for `delta` percent of a travel taking `full`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn partial_travel(delta: u8, full: TravelTime) -> u8 {
    let seconds = (f64::from(delta) / 100.0 * full.as_secs_f64()).round();
    seconds.clamp(1.0, f64::from(u8::MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_travel_adds_margin() {
        assert_eq!(full_travel(Some(TravelTime::new(20).unwrap())), 21);
        assert_eq!(full_travel(Some(TravelTime::MAX)), 255);
        assert_eq!(full_travel(None), 255);
    }

    #[test]
    fn partial_travel_rounds_and_clamps() {
        let forty = TravelTime::new(40).unwrap();
        assert_eq!(partial_travel(60, forty), 24);
        // 1% of 10s rounds to 0 and is raised to the minimum
        assert_eq!(partial_travel(1, TravelTime::new(10).unwrap()), 1);
        assert_eq!(partial_travel(99, TravelTime::MAX), 252);
        // 15% of 17s = 2.55s
        assert_eq!(partial_travel(15, TravelTime::new(17).unwrap()), 3);
    }
}
