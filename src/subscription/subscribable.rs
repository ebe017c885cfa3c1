// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for devices that publish state changes.

use crate::subscription::SubscriptionId;

/// Trait for devices that notify observers when their state changes.
///
/// Every mutation of a device's state, whether caused by an inbound
/// telegram or by an optimistic update after a command, results in one
/// notification carrying the full new state.
///
/// # Examples
///
/// ```no_run
/// use eltako_bridge::subscription::Subscribable;
/// # fn example(cover: &eltako_bridge::device::Cover) {
/// let id = cover.on_state_changed(|state| {
///     println!("position is now {:?}", state.position);
/// });
///
/// // Later
/// cover.unsubscribe(id);
/// # }
/// ```
pub trait Subscribable {
    /// The state snapshot passed to observers.
    type State;

    /// Subscribes to state changes.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Self::State) + Send + Sync + 'static;

    /// Removes a state-change subscription.
    ///
    /// Returns `true` if the subscription was found.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
