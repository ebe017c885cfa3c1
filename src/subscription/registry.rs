// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address-keyed subscription registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ProfileError;
use crate::telegram::Telegram;
use crate::types::Address;

use super::{CallbackList, SubscriptionId};

/// Callback for telegrams from one address.
///
/// Returning an error signals that the telegram did not match the profile
/// the subscriber expected; the router logs it and moves on.
pub type AddressCallback = dyn Fn(&Telegram) -> Result<(), ProfileError> + Send + Sync;

/// Callback for every accepted telegram.
pub type BroadcastCallback = dyn Fn(&Telegram) + Send + Sync;

#[derive(Default)]
struct AddressSubscriptions {
    by_address: HashMap<Address, BTreeMap<SubscriptionId, Arc<AddressCallback>>>,
    owner: HashMap<SubscriptionId, Address>,
}

/// Subscriptions of one router.
///
/// Each router owns exactly one registry; nothing here is shared between
/// gateways.
#[derive(Default)]
pub struct SubscriptionRegistry {
    addresses: RwLock<AddressSubscriptions>,
    broadcast: CallbackList<BroadcastCallback>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for telegrams whose source is `address`.
    ///
    /// Several callbacks may share one address; they are notified in
    /// registration order.
    pub fn subscribe<F>(&self, address: Address, callback: F) -> SubscriptionId
    where
        F: Fn(&Telegram) -> Result<(), ProfileError> + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        let mut subs = self.addresses.write();
        subs.by_address
            .entry(address)
            .or_default()
            .insert(id, Arc::new(callback));
        subs.owner.insert(id, address);
        id
    }

    /// Registers a callback for every accepted telegram.
    pub fn subscribe_broadcast<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Telegram) + Send + Sync + 'static,
    {
        self.broadcast.insert(Arc::new(callback))
    }

    /// Removes a subscription of either kind.
    ///
    /// Returns `true` if it was present; removing an unknown handle is a
    /// no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.broadcast.remove(id) {
            return true;
        }
        let mut subs = self.addresses.write();
        let Some(address) = subs.owner.remove(&id) else {
            return false;
        };
        if let Some(callbacks) = subs.by_address.get_mut(&address) {
            callbacks.remove(&id);
            if callbacks.is_empty() {
                subs.by_address.remove(&address);
            }
        }
        true
    }

    /// Returns the callbacks for `address` in registration order.
    #[must_use]
    pub fn address_callbacks(&self, address: &Address) -> Vec<Arc<AddressCallback>> {
        self.addresses
            .read()
            .by_address
            .get(address)
            .map(|callbacks| callbacks.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the broadcast callbacks in registration order.
    #[must_use]
    pub fn broadcast_callbacks(&self) -> Vec<Arc<BroadcastCallback>> {
        self.broadcast.snapshot()
    }

    /// Returns `true` if any callback listens on `address`.
    #[must_use]
    pub fn has_subscribers(&self, address: &Address) -> bool {
        self.addresses.read().by_address.contains_key(address)
    }

    /// Returns the number of addresses with at least one subscriber.
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.addresses.read().by_address.len()
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.addresses.read().owner.len() + self.broadcast.len()
    }

    /// Removes all subscriptions.
    pub fn clear(&self) {
        let mut subs = self.addresses.write();
        subs.by_address.clear();
        subs.owner.clear();
        self.broadcast.clear();
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("address_count", &self.address_count())
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const A: Address = Address::new([0, 0, 0, 1]);
    const B: Address = Address::new([0, 0, 0, 2]);

    #[test]
    fn new_registry_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.callback_count(), 0);
        assert!(!registry.has_subscribers(&A));
    }

    #[test]
    fn callbacks_are_keyed_by_address() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(A, |_| Ok(()));
        registry.subscribe(A, |_| Ok(()));
        registry.subscribe(B, |_| Ok(()));

        assert_eq!(registry.address_callbacks(&A).len(), 2);
        assert_eq!(registry.address_callbacks(&B).len(), 1);
        assert_eq!(registry.address_count(), 2);
    }

    #[test]
    fn address_callbacks_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = Arc::clone(&order);
            registry.subscribe(A, move |_| {
                order.lock().push(n);
                Ok(())
            });
        }

        let telegram = Telegram::rps(A, 0x70);
        for cb in registry.address_callbacks(&A) {
            cb(&telegram).unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_handle() {
        let registry = SubscriptionRegistry::new();
        let first = registry.subscribe(A, |_| Ok(()));
        let _second = registry.subscribe(A, |_| Ok(()));

        assert!(registry.unsubscribe(first));
        assert_eq!(registry.address_callbacks(&A).len(), 1);
        assert!(!registry.unsubscribe(first));
    }

    #[test]
    fn last_unsubscribe_drops_address() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe(A, |_| Ok(()));
        registry.unsubscribe(id);
        assert!(!registry.has_subscribers(&A));
        assert_eq!(registry.address_count(), 0);
    }

    #[test]
    fn broadcast_subscribe_and_unsubscribe() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe_broadcast(|_| {});
        assert_eq!(registry.broadcast_callbacks().len(), 1);
        assert!(registry.unsubscribe(id));
        assert!(registry.broadcast_callbacks().is_empty());
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(A, |_| Ok(()));
        assert!(!registry.unsubscribe(SubscriptionId::next()));
        assert_eq!(registry.callback_count(), 1);
    }

    #[test]
    fn clear_empties_both_kinds() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(A, |_| Ok(()));
        registry.subscribe_broadcast(|_| {});
        registry.clear();
        assert_eq!(registry.callback_count(), 0);
    }
}
