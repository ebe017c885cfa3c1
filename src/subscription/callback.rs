// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackList`] - Ordered, thread-safe list of callbacks of one shape

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Process-wide counter so that handles from different registries never
/// collide.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscription.
///
/// This ID is returned when creating a subscription and is the token to
/// hand back to `unsubscribe`. IDs increase monotonically, so ordering by
/// ID is ordering by registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next unused ID.
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Thread-safe list of callbacks, invoked in registration order.
///
/// `F` is the unsized callback type, e.g. `dyn Fn(bool) + Send + Sync`.
/// [`snapshot`](Self::snapshot) clones the callbacks out of the lock so
/// they can be invoked without holding it; a callback may therefore
/// subscribe or unsubscribe without deadlocking.
pub struct CallbackList<F: ?Sized> {
    callbacks: RwLock<BTreeMap<SubscriptionId, Arc<F>>>,
}

impl<F: ?Sized> CallbackList<F> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Adds a callback and returns its handle.
    pub fn insert(&self, callback: Arc<F>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.callbacks.write().insert(id, callback);
        id
    }

    /// Removes a callback. Returns `true` if it was present.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.callbacks.write().remove(&id).is_some()
    }

    /// Returns `true` if the handle belongs to this list.
    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.callbacks.read().contains_key(&id)
    }

    /// Returns the callbacks in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.callbacks.read().values().cloned().collect()
    }

    /// Removes all callbacks.
    pub fn clear(&self) {
        self.callbacks.write().clear();
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }
}

impl<F: ?Sized> Default for CallbackList<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for CallbackList<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackList")
            .field("callback_count", &self.len())
            .finish()
    }
}
