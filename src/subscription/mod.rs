// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system.
//!
//! Every registration returns a [`SubscriptionId`] handle; handing it back
//! to the matching `unsubscribe` removes exactly that callback. IDs are
//! unique across the process, so a gateway can accept a handle from any of
//! its registries in one `unsubscribe` call.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - Handle returned by every `subscribe`/`on_*` call
//! - [`CallbackList`] - Ordered list of callbacks of one shape
//! - [`SubscriptionRegistry`] - Address-keyed and broadcast telegram
//!   subscriptions owned by one router
//! - [`Subscribable`] - Trait for devices that publish state changes

mod callback;
mod registry;
mod subscribable;

pub use callback::{CallbackList, SubscriptionId};
pub use registry::{AddressCallback, BroadcastCallback, SubscriptionRegistry};
pub use subscribable::Subscribable;
