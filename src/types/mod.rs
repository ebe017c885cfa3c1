// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type-safe value types used across the bridge.
//!
//! Each type validates its range on construction, so values flowing through
//! the router and the cover estimator are always well-formed.

mod address;
mod gateway_id;
mod percent;
mod travel_time;

pub use address::Address;
pub use gateway_id::GatewayId;
pub use percent::Percent;
pub use travel_time::TravelTime;
