// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `eltako_bridge` - A Rust library bridging Eltako/EnOcean gateways.
//!
//! This library connects to an Eltako bus or radio gateway, routes every
//! inbound telegram to the devices listening on its source address,
//! supervises the connection, and estimates the position of motor-driven
//! covers from the telegrams their actuators send.
//!
//! # Supported Features
//!
//! - **Routing**: address-keyed and broadcast telegram subscriptions
//! - **Connection supervision**: up/down tracking, manual and automatic
//!   reconnect
//! - **Covers**: open/close/stop, position and tilt control with
//!   position estimation from duration telegrams
//! - **Switches**: on/off with status tracking
//! - **Dimmers**: on at a brightness, off, with brightness tracking
//! - **Binary sensors**: contacts and window handles
//!
//! # Supported Gateways
//!
//! - FAM14, FGW14-USB, FAM-USB (RS485 bus gateways)
//! - USB300 and generic ESP3 gateways
//!
//! The serial transport lives behind the `serial` feature. Without it, any
//! [`protocol::Transport`] implementation can be plugged in through a
//! [`protocol::TransportFactory`]; [`protocol::MockBus`] provides an
//! in-process one.
//!
//! # Quick Start
//!
//! ```no_run
//! use eltako_bridge::config::{CoverConfig, GatewayConfig};
//! use eltako_bridge::subscription::Subscribable;
//! use eltako_bridge::types::Percent;
//! use eltako_bridge::Gateway;
//!
//! # fn factory() -> eltako_bridge::protocol::TransportFactory {
//! #     eltako_bridge::protocol::MockBus::new().factory()
//! # }
//! #[tokio::main]
//! async fn main() -> eltako_bridge::Result<()> {
//!     let config = GatewayConfig::from_json(r#"{
//!         "model": "FAM14",
//!         "serial_port": "/dev/ttyUSB0"
//!     }"#)?;
//!     let gateway = Gateway::new(config, factory())?;
//!
//!     let cover: CoverConfig = serde_json::from_str(r#"{
//!         "address": "00-00-00-0B",
//!         "sender_id": "00-00-B0-0B",
//!         "time_opens": 25,
//!         "time_closes": 23,
//!         "time_tilts": 2
//!     }"#).map_err(eltako_bridge::error::ConfigError::from)?;
//!     let cover = gateway.add_cover(cover);
//!
//!     cover.on_state_changed(|state| {
//!         println!("position {:?}, tilt {:?}", state.position, state.tilt);
//!     });
//!
//!     gateway.start();
//!     cover.set_position(Percent::new(40)?).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
mod gateway;
pub mod profile;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod telegram;
pub mod types;

pub use config::{
    BinarySensorConfig, CoverConfig, DimmerConfig, GatewayConfig, GatewayModel, SensorKind,
    SwitchConfig, TravelTimes,
};
pub use device::{BinarySensor, Cover, Device, Dimmer, Switch};
pub use error::{
    ConfigError, Error, FrameError, ProfileError, Result, TransportError, ValueError,
};
pub use gateway::{Gateway, MessageStats, MessageStatsSnapshot};
pub use protocol::{ConnectionStatus, GatewayRouter, SendOutcome};
pub use subscription::{Subscribable, SubscriptionId};
pub use telegram::Telegram;
pub use types::{Address, GatewayId, Percent, TravelTime};
