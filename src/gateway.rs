// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gateway facade.
//!
//! A [`Gateway`] ties one [`GatewayRouter`] and its
//! [`ConnectionSupervisor`] to a configuration, and keeps the devices
//! registered on it.
//!
//! # Examples
//!
//! ```
//! use eltako_bridge::config::{CoverConfig, GatewayConfig, GatewayModel};
//! use eltako_bridge::protocol::MockBus;
//! use eltako_bridge::types::Address;
//! use eltako_bridge::Gateway;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> eltako_bridge::Result<()> {
//! let bus = MockBus::new();
//! let config = GatewayConfig::new("/dev/ttyUSB0", GatewayModel::Fam14);
//! let gateway = Gateway::new(config, bus.factory())?;
//!
//! let cover = gateway.add_cover(CoverConfig::new(
//!     "00-00-00-0B".parse::<Address>()?,
//!     "00-00-B0-0B".parse::<Address>()?,
//! ));
//!
//! gateway.register_connection_state_callback(|up| println!("gateway up: {up}"));
//! gateway.start();
//!
//! cover.open().await;
//! gateway.stop();
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::{
    BinarySensorConfig, CoverConfig, DimmerConfig, GatewayConfig, GatewayModel, SwitchConfig,
};
use crate::device::{BinarySensor, Cover, Device, Dimmer, Switch};
use crate::error::{ConfigError, ProfileError};
use crate::protocol::{
    ConnectionStatus, ConnectionSupervisor, FrameHandler, GatewayRouter, SendOutcome,
    TransportFactory,
};
use crate::subscription::SubscriptionId;
use crate::telegram::Telegram;
use crate::types::{Address, GatewayId};

/// Counts accepted telegrams and remembers when the last one arrived.
#[derive(Debug, Default)]
pub struct MessageStats {
    received: AtomicU64,
    last_received: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`MessageStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageStatsSnapshot {
    /// Telegrams accepted since the gateway was created.
    pub received: u64,
    /// Arrival time of the newest telegram.
    pub last_received: Option<DateTime<Utc>>,
}

impl MessageStats {
    /// Records one accepted telegram.
    pub fn record(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        *self.last_received.write() = Some(Utc::now());
    }

    /// Number of accepted telegrams.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Arrival time of the newest telegram.
    #[must_use]
    pub fn last_received(&self) -> Option<DateTime<Utc>> {
        *self.last_received.read()
    }

    /// Returns a copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MessageStatsSnapshot {
        MessageStatsSnapshot {
            received: self.received(),
            last_received: self.last_received(),
        }
    }
}

/// One Eltako gateway and the devices behind it.
pub struct Gateway {
    id: GatewayId,
    config: GatewayConfig,
    router: Arc<GatewayRouter>,
    devices: RwLock<HashMap<Address, Vec<Device>>>,
    stats: Arc<MessageStats>,
}

impl Gateway {
    /// Creates a gateway that builds its transports with `factory`.
    ///
    /// Nothing is opened until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the configuration fails
    /// validation.
    pub fn new(config: GatewayConfig, factory: TransportFactory) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = GatewayId::new();

        let router = Arc::new_cyclic(|weak: &Weak<GatewayRouter>| {
            let weak = weak.clone();
            let on_frame: FrameHandler = Arc::new(move |frame: &[u8]| {
                if let Some(router) = weak.upgrade() {
                    router.receive_frame(frame);
                }
            });
            let supervisor = ConnectionSupervisor::new(&config, id, factory, on_frame);
            GatewayRouter::new(id, supervisor, config.message_delay())
        });

        let stats = Arc::new(MessageStats::default());
        let recorder = Arc::clone(&stats);
        router.subscribe_broadcast(move |_| recorder.record());

        tracing::info!(
            gateway = %id,
            name = %config.name,
            model = %config.model,
            port = %config.serial_port,
            base_id = %config.base_id,
            "Gateway created"
        );

        Ok(Self {
            id,
            config,
            router,
            devices: RwLock::new(HashMap::new()),
            stats,
        })
    }

    /// Returns the gateway's identifier.
    #[must_use]
    pub fn id(&self) -> GatewayId {
        self.id
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Hardware model.
    #[must_use]
    pub fn model(&self) -> GatewayModel {
        self.config.model
    }

    /// Base address.
    #[must_use]
    pub fn base_id(&self) -> Address {
        self.config.base_id
    }

    /// Whether commands update device state before confirmation.
    #[must_use]
    pub fn fast_status_change(&self) -> bool {
        self.config.fast_status_change
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Arc<GatewayRouter> {
        &self.router
    }

    fn supervisor(&self) -> &ConnectionSupervisor {
        self.router.supervisor()
    }

    /// Returns the connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.supervisor().status()
    }

    /// Returns `true` while the connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.supervisor().is_up()
    }

    /// Returns the telegram counters.
    #[must_use]
    pub fn message_stats(&self) -> &MessageStats {
        &self.stats
    }

    /// Opens the connection.
    pub fn start(&self) {
        self.supervisor().start();
        tracing::debug!(gateway = %self.id, "Gateway started");
    }

    /// Closes the connection for good and waits for background I/O.
    pub fn stop(&self) {
        self.supervisor().stop();
        tracing::debug!(gateway = %self.id, "Gateway stopped");
    }

    /// Rebuilds the transport. Safe to call at any time before [`stop`].
    ///
    /// [`stop`]: Self::stop
    pub fn reconnect(&self) {
        self.supervisor().reconnect();
    }

    /// Sends a telegram on the bus.
    ///
    /// Dropped with a warning while the connection is down.
    pub async fn send_message(&self, telegram: &Telegram) -> SendOutcome {
        self.router.send(telegram).await
    }

    /// Registers a callback for telegrams from `address`.
    pub fn register_address_callback<F>(&self, address: Address, callback: F) -> SubscriptionId
    where
        F: Fn(&Telegram) -> Result<(), ProfileError> + Send + Sync + 'static,
    {
        self.router.subscribe(address, callback)
    }

    /// Registers a callback for every accepted telegram.
    pub fn register_broadcast_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Telegram) + Send + Sync + 'static,
    {
        self.router.subscribe_broadcast(callback)
    }

    /// Registers a connection-state observer.
    ///
    /// The observer is called immediately with the current state.
    pub fn register_connection_state_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.supervisor().register_connection_state_callback(callback)
    }

    /// Removes any subscription made through this gateway.
    ///
    /// Returns `false` for unknown handles.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.router.unsubscribe(id) || self.supervisor().unsubscribe(id)
    }

    /// Registers a cover and starts routing its telegrams.
    pub fn add_cover(&self, config: CoverConfig) -> Cover {
        let cover = Cover::new(
            config,
            self.config.fast_status_change,
            Arc::clone(&self.router),
        );
        self.register_device(cover.clone().into());
        cover
    }

    /// Registers a switch and starts routing its telegrams.
    pub fn add_switch(&self, config: SwitchConfig) -> Switch {
        let switch = Switch::new(
            config,
            self.config.fast_status_change,
            Arc::clone(&self.router),
        );
        self.register_device(switch.clone().into());
        switch
    }

    /// Registers a dimmer and starts routing its telegrams.
    pub fn add_dimmer(&self, config: DimmerConfig) -> Dimmer {
        let dimmer = Dimmer::new(
            config,
            self.config.fast_status_change,
            Arc::clone(&self.router),
        );
        self.register_device(dimmer.clone().into());
        dimmer
    }

    /// Registers a binary sensor and starts routing its telegrams.
    pub fn add_binary_sensor(&self, config: BinarySensorConfig) -> BinarySensor {
        let sensor = BinarySensor::new(config, Arc::clone(&self.router));
        self.register_device(sensor.clone().into());
        sensor
    }

    fn register_device(&self, device: Device) {
        let address = device.address();
        tracing::debug!(gateway = %self.id, address = %address, "Device added");
        self.devices.write().entry(address).or_default().push(device);
    }

    /// Unregisters every device listening on `address`.
    ///
    /// Their subscriptions are removed and pending tilt movements
    /// cancelled. Returns the number of devices removed.
    pub fn remove_device(&self, address: Address) -> usize {
        let removed = self.devices.write().remove(&address).unwrap_or_default();
        for device in &removed {
            device.detach();
        }
        if !removed.is_empty() {
            tracing::debug!(gateway = %self.id, address = %address, count = removed.len(), "Devices removed");
        }
        removed.len()
    }

    /// Returns all registered devices.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().values().flatten().cloned().collect()
    }

    /// Number of registered devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.read().values().map(Vec::len).sum()
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("model", &self.config.model)
            .field("status", &self.status())
            .field("devices", &self.device_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MockBus;

    fn gateway(bus: &MockBus) -> Gateway {
        let config = GatewayConfig::new("/dev/mock", GatewayModel::Fgw14Usb).with_auto_reconnect(false);
        Gateway::new(config, bus.factory()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let bus = MockBus::new();
        let config = GatewayConfig::new("", GatewayModel::Fam14);
        assert!(Gateway::new(config, bus.factory()).is_err());
    }

    #[test]
    fn stats_count_accepted_telegrams_only() {
        let bus = MockBus::new();
        let gateway = gateway(&bus);
        gateway.start();

        assert_eq!(gateway.message_stats().received(), 0);
        assert!(gateway.message_stats().last_received().is_none());

        bus.inject_telegram(&Telegram::Poll {
            address: Address::new([0, 0, 0, 1]),
        });
        bus.inject_telegram(&Telegram::rps(Address::new([0, 0, 0, 1]), 0x70));

        let snapshot = gateway.message_stats().snapshot();
        assert_eq!(snapshot.received, 1);
        assert!(snapshot.last_received.is_some());
    }

    #[test]
    fn remove_device_detaches_all_at_address() {
        let bus = MockBus::new();
        let gateway = gateway(&bus);
        let address = Address::new([0, 0, 0, 5]);
        let sender = Address::new([0, 0, 0xb0, 5]);

        gateway.add_cover(CoverConfig::new(address, sender));
        gateway.add_switch(SwitchConfig::new(address, sender));
        assert_eq!(gateway.device_count(), 2);
        assert!(gateway.router().registry().has_subscribers(&address));

        assert_eq!(gateway.remove_device(address), 2);
        assert_eq!(gateway.remove_device(address), 0);
        assert!(!gateway.router().registry().has_subscribers(&address));
    }

    #[test]
    fn unsubscribe_accepts_any_handle() {
        let bus = MockBus::new();
        let gateway = gateway(&bus);
        let a = gateway.register_broadcast_callback(|_| {});
        let b = gateway.register_connection_state_callback(|_| {});
        let c = gateway.register_address_callback(Address::new([0, 0, 0, 1]), |_| Ok(()));

        assert!(gateway.unsubscribe(a));
        assert!(gateway.unsubscribe(b));
        assert!(gateway.unsubscribe(c));
        assert!(!gateway.unsubscribe(c));
    }
}
