// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for dimmers and binary sensors using the in-process
//! mock bus.

use std::sync::Arc;

use eltako_bridge::config::{
    BinarySensorConfig, DimmerConfig, GatewayConfig, GatewayModel, SensorKind,
};
use eltako_bridge::profile::DimmerCommand;
use eltako_bridge::protocol::MockBus;
use eltako_bridge::subscription::Subscribable;
use eltako_bridge::{Address, Gateway, Percent, SendOutcome, Telegram};
use parking_lot::Mutex;

const LIGHT: Address = Address::new([0x00, 0x00, 0x00, 0x21]);
const LIGHT_SENDER: Address = Address::new([0x00, 0x00, 0xb0, 0x21]);
const CONTACT: Address = Address::new([0x00, 0x00, 0x00, 0x31]);
const HANDLE: Address = Address::new([0x00, 0x00, 0x00, 0x32]);

fn started_gateway(fast_status_change: bool) -> (MockBus, Gateway) {
    let bus = MockBus::new();
    let config = GatewayConfig::new("/dev/ttyUSB0", GatewayModel::Fam14)
        .with_auto_reconnect(false)
        .with_fast_status_change(fast_status_change);
    let gateway = Gateway::new(config, bus.factory()).unwrap();
    gateway.start();
    (bus, gateway)
}

fn percent(value: u8) -> Percent {
    Percent::new(value).unwrap()
}

// ============================================================================
// Dimmer
// ============================================================================

mod dimmer {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn turn_on_sends_dimming_command() {
        let (bus, gateway) = started_gateway(false);
        let light = gateway.add_dimmer(DimmerConfig::new(LIGHT, LIGHT_SENDER));

        assert_eq!(light.turn_on(percent(60)).await, SendOutcome::Sent);
        assert_eq!(light.turn_off().await, SendOutcome::Sent);

        let sent = bus.sent_telegrams();
        assert!(sent.iter().all(|t| t.address() == LIGHT_SENDER));
        let commands: Vec<_> = sent
            .iter()
            .map(|t| DimmerCommand::decode(t).unwrap())
            .collect();
        assert_eq!(
            commands,
            vec![DimmerCommand::on(percent(60)), DimmerCommand::off()]
        );
        // No confirmation yet
        assert_eq!(light.is_on(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_status_change_updates_state() {
        let (_bus, gateway) = started_gateway(true);
        let light = gateway.add_dimmer(DimmerConfig::new(LIGHT, LIGHT_SENDER));

        light.turn_on(percent(35)).await;
        assert_eq!(light.is_on(), Some(true));
        assert_eq!(light.brightness(), Some(percent(35)));

        light.turn_off().await;
        assert_eq!(light.is_on(), Some(false));
        assert_eq!(light.brightness(), Some(Percent::CLOSED));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_command_leaves_state_alone() {
        let (_bus, gateway) = started_gateway(true);
        let light = gateway.add_dimmer(DimmerConfig::new(LIGHT, LIGHT_SENDER));
        gateway.stop();

        assert_eq!(light.turn_on(percent(80)).await, SendOutcome::Dropped);
        assert_eq!(light.is_on(), None);
    }

    #[test]
    fn status_reports_update_state() {
        let (bus, gateway) = started_gateway(false);
        let light = gateway.add_dimmer(DimmerConfig::new(LIGHT, LIGHT_SENDER));
        let states = Arc::new(Mutex::new(Vec::new()));
        let states_clone = Arc::clone(&states);
        light.on_state_changed(move |state| states_clone.lock().push(*state));

        // Dimming report, percent range, on
        bus.inject_telegram(&Telegram::four_bs(LIGHT, [0x02, 70, 0, 0x0d]));
        // Switching report, off; brightness is kept
        bus.inject_telegram(&Telegram::four_bs(LIGHT, [0x01, 0, 0, 0x08]));

        let states = states.lock();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].is_on, Some(true));
        assert_eq!(states[0].brightness, Some(percent(70)));
        assert_eq!(states[1].is_on, Some(false));
        assert_eq!(states[1].brightness, Some(percent(70)));
    }

    #[test]
    fn teach_in_and_foreign_telegrams_are_ignored() {
        let (bus, gateway) = started_gateway(false);
        let light = gateway.add_dimmer(DimmerConfig::new(LIGHT, LIGHT_SENDER));

        // Learn bit cleared
        bus.inject_telegram(&Telegram::four_bs(LIGHT, [0x02, 70, 0, 0x05]));
        // Wrong organisation
        bus.inject_telegram(&Telegram::rps(LIGHT, 0x70));

        assert_eq!(light.state(), eltako_bridge::state::DimmerState::new());
    }
}

// ============================================================================
// Binary sensors
// ============================================================================

mod binary_sensor {
    use super::*;

    #[test]
    fn contact_reports_closed_as_on() {
        let (bus, gateway) = started_gateway(false);
        let contact =
            gateway.add_binary_sensor(BinarySensorConfig::new(CONTACT, SensorKind::Contact));
        assert_eq!(contact.is_on(), None);

        bus.inject_telegram(&Telegram::one_bs(CONTACT, 0x09));
        assert_eq!(contact.is_on(), Some(true));

        bus.inject_telegram(&Telegram::one_bs(CONTACT, 0x08));
        assert_eq!(contact.is_on(), Some(false));

        // Teach-in is not a reading
        bus.inject_telegram(&Telegram::one_bs(CONTACT, 0x01));
        assert_eq!(contact.is_on(), Some(false));
    }

    #[test]
    fn window_handle_kinds() {
        let (bus, gateway) = started_gateway(false);
        let window =
            gateway.add_binary_sensor(BinarySensorConfig::new(HANDLE, SensorKind::Window));
        let tilt =
            gateway.add_binary_sensor(BinarySensorConfig::new(HANDLE, SensorKind::WindowTilt));

        bus.inject_telegram(&Telegram::rps(HANDLE, 0xd0));
        assert_eq!(window.is_on(), Some(true));
        assert_eq!(tilt.is_on(), Some(true));

        bus.inject_telegram(&Telegram::rps(HANDLE, 0xc0));
        assert_eq!(window.is_on(), Some(true));
        assert_eq!(tilt.is_on(), Some(false));

        bus.inject_telegram(&Telegram::rps(HANDLE, 0xf0));
        assert_eq!(window.is_on(), Some(false));
        assert_eq!(tilt.is_on(), Some(false));
    }

    #[test]
    fn observers_notified_on_change_only() {
        let (bus, gateway) = started_gateway(false);
        let window =
            gateway.add_binary_sensor(BinarySensorConfig::new(HANDLE, SensorKind::Window));
        let readings = Arc::new(Mutex::new(Vec::new()));
        let readings_clone = Arc::clone(&readings);
        window.on_state_changed(move |state| readings_clone.lock().push(state.is_on));

        bus.inject_telegram(&Telegram::rps(HANDLE, 0xc0));
        bus.inject_telegram(&Telegram::rps(HANDLE, 0xe0));
        bus.inject_telegram(&Telegram::rps(HANDLE, 0xf0));

        assert_eq!(*readings.lock(), vec![Some(true), Some(false)]);
    }

    #[test]
    fn remove_device_detaches_sensor() {
        let (bus, gateway) = started_gateway(false);
        let contact =
            gateway.add_binary_sensor(BinarySensorConfig::new(CONTACT, SensorKind::Contact));

        assert_eq!(gateway.remove_device(CONTACT), 1);
        bus.inject_telegram(&Telegram::one_bs(CONTACT, 0x09));

        assert_eq!(contact.is_on(), None);
        assert_eq!(gateway.device_count(), 0);
    }
}
