// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for routing and connection supervision using the
//! in-process mock bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eltako_bridge::config::{GatewayConfig, GatewayModel, SwitchConfig};
use eltako_bridge::error::ProfileError;
use eltako_bridge::protocol::MockBus;
use eltako_bridge::subscription::Subscribable;
use eltako_bridge::telegram::{Esp2Codec, FrameCodec};
use eltako_bridge::{Address, ConnectionStatus, Gateway, SendOutcome, Telegram};
use parking_lot::Mutex;

const DEVICE: Address = Address::new([0xff, 0x80, 0x80, 0x01]);
const OTHER: Address = Address::new([0xff, 0x80, 0x80, 0x02]);

fn config(auto_reconnect: bool) -> GatewayConfig {
    GatewayConfig::new("/dev/ttyUSB0", GatewayModel::Fam14)
        .with_auto_reconnect(auto_reconnect)
        .with_reconnect_interval(Duration::from_secs(5))
}

fn started_gateway(auto_reconnect: bool) -> (MockBus, Gateway) {
    let bus = MockBus::new();
    let gateway = Gateway::new(config(auto_reconnect), bus.factory()).unwrap();
    gateway.start();
    (bus, gateway)
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&count), count)
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// ============================================================================
// Routing
// ============================================================================

mod routing {
    use super::*;

    #[test]
    fn address_callback_receives_matching_telegrams() {
        let (bus, gateway) = started_gateway(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        gateway.register_address_callback(DEVICE, move |telegram| {
            seen_clone.lock().push(telegram.clone());
            Ok(())
        });

        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        bus.inject_telegram(&Telegram::rps(OTHER, 0x70));
        bus.inject_telegram(&Telegram::four_bs(DEVICE, [0, 0x64, 1, 0x0a]));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|t| t.address() == DEVICE));
    }

    #[test]
    fn unsubscribed_callback_sees_nothing_more() {
        let (bus, gateway) = started_gateway(false);
        let (count, seen) = counter();
        let id = gateway.register_address_callback(DEVICE, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        assert!(gateway.unsubscribe(id));
        bus.inject_telegram(&Telegram::rps(DEVICE, 0x50));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn poll_frames_reach_no_subscriber() {
        let (bus, gateway) = started_gateway(false);
        let (count, broadcast) = counter();
        let address = Arc::clone(&count);
        gateway.register_broadcast_callback(move |_| {
            broadcast.fetch_add(1, Ordering::SeqCst);
        });
        gateway.register_address_callback(DEVICE, move |_| {
            address.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(bus.inject_telegram(&Telegram::Poll { address: DEVICE }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.message_stats().received(), 0);
    }

    #[test]
    fn broadcast_sees_every_accepted_telegram() {
        let (bus, gateway) = started_gateway(false);
        let (count, broadcast) = counter();
        gateway.register_broadcast_callback(move |_| {
            broadcast.fetch_add(1, Ordering::SeqCst);
        });

        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        bus.inject_telegram(&Telegram::one_bs(OTHER, 0x09));
        bus.inject_telegram(&Telegram::Other {
            org: 0x8b,
            address: OTHER,
            data: [0; 4],
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.message_stats().received(), 3);
    }

    #[test]
    fn decode_mismatch_is_isolated_per_subscriber() {
        let (bus, gateway) = started_gateway(false);
        let switch = gateway.add_switch(SwitchConfig::new(DEVICE, Address::new([0, 0, 0xb0, 1])));
        let (count, seen) = counter();
        gateway.register_address_callback(DEVICE, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // The switch profile rejects 4BS; the second subscriber still runs
        bus.inject_telegram(&Telegram::four_bs(DEVICE, [0, 0, 0, 0x08]));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(switch.is_on(), None);

        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        assert_eq!(switch.is_on(), Some(true));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscriber_may_unsubscribe_during_dispatch() {
        let (bus, gateway) = started_gateway(false);
        let gateway = Arc::new(gateway);
        let slot: Arc<Mutex<Option<eltako_bridge::SubscriptionId>>> = Arc::default();

        let weak = Arc::downgrade(&gateway);
        let slot_clone = Arc::clone(&slot);
        let (count, seen) = counter();
        let id = gateway.register_address_callback(DEVICE, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            if let (Some(gateway), Some(id)) = (weak.upgrade(), *slot_clone.lock()) {
                gateway.unsubscribe(id);
            }
            Ok(())
        });
        *slot.lock() = Some(id);

        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let (bus, gateway) = started_gateway(false);
        let (count, broadcast) = counter();
        gateway.register_broadcast_callback(move |_| {
            broadcast.fetch_add(1, Ordering::SeqCst);
        });

        let mut frame = Esp2Codec::new().encode(&Telegram::rps(DEVICE, 0x70));
        frame[13] ^= 0xff;
        bus.inject(&frame);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}

// ============================================================================
// Sending
// ============================================================================

mod sending {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn send_message_while_up() {
        let (bus, gateway) = started_gateway(false);
        let telegram = Telegram::rps(gateway.base_id(), 0x30);

        assert_eq!(gateway.send_message(&telegram).await, SendOutcome::Sent);
        assert_eq!(bus.sent_telegrams(), vec![telegram]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_message_before_start_is_dropped() {
        let bus = MockBus::new();
        let gateway = Gateway::new(config(false), bus.factory()).unwrap();

        let outcome = gateway.send_message(&Telegram::rps(DEVICE, 0x30)).await;
        assert_eq!(outcome, SendOutcome::Dropped);
        assert!(bus.sent_frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn send_message_after_link_loss_is_dropped() {
        let (bus, gateway) = started_gateway(false);
        bus.drop_link();

        let outcome = gateway.send_message(&Telegram::rps(DEVICE, 0x30)).await;
        assert_eq!(outcome, SendOutcome::Dropped);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_commands_and_fast_status() {
        let bus = MockBus::new();
        let gateway = Gateway::new(config(false).with_fast_status_change(true), bus.factory())
            .unwrap();
        gateway.start();
        let sender = Address::new([0, 0, 0xb0, 2]);
        let switch = gateway.add_switch(SwitchConfig::new(DEVICE, sender));

        let states = Arc::new(Mutex::new(Vec::new()));
        let states_clone = Arc::clone(&states);
        switch.on_state_changed(move |state| states_clone.lock().push(state.is_on));

        assert!(switch.turn_on().await.is_sent());
        assert_eq!(switch.is_on(), Some(true));

        // Confirmation with the same value changes nothing
        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        bus.inject_telegram(&Telegram::rps(DEVICE, 0x50));

        assert_eq!(*states.lock(), vec![Some(true), Some(false)]);
        assert_eq!(
            bus.sent_telegrams(),
            vec![Telegram::four_bs(sender, [0x01, 0, 0, 0x09])]
        );
    }
}

// ============================================================================
// Connection supervision
// ============================================================================

mod supervision {
    use super::*;

    #[test]
    fn late_observer_gets_current_state_immediately() {
        let (_bus, gateway) = started_gateway(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        gateway.register_connection_state_callback(move |up| seen_clone.lock().push(up));

        assert_eq!(*seen.lock(), vec![true]);
    }

    #[test]
    fn observers_follow_link_changes() {
        let (bus, gateway) = started_gateway(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        gateway.register_connection_state_callback(move |up| seen_clone.lock().push(up));

        bus.drop_link();
        assert_eq!(gateway.status(), ConnectionStatus::Down);
        bus.restore_link();
        gateway.reconnect();

        assert_eq!(*seen.lock(), vec![true, false, true]);
    }

    #[test]
    fn repeated_reconnect_never_overlaps_transports() {
        let (bus, gateway) = started_gateway(false);
        for _ in 0..10 {
            gateway.reconnect();
        }
        assert!(gateway.is_connected());
        assert_eq!(bus.live_count(), 1);
        assert_eq!(bus.max_live_count(), 1);
        assert_eq!(bus.created_count(), 11);
    }

    #[test]
    fn reconnect_from_threads_is_safe() {
        let (bus, gateway) = started_gateway(false);
        let gateway = Arc::new(gateway);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gateway = Arc::clone(&gateway);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        gateway.reconnect();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(gateway.is_connected());
        assert_eq!(bus.max_live_count(), 1);
    }

    #[test]
    fn frames_after_reconnect_still_route() {
        let (bus, gateway) = started_gateway(false);
        let (count, seen) = counter();
        gateway.register_address_callback(DEVICE, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok::<(), ProfileError>(())
        });

        gateway.reconnect();
        bus.inject_telegram(&Telegram::rps(DEVICE, 0x70));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_final() {
        let (bus, gateway) = started_gateway(false);
        gateway.stop();
        gateway.reconnect();

        assert_eq!(gateway.status(), ConnectionStatus::Down);
        assert_eq!(bus.live_count(), 0);
        assert!(!bus.inject_telegram(&Telegram::rps(DEVICE, 0x70)));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_reconnect_restores_link() {
        let (bus, gateway) = started_gateway(true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        gateway.register_connection_state_callback(move |up| seen_clone.lock().push(up));

        bus.drop_link();
        assert_eq!(gateway.status(), ConnectionStatus::Reconnecting);
        bus.restore_link();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(wait_until(|| gateway.is_connected()));
        assert_eq!(*seen.lock(), vec![true, false, true]);
        assert_eq!(bus.max_live_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_auto_reconnect_stays_down() {
        let (bus, gateway) = started_gateway(false);
        bus.drop_link();
        bus.restore_link();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(gateway.status(), ConnectionStatus::Down);
        assert_eq!(bus.created_count(), 1);
    }
}
