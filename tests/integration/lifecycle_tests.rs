//! Lifecycle: bring-up, teardown, the bounded waits and what survives
//! (or does not) across them.

use crate::mock_events::{RecordingEvents, TestAdapter, active_adapter, adapter, connect};

use blebridge::adapters::sim_stack::{SimStack, StackCall};
use blebridge::app::events::{HciState, LinkRole, StackEvent};
use blebridge::app::gatts::{CharacteristicDef, FLAG_NOTIFY, FLAG_READ, ServiceDef};
use blebridge::app::ports::TimerId;
use blebridge::{AdapterConfig, AdapterState, BleError, Uuid};

#[test]
fn init_brings_the_stack_up_in_order() {
    let mut ble = adapter();
    assert_eq!(ble.state(), AdapterState::Off);
    ble.init().unwrap();

    assert!(ble.is_active());
    assert_eq!(
        ble.stack().calls(),
        &[
            StackCall::PortInit,
            StackCall::StackInit,
            StackCall::SetTimer(TimerId::InitDeinit, 15_000),
            StackCall::PortStart,
            StackCall::RemoveTimer(TimerId::InitDeinit),
            StackCall::ListenForValueUpdates,
        ]
    );
    assert_eq!(ble.gap_device_name().unwrap(), b"BLEBRIDGE".to_vec());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = AdapterConfig {
        cccb_len: 1,
        ..AdapterConfig::default()
    };
    let built = TestAdapter::new(SimStack::new(), RecordingEvents::new(), config);
    assert_eq!(built.err(), Some(BleError::InvalidArgument));
}

#[test]
fn init_while_active_changes_nothing() {
    let mut ble = active_adapter();
    ble.gap_set_device_name(b"kept").unwrap();

    ble.init().unwrap();

    assert!(ble.stack().calls().is_empty());
    assert_eq!(ble.gap_device_name().unwrap(), b"kept".to_vec());
    assert_eq!(ble.state(), AdapterState::Active);
}

#[test]
fn init_times_out_when_the_stack_stays_silent() {
    let mut ble = adapter();
    ble.stack_mut().set_respond_to_start(false);

    assert_eq!(ble.init(), Err(BleError::Timeout));
    assert_eq!(ble.state(), AdapterState::Off);
    assert_eq!(ble.stack().now_ms(), 15_000);
    assert!(ble.stack().calls().contains(&StackCall::PortDeinit));
    assert_eq!(ble.gatts_read(3), Err(BleError::NotActive));
}

#[test]
fn init_succeeds_after_a_timed_out_attempt() {
    let mut ble = adapter();
    ble.stack_mut().set_respond_to_start(false);
    assert_eq!(ble.init(), Err(BleError::Timeout));

    ble.stack_mut().set_respond_to_start(true);
    ble.init().unwrap();
    assert!(ble.is_active());
}

#[test]
fn deinit_without_init_is_a_no_op() {
    let mut ble = adapter();
    assert_eq!(ble.deinit(), Ok(()));
    assert!(ble.stack().calls().is_empty());
    assert_eq!(ble.state(), AdapterState::Off);
}

#[test]
fn deinit_twice_is_harmless() {
    let mut ble = active_adapter();
    assert_eq!(ble.deinit(), Ok(()));
    let calls = ble.stack_mut().take_calls();
    assert!(calls.contains(&StackCall::AdvEnable(false)));
    assert!(calls.contains(&StackCall::StopListeningForValueUpdates));
    assert!(calls.contains(&StackCall::PortDeinit));

    assert_eq!(ble.deinit(), Ok(()));
    assert!(ble.stack().calls().is_empty());
    assert_eq!(ble.state(), AdapterState::Off);
}

#[test]
fn deinit_times_out_but_still_ends_off() {
    let mut ble = active_adapter();
    ble.stack_mut().set_respond_to_stop(false);

    assert_eq!(ble.deinit(), Err(BleError::Timeout));
    assert_eq!(ble.state(), AdapterState::Off);
    assert_eq!(ble.gatts_read(3), Err(BleError::NotActive));
}

#[test]
fn deinit_discards_pending_operations_and_state() {
    let mut ble = active_adapter();
    ble.register_service_begin(false).unwrap();
    let h = ble
        .register_service(&ServiceDef {
            uuid: Uuid::Uuid16(0x180f),
            characteristics: vec![CharacteristicDef {
                uuid: Uuid::Uuid16(0x2a19),
                flags: FLAG_READ | FLAG_NOTIFY,
                descriptors: Vec::new(),
            }],
        })
        .unwrap()[0];
    ble.register_service_end().unwrap();
    let conn = connect(&mut ble, LinkRole::Peripheral);
    ble.stack_mut().set_acl_buffers_full(true);
    ble.gatts_notify_send(conn, h, b"x").unwrap();
    assert_eq!(ble.with_pending(|q| q.len()), Some(1));

    ble.deinit().unwrap();
    assert_eq!(ble.with_pending(|q| q.len()), None);
    assert_eq!(ble.gatts_notify_send(conn, h, b"x"), Err(BleError::NotActive));

    // A fresh instance starts from the configured name again.
    ble.init().unwrap();
    assert_eq!(ble.gap_device_name().unwrap(), b"BLEBRIDGE".to_vec());
    assert_eq!(ble.gatts_read(h), Err(BleError::InvalidArgument));
}

#[test]
fn repeated_working_state_is_ignored() {
    let mut ble = active_adapter();
    ble.stack_mut()
        .push_hci_event(StackEvent::StateChanged(HciState::Working));
    ble.stack_mut()
        .push_hci_event(StackEvent::StateChanged(HciState::Sleeping));
    ble.process_events();
    assert_eq!(ble.state(), AdapterState::Active);
}

#[test]
fn stack_going_off_on_its_own_is_tracked() {
    let mut ble = active_adapter();
    ble.stack_mut()
        .push_hci_event(StackEvent::StateChanged(HciState::Off));
    ble.process_events();
    assert_eq!(ble.state(), AdapterState::Off);
    ble.stack_mut().take_calls();

    // Nothing reaches a stack that went away.
    assert_eq!(ble.gatts_read(3), Err(BleError::NotActive));
    assert_eq!(ble.gap_set_device_name(b"x"), Err(BleError::NotActive));
    assert_eq!(ble.scan_start(0, 60_000, 30_000), Err(BleError::NotActive));
    assert!(ble.stack().calls().is_empty());

    // Teardown still releases the instance.
    assert_eq!(ble.deinit(), Ok(()));
    assert_eq!(ble.with_pending(|q| q.len()), None);
}

#[test]
fn unknown_events_are_ignored() {
    let mut ble = active_adapter();
    ble.stack_mut().push_hci_event(StackEvent::Other(0xfe));
    ble.stack_mut()
        .push_hci_event(StackEvent::AttConnected { conn_handle: 1 });
    ble.process_events();
    assert!(ble.events().events.is_empty());
    assert!(ble.is_active());
}

#[test]
fn only_hci_event_packets_are_decoded() {
    use blebridge::app::dispatch::packet_handler_generic;
    use blebridge::app::events::PacketType;

    let mut ble = active_adapter();
    let off = StackEvent::StateChanged(HciState::Off);
    packet_handler_generic(&mut ble, PacketType::AclData, &off);
    assert!(ble.is_active());
    packet_handler_generic(&mut ble, PacketType::HciEvent, &off);
    assert_eq!(ble.state(), AdapterState::Off);
}
