//! GATT client flows: discovery, reads, both write modes, value updates
//! and the call-site attribution of query completions.

use crate::mock_events::{Ev, TestAdapter, active_adapter, connect};

use blebridge::adapters::sim_stack::{ATT_ERROR_HCI_DISCONNECT_RECEIVED, StackCall};
use blebridge::app::events::{
    ConnHandle, GattCharacteristic, GattDescriptor, GattService, LinkRole, StackEvent,
};
use blebridge::app::pending::PendingKind;
use blebridge::app::ports::{DataKind, DiscoverKind, ReadWriteKind};
use blebridge::uuid::{StackUuid, Uuid};
use blebridge::{BleError, WriteMode};

fn central() -> (TestAdapter, ConnHandle) {
    let mut ble = active_adapter();
    let conn = connect(&mut ble, LinkRole::Central);
    ble.stack_mut().take_calls();
    ble.events_mut().take();
    (ble, conn)
}

fn finish(ble: &mut TestAdapter, conn: ConnHandle, status: u8) {
    assert!(ble.stack_mut().complete_query(conn, status), "no query running");
    ble.process_events();
}

fn pending_kinds(ble: &TestAdapter) -> Vec<PendingKind> {
    ble.with_pending(|q| q.iter().map(|op| op.kind()).collect())
        .unwrap_or_default()
}

// ── Discovery ─────────────────────────────────────────────────

#[test]
fn service_discovery_reports_results_then_completion() {
    let (mut ble, conn) = central();
    ble.gattc_discover_primary_services(conn, None).unwrap();

    let mut long_be = [0u8; 16];
    long_be[0] = 0xaa;
    long_be[15] = 0x01;
    for (start, uuid16, uuid128) in [(0x10, 0x180f, [0u8; 16]), (0x20, 0, long_be)] {
        ble.stack_mut().deliver_query_result(
            conn,
            StackEvent::ServiceQueryResult {
                conn_handle: conn,
                service: GattService {
                    start_group_handle: start,
                    end_group_handle: start + 5,
                    uuid16,
                    uuid128,
                },
            },
        );
    }
    finish(&mut ble, conn, 0);

    let mut long_le = long_be;
    long_le.reverse();
    assert_eq!(
        ble.events().events,
        vec![
            Ev::Service {
                conn,
                start: 0x10,
                end: 0x15,
                uuid: Uuid::Uuid16(0x180f)
            },
            Ev::Service {
                conn,
                start: 0x20,
                end: 0x25,
                uuid: Uuid::Uuid128(long_le)
            },
            Ev::DiscoverComplete {
                kind: DiscoverKind::Services,
                conn,
                status: 0
            },
        ]
    );
}

#[test]
fn discovery_by_uuid_passes_the_stack_form() {
    let (mut ble, conn) = central();
    ble.gattc_discover_primary_services(conn, Some(&Uuid::Uuid16(0x180d)))
        .unwrap();
    assert_eq!(
        ble.stack().calls(),
        &[StackCall::DiscoverServices {
            conn,
            uuid: Some(StackUuid::Short(0x180d))
        }]
    );
    assert_eq!(
        ble.gattc_discover_characteristics(conn, 1, 5, Some(&Uuid::Uuid32(1))),
        Err(BleError::InvalidArgument)
    );
}

#[test]
fn characteristic_and_descriptor_completions_are_told_apart() {
    let (mut ble, conn) = central();

    ble.gattc_discover_characteristics(conn, 0x10, 0x15, None).unwrap();
    ble.stack_mut().deliver_query_result(
        conn,
        StackEvent::CharacteristicQueryResult {
            conn_handle: conn,
            characteristic: GattCharacteristic {
                start_handle: 0x11,
                value_handle: 0x12,
                end_handle: 0x13,
                properties: 0x12,
                uuid16: 0x2a19,
                uuid128: [0; 16],
            },
        },
    );
    finish(&mut ble, conn, 0);

    ble.gattc_discover_descriptors(conn, 0x13, 0x13).unwrap();
    ble.stack_mut().deliver_query_result(
        conn,
        StackEvent::DescriptorQueryResult {
            conn_handle: conn,
            descriptor: GattDescriptor {
                handle: 0x13,
                uuid16: 0x2902,
                uuid128: [0; 16],
            },
        },
    );
    finish(&mut ble, conn, 0);

    assert_eq!(
        ble.events().events,
        vec![
            Ev::Characteristic {
                conn,
                value_handle: 0x12,
                properties: 0x12,
                uuid: Uuid::Uuid16(0x2a19)
            },
            Ev::DiscoverComplete {
                kind: DiscoverKind::Characteristics,
                conn,
                status: 0
            },
            Ev::Descriptor {
                conn,
                handle: 0x13,
                uuid: Uuid::Uuid16(0x2902)
            },
            Ev::DiscoverComplete {
                kind: DiscoverKind::Descriptors,
                conn,
                status: 0
            },
        ]
    );
}

#[test]
fn second_query_on_a_busy_connection_is_already_in_progress() {
    let (mut ble, conn) = central();
    ble.gattc_discover_primary_services(conn, None).unwrap();
    assert_eq!(ble.gattc_read(conn, 3), Err(BleError::AlreadyInProgress));
}

#[test]
fn query_on_unknown_connection_is_not_connected() {
    let mut ble = active_adapter();
    assert_eq!(ble.gattc_read(0x0777, 3), Err(BleError::NotConnected));
    assert_eq!(
        ble.gattc_discover_descriptors(0x0777, 1, 2),
        Err(BleError::NotConnected)
    );
}

// ── Reads ─────────────────────────────────────────────────────

#[test]
fn read_delivers_value_then_status_without_touching_the_queue() {
    let (mut ble, conn) = central();
    ble.gattc_read(conn, 0x12).unwrap();
    ble.stack_mut().deliver_query_result(
        conn,
        StackEvent::CharacteristicValueQueryResult {
            conn_handle: conn,
            value_handle: 0x12,
            value: vec![1, 2, 3],
        },
    );
    finish(&mut ble, conn, 0x0e);

    assert_eq!(
        ble.events().events,
        vec![
            Ev::Data {
                kind: DataKind::ReadResult,
                conn,
                handle: 0x12,
                total: 3,
                received: vec![1, 2, 3]
            },
            Ev::ReadWrite {
                kind: ReadWriteKind::ReadDone,
                conn,
                handle: None,
                status: 0x0e
            },
        ]
    );
    assert!(pending_kinds(&ble).is_empty());
}

#[test]
fn delivered_data_is_clamped_to_what_the_application_accepts() {
    let (mut ble, conn) = central();
    ble.events_mut().accept_limit = 2;
    ble.gattc_read(conn, 0x12).unwrap();
    ble.stack_mut().deliver_query_result(
        conn,
        StackEvent::CharacteristicValueQueryResult {
            conn_handle: conn,
            value_handle: 0x12,
            value: vec![9, 8, 7, 6],
        },
    );
    ble.process_events();

    assert_eq!(ble.events().chunks, 1);
    assert_eq!(
        ble.events().events,
        vec![Ev::Data {
            kind: DataKind::ReadResult,
            conn,
            handle: 0x12,
            total: 4,
            received: vec![9, 8]
        }]
    );
}

// ── Value updates ─────────────────────────────────────────────

#[test]
fn notifications_and_indications_reach_the_application() {
    let (mut ble, conn) = central();
    assert!(ble.stack_mut().inject_notification(conn, 0x12, b"n"));
    assert!(ble.stack_mut().inject_indication(conn, 0x14, b"ii"));
    ble.process_events();

    let kinds: Vec<_> = ble
        .events()
        .events
        .iter()
        .map(|e| match e {
            Ev::Data {
                kind, handle, received, ..
            } => (*kind, *handle, received.clone()),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (DataKind::Notify, 0x12, b"n".to_vec()),
            (DataKind::Indicate, 0x14, b"ii".to_vec()),
        ]
    );
}

// ── Write with response ───────────────────────────────────────

#[test]
fn write_with_response_holds_payload_until_completion() {
    let (mut ble, conn) = central();
    let mut data = b"abc".to_vec();
    ble.gattc_write(conn, 0x12, &data, WriteMode::WithResponse)
        .unwrap();
    data.fill(0);

    assert_eq!(pending_kinds(&ble), vec![PendingKind::WriteWithResponse]);
    assert_eq!(
        ble.stack().calls(),
        &[StackCall::Write {
            conn,
            handle: 0x12,
            data: b"abc".to_vec()
        }]
    );

    finish(&mut ble, conn, 0);
    assert!(pending_kinds(&ble).is_empty());
    assert_eq!(
        ble.events().events,
        vec![Ev::ReadWrite {
            kind: ReadWriteKind::WriteDone,
            conn,
            handle: Some(0x12),
            status: 0
        }]
    );
}

#[test]
fn only_one_write_with_response_per_connection() {
    let (mut ble, conn) = central();
    ble.gattc_write(conn, 0x12, b"a", WriteMode::WithResponse)
        .unwrap();
    assert_eq!(
        ble.gattc_write(conn, 0x14, b"b", WriteMode::WithResponse),
        Err(BleError::AlreadyInProgress)
    );
    assert_eq!(pending_kinds(&ble).len(), 1);
}

#[test]
fn rejected_write_with_response_leaves_no_record() {
    let (mut ble, conn) = central();
    ble.gattc_read(conn, 0x10).unwrap();
    assert_eq!(
        ble.gattc_write(conn, 0x12, b"a", WriteMode::WithResponse),
        Err(BleError::AlreadyInProgress)
    );
    assert!(pending_kinds(&ble).is_empty());
}

#[test]
fn write_with_response_completes_once_when_the_link_drops() {
    let (mut ble, conn) = central();
    ble.gattc_write(conn, 0x12, b"a", WriteMode::WithResponse)
        .unwrap();
    ble.stack_mut().drop_connection(conn);
    ble.process_events();
    ble.stack_mut().advance(3_600_000);
    ble.process_events();

    let done: Vec<&Ev> = ble
        .events()
        .events
        .iter()
        .filter(|e| matches!(e, Ev::ReadWrite { .. }))
        .collect();
    assert_eq!(
        done,
        vec![&Ev::ReadWrite {
            kind: ReadWriteKind::WriteDone,
            conn,
            handle: Some(0x12),
            status: u16::from(ATT_ERROR_HCI_DISCONNECT_RECEIVED)
        }]
    );
    assert!(pending_kinds(&ble).is_empty());
    assert!(!ble.stack().has_active_query(conn));
}

#[test]
fn write_completion_without_a_queued_write_still_reports_done() {
    use blebridge::app::dispatch::packet_handler_write_with_response;
    use blebridge::app::events::PacketType;

    let (mut ble, conn) = central();
    let complete = StackEvent::QueryComplete {
        conn_handle: conn,
        att_status: 0x0e,
    };
    packet_handler_write_with_response(&mut ble, PacketType::HciEvent, &complete);
    assert_eq!(
        ble.events().events,
        vec![Ev::ReadWrite {
            kind: ReadWriteKind::WriteDone,
            conn,
            handle: None,
            status: 0x0e
        }]
    );
}

// ── Write without response ────────────────────────────────────

#[test]
fn write_without_response_goes_straight_out() {
    let (mut ble, conn) = central();
    ble.gattc_write(conn, 0x12, b"x", WriteMode::NoResponse).unwrap();
    assert_eq!(
        ble.stack().calls(),
        &[StackCall::WriteWithoutResponse {
            conn,
            handle: 0x12,
            data: b"x".to_vec()
        }]
    );
    assert!(pending_kinds(&ble).is_empty());
}

#[test]
fn busy_client_defers_write_until_can_write_event() {
    let (mut ble, conn) = central();
    ble.stack_mut().set_client_busy(true);
    let mut data = b"later".to_vec();
    ble.gattc_write(conn, 0x12, &data, WriteMode::NoResponse).unwrap();
    data.fill(0);

    assert_eq!(pending_kinds(&ble), vec![PendingKind::WriteNoResponse]);
    assert_eq!(
        ble.gattc_write(conn, 0x12, b"more", WriteMode::NoResponse),
        Err(BleError::Busy)
    );

    ble.stack_mut().release_client();
    ble.process_events();
    assert!(pending_kinds(&ble).is_empty());
    assert!(ble.stack().calls().contains(&StackCall::WriteWithoutResponse {
        conn,
        handle: 0x12,
        data: b"later".to_vec()
    }));
}

#[test]
fn can_write_event_while_still_busy_requeues() {
    let (mut ble, conn) = central();
    ble.stack_mut().set_client_busy(true);
    ble.gattc_write(conn, 0x12, b"w", WriteMode::NoResponse).unwrap();

    // The stack raises the event but the client is busy again.
    ble.stack_mut().release_client();
    ble.stack_mut().set_client_busy(true);
    ble.process_events();
    assert_eq!(pending_kinds(&ble), vec![PendingKind::WriteNoResponse]);

    ble.stack_mut().release_client();
    ble.process_events();
    assert!(pending_kinds(&ble).is_empty());
}

#[test]
fn disconnect_drops_queued_write_without_response() {
    let (mut ble, conn) = central();
    ble.stack_mut().set_client_busy(true);
    ble.gattc_write(conn, 0x12, b"w", WriteMode::NoResponse).unwrap();
    ble.stack_mut().drop_connection(conn);
    ble.process_events();
    assert!(pending_kinds(&ble).is_empty());
}

#[test]
fn untagged_query_complete_is_ignored() {
    let (mut ble, conn) = central();
    ble.gattc_write(conn, 0x12, b"a", WriteMode::WithResponse)
        .unwrap();
    ble.stack_mut().push_hci_event(StackEvent::QueryComplete {
        conn_handle: conn,
        att_status: 0,
    });
    ble.process_events();
    assert!(ble.events().events.is_empty());
    assert_eq!(pending_kinds(&ble), vec![PendingKind::WriteWithResponse]);
}
