//! End-to-end engine scenarios against a scripted vehicle.
//!
//! The "car" side here derives the same ECDH session keys the engine does,
//! opens the engine's sealed payloads, and answers with hand-built
//! routable messages pushed back through the BLE framing.

use p256::SecretKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;

use tesla_ble::proto::Message;
use tesla_ble::proto::carserver;
use tesla_ble::proto::signatures::{
    AesGcmPersonalizedSignatureData, SessionInfo, SignatureData, SignatureType, signature_data,
};
use tesla_ble::proto::universal::{
    Destination, Domain, MessageFault, MessageStatus, OperationStatus, RoutableMessage,
    routable_message,
};
use tesla_ble::proto::vcsec;
use tesla_ble::{
    CommandFailure, DataRequest, Framer, MemoryStorage, Vehicle, VehicleEvent, ecdh_session_key,
    open, parse_routable_message, signed_message_metadata,
};

const VIN: &str = "5YJ3E1EA7KF000316";

/// Vehicle-side endpoint for one security domain.
struct FakeCar {
    secret: SecretKey,
    public: Vec<u8>,
    epoch: Vec<u8>,
}

impl FakeCar {
    fn new(fill: u8, epoch: u8) -> Self {
        let mut bytes = [fill; 32];
        bytes[0] = 0x01;
        let secret = SecretKey::from_slice(&bytes).unwrap();
        let public = secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Self {
            secret,
            public,
            epoch: vec![epoch; 16],
        }
    }

    fn session_info_message(
        &self,
        domain: Domain,
        counter: u32,
        clock_time: u32,
        request_uuid: &[u8],
    ) -> RoutableMessage {
        let info = SessionInfo {
            counter,
            public_key: self.public.clone(),
            epoch: self.epoch.clone(),
            clock_time,
            status: 0,
        };
        RoutableMessage {
            from_destination: Some(Destination::domain(domain)),
            to_destination: Some(Destination::domain(Domain::Broadcast)),
            payload: Some(routable_message::Payload::SessionInfo(
                info.encode_to_vec(),
            )),
            request_uuid: request_uuid.to_vec(),
            ..Default::default()
        }
    }

    /// Open a signed message from the engine, returning the inner plaintext
    /// and its signature fields.
    fn open_signed(
        &self,
        client_public: &[u8],
        domain: Domain,
        message: &RoutableMessage,
    ) -> (Vec<u8>, AesGcmPersonalizedSignatureData) {
        let Some(SignatureData {
            sig_type: Some(signature_data::SigType::AesGcmPersonalizedData(gcm)),
            ..
        }) = message.signature_data.clone()
        else {
            panic!("message is not AES-GCM personalized");
        };
        let Some(routable_message::Payload::ProtobufMessageAsBytes(ciphertext)) = &message.payload
        else {
            panic!("message has no ciphertext payload");
        };

        let key = ecdh_session_key(&self.secret, client_public).unwrap();
        let metadata = signed_message_metadata(
            SignatureType::AesGcmPersonalized,
            domain,
            VIN,
            &gcm.epoch,
            gcm.expires_at,
            gcm.counter,
        );
        let plaintext = open(&key, &gcm.nonce, &metadata, ciphertext, &gcm.tag)
            .expect("engine-sealed payload must open with the shared key");
        (plaintext, gcm)
    }
}

fn vehicle_status_message(
    sleep: vcsec::VehicleSleepStatus,
    request_uuid: &[u8],
) -> RoutableMessage {
    let status = vcsec::FromVcsecMessage {
        sub_message: Some(vcsec::from_vcsec_message::SubMessage::VehicleStatus(
            vcsec::VehicleStatus {
                closure_statuses: None,
                vehicle_lock_state: vcsec::VehicleLockState::Locked as i32,
                vehicle_sleep_status: sleep as i32,
                user_presence: vcsec::UserPresence::NotPresent as i32,
            },
        )),
    };
    RoutableMessage {
        from_destination: Some(Destination::domain(Domain::VehicleSecurity)),
        to_destination: Some(Destination::domain(Domain::Broadcast)),
        payload: Some(routable_message::Payload::ProtobufMessageAsBytes(
            status.encode_to_vec(),
        )),
        request_uuid: request_uuid.to_vec(),
        ..Default::default()
    }
}

fn carserver_ok_message(request_uuid: &[u8]) -> RoutableMessage {
    let response = carserver::Response {
        action_status: Some(carserver::ActionStatus {
            result: carserver::OperationStatus::Ok as i32,
            result_reason: None,
        }),
        response_msg: None,
    };
    RoutableMessage {
        from_destination: Some(Destination::domain(Domain::Infotainment)),
        to_destination: Some(Destination::domain(Domain::Broadcast)),
        payload: Some(routable_message::Payload::ProtobufMessageAsBytes(
            response.encode_to_vec(),
        )),
        request_uuid: request_uuid.to_vec(),
        ..Default::default()
    }
}

fn charge_data_message(battery_level: f32, request_uuid: &[u8]) -> RoutableMessage {
    let response = carserver::Response {
        action_status: None,
        response_msg: Some(carserver::response::ResponseMsg::VehicleData(
            carserver::VehicleData {
                charge_state: Some(carserver::ChargeState {
                    battery_level: Some(battery_level),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )),
    };
    RoutableMessage {
        from_destination: Some(Destination::domain(Domain::Infotainment)),
        to_destination: Some(Destination::domain(Domain::Broadcast)),
        payload: Some(routable_message::Payload::ProtobufMessageAsBytes(
            response.encode_to_vec(),
        )),
        request_uuid: request_uuid.to_vec(),
        ..Default::default()
    }
}

fn error_status_message(
    domain: Domain,
    fault: MessageFault,
    request_uuid: &[u8],
) -> RoutableMessage {
    RoutableMessage {
        from_destination: Some(Destination::domain(domain)),
        to_destination: Some(Destination::domain(Domain::Broadcast)),
        signed_message_status: Some(MessageStatus {
            operation_status: OperationStatus::Error as i32,
            signed_message_fault: fault as i32,
        }),
        request_uuid: request_uuid.to_vec(),
        ..Default::default()
    }
}

// ── Harness plumbing ──────────────────────────────────────────────────

/// Advance the engine a few steps at one instant: the FSM moves one
/// transition per tick, and responses are dispatched one per tick.
fn pump(v: &mut Vehicle<MemoryStorage>, now_ms: u32) {
    for _ in 0..4 {
        v.tick(now_ms);
    }
}

fn new_vehicle() -> Vehicle<MemoryStorage> {
    let mut v = Vehicle::new(MemoryStorage::new());
    v.set_vin(VIN);
    v.on_connected();
    v
}

/// Pull every pending chunk off the engine and reassemble the messages it
/// sent, asserting the 20-byte chunk discipline along the way.
fn drain(v: &mut Vehicle<MemoryStorage>) -> Vec<RoutableMessage> {
    let mut reassembler = Framer::new();
    let mut messages = Vec::new();
    while let Some(chunk) = v.take_next_chunk() {
        assert!(chunk.len() <= 20, "chunk exceeds BLE write size");
        if let Some(bytes) = reassembler.push_chunk(&chunk, 0) {
            messages.push(parse_routable_message(&bytes).unwrap());
        }
    }
    messages
}

/// Frame a vehicle reply and push it at the engine in BLE-sized chunks.
fn feed(v: &mut Vehicle<MemoryStorage>, message: &RoutableMessage, now_ms: u32) {
    let bytes = message.encode_to_vec();
    let mut framed = Vec::with_capacity(bytes.len() + 2);
    framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    framed.extend_from_slice(&bytes);
    for chunk in framed.chunks(20) {
        v.on_bytes_received(chunk, now_ms);
    }
}

fn collect_events(v: &mut Vehicle<MemoryStorage>) -> Vec<VehicleEvent> {
    std::iter::from_fn(|| v.poll_event()).collect()
}

fn assert_completed(events: &[VehicleEvent], handle: tesla_ble::CommandHandle) {
    assert!(
        events
            .iter()
            .any(|e| matches!(e, VehicleEvent::CommandCompleted { handle: h } if *h == handle)),
        "command {handle} did not complete: {events:?}"
    );
}

// ── Scenarios ─────────────────────────────────────────────────────────

#[test]
fn cold_wake_runs_handshake_then_wake_action() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();
    let client_public = v.identity().public_key().to_vec();

    let handle = v.wake_vehicle().unwrap();
    pump(&mut v, 0);

    // With no session, the first thing on the wire is a VCSEC handshake.
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].to_destination.as_ref().unwrap().as_domain(),
        Some(Domain::VehicleSecurity)
    );
    assert!(matches!(
        out[0].payload,
        Some(routable_message::Payload::SessionInfoRequest(_))
    ));
    let auth_uuid = out[0].request_uuid.clone();
    assert_eq!(auth_uuid.len(), 16);

    // Session info arrives; the same tick sends the signed wake action.
    feed(
        &mut v,
        &car.session_info_message(Domain::VehicleSecurity, 42, 1_000, &auth_uuid),
        100,
    );
    pump(&mut v, 100);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    let (plaintext, gcm) = car.open_signed(&client_public, Domain::VehicleSecurity, &out[0]);
    assert_eq!(gcm.counter, 43);
    let unsigned = vcsec::UnsignedMessage::decode(plaintext.as_slice()).unwrap();
    assert_eq!(
        unsigned.sub_message,
        Some(vcsec::unsigned_message::SubMessage::RkeAction(
            vcsec::RkeAction::WakeVehicle as i32
        ))
    );

    // An AWAKE status resolves the command.
    feed(
        &mut v,
        &vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &out[0].request_uuid),
        200,
    );
    pump(&mut v, 200);

    let events = collect_events(&mut v);
    assert_completed(&events, handle);
    assert!(!v.state().is_asleep());
}

#[test]
fn charge_amps_from_asleep_wakes_then_authenticates_infotainment() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();
    let client_public = v.identity().public_key().to_vec();

    // Establish the VCSEC session and learn the vehicle is asleep via a
    // status poll.
    let poll = v.poll_vcsec_status().unwrap();
    pump(&mut v, 0);
    let out = drain(&mut v);
    feed(
        &mut v,
        &car.session_info_message(Domain::VehicleSecurity, 10, 5_000, &out[0].request_uuid),
        50,
    );
    pump(&mut v, 50);
    let out = drain(&mut v);
    let (_, _) = car.open_signed(&client_public, Domain::VehicleSecurity, &out[0]);
    feed(
        &mut v,
        &vehicle_status_message(vcsec::VehicleSleepStatus::Asleep, &out[0].request_uuid),
        100,
    );
    pump(&mut v, 100);
    assert_completed(&collect_events(&mut v), poll);
    assert!(v.state().is_asleep());

    // Now the real command. It must wake the vehicle first.
    let handle = v.set_charging_amps(24).unwrap();
    pump(&mut v, 200);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    let (plaintext, _) = car.open_signed(&client_public, Domain::VehicleSecurity, &out[0]);
    let unsigned = vcsec::UnsignedMessage::decode(plaintext.as_slice()).unwrap();
    assert!(matches!(
        unsigned.sub_message,
        Some(vcsec::unsigned_message::SubMessage::RkeAction(_))
    ));

    // Awake status lets the command continue into the infotainment
    // handshake on the same tick.
    feed(
        &mut v,
        &vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &out[0].request_uuid),
        300,
    );
    pump(&mut v, 300);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].to_destination.as_ref().unwrap().as_domain(),
        Some(Domain::Infotainment)
    );
    assert!(matches!(
        out[0].payload,
        Some(routable_message::Payload::SessionInfoRequest(_))
    ));

    feed(
        &mut v,
        &car.session_info_message(Domain::Infotainment, 5, 9_000, &out[0].request_uuid),
        400,
    );
    pump(&mut v, 400);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    let (plaintext, gcm) = car.open_signed(&client_public, Domain::Infotainment, &out[0]);
    assert_eq!(gcm.counter, 6);
    let action = carserver::Action::decode(plaintext.as_slice()).unwrap();
    let Some(carserver::action::ActionMsg::VehicleAction(va)) = action.action_msg else {
        panic!("expected a vehicle action");
    };
    assert_eq!(
        va.vehicle_action_msg,
        Some(
            carserver::vehicle_action::VehicleActionMsg::SetChargingAmpsAction(
                carserver::SetChargingAmpsAction { charging_amps: 24 }
            )
        )
    );

    feed(&mut v, &carserver_ok_message(&out[0].request_uuid), 500);
    pump(&mut v, 500);
    assert_completed(&collect_events(&mut v), handle);
}

#[test]
fn replayed_session_info_is_idempotent_and_silent() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();

    let info = car.session_info_message(Domain::VehicleSecurity, 42, 1_000, &[]);
    feed(&mut v, &info, 0);
    pump(&mut v, 0);
    feed(&mut v, &info, 10);
    pump(&mut v, 10);

    let session = v.sessions().session(Domain::VehicleSecurity);
    assert!(session.is_valid());
    assert_eq!(session.counter(), 42);
    assert!(v.take_next_chunk().is_none(), "no outbound side effects");
}

#[test]
fn epoch_rotation_restarts_counters_under_new_epoch() {
    let car_old = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();
    let client_public = v.identity().public_key().to_vec();

    // Seed the session at a high counter under the old epoch.
    feed(
        &mut v,
        &car_old.session_info_message(Domain::VehicleSecurity, 100, 1_000, &[]),
        0,
    );
    pump(&mut v, 0);

    // The vehicle resets its session: new epoch, counter back to 5.
    let car_new = FakeCar::new(0x55, 0xB2);
    feed(
        &mut v,
        &car_new.session_info_message(Domain::VehicleSecurity, 5, 2_000, &[]),
        10,
    );
    pump(&mut v, 10);

    // The next signed message uses counter 6 and authenticates under the
    // new epoch (decryption rebuilds the AAD from it).
    let handle = v.wake_vehicle().unwrap();
    pump(&mut v, 20);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    let (_, gcm) = car_new.open_signed(&client_public, Domain::VehicleSecurity, &out[0]);
    assert_eq!(gcm.counter, 6);
    assert_eq!(gcm.epoch, vec![0xB2; 16]);

    feed(
        &mut v,
        &vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &out[0].request_uuid),
        30,
    );
    pump(&mut v, 30);
    assert_completed(&collect_events(&mut v), handle);
}

#[test]
fn fragmented_response_surfaces_exactly_one_message() {
    let mut v = new_vehicle();

    // The uuid pads the message past one BLE chunk so it actually
    // fragments on the wire.
    let status = vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &[0xEE; 16]);
    let bytes = status.encode_to_vec();
    let mut framed = Vec::new();
    framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    framed.extend_from_slice(&bytes);

    // Deliver in uneven chunks; only the final one completes the message.
    let cut_a = 20.min(framed.len());
    let cut_b = 40.min(framed.len());
    v.on_bytes_received(&framed[..cut_a], 0);
    pump(&mut v, 0);
    assert!(collect_events(&mut v).is_empty());
    v.on_bytes_received(&framed[cut_a..cut_b], 5);
    v.on_bytes_received(&framed[cut_b..], 10);
    pump(&mut v, 10);

    let events = collect_events(&mut v);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, VehicleEvent::VehicleStatus { .. }))
            .count(),
        1
    );

    // The buffer is empty again; the next message parses from scratch.
    feed(&mut v, &status, 20);
    pump(&mut v, 20);
    assert_eq!(collect_events(&mut v).len(), 1);
}

#[test]
fn vehicle_error_invalidates_session_and_next_command_reauthenticates() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();

    // Sessions for both domains, vehicle awake.
    feed(
        &mut v,
        &car.session_info_message(Domain::VehicleSecurity, 10, 1_000, &[]),
        0,
    );
    pump(&mut v, 0);
    feed(
        &mut v,
        &car.session_info_message(Domain::Infotainment, 20, 1_000, &[]),
        1,
    );
    pump(&mut v, 1);
    feed(
        &mut v,
        &vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &[]),
        2,
    );
    pump(&mut v, 2);
    collect_events(&mut v);

    // Send a charging command and have the vehicle reject it.
    let handle = v.set_charging_enabled(true).unwrap();
    pump(&mut v, 100);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    feed(
        &mut v,
        &error_status_message(
            Domain::Infotainment,
            MessageFault::InvalidTokenOrCounter,
            &out[0].request_uuid,
        ),
        200,
    );
    pump(&mut v, 200);

    let events = collect_events(&mut v);
    assert!(events.iter().any(|e| matches!(
        e,
        VehicleEvent::CommandFailed {
            handle: h,
            failure: CommandFailure::VehicleFault(MessageFault::InvalidTokenOrCounter),
        } if *h == handle
    )));
    assert!(!v.sessions().is_authenticated(Domain::Infotainment));

    // The next infotainment command opens with a fresh handshake.
    v.set_charging_enabled(true).unwrap();
    pump(&mut v, 300);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].to_destination.as_ref().unwrap().as_domain(),
        Some(Domain::Infotainment)
    );
    assert!(matches!(
        out[0].payload,
        Some(routable_message::Payload::SessionInfoRequest(_))
    ));
}

#[test]
fn response_timeout_retries_with_fresh_counter() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();
    let client_public = v.identity().public_key().to_vec();

    feed(
        &mut v,
        &car.session_info_message(Domain::VehicleSecurity, 10, 1_000, &[]),
        0,
    );
    pump(&mut v, 0);

    v.wake_vehicle().unwrap();
    pump(&mut v, 100);
    let first = drain(&mut v);
    let (_, gcm) = car.open_signed(&client_public, Domain::VehicleSecurity, &first[0]);
    assert_eq!(gcm.counter, 11);

    // No reply within the latency window: the command rebuilds and
    // retransmits with the next counter value.
    pump(&mut v, 100 + 4_001);
    pump(&mut v, 100 + 4_002);
    let second = drain(&mut v);
    assert_eq!(second.len(), 1);
    let (_, gcm) = car.open_signed(&client_public, Domain::VehicleSecurity, &second[0]);
    assert_eq!(gcm.counter, 12);
}

#[test]
fn infotainment_data_poll_completes_on_bare_data_and_emits_charge_event() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();

    feed(
        &mut v,
        &car.session_info_message(Domain::VehicleSecurity, 10, 1_000, &[]),
        0,
    );
    pump(&mut v, 0);
    feed(
        &mut v,
        &car.session_info_message(Domain::Infotainment, 20, 1_000, &[]),
        1,
    );
    pump(&mut v, 1);

    let handle = v.poll_infotainment(DataRequest::CHARGE).unwrap();
    pump(&mut v, 100);
    let out = drain(&mut v);
    assert_eq!(out.len(), 1);

    feed(&mut v, &charge_data_message(71.5, &out[0].request_uuid), 200);
    pump(&mut v, 200);

    let events = collect_events(&mut v);
    assert_completed(&events, handle);
    assert!(events.iter().any(|e| matches!(
        e,
        VehicleEvent::ChargeState(summary) if summary.battery_level == Some(71.5)
    )));
    assert_eq!(
        v.state().charge().and_then(|c| c.battery_level),
        Some(71.5)
    );
}

#[test]
fn commands_resolve_in_fifo_order() {
    let car = FakeCar::new(0x55, 0xA1);
    let mut v = new_vehicle();
    let client_public = v.identity().public_key().to_vec();

    feed(
        &mut v,
        &car.session_info_message(Domain::VehicleSecurity, 10, 1_000, &[]),
        0,
    );
    pump(&mut v, 0);
    feed(
        &mut v,
        &vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &[]),
        1,
    );
    pump(&mut v, 1);
    collect_events(&mut v);

    let first = v.poll_vcsec_status().unwrap();
    let second = v.poll_vcsec_status().unwrap();

    for (i, expected) in [first, second].into_iter().enumerate() {
        let tx_at = 100 + i as u32 * 200;
        pump(&mut v, tx_at);
        let out = drain(&mut v);
        assert_eq!(out.len(), 1);
        car.open_signed(&client_public, Domain::VehicleSecurity, &out[0]);
        feed(
            &mut v,
            &vehicle_status_message(vcsec::VehicleSleepStatus::Awake, &out[0].request_uuid),
            tx_at + 50,
        );
        pump(&mut v, tx_at + 50);
        let events = collect_events(&mut v);
        assert_completed(&events, expected);
    }
}
