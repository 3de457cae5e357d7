/*!
    Assembly and parsing of the protocol envelopes.

    Outbound universal messages are built here: the inner domain protobuf is
    serialized, the domain session counter advances exactly once, and the
    payload is sealed under AES-128-GCM with the canonical metadata as
    associated data. The legacy `ToVCSECMessage` envelope survives in two
    entry points: the PRESENT_KEY whitelist bootstrap and the unsigned
    information request, both of which the vehicle accepts without a
    session.
*/

use rand::RngCore;
use rand::rngs::OsRng;

use tesla_ble_proto::prost::Message;
use tesla_ble_proto::signatures::{
    AesGcmPersonalizedSignatureData, KeyIdentity, SessionInfo, SignatureData, SignatureType,
    key_identity, signature_data,
};
use tesla_ble_proto::universal::{
    Destination, Domain, RoutableMessage, SessionInfoRequest, destination, routable_message,
};
use tesla_ble_proto::vcsec;
use tesla_ble_proto::{carserver, keys};

use crate::command::DataRequest;
use crate::crypto;
use crate::error::{ClientResult, ProtocolError};
use crate::identity::LocalIdentity;
use crate::metadata::signed_message_metadata;
use crate::session::SessionRegistry;

/**
    A serialized outbound envelope plus the request uuid the response will
    echo.
*/
#[derive(Debug, Clone)]
pub struct BuiltMessage {
    pub bytes: Vec<u8>,
    pub request_uuid: [u8; 16],
}

fn random_uuid() -> [u8; 16] {
    let mut uuid = [0u8; 16];
    OsRng.fill_bytes(&mut uuid);
    uuid
}

// ── Outbound: universal envelope ──────────────────────────────────────

/**
    Request the vehicle's session info for a domain. Sent without a session;
    the reply validates one.
*/
pub fn build_session_info_request(identity: &LocalIdentity, domain: Domain) -> BuiltMessage {
    let request_uuid = random_uuid();
    let mut challenge = [0u8; 16];
    OsRng.fill_bytes(&mut challenge);

    let message = RoutableMessage {
        to_destination: Some(Destination::domain(domain)),
        payload: Some(routable_message::Payload::SessionInfoRequest(
            SessionInfoRequest {
                public_key: identity.public_key().to_vec(),
                challenge: challenge.to_vec(),
            },
        )),
        request_uuid: request_uuid.to_vec(),
        ..Default::default()
    };

    BuiltMessage {
        bytes: message.encode_to_vec(),
        request_uuid,
    }
}

/**
    Build a signed universal message carrying `plaintext` to `domain`.

    Advances the domain counter (exactly once, here), stamps the expiry from
    the session's view of the vehicle clock, and seals the payload. The GCM
    tag travels in the signature data, detached from the ciphertext.
*/
pub fn build_signed_message(
    identity: &LocalIdentity,
    sessions: &mut SessionRegistry,
    vin: &str,
    domain: Domain,
    plaintext: &[u8],
    now_ms: u32,
) -> ClientResult<BuiltMessage> {
    let session = sessions.session_mut(domain);
    if !session.is_valid() {
        return Err(ProtocolError::SessionNotReady(domain));
    }
    let key = *session
        .session_key()
        .ok_or(ProtocolError::SessionNotReady(domain))?;

    let counter = session.next_counter();
    let expires_at = session.expires_at(now_ms);
    let epoch = session.epoch().to_vec();

    let metadata = signed_message_metadata(
        SignatureType::AesGcmPersonalized,
        domain,
        vin,
        &epoch,
        expires_at,
        counter,
    );
    let nonce = crypto::metadata_nonce(&metadata);
    let (ciphertext, tag) = crypto::seal(&key, &nonce, &metadata, plaintext)?;

    let request_uuid = random_uuid();
    let message = RoutableMessage {
        to_destination: Some(Destination::domain(domain)),
        payload: Some(routable_message::Payload::ProtobufMessageAsBytes(
            ciphertext,
        )),
        signature_data: Some(SignatureData {
            signer_identity: Some(KeyIdentity {
                identity_type: Some(key_identity::IdentityType::PublicKey(
                    identity.public_key().to_vec(),
                )),
            }),
            sig_type: Some(signature_data::SigType::AesGcmPersonalizedData(
                AesGcmPersonalizedSignatureData {
                    epoch,
                    nonce: nonce.to_vec(),
                    counter,
                    expires_at,
                    tag: tag.to_vec(),
                },
            )),
        }),
        request_uuid: request_uuid.to_vec(),
        ..Default::default()
    };

    Ok(BuiltMessage {
        bytes: message.encode_to_vec(),
        request_uuid,
    })
}

// ── Outbound: legacy VCSEC envelope ───────────────────────────────────

/**
    The one-shot whitelist-add message. PRESENT_KEY means "authenticated by
    a physical key-card tap"; the vehicle shows no reaction until the card
    touches the reader.
*/
pub fn build_pairing_message(identity: &LocalIdentity, role: keys::Role) -> Vec<u8> {
    let permissions = vcsec::PermissionChange {
        key: Some(vcsec::PublicKey {
            public_key_raw: identity.public_key().to_vec(),
        }),
        permission: vec![
            vcsec::WhitelistKeyPermission::LocalUnlock as i32,
            vcsec::WhitelistKeyPermission::LocalDrive as i32,
        ],
        key_role: role as i32,
    };

    let operation = vcsec::WhitelistOperation {
        sub_message: Some(
            vcsec::whitelist_operation::SubMessage::AddKeyToWhitelistAndAddPermissions(permissions),
        ),
        metadata_for_key: Some(vcsec::KeyMetadata {
            key_form_factor: vcsec::KeyFormFactor::CloudKey as i32,
        }),
    };

    let unsigned = vcsec::UnsignedMessage {
        sub_message: Some(vcsec::unsigned_message::SubMessage::WhitelistOperation(
            operation,
        )),
    };

    let envelope = vcsec::ToVcsecMessage {
        sub_message: Some(vcsec::to_vcsec_message::SubMessage::SignedMessage(
            vcsec::SignedMessage {
                protobuf_message_as_bytes: unsigned.encode_to_vec(),
                signature_type: vcsec::SignatureType::PresentKey as i32,
                ..Default::default()
            },
        )),
    };
    envelope.encode_to_vec()
}

/**
    Wrap a VCSEC payload in the legacy unsigned envelope. Only the
    bootstrap information requests go this way.
*/
pub fn build_unsigned_vcsec_message(unsigned: &vcsec::UnsignedMessage) -> Vec<u8> {
    let envelope = vcsec::ToVcsecMessage {
        sub_message: Some(vcsec::to_vcsec_message::SubMessage::UnsignedMessage(
            unsigned.clone(),
        )),
    };
    envelope.encode_to_vec()
}

// ── Inner payloads ────────────────────────────────────────────────────

pub fn vcsec_action_payload(action: vcsec::RkeAction) -> Vec<u8> {
    vcsec::UnsignedMessage {
        sub_message: Some(vcsec::unsigned_message::SubMessage::RkeAction(
            action as i32,
        )),
    }
    .encode_to_vec()
}

pub fn vcsec_information_request_payload(
    identity: &LocalIdentity,
    request_type: vcsec::InformationRequestType,
) -> Vec<u8> {
    vcsec::UnsignedMessage {
        sub_message: Some(vcsec::unsigned_message::SubMessage::InformationRequest(
            vcsec::InformationRequest {
                information_request_type: request_type as i32,
                key: Some(vcsec::information_request::Key::KeyId(
                    vcsec::KeyIdentifier {
                        public_key_sha1: identity.key_id().to_vec(),
                    },
                )),
            },
        )),
    }
    .encode_to_vec()
}

fn vehicle_action(msg: carserver::vehicle_action::VehicleActionMsg) -> Vec<u8> {
    carserver::Action {
        action_msg: Some(carserver::action::ActionMsg::VehicleAction(
            carserver::VehicleAction {
                vehicle_action_msg: Some(msg),
            },
        )),
    }
    .encode_to_vec()
}

pub fn carserver_vehicle_data_payload(request: &DataRequest) -> Vec<u8> {
    let flag = |on: bool| on.then(carserver::Void::default);
    vehicle_action(
        carserver::vehicle_action::VehicleActionMsg::GetVehicleData(carserver::GetVehicleData {
            get_charge_state: flag(request.charge_state),
            get_climate_state: flag(request.climate_state),
            get_drive_state: flag(request.drive_state),
            get_closures_state: flag(request.closures_state),
        }),
    )
}

pub fn carserver_charging_start_stop_payload(enable: bool) -> Vec<u8> {
    let action = if enable {
        carserver::charging_start_stop_action::ChargingAction::Start(Default::default())
    } else {
        carserver::charging_start_stop_action::ChargingAction::Stop(Default::default())
    };
    vehicle_action(
        carserver::vehicle_action::VehicleActionMsg::ChargingStartStopAction(
            carserver::ChargingStartStopAction {
                charging_action: Some(action),
            },
        ),
    )
}

pub fn carserver_charging_amps_payload(amps: i32) -> Vec<u8> {
    vehicle_action(
        carserver::vehicle_action::VehicleActionMsg::SetChargingAmpsAction(
            carserver::SetChargingAmpsAction {
                charging_amps: amps,
            },
        ),
    )
}

pub fn carserver_charging_limit_payload(percent: i32) -> Vec<u8> {
    vehicle_action(
        carserver::vehicle_action::VehicleActionMsg::ChargingSetLimitAction(
            carserver::ChargingSetLimitAction { percent },
        ),
    )
}

pub fn carserver_charge_port_door_open_payload() -> Vec<u8> {
    vehicle_action(carserver::vehicle_action::VehicleActionMsg::ChargePortDoorOpen(
        Default::default(),
    ))
}

// ── Inbound ───────────────────────────────────────────────────────────

pub fn parse_routable_message(bytes: &[u8]) -> ClientResult<RoutableMessage> {
    Ok(RoutableMessage::decode(bytes)?)
}

pub fn parse_session_info(bytes: &[u8]) -> ClientResult<SessionInfo> {
    Ok(SessionInfo::decode(bytes)?)
}

pub fn parse_from_vcsec(bytes: &[u8]) -> ClientResult<vcsec::FromVcsecMessage> {
    Ok(vcsec::FromVcsecMessage::decode(bytes)?)
}

pub fn parse_carserver_response(bytes: &[u8]) -> ClientResult<carserver::Response> {
    Ok(carserver::Response::decode(bytes)?)
}

/**
    Structural validation of an inbound message. Anything failing here is
    dropped without touching command state.
*/
pub fn validate_response(message: &RoutableMessage) -> bool {
    let Some(from) = &message.from_destination else {
        return false;
    };
    if from.sub_destination.is_none() {
        return false;
    }

    if !message.request_uuid.is_empty() && message.request_uuid.len() != 16 {
        return false;
    }

    let Some(to) = &message.to_destination else {
        return false;
    };
    match &to.sub_destination {
        Some(destination::SubDestination::Domain(_)) => true,
        Some(destination::SubDestination::RoutingAddress(addr)) => addr.len() == 16,
        None => false,
    }
}

/**
    Recover the inner plaintext of a response payload.

    Payloads carrying AES-GCM-personalized signature data are decrypted
    against the domain session, reconstructing the metadata from the
    response's own signature fields; anything else is passed through as
    plaintext (VCSEC status traffic is not encrypted).
*/
pub fn decrypt_response_payload(
    sessions: &SessionRegistry,
    vin: &str,
    domain: Domain,
    message: &RoutableMessage,
) -> ClientResult<Vec<u8>> {
    let Some(routable_message::Payload::ProtobufMessageAsBytes(payload)) = &message.payload else {
        return Err(ProtocolError::EmptyResponse);
    };

    let gcm = match &message.signature_data {
        Some(SignatureData {
            sig_type: Some(signature_data::SigType::AesGcmPersonalizedData(gcm)),
            ..
        }) => gcm,
        _ => return Ok(payload.clone()),
    };

    let session = sessions.session(domain);
    let key = session
        .session_key()
        .ok_or(ProtocolError::SessionNotReady(domain))?;

    let metadata = signed_message_metadata(
        SignatureType::AesGcmPersonalized,
        domain,
        vin,
        &gcm.epoch,
        gcm.expires_at,
        gcm.counter,
    );
    Ok(crypto::open(key, &gcm.nonce, &metadata, payload, &gcm.tag)?)
}
