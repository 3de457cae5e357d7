#![allow(clippy::doc_overindented_list_items)]

/*!
    BLE client core for Tesla's vehicle-command protocol.

    A single-threaded, tick-driven engine that authenticates against the
    vehicle's security domains, signs and seals commands end to end, and
    speaks the length-prefixed GATT framing, leaving the actual BLE central
    and blob storage to the host.
*/

mod codec;
mod command;
mod constants;
mod crypto;
mod engine;
mod error;
mod framing;
mod identity;
mod metadata;
mod session;
mod state;
mod storage;

pub mod proto {
    pub use tesla_ble_proto::prost::Message;
    pub use tesla_ble_proto::*;
}

pub use self::codec::{
    BuiltMessage, build_pairing_message, build_session_info_request, build_signed_message,
    build_unsigned_vcsec_message, decrypt_response_payload, parse_routable_message,
    validate_response,
};
pub use self::command::{CommandHandle, CommandKind, CommandState, DataRequest};
pub use self::constants::{
    BLOCK_LENGTH, MAX_MESSAGE_SIZE, READ_UUID, SERVICE_UUID, WRITE_UUID,
};
pub use self::crypto::{derive_key_id, ecdh_session_key, metadata_nonce, open, seal};
pub use self::engine::Vehicle;
pub use self::error::{ClientResult, CommandFailure, CryptoError, ProtocolError};
pub use self::framing::Framer;
pub use self::identity::{LocalIdentity, vin_advertisement_name};
pub use self::metadata::{Metadata, signed_message_metadata};
pub use self::session::{Session, SessionRegistry, SessionUpdate};
pub use self::state::{
    ChargeSummary, ClimateSummary, DriveSummary, SleepState, VehicleEvent, VehicleStateCache,
};
pub use self::storage::{MemoryStorage, Storage};
