//! `vcsec.proto`: the vehicle-security domain payloads plus the legacy
//! `ToVCSECMessage` envelope used for the whitelist bootstrap.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignatureType {
    None = 0,
    PresentKey = 2,
    AesGcm = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeyFormFactor {
    Unknown = 0,
    NfcCard = 1,
    IosDevice = 2,
    AndroidDevice = 3,
    CloudKey = 9,
}

/// Remote keyless entry actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RkeAction {
    Unlock = 0,
    Lock = 1,
    OpenTrunk = 2,
    OpenFrunk = 3,
    OpenChargePort = 4,
    CloseChargePort = 5,
    WakeVehicle = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum InformationRequestType {
    GetStatus = 0,
    GetWhitelistInfo = 1,
    GetWhitelistEntryInfo = 2,
    GetEphemeralPublicKey = 3,
}

/// A whitelisted key, identified by the first four bytes of the SHA-1 of
/// its public key.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyIdentifier {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key_sha1: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InformationRequest {
    #[prost(enumeration = "InformationRequestType", tag = "1")]
    pub information_request_type: i32,
    #[prost(oneof = "information_request::Key", tags = "2, 3, 4")]
    pub key: Option<information_request::Key>,
}

pub mod information_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Key {
        #[prost(message, tag = "2")]
        KeyId(super::KeyIdentifier),
        #[prost(bytes, tag = "3")]
        PublicKey(Vec<u8>),
        #[prost(uint32, tag = "4")]
        Slot(u32),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicKey {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key_raw: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WhitelistKeyPermission {
    ModifyWhitelist = 0,
    LocalUnlock = 5,
    LocalDrive = 6,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PermissionChange {
    #[prost(message, optional, tag = "1")]
    pub key: Option<PublicKey>,
    #[prost(enumeration = "WhitelistKeyPermission", repeated, tag = "3")]
    pub permission: Vec<i32>,
    #[prost(enumeration = "crate::keys::Role", tag = "4")]
    pub key_role: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyMetadata {
    #[prost(enumeration = "KeyFormFactor", tag = "1")]
    pub key_form_factor: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WhitelistOperation {
    #[prost(oneof = "whitelist_operation::SubMessage", tags = "6")]
    pub sub_message: Option<whitelist_operation::SubMessage>,
    #[prost(message, optional, tag = "8")]
    pub metadata_for_key: Option<KeyMetadata>,
}

pub mod whitelist_operation {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubMessage {
        #[prost(message, tag = "6")]
        AddKeyToWhitelistAndAddPermissions(super::PermissionChange),
    }
}

/**
    Legacy signed wrapper. For the PRESENT_KEY bootstrap the inner bytes are
    plaintext and the signature fields are unused.
*/
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedMessage {
    #[prost(bytes = "vec", tag = "2")]
    pub protobuf_message_as_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub signature: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub counter: u32,
    #[prost(bytes = "vec", tag = "5")]
    pub key_id: Vec<u8>,
    #[prost(enumeration = "SignatureType", tag = "6")]
    pub signature_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnsignedMessage {
    #[prost(oneof = "unsigned_message::SubMessage", tags = "1, 2, 16")]
    pub sub_message: Option<unsigned_message::SubMessage>,
}

pub mod unsigned_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubMessage {
        #[prost(message, tag = "1")]
        InformationRequest(super::InformationRequest),
        #[prost(enumeration = "super::RkeAction", tag = "2")]
        RkeAction(i32),
        #[prost(message, tag = "16")]
        WhitelistOperation(super::WhitelistOperation),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ToVcsecMessage {
    #[prost(oneof = "to_vcsec_message::SubMessage", tags = "1, 2")]
    pub sub_message: Option<to_vcsec_message::SubMessage>,
}

pub mod to_vcsec_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubMessage {
        #[prost(message, tag = "1")]
        SignedMessage(super::SignedMessage),
        #[prost(message, tag = "2")]
        UnsignedMessage(super::UnsignedMessage),
    }
}

// ── Status reporting ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ClosureState {
    Closed = 0,
    Open = 1,
    Ajar = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum VehicleLockState {
    Unlocked = 0,
    Locked = 1,
    InternalLocked = 2,
    SelectiveUnlocked = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum VehicleSleepStatus {
    Unknown = 0,
    Awake = 1,
    Asleep = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum UserPresence {
    Unknown = 0,
    NotPresent = 1,
    Present = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClosureStatuses {
    #[prost(enumeration = "ClosureState", tag = "1")]
    pub front_driver_door: i32,
    #[prost(enumeration = "ClosureState", tag = "2")]
    pub front_passenger_door: i32,
    #[prost(enumeration = "ClosureState", tag = "3")]
    pub rear_driver_door: i32,
    #[prost(enumeration = "ClosureState", tag = "4")]
    pub rear_passenger_door: i32,
    #[prost(enumeration = "ClosureState", tag = "5")]
    pub rear_trunk: i32,
    #[prost(enumeration = "ClosureState", tag = "6")]
    pub front_trunk: i32,
    #[prost(enumeration = "ClosureState", tag = "7")]
    pub charge_port: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VehicleStatus {
    /// Present only when the vehicle is awake enough to report closures.
    #[prost(message, optional, tag = "1")]
    pub closure_statuses: Option<ClosureStatuses>,
    #[prost(enumeration = "VehicleLockState", tag = "2")]
    pub vehicle_lock_state: i32,
    #[prost(enumeration = "VehicleSleepStatus", tag = "3")]
    pub vehicle_sleep_status: i32,
    #[prost(enumeration = "UserPresence", tag = "4")]
    pub user_presence: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    Ok = 0,
    Wait = 1,
    Error = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandStatus {
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub operation_status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GenericError {
    None = 0,
    Unknown = 1,
    ClosuresOpen = 2,
    AlreadyPerformed = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NominalError {
    #[prost(enumeration = "GenericError", tag = "1")]
    pub generic_error: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WhitelistInfo {
    #[prost(uint32, tag = "1")]
    pub number_of_entries: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WhitelistEntryInfo {
    #[prost(message, optional, tag = "1")]
    pub key_id: Option<KeyIdentifier>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FromVcsecMessage {
    #[prost(oneof = "from_vcsec_message::SubMessage", tags = "1, 3, 4, 16, 17")]
    pub sub_message: Option<from_vcsec_message::SubMessage>,
}

pub mod from_vcsec_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubMessage {
        #[prost(message, tag = "1")]
        VehicleStatus(super::VehicleStatus),
        #[prost(message, tag = "3")]
        NominalError(super::NominalError),
        #[prost(message, tag = "4")]
        CommandStatus(super::CommandStatus),
        #[prost(message, tag = "16")]
        WhitelistInfo(super::WhitelistInfo),
        #[prost(message, tag = "17")]
        WhitelistEntryInfo(super::WhitelistEntryInfo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn vehicle_status_round_trip() {
        let status = VehicleStatus {
            closure_statuses: None,
            vehicle_lock_state: VehicleLockState::Locked as i32,
            vehicle_sleep_status: VehicleSleepStatus::Asleep as i32,
            user_presence: UserPresence::NotPresent as i32,
        };
        let decoded = VehicleStatus::decode(status.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, status);
    }

    #[test]
    fn to_vcsec_unsigned_round_trip() {
        let msg = ToVcsecMessage {
            sub_message: Some(to_vcsec_message::SubMessage::UnsignedMessage(
                UnsignedMessage {
                    sub_message: Some(unsigned_message::SubMessage::RkeAction(
                        RkeAction::WakeVehicle as i32,
                    )),
                },
            )),
        };
        let decoded = ToVcsecMessage::decode(msg.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn from_vcsec_command_status_round_trip() {
        let msg = FromVcsecMessage {
            sub_message: Some(from_vcsec_message::SubMessage::CommandStatus(
                CommandStatus {
                    operation_status: OperationStatus::Ok as i32,
                },
            )),
        };
        let decoded = FromVcsecMessage::decode(msg.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }
}
