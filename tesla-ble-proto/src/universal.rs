//! `universal_message.proto`: the outer routable envelope.

use crate::signatures::SignatureData;

/**
    Security domain a routable message is addressed to or originates from.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Domain {
    Broadcast = 0,
    VehicleSecurity = 2,
    Infotainment = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Destination {
    #[prost(oneof = "destination::SubDestination", tags = "1, 2")]
    pub sub_destination: Option<destination::SubDestination>,
}

pub mod destination {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubDestination {
        #[prost(enumeration = "super::Domain", tag = "1")]
        Domain(i32),
        #[prost(bytes, tag = "2")]
        RoutingAddress(Vec<u8>),
    }
}

impl Destination {
    pub fn domain(d: Domain) -> Self {
        Self {
            sub_destination: Some(destination::SubDestination::Domain(d as i32)),
        }
    }

    /// The domain tag, if this destination is a domain at all.
    pub fn as_domain(&self) -> Option<Domain> {
        match self.sub_destination {
            Some(destination::SubDestination::Domain(raw)) => Domain::try_from(raw).ok(),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    Ok = 0,
    Wait = 1,
    Error = 2,
}

/**
    Fault detail attached to a signed-message status. The vehicle uses these
    to report why a signed command was rejected before reaching its domain.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageFault {
    None = 0,
    Busy = 1,
    Timeout = 2,
    UnknownKeyId = 3,
    InactiveKey = 4,
    InvalidSignature = 5,
    InvalidTokenOrCounter = 6,
    InsufficientPrivileges = 7,
    InvalidDomains = 8,
    InvalidCommand = 9,
    Decoding = 10,
    Internal = 11,
    WrongPersonalization = 12,
    BadParameter = 13,
    KeychainIsFull = 14,
    IncorrectEpoch = 15,
    IvIncorrectLength = 16,
    TimeExpired = 17,
    NotProvisionedWithIdentity = 18,
    CouldNotHashMetadata = 19,
    TimeToLiveTooLong = 20,
    RemoteAccessDisabled = 21,
    RemoteServiceAccessDisabled = 22,
    CommandRequiresAccountCredentials = 23,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageStatus {
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub operation_status: i32,
    #[prost(enumeration = "MessageFault", tag = "2")]
    pub signed_message_fault: i32,
}

/**
    Request for the peer's session state. The public key identifies the
    requesting key; the challenge is echoed back under the session-info tag.
*/
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionInfoRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub challenge: Vec<u8>,
}

/**
    The outer envelope for all universal-message traffic in both directions.

    `payload` carries either an opaque (possibly encrypted) domain protobuf,
    a session-info request, or serialized session info. `request_uuid` is
    chosen by the sender of a request and echoed by the responder.
*/
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoutableMessage {
    #[prost(message, optional, tag = "6")]
    pub to_destination: Option<Destination>,
    #[prost(message, optional, tag = "7")]
    pub from_destination: Option<Destination>,
    #[prost(oneof = "routable_message::Payload", tags = "10, 14, 15")]
    pub payload: Option<routable_message::Payload>,
    #[prost(message, optional, tag = "12")]
    pub signed_message_status: Option<MessageStatus>,
    #[prost(message, optional, tag = "13")]
    pub signature_data: Option<SignatureData>,
    #[prost(bytes = "vec", tag = "50")]
    pub request_uuid: Vec<u8>,
    #[prost(bytes = "vec", tag = "51")]
    pub uuid: Vec<u8>,
    #[prost(uint32, tag = "52")]
    pub flags: u32,
}

pub mod routable_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        /// Domain-specific protobuf, AES-GCM encrypted when signature data
        /// is attached.
        #[prost(bytes, tag = "10")]
        ProtobufMessageAsBytes(Vec<u8>),
        #[prost(message, tag = "14")]
        SessionInfoRequest(super::SessionInfoRequest),
        /// Serialized `signatures::SessionInfo`.
        #[prost(bytes, tag = "15")]
        SessionInfo(Vec<u8>),
    }
}
