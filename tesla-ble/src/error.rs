use thiserror::Error;

use tesla_ble_proto::universal::MessageFault;

/**
    Errors from the cryptographic core: key handling, ECDH, and AES-GCM.
*/
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    #[error("peer public key is not a valid P-256 point")]
    InvalidPoint,

    #[error("ECDH key agreement failed: {0}")]
    Ecdh(String),

    #[error("private key parse failed: {0}")]
    KeyParse(String),

    #[error("private key serialization failed: {0}")]
    KeySerialize(String),

    #[error("AES-GCM seal failed")]
    Seal,

    #[error("AES-GCM authentication failed")]
    AuthFailure,

    #[error("invalid nonce length {0}, expected 12")]
    NonceLength(usize),

    #[error("invalid AES-GCM tag length {0}, expected 16")]
    TagLength(usize),
}

/**
    Errors from message assembly, parsing, and the session layer.
*/
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    // ── Crypto (delegated) ────────────────────────────────────────────
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    // ── Envelope parsing ──────────────────────────────────────────────
    #[error("protobuf decode failed: {0}")]
    ProtobufDecode(String),

    #[error("message larger than transport maximum ({0} bytes)")]
    MessageTooLarge(usize),

    // ── Sessions ──────────────────────────────────────────────────────
    #[error("no valid session for {0:?}")]
    SessionNotReady(tesla_ble_proto::universal::Domain),

    #[error("VIN not configured")]
    MissingVin,

    #[error("session info rejected: key is not on the vehicle whitelist")]
    KeyNotOnWhitelist,

    // ── Inbound validation ────────────────────────────────────────────
    #[error("response carries no usable payload")]
    EmptyResponse,

    #[error("response signature data is missing or malformed")]
    MalformedSignature,
}

impl From<tesla_ble_proto::prost::DecodeError> for ProtocolError {
    fn from(e: tesla_ble_proto::prost::DecodeError) -> Self {
        Self::ProtobufDecode(e.to_string())
    }
}

/**
    Why a command resolved unsuccessfully. Every enqueued command resolves
    exactly once, either as completed or as failed with one of these.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    #[error("command queue is full")]
    QueueFull,

    #[error("parameter out of range: {0}")]
    InvalidParameter(&'static str),

    #[error("no response within the command deadline")]
    Timeout,

    #[error("retry budget exhausted")]
    RetriesExhausted,

    #[error("session handshake failed")]
    AuthenticationFailed,

    #[error("key is not on the vehicle whitelist")]
    KeyNotOnWhitelist,

    #[error("vehicle rejected the command ({0:?})")]
    VehicleFault(MessageFault),

    #[error("vehicle reported an error executing the command")]
    VehicleError,

    #[error("command cancelled")]
    Cancelled,

    #[error("could not build the outbound message: {0}")]
    Build(String),
}

pub type ClientResult<T> = std::result::Result<T, ProtocolError>;
