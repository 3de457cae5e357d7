//! `signatures.proto`: signature metadata, session info, and the tag space
//! used for canonical metadata serialization.

/**
    Tags for the canonical metadata TLV stream that binds a signature to one
    message. Serialization order is fixed by ascending tag value.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Tag {
    SignatureType = 0,
    Domain = 1,
    Personalization = 2,
    Epoch = 3,
    ExpiresAt = 4,
    Counter = 5,
    Challenge = 6,
    Flags = 7,
    RequestHash = 8,
    Fault = 9,
    End = 255,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignatureType {
    None = 0,
    /// Authenticated by a physical key card tap, not by a session. Used only
    /// for the initial whitelist add.
    PresentKey = 2,
    AesGcm = 5,
    AesGcmPersonalized = 6,
    Hmac = 7,
    HmacPersonalized = 8,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyIdentity {
    #[prost(oneof = "key_identity::IdentityType", tags = "1, 3")]
    pub identity_type: Option<key_identity::IdentityType>,
}

pub mod key_identity {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum IdentityType {
        #[prost(bytes, tag = "1")]
        PublicKey(Vec<u8>),
        #[prost(bytes, tag = "3")]
        Handle(Vec<u8>),
    }
}

/**
    Signature fields for an AES-GCM-personalized message. The GCM tag is
    carried here, detached from the ciphertext in the message payload.
*/
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AesGcmPersonalizedSignatureData {
    #[prost(bytes = "vec", tag = "1")]
    pub epoch: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub nonce: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub counter: u32,
    #[prost(fixed32, tag = "4")]
    pub expires_at: u32,
    #[prost(bytes = "vec", tag = "5")]
    pub tag: Vec<u8>,
}

/// Integrity tag over a session-info payload and its request challenge.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionInfoTag {
    #[prost(bytes = "vec", tag = "1")]
    pub tag: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureData {
    #[prost(message, optional, tag = "1")]
    pub signer_identity: Option<KeyIdentity>,
    #[prost(oneof = "signature_data::SigType", tags = "5, 6")]
    pub sig_type: Option<signature_data::SigType>,
}

pub mod signature_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SigType {
        #[prost(message, tag = "5")]
        AesGcmPersonalizedData(super::AesGcmPersonalizedSignatureData),
        #[prost(message, tag = "6")]
        SessionInfoTag(super::SessionInfoTag),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SessionInfoStatus {
    Ok = 0,
    KeyNotOnWhitelist = 1,
}

/**
    The vehicle's authoritative per-domain session state: anti-replay
    counter, epoch, domain public key, and the vehicle-local clock at the
    moment the info was produced.
*/
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionInfo {
    #[prost(uint32, tag = "1")]
    pub counter: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub epoch: Vec<u8>,
    #[prost(fixed32, tag = "4")]
    pub clock_time: u32,
    #[prost(int32, tag = "5")]
    pub status: i32,
}

impl SessionInfo {
    pub fn status(&self) -> SessionInfoStatus {
        SessionInfoStatus::try_from(self.status).unwrap_or(SessionInfoStatus::KeyNotOnWhitelist)
    }
}
