/*!
    Canonical serialization of signature metadata.

    A signed message binds its AES-GCM tag to a fixed-order stream of
    tag-length-value triples: signature type, destination domain,
    personalization (VIN), epoch, expiry, counter. The same stream is the
    AEAD associated data and, hashed, the nonce source, so the layout here
    must match the vehicle byte for byte.
*/

use tesla_ble_proto::signatures::{SignatureType, Tag};
use tesla_ble_proto::universal::Domain;

/**
    Ordered TLV accumulator. Each element is `tag || len || value` with a
    single length byte; no element of the protocol exceeds 255 bytes.
*/
#[derive(Debug, Default)]
pub struct Metadata {
    buf: Vec<u8>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: Tag, value: &[u8]) {
        debug_assert!(value.len() <= u8::MAX as usize);
        self.buf.push(tag as u8);
        self.buf.push(value.len() as u8);
        self.buf.extend_from_slice(value);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/**
    Metadata for an AES-GCM-personalized signed message, in the protocol's
    fixed tag order.
*/
pub fn signed_message_metadata(
    signature_type: SignatureType,
    domain: Domain,
    vin: &str,
    epoch: &[u8],
    expires_at: u32,
    counter: u32,
) -> Vec<u8> {
    let mut meta = Metadata::new();
    meta.add(Tag::SignatureType, &[signature_type as u8]);
    meta.add(Tag::Domain, &[domain as u8]);
    meta.add(Tag::Personalization, vin.as_bytes());
    meta.add(Tag::Epoch, epoch);
    meta.add(Tag::ExpiresAt, &expires_at.to_be_bytes());
    meta.add(Tag::Counter, &counter.to_be_bytes());
    meta.into_bytes()
}
