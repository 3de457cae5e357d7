use p256::{
    SecretKey,
    elliptic_curve::sec1::ToEncodedPoint,
    pkcs8::{DecodePrivateKey, LineEnding},
};
use sha1::{Digest, Sha1};

use crate::crypto::{self, KEY_ID_LEN};
use crate::error::CryptoError;

/// Uncompressed SEC1 point length for P-256.
pub const PUBLIC_KEY_LEN: usize = 65;

/**
    The controller's long-term identity: a P-256 private key with its
    derived public key and key id.

    The key id (first four bytes of SHA-1 over the SEC1 public key) is how
    the vehicle refers to this key on its whitelist; it is stable for the
    lifetime of the private key.
*/
#[derive(Clone)]
pub struct LocalIdentity {
    secret: SecretKey,
    public_key: [u8; PUBLIC_KEY_LEN],
    key_id: [u8; KEY_ID_LEN],
}

impl LocalIdentity {
    /**
        Create a brand-new identity with a freshly generated private key.
    */
    pub fn generate() -> Self {
        Self::from_secret(crypto::generate_secret_key())
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let point = secret.public_key().to_encoded_point(false);
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(point.as_bytes());
        let key_id = crypto::derive_key_id(&public_key);
        Self {
            secret,
            public_key,
            key_id,
        }
    }

    /**
        Load an identity from PEM. Accepts both SEC1 ("EC PRIVATE KEY") and
        PKCS#8 ("PRIVATE KEY") encodings.
    */
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_sec1_pem(pem)
            .or_else(|_| SecretKey::from_pkcs8_pem(pem))
            .map_err(|e| CryptoError::KeyParse(e.to_string()))?;
        Ok(Self::from_secret(secret))
    }

    /**
        Serialize the private key as SEC1 PEM for persistence.
    */
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.secret
            .to_sec1_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::KeySerialize(e.to_string()))
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Uncompressed SEC1 public key (65 bytes, leading 0x04).
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    pub fn key_id(&self) -> &[u8; KEY_ID_LEN] {
        &self.key_id
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("key_id", &hex::encode(self.key_id))
            .finish_non_exhaustive()
    }
}

/**
    The BLE local name a vehicle advertises, derived from its VIN:
    `"S" + hex(SHA-1(vin)[0..8]) + "C"`.
*/
pub fn vin_advertisement_name(vin: &str) -> String {
    let digest = Sha1::digest(vin.as_bytes());
    format!("S{}C", hex::encode(&digest[..8]))
}
