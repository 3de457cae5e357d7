/*!
    Cryptographic primitives for the vehicle-command protocol.

    Key agreement is ECDH on P-256; the session key is the first 16 bytes of
    SHA-1 over the shared-secret X coordinate (fixed by wire compatibility,
    not a design choice). Payload protection is AES-128-GCM with the 16-byte
    tag carried detached in the signature data rather than appended to the
    ciphertext.
*/

use aes_gcm::{
    Aes128Gcm, Nonce, Tag,
    aead::{AeadInPlace, KeyInit},
};
use p256::{PublicKey, SecretKey, ecdh};
use rand::rngs::OsRng;
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::error::CryptoError;

pub const SESSION_KEY_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_ID_LEN: usize = 4;

/**
    Generate a fresh P-256 private key from the system RNG.
*/
pub fn generate_secret_key() -> SecretKey {
    SecretKey::random(&mut OsRng)
}

/**
    Derive the AES-128 session key for a (local private, peer public) pair.

    Computes the raw ECDH shared secret and truncates SHA-1 over its X
    coordinate to 16 bytes. Pure in both keys: the same pair always yields
    the same session key.
*/
pub fn ecdh_session_key(
    local: &SecretKey,
    peer_public_sec1: &[u8],
) -> Result<[u8; SESSION_KEY_LEN], CryptoError> {
    let peer = PublicKey::from_sec1_bytes(peer_public_sec1)
        .map_err(|_| CryptoError::InvalidPoint)?;

    let shared = ecdh::diffie_hellman(local.to_nonzero_scalar(), peer.as_affine());
    let digest = Sha1::digest(shared.raw_secret_bytes());

    let mut key = [0u8; SESSION_KEY_LEN];
    key.copy_from_slice(&digest[..SESSION_KEY_LEN]);
    Ok(key)
}

/**
    Key id of a public key: the first four bytes of SHA-1 over its
    uncompressed SEC1 encoding. Stable for the lifetime of the key.
*/
pub fn derive_key_id(public_key_sec1: &[u8]) -> [u8; KEY_ID_LEN] {
    let digest = Sha1::digest(public_key_sec1);
    let mut id = [0u8; KEY_ID_LEN];
    id.copy_from_slice(&digest[..KEY_ID_LEN]);
    id
}

/**
    AES-128-GCM encrypt. Returns ciphertext and the detached 16-byte tag.
*/
pub fn seal(
    key: &[u8; SESSION_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError> {
    let cipher = Aes128Gcm::new(key.into());
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, &mut buffer)
        .map_err(|_| CryptoError::Seal)?;
    Ok((buffer, tag.into()))
}

/**
    AES-128-GCM decrypt with a detached tag. Fails with `AuthFailure` when
    any of ciphertext, AAD, nonce, or tag has been altered.
*/
pub fn open(
    key: &[u8; SESSION_KEY_LEN],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::NonceLength(nonce.len()));
    }
    if tag.len() != TAG_LEN {
        return Err(CryptoError::TagLength(tag.len()));
    }

    let cipher = Aes128Gcm::new(key.into());
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            aad,
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::AuthFailure)?;
    Ok(buffer)
}

/**
    Nonce for a signed message: the first 12 bytes of SHA-256 over the
    canonical signature metadata.
*/
pub fn metadata_nonce(metadata: &[u8]) -> [u8; NONCE_LEN] {
    let digest = Sha256::digest(metadata);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use p256::elliptic_curve::sec1::ToEncodedPoint;

    fn fixed_key(fill: u8) -> SecretKey {
        let mut bytes = [fill; 32];
        bytes[0] = 0x01; // keep the scalar in range and nonzero
        SecretKey::from_slice(&bytes).unwrap()
    }

    fn sec1(key: &SecretKey) -> Vec<u8> {
        key.public_key().to_encoded_point(false).as_bytes().to_vec()
    }

    #[test]
    fn key_id_is_stable() {
        let key = fixed_key(0x22);
        let public = sec1(&key);
        assert_eq!(derive_key_id(&public), derive_key_id(&public));
        assert_eq!(derive_key_id(&public).len(), 4);
    }

    #[test]
    fn key_id_known_vector() {
        // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        assert_eq!(derive_key_id(b"abc"), hex!("a9993e36"));
    }

    #[test]
    fn ecdh_is_symmetric() {
        let a = fixed_key(0x11);
        let b = fixed_key(0x33);
        let ab = ecdh_session_key(&a, &sec1(&b)).unwrap();
        let ba = ecdh_session_key(&b, &sec1(&a)).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn ecdh_rejects_garbage_point() {
        let a = fixed_key(0x11);
        let err = ecdh_session_key(&a, &[0x04; 65]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPoint));
    }

    #[test]
    fn ecdh_rejects_truncated_point() {
        let a = fixed_key(0x11);
        let b = fixed_key(0x33);
        let mut point = sec1(&b);
        point.truncate(40);
        assert!(ecdh_session_key(&a, &point).is_err());
    }

    #[test]
    fn seal_open_round_trip() {
        let key = [0x42u8; 16];
        let nonce = [0x13u8; 12];
        let aad = b"metadata bytes";
        let plaintext = b"inner command protobuf";

        let (ciphertext, tag) = seal(&key, &nonce, aad, plaintext).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext.as_slice());

        let opened = open(&key, &nonce, aad, &ciphertext, &tag).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn open_detects_ciphertext_tamper() {
        let key = [0x42u8; 16];
        let nonce = [0x13u8; 12];
        let (mut ciphertext, tag) = seal(&key, &nonce, b"aad", b"payload").unwrap();
        ciphertext[0] ^= 0x01;
        let err = open(&key, &nonce, b"aad", &ciphertext, &tag).unwrap_err();
        assert!(matches!(err, CryptoError::AuthFailure));
    }

    #[test]
    fn open_detects_aad_tamper() {
        let key = [0x42u8; 16];
        let nonce = [0x13u8; 12];
        let (ciphertext, tag) = seal(&key, &nonce, b"aad", b"payload").unwrap();
        let err = open(&key, &nonce, b"aae", &ciphertext, &tag).unwrap_err();
        assert!(matches!(err, CryptoError::AuthFailure));
    }

    #[test]
    fn open_detects_nonce_tamper() {
        let key = [0x42u8; 16];
        let nonce = [0x13u8; 12];
        let (ciphertext, tag) = seal(&key, &nonce, b"aad", b"payload").unwrap();
        let mut wrong = nonce;
        wrong[11] ^= 0x80;
        let err = open(&key, &wrong, b"aad", &ciphertext, &tag).unwrap_err();
        assert!(matches!(err, CryptoError::AuthFailure));
    }

    #[test]
    fn open_detects_tag_tamper() {
        let key = [0x42u8; 16];
        let nonce = [0x13u8; 12];
        let (ciphertext, mut tag) = seal(&key, &nonce, b"aad", b"payload").unwrap();
        tag[15] ^= 0x01;
        let err = open(&key, &nonce, b"aad", &ciphertext, &tag).unwrap_err();
        assert!(matches!(err, CryptoError::AuthFailure));
    }

    #[test]
    fn open_rejects_bad_lengths() {
        let key = [0u8; 16];
        assert!(matches!(
            open(&key, &[0u8; 11], b"", b"", &[0u8; 16]).unwrap_err(),
            CryptoError::NonceLength(11)
        ));
        assert!(matches!(
            open(&key, &[0u8; 12], b"", b"", &[0u8; 15]).unwrap_err(),
            CryptoError::TagLength(15)
        ));
    }

    #[test]
    fn metadata_nonce_is_deterministic_sha256_prefix() {
        // SHA-256("abc") starts with ba7816bf8f01cfea414140de5dae2223
        assert_eq!(metadata_nonce(b"abc"), hex!("ba7816bf8f01cfea414140de"));
        assert_eq!(metadata_nonce(b"abc"), metadata_nonce(b"abc"));
        assert_ne!(metadata_nonce(b"abc"), metadata_nonce(b"abd"));
    }
}
