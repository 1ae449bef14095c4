//! Payload encryption for sensitive admin API requests.
//!
//! MinIO expects requests that carry secrets (creating a user, changing a
//! policy mapping) to be encrypted with the caller's secret key. The envelope
//! is:
//!
//! ```text
//! salt (32) | cipher id (1) | nonce (8) | sealed stream
//! ```
//!
//! The key is derived with Argon2id from the secret key and the salt. The
//! stream splits the plaintext into 16 KiB fragments, each sealed with
//! ChaCha20-Poly1305 under `nonce || seq_le32`. Every fragment's associated
//! data is a flag byte (`0x80` on the last fragment) followed by a tag that
//! binds the stream to its nonce.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::rand_core::RngCore;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

/// Length of the random salt fed to Argon2id.
pub const SALT_LEN: usize = 32;

/// Length of the per-stream nonce prefix.
pub const NONCE_LEN: usize = 8;

/// Header length: salt, cipher id and nonce.
pub const HEADER_LEN: usize = SALT_LEN + 1 + NONCE_LEN;

/// Cipher id for Argon2id key derivation with ChaCha20-Poly1305.
pub const ARGON2ID_CHACHA20POLY1305: u8 = 0x01;

/// Plaintext bytes per sealed fragment.
pub const FRAGMENT_LEN: usize = 16 * 1024;

/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

const KEY_LEN: usize = 32;
const FINAL_FLAG: u8 = 0x80;

const ARGON2_TIME_COST: u32 = 1;
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;
const ARGON2_LANES: u32 = 4;

/// Failure to produce an encrypted payload.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// Argon2id rejected its parameters or inputs.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The AEAD refused to seal a fragment.
    #[error("failed to seal payload fragment {0}")]
    Seal(u32),
}

/// Encrypt `data` for the admin API with `password` (the admin secret key).
///
/// # Errors
///
/// Returns [`SealError`] if key derivation or sealing fails.
pub fn encrypt_data(password: &str, data: &[u8]) -> Result<Vec<u8>, SealError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt)?;
    let sealed = seal_stream(&key, &nonce, data)?;

    let mut out = Vec::with_capacity(HEADER_LEN + sealed.len());
    out.extend_from_slice(&salt);
    out.push(ARGON2ID_CHACHA20POLY1305);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Derive the 32-byte stream key from `password` and `salt`.
///
/// # Errors
///
/// Returns [`SealError::KeyDerivation`] if Argon2id fails.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], SealError> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_LANES,
        Some(KEY_LEN),
    )
    .map_err(|e| SealError::KeyDerivation(e.to_string()))?;

    let mut key = [0u8; KEY_LEN];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| SealError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Seal `data` as a fragment stream under `key` and `nonce`.
///
/// Always emits at least one fragment; empty input produces a single empty
/// final fragment.
///
/// # Errors
///
/// Returns [`SealError::Seal`] if a fragment cannot be sealed.
pub fn seal_stream(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    data: &[u8],
) -> Result<Vec<u8>, SealError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut associated_data = stream_associated_data(&cipher, nonce)?;

    let fragments = data.len().div_ceil(FRAGMENT_LEN).max(1);
    let mut out = Vec::with_capacity(data.len() + fragments * TAG_LEN);

    let mut remaining = data;
    let mut seq: u32 = 1;
    loop {
        let is_final = remaining.len() <= FRAGMENT_LEN;
        let (chunk, rest) = remaining.split_at(remaining.len().min(FRAGMENT_LEN));
        if is_final {
            associated_data[0] = FINAL_FLAG;
        }

        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&fragment_nonce(nonce, seq)),
                Payload {
                    msg: chunk,
                    aad: &associated_data,
                },
            )
            .map_err(|_| SealError::Seal(seq))?;
        out.extend_from_slice(&sealed);

        if is_final {
            return Ok(out);
        }
        remaining = rest;
        seq += 1;
    }
}

/// Flag byte followed by the tag of an empty message sealed under sequence
/// number zero.
fn stream_associated_data(
    cipher: &ChaCha20Poly1305,
    nonce: &[u8; NONCE_LEN],
) -> Result<[u8; 1 + TAG_LEN], SealError> {
    let tag = cipher
        .encrypt(Nonce::from_slice(&fragment_nonce(nonce, 0)), b"".as_slice())
        .map_err(|_| SealError::Seal(0))?;

    let mut associated_data = [0u8; 1 + TAG_LEN];
    associated_data[1..].copy_from_slice(&tag);
    Ok(associated_data)
}

fn fragment_nonce(nonce: &[u8; NONCE_LEN], seq: u32) -> [u8; 12] {
    let mut full = [0u8; 12];
    full[..NONCE_LEN].copy_from_slice(nonce);
    full[NONCE_LEN..].copy_from_slice(&seq.to_le_bytes());
    full
}

/// Reverse of [`encrypt_data`], used to check payloads in tests.
#[cfg(test)]
pub(crate) fn decrypt_data(password: &str, envelope: &[u8]) -> Vec<u8> {
    assert!(envelope.len() >= HEADER_LEN + TAG_LEN, "envelope too short");
    let (salt, rest) = envelope.split_at(SALT_LEN);
    assert_eq!(rest[0], ARGON2ID_CHACHA20POLY1305);
    let nonce: [u8; NONCE_LEN] = rest[1..=NONCE_LEN].try_into().unwrap();
    let key = derive_key(password, salt).unwrap();
    open_stream(&key, &nonce, &rest[1 + NONCE_LEN..])
}

#[cfg(test)]
pub(crate) fn open_stream(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut associated_data = stream_associated_data(&cipher, nonce).unwrap();

    let mut plaintext = Vec::new();
    let mut fragments = sealed.chunks(FRAGMENT_LEN + TAG_LEN).peekable();
    let mut seq = 1;
    while let Some(fragment) = fragments.next() {
        if fragments.peek().is_none() {
            associated_data[0] = FINAL_FLAG;
        }
        let opened = cipher
            .decrypt(
                Nonce::from_slice(&fragment_nonce(nonce, seq)),
                Payload {
                    msg: fragment,
                    aad: &associated_data,
                },
            )
            .unwrap();
        plaintext.extend_from_slice(&opened);
        seq += 1;
    }
    plaintext
}
