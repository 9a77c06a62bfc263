// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key derivation and token sealing.
//!
//! One master secret (`SESSION_SECRET`) yields independent subkeys via
//! HKDF-SHA256. OAuth tokens are sealed with AES-256-GCM before they reach a
//! session backend, with the session id as associated data so a sealed token
//! cannot be replayed into another session.
//!
//! Sealed format: `enc:v1:` + base64(nonce || ciphertext || tag)

use anyhow::{anyhow, Context};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

const SEALED_PREFIX: &str = "enc:v1:";
const HKDF_SALT: &[u8] = b"strava-club-events";

/// Subkeys derived from the master session secret.
#[derive(Clone)]
pub struct SessionKeys {
    /// HS256 key for the session cookie JWT
    pub cookie_key: Vec<u8>,
    /// AES-256-GCM key for sealing OAuth tokens
    pub token_key: [u8; 32],
    /// HMAC key for the OAuth `state` parameter
    pub state_key: Vec<u8>,
}

impl SessionKeys {
    pub fn derive(secret: &[u8]) -> anyhow::Result<Self> {
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
        let expand = |info: &[u8], out: &mut [u8]| {
            hk.expand(info, out)
                .map_err(|e| anyhow!("HKDF expand failed: {}", e))
        };

        let mut cookie_key = vec![0u8; 32];
        expand(b"session-cookie", &mut cookie_key)?;
        let mut token_key = [0u8; 32];
        expand(b"token-encryption", &mut token_key)?;
        let mut state_key = vec![0u8; 32];
        expand(b"oauth-state", &mut state_key)?;

        Ok(Self {
            cookie_key,
            token_key,
            state_key,
        })
    }
}

/// AES-256-GCM sealing for token strings.
#[derive(Clone)]
pub struct TokenCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl TokenCipher {
    pub fn new(key: &[u8; 32]) -> anyhow::Result<Self> {
        let unbound =
            UnboundKey::new(&AES_256_GCM, key).map_err(|_| anyhow!("invalid AES-256 key"))?;
        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, binding it to `aad`.
    pub fn seal(&self, plaintext: &str, aad: &[u8]) -> anyhow::Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| anyhow!("failed to generate nonce"))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad),
                &mut in_out,
            )
            .map_err(|_| anyhow!("token encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(format!("{}{}", SEALED_PREFIX, BASE64.encode(sealed)))
    }

    /// Decrypt a value produced by [`TokenCipher::seal`] with the same `aad`.
    pub fn open(&self, sealed: &str, aad: &[u8]) -> anyhow::Result<String> {
        let encoded = sealed
            .strip_prefix(SEALED_PREFIX)
            .ok_or_else(|| anyhow!("unrecognized sealed token format"))?;
        let mut bytes = BASE64.decode(encoded).context("sealed token is not base64")?;
        if bytes.len() < NONCE_LEN {
            return Err(anyhow!("sealed token too short"));
        }

        let mut ciphertext = bytes.split_off(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(&bytes)
            .map_err(|_| anyhow!("invalid nonce length"))?;
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut ciphertext)
            .map_err(|_| anyhow!("token decryption failed"))?;

        String::from_utf8(plaintext.to_vec()).context("decrypted token is not UTF-8")
    }
}

/// `len` random bytes, hex encoded.
pub fn random_hex(len: usize) -> anyhow::Result<String> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow!("failed to generate random bytes"))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        let keys = SessionKeys::derive(b"test_session_secret_32_bytes_min!").unwrap();
        TokenCipher::new(&keys.token_key).unwrap()
    }

    #[test]
    fn test_seal_open() {
        let cipher = cipher();
        let sealed = cipher.seal("access-abc", b"session-1").unwrap();

        assert!(sealed.starts_with("enc:v1:"));
        assert!(!sealed.contains("access-abc"));
        assert_eq!(cipher.open(&sealed, b"session-1").unwrap(), "access-abc");
    }

    #[test]
    fn test_nonce_differs_per_seal() {
        let cipher = cipher();
        let a = cipher.seal("same", b"s").unwrap();
        let b = cipher.seal("same", b"s").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_rejects_other_session() {
        let cipher = cipher();
        let sealed = cipher.seal("refresh-xyz", b"session-1").unwrap();
        assert!(cipher.open(&sealed, b"session-2").is_err());
    }

    #[test]
    fn test_open_rejects_plaintext_and_garbage() {
        let cipher = cipher();
        assert!(cipher.open("refresh-xyz", b"s").is_err());
        assert!(cipher.open("enc:v1:!!!", b"s").is_err());
        assert!(cipher.open("enc:v1:AAAA", b"s").is_err());
    }

    #[test]
    fn test_derived_keys_are_distinct() {
        let keys = SessionKeys::derive(b"test_session_secret_32_bytes_min!").unwrap();
        assert_ne!(keys.cookie_key, keys.state_key);
        assert_ne!(keys.cookie_key.as_slice(), &keys.token_key[..]);

        let other = SessionKeys::derive(b"another_session_secret_32_bytes!!").unwrap();
        assert_ne!(keys.cookie_key, other.cookie_key);
    }

    #[test]
    fn test_random_hex_length() {
        let id = random_hex(16).unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
