//! Capability interfaces consumed by the engine: a KDF, a DH key pair, and
//! an AEAD. The engine (see [`crate::engine::DoubleRatchet`]) is generic
//! over these three traits rather than a tagged-variant enum — "interface
//! abstraction is preferred" per the design notes — with default type
//! parameters selecting the concrete implementations below (HKDF-SHA256,
//! X25519, AES-256-GCM), the same trio the teacher hardcodes directly into
//! `ratchet.rs`.

use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};

use aes_gcm::aead::{Aead as _, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, KeyInit, Nonce};
use arrayref::array_ref;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKeyInner, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{AES256_NONCE_LENGTH, AES256_SECRET_LENGTH, CURVE25519_PUBLIC_LENGTH};
use crate::errors::RatchetError;

/// A 256-bit secret: a chain key, a root key, or a message key depending on
/// where it is produced. Zeroized on drop so a used key never lingers in
/// memory past the operation that consumed it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key32(pub(crate) [u8; 32]);

impl Key32 {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Key32(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Debug for Key32 {
    /// Never prints key material — only that a key is present.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Key32(..)")
    }
}

/// A KDF primitive: `derive(key, info, input)` folds `input` into `key`
/// under the domain-separation label `info`, producing a replacement chain
/// key and a derived output, both 32 bytes (enough to split into
/// `chain_key_len + output_len` per the external interface contract).
pub trait Kdf {
    fn derive(key: &Key32, info: &[u8], input: &[u8]) -> Result<(Key32, Key32), RatchetError>;
}

/// Default KDF: HKDF-SHA256, salted by the current key, with the next
/// chain key and the derived output split via distinct labels appended to
/// `info`. Mirrors the teacher's `hkdf_rk`/`hkdf_ck` free functions in
/// `ratchet.rs`, unified behind one contract.
#[derive(Clone, Copy)]
pub struct HkdfSha256;

impl Kdf for HkdfSha256 {
    fn derive(key: &Key32, info: &[u8], input: &[u8]) -> Result<(Key32, Key32), RatchetError> {
        let hk = Hkdf::<Sha256>::new(Some(key.as_bytes()), input);

        let mut chain_label = Vec::with_capacity(info.len() + 6);
        chain_label.extend_from_slice(info);
        chain_label.extend_from_slice(b"-chain");

        let mut output_label = Vec::with_capacity(info.len() + 7);
        output_label.extend_from_slice(info);
        output_label.extend_from_slice(b"-output");

        let mut next_key = [0u8; AES256_SECRET_LENGTH];
        let mut output = [0u8; AES256_SECRET_LENGTH];
        hk.expand(&chain_label, &mut next_key)?;
        hk.expand(&output_label, &mut output)?;

        Ok((Key32(next_key), Key32(output)))
    }
}

/// A DH key pair: generate, expose the public half, compute a shared
/// secret with a peer's public, and (de)serialize both halves for session
/// persistence.
pub trait DhKeyPair: Clone {
    type PublicKey: Clone + PartialEq + Eq + Hash + Debug;

    fn generate() -> Self;
    fn public(&self) -> Self::PublicKey;
    fn diffie_hellman(&self, peer_public: &Self::PublicKey) -> Key32;

    fn public_to_bytes(public: &Self::PublicKey) -> Vec<u8>;
    fn public_from_bytes(bytes: &[u8]) -> Result<Self::PublicKey, RatchetError>;

    fn private_to_bytes(&self) -> Vec<u8>;
    fn from_private_bytes(bytes: &[u8]) -> Result<Self, RatchetError>;
}

/// A Curve25519 public key, used as the wire/header representation of the
/// sender's current ratchet public and as the remote-public half of
/// skipped-key-store keys (hence `Eq + Hash`).
#[derive(Clone, Eq)]
pub struct X25519Public(pub(crate) [u8; CURVE25519_PUBLIC_LENGTH]);

impl PartialEq for X25519Public {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Hash for X25519Public {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Debug for X25519Public {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Public({})", base64::Engine::encode(&base64::engine::general_purpose::STANDARD, self.0))
    }
}

/// Default DH implementation: X25519 via `x25519-dalek`, the same crate
/// and feature set (`static_secrets`) the teacher depends on.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct X25519KeyPair {
    #[zeroize(skip)]
    public: [u8; CURVE25519_PUBLIC_LENGTH],
    private: [u8; CURVE25519_PUBLIC_LENGTH],
}

impl DhKeyPair for X25519KeyPair {
    type PublicKey = X25519Public;

    fn generate() -> Self {
        let private = StaticSecret::random_from_rng(&mut OsRng);
        let public = X25519PublicKeyInner::from(&private);
        X25519KeyPair {
            public: public.to_bytes(),
            private: private.to_bytes(),
        }
    }

    fn public(&self) -> Self::PublicKey {
        X25519Public(self.public)
    }

    fn diffie_hellman(&self, peer_public: &Self::PublicKey) -> Key32 {
        let private = StaticSecret::from(self.private);
        let public = X25519PublicKeyInner::from(peer_public.0);
        Key32(private.diffie_hellman(&public).to_bytes())
    }

    fn public_to_bytes(public: &Self::PublicKey) -> Vec<u8> {
        public.0.to_vec()
    }

    fn public_from_bytes(bytes: &[u8]) -> Result<Self::PublicKey, RatchetError> {
        if bytes.len() != CURVE25519_PUBLIC_LENGTH {
            return Err(RatchetError::MalformedDocument);
        }
        Ok(X25519Public(*array_ref!(bytes, 0, CURVE25519_PUBLIC_LENGTH)))
    }

    fn private_to_bytes(&self) -> Vec<u8> {
        self.private.to_vec()
    }

    fn from_private_bytes(bytes: &[u8]) -> Result<Self, RatchetError> {
        if bytes.len() != CURVE25519_PUBLIC_LENGTH {
            return Err(RatchetError::MalformedDocument);
        }
        let private = StaticSecret::from(*array_ref!(bytes, 0, CURVE25519_PUBLIC_LENGTH));
        let public = X25519PublicKeyInner::from(&private);
        Ok(X25519KeyPair {
            public: public.to_bytes(),
            private: private.to_bytes(),
        })
    }
}

/// An AEAD primitive: authenticated encryption/decryption keyed by a
/// message key, with the caller-built header+session associated data bound
/// in (never encrypted).
pub trait Aead {
    fn encrypt(key: &Key32, plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>, RatchetError>;
    fn decrypt(key: &Key32, ciphertext: &[u8], ad: &[u8]) -> Result<Vec<u8>, RatchetError>;
}

/// Default AEAD: AES-256-GCM, the same cipher and crate the teacher uses in
/// `utils.rs`. Wire format is `nonce (12 bytes) || ciphertext+tag`; the
/// nonce is generated fresh per call and is opaque to the engine, which
/// never reuses or inspects it.
#[derive(Clone, Copy)]
pub struct Aes256GcmAead;

impl Aead for Aes256GcmAead {
    fn encrypt(key: &Key32, plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>, RatchetError> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| RatchetError::AesGcmInvalidLength)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let payload = Payload { msg: plaintext, aad: ad };
        let ciphertext = cipher.encrypt(&nonce, payload)?;

        let mut out = Vec::with_capacity(AES256_NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(key: &Key32, ciphertext: &[u8], ad: &[u8]) -> Result<Vec<u8>, RatchetError> {
        if ciphertext.len() < AES256_NONCE_LENGTH {
            return Err(RatchetError::AuthenticationFailure);
        }
        let (nonce_bytes, body) = ciphertext.split_at(AES256_NONCE_LENGTH);
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| RatchetError::AesGcmInvalidLength)?;
        let nonce = Nonce::from_slice(nonce_bytes);
        let payload = Payload { msg: body, aad: ad };
        Ok(cipher.decrypt(nonce, payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hkdf_derivation_is_deterministic_and_label_separated() {
        let key = Key32::from_bytes([7u8; 32]);
        let (k1, o1) = HkdfSha256::derive(&key, b"info-a", b"input").unwrap();
        let (k2, o2) = HkdfSha256::derive(&key, b"info-a", b"input").unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
        assert_eq!(o1.as_bytes(), o2.as_bytes());
        assert_ne!(k1.as_bytes(), o1.as_bytes());

        let (k3, _) = HkdfSha256::derive(&key, b"info-b", b"input").unwrap();
        assert_ne!(k1.as_bytes(), k3.as_bytes());
    }

    #[test]
    fn x25519_dh_is_symmetric() {
        let alice = X25519KeyPair::generate();
        let bob = X25519KeyPair::generate();
        let ab = alice.diffie_hellman(&bob.public());
        let ba = bob.diffie_hellman(&alice.public());
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn x25519_public_round_trips_through_bytes() {
        let pair = X25519KeyPair::generate();
        let bytes = X25519KeyPair::public_to_bytes(&pair.public());
        let decoded = X25519KeyPair::public_from_bytes(&bytes).unwrap();
        assert_eq!(pair.public(), decoded);
    }

    #[test]
    fn aead_round_trips_and_rejects_tamper() {
        let key = Key32::from_bytes([3u8; 32]);
        let ad = b"associated";
        let ct = Aes256GcmAead::encrypt(&key, b"hello world", ad).unwrap();
        let pt = Aes256GcmAead::decrypt(&key, &ct, ad).unwrap();
        assert_eq!(pt, b"hello world");

        let mut tampered = ct.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(Aes256GcmAead::decrypt(&key, &tampered, ad).is_err());
    }
}
