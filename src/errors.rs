//! Error types for the Double Ratchet engine.
//!
//! A single enum, [`RatchetError`], covers every failure mode named in the
//! design: primitive-level conversion failures (HKDF, AES-GCM, Base64) and
//! engine-level failures (`NotInitialized`, `TooManySavedMessageKeys`,
//! `AuthenticationFailure`, `MissingKey`, `MalformedHeader`,
//! `MalformedDocument`). No operation here ever panics or retries; every
//! failure propagates to the caller through `Result`.

use std::fmt::{Display, Formatter};

/// Errors that can occur while operating a [`crate::engine::DoubleRatchet`].
#[derive(Debug)]
pub enum RatchetError {
    /// `encrypt` was called before the sending chain was seeded.
    NotInitialized,

    /// Inserting a skipped message key would exceed the configured
    /// `max_skip` bound. The session is left byte-for-byte unchanged.
    TooManySavedMessageKeys,

    /// AEAD verification failed. The session is left byte-for-byte
    /// unchanged.
    AuthenticationFailure,

    /// A DH or bootstrap operation needed key material (a private key, a
    /// peer public key) that was not supplied.
    MissingKey,

    /// A wire header did not decode to the expected fixed layout.
    MalformedHeader,

    /// A serialized session document did not decode to a valid session.
    MalformedDocument,

    /// Invalid key material length during HKDF key derivation.
    HkdfInvalidLengthError(hkdf::InvalidLength),

    /// Invalid key length passed to AES-256-GCM.
    AesGcmInvalidLength,

    /// Base64 decoding of an encoded field failed.
    Base64DecodeError(base64::DecodeError),

    /// JSON (de)serialization of a session document failed.
    JsonError(serde_json::Error),
}

impl Display for RatchetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RatchetError::NotInitialized => write!(f, "sending chain is not initialized"),
            RatchetError::TooManySavedMessageKeys => {
                write!(f, "too many saved message keys")
            }
            RatchetError::AuthenticationFailure => write!(f, "message authentication failed"),
            RatchetError::MissingKey => write!(f, "required key material is missing"),
            RatchetError::MalformedHeader => write!(f, "malformed ratchet header"),
            RatchetError::MalformedDocument => write!(f, "malformed session document"),
            RatchetError::HkdfInvalidLengthError(e) => write!(f, "invalid HKDF length: {}", e),
            RatchetError::AesGcmInvalidLength => write!(f, "invalid AES-GCM key length"),
            RatchetError::Base64DecodeError(e) => write!(f, "base64 decode error: {}", e),
            RatchetError::JsonError(e) => write!(f, "document (de)serialization error: {}", e),
        }
    }
}

impl std::error::Error for RatchetError {}

impl From<hkdf::InvalidLength> for RatchetError {
    fn from(value: hkdf::InvalidLength) -> Self {
        RatchetError::HkdfInvalidLengthError(value)
    }
}

impl From<aes_gcm::Error> for RatchetError {
    fn from(_value: aes_gcm::Error) -> Self {
        RatchetError::AuthenticationFailure
    }
}

impl From<base64::DecodeError> for RatchetError {
    fn from(value: base64::DecodeError) -> Self {
        RatchetError::Base64DecodeError(value)
    }
}

impl From<serde_json::Error> for RatchetError {
    fn from(value: serde_json::Error) -> Self {
        RatchetError::JsonError(value)
    }
}
