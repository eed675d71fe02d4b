//! Fixed byte sizes for the primitives the engine is built against by default.

// byte size of a Curve25519 private key
pub(crate) const CURVE25519_SECRET_LENGTH: usize = 32;
// byte size of a Curve25519 public key
pub(crate) const CURVE25519_PUBLIC_LENGTH: usize = CURVE25519_SECRET_LENGTH;

// byte size of an aes256 key
pub(crate) const AES256_SECRET_LENGTH: usize = 32;
// byte size of aes256-gcm nonce
pub(crate) const AES256_NONCE_LENGTH: usize = 12;

/// Default value for [`crate::config::RatchetConfig::max_skip`] when the
/// application does not override it.
pub const DEFAULT_MAX_SKIP: usize = 5;
