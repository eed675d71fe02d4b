//! Engine configuration: the bound on the skipped-key store, the
//! session-wide associated data, and the domain-separation label strings
//! mixed into every KDF/AEAD call.

use crate::constants::DEFAULT_MAX_SKIP;

/// Tunables accepted by [`crate::engine::DoubleRatchet::new_active`] and
/// [`crate::engine::DoubleRatchet::new_passive`].
///
/// The label fields bind each KDF invocation to a distinct purpose so that a
/// root-chain derivation can never be confused with a sub-chain derivation,
/// mirroring the domain-separated `b"RatchtetInfo"` / `b"ChainKey"` /
/// `b"MessageKey"` labels the teacher hardcodes in `ratchet.rs`.
#[derive(Clone, Debug)]
pub struct RatchetConfig {
    /// Upper bound on the number of entries the skipped-key store may hold
    /// at once. Exceeding it on insertion fails the whole receive operation
    /// with [`crate::errors::RatchetError::TooManySavedMessageKeys`].
    pub max_skip: usize,

    /// Opaque bytes mixed into every AEAD associated-data computation,
    /// alongside the message header.
    pub session_ad: Vec<u8>,

    /// Info string binding root-chain KDF calls (the DH-ratchet step).
    pub root_kdf_info: Vec<u8>,

    /// Constant input bound into every step of a symmetric sub-chain.
    pub sub_chain_const_input: Vec<u8>,

    /// Info string binding symmetric sub-chain KDF calls.
    pub sub_chain_kdf_info: Vec<u8>,

    /// Info string binding the AEAD key derivation step: every sub-chain
    /// message key is passed through the KDF under this label before it
    /// reaches the configured `Aead` implementation, so the bytes keying
    /// the cipher are never the raw chain output.
    pub aead_info: Vec<u8>,
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self {
            max_skip: DEFAULT_MAX_SKIP,
            session_ad: Vec::new(),
            root_kdf_info: b"RatchtetInfo".to_vec(),
            sub_chain_const_input: b"const_data".to_vec(),
            sub_chain_kdf_info: b"ChainKey".to_vec(),
            aead_info: b"MessageKey".to_vec(),
        }
    }
}

impl RatchetConfig {
    /// Builds a config with the default labels but a caller-supplied
    /// session associated data and skip bound.
    pub fn new(session_ad: Vec<u8>, max_skip: usize) -> Self {
        Self {
            max_skip,
            session_ad,
            ..Self::default()
        }
    }
}
