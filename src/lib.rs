//! Double Ratchet stateful protocol engine.
//!
//! Owns the Diffie-Hellman ratchet, the two symmetric-key chains, and the
//! skipped-message-key store described in the Signal Double Ratchet
//! algorithm. Consumes concrete KDF, DH, and AEAD primitives through the
//! [`primitives`] traits rather than assuming one implementation, though
//! [`DoubleRatchet`] defaults to HKDF-SHA256 / X25519 / AES-256-GCM.
//!
//! The initial shared secret and peer public key this engine bootstraps
//! from are the responsibility of an external key-agreement (X3DH or
//! equivalent) — establishing that secret is out of scope here.

pub mod config;
pub mod constants;
pub mod document;
pub mod engine;
pub mod errors;
pub mod header;
pub mod kdf_chain;
pub mod primitives;
pub mod skipped_keys;
pub mod symmetric_ratchet;

pub use config::RatchetConfig;
pub use document::Document;
pub use engine::DoubleRatchet;
pub use errors::RatchetError;
pub use header::Header;
pub use primitives::{Aead, Aes256GcmAead, DhKeyPair, HkdfSha256, Kdf, Key32, X25519KeyPair};
