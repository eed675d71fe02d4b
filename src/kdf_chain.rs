//! The KDF chain abstraction: a stateful key that rewrites itself on every
//! step and emits a derived output alongside the rewrite. The root chain and
//! both symmetric sub-chains (see [`crate::symmetric_ratchet`]) are built on
//! top of this one construction.

use std::marker::PhantomData;

use crate::errors::RatchetError;
use crate::primitives::{Kdf, Key32};

/// A chain key plus a length counter, generic over the KDF used to advance
/// it. `step` folds caller-supplied input bytes into the current key under
/// `info`, replacing the key and returning the derived output.
#[derive(Clone)]
pub struct KdfChain<K: Kdf> {
    key: Key32,
    length: u64,
    info: Vec<u8>,
    _kdf: PhantomData<K>,
}

impl<K: Kdf> KdfChain<K> {
    pub fn new(key: Key32, info: Vec<u8>) -> Self {
        KdfChain { key, length: 0, info, _kdf: PhantomData }
    }

    /// Reconstructs a chain at an arbitrary length, for restoring
    /// serialized state rather than starting a fresh chain at length 0.
    pub fn from_parts(key: Key32, length: u64, info: Vec<u8>) -> Self {
        KdfChain { key, length, info, _kdf: PhantomData }
    }

    pub fn key(&self) -> &Key32 {
        &self.key
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Folds `input` into the chain key, producing the next output. The key
    /// is replaced in place; the previous key is dropped (and zeroized).
    pub fn step(&mut self, input: &[u8]) -> Result<Key32, RatchetError> {
        let (next_key, output) = K::derive(&self.key, &self.info, input)?;
        self.key = next_key;
        self.length += 1;
        Ok(output)
    }
}

/// A [`KdfChain`] whose step input is fixed at construction, used for the
/// symmetric-key ratchet's send/recv sub-chains: each step there depends
/// only on the current chain key, never on caller-supplied data.
#[derive(Clone)]
pub struct ConstantInputKdfChain<K: Kdf> {
    chain: KdfChain<K>,
    const_input: Vec<u8>,
}

impl<K: Kdf> ConstantInputKdfChain<K> {
    pub fn new(key: Key32, info: Vec<u8>, const_input: Vec<u8>) -> Self {
        ConstantInputKdfChain { chain: KdfChain::new(key, info), const_input }
    }

    /// Reconstructs a sub-chain at an arbitrary length, for restoring
    /// serialized state.
    pub fn from_parts(key: Key32, length: u64, info: Vec<u8>, const_input: Vec<u8>) -> Self {
        ConstantInputKdfChain { chain: KdfChain::from_parts(key, length, info), const_input }
    }

    pub fn key(&self) -> &Key32 {
        self.chain.key()
    }

    pub fn length(&self) -> u64 {
        self.chain.length()
    }

    /// Advances the chain by one step and returns the derived output (a
    /// message key, before the caller applies any further AEAD-key
    /// derivation).
    pub fn next(&mut self) -> Result<Key32, RatchetError> {
        self.chain.step(&self.const_input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::HkdfSha256;

    #[test]
    fn step_advances_length_and_changes_key_each_time() {
        let mut chain: KdfChain<HkdfSha256> =
            KdfChain::new(Key32::from_bytes([1u8; 32]), b"root".to_vec());
        assert_eq!(chain.length(), 0);

        let out1 = chain.step(b"dh-output-1").unwrap();
        assert_eq!(chain.length(), 1);
        let out2 = chain.step(b"dh-output-2").unwrap();
        assert_eq!(chain.length(), 2);

        assert_ne!(out1.as_bytes(), out2.as_bytes());
    }

    #[test]
    fn constant_input_chain_is_deterministic_given_same_seed() {
        let mut a: ConstantInputKdfChain<HkdfSha256> = ConstantInputKdfChain::new(
            Key32::from_bytes([9u8; 32]),
            b"chain".to_vec(),
            b"const_data".to_vec(),
        );
        let mut b: ConstantInputKdfChain<HkdfSha256> = ConstantInputKdfChain::new(
            Key32::from_bytes([9u8; 32]),
            b"chain".to_vec(),
            b"const_data".to_vec(),
        );

        for _ in 0..5 {
            let oa = a.next().unwrap();
            let ob = b.next().unwrap();
            assert_eq!(oa.as_bytes(), ob.as_bytes());
        }
        assert_eq!(a.length(), 5);
    }

    #[test]
    fn successive_outputs_from_one_chain_differ() {
        let mut chain: ConstantInputKdfChain<HkdfSha256> = ConstantInputKdfChain::new(
            Key32::from_bytes([4u8; 32]),
            b"chain".to_vec(),
            b"const_data".to_vec(),
        );
        let first = chain.next().unwrap();
        let second = chain.next().unwrap();
        assert_ne!(first.as_bytes(), second.as_bytes());
    }
}
