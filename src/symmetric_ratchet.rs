//! The symmetric-key ratchet: a pair of optional constant-input KDF chains
//! (sending, receiving) plus the `Ns`/`Nr`/`PN` counters that the engine
//! reads when building headers and deciding what to store as skipped.

use crate::errors::RatchetError;
use crate::kdf_chain::ConstantInputKdfChain;
use crate::primitives::{Kdf, Key32};

/// Which of the two sub-chains an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Sending,
    Receiving,
}

/// Holds the sending and receiving sub-chains plus their step counters. A
/// freshly bootstrapped engine has at most one of the two chains seeded;
/// `replace_chain` is the only way to (re)seed one.
#[derive(Clone)]
pub struct SymmetricRatchet<K: Kdf> {
    sending: Option<ConstantInputKdfChain<K>>,
    receiving: Option<ConstantInputKdfChain<K>>,
    pub ns: u64,
    pub nr: u64,
    pub pn: u64,
    kdf_info: Vec<u8>,
    const_input: Vec<u8>,
}

impl<K: Kdf> SymmetricRatchet<K> {
    pub fn new(kdf_info: Vec<u8>, const_input: Vec<u8>) -> Self {
        SymmetricRatchet {
            sending: None,
            receiving: None,
            ns: 0,
            nr: 0,
            pn: 0,
            kdf_info,
            const_input,
        }
    }

    /// Rebuilds a ratchet from previously persisted sub-chains and
    /// counters, for [`crate::engine::DoubleRatchet::deserialize`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        kdf_info: Vec<u8>,
        const_input: Vec<u8>,
        sending: Option<ConstantInputKdfChain<K>>,
        receiving: Option<ConstantInputKdfChain<K>>,
        ns: u64,
        nr: u64,
        pn: u64,
    ) -> Self {
        SymmetricRatchet { sending, receiving, ns, nr, pn, kdf_info, const_input }
    }

    pub fn sending_chain(&self) -> Option<&ConstantInputKdfChain<K>> {
        self.sending.as_ref()
    }

    pub fn receiving_chain(&self) -> Option<&ConstantInputKdfChain<K>> {
        self.receiving.as_ref()
    }

    pub fn can_send(&self) -> bool {
        self.sending.is_some()
    }

    pub fn can_recv(&self) -> bool {
        self.receiving.is_some()
    }

    /// Advances the sub-chain named by `direction`, returning its derived
    /// message key and the index (`Ns`/`Nr` value) it was produced at.
    /// Caller must ensure the sub-chain is seeded first; stepping an absent
    /// chain is a programming error.
    pub fn step(&mut self, direction: Direction) -> Result<(Key32, u64), RatchetError> {
        match direction {
            Direction::Sending => {
                let chain = self.sending.as_mut().ok_or(RatchetError::NotInitialized)?;
                let mk = chain.next()?;
                let n = self.ns;
                self.ns += 1;
                Ok((mk, n))
            }
            Direction::Receiving => {
                let chain = self.receiving.as_mut().ok_or(RatchetError::NotInitialized)?;
                let mk = chain.next()?;
                let n = self.nr;
                self.nr += 1;
                Ok((mk, n))
            }
        }
    }

    /// Installs a freshly seeded chain in place of the named sub-chain,
    /// resetting its counter to 0. When replacing the sending chain, the
    /// outgoing chain's length (`Ns`, i.e. messages already sent on it) is
    /// first recorded into `PN` — the value the *next* header's `pn` field
    /// will carry — per the DH-ratchet-step contract in the engine.
    pub fn replace_chain(&mut self, direction: Direction, new_chain_key: Key32) {
        match direction {
            Direction::Sending => {
                self.pn = self.ns;
                self.ns = 0;
                self.sending = Some(ConstantInputKdfChain::new(
                    new_chain_key,
                    self.kdf_info.clone(),
                    self.const_input.clone(),
                ));
            }
            Direction::Receiving => {
                self.nr = 0;
                self.receiving = Some(ConstantInputKdfChain::new(
                    new_chain_key,
                    self.kdf_info.clone(),
                    self.const_input.clone(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::HkdfSha256;

    fn ratchet() -> SymmetricRatchet<HkdfSha256> {
        SymmetricRatchet::new(b"ChainKey".to_vec(), b"const_data".to_vec())
    }

    #[test]
    fn fresh_ratchet_can_neither_send_nor_recv() {
        let r = ratchet();
        assert!(!r.can_send());
        assert!(!r.can_recv());
    }

    #[test]
    fn replace_chain_seeds_and_resets_counters() {
        let mut r = ratchet();
        r.replace_chain(Direction::Sending, Key32::from_bytes([1u8; 32]));
        assert!(r.can_send());
        assert_eq!(r.ns, 0);

        let (_, n0) = r.step(Direction::Sending).unwrap();
        let (_, n1) = r.step(Direction::Sending).unwrap();
        assert_eq!(n0, 0);
        assert_eq!(n1, 1);
        assert_eq!(r.ns, 2);
    }

    #[test]
    fn replacing_sending_chain_again_records_pn_and_resets_ns() {
        let mut r = ratchet();
        r.replace_chain(Direction::Sending, Key32::from_bytes([1u8; 32]));
        r.step(Direction::Sending).unwrap();
        r.step(Direction::Sending).unwrap();
        assert_eq!(r.ns, 2);

        r.replace_chain(Direction::Sending, Key32::from_bytes([2u8; 32]));
        assert_eq!(r.pn, 2);
        assert_eq!(r.ns, 0);
    }

    #[test]
    fn stepping_unseeded_chain_fails_not_initialized() {
        let mut r = ratchet();
        assert!(matches!(
            r.step(Direction::Sending),
            Err(RatchetError::NotInitialized)
        ));
        assert!(matches!(
            r.step(Direction::Receiving),
            Err(RatchetError::NotInitialized)
        ));
    }
}
