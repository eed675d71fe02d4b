//! The skipped-message-key store: a bounded map from `(remote public, n)` to
//! a message key, populated whenever the receiving chain is advanced past a
//! gap and drained whenever a late message arrives for an already-skipped
//! index.
//!
//! No eviction policy exists. Once the bound is reached, inserting another
//! key fails the whole receive with [`RatchetError::TooManySavedMessageKeys`]
//! rather than silently discarding an older entry — an attacker forcing a
//! party to drop keys it still needs is worse than an error the application
//! can act on.

use std::collections::HashMap;

use crate::errors::RatchetError;
use crate::primitives::{DhKeyPair, Key32};

#[derive(Clone, PartialEq, Eq, Hash)]
struct SkippedKeyId<P: Clone + PartialEq + Eq + std::hash::Hash> {
    remote_public: P,
    n: u64,
}

/// Bounded `(remote_public, n) -> message_key` map, generic over the DH
/// public-key type so it can be keyed without depending on any one DH
/// implementation.
#[derive(Clone)]
pub struct SkippedKeyStore<D: DhKeyPair> {
    entries: HashMap<SkippedKeyId<D::PublicKey>, Key32>,
    max_skip: usize,
}

impl<D: DhKeyPair> SkippedKeyStore<D> {
    pub fn new(max_skip: usize) -> Self {
        SkippedKeyStore { entries: HashMap::new(), max_skip }
    }

    /// Rebuilds a store from previously persisted entries, for
    /// [`crate::engine::DoubleRatchet::deserialize`]. Does not re-check the
    /// `max_skip` bound against the restored count: a document produced by
    /// `serialize` never holds more than `max_skip` entries, since `put`
    /// enforces the bound on every insertion that produced it.
    pub fn from_entries(max_skip: usize, entries: Vec<(D::PublicKey, u64, Key32)>) -> Self {
        let mut map = HashMap::with_capacity(entries.len());
        for (remote_public, n, mk) in entries {
            map.insert(SkippedKeyId { remote_public, n }, mk);
        }
        SkippedKeyStore { entries: map, max_skip }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts `(remote_public, n) -> mk`. Fails without mutating the store
    /// if doing so would exceed `max_skip`.
    pub fn put(
        &mut self,
        remote_public: D::PublicKey,
        n: u64,
        mk: Key32,
    ) -> Result<(), RatchetError> {
        let id = SkippedKeyId { remote_public, n };
        if self.entries.contains_key(&id) {
            self.entries.insert(id, mk);
            return Ok(());
        }
        if self.entries.len() >= self.max_skip {
            return Err(RatchetError::TooManySavedMessageKeys);
        }
        self.entries.insert(id, mk);
        Ok(())
    }

    /// Removes and returns the key for `(remote_public, n)` if present.
    /// Single-use: a second `take` for the same id returns `None`.
    pub fn take(&mut self, remote_public: &D::PublicKey, n: u64) -> Option<Key32> {
        let id = SkippedKeyId { remote_public: remote_public.clone(), n };
        self.entries.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&D::PublicKey, u64, &Key32)> {
        self.entries.iter().map(|(id, mk)| (&id.remote_public, id.n, mk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::X25519KeyPair;

    type Store = SkippedKeyStore<X25519KeyPair>;

    #[test]
    fn put_then_take_is_single_use() {
        let mut store = Store::new(5);
        let peer = X25519KeyPair::generate().public();
        store.put(peer.clone(), 3, Key32::from_bytes([1u8; 32])).unwrap();
        assert_eq!(store.len(), 1);

        let got = store.take(&peer, 3);
        assert!(got.is_some());
        assert!(store.take(&peer, 3).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn put_beyond_bound_fails_and_leaves_store_unchanged() {
        let mut store = Store::new(2);
        let peer = X25519KeyPair::generate().public();
        store.put(peer.clone(), 0, Key32::from_bytes([1u8; 32])).unwrap();
        store.put(peer.clone(), 1, Key32::from_bytes([2u8; 32])).unwrap();

        let err = store.put(peer.clone(), 2, Key32::from_bytes([3u8; 32]));
        assert!(matches!(err, Err(RatchetError::TooManySavedMessageKeys)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn take_missing_entry_returns_none() {
        let mut store = Store::new(5);
        let peer = X25519KeyPair::generate().public();
        assert!(store.take(&peer, 0).is_none());
    }

    #[test]
    fn different_remote_publics_do_not_collide() {
        let mut store = Store::new(5);
        let peer_a = X25519KeyPair::generate().public();
        let peer_b = X25519KeyPair::generate().public();
        store.put(peer_a.clone(), 0, Key32::from_bytes([1u8; 32])).unwrap();
        store.put(peer_b.clone(), 0, Key32::from_bytes([2u8; 32])).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.take(&peer_a, 0).is_some());
        assert!(store.take(&peer_b, 0).is_some());
    }
}
