//! The Double Ratchet engine: the orchestrator that owns the root chain,
//! the symmetric-key ratchet, the skipped-key store, and the peer's current
//! public key, and exposes `encrypt`/`decrypt`/`serialize`/`deserialize` to
//! the application.
//!
//! Generic over three capability traits ([`Kdf`], [`DhKeyPair`], [`Aead`])
//! rather than a tagged-variant representation, per the design note that
//! interface abstraction is preferred; the default type parameters select
//! HKDF-SHA256, X25519, and AES-256-GCM.

use std::marker::PhantomData;

use log::{debug, trace};

use crate::config::RatchetConfig;
use crate::document::{Document, SkippedKeyDocument, SubChainDocument};
use crate::errors::RatchetError;
use crate::header::Header;
use crate::kdf_chain::{ConstantInputKdfChain, KdfChain};
use crate::primitives::{Aead, Aes256GcmAead, DhKeyPair, HkdfSha256, Kdf, Key32, X25519KeyPair};
use crate::skipped_keys::SkippedKeyStore;
use crate::symmetric_ratchet::{Direction, SymmetricRatchet};

/// A Double Ratchet session. Long-lived: there is no terminal state, and
/// every public method except the bootstrap constructors takes `&mut self`.
///
/// Not `Send`/`Sync`-restricted by this crate, but callers must serialize
/// access externally — two concurrent calls on the same session would race
/// on `Ns`/`Nr` and the sending/receiving chains.
pub struct DoubleRatchet<K: Kdf = HkdfSha256, D: DhKeyPair = X25519KeyPair, A: Aead = Aes256GcmAead> {
    own_ratchet_keypair: D,
    other_ratchet_public: Option<D::PublicKey>,
    root_chain: KdfChain<K>,
    sym: SymmetricRatchet<K>,
    skipped: SkippedKeyStore<D>,
    config: RatchetConfig,
    _aead: PhantomData<A>,
}

impl<K: Kdf + Clone, D: DhKeyPair, A: Aead + Clone> Clone for DoubleRatchet<K, D, A> {
    fn clone(&self) -> Self {
        DoubleRatchet {
            own_ratchet_keypair: self.own_ratchet_keypair.clone(),
            other_ratchet_public: self.other_ratchet_public.clone(),
            root_chain: self.root_chain.clone(),
            sym: self.sym.clone(),
            skipped: self.skipped.clone(),
            config: self.config.clone(),
            _aead: PhantomData,
        }
    }
}

impl<K: Kdf, D: DhKeyPair, A: Aead> DoubleRatchet<K, D, A> {
    /// Active bootstrap (Alice in X3DH): caller supplies the initial shared
    /// secret from the external key-agreement and the peer's first ratchet
    /// public. A fresh own key pair is generated, a DH step against
    /// `other_pub` seeds the root chain, and the output seeds the sending
    /// sub-chain — `can_send()` is true immediately, `can_recv()` only once
    /// a DH step can bootstrap the receiving side from an incoming header.
    ///
    /// `shared_secret` is not part of spec.md's `new_active(session_ad,
    /// other_pub, config)` surface listing, but §4.3 is explicit that the
    /// root chain is seeded with the initial shared secret from the
    /// external key-agreement, and the reference test suite
    /// (`original_source`) confirms the root chain always takes an explicit
    /// seed at construction — see DESIGN.md.
    pub fn new_active(
        shared_secret: Key32,
        other_pub: D::PublicKey,
        config: RatchetConfig,
    ) -> Result<Self, RatchetError> {
        let own_ratchet_keypair = D::generate();
        let mut root_chain = KdfChain::new(shared_secret, config.root_kdf_info.clone());
        let dh_out = own_ratchet_keypair.diffie_hellman(&other_pub);
        let sending_seed = root_chain.step(dh_out.as_bytes())?;

        let mut sym = SymmetricRatchet::new(
            config.sub_chain_kdf_info.clone(),
            config.sub_chain_const_input.clone(),
        );
        sym.replace_chain(Direction::Sending, sending_seed);

        debug!("active bootstrap complete, sending chain seeded");

        Ok(DoubleRatchet {
            own_ratchet_keypair,
            other_ratchet_public: Some(other_pub),
            root_chain,
            sym,
            skipped: SkippedKeyStore::new(config.max_skip),
            config,
            _aead: PhantomData,
        })
    }

    /// Passive bootstrap (Bob in X3DH): caller supplies its own first
    /// ratchet key pair and the same initial shared secret the active side
    /// used. No DH step runs yet — the peer's public key is not known —
    /// so neither sub-chain is seeded and `can_send()` is false until the
    /// first successful `decrypt`.
    pub fn new_passive(shared_secret: Key32, own_key_pair: D, config: RatchetConfig) -> Self {
        let root_chain = KdfChain::new(shared_secret, config.root_kdf_info.clone());
        let sym = SymmetricRatchet::new(
            config.sub_chain_kdf_info.clone(),
            config.sub_chain_const_input.clone(),
        );

        debug!("passive bootstrap complete, awaiting first receive");

        DoubleRatchet {
            own_ratchet_keypair: own_key_pair,
            other_ratchet_public: None,
            root_chain,
            sym,
            skipped: SkippedKeyStore::new(config.max_skip),
            config,
            _aead: PhantomData,
        }
    }

    pub fn can_send(&self) -> bool {
        self.sym.can_send()
    }

    /// True once the receiving sub-chain is seeded, or if it is not yet
    /// seeded but a DH step could still bootstrap it from the next incoming
    /// header (i.e. no peer public is known yet — the passive-bootstrap
    /// case).
    pub fn can_recv(&self) -> bool {
        self.sym.can_recv() || self.other_ratchet_public.is_none()
    }

    /// Deterministic, bijective-over-`(header, session_ad)` associated-data
    /// encoding: the header's own encoding is fixed-length for a given `D`,
    /// so appending `session_ad` after it cannot be confused with a longer
    /// header.
    fn make_ad(&self, header: &Header<D>) -> Vec<u8> {
        let mut ad = header.to_bytes();
        ad.extend_from_slice(&self.config.session_ad);
        ad
    }

    /// Binds a sub-chain message key to the AEAD under `config.aead_info`
    /// before it ever reaches an `Aead` call, so the bytes keying the cipher
    /// are never the raw chain-step output but a key derived under a label
    /// distinct from the root- and sub-chain labels.
    fn aead_key(&self, mk: &Key32) -> Result<Key32, RatchetError> {
        let (_, derived) = K::derive(mk, &self.config.aead_info, b"")?;
        Ok(derived)
    }

    /// Encrypts `plaintext`, advancing the sending sub-chain by one step.
    /// Fails with [`RatchetError::NotInitialized`] if the sending chain is
    /// not yet seeded (passive bootstrap, nothing received yet).
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<(Header<D>, Vec<u8>), RatchetError> {
        if !self.sym.can_send() {
            return Err(RatchetError::NotInitialized);
        }
        let (mk, n) = self.sym.step(Direction::Sending)?;
        let header = Header::new(self.own_ratchet_keypair.public(), self.sym.pn, n);
        let ad = self.make_ad(&header);
        let mk = self.aead_key(&mk)?;
        let ciphertext = A::encrypt(&mk, plaintext, &ad)?;
        trace!("encrypted message n={n} pn={}", header.pn);
        Ok((header, ciphertext))
    }

    /// Decrypts `ciphertext` under `header`, performing whatever skip
    /// handling and DH ratchet step the header requires.
    ///
    /// Atomic: on any error (`TooManySavedMessageKeys`,
    /// `AuthenticationFailure`, or a propagated primitive error) `self` is
    /// left byte-for-byte as it was before the call. This is implemented by
    /// running the whole algorithm against a scratch clone of the session
    /// and only swapping it into `self` once every step — including the
    /// final AEAD decrypt — has succeeded.
    pub fn decrypt(&mut self, header: &Header<D>, ciphertext: &[u8]) -> Result<Vec<u8>, RatchetError>
    where
        K: Clone,
        A: Clone,
    {
        let mut staged = self.clone();
        let plaintext = staged.decrypt_staged(header, ciphertext)?;
        *self = staged;
        Ok(plaintext)
    }

    fn decrypt_staged(&mut self, header: &Header<D>, ciphertext: &[u8]) -> Result<Vec<u8>, RatchetError> {
        // 1. Skipped path: a late arrival for an index we already stepped past.
        if let Some(mk) = self.skipped.take(&header.public, header.n) {
            let ad = self.make_ad(header);
            let mk = self.aead_key(&mk)?;
            trace!("decrypting via skipped-key store, n={}", header.n);
            return A::decrypt(&mk, ciphertext, &ad);
        }

        // 2. DH-step path: a new sender public triggers a rotation.
        let is_new_remote = match &self.other_ratchet_public {
            None => true,
            Some(current) => current != &header.public,
        };
        if is_new_remote {
            self.skip_receiving_until(header.pn)?;
            self.dh_ratchet_step(header.public.clone())?;
            debug!("performed DH ratchet step on new remote public");
        }

        // 3. Chain-advance path: fill any gap up to header.n, storing each
        // intermediate key as skipped.
        self.skip_receiving_until(header.n)?;

        // 4. Step once more to obtain the key for header.n itself.
        let (mk, n) = self.sym.step(Direction::Receiving)?;
        debug_assert_eq!(n, header.n);
        let ad = self.make_ad(header);
        let mk = self.aead_key(&mk)?;
        let plaintext = A::decrypt(&mk, ciphertext, &ad)?;
        trace!("decrypted message n={n}");
        Ok(plaintext)
    }

    /// Advances the receiving sub-chain (if seeded) until `Nr == until`,
    /// stashing every intermediate key under `(other_ratchet_public, i)` in
    /// the skipped-key store. A no-op if the receiving chain isn't seeded
    /// yet — there is no tail to skip before the first DH step.
    fn skip_receiving_until(&mut self, until: u64) -> Result<(), RatchetError> {
        if !self.sym.can_recv() {
            return Ok(());
        }
        while self.sym.nr < until {
            let (mk, n) = self.sym.step(Direction::Receiving)?;
            let remote = self
                .other_ratchet_public
                .clone()
                .ok_or(RatchetError::MissingKey)?;
            self.skipped.put(remote, n, mk)?;
        }
        Ok(())
    }

    /// Performs both halves of a DH ratchet step: seed the receiving chain
    /// from `DH(own_priv, new_remote_public)`, then rotate to a fresh own
    /// key pair and seed the sending chain from a second DH against the
    /// same remote public — the eager-rotation branch of the open question
    /// in spec.md §9 (see DESIGN.md).
    fn dh_ratchet_step(&mut self, new_remote_public: D::PublicKey) -> Result<(), RatchetError> {
        let dh_recv = self.own_ratchet_keypair.diffie_hellman(&new_remote_public);
        let recv_seed = self.root_chain.step(dh_recv.as_bytes())?;
        self.sym.replace_chain(Direction::Receiving, recv_seed);

        self.own_ratchet_keypair = D::generate();
        let dh_send = self.own_ratchet_keypair.diffie_hellman(&new_remote_public);
        let send_seed = self.root_chain.step(dh_send.as_bytes())?;
        self.sym.replace_chain(Direction::Sending, send_seed);

        self.other_ratchet_public = Some(new_remote_public);
        Ok(())
    }

    /// Serializes the session to an opaque [`Document`]. The document
    /// carries the own private ratchet key, so at-rest protection of the
    /// result is the application's responsibility.
    pub fn serialize(&self) -> Document {
        let to_sub_chain = |chain: &ConstantInputKdfChain<K>| SubChainDocument {
            chain_key: chain.key().as_bytes().to_vec(),
            length: chain.length(),
        };

        let (other_public_key, has_other_public_key) = match &self.other_ratchet_public {
            Some(p) => (D::public_to_bytes(p), true),
            None => (Vec::new(), false),
        };

        let skipped = self
            .skipped
            .iter()
            .map(|(remote_public, n, mk)| SkippedKeyDocument {
                remote_public: D::public_to_bytes(remote_public),
                n,
                message_key: mk.as_bytes().to_vec(),
            })
            .collect();

        Document {
            root_chain_key: self.root_chain.key().as_bytes().to_vec(),
            root_chain_length: self.root_chain.length(),
            sending_chain: self.sym.sending_chain().map(to_sub_chain),
            receiving_chain: self.sym.receiving_chain().map(to_sub_chain),
            ns: self.sym.ns,
            nr: self.sym.nr,
            pn: self.sym.pn,
            own_private_key: self.own_ratchet_keypair.private_to_bytes(),
            other_public_key,
            has_other_public_key,
            skipped,
        }
    }

    /// Reconstructs a session from a [`Document`] produced by `serialize`
    /// and the same `config` the original session was built with. A
    /// document built under a different `config` (different labels,
    /// different `max_skip`) reconstructs into a session that behaves
    /// differently from the original — config is not itself part of the
    /// document.
    pub fn deserialize(document: &Document, config: RatchetConfig) -> Result<Self, RatchetError> {
        let key_32 = |bytes: &[u8]| -> Result<Key32, RatchetError> {
            let arr: [u8; 32] = bytes.try_into().map_err(|_| RatchetError::MalformedDocument)?;
            Ok(Key32::from_bytes(arr))
        };

        let own_ratchet_keypair = D::from_private_bytes(&document.own_private_key)?;
        let other_ratchet_public = if document.has_other_public_key {
            Some(D::public_from_bytes(&document.other_public_key)?)
        } else {
            None
        };

        let root_chain = KdfChain::from_parts(
            key_32(&document.root_chain_key)?,
            document.root_chain_length,
            config.root_kdf_info.clone(),
        );

        let to_chain = |doc: &SubChainDocument| -> Result<ConstantInputKdfChain<K>, RatchetError> {
            Ok(ConstantInputKdfChain::from_parts(
                key_32(&doc.chain_key)?,
                doc.length,
                config.sub_chain_kdf_info.clone(),
                config.sub_chain_const_input.clone(),
            ))
        };
        let sending = document.sending_chain.as_ref().map(to_chain).transpose()?;
        let receiving = document.receiving_chain.as_ref().map(to_chain).transpose()?;

        let sym = SymmetricRatchet::from_parts(
            config.sub_chain_kdf_info.clone(),
            config.sub_chain_const_input.clone(),
            sending,
            receiving,
            document.ns,
            document.nr,
            document.pn,
        );

        let mut entries = Vec::with_capacity(document.skipped.len());
        for entry in &document.skipped {
            let remote_public = D::public_from_bytes(&entry.remote_public)?;
            entries.push((remote_public, entry.n, key_32(&entry.message_key)?));
        }
        let skipped = SkippedKeyStore::from_entries(config.max_skip, entries);

        Ok(DoubleRatchet {
            own_ratchet_keypair,
            other_ratchet_public,
            root_chain,
            sym,
            skipped,
            config,
            _aead: PhantomData,
        })
    }
}
