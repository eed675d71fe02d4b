//! The message header: the sender's current ratchet public key plus the
//! `pn`/`n` counters a receiver needs to locate the right message key. The
//! header is never encrypted; it is bound into the AEAD call as associated
//! data (see [`crate::engine::make_ad`]).

use arrayref::array_ref;

use crate::errors::RatchetError;
use crate::primitives::DhKeyPair;

/// `{ public, pn, n }`, generic over the DH implementation so the encoded
/// public-key length follows whatever that implementation uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header<D: DhKeyPair> {
    pub public: D::PublicKey,
    pub pn: u64,
    pub n: u64,
}

impl<D: DhKeyPair> Header<D> {
    pub fn new(public: D::PublicKey, pn: u64, n: u64) -> Self {
        Header { public, pn, n }
    }

    /// Bijective encoding: `public_bytes || pn (8 bytes LE) || n (8 bytes LE)`.
    /// The public-key byte length is fixed by the DH implementation, so no
    /// length prefix is needed to make decoding unambiguous.
    pub fn to_bytes(&self) -> Vec<u8> {
        let public_bytes = D::public_to_bytes(&self.public);
        let mut bytes = Vec::with_capacity(public_bytes.len() + 16);
        bytes.extend_from_slice(&public_bytes);
        bytes.extend_from_slice(&self.pn.to_le_bytes());
        bytes.extend_from_slice(&self.n.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RatchetError> {
        if bytes.len() < 16 {
            return Err(RatchetError::MalformedHeader);
        }
        let public_len = bytes.len() - 16;
        let public = D::public_from_bytes(&bytes[..public_len])
            .map_err(|_| RatchetError::MalformedHeader)?;
        let pn = u64::from_le_bytes(*array_ref!(bytes, public_len, 8));
        let n = u64::from_le_bytes(*array_ref!(bytes, public_len + 8, 8));
        Ok(Header { public, pn, n })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::X25519KeyPair;

    #[test]
    fn header_round_trips_through_bytes() {
        let pair = X25519KeyPair::generate();
        let header: Header<X25519KeyPair> = Header::new(pair.public(), 3, 7);
        let bytes = header.to_bytes();
        let decoded: Header<X25519KeyPair> = Header::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.public, header.public);
        assert_eq!(decoded.pn, 3);
        assert_eq!(decoded.n, 7);
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let decoded = Header::<X25519KeyPair>::from_bytes(&[0u8; 4]);
        assert!(matches!(decoded, Err(RatchetError::MalformedHeader)));
    }

    #[test]
    fn distinct_headers_encode_distinct_bytes() {
        let pair = X25519KeyPair::generate();
        let a: Header<X25519KeyPair> = Header::new(pair.public(), 0, 0);
        let b: Header<X25519KeyPair> = Header::new(pair.public(), 0, 1);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }
}
