//! The IKEv1 aggressive mode authentication hash.
//!
//! With a pre-shared key, the responder's hash is:
//! - SKEYID = prf(psk, Ni | Nr)
//! - HASH = prf(SKEYID, g_y | g_x | Cr | Ci | SAi | IDr)
//!
//! where prf is HMAC-MD5 or HMAC-SHA1, depending on the negotiated hash.

use std::{fmt, marker::PhantomData, str::FromStr};

use hmac::{
    digest::{KeyInit, Output},
    Hmac, Mac,
};
use md5::Md5;
use sha1::Sha1;

use crate::{
    error::{CrackError, Result},
    handshake::Exchange,
};

pub type HmacMd5 = Hmac<Md5>;
pub type HmacSha1 = Hmac<Sha1>;

/// The hash function negotiated in the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
}

impl HashAlgorithm {
    /// Detects the algorithm from the size of a captured digest.
    pub fn from_digest_size(size: usize) -> Result<Self> {
        match size {
            16 => Ok(Self::Md5),
            20 => Ok(Self::Sha1),
            _ => Err(CrackError::UnknownDigestSize(size)),
        }
    }

    pub fn digest_size(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA1"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = CrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            _ => Err(CrackError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

/// Computes the authentication hash of candidate passwords for one exchange.
///
/// The MAC type is fixed at construction so the per-candidate path never
/// branches on the algorithm. Both HMAC messages are concatenated once here.
pub struct Oracle<M> {
    nonces: Vec<u8>,
    transcript: Vec<u8>,
    _mac: PhantomData<fn() -> M>,
}

impl<M: Mac + KeyInit> Oracle<M> {
    pub fn new(exchange: &Exchange) -> Self {
        Self {
            nonces: exchange.nonces(),
            transcript: exchange.transcript(),
            _mac: PhantomData,
        }
    }

    /// Returns the authentication hash the responder would send if `password`
    /// were the pre-shared key.
    #[inline]
    pub fn compute(&self, password: &[u8]) -> Output<M> {
        let skeyid = prf::<M>(password, &self.nonces);
        prf::<M>(&skeyid, &self.transcript)
    }
}

#[inline(always)]
fn prf<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Output<M> {
    let mut mac = <M as KeyInit>::new_from_slice(key).expect("HMAC key");
    mac.update(message);
    mac.finalize().into_bytes()
}

/// Computes the authentication hash with an algorithm only known at runtime.
pub fn compute_hash(algorithm: HashAlgorithm, exchange: &Exchange, password: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Md5 => Oracle::<HmacMd5>::new(exchange).compute(password).to_vec(),
        HashAlgorithm::Sha1 => Oracle::<HmacSha1>::new(exchange).compute(password).to_vec(),
    }
}
