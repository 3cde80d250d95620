//! Captured aggressive mode exchanges.
//!
//! A crackable handshake is stored on a single line of nine `*`-separated hex
//! fields:
//!
//! ```text
//! Ni*Nr*g_x*g_y*Ci*Cr*SAi*IDr*HASH_R
//! ```
//!
//! The size of the last field selects the hash algorithm.

use std::{fmt, fs, path::Path, str::FromStr};

use crate::{
    error::{CrackError, Result},
    oracle::{compute_hash, HashAlgorithm},
};

/// Field names, in the order of the handshake line.
const FIELDS: [&str; 8] = ["Ni", "Nr", "g_x", "g_y", "Ci", "Cr", "SAi", "IDr"];

/// The public values of an exchange, as seen on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Exchange {
    pub ni: Vec<u8>,
    pub nr: Vec<u8>,
    pub g_x: Vec<u8>,
    pub g_y: Vec<u8>,
    pub ci: Vec<u8>,
    pub cr: Vec<u8>,
    pub sai: Vec<u8>,
    pub idr: Vec<u8>,
}

impl Exchange {
    /// Builds an exchange from its eight fields in line order.
    fn from_fields(mut fields: [Vec<u8>; 8]) -> Exchange {
        let mut take = |i: usize| std::mem::take(&mut fields[i]);

        Exchange {
            ni: take(0),
            nr: take(1),
            g_x: take(2),
            g_y: take(3),
            ci: take(4),
            cr: take(5),
            sai: take(6),
            idr: take(7),
        }
    }

    fn fields(&self) -> [&[u8]; 8] {
        [
            &self.ni[..],
            &self.nr[..],
            &self.g_x[..],
            &self.g_y[..],
            &self.ci[..],
            &self.cr[..],
            &self.sai[..],
            &self.idr[..],
        ]
    }

    /// Parses a traffic description made of `name: hex` lines.
    /// Lines without a colon are skipped and missing fields are left empty.
    pub fn parse_traffic(content: &str) -> Result<Exchange> {
        let mut fields: [Vec<u8>; 8] = Default::default();

        for line in content.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };

            let name = name.trim();
            if let Some(i) = FIELDS.iter().position(|field| *field == name) {
                fields[i] = decode_field(FIELDS[i], value.trim())?;
            }
        }

        Ok(Self::from_fields(fields))
    }

    /// The message of the first PRF: `Ni | Nr`.
    pub fn nonces(&self) -> Vec<u8> {
        [&self.ni[..], &self.nr[..]].concat()
    }

    /// The message of the second PRF: `g_y | g_x | Cr | Ci | SAi | IDr`.
    ///
    /// The order of the Diffie-Hellman values and of the cookies is the one
    /// used for the responder's hash and must not be changed.
    pub fn transcript(&self) -> Vec<u8> {
        [
            &self.g_y[..],
            &self.g_x[..],
            &self.cr[..],
            &self.ci[..],
            &self.sai[..],
            &self.idr[..],
        ]
        .concat()
    }

    /// Computes the hash a peer using `password` would produce, yielding a
    /// handshake that can be cracked back.
    pub fn sign(self, password: &str, algorithm: HashAlgorithm) -> Handshake {
        let target = compute_hash(algorithm, &self, password.as_bytes());

        Handshake {
            exchange: self,
            target,
            algorithm,
        }
    }
}

/// An exchange with the captured hash to crack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handshake {
    exchange: Exchange,
    target: Vec<u8>,
    algorithm: HashAlgorithm,
}

impl Handshake {
    /// Fails if the target hash is neither an MD5 nor a SHA-1 digest.
    pub fn new(exchange: Exchange, target: Vec<u8>) -> Result<Handshake> {
        let algorithm = HashAlgorithm::from_digest_size(target.len())?;

        Ok(Handshake {
            exchange,
            target,
            algorithm,
        })
    }

    /// Parses a handshake line.
    pub fn parse(line: &str) -> Result<Handshake> {
        let parts = line.trim().split('*').collect::<Vec<_>>();
        if parts.len() != FIELDS.len() + 1 {
            return Err(CrackError::MalformedHandshake(parts.len()));
        }

        let mut fields: [Vec<u8>; 8] = Default::default();
        for (i, part) in parts[..FIELDS.len()].iter().enumerate() {
            fields[i] = decode_field(FIELDS[i], part)?;
        }
        let target = decode_field("HASH_R", parts[FIELDS.len()])?;

        Self::new(Exchange::from_fields(fields), target)
    }

    /// Reads and parses a handshake file.
    pub fn load(path: impl AsRef<Path>) -> Result<Handshake> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Serializes the handshake back to its line format.
    pub fn to_line(&self) -> String {
        self.exchange
            .fields()
            .into_iter()
            .map(hex::encode)
            .chain(std::iter::once(hex::encode(&self.target)))
            .collect::<Vec<_>>()
            .join("*")
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn target(&self) -> &[u8] {
        &self.target
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl FromStr for Handshake {
    type Err = CrackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|source| CrackError::InvalidHex { field, source })
}
