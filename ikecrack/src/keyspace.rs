//! Password masks and the mixed-radix index codec.
//!
//! A mask such as `"ldd"` describes one character class per password position.
//! Compiling it yields one alphabet per position. Every candidate of the
//! keyspace is then addressed by an index in `0..total`, where the last
//! position is the least significant digit.

use std::fmt;

use crate::error::{CrackError, Result};

const DIGITS: &[u8] = b"0123456789";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A character class usable in a mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    /// `a`: digits, then lowercase, then uppercase letters.
    Alphanumeric,
    /// `d`
    Digit,
    /// `l`
    Lower,
    /// `u`
    Upper,
}

impl CharClass {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'a' => Some(Self::Alphanumeric),
            'd' => Some(Self::Digit),
            'l' => Some(Self::Lower),
            'u' => Some(Self::Upper),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Alphanumeric => 'a',
            Self::Digit => 'd',
            Self::Lower => 'l',
            Self::Upper => 'u',
        }
    }

    /// The ordered characters of the class.
    pub fn charset(self) -> &'static [u8] {
        match self {
            Self::Alphanumeric => ALPHANUMERIC,
            Self::Digit => DIGITS,
            Self::Lower => LOWER,
            Self::Upper => UPPER,
        }
    }
}

/// The compiled search space of a mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyspace {
    alphabets: Vec<Vec<u8>>,
    bases: Vec<u64>,
    total: u128,
}

impl Keyspace {
    /// Compiles a mask made of the symbols `a`, `d`, `l` and `u`.
    pub fn compile(mask: &str) -> Result<Keyspace> {
        let alphabets = mask
            .chars()
            .enumerate()
            .map(|(position, symbol)| {
                CharClass::from_symbol(symbol)
                    .map(|class| class.charset().to_vec())
                    .ok_or(CrackError::InvalidMaskSymbol { symbol, position })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_alphabets(alphabets)
    }

    /// Builds a keyspace from explicit per-position alphabets.
    /// Characters are kept in the given order, duplicates included.
    pub fn from_alphabets(alphabets: Vec<Vec<u8>>) -> Result<Keyspace> {
        let mut bases = Vec::with_capacity(alphabets.len());
        let mut total: u128 = 1;

        for (position, alphabet) in alphabets.iter().enumerate() {
            if alphabet.is_empty() || !alphabet.is_ascii() {
                return Err(CrackError::InvalidAlphabet { position });
            }

            let base = alphabet.len() as u64;
            total = total
                .checked_mul(u128::from(base))
                .ok_or(CrackError::KeyspaceOverflow)?;
            bases.push(base);
        }

        Ok(Keyspace {
            alphabets,
            bases,
            total,
        })
    }

    /// The password length.
    pub fn len(&self) -> usize {
        self.alphabets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alphabets.is_empty()
    }

    /// The number of candidates in the keyspace.
    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn bases(&self) -> &[u64] {
        &self.bases
    }

    pub fn alphabets(&self) -> &[Vec<u8>] {
        &self.alphabets
    }

    /// Returns the candidate at `index`.
    pub fn decode(&self, index: u128) -> Result<String> {
        if index >= self.total {
            return Err(CrackError::IndexOutOfRange {
                index,
                total: self.total,
            });
        }

        let mut buf = vec![0; self.len()];
        self.decode_into(index, &mut buf);

        // alphabets are checked to be ASCII
        Ok(buf.into_iter().map(char::from).collect())
    }

    /// Writes the candidate at `index` into `buf`.
    /// `index` must be lower than `total()` and `buf` exactly `len()` bytes long.
    #[inline]
    pub fn decode_into(&self, index: u128, buf: &mut [u8]) {
        debug_assert!(index < self.total);
        debug_assert_eq!(buf.len(), self.len());

        // 64-bit division is much cheaper, and covers every searchable index
        if let Ok(mut index) = u64::try_from(index) {
            for ((slot, alphabet), base) in self.positions(buf) {
                *slot = alphabet[(index % base) as usize];
                index /= base;
            }
        } else {
            let mut index = index;
            for ((slot, alphabet), base) in self.positions(buf) {
                let base = u128::from(base);
                *slot = alphabet[(index % base) as usize];
                index /= base;
            }
        }
    }

    /// Output slots with their alphabet and base, least significant first.
    fn positions<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Iterator<Item = ((&'a mut u8, &'a Vec<u8>), u64)> + 'a {
        buf.iter_mut()
            .zip(&self.alphabets)
            .zip(self.bases.iter().copied())
            .rev()
    }
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bases = self
            .bases
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("x");

        write!(f, "{} positions ({}), {} candidates", self.len(), bases, self.total)
    }
}
