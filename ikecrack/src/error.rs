use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrackError>;

#[derive(Error, Debug)]
pub enum CrackError {
    #[error("Unknown mask symbol '{symbol}' at position {position}, expected one of a, d, l, u")]
    InvalidMaskSymbol { symbol: char, position: usize },

    #[error("The alphabet at position {position} is empty or contains non-ASCII bytes")]
    InvalidAlphabet { position: usize },

    #[error("Unknown hash algorithm with digest size {0}, expected 16 (MD5) or 20 (SHA-1)")]
    UnknownDigestSize(usize),

    #[error("Unsupported hash algorithm '{0}', expected md5 or sha1")]
    UnsupportedAlgorithm(String),

    #[error("The keyspace of this mask does not fit in 128 bits")]
    KeyspaceOverflow,

    #[error("Candidate index {index} is outside of the keyspace (0..{total})")]
    IndexOutOfRange { index: u128, total: u128 },

    #[error("Worker(s) {workers:?} stopped without finishing their range, the search is incomplete")]
    WorkerFailure { workers: Vec<usize> },

    #[error("Unable to build the worker thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid handshake data: expected 9 '*'-separated fields, found {0}")]
    MalformedHandshake(usize),

    #[error("Field {field} is not valid hexadecimal")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Unable to access the file at the given path")]
    Io(#[from] io::Error),
}
