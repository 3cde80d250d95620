//! # ikecrack
//!
//! Recovers the pre-shared key of an IKEv1 aggressive mode exchange by brute
//! force. The responder's authentication hash only depends on the public
//! values of the exchange and on the pre-shared key, so every candidate of a
//! password mask can be tested offline:
//!
//! ```no_run
//! use ikecrack::{Handshake, Keyspace, Search, SearchConfig};
//!
//! # fn main() -> ikecrack::Result<()> {
//! let handshake = Handshake::load("capture.txt")?;
//! let keyspace = Keyspace::compile("lldd")?;
//!
//! let report = Search::new(SearchConfig::default()).run(&keyspace, &handshake)?;
//! if let Some(password) = report.password() {
//!     println!("{password}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handshake;
pub mod keyspace;
pub mod oracle;
pub mod partition;
pub mod progress;
pub mod search;
pub mod worker;

pub use {
    error::{CrackError, Result},
    handshake::{Exchange, Handshake},
    keyspace::{CharClass, Keyspace},
    oracle::{compute_hash, HashAlgorithm, Oracle},
    partition::partition,
    progress::{BarProgress, NoProgress, ProgressSink},
    search::{Outcome, Search, SearchConfig, SearchReport},
    worker::{CancelFlag, WorkerState},
};
