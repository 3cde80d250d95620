use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use ikecrack::HashAlgorithm;

/// IKEv1 aggressive mode pre-shared key cracker.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Brute-force the pre-shared key of a captured handshake.
    ///
    /// Example: ikecrack crack -m llldd handshake.txt
    Crack {
        /// Password mask, one symbol per character:
        /// a=alphanumeric, d=digit, l=lowercase, u=uppercase.
        #[arg(short, long)]
        mask: String,

        /// File containing the handshake (Ni*Nr*g_x*g_y*Ci*Cr*SAi*IDr*HASH_R, in hex).
        #[arg(value_name = "HANDSHAKE")]
        handshake: PathBuf,

        /// Number of worker threads (default: CPU count).
        #[arg(short, long)]
        threads: Option<usize>,

        /// Candidates tested by a worker between two cancellation checks
        /// (default: 1% of its range, at most 10000).
        #[arg(short, long)]
        batch_size: Option<u64>,
    },

    /// Generate a crackable handshake for a known password.
    ///
    /// Example: ikecrack generate -m md5 -p secret -f traffic.txt -o handshake.txt
    Generate {
        /// Hash algorithm of the exchange.
        #[arg(short, long, value_enum)]
        mode: AlgorithmArg,

        /// Pre-shared key to sign the exchange with.
        #[arg(short, long)]
        password: String,

        /// Traffic file with one `name: hex` line per field (Ni, Nr, g_x, g_y, Ci, Cr, SAi, IDr).
        #[arg(short, long)]
        file: PathBuf,

        /// Write the handshake to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// All the hash algorithms supported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Md5,
    Sha1,
}

impl From<AlgorithmArg> for HashAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Md5 => HashAlgorithm::Md5,
            AlgorithmArg::Sha1 => HashAlgorithm::Sha1,
        }
    }
}
