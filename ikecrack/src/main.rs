//! # ikecrack
//!
//! Recovers the pre-shared key of an IKEv1 aggressive mode handshake by
//! testing every password of a mask, and generates test handshakes for known
//! passwords.
//!
//! ## Usage
//!
//! ```sh
//! cargo build --release
//! ./target/release/ikecrack generate -m md5 -p ab12 -f traffic.txt -o handshake.txt
//! ./target/release/ikecrack crack -m lldd handshake.txt --verbose
//! ```
//!
//! ## Exit status
//! - 0: the password was found (or the handshake was generated)
//! - 1: the keyspace was exhausted, or the search was interrupted
//! - 2: invalid input or any other error

mod cli;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{AlgorithmArg, Args, Command};
use ikecrack::{BarProgress, Exchange, Handshake, Keyspace, Outcome, Search, SearchConfig};
use log::{debug, info, warn};

const RULE: &str = "============================================================";

/// Main function:
/// - Parses CLI arguments.
/// - Runs the requested command.
/// - Maps its result to the exit status.
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    debug!("{:?}", args);

    let result = match args.command {
        Command::Crack {
            mask,
            handshake,
            threads,
            batch_size,
        } => crack(mask, handshake, threads, batch_size).await,
        Command::Generate {
            mode,
            password,
            file,
            output,
        } => generate(mode, password, file, output).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Loads the handshake, compiles the mask and searches the keyspace.
/// Ctrl-C stops the workers at their next batch boundary.
async fn crack(
    mask: String,
    path: PathBuf,
    threads: Option<usize>,
    batch_size: Option<u64>,
) -> Result<ExitCode> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read handshake file {:?}", path))?;
    let handshake = Handshake::parse(&content)
        .with_context(|| format!("Failed to parse handshake file {:?}", path))?;
    let keyspace =
        Keyspace::compile(&mask).with_context(|| format!("Invalid mask {:?}", mask))?;

    let mut config = SearchConfig::new().batch_size(batch_size);
    if let Some(threads) = threads {
        config = config.workers(threads);
    }

    println!("Detected hash algorithm: {}", handshake.algorithm());
    println!("Mask: {}", mask);
    println!("Password length: {}", keyspace.len());
    println!("Keyspace: {} candidates", keyspace.total());
    println!("Workers: {}", config.worker_count());
    debug!("Keyspace: {}", keyspace);

    let search = Search::new(config);
    let stop = search.stop_handle();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping the workers");
            stop.cancel();
        }
    });
    let task = tokio::task::spawn_blocking(move || {
        search.run_with_progress(&keyspace, &handshake, &mut BarProgress::new())
    });

    let joined = task.await;
    signal.abort();
    let report = joined.context("Search task failed")??;

    println!("\n{RULE}");
    match &report.outcome {
        Outcome::Found(password) => println!("PASSWORD FOUND: {password}"),
        Outcome::NotFound => println!("PASSWORD NOT FOUND"),
        Outcome::Interrupted => println!("SEARCH INTERRUPTED"),
    }
    println!("{RULE}");
    println!("Total attempts: {}", report.attempts);
    println!("Time elapsed: {:.2} seconds", report.elapsed.as_secs_f64());
    println!("Average speed: {:.0} passwords/second", report.rate());
    info!("Search used {} worker(s)", report.workers);

    Ok(match report.outcome {
        Outcome::Found(_) => ExitCode::SUCCESS,
        Outcome::NotFound | Outcome::Interrupted => ExitCode::from(1),
    })
}

/// Signs the exchange described by a traffic file with a known password.
async fn generate(
    mode: AlgorithmArg,
    password: String,
    file: PathBuf,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let traffic = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read traffic file {:?}", file))?;
    let exchange = Exchange::parse_traffic(&traffic)
        .with_context(|| format!("Failed to parse traffic file {:?}", file))?;

    let handshake = exchange.sign(&password, mode.into());
    info!("Generated {} handshake", handshake.algorithm());
    let line = handshake.to_line();

    match output {
        Some(path) => {
            tokio::fs::write(&path, format!("{line}\n"))
                .await
                .with_context(|| format!("Failed to write handshake file {:?}", path))?;
            println!("Test data saved to: {}", path.display());
        }
        None => println!("{line}"),
    }

    Ok(ExitCode::SUCCESS)
}
