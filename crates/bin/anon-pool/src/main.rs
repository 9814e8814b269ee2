//! anon-pool CLI
//!
//! Client-side helpers for the pool and a scripted simulator.
//! Results go to stdout as JSON, logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # New deposit note (keep it secret, it is the only way to withdraw)
//! anon-pool note
//!
//! # Derive values from an existing secret / nullifier
//! anon-pool commitment --secret 0x01.. --nullifier 0x02..
//! anon-pool nullifier-hash --nullifier 0x02..
//!
//! # Pool constants and empty-tree root
//! anon-pool info --config pool.json
//!
//! # Replay a script against a fresh in-memory pool
//! anon-pool run --script steps.json --config pool.json
//! ```

mod script;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use anon_pool::{
    generate_commitment, generate_nullifier_hash, Amount, Commitment, DepositNote, HashScheme,
    MemoryBackend, Nullifier, NullifierHash, Pool, PoolConfig, Root, Secret,
};

use crate::script::{Simulator, Step};

#[derive(Parser)]
#[command(name = "anon-pool")]
#[command(about = "Shielded pool client helpers and simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new deposit note
    Note {
        /// Deterministic rng seed (testing only)
        #[arg(long)]
        seed: Option<u64>,

        /// Hash construction (poseidon, blake3)
        #[arg(long, default_value = "poseidon")]
        hash: HashScheme,
    },

    /// Compute H(secret, nullifier)
    Commitment {
        #[arg(long)]
        secret: Secret,

        #[arg(long)]
        nullifier: Nullifier,

        #[arg(long, default_value = "poseidon")]
        hash: HashScheme,
    },

    /// Compute H(nullifier, 0)
    NullifierHash {
        #[arg(long)]
        nullifier: Nullifier,

        #[arg(long, default_value = "poseidon")]
        hash: HashScheme,
    },

    /// Show pool constants
    Info {
        /// Pool config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a script of pool operations against an in-memory chain
    Run {
        /// Script file (JSON array of steps)
        #[arg(short, long)]
        script: PathBuf,

        /// Pool config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for notes generated by the script
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[derive(Serialize)]
struct NoteOutput {
    note: String,
    secret: String,
    nullifier: String,
    commitment: Commitment,
    nullifier_hash: NullifierHash,
    hash: HashScheme,
}

#[derive(Serialize)]
struct InfoOutput {
    pool_address: String,
    tree_depth: u8,
    capacity: u64,
    root_history_size: usize,
    deposit_amount: Amount,
    fee: Amount,
    payout_amount: Amount,
    hash: HashScheme,
    empty_root: Root,
    tokens: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("anon_pool={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Note { seed, hash } => run_note(seed, hash),
        Commands::Commitment {
            secret,
            nullifier,
            hash,
        } => print_json(&generate_commitment(&hash, &secret, &nullifier)),
        Commands::NullifierHash { nullifier, hash } => {
            print_json(&generate_nullifier_hash(&hash, &nullifier))
        }
        Commands::Info { config } => run_info(config),
        Commands::Run {
            script,
            config,
            seed,
        } => run_script(script, config, seed),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<PoolConfig> {
    match path {
        Some(path) => PoolConfig::from_file(&path)
            .with_context(|| format!("loading pool config {}", path.display())),
        None => Ok(PoolConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_note(seed: Option<u64>, hash: HashScheme) -> Result<()> {
    let note = match seed {
        Some(seed) => DepositNote::random(&mut ChaCha20Rng::seed_from_u64(seed)),
        None => DepositNote::random(&mut OsRng),
    };

    print_json(&NoteOutput {
        note: note.to_string(),
        secret: note.secret.as_field().to_string(),
        nullifier: note.nullifier.as_field().to_string(),
        commitment: note.commitment(&hash),
        nullifier_hash: note.nullifier_hash(&hash),
        hash,
    })
}

fn run_info(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let pool = Pool::new(config.clone(), MemoryBackend::new())?;

    print_json(&InfoOutput {
        pool_address: config.pool_address.to_string(),
        tree_depth: config.tree_depth,
        capacity: pool.tree().capacity(),
        root_history_size: config.root_history_size,
        deposit_amount: config.deposit_amount,
        fee: config.fee,
        payout_amount: config.payout_amount(),
        hash: config.hash,
        empty_root: pool.tree().empty_root(),
        tokens: pool.tokens().len(),
    })
}

fn run_script(script_path: PathBuf, config_path: Option<PathBuf>, seed: u64) -> Result<()> {
    let config = load_config(config_path)?;

    let data = std::fs::read_to_string(&script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&data)
        .with_context(|| format!("parsing script {}", script_path.display()))?;
    info!("running {} steps from {}", steps.len(), script_path.display());

    let mut simulator = Simulator::new(config, seed)?;
    for report in simulator.run(&steps) {
        println!("{}", serde_json::to_string(&report)?);
    }

    let summary = simulator.summary();
    info!(
        "done: {} deposits, {} withdrawals, {} leaves",
        summary.stats.deposits_count, summary.stats.withdrawals_count, summary.leaves
    );
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}
