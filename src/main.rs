//! `txengine`: command-line front end for the custom transaction engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   txengine <command>
//!        │
//!        ├─ encode / decode ──────────▶ transaction::codec (offline)
//!        │
//!        ├─ send / prove / verify ───▶ TransactionManager
//!        │                                 ├─ NonceSequencer
//!        │                                 ├─ ConnectionPool ──▶ node (JSON-RPC)
//!        │                                 ├─ proof / block / receipt caches
//!        │                                 └─ MerkleTree
//!        │
//!        └─ batch ───────────────────▶ BatchProcessor ──▶ TransactionManager
//! ```
//!
//! The signing key is read from `TXENGINE_PRIVATE_KEY`.

use alloy::hex;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use custom_tx_engine::batch::{BatchError, BatchProcessor, BatchRequest};
use custom_tx_engine::blockchain::{AlloyConnector, AlloyLedger, Wallet};
use custom_tx_engine::config::{load_config, EngineConfig};
use custom_tx_engine::lifecycle::signals;
use custom_tx_engine::observability::{logging, metrics};
use custom_tx_engine::transaction::{codec, Proof, SendRequest, TransactionManager};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "txengine")]
#[command(about = "Send custom-payload transactions and prove their inclusion", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the RPC endpoint from the configuration.
    #[arg(long)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Frame a payload into calldata (offline)
    Encode {
        /// Payload as text, or hex with a 0x prefix
        #[arg(long)]
        payload: String,
        /// Standard calldata carried after the payload (hex)
        #[arg(long)]
        data: Option<String>,
    },
    /// Split framed calldata into payload and standard data (offline)
    Decode {
        /// Calldata as hex
        calldata: String,
    },
    /// Send one custom transaction
    Send {
        #[arg(long)]
        to: Address,
        /// Payload as text, or hex with a 0x prefix
        #[arg(long)]
        payload: String,
        /// Value in wei
        #[arg(long)]
        value: Option<U256>,
        /// Standard calldata carried after the payload (hex)
        #[arg(long)]
        data: Option<String>,
        /// Wait for inclusion, then generate and verify a proof
        #[arg(long)]
        prove: bool,
        /// Write the proof as JSON to this file (implies --prove)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate an inclusion proof for a mined transaction
    Prove {
        tx_hash: TxHash,
        /// Write the proof as JSON to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Verify a proof previously written as JSON
    Verify {
        proof: PathBuf,
    },
    /// Send many transactions through the batch pipeline
    Batch {
        #[arg(long)]
        to: Address,
        /// Number of transactions to submit
        #[arg(long, default_value_t = 50)]
        count: usize,
        /// Payload prefix; each request appends its sequence number
        #[arg(long, default_value = "Batch transaction #")]
        prefix: String,
        /// How long to wait for results, in seconds
        #[arg(long, default_value_t = 120)]
        wait_secs: u64,
        /// Prove and verify the first successful transaction
        #[arg(long)]
        prove_sample: bool,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(url) = cli.rpc_url {
        config.rpc.url = url;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("txengine v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Encode { payload, data } => {
            let data = parse_hex_opt(data.as_deref())?;
            let encoded = codec::encode(&data, &parse_payload(&payload)?)?;
            println!("{encoded}");
        }
        Commands::Decode { calldata } => {
            let raw = hex::decode(calldata.trim())?;
            let decoded = codec::decode(&raw)?;
            let report = serde_json::json!({
                "custom": decoded.payload.is_some(),
                "payload_hex": decoded.payload.map(hex::encode_prefixed),
                "payload_text": decoded.payload.map(String::from_utf8_lossy),
                "standard_hex": hex::encode_prefixed(decoded.standard),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Send {
            to,
            payload,
            value,
            data,
            prove,
            out,
        } => {
            let manager = connect(&config).await?;
            let mut request = SendRequest::new(to, parse_payload(&payload)?)
                .with_data(parse_hex_opt(data.as_deref())?);
            request.value = value;

            let prove = prove || out.is_some();
            let result =
                send_and_report(&manager, &config, &request, prove, out.as_deref()).await;
            print_manager_stats(&manager)?;
            manager.close();
            result?;
        }
        Commands::Prove { tx_hash, out } => {
            let manager = connect(&config).await?;
            let result = manager.generate_proof(tx_hash, config.rpc.timeout()).await;
            manager.close();
            let proof = result?;
            write_proof(&proof, out.as_deref())?;
        }
        Commands::Verify { proof } => {
            let proof = Proof::from_json(&std::fs::read_to_string(&proof)?)?;
            let manager = connect(&config).await?;
            let result = manager.verify_proof(&proof, config.rpc.timeout()).await;
            manager.close();
            result?;
            println!(
                "Proof is VALID: {} is transaction {} of block {} ({})",
                proof.transaction_hash(),
                proof.transaction_index,
                proof.block_number,
                proof.block_hash
            );
        }
        Commands::Batch {
            to,
            count,
            prefix,
            wait_secs,
            prove_sample,
        } => {
            let manager = Arc::new(connect(&config).await?);
            let wait = Duration::from_secs(wait_secs);
            run_batch(manager, &config, to, count, &prefix, wait, prove_sample).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn connect(config: &EngineConfig) -> CliResult<TransactionManager<AlloyLedger>> {
    let wallet = Wallet::from_env()?;
    let connector = AlloyConnector::new(config.rpc.timeout());
    let manager = TransactionManager::connect(&connector, config, wallet).await?;
    println!("Connected to chain {} as {}", manager.chain_id(), manager.address());
    Ok(manager)
}

async fn send_and_report(
    manager: &TransactionManager<AlloyLedger>,
    config: &EngineConfig,
    request: &SendRequest,
    prove: bool,
    out: Option<&Path>,
) -> CliResult<()> {
    let tx = manager.send(request, config.rpc.timeout()).await?;
    println!("Transaction sent: {} (nonce {})", tx.hash(), tx.nonce());

    if prove {
        prove_and_verify(manager, config, tx.hash(), out).await?;
    }
    Ok(())
}

async fn prove_and_verify(
    manager: &TransactionManager<AlloyLedger>,
    config: &EngineConfig,
    tx_hash: TxHash,
    out: Option<&Path>,
) -> CliResult<()> {
    println!("Waiting for {tx_hash} to be mined...");
    manager
        .wait_for_receipt(tx_hash, config.batch.request_timeout(), RECEIPT_POLL_INTERVAL)
        .await?;

    let proof = manager.generate_proof(tx_hash, config.rpc.timeout()).await?;
    println!(
        "Proof generated: block {} index {} path length {}",
        proof.block_number,
        proof.transaction_index,
        proof.proof_path.len()
    );

    manager.verify_proof(&proof, config.rpc.timeout()).await?;
    println!("Proof is VALID");

    write_proof(&proof, out)
}

async fn run_batch(
    manager: Arc<TransactionManager<AlloyLedger>>,
    config: &EngineConfig,
    to: Address,
    count: usize,
    prefix: &str,
    wait: Duration,
    prove_sample: bool,
) -> CliResult<()> {
    let processor = BatchProcessor::new(manager.clone(), &config.batch);
    let started = Instant::now();

    let mut accepted = 0usize;
    for i in 0..count {
        let request = BatchRequest::new(to, format!("{prefix}{i}").into_bytes());
        match processor.submit(request) {
            Ok(_) => accepted += 1,
            Err(e @ BatchError::QueueFull { .. }) => {
                tracing::warn!(index = i, error = %e, "Submission rejected")
            }
            Err(e) => return Err(e.into()),
        }
    }
    println!("Submitted {accepted} of {count} transactions");

    let mut results = tokio::select! {
        results = processor.collect_results(accepted, wait) => results,
        _ = signals::interrupt() => {
            println!("Interrupted; draining accepted requests");
            Vec::new()
        }
    };
    processor.close().await;
    while results.len() < accepted {
        match processor.next_result().await {
            Some(result) => results.push(result),
            None => break,
        }
    }

    let elapsed = started.elapsed();
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    println!(
        "Completed {} results, {} succeeded in {:.2?} ({:.2} tx/s)",
        results.len(),
        succeeded,
        elapsed,
        succeeded as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    for failed in results.iter().filter(|r| !r.is_success()) {
        if let Err(e) = &failed.outcome {
            println!("  {} failed: {}", failed.request.id, e);
        }
    }

    println!("Batch metrics:\n{}", serde_json::to_string_pretty(&processor.metrics())?);

    if prove_sample {
        match results.iter().find_map(|r| r.tx_hash()) {
            Some(tx_hash) => prove_and_verify(&manager, config, tx_hash, None).await?,
            None => println!("No successful transaction to prove"),
        }
    }

    print_manager_stats(&manager)?;
    manager.close();
    Ok(())
}

fn print_manager_stats(manager: &TransactionManager<AlloyLedger>) -> CliResult<()> {
    println!("Manager metrics:\n{}", serde_json::to_string_pretty(&manager.metrics())?);
    Ok(())
}

fn write_proof(proof: &Proof, out: Option<&Path>) -> CliResult<()> {
    let json = proof.to_json()?;
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Proof written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Text, or raw bytes when given as `0x`-prefixed hex.
fn parse_payload(input: &str) -> CliResult<Bytes> {
    if input.starts_with("0x") {
        Ok(hex::decode(input)?.into())
    } else {
        Ok(Bytes::copy_from_slice(input.as_bytes()))
    }
}

fn parse_hex_opt(input: Option<&str>) -> CliResult<Bytes> {
    match input {
        Some(s) if !s.is_empty() => Ok(hex::decode(s)?.into()),
        _ => Ok(Bytes::new()),
    }
}
