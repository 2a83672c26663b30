//! Test data generator for a ledger cluster.
//!
//! Generates random accounts and transfers for testing and benchmarking.
//!
//! # Usage
//!
//! ```bash
//! # Generate 100 accounts and 1000 transfers
//! tb-gen --accounts 100 --transfers 1000 --address 127.0.0.1:3001
//!
//! # Go through tb-proxy instead of the binary protocol
//! tb-gen --accounts 50 --transport http --address 127.0.0.1:8080
//!
//! # Use custom ledger and batch size
//! tb-gen --accounts 100 --transfers 500 --ledger 1 --batch-size 1000
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;

use clap::Parser;
use rand::Rng;
use tb_bridge::{
    Account, AccountFlags, Client, CreateResult, Identifier, Record, Transfer, TransferFlags,
    TransportKind,
};

/// Test data generator for a ledger cluster
#[derive(Parser, Debug)]
#[command(name = "tb-gen")]
#[command(about = "Generate test data for a ledger cluster")]
struct Args {
    /// Ledger (or tb-proxy) address
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    address: String,

    /// Cluster ID (hex)
    #[arg(short, long, default_value = "0")]
    cluster: Identifier,

    /// Transport (stream or http)
    #[arg(short, long, default_value = "stream")]
    transport: TransportKind,

    /// Number of accounts to create
    #[arg(long, default_value_t = 100)]
    accounts: u32,

    /// Number of transfers to create
    #[arg(long, default_value_t = 0)]
    transfers: u32,

    /// Ledger ID for all accounts and transfers
    #[arg(short, long, default_value_t = 1)]
    ledger: u32,

    /// Account and transfer code
    #[arg(long, default_value_t = 1)]
    code: u16,

    /// Records per call (capped by what fits in one batch)
    #[arg(short, long, default_value_t = 8190)]
    batch_size: u32,

    /// Maximum transfer amount
    #[arg(long, default_value_t = 10000)]
    max_amount: u128,

    /// Dry run - generate data but don't send to the ledger
    #[arg(long)]
    dry_run: bool,
}

/// Generate random accounts.
fn generate_accounts(count: u32, ledger: u32, code: u16) -> Vec<Account> {
    (0..count)
        .map(|_| Account {
            id: tb_bridge::id(),
            ledger,
            code,
            flags: AccountFlags::empty(),
            ..Default::default()
        })
        .collect()
}

/// Generate random transfers between distinct accounts.
fn generate_transfers(
    count: u32,
    account_ids: &[Identifier],
    ledger: u32,
    code: u16,
    max_amount: u128,
) -> Result<Vec<Transfer>, String> {
    if account_ids.len() < 2 {
        return Err("need at least 2 accounts for transfers".into());
    }
    if max_amount == 0 {
        return Err("max amount must be at least 1".into());
    }

    let mut rng = rand::rng();
    let transfers = (0..count)
        .map(|_| {
            let debit = rng.random_range(0..account_ids.len());
            // Shift past the debit index so the two never coincide.
            let mut credit = rng.random_range(0..account_ids.len() - 1);
            if credit >= debit {
                credit += 1;
            }

            Transfer {
                id: tb_bridge::id(),
                debit_account_id: account_ids[debit],
                credit_account_id: account_ids[credit],
                amount: rng.random_range(1..=max_amount),
                ledger,
                code,
                flags: TransferFlags::empty(),
                ..Default::default()
            }
        })
        .collect();
    Ok(transfers)
}

/// Outcome of one kind of create run.
#[derive(Debug, Default)]
struct Summary {
    created: usize,
    failed: usize,
    by_code: BTreeMap<u32, usize>,
}

impl Summary {
    fn record(&mut self, submitted: usize, results: &[CreateResult]) {
        self.failed += results.len();
        self.created += submitted - results.len();
        for result in results {
            *self.by_code.entry(result.result).or_default() += 1;
        }
    }

    fn print(&self, kind: &str) {
        println!("{}: {} created, {} failed", kind, self.created, self.failed);
        for (code, count) in &self.by_code {
            println!("  result {}: {}", code, count);
        }
    }
}

/// Send `records` in chunks of `chunk` and summarize the results.
async fn create_all<R, F, Fut>(
    kind: &str,
    records: &[R],
    chunk: usize,
    mut create: F,
) -> tb_bridge::Result<Summary>
where
    R: Record,
    F: FnMut(Vec<R>) -> Fut,
    Fut: std::future::Future<Output = tb_bridge::Result<Vec<CreateResult>>>,
{
    let started = Instant::now();
    let mut summary = Summary::default();
    for part in records.chunks(chunk) {
        let results = create(part.to_vec()).await?;
        for result in &results {
            tracing::debug!(index = result.index, result = result.result, "{} failed", kind);
        }
        summary.record(part.len(), &results);

        print!(
            "\r  Progress: {}/{} {}",
            summary.created + summary.failed,
            records.len(),
            kind
        );
        let _ = std::io::stdout().flush();
    }
    println!();

    let elapsed = started.elapsed();
    tracing::info!(
        kind,
        records = records.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        per_sec = (records.len() as f64 / elapsed.as_secs_f64().max(1e-9)) as u64,
        "finished"
    );
    Ok(summary)
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    println!("Ledger Test Data Generator");
    println!("==========================");
    println!("Address: {} ({})", args.address, args.transport);
    println!("Cluster: {}", args.cluster);
    println!("Accounts: {}", args.accounts);
    println!("Transfers: {}", args.transfers);
    println!("Ledger: {}", args.ledger);
    println!("Batch size: {}", args.batch_size);
    println!();

    if args.accounts == 0 {
        println!("No accounts to create. Exiting.");
        return Ok(());
    }

    println!("Generating {} accounts...", args.accounts);
    let accounts = generate_accounts(args.accounts, args.ledger, args.code);
    let account_ids: Vec<Identifier> = accounts.iter().map(|a| a.id).collect();

    let transfers = if args.transfers > 0 {
        println!("Generating {} transfers...", args.transfers);
        generate_transfers(
            args.transfers,
            &account_ids,
            args.ledger,
            args.code,
            args.max_amount,
        )?
    } else {
        Vec::new()
    };

    if args.dry_run {
        println!();
        println!("Dry run mode - not sending to the ledger");
        println!("Sample account: {}", accounts[0].id);
        if let Some(transfer) = transfers.first() {
            println!("Sample transfer: {} ({} units)", transfer.id, transfer.amount);
        }
        return Ok(());
    }

    println!();
    println!("Connecting to {}...", args.address);
    let client = Client::builder()
        .cluster(args.cluster)
        .addresses(&args.address)?
        .transport(args.transport)
        .build()
        .await?;

    let chunk = (args.batch_size as usize)
        .min(client.max_batch_count::<Account>())
        .max(1);
    println!(
        "Using batch size: {} (max: {})",
        chunk,
        client.max_batch_count::<Account>()
    );

    println!();
    println!("Creating accounts...");
    let summary = create_all("accounts", &accounts, chunk, |part| {
        let client = &client;
        async move { client.create_accounts(&part).await }
    })
    .await?;
    summary.print("Accounts");

    if !transfers.is_empty() {
        println!();
        println!("Creating transfers...");
        let summary = create_all("transfers", &transfers, chunk, |part| {
            let client = &client;
            async move { client.create_transfers(&part).await }
        })
        .await?;
        summary.print("Transfers");
    }

    client.close().await;

    println!();
    println!("Done!");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    run(Args::parse()).await
}
