//! Create two accounts, move money between them and read everything back.
//!
//! Without an address the example serves itself from an in-memory ledger.
//!
//! # Running
//!
//! ```bash
//! cargo run --example round_trip
//! cargo run --example round_trip -- 127.0.0.1:3001
//! ```

use tb_bridge::testing::FakeServer;
use tb_bridge::{Account, Client, Transfer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tb_bridge=debug".into()),
        )
        .init();

    // Keep the server alive for the whole run.
    let mut _server = None;
    let address = match std::env::args().nth(1) {
        Some(address) => address,
        None => {
            let server = FakeServer::builder().start().await;
            let address = server.address();
            _server = Some(server);
            address
        }
    };

    println!("Connecting to {}...", address);
    let client = Client::connect(0u128, &address).await?;
    println!("Batch size: {} bytes", client.batch_size());

    let debit = Account {
        id: tb_bridge::id(),
        ledger: 1,
        code: 100,
        ..Default::default()
    };
    let credit = Account {
        id: tb_bridge::id(),
        ledger: 1,
        code: 100,
        ..Default::default()
    };

    let results = client.create_accounts(&[debit, credit]).await?;
    if results.is_empty() {
        println!("Accounts created");
    } else {
        for result in &results {
            println!("Account {} failed with code {}", result.index, result.result);
        }
    }

    let transfer = Transfer {
        id: tb_bridge::id(),
        debit_account_id: debit.id,
        credit_account_id: credit.id,
        amount: 250,
        ledger: 1,
        code: 1,
        ..Default::default()
    };
    let results = client.create_transfers(&[transfer]).await?;
    println!("Transfer results: {:?}", results);

    for account in client.lookup_accounts(&[debit.id, credit.id]).await? {
        println!(
            "{}: debits_posted={} credits_posted={}",
            account.id, account.debits_posted, account.credits_posted
        );
    }

    client.close().await;
    Ok(())
}
