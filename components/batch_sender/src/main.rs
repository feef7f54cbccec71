use std::{
    io::{self, Write},
    process::ExitCode,
};

use batch_sender::{flow::run_batch, summary::print_recipients};
use common::error::BatchError;
use config::Config;
use ethers::{
    signers::{LocalWallet, Signer},
    utils::to_checksum,
};
use log::{error, info};
use recipients::load_recipients;
use transaction_sender::{ChainClient, EthersChainClient};

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(BatchError::Cancelled) => {
            println!("❌ Transaction cancelled by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            println!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BatchError> {
    let config = Config::new_from_env()?;
    info!("starting batch sender with {:?}", config);

    let key = config.sender_private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    // the parse error can echo key material, so it is not forwarded
    let wallet = key
        .parse::<LocalWallet>()
        .map_err(|_| BatchError::config("PRIVATE_KEY is not a valid hex private key"))?;

    let client = EthersChainClient::new(&config.http_rpc_url, config.receipt_timeout)
        .map_err(|e| BatchError::config(format!("invalid RPC_URL: {}", e)))?;
    let block = client
        .block_number()
        .await
        .map_err(|e| BatchError::config(format!("failed to connect to RPC: {}", e)))?;
    info!("connected to {}, latest block {}", config.http_rpc_url, block);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "\nUsing wallet: {}", to_checksum(&wallet.address(), None))?;

    let parsed = load_recipients(&config.recipients_file)?;
    print_recipients(&parsed, &mut out)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let report = run_batch(
        &config,
        &client,
        &wallet,
        &parsed.valid,
        &mut input,
        &mut out,
    )
    .await?;

    report.into_result().map(|_| ())
}
