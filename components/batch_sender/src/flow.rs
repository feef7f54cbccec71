use std::io::{BufRead, Write};

use common::{error::BatchError, types::Recipient};
use config::Config;
use ethers::{
    signers::{LocalWallet, Signer},
    types::U256,
};
use log::{info, warn};
use transaction_sender::{ChainClient, DispatchReport, DispatchSettings, Dispatcher};

use crate::{
    prompt::{confirm, prompt_amount},
    summary::{print_report, BatchSummary},
};

/// Amount prompt, summary, precheck and confirmation, then the dispatch loop.
/// Nothing is submitted unless every step before the loop succeeds.
pub async fn run_batch<C, R, W>(
    config: &Config,
    client: &C,
    wallet: &LocalWallet,
    recipients: &[Recipient],
    input: &mut R,
    out: &mut W,
) -> Result<DispatchReport, BatchError>
where
    C: ChainClient,
    R: BufRead,
    W: Write,
{
    let per_recipient = prompt_amount(input, out, &config.currency_symbol)?;

    let balance = client
        .balance(wallet.address())
        .await
        .map_err(|e| BatchError::config(format!("could not fetch wallet balance: {}", e)))?;

    let gas_limit = U256::from(config.gas_limit);
    let mut summary =
        BatchSummary::new(per_recipient, recipients.len(), balance, &config.currency_symbol);
    match client.gas_price().await {
        Ok(gas_price) => summary = summary.with_fee_estimate(gas_limit, gas_price),
        Err(e) => warn!("skipping fee estimate: {}", e),
    }

    summary.print(out)?;
    summary.ensure_affordable()?;

    confirm(input, out)?;
    info!("operator confirmed {} transfers", recipients.len());

    let settings = DispatchSettings {
        gas_limit,
        delay: config.dispatch_delay,
        currency_symbol: config.currency_symbol.clone(),
    };
    let report = Dispatcher::new(client, wallet, settings)
        .run(recipients, per_recipient, out)
        .await?;

    print_report(&report, out)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{
        io::Cursor,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use ethers::{
        types::{Address, Bytes, TransactionReceipt, TxHash, H256, U64},
        utils::parse_ether,
    };

    use super::*;

    struct FundedChain {
        balance: U256,
        reject_submission: Option<usize>,
        submissions: AtomicUsize,
    }

    impl FundedChain {
        fn with_balance(ether: &str) -> Self {
            Self {
                balance: parse_ether(ether).unwrap(),
                reject_submission: None,
                submissions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainClient for FundedChain {
        async fn block_number(&self) -> anyhow::Result<U64> {
            Ok(U64::from(1))
        }

        async fn balance(&self, _address: Address) -> anyhow::Result<U256> {
            Ok(self.balance)
        }

        async fn transaction_count(&self, _address: Address) -> anyhow::Result<U256> {
            Ok(U256::zero())
        }

        async fn gas_price(&self) -> anyhow::Result<U256> {
            Ok(U256::from(1_000_000_000_u64))
        }

        async fn chain_id(&self) -> anyhow::Result<u64> {
            Ok(1)
        }

        async fn send_raw_transaction(&self, _raw: Bytes) -> anyhow::Result<TxHash> {
            let attempt = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
            if self.reject_submission == Some(attempt) {
                return Err(anyhow::anyhow!("insufficient funds for gas * price + value"));
            }
            Ok(H256::from_low_u64_be(attempt as u64))
        }

        async fn wait_for_receipt(&self, tx_hash: TxHash) -> anyhow::Result<TransactionReceipt> {
            Ok(TransactionReceipt {
                transaction_hash: tx_hash,
                block_number: Some(U64::from(42)),
                status: Some(U64::from(1)),
                ..Default::default()
            })
        }
    }

    fn config() -> Config {
        Config {
            http_rpc_url: "http://localhost:8545".to_string(),
            sender_private_key: String::new(),
            recipients_file: PathBuf::from("receivers.txt"),
            dispatch_delay: Duration::ZERO,
            receipt_timeout: Duration::from_secs(1),
            gas_limit: 21_000,
            currency_symbol: "ETH".to_string(),
        }
    }

    fn wallet() -> LocalWallet {
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
            .parse()
            .unwrap()
    }

    fn recipients(count: u64) -> Vec<Recipient> {
        (1..=count)
            .map(|i| Recipient::from(Address::from_low_u64_be(i)))
            .collect()
    }

    #[tokio::test]
    async fn insufficient_balance_stops_before_confirmation() {
        let chain = FundedChain::with_balance("0.9");
        let mut input = Cursor::new("0.5\nYES\n");
        let mut out = Vec::new();

        let err = run_batch(&config(), &chain, &wallet(), &recipients(2), &mut input, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::InsufficientFunds { .. }));
        assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("SUMMARY"));
        assert!(!printed.contains("Type YES"));
    }

    #[tokio::test]
    async fn lowercase_confirmation_cancels() {
        let chain = FundedChain::with_balance("5");
        let mut input = Cursor::new("0.5\nyes\n");

        let err = run_batch(
            &config(),
            &chain,
            &wallet(),
            &recipients(2),
            &mut input,
            &mut Vec::<u8>::new(),
        )
        .await
        .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn confirmed_batch_sends_everyone() {
        let chain = FundedChain::with_balance("5");
        let mut input = Cursor::new("zero\n1.5\nYES\n");
        let mut out = Vec::new();

        let report = run_batch(&config(), &chain, &wallet(), &recipients(3), &mut input, &mut out)
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(chain.submissions.load(Ordering::SeqCst), 3);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Please enter a valid positive number"));
        assert!(printed.contains("Total send  : 4.5 ETH"));
        assert!(printed.contains("Sent        : 3/3"));
    }

    #[tokio::test]
    async fn mid_batch_rejection_reports_remaining() {
        let chain = FundedChain {
            reject_submission: Some(2),
            ..FundedChain::with_balance("5")
        };
        let mut input = Cursor::new("1\nYES\n");
        let mut out = Vec::new();

        let report = run_batch(&config(), &chain, &wallet(), &recipients(3), &mut input, &mut out)
            .await
            .unwrap();

        assert_eq!(report.sent_count(), 1);
        assert_eq!(report.remaining(), 2);
        assert_eq!(report.next_nonce, U256::from(1));
        assert_eq!(chain.submissions.load(Ordering::SeqCst), 2);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Sent        : 1/3"));
        assert!(printed.contains("Remaining   : 2"));
        assert!(report.into_result().is_err());
    }
}
