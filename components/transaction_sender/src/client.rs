use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, PendingTransaction, Provider},
    types::{Address, Bytes, TransactionReceipt, TxHash, U256, U64},
};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The node calls a batch run needs. Passed explicitly so the dispatch loop
/// can run against an in-memory chain in tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> anyhow::Result<U64>;

    async fn balance(&self, address: Address) -> anyhow::Result<U256>;

    async fn transaction_count(&self, address: Address) -> anyhow::Result<U256>;

    async fn gas_price(&self) -> anyhow::Result<U256>;

    async fn chain_id(&self) -> anyhow::Result<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> anyhow::Result<TxHash>;

    /// Blocks until the transaction is included in a block.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> anyhow::Result<TransactionReceipt>;
}

pub struct EthersChainClient {
    provider: Provider<Http>,
    receipt_timeout: Duration,
}

impl EthersChainClient {
    pub fn new(http_rpc_url: &str, receipt_timeout: Duration) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(http_rpc_url)?.interval(RECEIPT_POLL_INTERVAL);

        Ok(Self {
            provider,
            receipt_timeout,
        })
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn block_number(&self) -> anyhow::Result<U64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn balance(&self, address: Address) -> anyhow::Result<U256> {
        Ok(self.provider.get_balance(address, None).await?)
    }

    async fn transaction_count(&self, address: Address) -> anyhow::Result<U256> {
        Ok(self.provider.get_transaction_count(address, None).await?)
    }

    async fn gas_price(&self) -> anyhow::Result<U256> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        let chain_id = self.provider.get_chainid().await?;
        u64::try_from(chain_id).map_err(|_| anyhow!("chain id {} does not fit in u64", chain_id))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> anyhow::Result<TxHash> {
        let pending = self.provider.send_raw_transaction(raw).await?;

        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> anyhow::Result<TransactionReceipt> {
        let pending =
            PendingTransaction::new(tx_hash, &self.provider).interval(RECEIPT_POLL_INTERVAL);

        match tokio::time::timeout(self.receipt_timeout, pending).await {
            Ok(Ok(Some(receipt))) => Ok(receipt),
            Ok(Ok(None)) => Err(anyhow!(
                "transaction {:?} was dropped before inclusion",
                tx_hash
            )),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow!(
                "no receipt for {:?} after {}s",
                tx_hash,
                self.receipt_timeout.as_secs()
            )),
        }
    }
}
