use std::{fmt::Display, io::Write, time::Duration};

use common::{error::BatchError, types::Recipient, utils::format_amount};
use ethers::{
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Bytes, TransactionRequest, TxHash, U256, U64,
    },
};
use log::{debug, info, warn};

use crate::client::ChainClient;

#[derive(Clone, Debug)]
pub struct DispatchSettings {
    pub gas_limit: U256,
    /// Pause after each confirmed transfer that is followed by another.
    pub delay: Duration,
    pub currency_symbol: String,
}

/// Everything needed to sign one transfer. Built right before signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionIntent {
    pub recipient: Recipient,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub nonce: U256,
    pub chain_id: u64,
}

impl TransactionIntent {
    pub fn to_typed_transaction(&self) -> TypedTransaction {
        TransactionRequest::new()
            .to(self.recipient.address())
            .value(self.value)
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
            .nonce(self.nonce)
            .chain_id(self.chain_id)
            .into()
    }

    /// Signs as a legacy EIP-155 transaction and returns the raw RLP bytes.
    pub fn sign(&self, wallet: &LocalWallet) -> anyhow::Result<Bytes> {
        let tx = self.to_typed_transaction();
        let signature = wallet.sign_transaction_sync(&tx)?;

        Ok(tx.rlp_signed(&signature))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DispatchPhase {
    Ready,
    Sending(usize),
    Confirmed(usize),
    Done,
    Halted(usize),
}

impl Display for DispatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchPhase::Ready => write!(f, "ready"),
            DispatchPhase::Sending(index) => write!(f, "sending #{}", index),
            DispatchPhase::Confirmed(index) => write!(f, "confirmed #{}", index),
            DispatchPhase::Done => write!(f, "done"),
            DispatchPhase::Halted(index) => write!(f, "halted at #{}", index),
        }
    }
}

/// Owned by a single `Dispatcher::run`; sent and remaining counts live in the
/// report.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DispatchState {
    nonce: U256,
    phase: DispatchPhase,
}

impl DispatchState {
    fn ready(nonce: U256) -> Self {
        Self {
            nonce,
            phase: DispatchPhase::Ready,
        }
    }

    fn transition(&mut self, phase: DispatchPhase) {
        debug!("dispatch {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// The node holds the nonce once it accepts the transaction, receipt or not.
    fn submitted(&mut self, nonce: U256) {
        self.nonce = nonce + U256::one();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Build,
    Sign,
    Submit,
    Confirm,
}

impl Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Build => write!(f, "build"),
            FailureStage::Sign => write!(f, "sign"),
            FailureStage::Submit => write!(f, "submit"),
            FailureStage::Confirm => write!(f, "confirm"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransfer {
    pub index: usize,
    pub recipient: Recipient,
    pub nonce: U256,
    pub tx_hash: TxHash,
    pub block_number: Option<U64>,
    pub reverted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchFailure {
    /// 1-based position of the recipient the loop halted on.
    pub index: usize,
    pub recipient: Recipient,
    pub stage: FailureStage,
    pub reason: String,
    /// Set when the node accepted the transaction but no receipt arrived.
    pub tx_hash: Option<TxHash>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    pub total: usize,
    pub sent: Vec<SentTransfer>,
    pub failure: Option<DispatchFailure>,
    pub next_nonce: U256,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    pub fn remaining(&self) -> usize {
        self.total - self.sent.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.remaining() == 0
    }

    /// Turns a halted run into the error the process exits with.
    pub fn into_result(self) -> Result<DispatchReport, BatchError> {
        match self.failure {
            Some(failure) => Err(BatchError::Dispatch {
                index: failure.index,
                recipient: failure.recipient.to_string(),
                reason: format!("{} failed: {}", failure.stage, failure.reason),
            }),
            None => Ok(self),
        }
    }
}

struct Submitted {
    tx_hash: TxHash,
    nonce: U256,
}

/// Sends one transfer per recipient, strictly in order, and stops at the
/// first failure.
pub struct Dispatcher<'a, C: ChainClient> {
    client: &'a C,
    wallet: &'a LocalWallet,
    settings: DispatchSettings,
}

impl<'a, C: ChainClient> Dispatcher<'a, C> {
    pub fn new(client: &'a C, wallet: &'a LocalWallet, settings: DispatchSettings) -> Self {
        Self {
            client,
            wallet,
            settings,
        }
    }

    pub async fn run<W: Write>(
        &self,
        recipients: &[Recipient],
        value: U256,
        out: &mut W,
    ) -> Result<DispatchReport, BatchError> {
        let sender = self.wallet.address();
        let start_nonce = self.client.transaction_count(sender).await.map_err(|e| {
            BatchError::config(format!("could not fetch nonce for {:?}: {}", sender, e))
        })?;

        let total = recipients.len();
        let amount = format_amount(value, &self.settings.currency_symbol);
        let mut state = DispatchState::ready(start_nonce);
        let mut sent = Vec::with_capacity(total);
        let mut failure = None;

        info!("dispatching {} transfers from {:?}, starting nonce {}", total, sender, start_nonce);

        for (position, recipient) in recipients.iter().enumerate() {
            let index = position + 1;
            state.transition(DispatchPhase::Sending(index));

            let submitted = match self.submit(*recipient, value, state.nonce).await {
                Ok(submitted) => submitted,
                Err((stage, reason)) => {
                    failure = Some(DispatchFailure {
                        index,
                        recipient: *recipient,
                        stage,
                        reason,
                        tx_hash: None,
                    });
                    break;
                }
            };

            state.submitted(submitted.nonce);

            writeln!(out, "\n✅ [{}/{}] Sent {} → {}", index, total, amount, recipient)?;
            writeln!(out, "   TX: {:?}", submitted.tx_hash)?;

            let receipt = match self.client.wait_for_receipt(submitted.tx_hash).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    failure = Some(DispatchFailure {
                        index,
                        recipient: *recipient,
                        stage: FailureStage::Confirm,
                        reason: e.to_string(),
                        tx_hash: Some(submitted.tx_hash),
                    });
                    break;
                }
            };

            let reverted = receipt.status == Some(U64::zero());
            match receipt.block_number {
                Some(block) => writeln!(out, "   Mined in block {}", block)?,
                None => writeln!(out, "   Mined (block number not reported)")?,
            }
            if reverted {
                warn!("transaction {:?} to {} reverted", submitted.tx_hash, recipient);
                writeln!(out, "   ⚠️ Transaction reverted on chain")?;
            }

            sent.push(SentTransfer {
                index,
                recipient: *recipient,
                nonce: submitted.nonce,
                tx_hash: submitted.tx_hash,
                block_number: receipt.block_number,
                reverted,
            });
            state.transition(DispatchPhase::Confirmed(index));

            if index < total && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        match &failure {
            Some(failure) => {
                state.transition(DispatchPhase::Halted(failure.index));
                writeln!(out, "\n❌ Failed sending to {}", failure.recipient)?;
                writeln!(out, "   Reason: {}", failure.reason)?;
                if let Some(tx_hash) = failure.tx_hash {
                    writeln!(out, "   Submitted as {:?}, check it before re-running", tx_hash)?;
                }
                writeln!(out, "❌ Stopping further transactions to prevent nonce issues")?;
            }
            None => state.transition(DispatchPhase::Done),
        }

        Ok(DispatchReport {
            total,
            sent,
            failure,
            next_nonce: state.nonce,
        })
    }

    async fn submit(
        &self,
        recipient: Recipient,
        value: U256,
        nonce: U256,
    ) -> Result<Submitted, (FailureStage, String)> {
        let intent = self
            .intent(recipient, value, nonce)
            .await
            .map_err(|e| (FailureStage::Build, e.to_string()))?;

        let raw = intent
            .sign(self.wallet)
            .map_err(|e| (FailureStage::Sign, e.to_string()))?;

        let tx_hash = self
            .client
            .send_raw_transaction(raw)
            .await
            .map_err(|e| (FailureStage::Submit, e.to_string()))?;

        debug!("submitted {:?} with nonce {}", tx_hash, nonce);

        Ok(Submitted { tx_hash, nonce })
    }

    /// Gas price and chain id are read fresh for every transfer.
    async fn intent(
        &self,
        recipient: Recipient,
        value: U256,
        nonce: U256,
    ) -> anyhow::Result<TransactionIntent> {
        let gas_price = self.client.gas_price().await?;
        let chain_id = self.client.chain_id().await?;

        Ok(TransactionIntent {
            recipient,
            value,
            gas_limit: self.settings.gas_limit,
            gas_price,
            nonce,
            chain_id,
        })
    }
}
