use ethers::types::U256;
use thiserror::Error;

/// Everything that can stop (or be recovered from during) a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("insufficient balance: batch needs {required} wei, wallet holds {balance} wei")]
    InsufficientFunds { required: U256, balance: U256 },

    #[error("transaction {index} to {recipient} failed: {reason}")]
    Dispatch {
        index: usize,
        recipient: String,
        reason: String,
    },

    #[error("cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BatchError {
    pub fn config(message: impl Into<String>) -> Self {
        BatchError::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BatchError::Validation(message.into())
    }

    /// Cancellation is the only outcome that ends the process cleanly.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, BatchError::Cancelled)
    }
}
