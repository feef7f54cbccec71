mod client;
mod dispatch;

pub use client::{ChainClient, EthersChainClient};
pub use dispatch::{
    DispatchFailure, DispatchReport, DispatchSettings, Dispatcher, FailureStage, SentTransfer,
    TransactionIntent,
};
