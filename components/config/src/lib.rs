use std::{env, path::PathBuf, str::FromStr, time::Duration};

use common::{
    error::BatchError,
    utils::{DEFAULT_CURRENCY_SYMBOL, TRANSFER_GAS_LIMIT},
};
use dotenv::dotenv;

pub const DEFAULT_RECIPIENTS_FILE: &str = "receivers.txt";
pub const DEFAULT_DISPATCH_DELAY_SECS: u64 = 10;
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct Config {
    pub http_rpc_url: String,
    pub sender_private_key: String,
    pub recipients_file: PathBuf,
    pub dispatch_delay: Duration,
    pub receipt_timeout: Duration,
    pub gas_limit: u64,
    pub currency_symbol: String,
}

// The private key stays out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_rpc_url", &self.http_rpc_url)
            .field("recipients_file", &self.recipients_file)
            .field("dispatch_delay", &self.dispatch_delay)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("gas_limit", &self.gas_limit)
            .field("currency_symbol", &self.currency_symbol)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads `.env` when present, then reads the process environment.
    pub fn new_from_env() -> Result<Config, BatchError> {
        if dotenv().is_err() {
            log::debug!("no .env file loaded, using process environment only");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, BatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| BatchError::config(format!("missing {} in environment", key)))
        };

        let http_rpc_url = required("RPC_URL")?;
        let sender_private_key = required("PRIVATE_KEY")?;

        let recipients_file = lookup("RECIPIENTS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECIPIENTS_FILE));

        let dispatch_delay = Duration::from_secs(parse_or(
            &lookup,
            "DISPATCH_DELAY_SECS",
            DEFAULT_DISPATCH_DELAY_SECS,
        )?);
        let receipt_timeout = Duration::from_secs(parse_or(
            &lookup,
            "RECEIPT_TIMEOUT_SECS",
            DEFAULT_RECEIPT_TIMEOUT_SECS,
        )?);
        let gas_limit = parse_or(&lookup, "GAS_LIMIT", TRANSFER_GAS_LIMIT)?;

        let currency_symbol =
            lookup("CURRENCY_SYMBOL").unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_string());

        Ok(Config {
            http_rpc_url,
            sender_private_key,
            recipients_file,
            dispatch_delay,
            receipt_timeout,
            gas_limit,
            currency_symbol,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, BatchError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BatchError::config(format!("{} is not a valid number: {:?}", key, raw))),
        None => Ok(default),
    }
}
