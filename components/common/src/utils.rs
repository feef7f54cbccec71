use ethers::{
    types::U256,
    utils::{format_ether, parse_ether},
};

use crate::error::BatchError;

/// Gas used by a plain value transfer to an externally owned account.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

pub const DEFAULT_CURRENCY_SYMBOL: &str = "ETH";

/// Parses a user supplied amount in ether units into wei. Only strictly
/// positive amounts are accepted.
pub fn parse_positive_ether(input: &str) -> Result<U256, BatchError> {
    let input = input.trim();
    let input = input.strip_prefix('+').unwrap_or(input);

    // parse_ether slices by byte offset, so only plain ASCII decimals reach it
    let has_digit = input.bytes().any(|b| b.is_ascii_digit());
    let plain_decimal = input.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && input.bytes().filter(|&b| b == b'.').count() <= 1;
    if !has_digit || !plain_decimal {
        return Err(BatchError::validation(format!(
            "not a positive amount: {:?}",
            input
        )));
    }

    let wei = parse_ether(input).map_err(|e| BatchError::validation(e.to_string()))?;
    if wei.is_zero() {
        return Err(BatchError::validation("amount must be greater than zero"));
    }

    Ok(wei)
}

/// Renders wei as ether without the trailing zeros `format_ether` pads with.
pub fn format_ether_trimmed(wei: U256) -> String {
    let formatted = format_ether(wei);

    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => formatted,
    }
}

pub fn format_amount(wei: U256, symbol: &str) -> String {
    format!("{} {}", format_ether_trimmed(wei), symbol)
}

/// `per_recipient * count`, or `None` when it does not fit in 256 bits.
pub fn batch_total(per_recipient: U256, count: usize) -> Option<U256> {
    per_recipient.checked_mul(U256::from(count))
}
