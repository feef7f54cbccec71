use std::io::{self, Write};

use common::{
    error::BatchError,
    utils::{batch_total, format_amount},
};
use ethers::types::U256;
use recipients::ParsedRecipients;
use transaction_sender::DispatchReport;

pub fn print_recipients<W: Write>(parsed: &ParsedRecipients, out: &mut W) -> io::Result<()> {
    for line in &parsed.invalid {
        writeln!(out, "⚠️ Invalid address skipped: {}", line)?;
    }

    writeln!(out, "\n📬 Valid addresses   : {}", parsed.valid_count())?;
    writeln!(out, "⚠️ Invalid addresses : {}", parsed.invalid_count())
}

/// What the operator is asked to approve.
#[derive(Clone, Debug)]
pub struct BatchSummary {
    pub per_recipient: U256,
    pub recipient_count: usize,
    /// Saturates at `U256::MAX`, which no balance can cover.
    pub total: U256,
    pub balance: U256,
    pub estimated_fee: Option<U256>,
    pub currency_symbol: String,
}

impl BatchSummary {
    pub fn new(
        per_recipient: U256,
        recipient_count: usize,
        balance: U256,
        currency_symbol: &str,
    ) -> Self {
        Self {
            per_recipient,
            recipient_count,
            total: batch_total(per_recipient, recipient_count).unwrap_or(U256::MAX),
            balance,
            estimated_fee: None,
            currency_symbol: currency_symbol.to_string(),
        }
    }

    /// Informational only; the affordability check ignores fees.
    pub fn with_fee_estimate(mut self, gas_limit: U256, gas_price: U256) -> Self {
        self.estimated_fee = gas_limit
            .checked_mul(gas_price)
            .and_then(|fee| batch_total(fee, self.recipient_count));
        self
    }

    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let symbol = &self.currency_symbol;

        writeln!(out, "\n========== SUMMARY ==========")?;
        writeln!(out, "Per address : {}", format_amount(self.per_recipient, symbol))?;
        writeln!(out, "Addresses   : {}", self.recipient_count)?;
        writeln!(out, "Total send  : {}", format_amount(self.total, symbol))?;
        writeln!(out, "Wallet bal  : {}", format_amount(self.balance, symbol))?;
        if let Some(fee) = self.estimated_fee {
            writeln!(out, "Est. gas    : ~{}", format_amount(fee, symbol))?;
        }
        writeln!(out, "=============================")
    }

    /// Advisory precheck against the balance read before confirmation.
    pub fn ensure_affordable(&self) -> Result<(), BatchError> {
        if self.balance < self.total {
            return Err(BatchError::InsufficientFunds {
                required: self.total,
                balance: self.balance,
            });
        }

        Ok(())
    }
}

pub fn print_report<W: Write>(report: &DispatchReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n========== RESULT ==========")?;
    writeln!(out, "Sent        : {}/{}", report.sent_count(), report.total)?;
    writeln!(out, "Remaining   : {}", report.remaining())?;
    writeln!(out, "Next nonce  : {}", report.next_nonce)?;
    writeln!(out, "============================")?;

    if report.is_complete() {
        writeln!(out, "🎉 All transactions confirmed")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ethers::utils::parse_ether;

    use super::*;

    #[test]
    fn precheck_fails_when_batch_exceeds_balance() {
        let summary = BatchSummary::new(
            parse_ether("0.5").unwrap(),
            2,
            parse_ether("0.9").unwrap(),
            "ETH",
        );

        let err = summary.ensure_affordable().unwrap_err();
        match err {
            BatchError::InsufficientFunds { required, balance } => {
                assert_eq!(required, parse_ether("1").unwrap());
                assert_eq!(balance, parse_ether("0.9").unwrap());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn precheck_passes_on_exact_balance() {
        let summary =
            BatchSummary::new(parse_ether("0.5").unwrap(), 2, parse_ether("1").unwrap(), "ETH");

        assert!(summary.ensure_affordable().is_ok());
    }

    #[test]
    fn overflowing_total_is_unaffordable() {
        let summary = BatchSummary::new(U256::MAX, 3, U256::MAX - 1, "ETH");

        assert_eq!(summary.total, U256::MAX);
        assert!(summary.ensure_affordable().is_err());
    }

    #[test]
    fn prints_totals_and_fee_estimate() {
        let summary = BatchSummary::new(
            parse_ether("0.5").unwrap(),
            3,
            parse_ether("10").unwrap(),
            "ETH",
        )
        .with_fee_estimate(U256::from(21_000), U256::from(1_000_000_000_u64));

        let mut out = Vec::new();
        summary.print(&mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.contains("Per address : 0.5 ETH"));
        assert!(printed.contains("Addresses   : 3"));
        assert!(printed.contains("Total send  : 1.5 ETH"));
        assert!(printed.contains("Wallet bal  : 10 ETH"));
        assert!(printed.contains("Est. gas    : ~0.000063 ETH"));
    }

    #[test]
    fn lists_skipped_lines() {
        let parsed = ParsedRecipients {
            valid: Vec::new(),
            invalid: vec!["bogus".to_string()],
        };
        let mut out = Vec::new();
        print_recipients(&parsed, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.contains("Invalid address skipped: bogus"));
        assert!(printed.contains("Invalid addresses : 1"));
    }
}
