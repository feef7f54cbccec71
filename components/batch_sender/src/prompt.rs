use std::io::{BufRead, Write};

use common::{error::BatchError, utils::parse_positive_ether};
use ethers::types::U256;
use log::debug;

pub const CONFIRMATION_TOKEN: &str = "YES";

/// `None` once the input is closed. Bytes that are not UTF-8 are replaced,
/// so a garbled line is rejected like any other bad answer.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, BatchError> {
    let mut line = Vec::new();
    if input.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Asks for the per-recipient amount until a positive number is entered.
/// Returns the amount in wei.
pub fn prompt_amount<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    currency_symbol: &str,
) -> Result<U256, BatchError> {
    loop {
        write!(
            out,
            "\n💸 Enter {} amount to send per address: ",
            currency_symbol
        )?;
        out.flush()?;

        let Some(line) = read_line(input)? else {
            return Err(BatchError::Cancelled);
        };

        match parse_positive_ether(&line) {
            Ok(wei) => return Ok(wei),
            Err(e) => {
                debug!("rejected amount {:?}: {}", line.trim(), e);
                writeln!(out, "❌ Please enter a valid positive number")?;
            }
        }
    }
}

/// Requires the operator to type the confirmation token exactly. Only the
/// line terminator is stripped, so `yes` or ` YES` cancel the run.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<(), BatchError> {
    write!(
        out,
        "\nType {} to confirm and send transactions: ",
        CONFIRMATION_TOKEN
    )?;
    out.flush()?;

    let answer = read_line(input)?.unwrap_or_default();
    let answer = answer.strip_suffix('\n').unwrap_or(&answer);
    let answer = answer.strip_suffix('\r').unwrap_or(answer);

    if answer == CONFIRMATION_TOKEN {
        Ok(())
    } else {
        Err(BatchError::Cancelled)
    }
}
