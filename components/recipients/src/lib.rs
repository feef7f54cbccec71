use std::{fs, io::ErrorKind, path::Path};

use common::{error::BatchError, types::Recipient};
use log::{debug, warn};

/// Result of validating an address list, in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedRecipients {
    pub valid: Vec<Recipient>,
    pub invalid: Vec<String>,
}

impl ParsedRecipients {
    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }
}

/// Splits raw lines into recipients and rejected lines. Blank lines are
/// skipped; duplicates are kept.
pub fn parse_recipients<I, S>(lines: I) -> ParsedRecipients
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedRecipients::default();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<Recipient>() {
            Ok(recipient) => parsed.valid.push(recipient),
            Err(e) => {
                warn!("skipping invalid address {:?}: {}", line, e);
                parsed.invalid.push(line.to_string());
            }
        }
    }

    parsed
}

/// Reads and validates the recipients file. Missing, empty, or entirely
/// invalid files are config errors.
pub fn load_recipients(path: &Path) -> Result<ParsedRecipients, BatchError> {
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            BatchError::config(format!("{} file not found", path.display()))
        }
        _ => BatchError::config(format!("could not read {}: {}", path.display(), e)),
    })?;

    if contents.lines().next().is_none() {
        return Err(BatchError::config(format!(
            "{} is empty. No addresses found.",
            path.display()
        )));
    }

    let parsed = parse_recipients(contents.lines());
    debug!(
        "parsed {}: {} valid, {} invalid",
        path.display(),
        parsed.valid_count(),
        parsed.invalid_count()
    );

    if parsed.valid.is_empty() {
        return Err(BatchError::config(format!(
            "no valid addresses found in {}",
            path.display()
        )));
    }

    Ok(parsed)
}
