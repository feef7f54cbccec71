use std::{fmt::Display, str::FromStr};

use ethers::{
    types::Address,
    utils::{hex, to_checksum},
};

use crate::error::BatchError;

/// A validated recipient address, rendered in EIP-55 checksummed form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Recipient(Address);

impl Recipient {
    pub fn address(&self) -> Address {
        self.0
    }

    pub fn checksummed(&self) -> String {
        to_checksum(&self.0, None)
    }
}

impl From<Address> for Recipient {
    fn from(address: Address) -> Self {
        Recipient(address)
    }
}

impl FromStr for Recipient {
    type Err = BatchError;

    /// Accepts 40 hex digits with an optional `0x` prefix. A mixed-case body is
    /// only accepted when it is exactly the checksummed form, prefix included.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BatchError::validation(format!("not a hex address: {}", s)));
        }

        let bytes = hex::decode(body).map_err(|e| BatchError::validation(e.to_string()))?;
        let address = Address::from_slice(&bytes);

        let mixed_case = body.chars().any(|c| c.is_ascii_lowercase())
            && body.chars().any(|c| c.is_ascii_uppercase());
        if mixed_case && to_checksum(&address, None) != s {
            return Err(BatchError::validation(format!("bad checksum: {}", s)));
        }

        Ok(Recipient(address))
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.checksummed())
    }
}
