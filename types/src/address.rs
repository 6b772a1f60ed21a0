//! Account address type with `0x` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// A ledger account, always `0x` followed by 40 hex digits.
///
/// Stored in lower case so that addresses reported by the wallet provider and
/// addresses decoded from contract return data compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Account(String);

impl Account {
    /// The standard prefix for all account addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of bytes in an address.
    pub const LEN: usize = 20;

    /// Parse an address from its textual form (checksummed or not).
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix(Self::PREFIX)
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| TypesError::InvalidAddress(raw.to_string()))?;
        if digits.len() != Self::LEN * 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypesError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, digits.to_ascii_lowercase())))
    }

    /// Build an address from its raw 20 bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex::encode(bytes)))
    }

    /// The raw 20 address bytes.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Validated on construction.
        if let Ok(decoded) = hex::decode(&self.0[Self::PREFIX.len()..]) {
            out.copy_from_slice(&decoded);
        }
        out
    }

    /// Return the normalized address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0[Self::PREFIX.len()..].bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Account {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Account {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Account> for String {
    fn from(account: Account) -> Self {
        account.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case() {
        let a = Account::parse("0x751f3e144A2E9887042404E36a4631EF71C5BFe9").unwrap();
        assert_eq!(a.as_str(), "0x751f3e144a2e9887042404e36a4631ef71c5bfe9");
        let b: Account = "0x751F3E144A2E9887042404E36A4631EF71C5BFE9".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed() {
        assert!(Account::parse("").is_err());
        assert!(Account::parse("751f3e144a2e9887042404e36a4631ef71c5bfe9").is_err());
        assert!(Account::parse("0x751f3e").is_err());
        assert!(Account::parse("0xzz1f3e144a2e9887042404e36a4631ef71c5bfe9").is_err());
    }

    #[test]
    fn bytes_roundtrip() {
        let a = Account::from_bytes([0xab; 20]);
        assert_eq!(a.to_bytes(), [0xab; 20]);
        assert!(!a.is_zero());
        assert!(Account::from_bytes([0; 20]).is_zero());
    }

    #[test]
    fn serde_validates() {
        let ok: Result<Account, _> =
            serde_json::from_str("\"0x0000000000000000000000000000000000000001\"");
        assert!(ok.is_ok());
        let bad: Result<Account, _> = serde_json::from_str("\"not-an-address\"");
        assert!(bad.is_err());
    }
}
