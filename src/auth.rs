//! Caller identities
//!
//! - Account address validation (0x-prefixed, 20 bytes hex)
//! - Zero address detection
//! - Caller resolution from request headers

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;

/// Header carrying the authenticated caller address, set by the gateway in front of the server
pub const CALLER_HEADER: &str = "x-caller-address";

const ADDRESS_BYTES: usize = 20;

/// An account identity, normalized to lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The null identity. Payouts to it are rejected.
    pub fn zero() -> Self {
        Address(format!("0x{}", "0".repeat(ADDRESS_BYTES * 2)))
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        if !is_valid_address(s) {
            return Err(LedgerError::InvalidAddress(s.to_string()));
        }
        Ok(Address(s.to_lowercase()))
    }

    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Check if a string is a 0x-prefixed 20-byte hex address
pub fn is_valid_address(address: &str) -> bool {
    let Some(body) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return false;
    };

    if body.len() != ADDRESS_BYTES * 2 {
        return false;
    }

    match hex::decode(body) {
        Ok(_) => true,
        Err(e) => {
            debug!("Failed to decode address hex: {}", e);
            false
        }
    }
}

/// Resolve the caller of a request.
///
/// Returns `Ok(None)` when the header is absent so the transport can answer 401.
pub fn resolve_caller(headers: &HeaderMap) -> Result<Option<Address>, LedgerError> {
    let Some(value) = headers.get(CALLER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| LedgerError::InvalidAddress("<non-ascii header>".to_string()))?;
    Address::parse(raw.trim()).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
        assert!(!is_valid_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeA"));
        assert!(!is_valid_address("0xzzAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_address_normalized() {
        let a = Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        let b = Address::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::zero().is_zero());
        assert!(Address::parse("0x0000000000000000000000000000000000000000")
            .unwrap()
            .is_zero());
        assert!(!Address::parse("0x0000000000000000000000000000000000000001")
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_address_serde() {
        let a: Address =
            serde_json::from_str("\"0x00000000000000000000000000000000000000AA\"").unwrap();
        assert_eq!(a.as_str(), "0x00000000000000000000000000000000000000aa");
        assert!(serde_json::from_str::<Address>("\"not-an-address\"").is_err());
    }

    #[test]
    fn test_resolve_caller() {
        let mut headers = HeaderMap::new();
        assert!(resolve_caller(&headers).unwrap().is_none());

        headers.insert(
            CALLER_HEADER,
            HeaderValue::from_static("0x00000000000000000000000000000000000000a1"),
        );
        let caller = resolve_caller(&headers).unwrap().unwrap();
        assert_eq!(caller.as_str(), "0x00000000000000000000000000000000000000a1");

        headers.insert(CALLER_HEADER, HeaderValue::from_static("bogus"));
        assert!(resolve_caller(&headers).is_err());
    }
}
