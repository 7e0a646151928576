//! Currency codes
//!
//! Accounts hold a single currency identified by a three-letter uppercase code
//! (ISO 4217 shape). The ledger does not convert between currencies.

use std::fmt;

use super::error::LedgerError;

pub const USD: &str = "USD";
pub const EUR: &str = "EUR";
pub const CAD: &str = "CAD";

/// Currencies the fixture generator draws from
pub const COMMON_CURRENCIES: [&str; 3] = [EUR, USD, CAD];

/// Validated currency code
///
/// Fields are private to force validation through `new()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Accepts exactly three ASCII uppercase letters.
    pub fn new(code: &str) -> Result<Self, LedgerError> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(LedgerError::InvalidCurrency(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
