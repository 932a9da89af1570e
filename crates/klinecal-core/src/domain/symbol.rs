use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MIN_BASE_LEN: usize = 2;
const MAX_BASE_LEN: usize = 10;

/// Normalized USD-quoted spot pair, e.g. `BTCUSDT` or `ETHUSD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a pair to uppercase.
    ///
    /// The normalized value must match `[A-Z]{2,10}USDT?`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let base = normalized
            .strip_suffix("USDT")
            .or_else(|| normalized.strip_suffix("USD"));

        let valid = match base {
            Some(base) => {
                (MIN_BASE_LEN..=MAX_BASE_LEN).contains(&base.len())
                    && base.chars().all(|ch| ch.is_ascii_uppercase())
            }
            None => false,
        };

        if !valid {
            return Err(ValidationError::InvalidSymbol {
                value: input.to_owned(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
