use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Ticker symbol as sent to the provider and stored in `stock_prices.symbol`.
///
/// Always trimmed and uppercase, 1 to 15 characters made of `A-Z`, `0-9`, `.`
/// and `-` (covers class shares such as `BRK.B`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();

        if normalized.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        if let Some((index, ch)) = normalized
            .char_indices()
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '.' || *ch == '-'))
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
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

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_uppercases() {
        let parsed = Symbol::parse("  msft\t").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "MSFT");
    }

    #[test]
    fn accepts_class_share_suffix() {
        assert_eq!(Symbol::parse("brk.b").expect("parse").as_str(), "BRK.B");
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!(Symbol::parse("   "), Err(ValidationError::EmptySymbol));
    }

    #[test]
    fn accepts_leading_digits() {
        assert_eq!(Symbol::parse("7203.t").expect("parse").as_str(), "7203.T");
    }

    #[test]
    fn rejects_url_characters() {
        assert!(matches!(
            Symbol::parse("AAPL&apikey=x"),
            Err(ValidationError::SymbolInvalidChar { ch: '&', index: 4 })
        ));
    }

    #[test]
    fn rejects_overlong_symbol() {
        let err = Symbol::parse("ABCDEFGHIJKLMNOP").expect_err("16 chars");
        assert_eq!(err, ValidationError::SymbolTooLong { len: 16, max: 15 });
    }
}
