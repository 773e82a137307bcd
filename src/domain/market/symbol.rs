use crate::domain::errors::{InsightError, InsightResult};

const MAX_SYMBOL_LEN: usize = 15;

/// Trims and uppercases a ticker, rejecting anything Yahoo would not accept.
///
/// Allowed characters cover plain tickers (`AAPL`), share classes (`BRK-B`,
/// `BRK.B`), indices (`^GSPC`) and currency pairs (`EURUSD=X`).
pub fn normalize_symbol(raw: &str) -> InsightResult<String> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| InsightError::InvalidSymbol {
        symbol: trimmed.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("symbol must not be empty"));
    }
    if trimmed.len() > MAX_SYMBOL_LEN {
        return Err(invalid("symbol is too long"));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
    {
        return Err(invalid("symbol contains unsupported characters"));
    }

    Ok(trimmed.to_ascii_uppercase())
}
