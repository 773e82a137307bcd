// Market data domain
pub mod price_bar;
pub mod symbol;

pub use price_bar::{PriceBar, sanitize_bars};
pub use symbol::normalize_symbol;
