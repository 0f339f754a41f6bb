//! Domain models for price divergence detection.

mod alert;
mod pair;
mod quote;

pub use alert::{ArbitrageAlert, relative_diff};
pub use pair::{Pair, PairParseError};
pub use quote::{PriceQuote, PriceSnapshot};
