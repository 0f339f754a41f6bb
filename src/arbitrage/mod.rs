//! Cross-exchange divergence detection.

mod scanner;

pub use scanner::{Scan, scan};
