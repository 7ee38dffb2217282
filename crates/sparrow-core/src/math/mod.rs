//! # Mathematical Functions
//!
//! Integer arithmetic for base-unit amounts and WAD fixed-point rates.

pub mod big_int;
pub mod units;

// Re-export commonly used functions
pub use big_int::*;
pub use units::*;
