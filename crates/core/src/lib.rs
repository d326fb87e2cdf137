//! Pure domain logic for the personnel-to-legacy payroll bridge.
//!
//! Nothing in this crate performs I/O. It holds the rules the rest of the
//! workspace shares: text repair for legacy strings, fixed-width field
//! formatting, period codes, the movement vocabulary, legacy result
//! classification and the retry policy.

pub mod encoding;
pub mod error;
pub mod legacy_format;
pub mod movement;
pub mod period;
pub mod retry;
pub mod types;
