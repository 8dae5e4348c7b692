//! Deposit line allocation bookkeeping.
//!
//! Pure math over a line's allocated/unallocated amounts. The invariant
//! `allocated + unallocated == total` holds for usage and commission after
//! every operation; `engine_props.rs` proves it over arbitrary sequences.

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::AllocationEngine;
pub use error::AllocationError;
pub use types::{AllocationOutcome, LineAmounts, LineItemStatus, MatchSource, MatchStatus};
