//! Deposit lifecycle state machine.
//!
//! Finalize locks a deposit's reconciliation as complete; unfinalize is its
//! exact inverse. The `status` field is the canonical finalized signal - the
//! `reconciled` flag is deliberately never consulted when deciding whether a
//! deposit is already finalized.

pub mod error;
pub mod service;
pub mod types;

pub use error::LifecycleError;
pub use service::{LifecycleAction, LifecycleService};
pub use types::DepositStatus;
