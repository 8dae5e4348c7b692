//! Rip-and-replace bundle planning.
//!
//! Splitting one product/schedule into N sibling product schedules is planned
//! here as pure data: precondition checks, a deterministic operation key, and
//! the full set of schedules to create. The repository executes the plan (or
//! replays a stored result) inside one transaction.

pub mod error;
pub mod plan;
pub mod types;

pub use error::BundleError;
pub use plan::BundlePlanner;
pub use types::{
    BundleMode, BundlePlan, LineForBundle, PlannedSchedule, SiblingSchedule,
};
