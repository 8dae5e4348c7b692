//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations, hiding the
//! `SeaORM` implementation details from the rest of the application. Every
//! mutating operation runs inside one database transaction.

pub mod allocation;
pub mod bundle;
pub mod deposit;
pub mod flex;
pub mod matching;
pub mod notification;
pub mod settings;

mod support;

pub use allocation::{
    AllocationRepoError, AllocationRepository, ApplyMatchInput, ApplyMatchOutcome,
};
pub use bundle::{
    BundleApplyInput, BundleApplyOutcome, BundleRepoError, BundleRepository, BundleUndoOutcome,
};
pub use deposit::{DepositError, DepositRepository, ImportOutcome};
pub use flex::{FlexRepoError, FlexRepository, FlexResolutionOutcome};
pub use matching::{AutoMatchPairing, MatchingError, MatchingRepository};
pub use notification::NotificationRepository;
pub use settings::SettingsRepository;
