//! Core reconciliation logic for Rivena.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, decision rules, and bookkeeping math live here.
//!
//! # Modules
//!
//! - `import` - Deposit file normalization (column mapping, derived fields, dates)
//! - `matching` - Revenue schedule candidate ranking (legacy + hierarchical)
//! - `allocation` - Line item allocation bookkeeping
//! - `flex` - Variance classification and resolution rules
//! - `bundle` - Rip-and-replace bundle planning
//! - `lifecycle` - Deposit finalize/unfinalize state machine
//! - `schedule` - Revenue schedule state enums shared across modules
//! - `settings` - Injected engine settings (never ambient globals)

pub mod allocation;
pub mod bundle;
pub mod flex;
pub mod import;
pub mod lifecycle;
pub mod matching;
pub mod schedule;
pub mod settings;
