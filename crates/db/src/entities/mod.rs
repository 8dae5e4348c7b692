//! `SeaORM` entity definitions for the reconciliation ledger.

pub mod accounts;
pub mod bundle_operations;
pub mod deposit_line_items;
pub mod deposit_line_matches;
pub mod deposits;
pub mod flex_review_items;
pub mod import_templates;
pub mod notifications;
pub mod opportunities;
pub mod products;
pub mod revenue_schedules;
pub mod sea_orm_active_enums;
pub mod tenant_settings;
