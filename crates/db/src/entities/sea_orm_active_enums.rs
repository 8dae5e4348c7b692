//! `SeaORM` active enums mirroring the Postgres enum types.
//!
//! Conversions to and from the `rivena-core` domain enums live here so the
//! repositories can hand pure snapshots to the decision functions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use rivena_core::allocation::{LineItemStatus as CoreLineItemStatus, MatchSource as CoreMatchSource, MatchStatus as CoreMatchStatus};
use rivena_core::bundle::BundleMode as CoreBundleMode;
use rivena_core::flex::{FlexClassification as CoreFlexClassification, FlexReviewStatus as CoreFlexReviewStatus};
use rivena_core::lifecycle::DepositStatus as CoreDepositStatus;
use rivena_core::schedule::{BillingStatus as CoreBillingStatus, ScheduleStatus as CoreScheduleStatus};

/// Deposit reconciliation status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "deposit_status")]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Imported, reconciliation not started.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Under active reconciliation.
    #[sea_orm(string_value = "in_review")]
    InReview,
    /// Finalized.
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Deposit line item status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "line_item_status")]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    /// No allocations.
    #[sea_orm(string_value = "unmatched")]
    Unmatched,
    /// Suggested matches only.
    #[sea_orm(string_value = "suggested")]
    Suggested,
    /// Partially allocated.
    #[sea_orm(string_value = "partially_matched")]
    PartiallyMatched,
    /// Fully allocated.
    #[sea_orm(string_value = "matched")]
    Matched,
}

/// Revenue schedule reconciliation progress.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "schedule_status")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Awaiting allocation.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Holds applied allocations.
    #[sea_orm(string_value = "allocated")]
    Allocated,
    /// Executed flex adjustment child.
    #[sea_orm(string_value = "executed")]
    Executed,
    /// Replaced or retired.
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Revenue schedule billing status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "billing_status")]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// Open for reconciliation.
    #[sea_orm(string_value = "open")]
    Open,
    /// Locked by deposit finalize.
    #[sea_orm(string_value = "reconciled")]
    Reconciled,
    /// Under dispute via the flex workflow.
    #[sea_orm(string_value = "in_dispute")]
    InDispute,
}

/// Flex variance classification.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "flex_classification")]
#[serde(rename_all = "snake_case")]
pub enum FlexClassification {
    /// Within tolerance.
    #[sea_orm(string_value = "within_tolerance")]
    WithinTolerance,
    /// Beyond tolerance.
    #[sea_orm(string_value = "over_tolerance")]
    OverTolerance,
    /// Negative actual amount.
    #[sea_orm(string_value = "chargeback")]
    Chargeback,
}

/// Match edge status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "match_status")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Proposed, pending approval.
    #[sea_orm(string_value = "suggested")]
    Suggested,
    /// Confirmed allocation.
    #[sea_orm(string_value = "applied")]
    Applied,
}

/// Match edge origin.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "match_source")]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Operator-driven apply.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Auto-match batch runner.
    #[sea_orm(string_value = "auto")]
    Auto,
}

/// Flex review item status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "flex_review_status")]
#[serde(rename_all = "snake_case")]
pub enum FlexReviewStatus {
    /// Awaiting review.
    #[sea_orm(string_value = "open")]
    Open,
    /// Approved by a reviewer.
    #[sea_orm(string_value = "approved")]
    Approved,
}

/// Bundle operation mode.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "bundle_mode")]
#[serde(rename_all = "snake_case")]
pub enum BundleMode {
    /// Keep the originals alongside bundle children.
    #[sea_orm(string_value = "keep_old")]
    KeepOld,
    /// Soft-delete the originals.
    #[sea_orm(string_value = "soft_delete_old")]
    SoftDeleteOld,
}

// ---------------------------------------------------------------------------
// Core enum conversions
// ---------------------------------------------------------------------------

impl From<CoreDepositStatus> for DepositStatus {
    fn from(value: CoreDepositStatus) -> Self {
        match value {
            CoreDepositStatus::Pending => Self::Pending,
            CoreDepositStatus::InReview => Self::InReview,
            CoreDepositStatus::Completed => Self::Completed,
        }
    }
}

impl From<DepositStatus> for CoreDepositStatus {
    fn from(value: DepositStatus) -> Self {
        match value {
            DepositStatus::Pending => Self::Pending,
            DepositStatus::InReview => Self::InReview,
            DepositStatus::Completed => Self::Completed,
        }
    }
}

impl From<CoreLineItemStatus> for LineItemStatus {
    fn from(value: CoreLineItemStatus) -> Self {
        match value {
            CoreLineItemStatus::Unmatched => Self::Unmatched,
            CoreLineItemStatus::Suggested => Self::Suggested,
            CoreLineItemStatus::PartiallyMatched => Self::PartiallyMatched,
            CoreLineItemStatus::Matched => Self::Matched,
        }
    }
}

impl From<LineItemStatus> for CoreLineItemStatus {
    fn from(value: LineItemStatus) -> Self {
        match value {
            LineItemStatus::Unmatched => Self::Unmatched,
            LineItemStatus::Suggested => Self::Suggested,
            LineItemStatus::PartiallyMatched => Self::PartiallyMatched,
            LineItemStatus::Matched => Self::Matched,
        }
    }
}

impl From<CoreScheduleStatus> for ScheduleStatus {
    fn from(value: CoreScheduleStatus) -> Self {
        match value {
            CoreScheduleStatus::Pending => Self::Pending,
            CoreScheduleStatus::Allocated => Self::Allocated,
            CoreScheduleStatus::Executed => Self::Executed,
            CoreScheduleStatus::Closed => Self::Closed,
        }
    }
}

impl From<CoreBillingStatus> for BillingStatus {
    fn from(value: CoreBillingStatus) -> Self {
        match value {
            CoreBillingStatus::Open => Self::Open,
            CoreBillingStatus::Reconciled => Self::Reconciled,
            CoreBillingStatus::InDispute => Self::InDispute,
        }
    }
}

impl From<BillingStatus> for CoreBillingStatus {
    fn from(value: BillingStatus) -> Self {
        match value {
            BillingStatus::Open => Self::Open,
            BillingStatus::Reconciled => Self::Reconciled,
            BillingStatus::InDispute => Self::InDispute,
        }
    }
}

impl From<CoreFlexClassification> for FlexClassification {
    fn from(value: CoreFlexClassification) -> Self {
        match value {
            CoreFlexClassification::WithinTolerance => Self::WithinTolerance,
            CoreFlexClassification::OverTolerance => Self::OverTolerance,
            CoreFlexClassification::Chargeback => Self::Chargeback,
        }
    }
}

impl From<CoreMatchStatus> for MatchStatus {
    fn from(value: CoreMatchStatus) -> Self {
        match value {
            CoreMatchStatus::Suggested => Self::Suggested,
            CoreMatchStatus::Applied => Self::Applied,
        }
    }
}

impl From<CoreMatchSource> for MatchSource {
    fn from(value: CoreMatchSource) -> Self {
        match value {
            CoreMatchSource::Manual => Self::Manual,
            CoreMatchSource::Auto => Self::Auto,
        }
    }
}

impl From<CoreFlexReviewStatus> for FlexReviewStatus {
    fn from(value: CoreFlexReviewStatus) -> Self {
        match value {
            CoreFlexReviewStatus::Open => Self::Open,
            CoreFlexReviewStatus::Approved => Self::Approved,
        }
    }
}

impl From<CoreBundleMode> for BundleMode {
    fn from(value: CoreBundleMode) -> Self {
        match value {
            CoreBundleMode::KeepOld => Self::KeepOld,
            CoreBundleMode::SoftDeleteOld => Self::SoftDeleteOld,
        }
    }
}

impl From<BundleMode> for CoreBundleMode {
    fn from(value: BundleMode) -> Self {
        match value {
            BundleMode::KeepOld => Self::KeepOld,
            BundleMode::SoftDeleteOld => Self::SoftDeleteOld,
        }
    }
}
