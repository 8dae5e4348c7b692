//! Flex domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::schedule::BillingStatus;

/// Classification of a variance between actual and expected amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexClassification {
    /// Deviation within the tenant's tolerance.
    WithinTolerance,
    /// Deviation beyond tolerance; needs a human decision.
    OverTolerance,
    /// Negative actual amount: a chargeback.
    Chargeback,
}

impl FlexClassification {
    /// Returns the string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WithinTolerance => "within_tolerance",
            Self::OverTolerance => "over_tolerance",
            Self::Chargeback => "chargeback",
        }
    }
}

/// What the resolver decided to do with an apply-match call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Execute an adjustment child immediately; no human step.
    AutoAdjust,
    /// Return the decision to the caller; nothing executed.
    Prompt,
    /// Negative amount: no match row, executed chargeback adjustment,
    /// review item enqueued.
    Chargeback,
}

impl DecisionAction {
    /// Returns the wire tag for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoAdjust => "auto_adjust",
            Self::Prompt => "prompt",
            Self::Chargeback => "chargeback",
        }
    }
}

/// The resolver's decision for one apply-match call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexDecision {
    /// Decision action.
    pub action: DecisionAction,
    /// Variance classification.
    pub classification: FlexClassification,
    /// `actual - expected` on the usage axis.
    pub overage_usage: Decimal,
    /// `actual - expected` on the commission axis.
    pub overage_commission: Decimal,
    /// True when an adjustment child is executed as part of the decision.
    pub executed: bool,
}

impl FlexDecision {
    /// Reason code recorded on review items created for this decision.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self.classification {
            FlexClassification::Chargeback => "negative_amount",
            FlexClassification::OverTolerance => "over_tolerance",
            FlexClassification::WithinTolerance => "within_tolerance",
        }
    }
}

/// An adjustment child schedule to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentPlan {
    /// Usage delta the child carries.
    pub usage_delta: Decimal,
    /// Commission delta the child carries.
    pub commission_delta: Decimal,
    /// Classification recorded on the child.
    pub classification: FlexClassification,
    /// True when the child is created already executed.
    pub executed: bool,
}

/// Human resolution action for an over-tolerance dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexAction {
    /// Apply the rate/amount correction and clear the dispute.
    Adjust,
    /// Split the deviation out as a flex product; base and children disputed.
    FlexProduct,
    /// Approve a queued chargeback.
    ChargebackApprove,
}

/// Billing-state effects of one resolution action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexResolutionPlan {
    /// Billing status the base schedule moves to.
    pub base_billing_status: BillingStatus,
    /// Billing status applied to the base's flex children, when any.
    pub children_billing_status: Option<BillingStatus>,
    /// Whether the action creates and executes an adjustment child.
    pub creates_adjustment: bool,
}

/// Review queue item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlexReviewStatus {
    /// Awaiting review.
    Open,
    /// Approved by a reviewer.
    Approved,
}

impl FlexReviewStatus {
    /// Returns the string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Approved => "approved",
        }
    }
}
