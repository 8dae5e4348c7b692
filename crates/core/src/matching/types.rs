//! Candidate matching types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a deposit line item used for candidate search.
#[derive(Debug, Clone)]
pub struct LineSnapshot {
    /// Line item id.
    pub id: Uuid,
    /// Raw account name as imported.
    pub account_name_raw: String,
    /// Raw product name as imported.
    pub product_name_raw: String,
    /// Reported usage amount.
    pub usage: Decimal,
    /// Reported commission amount.
    pub commission: Decimal,
    /// First day of the deposit's month window.
    pub deposit_month: NaiveDate,
}

/// Snapshot of a revenue schedule eligible for matching.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    /// Schedule id.
    pub id: Uuid,
    /// Owning account id.
    pub account_id: Uuid,
    /// The account's LEGAL name. Candidate resolution matches the raw line
    /// account name against this field and nothing else.
    pub account_legal_name: String,
    /// Product name on the schedule.
    pub product_name: String,
    /// Schedule date.
    pub schedule_date: NaiveDate,
    /// Expected usage amount.
    pub expected_usage: Decimal,
    /// Expected commission amount.
    pub expected_commission: Decimal,
}

/// How a candidate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Produced by the legacy single-pass scorer.
    Legacy,
    /// Hierarchical tier: product and amount both line up.
    Exact,
    /// Hierarchical tier: product lines up.
    Product,
    /// Hierarchical tier: amount lines up.
    Amount,
    /// Hierarchical tier: account-only fallback.
    Account,
}

impl MatchType {
    /// Returns the wire tag for this match type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Exact => "exact",
            Self::Product => "product",
            Self::Amount => "amount",
            Self::Account => "account",
        }
    }
}

/// One ranked candidate schedule for a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Candidate schedule id.
    pub schedule_id: Uuid,
    /// Tag identifying the producing mode/tier.
    pub match_type: MatchType,
    /// Confidence score in `[0, 1]`.
    pub confidence: Decimal,
}

/// Per-call candidate search options.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext {
    /// Admit schedules dated after the deposit month window.
    pub include_future_schedules: bool,
    /// Candidates below this confidence are excluded entirely.
    pub min_confidence: Decimal,
}
