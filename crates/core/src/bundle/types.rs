//! Bundle operation types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happens to the replaced schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleMode {
    /// Keep the original schedules alongside the bundle children.
    KeepOld,
    /// Soft-delete the original schedules.
    SoftDeleteOld,
}

impl BundleMode {
    /// Returns the string form used in storage and operation keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepOld => "keep_old",
            Self::SoftDeleteOld => "soft_delete_old",
        }
    }
}

impl std::str::FromStr for BundleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep_old" => Ok(Self::KeepOld),
            "soft_delete_old" => Ok(Self::SoftDeleteOld),
            other => Err(format!("Unknown bundle mode: {other}")),
        }
    }
}

/// Line item snapshot for bundle planning.
#[derive(Debug, Clone)]
pub struct LineForBundle {
    /// Line item id.
    pub id: Uuid,
    /// Raw product name on the line (names the bundle child).
    pub product_name_raw: String,
    /// Reported usage; becomes the child schedule's expected usage.
    pub usage: Decimal,
    /// Reported commission; becomes the child schedule's expected commission.
    pub commission: Decimal,
    /// True if the line already carries an applied match.
    pub has_applied_match: bool,
}

/// A schedule in the base schedule's sibling window, with its applied-match
/// count across the whole system.
#[derive(Debug, Clone)]
pub struct SiblingSchedule {
    /// Schedule id.
    pub id: Uuid,
    /// Schedule date.
    pub schedule_date: NaiveDate,
    /// Applied matches anywhere referencing this schedule.
    pub applied_match_count: u64,
}

/// One schedule the bundle operation will create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSchedule {
    /// The line this schedule is split out for.
    pub line_item_id: Uuid,
    /// Schedule date, taken from the sibling window.
    pub schedule_date: NaiveDate,
    /// Expected usage carried over from the line.
    pub expected_usage: Decimal,
    /// Expected commission carried over from the line.
    pub expected_commission: Decimal,
    /// The window schedule this one replaces.
    pub replaces_schedule_id: Uuid,
}

/// A fully validated bundle plan.
#[derive(Debug, Clone)]
pub struct BundlePlan {
    /// Deterministic idempotency key for the operation.
    pub operation_key: String,
    /// Code of the bundle product to create.
    pub product_code: String,
    /// Name of the bundle product to create.
    pub product_name: String,
    /// Schedules to create: one per (line × sibling-window) combination,
    /// line order preserved.
    pub schedules: Vec<PlannedSchedule>,
    /// Window schedules to soft-delete (`soft_delete_old` only).
    pub soft_delete_schedule_ids: Vec<Uuid>,
}
