//! Allocation repository: apply-match, unmatch, and auto-match apply.
//!
//! Every mutation runs in one database transaction: allocation bookkeeping,
//! match rows, flex side effects (adjustment children, review items), and
//! status transitions commit together or not at all.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use rivena_core::allocation::{
    AllocationEngine, AllocationError, LineAmounts, MatchSource as CoreMatchSource,
    MatchStatus as CoreMatchStatus,
};
use rivena_core::flex::{DecisionAction, FlexDecision, VarianceResolver};

use super::matching::AutoMatchPairing;
use super::support::{applied_match_count, create_adjustment_child, create_review_item};
use crate::entities::{
    deposit_line_items, deposit_line_matches, revenue_schedules,
    sea_orm_active_enums::{LineItemStatus, MatchStatus, ScheduleStatus},
};

/// Error types for allocation operations.
#[derive(Debug, thiserror::Error)]
pub enum AllocationRepoError {
    /// Line item not found.
    #[error("Deposit line item not found: {0}")]
    LineNotFound(Uuid),

    /// Revenue schedule not found.
    #[error("Revenue schedule not found: {0}")]
    ScheduleNotFound(Uuid),

    /// Allocation bookkeeping rejected the amounts.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AllocationRepoError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::LineNotFound(_) | Self::ScheduleNotFound(_) => 404,
            Self::Allocation(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }
}

/// Input for one apply-match call.
#[derive(Debug, Clone)]
pub struct ApplyMatchInput {
    /// Line to allocate from.
    pub line_item_id: Uuid,
    /// Schedule to allocate to.
    pub revenue_schedule_id: Uuid,
    /// Usage amount to allocate.
    pub usage_amount: Decimal,
    /// Commission amount to allocate.
    pub commission_amount: Decimal,
    /// Confidence recorded on the match row.
    pub confidence_score: Decimal,
    /// Match origin.
    pub source: CoreMatchSource,
}

/// Result of one apply-match call.
#[derive(Debug, Clone)]
pub struct ApplyMatchOutcome {
    /// The created match, or `None` when the variance resolver routed the
    /// line to chargeback instead.
    pub match_row: Option<deposit_line_matches::Model>,
    /// The resolver's decision payload.
    pub decision: FlexDecision,
    /// Adjustment child created by the decision, when any.
    pub adjustment_schedule_id: Option<Uuid>,
    /// Review item enqueued by the decision, when any.
    pub review_item_id: Option<Uuid>,
    /// The line after the call.
    pub line: deposit_line_items::Model,
}

/// Allocation repository.
#[derive(Debug, Clone)]
pub struct AllocationRepository {
    db: DatabaseConnection,
}

impl AllocationRepository {
    /// Creates a new allocation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies a match between a line and a schedule.
    ///
    /// The variance resolver runs against the schedule's expected amounts:
    /// within-tolerance deviations execute an adjustment child immediately,
    /// over-tolerance deviations persist the match as `Suggested` and enqueue
    /// a review item, negative amounts create no match at all.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for stale references and
    /// `AllocationRepoError::Allocation` when the amounts do not fit the
    /// line's unallocated balance.
    pub async fn apply_match(
        &self,
        tenant_id: Uuid,
        input: &ApplyMatchInput,
        variance_tolerance: Decimal,
    ) -> Result<ApplyMatchOutcome, AllocationRepoError> {
        let txn = self.db.begin().await?;
        let outcome = Self::apply_match_in_txn(&txn, tenant_id, input, variance_tolerance).await?;
        txn.commit().await?;

        info!(
            line_item_id = %input.line_item_id,
            revenue_schedule_id = %input.revenue_schedule_id,
            decision = outcome.decision.action.as_str(),
            "apply-match completed"
        );
        Ok(outcome)
    }

    /// Removes every match from a line: the exact inverse of a full
    /// single-schedule apply.
    pub async fn unmatch(
        &self,
        tenant_id: Uuid,
        line_item_id: Uuid,
    ) -> Result<deposit_line_items::Model, AllocationRepoError> {
        let txn = self.db.begin().await?;

        let line = deposit_line_items::Entity::find_by_id(line_item_id)
            .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await?
            .ok_or(AllocationRepoError::LineNotFound(line_item_id))?;

        let matches = deposit_line_matches::Entity::find()
            .filter(deposit_line_matches::Column::DepositLineItemId.eq(line_item_id))
            .all(&txn)
            .await?;
        let mut schedule_ids: Vec<Uuid> =
            matches.iter().map(|m| m.revenue_schedule_id).collect();
        schedule_ids.sort();
        schedule_ids.dedup();

        deposit_line_matches::Entity::delete_many()
            .filter(deposit_line_matches::Column::DepositLineItemId.eq(line_item_id))
            .exec(&txn)
            .await?;

        let reset = AllocationEngine::unmatch(line.usage, line.commission);
        let now: DateTimeWithTimeZone = Utc::now().into();

        let mut active: deposit_line_items::ActiveModel = line.into();
        active.usage_allocated = Set(reset.amounts.usage_allocated);
        active.usage_unallocated = Set(reset.amounts.usage_unallocated);
        active.commission_allocated = Set(reset.amounts.commission_allocated);
        active.commission_unallocated = Set(reset.amounts.commission_unallocated);
        active.status = Set(reset.status.into());
        active.primary_revenue_schedule_id = Set(None);
        active.updated_at = Set(now);
        let line = active.update(&txn).await?;

        // Schedules that no longer hold applied matches fall back to pending.
        for schedule_id in schedule_ids {
            if applied_match_count(&txn, schedule_id).await? == 0 {
                if let Some(schedule) = revenue_schedules::Entity::find_by_id(schedule_id)
                    .one(&txn)
                    .await?
                {
                    if schedule.status == ScheduleStatus::Allocated {
                        let mut active: revenue_schedules::ActiveModel = schedule.into();
                        active.status = Set(ScheduleStatus::Pending);
                        active.updated_at = Set(now);
                        active.update(&txn).await?;
                    }
                }
            }
        }

        txn.commit().await?;

        info!(line_item_id = %line_item_id, "line unmatched");
        Ok(line)
    }

    /// Applies accepted auto-match pairings in one transaction.
    ///
    /// Each pairing allocates the line's full remaining amounts as an
    /// `Applied` match with `source = auto`.
    pub async fn auto_match_apply(
        &self,
        tenant_id: Uuid,
        pairings: &[AutoMatchPairing],
        variance_tolerance: Decimal,
    ) -> Result<Vec<ApplyMatchOutcome>, AllocationRepoError> {
        let txn = self.db.begin().await?;

        let mut outcomes = Vec::with_capacity(pairings.len());
        for pairing in pairings {
            let line = deposit_line_items::Entity::find_by_id(pairing.line_item_id)
                .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
                .one(&txn)
                .await?
                .ok_or(AllocationRepoError::LineNotFound(pairing.line_item_id))?;

            let input = ApplyMatchInput {
                line_item_id: pairing.line_item_id,
                revenue_schedule_id: pairing.revenue_schedule_id,
                usage_amount: line.usage_unallocated,
                commission_amount: line.commission_unallocated,
                confidence_score: pairing.confidence,
                source: CoreMatchSource::Auto,
            };
            outcomes.push(
                Self::apply_match_in_txn(&txn, tenant_id, &input, variance_tolerance).await?,
            );
        }

        txn.commit().await?;

        info!(applied = outcomes.len(), "auto-match apply completed");
        Ok(outcomes)
    }

    async fn apply_match_in_txn(
        txn: &DatabaseTransaction,
        tenant_id: Uuid,
        input: &ApplyMatchInput,
        variance_tolerance: Decimal,
    ) -> Result<ApplyMatchOutcome, AllocationRepoError> {
        let line = deposit_line_items::Entity::find_by_id(input.line_item_id)
            .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await?
            .ok_or(AllocationRepoError::LineNotFound(input.line_item_id))?;

        let schedule = revenue_schedules::Entity::find_by_id(input.revenue_schedule_id)
            .filter(revenue_schedules::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await?
            .ok_or(AllocationRepoError::ScheduleNotFound(input.revenue_schedule_id))?;

        let decision = VarianceResolver::classify(
            input.usage_amount,
            schedule.expected_usage,
            input.commission_amount,
            schedule.expected_commission,
            variance_tolerance,
        );

        if decision.action == DecisionAction::Chargeback {
            // No match row, no bookkeeping movement: the executed chargeback
            // adjustment and the open review item carry the signal.
            let adjustment = Self::execute_adjustment(txn, &schedule, &decision).await?;
            let review = create_review_item(
                txn,
                tenant_id,
                Some(line.deposit_id),
                Some(line.id),
                schedule.id,
                decision.classification.into(),
                decision.reason_code(),
            )
            .await?;

            return Ok(ApplyMatchOutcome {
                match_row: None,
                decision,
                adjustment_schedule_id: adjustment,
                review_item_id: Some(review.id),
                line,
            });
        }

        let amounts = LineAmounts {
            usage: line.usage,
            usage_allocated: line.usage_allocated,
            usage_unallocated: line.usage_unallocated,
            commission: line.commission,
            commission_allocated: line.commission_allocated,
            commission_unallocated: line.commission_unallocated,
        };
        let allocation =
            AllocationEngine::apply(&amounts, input.usage_amount, input.commission_amount)?;

        let match_status = if decision.action == DecisionAction::Prompt {
            CoreMatchStatus::Suggested
        } else {
            CoreMatchStatus::Applied
        };
        let now: DateTimeWithTimeZone = Utc::now().into();

        let match_row = deposit_line_matches::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            deposit_line_item_id: Set(line.id),
            revenue_schedule_id: Set(schedule.id),
            usage_amount: Set(input.usage_amount),
            commission_amount: Set(input.commission_amount),
            status: Set(match_status.into()),
            source: Set(input.source.into()),
            confidence_score: Set(input.confidence_score),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;

        // A line whose only matches are suggestions reads as Suggested.
        let applied_on_line = deposit_line_matches::Entity::find()
            .filter(deposit_line_matches::Column::DepositLineItemId.eq(line.id))
            .filter(deposit_line_matches::Column::Status.eq(MatchStatus::Applied))
            .count(txn)
            .await?;
        let line_status: LineItemStatus = if applied_on_line == 0 {
            LineItemStatus::Suggested
        } else {
            allocation.status.into()
        };

        let primary = line
            .primary_revenue_schedule_id
            .or(Some(schedule.id));
        let mut active: deposit_line_items::ActiveModel = line.into();
        active.usage_allocated = Set(allocation.amounts.usage_allocated);
        active.usage_unallocated = Set(allocation.amounts.usage_unallocated);
        active.commission_allocated = Set(allocation.amounts.commission_allocated);
        active.commission_unallocated = Set(allocation.amounts.commission_unallocated);
        active.status = Set(line_status);
        active.primary_revenue_schedule_id = Set(primary);
        active.updated_at = Set(now);
        let line = active.update(txn).await?;

        if match_status == CoreMatchStatus::Applied && schedule.status != ScheduleStatus::Allocated
        {
            let mut active: revenue_schedules::ActiveModel = schedule.clone().into();
            active.status = Set(ScheduleStatus::Allocated);
            active.updated_at = Set(now);
            active.update(txn).await?;
        }

        let adjustment_schedule_id = if decision.action == DecisionAction::AutoAdjust {
            Self::execute_adjustment(txn, &schedule, &decision).await?
        } else {
            None
        };

        let review_item_id = if decision.action == DecisionAction::Prompt {
            let review = create_review_item(
                txn,
                tenant_id,
                Some(line.deposit_id),
                Some(line.id),
                schedule.id,
                decision.classification.into(),
                decision.reason_code(),
            )
            .await?;
            Some(review.id)
        } else {
            None
        };

        Ok(ApplyMatchOutcome {
            match_row: Some(match_row),
            decision,
            adjustment_schedule_id,
            review_item_id,
            line,
        })
    }

    /// Creates the executed adjustment child for a decision, when one is due.
    async fn execute_adjustment(
        txn: &DatabaseTransaction,
        schedule: &revenue_schedules::Model,
        decision: &FlexDecision,
    ) -> Result<Option<Uuid>, AllocationRepoError> {
        let Some(plan) = VarianceResolver::adjustment_plan(decision) else {
            return Ok(None);
        };
        let child = create_adjustment_child(
            txn,
            schedule,
            plan.usage_delta,
            plan.commission_delta,
            plan.classification.into(),
            plan.executed,
        )
        .await?;
        Ok(Some(child.id))
    }
}
