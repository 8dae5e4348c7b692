//! Flex repository: variance resolution and the review queue.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use rivena_core::allocation::AllocationEngine;
use rivena_core::allocation::LineAmounts;
use rivena_core::flex::{FlexAction, FlexError, VarianceResolver};

use super::support::create_adjustment_child;
use crate::entities::{
    deposit_line_items, deposit_line_matches, flex_review_items, notifications,
    revenue_schedules,
    sea_orm_active_enums::{
        BillingStatus, FlexClassification, FlexReviewStatus, MatchStatus, ScheduleStatus,
    },
};

/// Error types for flex operations.
#[derive(Debug, thiserror::Error)]
pub enum FlexRepoError {
    /// Review item not found.
    #[error("Flex review item not found: {0}")]
    ItemNotFound(Uuid),

    /// Revenue schedule not found.
    #[error("Revenue schedule not found: {0}")]
    ScheduleNotFound(Uuid),

    /// The review item has no suggested match to apply.
    #[error("No suggested match found for review item {0}")]
    MatchNotFound(Uuid),

    /// Flex business rule rejected the operation.
    #[error(transparent)]
    Flex(#[from] FlexError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl FlexRepoError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ItemNotFound(_) | Self::ScheduleNotFound(_) | Self::MatchNotFound(_) => 404,
            Self::Flex(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }
}

/// Result of a resolve-flex call.
#[derive(Debug, Clone)]
pub struct FlexResolutionOutcome {
    /// The base schedule acted on.
    pub base_schedule_id: Uuid,
    /// Adjustment child created and executed, when the action creates one.
    pub adjustment_schedule_id: Option<Uuid>,
    /// Schedules whose billing status moved to `in_dispute`.
    pub disputed_schedule_ids: Vec<Uuid>,
    /// Future schedules the corrected rate propagated to.
    pub future_schedule_ids: Vec<Uuid>,
}

/// Flex repository.
#[derive(Debug, Clone)]
pub struct FlexRepository {
    db: DatabaseConnection,
}

impl FlexRepository {
    /// Creates a new flex repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists review queue items, newest first.
    pub async fn list_queue(
        &self,
        tenant_id: Uuid,
        status: Option<FlexReviewStatus>,
    ) -> Result<Vec<flex_review_items::Model>, FlexRepoError> {
        let mut query = flex_review_items::Entity::find()
            .filter(flex_review_items::Column::TenantId.eq(tenant_id));
        if let Some(status) = status {
            query = query.filter(flex_review_items::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(flex_review_items::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Assigns a review item and creates exactly one notification record for
    /// the assignee, atomically.
    pub async fn assign(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
        assign_to_user_id: Uuid,
    ) -> Result<flex_review_items::Model, FlexRepoError> {
        let txn = self.db.begin().await?;

        let item = flex_review_items::Entity::find_by_id(item_id)
            .filter(flex_review_items::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await?
            .ok_or(FlexRepoError::ItemNotFound(item_id))?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let revenue_schedule_id = item.revenue_schedule_id;

        let mut active: flex_review_items::ActiveModel = item.into();
        active.assigned_to_user_id = Set(Some(assign_to_user_id));
        active.updated_at = Set(now);
        let item = active.update(&txn).await?;

        notifications::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            user_id: Set(assign_to_user_id),
            payload: Set(json!({
                "type": "flex_review_assigned",
                "review_item_id": item.id,
                "revenue_schedule_id": revenue_schedule_id,
            })),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(item_id = %item.id, user_id = %assign_to_user_id, "review item assigned");
        Ok(item)
    }

    /// Approves an open review item whose source match is still `Suggested`,
    /// upgrading that match to `Applied`.
    pub async fn approve_and_apply(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
    ) -> Result<flex_review_items::Model, FlexRepoError> {
        let txn = self.db.begin().await?;

        let item = flex_review_items::Entity::find_by_id(item_id)
            .filter(flex_review_items::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await?
            .ok_or(FlexRepoError::ItemNotFound(item_id))?;

        if item.status != FlexReviewStatus::Open {
            return Err(FlexError::ItemNotOpen(item_id).into());
        }

        let Some(line_item_id) = item.deposit_line_item_id else {
            return Err(FlexRepoError::MatchNotFound(item_id));
        };

        let match_row = deposit_line_matches::Entity::find()
            .filter(deposit_line_matches::Column::DepositLineItemId.eq(line_item_id))
            .filter(
                deposit_line_matches::Column::RevenueScheduleId.eq(item.revenue_schedule_id),
            )
            .one(&txn)
            .await?
            .ok_or(FlexRepoError::MatchNotFound(item_id))?;

        if match_row.status != MatchStatus::Suggested {
            return Err(FlexError::MatchNotSuggested(match_row.id).into());
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let schedule_id = match_row.revenue_schedule_id;

        let mut active: deposit_line_matches::ActiveModel = match_row.into();
        active.status = Set(MatchStatus::Applied);
        active.update(&txn).await?;

        // The line's status graduates from Suggested to completeness-based.
        if let Some(line) = deposit_line_items::Entity::find_by_id(line_item_id)
            .one(&txn)
            .await?
        {
            let amounts = LineAmounts {
                usage: line.usage,
                usage_allocated: line.usage_allocated,
                usage_unallocated: line.usage_unallocated,
                commission: line.commission,
                commission_allocated: line.commission_allocated,
                commission_unallocated: line.commission_unallocated,
            };
            let status = AllocationEngine::status_for(&amounts);
            let mut active: deposit_line_items::ActiveModel = line.into();
            active.status = Set(status.into());
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        if let Some(schedule) = revenue_schedules::Entity::find_by_id(schedule_id)
            .one(&txn)
            .await?
        {
            if schedule.status != ScheduleStatus::Allocated {
                let mut active: revenue_schedules::ActiveModel = schedule.into();
                active.status = Set(ScheduleStatus::Allocated);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        let mut active: flex_review_items::ActiveModel = item.into();
        active.status = Set(FlexReviewStatus::Approved);
        active.updated_at = Set(now);
        let item = active.update(&txn).await?;

        txn.commit().await?;

        info!(item_id = %item.id, "review item approved and applied");
        Ok(item)
    }

    /// Resolves an over-tolerance or chargeback dispute on a schedule.
    ///
    /// `Adjust` corrects the schedule's rate/amount, executes an adjustment
    /// child, and clears the dispute; `FlexProduct` marks the base and its
    /// flex children `in_dispute`; `ChargebackApprove` marks the base
    /// `in_dispute` and approves its open chargeback review items. With
    /// `apply_to_future`, the corrected rate propagates to every later
    /// schedule sharing the product within the opportunity.
    ///
    /// # Errors
    ///
    /// Returns `FlexError::CorrectedRateRequired` when the action or the
    /// propagation needs a rate that was not supplied.
    pub async fn resolve(
        &self,
        tenant_id: Uuid,
        schedule_id: Uuid,
        action: FlexAction,
        corrected_rate: Option<Decimal>,
        apply_to_future: bool,
    ) -> Result<FlexResolutionOutcome, FlexRepoError> {
        let plan = VarianceResolver::resolution_plan(action);
        if (plan.creates_adjustment || apply_to_future) && corrected_rate.is_none() {
            return Err(FlexError::CorrectedRateRequired.into());
        }

        let txn = self.db.begin().await?;

        let base = revenue_schedules::Entity::find_by_id(schedule_id)
            .filter(revenue_schedules::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await?
            .ok_or(FlexRepoError::ScheduleNotFound(schedule_id))?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut disputed_schedule_ids = Vec::new();
        let mut adjustment_schedule_id = None;

        if let Some(children_status) = plan.children_billing_status {
            let children = revenue_schedules::Entity::find()
                .filter(revenue_schedules::Column::ParentRevenueScheduleId.eq(base.id))
                .filter(revenue_schedules::Column::FlexClassification.is_not_null())
                .all(&txn)
                .await?;
            for child in children {
                disputed_schedule_ids.push(child.id);
                let mut active: revenue_schedules::ActiveModel = child.into();
                active.billing_status = Set(children_status.into());
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        if action == FlexAction::ChargebackApprove {
            let open_items = flex_review_items::Entity::find()
                .filter(flex_review_items::Column::TenantId.eq(tenant_id))
                .filter(flex_review_items::Column::RevenueScheduleId.eq(base.id))
                .filter(flex_review_items::Column::Status.eq(FlexReviewStatus::Open))
                .filter(
                    flex_review_items::Column::FlexClassification
                        .eq(FlexClassification::Chargeback),
                )
                .all(&txn)
                .await?;
            for item in open_items {
                let mut active: flex_review_items::ActiveModel = item.into();
                active.status = Set(FlexReviewStatus::Approved);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        let mut corrected_commission = None;
        if plan.creates_adjustment {
            // Checked above; never defaults in practice.
            let rate = corrected_rate.unwrap_or_default();
            let corrected = base.expected_usage * rate;
            let delta = corrected - base.expected_commission;
            if !delta.is_zero() {
                let child = create_adjustment_child(
                    &txn,
                    &base,
                    Decimal::ZERO,
                    delta,
                    FlexClassification::OverTolerance,
                    true,
                )
                .await?;
                adjustment_schedule_id = Some(child.id);
            }
            corrected_commission = Some(corrected);
        }

        let base_id = base.id;
        let base_billing: BillingStatus = plan.base_billing_status.into();
        if base_billing == BillingStatus::InDispute {
            disputed_schedule_ids.push(base_id);
        }
        let (opportunity_id, product_id, base_date) =
            (base.opportunity_id, base.product_id, base.schedule_date);

        let mut active: revenue_schedules::ActiveModel = base.into();
        active.billing_status = Set(base_billing);
        if let Some(corrected) = corrected_commission {
            active.expected_commission = Set(corrected);
            active.commission_rate = Set(corrected_rate);
        }
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let mut future_schedule_ids = Vec::new();
        if apply_to_future {
            // Checked above; never defaults in practice.
            let rate = corrected_rate.unwrap_or_default();
            let futures = revenue_schedules::Entity::find()
                .filter(revenue_schedules::Column::TenantId.eq(tenant_id))
                .filter(revenue_schedules::Column::OpportunityId.eq(opportunity_id))
                .filter(revenue_schedules::Column::ProductId.eq(product_id))
                .filter(revenue_schedules::Column::ScheduleDate.gt(base_date))
                .filter(revenue_schedules::Column::DeletedAt.is_null())
                .filter(revenue_schedules::Column::FlexClassification.is_null())
                .order_by_asc(revenue_schedules::Column::ScheduleDate)
                .all(&txn)
                .await?;
            for schedule in futures {
                future_schedule_ids.push(schedule.id);
                let corrected = schedule.expected_usage * rate;
                let mut active: revenue_schedules::ActiveModel = schedule.into();
                active.expected_commission = Set(corrected);
                active.commission_rate = Set(corrected_rate);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        txn.commit().await?;

        info!(
            schedule_id = %base_id,
            action = ?action,
            futures = future_schedule_ids.len(),
            "flex dispute resolved"
        );

        Ok(FlexResolutionOutcome {
            base_schedule_id: base_id,
            adjustment_schedule_id,
            disputed_schedule_ids,
            future_schedule_ids,
        })
    }
}
