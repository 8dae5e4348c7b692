//! Bundle repository: idempotent rip-and-replace apply and gated undo.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use rivena_core::bundle::{
    BundleError, BundleMode, BundlePlanner, LineForBundle, SiblingSchedule,
};

use super::support::applied_match_count;
use crate::entities::{
    bundle_operations, deposit_line_items, deposit_line_matches, products, revenue_schedules,
    sea_orm_active_enums::{BillingStatus, MatchStatus, ScheduleStatus},
};

/// Error types for bundle operations.
#[derive(Debug, thiserror::Error)]
pub enum BundleRepoError {
    /// Line item not found.
    #[error("Deposit line item not found: {0}")]
    LineNotFound(Uuid),

    /// Selected lines belong to different deposits.
    #[error("Selected line items belong to different deposits")]
    MixedDeposits,

    /// Revenue schedule not found.
    #[error("Revenue schedule not found: {0}")]
    ScheduleNotFound(Uuid),

    /// Bundle operation not found.
    #[error("Bundle operation not found: {0}")]
    OperationNotFound(Uuid),

    /// Bundle business rule rejected the operation.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BundleRepoError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::LineNotFound(_) | Self::ScheduleNotFound(_) | Self::OperationNotFound(_) => 404,
            Self::MixedDeposits => 400,
            Self::Bundle(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }
}

/// Input for a bundle apply request.
#[derive(Debug, Clone)]
pub struct BundleApplyInput {
    /// Selected deposit lines.
    pub line_item_ids: Vec<Uuid>,
    /// Schedule whose product gets ripped and replaced.
    pub base_revenue_schedule_id: Uuid,
    /// What happens to the replaced schedules.
    pub mode: BundleMode,
    /// Operator-supplied reason, recorded on the audit row.
    pub reason: String,
}

/// Result of a bundle apply (fresh or replayed).
#[derive(Debug, Clone)]
pub struct BundleApplyOutcome {
    /// The audit/idempotency row id.
    pub bundle_audit_log_id: Uuid,
    /// The created bundle product.
    pub created_product_id: Uuid,
    /// Created schedules, in creation order.
    pub created_revenue_schedule_ids: Vec<Uuid>,
    /// Created schedules grouped per source line.
    pub line_to_schedule_map: HashMap<Uuid, Vec<Uuid>>,
    /// True when an identical retry replayed the stored result.
    pub idempotent: bool,
}

/// Result of a bundle undo.
#[derive(Debug, Clone)]
pub struct BundleUndoOutcome {
    /// The audit row id.
    pub bundle_audit_log_id: Uuid,
    /// Schedules removed by the undo.
    pub removed_schedule_ids: Vec<Uuid>,
    /// Soft-deleted originals restored by the undo.
    pub restored_schedule_ids: Vec<Uuid>,
}

fn ids_from_json(value: &serde_json::Value) -> Vec<Uuid> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn map_from_json(value: &serde_json::Value) -> HashMap<Uuid, Vec<Uuid>> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// Bundle repository.
#[derive(Debug, Clone)]
pub struct BundleRepository {
    db: DatabaseConnection,
}

impl BundleRepository {
    /// Creates a new bundle repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies a rip-and-replace bundle operation.
    ///
    /// The operation key over (deposit, sorted lines, schedule, mode) is
    /// unique per tenant; identical retries replay the stored result - same
    /// audit id, same created schedule ids in the same order - without
    /// creating anything, including under concurrent duplicate submissions.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::AlreadyAllocated` / `UnsafeReplacement` as
    /// conflicts with no side effects.
    pub async fn apply(
        &self,
        tenant_id: Uuid,
        created_by: Uuid,
        input: &BundleApplyInput,
    ) -> Result<BundleApplyOutcome, BundleRepoError> {
        let lines = self.load_lines(tenant_id, &input.line_item_ids).await?;
        let deposit_id = Self::single_deposit_id(&lines)?;

        let operation_key = BundlePlanner::operation_key(
            deposit_id,
            &input.line_item_ids,
            input.base_revenue_schedule_id,
            input.mode,
        );
        if let Some(existing) = self.find_by_key(tenant_id, &operation_key).await? {
            return Ok(Self::replay(&existing));
        }

        let base = revenue_schedules::Entity::find_by_id(input.base_revenue_schedule_id)
            .filter(revenue_schedules::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(BundleRepoError::ScheduleNotFound(input.base_revenue_schedule_id))?;
        let product = products::Entity::find_by_id(base.product_id)
            .one(&self.db)
            .await?
            .ok_or(BundleRepoError::ScheduleNotFound(input.base_revenue_schedule_id))?;

        let txn = self.db.begin().await?;

        let mut lines_for_plan = Vec::with_capacity(lines.len());
        for line in &lines {
            let applied = deposit_line_matches::Entity::find()
                .filter(deposit_line_matches::Column::DepositLineItemId.eq(line.id))
                .filter(deposit_line_matches::Column::Status.eq(MatchStatus::Applied))
                .count(&txn)
                .await?;
            lines_for_plan.push(LineForBundle {
                id: line.id,
                product_name_raw: line.product_name_raw.clone(),
                usage: line.usage,
                commission: line.commission,
                has_applied_match: applied > 0,
            });
        }

        let window_models = revenue_schedules::Entity::find()
            .filter(revenue_schedules::Column::TenantId.eq(tenant_id))
            .filter(revenue_schedules::Column::OpportunityId.eq(base.opportunity_id))
            .filter(revenue_schedules::Column::ProductId.eq(base.product_id))
            .filter(revenue_schedules::Column::DeletedAt.is_null())
            .filter(revenue_schedules::Column::FlexClassification.is_null())
            .all(&txn)
            .await?;
        let mut window = Vec::with_capacity(window_models.len());
        for schedule in &window_models {
            window.push(SiblingSchedule {
                id: schedule.id,
                schedule_date: schedule.schedule_date,
                applied_match_count: applied_match_count(&txn, schedule.id).await?,
            });
        }

        let plan = BundlePlanner::plan(
            deposit_id,
            &lines_for_plan,
            base.id,
            &product.code,
            &product.name,
            &window,
            input.mode,
        )?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let bundle_product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            code: Set(plan.product_code.clone()),
            name: Set(plan.product_name.clone()),
            product_family: Set(product.product_family.clone()),
            parent_product_id: Set(Some(product.id)),
            created_by_bundle: Set(true),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut created_ids = Vec::with_capacity(plan.schedules.len());
        let mut line_to_schedule_map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for planned in &plan.schedules {
            let created = revenue_schedules::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant_id),
                opportunity_id: Set(base.opportunity_id),
                product_id: Set(bundle_product.id),
                account_id: Set(base.account_id),
                schedule_date: Set(planned.schedule_date),
                expected_usage: Set(planned.expected_usage),
                expected_commission: Set(planned.expected_commission),
                commission_rate: Set(base.commission_rate),
                status: Set(ScheduleStatus::Pending),
                billing_status: Set(BillingStatus::Open),
                flex_classification: Set(None),
                parent_revenue_schedule_id: Set(Some(base.id)),
                deleted_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created_ids.push(created.id);
            line_to_schedule_map
                .entry(planned.line_item_id)
                .or_default()
                .push(created.id);
        }

        for schedule_id in &plan.soft_delete_schedule_ids {
            if let Some(schedule) = revenue_schedules::Entity::find_by_id(*schedule_id)
                .one(&txn)
                .await?
            {
                let mut active: revenue_schedules::ActiveModel = schedule.into();
                active.deleted_at = Set(Some(now));
                active.status = Set(ScheduleStatus::Closed);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        let sorted_line_ids = {
            let mut ids = input.line_item_ids.clone();
            ids.sort();
            ids.dedup();
            ids
        };
        let operation = bundle_operations::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            operation_key: Set(plan.operation_key.clone()),
            deposit_id: Set(deposit_id),
            line_item_ids: Set(serde_json::to_value(&sorted_line_ids).unwrap_or_default()),
            base_revenue_schedule_id: Set(base.id),
            mode: Set(input.mode.into()),
            reason: Set(input.reason.clone()),
            created_product_id: Set(bundle_product.id),
            created_revenue_schedule_ids: Set(
                serde_json::to_value(&created_ids).unwrap_or_default()
            ),
            line_to_schedule_map: Set(
                serde_json::to_value(&line_to_schedule_map).unwrap_or_default()
            ),
            soft_deleted_schedule_ids: Set(
                serde_json::to_value(&plan.soft_delete_schedule_ids).unwrap_or_default()
            ),
            undone_at: Set(None),
            undo_reason: Set(None),
            created_by: Set(created_by),
            created_at: Set(now),
        };

        let operation = match operation.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                txn.rollback().await.ok();
                // Lost a concurrent duplicate-submission race: replay.
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    if let Some(existing) = self.find_by_key(tenant_id, &operation_key).await? {
                        return Ok(Self::replay(&existing));
                    }
                }
                return Err(e.into());
            }
        };

        txn.commit().await?;

        info!(
            bundle_audit_log_id = %operation.id,
            created = created_ids.len(),
            mode = ?input.mode,
            "bundle operation applied"
        );

        Ok(BundleApplyOutcome {
            bundle_audit_log_id: operation.id,
            created_product_id: bundle_product.id,
            created_revenue_schedule_ids: created_ids,
            line_to_schedule_map,
            idempotent: false,
        })
    }

    /// Undoes a bundle operation, gated on downstream allocation safety.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::UnsafeUndo` if any created schedule has since
    /// accumulated an applied match.
    pub async fn undo(
        &self,
        tenant_id: Uuid,
        bundle_audit_log_id: Uuid,
        reason: &str,
    ) -> Result<BundleUndoOutcome, BundleRepoError> {
        let operation = bundle_operations::Entity::find_by_id(bundle_audit_log_id)
            .filter(bundle_operations::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(BundleRepoError::OperationNotFound(bundle_audit_log_id))?;

        let created_ids = ids_from_json(&operation.created_revenue_schedule_ids);
        let restored_ids = ids_from_json(&operation.soft_deleted_schedule_ids);

        // Already undone: replay the recorded outcome.
        if operation.undone_at.is_some() {
            return Ok(BundleUndoOutcome {
                bundle_audit_log_id,
                removed_schedule_ids: created_ids,
                restored_schedule_ids: restored_ids,
            });
        }

        let txn = self.db.begin().await?;

        let mut created = Vec::with_capacity(created_ids.len());
        for schedule_id in &created_ids {
            let Some(schedule) = revenue_schedules::Entity::find_by_id(*schedule_id)
                .one(&txn)
                .await?
            else {
                continue;
            };
            created.push(SiblingSchedule {
                id: schedule.id,
                schedule_date: schedule.schedule_date,
                applied_match_count: applied_match_count(&txn, schedule.id).await?,
            });
        }
        BundlePlanner::validate_undo(&created)?;

        if !created_ids.is_empty() {
            // Suggested matches on the children go with them.
            deposit_line_matches::Entity::delete_many()
                .filter(
                    deposit_line_matches::Column::RevenueScheduleId.is_in(created_ids.clone()),
                )
                .exec(&txn)
                .await?;
            revenue_schedules::Entity::delete_many()
                .filter(revenue_schedules::Column::Id.is_in(created_ids.clone()))
                .exec(&txn)
                .await?;
        }

        products::Entity::delete_many()
            .filter(products::Column::Id.eq(operation.created_product_id))
            .exec(&txn)
            .await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        for schedule_id in &restored_ids {
            if let Some(schedule) = revenue_schedules::Entity::find_by_id(*schedule_id)
                .one(&txn)
                .await?
            {
                let mut active: revenue_schedules::ActiveModel = schedule.into();
                active.deleted_at = Set(None);
                active.status = Set(ScheduleStatus::Pending);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        let mut active: bundle_operations::ActiveModel = operation.into();
        active.undone_at = Set(Some(now));
        active.undo_reason = Set(Some(reason.to_string()));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            bundle_audit_log_id = %bundle_audit_log_id,
            removed = created_ids.len(),
            restored = restored_ids.len(),
            "bundle operation undone"
        );

        Ok(BundleUndoOutcome {
            bundle_audit_log_id,
            removed_schedule_ids: created_ids,
            restored_schedule_ids: restored_ids,
        })
    }

    async fn load_lines(
        &self,
        tenant_id: Uuid,
        line_item_ids: &[Uuid],
    ) -> Result<Vec<deposit_line_items::Model>, BundleRepoError> {
        let mut lines = Vec::with_capacity(line_item_ids.len());
        for line_id in line_item_ids {
            let line = deposit_line_items::Entity::find_by_id(*line_id)
                .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
                .one(&self.db)
                .await?
                .ok_or(BundleRepoError::LineNotFound(*line_id))?;
            lines.push(line);
        }
        Ok(lines)
    }

    fn single_deposit_id(
        lines: &[deposit_line_items::Model],
    ) -> Result<Uuid, BundleRepoError> {
        let mut deposit_ids: Vec<Uuid> = lines.iter().map(|l| l.deposit_id).collect();
        deposit_ids.sort();
        deposit_ids.dedup();
        match deposit_ids.as_slice() {
            [single] => Ok(*single),
            [] => Err(BundleError::NoLines.into()),
            _ => Err(BundleRepoError::MixedDeposits),
        }
    }

    async fn find_by_key(
        &self,
        tenant_id: Uuid,
        operation_key: &str,
    ) -> Result<Option<bundle_operations::Model>, DbErr> {
        bundle_operations::Entity::find()
            .filter(bundle_operations::Column::TenantId.eq(tenant_id))
            .filter(bundle_operations::Column::OperationKey.eq(operation_key))
            .one(&self.db)
            .await
    }

    fn replay(operation: &bundle_operations::Model) -> BundleApplyOutcome {
        BundleApplyOutcome {
            bundle_audit_log_id: operation.id,
            created_product_id: operation.created_product_id,
            created_revenue_schedule_ids: ids_from_json(
                &operation.created_revenue_schedule_ids,
            ),
            line_to_schedule_map: map_from_json(&operation.line_to_schedule_map),
            idempotent: true,
        }
    }
}
