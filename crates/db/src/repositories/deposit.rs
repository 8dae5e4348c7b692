//! Deposit repository: import ingestion and lifecycle transitions.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use tracing::info;
use uuid::Uuid;

use rivena_core::import::{
    normalize, ColumnMapping, DepositMetadata, ImportError, ImportTable,
};
use rivena_core::lifecycle::{LifecycleAction, LifecycleError, LifecycleService};
use rivena_shared::types::PageRequest;

use crate::entities::{
    deposit_line_items, deposit_line_matches, deposits, import_templates, revenue_schedules,
    sea_orm_active_enums::{BillingStatus, DepositStatus, LineItemStatus, MatchStatus},
};

/// Error types for deposit operations.
#[derive(Debug, thiserror::Error)]
pub enum DepositError {
    /// Deposit not found.
    #[error("Deposit not found: {0}")]
    NotFound(Uuid),

    /// Import template not found.
    #[error("Import template not found: {0}")]
    TemplateNotFound(Uuid),

    /// Upload normalization failed.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Lifecycle transition rejected.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DepositError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::TemplateNotFound(_) => 404,
            Self::Import(e) => e.http_status_code(),
            Self::Lifecycle(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }
}

/// Result of an import request.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// The created (or replayed) deposit id.
    pub deposit_id: Uuid,
    /// Number of line items on the deposit.
    pub line_count: u64,
    /// Summary/junk rows filtered during normalization (0 on replay).
    pub skipped_rows: usize,
    /// True when an idempotency-key replay returned the prior deposit.
    pub idempotent: bool,
}

/// Deposit repository.
#[derive(Debug, Clone)]
pub struct DepositRepository {
    db: DatabaseConnection,
}

impl DepositRepository {
    /// Creates a new deposit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Imports an upload as a deposit with line items.
    ///
    /// Idempotency is enforced by the unique `(tenant_id, idempotency_key)`
    /// index plus a read path: resubmission returns the prior deposit flagged
    /// `idempotent = true`, including when a concurrent duplicate wins the
    /// insert race.
    ///
    /// # Errors
    ///
    /// Returns `DepositError::Import` on normalization failures and
    /// `DepositError::TemplateNotFound` when asked to persist a mapping into
    /// a template that does not exist.
    pub async fn import(
        &self,
        tenant_id: Uuid,
        created_by: Uuid,
        table: &ImportTable,
        mapping: &ColumnMapping,
        metadata: &DepositMetadata,
    ) -> Result<ImportOutcome, DepositError> {
        if let Some(key) = metadata.idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(tenant_id, key).await? {
                return Ok(self.replay_outcome(existing).await?);
            }
        }

        let normalized = normalize(table, mapping, metadata)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let deposit_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let deposit = deposits::ActiveModel {
            id: Set(deposit_id),
            tenant_id: Set(tenant_id),
            account_id: Set(None),
            distributor_name: Set(metadata.distributor_name.clone()),
            vendor_name: Set(metadata.vendor_name.clone()),
            month: Set(normalized.month),
            payment_date: Set(normalized.payment_date),
            deposit_name: Set(metadata.deposit_name.clone()),
            payment_type: Set(metadata.payment_type.clone()),
            status: Set(DepositStatus::Pending),
            reconciled: Set(false),
            reconciled_at: Set(None),
            idempotency_key: Set(metadata.idempotency_key.clone()),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let deposit = match deposit.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                txn.rollback().await.ok();
                // Lost a concurrent duplicate-submission race: replay.
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    if let Some(key) = metadata.idempotency_key.as_deref() {
                        if let Some(existing) =
                            self.find_by_idempotency_key(tenant_id, key).await?
                        {
                            return Ok(self.replay_outcome(existing).await?);
                        }
                    }
                }
                return Err(e.into());
            }
        };

        let line_models: Vec<deposit_line_items::ActiveModel> = normalized
            .lines
            .iter()
            .map(|line| deposit_line_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant_id),
                deposit_id: Set(deposit.id),
                account_name_raw: Set(line.account_name_raw.clone()),
                vendor_name_raw: Set(line.vendor_name_raw.clone()),
                distributor_name_raw: Set(line.distributor_name_raw.clone()),
                product_name_raw: Set(line.product_name_raw.clone()),
                usage: Set(line.usage),
                usage_allocated: Set(Decimal::ZERO),
                usage_unallocated: Set(line.usage),
                commission: Set(line.commission),
                commission_allocated: Set(Decimal::ZERO),
                commission_unallocated: Set(line.commission),
                commission_rate: Set(line.commission_rate),
                status: Set(LineItemStatus::Unmatched),
                primary_revenue_schedule_id: Set(None),
                reconciled: Set(false),
                reconciled_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .collect();

        let line_count = line_models.len() as u64;
        if !line_models.is_empty() {
            deposit_line_items::Entity::insert_many(line_models)
                .exec(&txn)
                .await?;
        }

        if metadata.save_template_mapping {
            if let Some(template_id) = metadata.template_id {
                self.persist_template_mapping(&txn, tenant_id, template_id, mapping)
                    .await?;
            }
        }

        txn.commit().await?;

        info!(
            deposit_id = %deposit.id,
            lines = line_count,
            skipped = normalized.skipped_rows,
            "deposit imported"
        );

        Ok(ImportOutcome {
            deposit_id: deposit.id,
            line_count,
            skipped_rows: normalized.skipped_rows,
            idempotent: false,
        })
    }

    async fn persist_template_mapping(
        &self,
        txn: &DatabaseTransaction,
        tenant_id: Uuid,
        template_id: Uuid,
        mapping: &ColumnMapping,
    ) -> Result<(), DepositError> {
        let template = import_templates::Entity::find_by_id(template_id)
            .filter(import_templates::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await?
            .ok_or(DepositError::TemplateNotFound(template_id))?;

        let mut active: import_templates::ActiveModel = template.into();
        active.column_mappings = Set(serde_json::to_value(mapping).unwrap_or_default());
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await?;
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Option<deposits::Model>, DbErr> {
        deposits::Entity::find()
            .filter(deposits::Column::TenantId.eq(tenant_id))
            .filter(deposits::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
    }

    async fn replay_outcome(&self, deposit: deposits::Model) -> Result<ImportOutcome, DbErr> {
        let line_count = deposit_line_items::Entity::find()
            .filter(deposit_line_items::Column::DepositId.eq(deposit.id))
            .count(&self.db)
            .await?;
        Ok(ImportOutcome {
            deposit_id: deposit.id,
            line_count,
            skipped_rows: 0,
            idempotent: true,
        })
    }

    /// Fetches a deposit by id, tenant-scoped.
    ///
    /// # Errors
    ///
    /// Returns `DepositError::NotFound` if absent.
    pub async fn get(&self, tenant_id: Uuid, deposit_id: Uuid) -> Result<deposits::Model, DepositError> {
        deposits::Entity::find_by_id(deposit_id)
            .filter(deposits::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(DepositError::NotFound(deposit_id))
    }

    /// Fetches a deposit's line items in import order.
    pub async fn lines(
        &self,
        tenant_id: Uuid,
        deposit_id: Uuid,
    ) -> Result<Vec<deposit_line_items::Model>, DepositError> {
        Ok(deposit_line_items::Entity::find()
            .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
            .filter(deposit_line_items::Column::DepositId.eq(deposit_id))
            .order_by_asc(deposit_line_items::Column::CreatedAt)
            .order_by_asc(deposit_line_items::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Lists deposits for a tenant, newest first.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        status: Option<DepositStatus>,
        page: &PageRequest,
    ) -> Result<(Vec<deposits::Model>, u64), DepositError> {
        let mut query = deposits::Entity::find()
            .filter(deposits::Column::TenantId.eq(tenant_id));
        if let Some(status) = status {
            query = query.filter(deposits::Column::Status.eq(status));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(deposits::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Finalizes a deposit: locks the deposit, its lines, and the schedules
    /// matched by its lines, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::AlreadyFinalized` (as a conflict) when the
    /// deposit status is already `Completed` - the `reconciled` flag is not
    /// consulted.
    pub async fn finalize(
        &self,
        tenant_id: Uuid,
        deposit_id: Uuid,
        user_id: Uuid,
    ) -> Result<deposits::Model, DepositError> {
        let deposit = self.get(tenant_id, deposit_id).await?;
        let action =
            LifecycleService::finalize(deposit.status.clone().into(), deposit.reconciled, user_id)?;
        self.apply_lifecycle(deposit, &action).await
    }

    /// Reopens a finalized deposit: the exact inverse of finalize.
    pub async fn unfinalize(
        &self,
        tenant_id: Uuid,
        deposit_id: Uuid,
        user_id: Uuid,
    ) -> Result<deposits::Model, DepositError> {
        let deposit = self.get(tenant_id, deposit_id).await?;
        let action = LifecycleService::unfinalize(deposit.status.clone().into(), user_id)?;
        self.apply_lifecycle(deposit, &action).await
    }

    async fn apply_lifecycle(
        &self,
        deposit: deposits::Model,
        action: &LifecycleAction,
    ) -> Result<deposits::Model, DepositError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let reconciled = action.reconciled();
        let reconciled_at: Option<DateTimeWithTimeZone> =
            action.reconciled_at().map(Into::into);
        let deposit_id = deposit.id;

        let txn = self.db.begin().await?;

        let mut active: deposits::ActiveModel = deposit.into();
        active.status = Set(action.new_status().into());
        active.reconciled = Set(reconciled);
        active.reconciled_at = Set(reconciled_at);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        deposit_line_items::Entity::update_many()
            .col_expr(deposit_line_items::Column::Reconciled, Expr::value(reconciled))
            .col_expr(
                deposit_line_items::Column::ReconciledAt,
                Expr::value(reconciled_at),
            )
            .col_expr(deposit_line_items::Column::UpdatedAt, Expr::value(now))
            .filter(deposit_line_items::Column::DepositId.eq(deposit_id))
            .exec(&txn)
            .await?;

        let billing_status = if reconciled {
            BillingStatus::Reconciled
        } else {
            BillingStatus::Open
        };
        for schedule in self.matched_schedules(&txn, deposit_id).await? {
            let mut active: revenue_schedules::ActiveModel = schedule.into();
            active.billing_status = Set(billing_status.clone());
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;

        info!(
            deposit_id = %deposit_id,
            status = ?updated.status,
            reconciled,
            "deposit lifecycle transition applied"
        );

        Ok(updated)
    }

    /// Schedules holding applied matches from this deposit's lines.
    async fn matched_schedules(
        &self,
        txn: &DatabaseTransaction,
        deposit_id: Uuid,
    ) -> Result<Vec<revenue_schedules::Model>, DbErr> {
        let line_ids: Vec<Uuid> = deposit_line_items::Entity::find()
            .filter(deposit_line_items::Column::DepositId.eq(deposit_id))
            .all(txn)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();

        if line_ids.is_empty() {
            return Ok(Vec::new());
        }

        let schedule_ids: Vec<Uuid> = deposit_line_matches::Entity::find()
            .filter(deposit_line_matches::Column::DepositLineItemId.is_in(line_ids))
            .filter(deposit_line_matches::Column::Status.eq(MatchStatus::Applied))
            .all(txn)
            .await?
            .into_iter()
            .map(|m| m.revenue_schedule_id)
            .collect();

        if schedule_ids.is_empty() {
            return Ok(Vec::new());
        }

        revenue_schedules::Entity::find()
            .filter(revenue_schedules::Column::Id.is_in(schedule_ids))
            .all(txn)
            .await
    }
}
