//! Matching repository: read-only candidate search and auto-match preview.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use rivena_core::matching::{
    find_candidates, normalize_name, strategy_for, LineSnapshot, MatchCandidate, MatchContext,
    MatchType, ScheduleSnapshot,
};
use rivena_core::settings::EngineSettings;

use crate::entities::{
    accounts, deposit_line_items, deposits, products, revenue_schedules,
    sea_orm_active_enums::{LineItemStatus, ScheduleStatus},
};

/// Error types for candidate search.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// Line item not found.
    #[error("Deposit line item not found: {0}")]
    LineNotFound(Uuid),

    /// Deposit not found.
    #[error("Deposit not found: {0}")]
    DepositNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl MatchingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::LineNotFound(_) | Self::DepositNotFound(_) => 404,
            Self::Database(_) => 500,
        }
    }
}

/// One accepted auto-match pairing from a preview.
#[derive(Debug, Clone)]
pub struct AutoMatchPairing {
    /// The unmatched line.
    pub line_item_id: Uuid,
    /// The selected schedule.
    pub revenue_schedule_id: Uuid,
    /// Confidence of the selected candidate.
    pub confidence: Decimal,
    /// Tier/mode tag of the selected candidate.
    pub match_type: MatchType,
}

/// Matching repository. All operations are read-only and may run concurrently
/// with mutations; Postgres MVCC keeps them off half-applied allocations.
#[derive(Debug, Clone)]
pub struct MatchingRepository {
    db: DatabaseConnection,
}

impl MatchingRepository {
    /// Creates a new matching repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ranked candidates for one line under the caller's settings.
    ///
    /// Uses the suggestion-display confidence floor; the auto-match runner
    /// uses its own floor via [`Self::auto_match_preview`].
    ///
    /// # Errors
    ///
    /// Returns `MatchingError::LineNotFound` / `DepositNotFound` when the
    /// references are stale.
    pub async fn candidates_for_line(
        &self,
        tenant_id: Uuid,
        line_id: Uuid,
        settings: &EngineSettings,
        include_future_schedules: bool,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        let line = deposit_line_items::Entity::find_by_id(line_id)
            .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(MatchingError::LineNotFound(line_id))?;

        let snapshot = self.line_snapshot(tenant_id, &line).await?;
        let schedules = self
            .schedule_snapshots(tenant_id, &snapshot.account_name_raw)
            .await?;

        let strategy = strategy_for(settings.engine_mode);
        let ctx = MatchContext {
            include_future_schedules,
            min_confidence: settings.suggested_min_confidence,
        };

        Ok(find_candidates(strategy.as_ref(), &snapshot, &schedules, &ctx))
    }

    /// Computes auto-match pairings for every unmatched line of a deposit.
    ///
    /// Read-only: selection is re-run by the apply path before anything is
    /// persisted. Uses the auto-match confidence floor, which is distinct
    /// from the suggestion-display floor.
    pub async fn auto_match_preview(
        &self,
        tenant_id: Uuid,
        deposit_id: Uuid,
        settings: &EngineSettings,
    ) -> Result<Vec<AutoMatchPairing>, MatchingError> {
        let deposit = deposits::Entity::find_by_id(deposit_id)
            .filter(deposits::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(MatchingError::DepositNotFound(deposit_id))?;

        let lines = deposit_line_items::Entity::find()
            .filter(deposit_line_items::Column::TenantId.eq(tenant_id))
            .filter(deposit_line_items::Column::DepositId.eq(deposit_id))
            .filter(deposit_line_items::Column::Status.eq(LineItemStatus::Unmatched))
            .order_by_asc(deposit_line_items::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let strategy = strategy_for(settings.engine_mode);
        let ctx = MatchContext {
            include_future_schedules: false,
            min_confidence: settings.auto_match_min_confidence,
        };

        let mut pairings = Vec::new();
        for line in lines {
            let snapshot = LineSnapshot {
                id: line.id,
                account_name_raw: line.account_name_raw.clone(),
                product_name_raw: line.product_name_raw.clone(),
                usage: line.usage,
                commission: line.commission,
                deposit_month: deposit.month,
            };
            let schedules = self
                .schedule_snapshots(tenant_id, &snapshot.account_name_raw)
                .await?;
            let candidates = find_candidates(strategy.as_ref(), &snapshot, &schedules, &ctx);
            if let Some(best) = candidates.first() {
                pairings.push(AutoMatchPairing {
                    line_item_id: line.id,
                    revenue_schedule_id: best.schedule_id,
                    confidence: best.confidence,
                    match_type: best.match_type,
                });
            }
        }

        Ok(pairings)
    }

    async fn line_snapshot(
        &self,
        tenant_id: Uuid,
        line: &deposit_line_items::Model,
    ) -> Result<LineSnapshot, MatchingError> {
        let deposit = deposits::Entity::find_by_id(line.deposit_id)
            .filter(deposits::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(MatchingError::DepositNotFound(line.deposit_id))?;

        Ok(LineSnapshot {
            id: line.id,
            account_name_raw: line.account_name_raw.clone(),
            product_name_raw: line.product_name_raw.clone(),
            usage: line.usage,
            commission: line.commission,
            deposit_month: deposit.month,
        })
    }

    /// Loads schedule snapshots for the accounts whose LEGAL name matches the
    /// raw line account name. Soft-deleted, closed, and flex-child schedules
    /// are never candidates.
    async fn schedule_snapshots(
        &self,
        tenant_id: Uuid,
        account_name_raw: &str,
    ) -> Result<Vec<ScheduleSnapshot>, MatchingError> {
        let wanted = normalize_name(account_name_raw);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let matching_accounts: Vec<accounts::Model> = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id))
            .all(&self.db)
            .await?
            .into_iter()
            .filter(|a| normalize_name(&a.legal_name) == wanted)
            .collect();

        if matching_accounts.is_empty() {
            return Ok(Vec::new());
        }

        let legal_names: HashMap<Uuid, String> = matching_accounts
            .iter()
            .map(|a| (a.id, a.legal_name.clone()))
            .collect();
        let account_ids: Vec<Uuid> = matching_accounts.iter().map(|a| a.id).collect();

        let rows = revenue_schedules::Entity::find()
            .find_also_related(products::Entity)
            .filter(revenue_schedules::Column::TenantId.eq(tenant_id))
            .filter(revenue_schedules::Column::AccountId.is_in(account_ids))
            .filter(revenue_schedules::Column::DeletedAt.is_null())
            .filter(revenue_schedules::Column::FlexClassification.is_null())
            .filter(revenue_schedules::Column::Status.ne(ScheduleStatus::Closed))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(schedule, product)| ScheduleSnapshot {
                id: schedule.id,
                account_id: schedule.account_id,
                account_legal_name: legal_names
                    .get(&schedule.account_id)
                    .cloned()
                    .unwrap_or_default(),
                product_name: product.map(|p| p.name).unwrap_or_default(),
                schedule_date: schedule.schedule_date,
                expected_usage: schedule.expected_usage,
                expected_commission: schedule.expected_commission,
            })
            .collect())
    }
}
