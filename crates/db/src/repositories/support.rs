//! Shared persistence helpers for flex side effects.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{
    deposit_line_matches, flex_review_items, revenue_schedules,
    sea_orm_active_enums::{BillingStatus, FlexClassification, FlexReviewStatus, MatchStatus, ScheduleStatus},
};

/// Creates a flex adjustment child schedule under `base`.
pub(crate) async fn create_adjustment_child(
    txn: &DatabaseTransaction,
    base: &revenue_schedules::Model,
    usage_delta: Decimal,
    commission_delta: Decimal,
    classification: FlexClassification,
    executed: bool,
) -> Result<revenue_schedules::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    revenue_schedules::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(base.tenant_id),
        opportunity_id: Set(base.opportunity_id),
        product_id: Set(base.product_id),
        account_id: Set(base.account_id),
        schedule_date: Set(base.schedule_date),
        expected_usage: Set(usage_delta),
        expected_commission: Set(commission_delta),
        commission_rate: Set(base.commission_rate),
        status: Set(if executed {
            ScheduleStatus::Executed
        } else {
            ScheduleStatus::Pending
        }),
        billing_status: Set(BillingStatus::Open),
        flex_classification: Set(Some(classification)),
        parent_revenue_schedule_id: Set(Some(base.id)),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
}

/// Creates an open review queue item.
pub(crate) async fn create_review_item(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    deposit_id: Option<Uuid>,
    deposit_line_item_id: Option<Uuid>,
    revenue_schedule_id: Uuid,
    classification: FlexClassification,
    reason_code: &str,
) -> Result<flex_review_items::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    flex_review_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        deposit_id: Set(deposit_id),
        deposit_line_item_id: Set(deposit_line_item_id),
        revenue_schedule_id: Set(revenue_schedule_id),
        flex_classification: Set(classification),
        flex_reason_code: Set(reason_code.to_string()),
        status: Set(FlexReviewStatus::Open),
        assigned_to_user_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
}

/// Counts applied matches referencing a schedule.
pub(crate) async fn applied_match_count(
    txn: &DatabaseTransaction,
    revenue_schedule_id: Uuid,
) -> Result<u64, DbErr> {
    deposit_line_matches::Entity::find()
        .filter(deposit_line_matches::Column::RevenueScheduleId.eq(revenue_schedule_id))
        .filter(deposit_line_matches::Column::Status.eq(MatchStatus::Applied))
        .count(txn)
        .await
}
