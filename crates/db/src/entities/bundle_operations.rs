//! `SeaORM` Entity for the bundle operations audit table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BundleMode;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bundle_operations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Deterministic key over (deposit, sorted lines, schedule, mode);
    /// unique per tenant so identical retries replay the stored result.
    pub operation_key: String,
    pub deposit_id: Uuid,
    pub line_item_ids: Json,
    pub base_revenue_schedule_id: Uuid,
    pub mode: BundleMode,
    pub reason: String,
    pub created_product_id: Uuid,
    /// Created schedule ids, in creation order.
    pub created_revenue_schedule_ids: Json,
    pub line_to_schedule_map: Json,
    pub soft_deleted_schedule_ids: Json,
    pub undone_at: Option<DateTimeWithTimeZone>,
    pub undo_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
