//! `SeaORM` Entity for the flex review items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{FlexClassification, FlexReviewStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "flex_review_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub deposit_id: Option<Uuid>,
    pub deposit_line_item_id: Option<Uuid>,
    pub revenue_schedule_id: Uuid,
    pub flex_classification: FlexClassification,
    pub flex_reason_code: String,
    pub status: FlexReviewStatus,
    pub assigned_to_user_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::revenue_schedules::Entity",
        from = "Column::RevenueScheduleId",
        to = "super::revenue_schedules::Column::Id"
    )]
    RevenueSchedules,
}

impl Related<super::revenue_schedules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RevenueSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
