//! `SeaORM` Entity for the deposit line matches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{MatchSource, MatchStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deposit_line_matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub deposit_line_item_id: Uuid,
    pub revenue_schedule_id: Uuid,
    pub usage_amount: Decimal,
    pub commission_amount: Decimal,
    pub status: MatchStatus,
    pub source: MatchSource,
    pub confidence_score: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deposit_line_items::Entity",
        from = "Column::DepositLineItemId",
        to = "super::deposit_line_items::Column::Id"
    )]
    DepositLineItems,
    #[sea_orm(
        belongs_to = "super::revenue_schedules::Entity",
        from = "Column::RevenueScheduleId",
        to = "super::revenue_schedules::Column::Id"
    )]
    RevenueSchedules,
}

impl Related<super::deposit_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositLineItems.def()
    }
}

impl Related<super::revenue_schedules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RevenueSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
