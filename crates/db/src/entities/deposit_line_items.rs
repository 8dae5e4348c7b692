//! `SeaORM` Entity for the deposit line items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::LineItemStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deposit_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub deposit_id: Uuid,
    pub account_name_raw: String,
    pub vendor_name_raw: String,
    pub distributor_name_raw: String,
    pub product_name_raw: String,
    pub usage: Decimal,
    pub usage_allocated: Decimal,
    pub usage_unallocated: Decimal,
    pub commission: Decimal,
    pub commission_allocated: Decimal,
    pub commission_unallocated: Decimal,
    pub commission_rate: Option<Decimal>,
    pub status: LineItemStatus,
    pub primary_revenue_schedule_id: Option<Uuid>,
    pub reconciled: bool,
    pub reconciled_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deposits::Entity",
        from = "Column::DepositId",
        to = "super::deposits::Column::Id"
    )]
    Deposits,
    #[sea_orm(has_many = "super::deposit_line_matches::Entity")]
    DepositLineMatches,
}

impl Related<super::deposits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposits.def()
    }
}

impl Related<super::deposit_line_matches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositLineMatches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
