//! `SeaORM` Entity for the deposits table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::DepositStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deposits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub account_id: Option<Uuid>,
    pub distributor_name: String,
    pub vendor_name: String,
    /// First day of the deposit's month window.
    pub month: Date,
    pub payment_date: DateTime,
    pub deposit_name: String,
    pub payment_type: Option<String>,
    pub status: DepositStatus,
    /// Set by finalize; `status` stays the canonical finalized signal.
    pub reconciled: bool,
    pub reconciled_at: Option<DateTimeWithTimeZone>,
    /// Client idempotency key, unique per tenant.
    pub idempotency_key: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::deposit_line_items::Entity")]
    DepositLineItems,
}

impl Related<super::deposit_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
