//! Rivena development seeder.
//!
//! Seeds one demo tenant with reference data the reconciliation flow needs:
//! accounts whose display and legal names differ, products, an opportunity,
//! three months of revenue schedules, and engine settings.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::info;
use uuid::Uuid;

use rivena_db::entities::{accounts, opportunities, products, revenue_schedules};
use rivena_db::entities::sea_orm_active_enums::{BillingStatus, ScheduleStatus};
use rivena_db::repositories::settings::{ENGINE_MODE_KEY, VARIANCE_TOLERANCE_KEY};
use rivena_db::SettingsRepository;
use rivena_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::load()?;
    let db = rivena_db::connect(&config.database.url).await?;

    let tenant_id = Uuid::new_v4();
    info!(%tenant_id, "seeding demo tenant");

    let account_id = seed_account(&db, tenant_id, "Initech", "Initech LLC").await?;
    seed_account(&db, tenant_id, "Globex", "Globex Corporation").await?;

    let product_id = seed_product(&db, tenant_id, "WGT-100", "Widget Cloud").await?;
    seed_product(&db, tenant_id, "WGT-200", "Widget Analytics").await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let opportunity_id = Uuid::new_v4();
    opportunities::ActiveModel {
        id: Set(opportunity_id),
        tenant_id: Set(tenant_id),
        account_id: Set(account_id),
        name: Set("Initech renewal FY24".into()),
        created_at: Set(now),
    }
    .insert(&db)
    .await?;

    for month in 1..=3u32 {
        let date = NaiveDate::from_ymd_opt(2024, month, 15)
            .ok_or_else(|| anyhow::anyhow!("invalid seed date"))?;
        seed_schedule(&db, tenant_id, opportunity_id, product_id, account_id, date).await?;
    }

    let settings = SettingsRepository::new(db.clone());
    settings.set(tenant_id, VARIANCE_TOLERANCE_KEY, "0.05").await?;
    settings.set(tenant_id, ENGINE_MODE_KEY, "hierarchical").await?;

    info!(%tenant_id, "seed complete");
    println!("Seeded tenant: {tenant_id}");
    Ok(())
}

async fn seed_account(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    name: &str,
    legal_name: &str,
) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let id = Uuid::new_v4();
    accounts::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        name: Set(name.into()),
        legal_name: Set(legal_name.into()),
        account_type: Set(Some("customer".into())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

async fn seed_product(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    code: &str,
    name: &str,
) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let id = Uuid::new_v4();
    products::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        code: Set(code.into()),
        name: Set(name.into()),
        product_family: Set(Some("Widgets".into())),
        parent_product_id: Set(None),
        created_by_bundle: Set(false),
        created_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

async fn seed_schedule(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    opportunity_id: Uuid,
    product_id: Uuid,
    account_id: Uuid,
    date: NaiveDate,
) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let id = Uuid::new_v4();
    let expected_usage: Decimal = dec!(100);
    revenue_schedules::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        opportunity_id: Set(opportunity_id),
        product_id: Set(product_id),
        account_id: Set(account_id),
        schedule_date: Set(date),
        expected_usage: Set(expected_usage),
        expected_commission: Set(expected_usage * dec!(0.2)),
        commission_rate: Set(Some(dec!(0.2))),
        status: Set(ScheduleStatus::Pending),
        billing_status: Set(BillingStatus::Open),
        flex_classification: Set(None),
        parent_revenue_schedule_id: Set(None),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}
