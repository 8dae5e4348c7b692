//! Settings repository: the per-tenant/per-user settings collaborator.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use rivena_core::settings::{EngineSettings, MatchingMode};

use crate::entities::tenant_settings;

/// Tenant-level variance tolerance (fraction, e.g. "0.05").
pub const VARIANCE_TOLERANCE_KEY: &str = "variance_tolerance";
/// Tenant-level matching engine mode ("legacy" | "hierarchical").
pub const ENGINE_MODE_KEY: &str = "engine_mode";

fn suggested_confidence_key(user_id: Uuid) -> String {
    format!("suggested_min_confidence:{user_id}")
}

fn auto_match_confidence_key(user_id: Uuid) -> String {
    format!("auto_match_min_confidence:{user_id}")
}

/// Settings repository. Values are plain key/value rows; unknown or
/// unparseable values fall back to the engine defaults.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    db: DatabaseConnection,
}

impl SettingsRepository {
    /// Creates a new settings repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolves the engine settings for one tenant/user pair.
    ///
    /// # Errors
    ///
    /// Returns a database error if the lookup fails.
    pub async fn engine_settings(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<EngineSettings, DbErr> {
        let suggested_key = suggested_confidence_key(user_id);
        let auto_key = auto_match_confidence_key(user_id);

        let rows = tenant_settings::Entity::find()
            .filter(tenant_settings::Column::TenantId.eq(tenant_id))
            .filter(tenant_settings::Column::Key.is_in([
                VARIANCE_TOLERANCE_KEY.to_string(),
                ENGINE_MODE_KEY.to_string(),
                suggested_key.clone(),
                auto_key.clone(),
            ]))
            .all(&self.db)
            .await?;

        let values: HashMap<String, String> =
            rows.into_iter().map(|r| (r.key, r.value)).collect();

        let defaults = EngineSettings::default();
        Ok(EngineSettings {
            variance_tolerance: parse_decimal(values.get(VARIANCE_TOLERANCE_KEY))
                .unwrap_or(defaults.variance_tolerance),
            suggested_min_confidence: parse_decimal(values.get(&suggested_key))
                .unwrap_or(defaults.suggested_min_confidence),
            auto_match_min_confidence: parse_decimal(values.get(&auto_key))
                .unwrap_or(defaults.auto_match_min_confidence),
            engine_mode: values
                .get(ENGINE_MODE_KEY)
                .and_then(|v| MatchingMode::from_str(v).ok())
                .unwrap_or(defaults.engine_mode),
        })
    }

    /// Upserts one setting value.
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn set(&self, tenant_id: Uuid, key: &str, value: &str) -> Result<(), DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let existing = tenant_settings::Entity::find()
            .filter(tenant_settings::Column::TenantId.eq(tenant_id))
            .filter(tenant_settings::Column::Key.eq(key))
            .one(&self.db)
            .await?;

        match existing {
            Some(row) => {
                let mut active: tenant_settings::ActiveModel = row.into();
                active.value = Set(value.to_string());
                active.updated_at = Set(now);
                active.update(&self.db).await?;
            }
            None => {
                tenant_settings::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(tenant_id),
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                    updated_at: Set(now),
                }
                .insert(&self.db)
                .await?;
            }
        }
        Ok(())
    }
}

fn parse_decimal(value: Option<&String>) -> Option<Decimal> {
    value.and_then(|v| Decimal::from_str(v.trim()).ok())
}
