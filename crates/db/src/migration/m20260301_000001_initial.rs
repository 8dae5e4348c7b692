//! Initial database migration.
//!
//! Creates all enums, tables, and the unique indexes that back storage-level
//! idempotency (deposit import keys and bundle operation keys).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: REFERENCE DATA
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(PRODUCTS_SQL).await?;
        db.execute_unprepared(OPPORTUNITIES_SQL).await?;

        // ============================================================
        // PART 3: DEPOSITS & LINE ITEMS
        // ============================================================
        db.execute_unprepared(DEPOSITS_SQL).await?;
        db.execute_unprepared(DEPOSIT_LINE_ITEMS_SQL).await?;

        // ============================================================
        // PART 4: REVENUE SCHEDULES & MATCHES
        // ============================================================
        db.execute_unprepared(REVENUE_SCHEDULES_SQL).await?;
        db.execute_unprepared(DEPOSIT_LINE_MATCHES_SQL).await?;

        // ============================================================
        // PART 5: FLEX REVIEW & BUNDLES
        // ============================================================
        db.execute_unprepared(FLEX_REVIEW_ITEMS_SQL).await?;
        db.execute_unprepared(BUNDLE_OPERATIONS_SQL).await?;

        // ============================================================
        // PART 6: TEMPLATES, NOTIFICATIONS, SETTINGS
        // ============================================================
        db.execute_unprepared(IMPORT_TEMPLATES_SQL).await?;
        db.execute_unprepared(NOTIFICATIONS_SQL).await?;
        db.execute_unprepared(TENANT_SETTINGS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE deposit_status AS ENUM ('pending', 'in_review', 'completed');
CREATE TYPE line_item_status AS ENUM ('unmatched', 'suggested', 'partially_matched', 'matched');
CREATE TYPE schedule_status AS ENUM ('pending', 'allocated', 'executed', 'closed');
CREATE TYPE billing_status AS ENUM ('open', 'reconciled', 'in_dispute');
CREATE TYPE flex_classification AS ENUM ('within_tolerance', 'over_tolerance', 'chargeback');
CREATE TYPE match_status AS ENUM ('suggested', 'applied');
CREATE TYPE match_source AS ENUM ('manual', 'auto');
CREATE TYPE flex_review_status AS ENUM ('open', 'approved');
CREATE TYPE bundle_mode AS ENUM ('keep_old', 'soft_delete_old');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name TEXT NOT NULL,
    legal_name TEXT NOT NULL,
    account_type TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_accounts_tenant ON accounts (tenant_id);
CREATE INDEX idx_accounts_legal_name ON accounts (tenant_id, lower(legal_name));
";

const PRODUCTS_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    product_family TEXT,
    parent_product_id UUID REFERENCES products (id),
    created_by_bundle BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_products_tenant ON products (tenant_id);
";

const OPPORTUNITIES_SQL: &str = r"
CREATE TABLE opportunities (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts (id),
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_opportunities_tenant ON opportunities (tenant_id);
";

const DEPOSITS_SQL: &str = r"
CREATE TABLE deposits (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    account_id UUID REFERENCES accounts (id),
    distributor_name TEXT NOT NULL,
    vendor_name TEXT NOT NULL,
    month DATE NOT NULL,
    payment_date TIMESTAMP NOT NULL,
    deposit_name TEXT NOT NULL,
    payment_type TEXT,
    status deposit_status NOT NULL DEFAULT 'pending',
    reconciled BOOLEAN NOT NULL DEFAULT FALSE,
    reconciled_at TIMESTAMPTZ,
    idempotency_key TEXT,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_deposits_tenant ON deposits (tenant_id);
CREATE INDEX idx_deposits_status ON deposits (tenant_id, status);
-- Storage-level import idempotency.
CREATE UNIQUE INDEX uq_deposits_idempotency_key
    ON deposits (tenant_id, idempotency_key)
    WHERE idempotency_key IS NOT NULL;
";

const DEPOSIT_LINE_ITEMS_SQL: &str = r"
CREATE TABLE deposit_line_items (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    deposit_id UUID NOT NULL REFERENCES deposits (id),
    account_name_raw TEXT NOT NULL,
    vendor_name_raw TEXT NOT NULL,
    distributor_name_raw TEXT NOT NULL,
    product_name_raw TEXT NOT NULL,
    usage NUMERIC(18, 4) NOT NULL,
    usage_allocated NUMERIC(18, 4) NOT NULL DEFAULT 0,
    usage_unallocated NUMERIC(18, 4) NOT NULL,
    commission NUMERIC(18, 4) NOT NULL,
    commission_allocated NUMERIC(18, 4) NOT NULL DEFAULT 0,
    commission_unallocated NUMERIC(18, 4) NOT NULL,
    commission_rate NUMERIC(18, 6),
    status line_item_status NOT NULL DEFAULT 'unmatched',
    primary_revenue_schedule_id UUID,
    reconciled BOOLEAN NOT NULL DEFAULT FALSE,
    reconciled_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_usage_books CHECK (usage_allocated + usage_unallocated = usage),
    CONSTRAINT chk_commission_books CHECK (commission_allocated + commission_unallocated = commission)
);
CREATE INDEX idx_line_items_deposit ON deposit_line_items (deposit_id);
CREATE INDEX idx_line_items_tenant_status ON deposit_line_items (tenant_id, status);
";

const REVENUE_SCHEDULES_SQL: &str = r"
CREATE TABLE revenue_schedules (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    opportunity_id UUID NOT NULL REFERENCES opportunities (id),
    product_id UUID NOT NULL REFERENCES products (id),
    account_id UUID NOT NULL REFERENCES accounts (id),
    schedule_date DATE NOT NULL,
    expected_usage NUMERIC(18, 4) NOT NULL,
    expected_commission NUMERIC(18, 4) NOT NULL,
    commission_rate NUMERIC(18, 6),
    status schedule_status NOT NULL DEFAULT 'pending',
    billing_status billing_status NOT NULL DEFAULT 'open',
    flex_classification flex_classification,
    parent_revenue_schedule_id UUID REFERENCES revenue_schedules (id),
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_schedules_tenant_account ON revenue_schedules (tenant_id, account_id);
CREATE INDEX idx_schedules_tenant_date ON revenue_schedules (tenant_id, schedule_date);
CREATE INDEX idx_schedules_parent ON revenue_schedules (parent_revenue_schedule_id);
";

const DEPOSIT_LINE_MATCHES_SQL: &str = r"
CREATE TABLE deposit_line_matches (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    deposit_line_item_id UUID NOT NULL REFERENCES deposit_line_items (id),
    revenue_schedule_id UUID NOT NULL REFERENCES revenue_schedules (id),
    usage_amount NUMERIC(18, 4) NOT NULL,
    commission_amount NUMERIC(18, 4) NOT NULL,
    status match_status NOT NULL,
    source match_source NOT NULL,
    confidence_score NUMERIC(5, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_matches_line ON deposit_line_matches (deposit_line_item_id);
CREATE INDEX idx_matches_schedule ON deposit_line_matches (revenue_schedule_id);
CREATE INDEX idx_matches_schedule_status ON deposit_line_matches (revenue_schedule_id, status);
";

const FLEX_REVIEW_ITEMS_SQL: &str = r"
CREATE TABLE flex_review_items (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    deposit_id UUID REFERENCES deposits (id),
    deposit_line_item_id UUID REFERENCES deposit_line_items (id),
    revenue_schedule_id UUID NOT NULL REFERENCES revenue_schedules (id),
    flex_classification flex_classification NOT NULL,
    flex_reason_code TEXT NOT NULL,
    status flex_review_status NOT NULL DEFAULT 'open',
    assigned_to_user_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_flex_items_tenant_status ON flex_review_items (tenant_id, status);
CREATE INDEX idx_flex_items_schedule ON flex_review_items (revenue_schedule_id);
";

const BUNDLE_OPERATIONS_SQL: &str = r"
CREATE TABLE bundle_operations (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    operation_key TEXT NOT NULL,
    deposit_id UUID NOT NULL REFERENCES deposits (id),
    line_item_ids JSONB NOT NULL,
    base_revenue_schedule_id UUID NOT NULL REFERENCES revenue_schedules (id),
    mode bundle_mode NOT NULL,
    reason TEXT NOT NULL,
    -- No FK: undo removes the product while this audit row stays.
    created_product_id UUID NOT NULL,
    created_revenue_schedule_ids JSONB NOT NULL,
    line_to_schedule_map JSONB NOT NULL,
    soft_deleted_schedule_ids JSONB NOT NULL,
    undone_at TIMESTAMPTZ,
    undo_reason TEXT,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
-- Storage-level bundle idempotency: identical retries replay the stored row.
CREATE UNIQUE INDEX uq_bundle_operations_key ON bundle_operations (tenant_id, operation_key);
";

const IMPORT_TEMPLATES_SQL: &str = r"
CREATE TABLE import_templates (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name TEXT NOT NULL,
    column_mappings JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_import_templates_tenant ON import_templates (tenant_id);
";

const NOTIFICATIONS_SQL: &str = r"
CREATE TABLE notifications (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    user_id UUID NOT NULL,
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX idx_notifications_user ON notifications (tenant_id, user_id);
";

const TENANT_SETTINGS_SQL: &str = r"
CREATE TABLE tenant_settings (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE UNIQUE INDEX uq_tenant_settings_key ON tenant_settings (tenant_id, key);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS tenant_settings;
DROP TABLE IF EXISTS notifications;
DROP TABLE IF EXISTS import_templates;
DROP TABLE IF EXISTS bundle_operations;
DROP TABLE IF EXISTS flex_review_items;
DROP TABLE IF EXISTS deposit_line_matches;
DROP TABLE IF EXISTS revenue_schedules;
DROP TABLE IF EXISTS deposit_line_items;
DROP TABLE IF EXISTS deposits;
DROP TABLE IF EXISTS opportunities;
DROP TABLE IF EXISTS products;
DROP TABLE IF EXISTS accounts;
DROP TYPE IF EXISTS bundle_mode;
DROP TYPE IF EXISTS flex_review_status;
DROP TYPE IF EXISTS match_source;
DROP TYPE IF EXISTS match_status;
DROP TYPE IF EXISTS flex_classification;
DROP TYPE IF EXISTS billing_status;
DROP TYPE IF EXISTS schedule_status;
DROP TYPE IF EXISTS deposit_status;
DROP TYPE IF EXISTS line_item_status;
";
