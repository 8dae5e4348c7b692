//! Input and output types for deposit import normalization.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit column→field mapping supplied by the caller.
///
/// Each field names a column header in the uploaded table. Header matching is
/// case- and whitespace-insensitive; a header that matches more than one
/// column is rejected as ambiguous.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column holding the customer account name as reported by the payer.
    pub account_name: Option<String>,
    /// Column holding the vendor name.
    pub vendor_name: Option<String>,
    /// Column holding the distributor name.
    pub distributor_name: Option<String>,
    /// Column holding the product name.
    pub product_name: Option<String>,
    /// Column holding the usage amount.
    pub usage: Option<String>,
    /// Column holding the commission amount.
    pub commission: Option<String>,
}

impl ColumnMapping {
    /// Returns true if at least one amount column (usage or commission) is mapped.
    #[must_use]
    pub const fn has_amount_column(&self) -> bool {
        self.usage.is_some() || self.commission.is_some()
    }
}

/// Tokenized tabular upload: one header row plus data rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTable {
    /// Column headers, in file order.
    pub headers: Vec<String>,
    /// Data rows. Short rows are padded with empty cells during resolution.
    pub rows: Vec<Vec<String>>,
}

/// Deposit-level metadata accompanying an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositMetadata {
    /// Display name for the deposit batch.
    pub deposit_name: String,
    /// Distributor the remittance came from.
    pub distributor_name: String,
    /// Vendor the remittance covers.
    pub vendor_name: String,
    /// Payment date as an ISO-8601 string or an Excel serial day-count.
    pub payment_date: String,
    /// Payment type (check, ACH, wire, ...).
    pub payment_type: Option<String>,
    /// Client-supplied idempotency key. Resubmission with the same key
    /// returns the previously created deposit instead of duplicating rows.
    pub idempotency_key: Option<String>,
    /// Import template to update when `save_template_mapping` is set.
    pub template_id: Option<Uuid>,
    /// Persist the column mapping into the template's config.
    #[serde(default)]
    pub save_template_mapping: bool,
}

/// One normalized deposit line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// Raw account name as imported.
    pub account_name_raw: String,
    /// Raw vendor name as imported.
    pub vendor_name_raw: String,
    /// Raw distributor name as imported.
    pub distributor_name_raw: String,
    /// Raw product name as imported.
    pub product_name_raw: String,
    /// Usage amount.
    pub usage: Decimal,
    /// Commission amount.
    pub commission: Decimal,
    /// Commission rate, derived when both amounts are present.
    pub commission_rate: Option<Decimal>,
}

/// Result of normalizing an upload.
#[derive(Debug, Clone)]
pub struct NormalizedImport {
    /// Parsed payment date (intraday offset preserved for Excel serials).
    pub payment_date: NaiveDateTime,
    /// Deposit month window: the first day of the payment month.
    pub month: NaiveDate,
    /// Normalized line items in file order.
    pub lines: Vec<NormalizedLine>,
    /// Count of summary/junk rows that were filtered out.
    pub skipped_rows: usize,
}
