//! Normalization pipeline for deposit uploads.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::error::ImportError;
use super::types::{ColumnMapping, DepositMetadata, ImportTable, NormalizedImport, NormalizedLine};

/// Excel serial date epoch (the 1900 date system, Lotus leap-year bug included).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

const SECONDS_PER_DAY: i64 = 86_400;

/// Row tokens that mark a summary row, compared case-insensitively.
const SUMMARY_TOKENS: [&str; 3] = ["total", "subtotal", "grand total"];

/// Normalizes a mapped header or cell for comparison: trim, collapse inner
/// whitespace, lowercase.
fn normalize_header(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Resolves a mapped header to a column index.
///
/// Matching is case- and whitespace-insensitive. A header matching more than
/// one column is an error the caller must resolve by renaming columns.
fn resolve_column(headers: &[String], wanted: &str) -> Result<usize, ImportError> {
    let needle = normalize_header(wanted);
    let matches: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| normalize_header(h) == needle)
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [] => Err(ImportError::ColumnNotFound(wanted.to_string())),
        [idx] => Ok(*idx),
        many => Err(ImportError::AmbiguousColumn {
            header: wanted.to_string(),
            matches: many.iter().map(|&i| headers[i].clone()).collect(),
        }),
    }
}

/// Returns true if any cell marks this as a summary row
/// ("total" / "subtotal" / "grand total", optional trailing colon).
fn is_summary_row(cells: &[String]) -> bool {
    cells.iter().any(|cell| {
        let trimmed = cell.trim().trim_end_matches(':');
        let token = normalize_header(trimmed);
        SUMMARY_TOKENS.contains(&token.as_str())
    })
}

/// Parses an amount cell. Currency symbols and thousands separators are
/// stripped; parenthesized values are negative. Empty cells parse to `None`.
fn parse_amount(cell: &str) -> Result<Option<Decimal>, ()> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let (body, negate) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (&trimmed[1..trimmed.len() - 1], true)
    } else {
        (trimmed, false)
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    match cleaned.parse::<Decimal>() {
        Ok(value) if negate => Ok(Some(-value)),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(()),
    }
}

/// Parses a payment date from an ISO-8601 string or an Excel serial day-count.
///
/// Excel serials use the 1900 date system (epoch 1899-12-30); the fractional
/// part is the intraday offset.
///
/// # Errors
///
/// Returns `ImportError::InvalidPaymentDate` if no representation applies.
pub fn parse_payment_date(raw: &str) -> Result<NaiveDateTime, ImportError> {
    let trimmed = raw.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    parse_excel_serial(trimmed).ok_or_else(|| ImportError::InvalidPaymentDate(raw.to_string()))
}

/// Parses an Excel serial day-count into a datetime.
fn parse_excel_serial(raw: &str) -> Option<NaiveDateTime> {
    let serial: Decimal = raw.parse().ok()?;
    if serial < Decimal::ONE {
        return None;
    }

    let days = serial.trunc().to_i64()?;
    let seconds = ((serial - serial.trunc()) * Decimal::from(SECONDS_PER_DAY))
        .round()
        .to_i64()?;

    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

/// Returns the first day of the month containing `date`.
fn month_of(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

struct ResolvedColumns {
    account_name: Option<usize>,
    vendor_name: Option<usize>,
    distributor_name: Option<usize>,
    product_name: Option<usize>,
    usage: Option<usize>,
    commission: Option<usize>,
}

impl ResolvedColumns {
    fn resolve(headers: &[String], mapping: &ColumnMapping) -> Result<Self, ImportError> {
        let resolve_opt = |wanted: &Option<String>| -> Result<Option<usize>, ImportError> {
            wanted
                .as_deref()
                .map(|w| resolve_column(headers, w))
                .transpose()
        };

        Ok(Self {
            account_name: resolve_opt(&mapping.account_name)?,
            vendor_name: resolve_opt(&mapping.vendor_name)?,
            distributor_name: resolve_opt(&mapping.distributor_name)?,
            product_name: resolve_opt(&mapping.product_name)?,
            usage: resolve_opt(&mapping.usage)?,
            commission: resolve_opt(&mapping.commission)?,
        })
    }
}

fn cell(row: &[String], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Normalizes an upload into deposit line items.
///
/// Validation and derivation rules:
/// - at least one of usage/commission must be mapped
/// - mapped headers resolve case/whitespace-insensitively; ambiguity and
///   absence are errors
/// - commission-only mapping derives `usage = commission`, `rate = 1.0`
/// - both mapped derives `rate = commission / usage` (usage nonzero)
/// - summary rows and rows with no content are skipped
///
/// # Errors
///
/// Returns `ImportError` on mapping, date, or amount failures.
pub fn normalize(
    table: &ImportTable,
    mapping: &ColumnMapping,
    metadata: &DepositMetadata,
) -> Result<NormalizedImport, ImportError> {
    if !mapping.has_amount_column() {
        return Err(ImportError::NoAmountColumn);
    }

    let columns = ResolvedColumns::resolve(&table.headers, mapping)?;
    let payment_date = parse_payment_date(&metadata.payment_date)?;
    let month = month_of(payment_date.date());

    let mut lines = Vec::with_capacity(table.rows.len());
    let mut skipped_rows = 0usize;

    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;

        if is_summary_row(row) {
            skipped_rows += 1;
            continue;
        }

        let account_name_raw = cell(row, columns.account_name);
        let vendor_name_raw = cell(row, columns.vendor_name);
        let distributor_name_raw = cell(row, columns.distributor_name);
        let product_name_raw = cell(row, columns.product_name);

        let usage_cell = cell(row, columns.usage);
        let commission_cell = cell(row, columns.commission);

        let usage_raw = parse_amount(&usage_cell).map_err(|()| ImportError::InvalidAmount {
            row: row_no,
            value: usage_cell.clone(),
        })?;
        let commission_raw =
            parse_amount(&commission_cell).map_err(|()| ImportError::InvalidAmount {
                row: row_no,
                value: commission_cell.clone(),
            })?;

        // Junk rows: nothing mapped parsed to content.
        let has_text = !account_name_raw.is_empty()
            || !vendor_name_raw.is_empty()
            || !distributor_name_raw.is_empty()
            || !product_name_raw.is_empty();
        if usage_raw.is_none() && commission_raw.is_none() && !has_text {
            skipped_rows += 1;
            continue;
        }

        let (usage, commission, commission_rate) = match (columns.usage, columns.commission) {
            // Commission-only mapping: usage mirrors commission at rate 1.0.
            (None, Some(_)) => {
                let commission = commission_raw.unwrap_or_default();
                (commission, commission, Some(Decimal::ONE))
            }
            (Some(_), None) => (usage_raw.unwrap_or_default(), Decimal::ZERO, None),
            _ => {
                let usage = usage_raw.unwrap_or_default();
                let commission = commission_raw.unwrap_or_default();
                let rate = if usage.is_zero() {
                    None
                } else {
                    Some(commission / usage)
                };
                (usage, commission, rate)
            }
        };

        lines.push(NormalizedLine {
            account_name_raw,
            vendor_name_raw,
            distributor_name_raw,
            product_name_raw,
            usage,
            commission,
            commission_rate,
        });
    }

    Ok(NormalizedImport {
        payment_date,
        month,
        lines,
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn table(headers: &[&str], rows: &[&[&str]]) -> ImportTable {
        ImportTable {
            headers: headers.iter().map(ToString::to_string).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(ToString::to_string).collect())
                .collect(),
        }
    }

    fn metadata(payment_date: &str) -> DepositMetadata {
        DepositMetadata {
            deposit_name: "March remittance".into(),
            distributor_name: "Acme Distribution".into(),
            vendor_name: "Globex".into(),
            payment_date: payment_date.into(),
            payment_type: Some("check".into()),
            idempotency_key: None,
            template_id: None,
            save_template_mapping: false,
        }
    }

    fn full_mapping() -> ColumnMapping {
        ColumnMapping {
            account_name: Some("Account".into()),
            product_name: Some("Product".into()),
            usage: Some("Usage".into()),
            commission: Some("Commission".into()),
            ..ColumnMapping::default()
        }
    }

    #[test]
    fn test_no_amount_column_rejected() {
        let t = table(&["Account"], &[&["Initech"]]);
        let mapping = ColumnMapping {
            account_name: Some("Account".into()),
            ..ColumnMapping::default()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15"));
        assert!(matches!(result, Err(ImportError::NoAmountColumn)));
    }

    #[test]
    fn test_header_resolution_is_case_and_whitespace_insensitive() {
        let t = table(&["  Account  Name ", "Usage"], &[&["Initech", "100"]]);
        let mapping = ColumnMapping {
            account_name: Some("account name".into()),
            usage: Some("USAGE".into()),
            ..ColumnMapping::default()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].account_name_raw, "Initech");
        assert_eq!(result.lines[0].usage, dec!(100));
    }

    #[test]
    fn test_ambiguous_header_rejected() {
        let t = table(&["Usage", " usage "], &[&["1", "2"]]);
        let mapping = ColumnMapping {
            usage: Some("usage".into()),
            ..ColumnMapping::default()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15"));
        assert!(matches!(
            result,
            Err(ImportError::AmbiguousColumn { ref header, ref matches })
                if header == "usage" && matches.len() == 2
        ));
    }

    #[test]
    fn test_missing_header_rejected() {
        let t = table(&["Usage"], &[&["1"]]);
        let mapping = ColumnMapping {
            usage: Some("Usage".into()),
            commission: Some("Commission".into()),
            ..ColumnMapping::default()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15"));
        assert!(matches!(result, Err(ImportError::ColumnNotFound(ref c)) if c == "Commission"));
    }

    #[test]
    fn test_commission_only_derives_usage_and_rate() {
        let t = table(&["Account", "Commission"], &[&["Initech", "250.00"]]);
        let mapping = ColumnMapping {
            account_name: Some("Account".into()),
            commission: Some("Commission".into()),
            ..ColumnMapping::default()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        let line = &result.lines[0];
        assert_eq!(line.usage, dec!(250.00));
        assert_eq!(line.commission, dec!(250.00));
        assert_eq!(line.commission_rate, Some(Decimal::ONE));
    }

    #[test]
    fn test_rate_derived_from_both_amounts() {
        let t = table(
            &["Account", "Usage", "Commission"],
            &[&["Initech", "200", "50"]],
        );
        let mapping = full_mapping();
        let mapping = ColumnMapping {
            product_name: None,
            ..mapping
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        assert_eq!(result.lines[0].commission_rate, Some(dec!(0.25)));
    }

    #[rstest]
    #[case("Total")]
    #[case("subtotal:")]
    #[case("GRAND TOTAL")]
    #[case("  Grand  Total : ")]
    fn test_summary_rows_skipped(#[case] token: &str) {
        let t = table(
            &["Account", "Usage", "Commission"],
            &[
                &["Initech", "100", "20"],
                &[token, "100", "20"],
            ],
        );
        let mapping = ColumnMapping {
            product_name: None,
            ..full_mapping()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.skipped_rows, 1);
    }

    #[test]
    fn test_empty_rows_skipped() {
        let t = table(
            &["Account", "Usage", "Commission"],
            &[&["Initech", "100", "20"], &["", "", ""]],
        );
        let mapping = ColumnMapping {
            product_name: None,
            ..full_mapping()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.skipped_rows, 1);
    }

    #[test]
    fn test_currency_formatting_and_parens() {
        let t = table(
            &["Account", "Usage", "Commission"],
            &[&["Initech", "$1,234.56", "(50)"]],
        );
        let mapping = ColumnMapping {
            product_name: None,
            ..full_mapping()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        assert_eq!(result.lines[0].usage, dec!(1234.56));
        assert_eq!(result.lines[0].commission, dec!(-50));
    }

    #[test]
    fn test_invalid_amount_reports_row() {
        let t = table(
            &["Account", "Usage", "Commission"],
            &[&["Initech", "abc", "20"]],
        );
        let mapping = ColumnMapping {
            product_name: None,
            ..full_mapping()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15"));
        assert!(matches!(
            result,
            Err(ImportError::InvalidAmount { row: 1, ref value }) if value == "abc"
        ));
    }

    #[test]
    fn test_iso_date_parsing() {
        let dt = parse_payment_date("2024-03-15").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let dt = parse_payment_date("2024-03-15T10:30:00Z").unwrap();
        assert_eq!(dt.time(), chrono::NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }

    #[test]
    fn test_excel_serial_parsing() {
        // Serial 44927 is 2023-01-01 in the 1900 date system.
        let dt = parse_payment_date("44927").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());

        // Fractional days carry the intraday offset.
        let dt = parse_payment_date("45123.5").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 7, 16).unwrap());
        assert_eq!(dt.time(), chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_unparseable_date_rejected() {
        assert!(matches!(
            parse_payment_date("soon"),
            Err(ImportError::InvalidPaymentDate(_))
        ));
    }

    #[test]
    fn test_month_window_is_first_of_month() {
        let t = table(&["Usage"], &[&["10"]]);
        let mapping = ColumnMapping {
            usage: Some("Usage".into()),
            ..ColumnMapping::default()
        };
        let result = normalize(&t, &mapping, &metadata("2024-03-15")).unwrap();
        assert_eq!(result.month, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
