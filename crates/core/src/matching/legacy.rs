//! Legacy single-pass candidate scoring.

use rust_decimal::Decimal;

use super::types::{LineSnapshot, MatchCandidate, MatchType, ScheduleSnapshot};
use super::{amount_within, normalize_name, MatchStrategy};
use crate::settings::MatchingMode;

/// Flat additive scorer retained for tenants still on the legacy engine.
///
/// Every candidate it produces is tagged `"legacy"` regardless of which
/// signals contributed to the score.
pub struct LegacyMatcher;

/// Account resolution contributes the base score.
const BASE_SCORE: Decimal = Decimal::from_parts(50, 0, 0, false, 2); // 0.50
/// Exact product name match.
const PRODUCT_BONUS: Decimal = Decimal::from_parts(30, 0, 0, false, 2); // 0.30
/// Usage within 1% of the expected amount.
const AMOUNT_BONUS: Decimal = Decimal::from_parts(20, 0, 0, false, 2); // 0.20

const AMOUNT_FRACTION: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

impl MatchStrategy for LegacyMatcher {
    fn mode(&self) -> MatchingMode {
        MatchingMode::Legacy
    }

    fn rank(&self, line: &LineSnapshot, schedules: &[ScheduleSnapshot]) -> Vec<MatchCandidate> {
        let product_key = normalize_name(&line.product_name_raw);

        schedules
            .iter()
            .map(|s| {
                let mut confidence = BASE_SCORE;
                if !product_key.is_empty() && normalize_name(&s.product_name) == product_key {
                    confidence += PRODUCT_BONUS;
                }
                if amount_within(line.usage, s.expected_usage, AMOUNT_FRACTION) {
                    confidence += AMOUNT_BONUS;
                }
                MatchCandidate {
                    schedule_id: s.id,
                    match_type: MatchType::Legacy,
                    confidence,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn snapshot(product: &str, expected_usage: Decimal) -> ScheduleSnapshot {
        ScheduleSnapshot {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            account_legal_name: "Initech LLC".into(),
            product_name: product.into(),
            schedule_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            expected_usage,
            expected_commission: expected_usage * dec!(0.2),
        }
    }

    fn line(usage: Decimal) -> LineSnapshot {
        LineSnapshot {
            id: Uuid::new_v4(),
            account_name_raw: "Initech LLC".into(),
            product_name_raw: "Widget Cloud".into(),
            usage,
            commission: usage * dec!(0.2),
            deposit_month: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_all_candidates_tagged_legacy() {
        let candidates = LegacyMatcher.rank(
            &line(dec!(100)),
            &[snapshot("Widget Cloud", dec!(100)), snapshot("Other", dec!(7))],
        );
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.match_type == MatchType::Legacy));
    }

    #[test]
    fn test_score_composition() {
        let candidates = LegacyMatcher.rank(
            &line(dec!(100)),
            &[
                snapshot("Widget Cloud", dec!(100)),
                snapshot("Widget Cloud", dec!(900)),
                snapshot("Other", dec!(900)),
            ],
        );
        assert_eq!(candidates[0].confidence, dec!(1.00));
        assert_eq!(candidates[1].confidence, dec!(0.80));
        assert_eq!(candidates[2].confidence, dec!(0.50));
    }
}
