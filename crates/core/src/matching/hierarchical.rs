//! Hierarchical tiered candidate scoring.

use rust_decimal::Decimal;

use super::types::{LineSnapshot, MatchCandidate, MatchType, ScheduleSnapshot};
use super::{amount_within, normalize_name, MatchStrategy};
use crate::settings::MatchingMode;

/// Tiered scorer: candidates are classified top-down into the strongest tier
/// they satisfy. Tags name the tier; `"legacy"` is never used here.
pub struct HierarchicalMatcher;

const EXACT_SCORE: Decimal = Decimal::from_parts(95, 0, 0, false, 2); // 0.95
const PRODUCT_SCORE: Decimal = Decimal::from_parts(85, 0, 0, false, 2); // 0.85
const AMOUNT_SCORE: Decimal = Decimal::from_parts(70, 0, 0, false, 2); // 0.70
const ACCOUNT_SCORE: Decimal = Decimal::from_parts(50, 0, 0, false, 2); // 0.50

/// Tight window for the exact tier.
const EXACT_FRACTION: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01
/// Looser window for the amount tier.
const AMOUNT_FRACTION: Decimal = Decimal::from_parts(2, 0, 0, false, 2); // 0.02

impl MatchStrategy for HierarchicalMatcher {
    fn mode(&self) -> MatchingMode {
        MatchingMode::Hierarchical
    }

    fn rank(&self, line: &LineSnapshot, schedules: &[ScheduleSnapshot]) -> Vec<MatchCandidate> {
        let product_key = normalize_name(&line.product_name_raw);

        schedules
            .iter()
            .map(|s| {
                let product_hit =
                    !product_key.is_empty() && normalize_name(&s.product_name) == product_key;
                let exact_amount = amount_within(line.usage, s.expected_usage, EXACT_FRACTION);
                let near_amount = amount_within(line.usage, s.expected_usage, AMOUNT_FRACTION);

                let (match_type, confidence) = if product_hit && exact_amount {
                    (MatchType::Exact, EXACT_SCORE)
                } else if product_hit {
                    (MatchType::Product, PRODUCT_SCORE)
                } else if near_amount {
                    (MatchType::Amount, AMOUNT_SCORE)
                } else {
                    (MatchType::Account, ACCOUNT_SCORE)
                };

                MatchCandidate {
                    schedule_id: s.id,
                    match_type,
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
    fn test_tier_classification() {
        let candidates = HierarchicalMatcher.rank(
            &line(dec!(100)),
            &[
                snapshot("Widget Cloud", dec!(100)),
                snapshot("Widget Cloud", dec!(450)),
                snapshot("Other", dec!(101)),
                snapshot("Other", dec!(450)),
            ],
        );

        assert_eq!(candidates[0].match_type, MatchType::Exact);
        assert_eq!(candidates[0].confidence, dec!(0.95));
        assert_eq!(candidates[1].match_type, MatchType::Product);
        assert_eq!(candidates[1].confidence, dec!(0.85));
        assert_eq!(candidates[2].match_type, MatchType::Amount);
        assert_eq!(candidates[2].confidence, dec!(0.70));
        assert_eq!(candidates[3].match_type, MatchType::Account);
        assert_eq!(candidates[3].confidence, dec!(0.50));
    }

    #[test]
    fn test_never_tags_legacy() {
        let candidates = HierarchicalMatcher.rank(
            &line(dec!(100)),
            &[snapshot("Widget Cloud", dec!(100)), snapshot("Other", dec!(9))],
        );
        assert!(candidates.iter().all(|c| c.match_type != MatchType::Legacy));
    }
}
