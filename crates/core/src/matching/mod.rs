//! Revenue schedule candidate matching.
//!
//! Given one deposit line, produces ranked schedule candidates under a
//! selectable strategy (legacy or hierarchical), a month-window/future-schedule
//! policy, and a per-user confidence floor. Both strategies return the same
//! candidate shape tagged with the producing mode, so call sites never branch
//! on the engine mode.

pub mod hierarchical;
pub mod legacy;
pub mod types;

pub use hierarchical::HierarchicalMatcher;
pub use legacy::LegacyMatcher;
pub use types::{LineSnapshot, MatchCandidate, MatchContext, MatchType, ScheduleSnapshot};

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::settings::MatchingMode;

/// A candidate ranking strategy.
///
/// Implementations score schedules that already passed account and time
/// filtering; they never see schedules from other accounts.
pub trait MatchStrategy {
    /// The mode this strategy implements.
    fn mode(&self) -> MatchingMode;

    /// Ranks eligible schedules for a line. Order is not significant; the
    /// caller sorts and filters the combined result.
    fn rank(&self, line: &LineSnapshot, schedules: &[ScheduleSnapshot]) -> Vec<MatchCandidate>;
}

/// Returns the strategy for a matching mode.
#[must_use]
pub fn strategy_for(mode: MatchingMode) -> Box<dyn MatchStrategy + Send + Sync> {
    match mode {
        MatchingMode::Legacy => Box::new(LegacyMatcher),
        MatchingMode::Hierarchical => Box::new(HierarchicalMatcher),
    }
}

/// Normalizes a name for comparison: trim, collapse whitespace, lowercase.
#[must_use]
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Returns true if `actual` is within `fraction` of `expected`.
#[must_use]
pub fn amount_within(actual: Decimal, expected: Decimal, fraction: Decimal) -> bool {
    (actual - expected).abs() <= expected.abs() * fraction
}

/// Returns `[start, end)` bounds of the month beginning at `month`.
fn month_bounds(month: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = month.checked_add_months(Months::new(1)).unwrap_or(month);
    (month, end)
}

/// Finds ranked candidates for a line.
///
/// Filtering order:
/// 1. account resolution - the schedule's account LEGAL name must equal the
///    line's raw account name (case/whitespace-insensitive)
/// 2. time - schedules inside the deposit month window; future schedules
///    admitted only when the context asks for them
/// 3. strategy ranking
/// 4. confidence floor (strictly-below candidates are dropped)
///
/// Results are sorted by confidence descending, then schedule date, then id,
/// so output order is deterministic.
#[must_use]
pub fn find_candidates(
    strategy: &dyn MatchStrategy,
    line: &LineSnapshot,
    schedules: &[ScheduleSnapshot],
    ctx: &MatchContext,
) -> Vec<MatchCandidate> {
    let account_key = normalize_name(&line.account_name_raw);
    let (window_start, window_end) = month_bounds(line.deposit_month);

    let eligible: Vec<ScheduleSnapshot> = schedules
        .iter()
        .filter(|s| normalize_name(&s.account_legal_name) == account_key)
        .filter(|s| {
            let in_window = s.schedule_date >= window_start && s.schedule_date < window_end;
            let in_future = s.schedule_date >= window_end;
            in_window || (ctx.include_future_schedules && in_future)
        })
        .cloned()
        .collect();

    let mut candidates: Vec<(MatchCandidate, NaiveDate)> = strategy
        .rank(line, &eligible)
        .into_iter()
        .filter(|c| c.confidence >= ctx.min_confidence)
        .map(|c| {
            let date = eligible
                .iter()
                .find(|s| s.id == c.schedule_id)
                .map_or(window_start, |s| s.schedule_date);
            (c, date)
        })
        .collect();

    candidates.sort_by(|(a, da), (b, db)| {
        b.confidence
            .cmp(&a.confidence)
            .then(da.cmp(db))
            .then(a.schedule_id.cmp(&b.schedule_id))
    });

    candidates.into_iter().map(|(c, _)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn line(account: &str, product: &str, usage: Decimal) -> LineSnapshot {
        LineSnapshot {
            id: Uuid::new_v4(),
            account_name_raw: account.to_string(),
            product_name_raw: product.to_string(),
            usage,
            commission: usage * dec!(0.2),
            deposit_month: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn schedule(
        legal_name: &str,
        product: &str,
        date: NaiveDate,
        expected_usage: Decimal,
    ) -> ScheduleSnapshot {
        ScheduleSnapshot {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            account_legal_name: legal_name.to_string(),
            product_name: product.to_string(),
            schedule_date: date,
            expected_usage,
            expected_commission: expected_usage * dec!(0.2),
        }
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn open_ctx() -> MatchContext {
        MatchContext {
            include_future_schedules: false,
            min_confidence: Decimal::ZERO,
        }
    }

    #[test]
    fn test_account_resolution_rejects_decoys() {
        let strategy = HierarchicalMatcher;
        let l = line("Initech LLC", "Widget Cloud", dec!(100));

        let mut schedules = vec![schedule("Initech LLC", "Widget Cloud", march(15), dec!(100))];
        // Adversarial volume of decoy schedules on a different account.
        for _ in 0..35 {
            schedules.push(schedule("Globex Corporation", "Widget Cloud", march(15), dec!(100)));
        }

        let result = find_candidates(&strategy, &l, &schedules, &open_ctx());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].schedule_id, schedules[0].id);
    }

    #[test]
    fn test_account_resolution_is_case_insensitive_on_legal_name() {
        let strategy = HierarchicalMatcher;
        let l = line("  initech   llc ", "Widget Cloud", dec!(100));
        let schedules = vec![schedule("Initech LLC", "Widget Cloud", march(15), dec!(100))];

        let result = find_candidates(&strategy, &l, &schedules, &open_ctx());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_month_window_excludes_future_by_default() {
        let strategy = HierarchicalMatcher;
        let l = line("Initech LLC", "Widget Cloud", dec!(100));
        let schedules = vec![
            schedule("Initech LLC", "Widget Cloud", march(15), dec!(100)),
            schedule(
                "Initech LLC",
                "Widget Cloud",
                NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
                dec!(100),
            ),
        ];

        let without = find_candidates(&strategy, &l, &schedules, &open_ctx());
        assert_eq!(without.len(), 1);

        let with = find_candidates(
            &strategy,
            &l,
            &schedules,
            &MatchContext {
                include_future_schedules: true,
                min_confidence: Decimal::ZERO,
            },
        );
        // Future schedules only ever add candidates.
        assert_eq!(with.len(), 2);
        assert!(with.len() >= without.len());
    }

    #[test]
    fn test_past_schedules_stay_excluded_even_with_future_flag() {
        let strategy = HierarchicalMatcher;
        let l = line("Initech LLC", "Widget Cloud", dec!(100));
        let schedules = vec![schedule(
            "Initech LLC",
            "Widget Cloud",
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            dec!(100),
        )];

        let result = find_candidates(
            &strategy,
            &l,
            &schedules,
            &MatchContext {
                include_future_schedules: true,
                min_confidence: Decimal::ZERO,
            },
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_confidence_floor_can_empty_the_list() {
        let strategy = LegacyMatcher;
        let l = line("Initech LLC", "Widget Cloud", dec!(100));
        let schedules = vec![schedule("Initech LLC", "Other Product", march(15), dec!(9999))];

        let result = find_candidates(
            &strategy,
            &l,
            &schedules,
            &MatchContext {
                include_future_schedules: false,
                min_confidence: dec!(0.99),
            },
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_ranking_is_deterministic_and_descending() {
        let strategy = HierarchicalMatcher;
        let l = line("Initech LLC", "Widget Cloud", dec!(100));
        let schedules = vec![
            schedule("Initech LLC", "Other Product", march(20), dec!(100)),
            schedule("Initech LLC", "Widget Cloud", march(10), dec!(100)),
            schedule("Initech LLC", "Widget Cloud", march(5), dec!(500)),
        ];

        let result = find_candidates(&strategy, &l, &schedules, &open_ctx());
        assert_eq!(result.len(), 3);
        assert!(result[0].confidence >= result[1].confidence);
        assert!(result[1].confidence >= result[2].confidence);
        // Best candidate is the exact product+amount match.
        assert_eq!(result[0].schedule_id, schedules[1].id);
    }

    #[test]
    fn test_amount_within() {
        assert!(amount_within(dec!(101), dec!(100), dec!(0.01)));
        assert!(amount_within(dec!(99), dec!(100), dec!(0.01)));
        assert!(!amount_within(dec!(102), dec!(100), dec!(0.01)));
    }
}
