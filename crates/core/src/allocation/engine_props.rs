//! Property-based tests for allocation bookkeeping.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::AllocationEngine;
use super::types::{LineAmounts, LineItemStatus};

/// Strategy for amounts in cents up to 1,000,000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A step in an allocation sequence: allocate some 0..=100% slice of what is
/// currently unallocated (in percent), or unmatch entirely.
#[derive(Debug, Clone)]
enum Step {
    Apply { usage_pct: u8, commission_pct: u8 },
    Unmatch,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0u8..=100, 0u8..=100)
            .prop_map(|(usage_pct, commission_pct)| Step::Apply { usage_pct, commission_pct }),
        1 => Just(Step::Unmatch),
    ]
}

fn pct_of(amount: Decimal, pct: u8) -> Decimal {
    (amount * Decimal::from(pct) / Decimal::ONE_HUNDRED).round_dp(2)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// `allocated + unallocated == total` holds for usage and commission
    /// after any sequence of apply/unmatch operations.
    #[test]
    fn prop_invariant_holds_across_sequences(
        usage in arb_amount(),
        commission in arb_amount(),
        steps in proptest::collection::vec(arb_step(), 1..20),
    ) {
        let mut amounts = LineAmounts::new(usage, commission);
        prop_assert!(amounts.invariant_holds());

        for step in steps {
            match step {
                Step::Apply { usage_pct, commission_pct } => {
                    let usage_slice = pct_of(amounts.usage_unallocated, usage_pct);
                    let commission_slice = pct_of(amounts.commission_unallocated, commission_pct);
                    let outcome = AllocationEngine::apply(&amounts, usage_slice, commission_slice)
                        .expect("slices never exceed unallocated");
                    amounts = outcome.amounts;
                }
                Step::Unmatch => {
                    amounts = AllocationEngine::unmatch(usage, commission).amounts;
                }
            }
            prop_assert!(amounts.invariant_holds());
            prop_assert_eq!(amounts.usage, usage);
            prop_assert_eq!(amounts.commission, commission);
        }
    }

    /// Unmatch restores the exact initial state no matter what preceded it.
    #[test]
    fn prop_unmatch_is_exact_inverse(
        usage in arb_amount(),
        commission in arb_amount(),
        usage_pct in 0u8..=100,
        commission_pct in 0u8..=100,
    ) {
        let start = LineAmounts::new(usage, commission);
        let usage_slice = pct_of(start.usage_unallocated, usage_pct);
        let commission_slice = pct_of(start.commission_unallocated, commission_pct);

        let _ = AllocationEngine::apply(&start, usage_slice, commission_slice)
            .expect("slices never exceed unallocated");
        let reset = AllocationEngine::unmatch(usage, commission);

        prop_assert_eq!(reset.amounts, start);
        prop_assert_eq!(reset.status, LineItemStatus::Unmatched);
    }

    /// Status is derived purely from completeness.
    #[test]
    fn prop_status_matches_completeness(
        usage in arb_amount(),
        commission in arb_amount(),
    ) {
        let start = LineAmounts::new(usage, commission);
        let outcome = AllocationEngine::apply(&start, usage, commission)
            .expect("full allocation always fits");

        if outcome.amounts.is_unallocated() {
            // Zero-amount lines never leave Unmatched.
            prop_assert_eq!(outcome.status, LineItemStatus::Unmatched);
        } else {
            prop_assert_eq!(outcome.status, LineItemStatus::Matched);
        }
    }
}
