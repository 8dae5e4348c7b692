//! Allocation bookkeeping engine.

use rust_decimal::Decimal;

use super::error::AllocationError;
use super::types::{AllocationOutcome, LineAmounts, LineItemStatus};

/// Stateless allocation math.
///
/// All methods are associated functions over `LineAmounts` snapshots; the
/// repository layer persists the outcomes inside its transaction.
pub struct AllocationEngine;

impl AllocationEngine {
    /// Applies an allocation of exactly the supplied amounts.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::NegativeAmount` for negative inputs
    /// (chargebacks are classified before allocation) and
    /// `AllocationError::OverAllocation` when an amount exceeds what the line
    /// still has unallocated.
    pub fn apply(
        amounts: &LineAmounts,
        usage_amount: Decimal,
        commission_amount: Decimal,
    ) -> Result<AllocationOutcome, AllocationError> {
        if usage_amount < Decimal::ZERO || commission_amount < Decimal::ZERO {
            return Err(AllocationError::NegativeAmount);
        }
        if usage_amount > amounts.usage_unallocated {
            return Err(AllocationError::OverAllocation {
                requested: usage_amount,
                available: amounts.usage_unallocated,
            });
        }
        if commission_amount > amounts.commission_unallocated {
            return Err(AllocationError::OverAllocation {
                requested: commission_amount,
                available: amounts.commission_unallocated,
            });
        }

        let updated = LineAmounts {
            usage: amounts.usage,
            usage_allocated: amounts.usage_allocated + usage_amount,
            usage_unallocated: amounts.usage_unallocated - usage_amount,
            commission: amounts.commission,
            commission_allocated: amounts.commission_allocated + commission_amount,
            commission_unallocated: amounts.commission_unallocated - commission_amount,
        };

        Ok(AllocationOutcome {
            status: Self::status_for(&updated),
            amounts: updated,
        })
    }

    /// Resets a line to its pre-match state: the exact inverse of a full
    /// single-schedule apply.
    #[must_use]
    pub fn unmatch(original_usage: Decimal, original_commission: Decimal) -> AllocationOutcome {
        AllocationOutcome {
            amounts: LineAmounts::new(original_usage, original_commission),
            status: LineItemStatus::Unmatched,
        }
    }

    /// Derives line status from allocation completeness.
    #[must_use]
    pub fn status_for(amounts: &LineAmounts) -> LineItemStatus {
        if amounts.is_unallocated() {
            LineItemStatus::Unmatched
        } else if amounts.is_fully_allocated() {
            LineItemStatus::Matched
        } else {
            LineItemStatus::PartiallyMatched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_apply_marks_matched() {
        let start = LineAmounts::new(dec!(105), dec!(21));
        let outcome = AllocationEngine::apply(&start, dec!(105), dec!(21)).unwrap();

        assert_eq!(outcome.status, LineItemStatus::Matched);
        assert_eq!(outcome.amounts.usage_allocated, dec!(105));
        assert_eq!(outcome.amounts.usage_unallocated, dec!(0));
        assert!(outcome.amounts.invariant_holds());
    }

    #[test]
    fn test_partial_apply_marks_partially_matched() {
        let start = LineAmounts::new(dec!(100), dec!(20));
        let outcome = AllocationEngine::apply(&start, dec!(60), dec!(12)).unwrap();

        assert_eq!(outcome.status, LineItemStatus::PartiallyMatched);
        assert_eq!(outcome.amounts.usage_unallocated, dec!(40));
        assert!(outcome.amounts.invariant_holds());
    }

    #[test]
    fn test_over_allocation_rejected() {
        let start = LineAmounts::new(dec!(100), dec!(20));
        let result = AllocationEngine::apply(&start, dec!(101), dec!(20));
        assert!(matches!(
            result,
            Err(AllocationError::OverAllocation { .. })
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let start = LineAmounts::new(dec!(100), dec!(20));
        let result = AllocationEngine::apply(&start, dec!(-5), dec!(1));
        assert!(matches!(result, Err(AllocationError::NegativeAmount)));
    }

    #[test]
    fn test_apply_then_unmatch_round_trip() {
        let start = LineAmounts::new(dec!(100), dec!(20));
        let applied = AllocationEngine::apply(&start, dec!(100), dec!(20)).unwrap();
        assert_eq!(applied.status, LineItemStatus::Matched);

        let reset = AllocationEngine::unmatch(dec!(100), dec!(20));
        assert_eq!(reset.amounts, start);
        assert_eq!(reset.status, LineItemStatus::Unmatched);
    }

    #[test]
    fn test_zero_amounts_line_is_matched_after_zero_apply() {
        // A zero-amount line is trivially fully allocated once touched.
        let start = LineAmounts::new(dec!(0), dec!(0));
        assert_eq!(AllocationEngine::status_for(&start), LineItemStatus::Unmatched);
    }
}
