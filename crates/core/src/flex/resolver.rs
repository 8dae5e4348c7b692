//! Variance classification and resolution rules.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::{
    AdjustmentPlan, DecisionAction, FlexAction, FlexClassification, FlexDecision,
    FlexResolutionPlan,
};
use crate::schedule::BillingStatus;

/// Stateless variance decision logic.
///
/// Classification runs on the usage axis (the quantity the deposit reports);
/// the produced adjustment carries both the usage and the commission delta.
pub struct VarianceResolver;

impl VarianceResolver {
    /// Classifies one apply-match call against the schedule's expected values.
    ///
    /// - negative actual usage → `chargeback`
    /// - `|overage| <= expected × tolerance` (boundary inclusive) → `auto_adjust`
    /// - otherwise → `prompt`
    #[must_use]
    pub fn classify(
        actual_usage: Decimal,
        expected_usage: Decimal,
        actual_commission: Decimal,
        expected_commission: Decimal,
        variance_tolerance: Decimal,
    ) -> FlexDecision {
        let overage_usage = actual_usage - expected_usage;
        let overage_commission = actual_commission - expected_commission;

        if actual_usage < Decimal::ZERO {
            return FlexDecision {
                action: DecisionAction::Chargeback,
                classification: FlexClassification::Chargeback,
                overage_usage,
                overage_commission,
                executed: true,
            };
        }

        let threshold = expected_usage.abs() * variance_tolerance;
        if overage_usage.abs() <= threshold {
            FlexDecision {
                action: DecisionAction::AutoAdjust,
                classification: FlexClassification::WithinTolerance,
                overage_usage,
                overage_commission,
                executed: true,
            }
        } else {
            FlexDecision {
                action: DecisionAction::Prompt,
                classification: FlexClassification::OverTolerance,
                overage_usage,
                overage_commission,
                executed: false,
            }
        }
    }

    /// Returns the adjustment child to create for a decision, if any.
    ///
    /// `prompt` decisions defer execution, so no child is created; exact
    /// matches (zero overage on both axes) need no adjustment either.
    #[must_use]
    pub fn adjustment_plan(decision: &FlexDecision) -> Option<AdjustmentPlan> {
        if !decision.executed {
            return None;
        }
        if decision.overage_usage.is_zero() && decision.overage_commission.is_zero() {
            return None;
        }
        Some(AdjustmentPlan {
            usage_delta: decision.overage_usage,
            commission_delta: decision.overage_commission,
            classification: decision.classification,
            executed: true,
        })
    }

    /// Billing-state effects of a human resolution action.
    ///
    /// `Adjust` clears the base schedule back to `Open` (resolved); it cannot
    /// set `Reconciled`, which is reserved for deposit finalize. `FlexProduct`
    /// and chargeback approval move schedules into dispute.
    #[must_use]
    pub fn resolution_plan(action: FlexAction) -> FlexResolutionPlan {
        match action {
            FlexAction::Adjust => FlexResolutionPlan {
                base_billing_status: BillingStatus::Open,
                children_billing_status: None,
                creates_adjustment: true,
            },
            FlexAction::FlexProduct => FlexResolutionPlan {
                base_billing_status: BillingStatus::InDispute,
                children_billing_status: Some(BillingStatus::InDispute),
                creates_adjustment: false,
            },
            FlexAction::ChargebackApprove => FlexResolutionPlan {
                base_billing_status: BillingStatus::InDispute,
                children_billing_status: None,
                creates_adjustment: false,
            },
        }
    }

    /// Propagates a corrected commission rate to future schedules.
    ///
    /// Input is `(schedule_id, expected_usage)` per future schedule sharing
    /// the product within the opportunity; output is the new expected
    /// commission per schedule.
    #[must_use]
    pub fn propagate_rate(
        corrected_rate: Decimal,
        future_schedules: &[(Uuid, Decimal)],
    ) -> Vec<(Uuid, Decimal)> {
        future_schedules
            .iter()
            .map(|&(id, expected_usage)| (id, expected_usage * corrected_rate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_within_tolerance_auto_adjusts() {
        // usage 105 vs expected 100 at 10% tolerance
        let decision =
            VarianceResolver::classify(dec!(105), dec!(100), dec!(21), dec!(20), dec!(0.1));

        assert_eq!(decision.action, DecisionAction::AutoAdjust);
        assert_eq!(decision.action.as_str(), "auto_adjust");
        assert_eq!(decision.classification, FlexClassification::WithinTolerance);
        assert!(decision.executed);

        let plan = VarianceResolver::adjustment_plan(&decision).unwrap();
        assert_eq!(plan.usage_delta, dec!(5));
        assert_eq!(plan.commission_delta, dec!(1));
        assert!(plan.executed);
    }

    #[test]
    fn test_over_tolerance_prompts() {
        // usage 130 vs expected 100 at 1% tolerance
        let decision =
            VarianceResolver::classify(dec!(130), dec!(100), dec!(26), dec!(20), dec!(0.01));

        assert_eq!(decision.action, DecisionAction::Prompt);
        assert_eq!(decision.action.as_str(), "prompt");
        assert!(!decision.executed);
        assert!(VarianceResolver::adjustment_plan(&decision).is_none());
    }

    #[test]
    fn test_negative_usage_is_chargeback() {
        let decision =
            VarianceResolver::classify(dec!(-50), dec!(50), dec!(-10), dec!(10), dec!(0.05));

        assert_eq!(decision.action, DecisionAction::Chargeback);
        assert_eq!(decision.classification, FlexClassification::Chargeback);
        assert_eq!(decision.reason_code(), "negative_amount");
        assert!(decision.executed);

        let plan = VarianceResolver::adjustment_plan(&decision).unwrap();
        assert_eq!(plan.usage_delta, dec!(-100));
        assert_eq!(plan.commission_delta, dec!(-20));
    }

    #[rstest]
    // Overage exactly at expected × tolerance is within tolerance.
    #[case(dec!(110), dec!(100), dec!(0.1), DecisionAction::AutoAdjust)]
    #[case(dec!(90), dec!(100), dec!(0.1), DecisionAction::AutoAdjust)]
    // One cent beyond the boundary prompts.
    #[case(dec!(110.01), dec!(100), dec!(0.1), DecisionAction::Prompt)]
    #[case(dec!(89.99), dec!(100), dec!(0.1), DecisionAction::Prompt)]
    fn test_tolerance_boundary(
        #[case] actual: Decimal,
        #[case] expected: Decimal,
        #[case] tolerance: Decimal,
        #[case] action: DecisionAction,
    ) {
        let decision =
            VarianceResolver::classify(actual, expected, Decimal::ZERO, Decimal::ZERO, tolerance);
        assert_eq!(decision.action, action);
    }

    #[test]
    fn test_exact_match_needs_no_adjustment() {
        let decision =
            VarianceResolver::classify(dec!(100), dec!(100), dec!(20), dec!(20), dec!(0.05));
        assert_eq!(decision.action, DecisionAction::AutoAdjust);
        assert!(VarianceResolver::adjustment_plan(&decision).is_none());
    }

    #[test]
    fn test_adjust_clears_to_open() {
        let plan = VarianceResolver::resolution_plan(FlexAction::Adjust);
        assert_eq!(plan.base_billing_status, BillingStatus::Open);
        assert_eq!(plan.children_billing_status, None);
        assert!(plan.creates_adjustment);
    }

    #[test]
    fn test_flex_product_disputes_base_and_children() {
        let plan = VarianceResolver::resolution_plan(FlexAction::FlexProduct);
        assert_eq!(plan.base_billing_status, BillingStatus::InDispute);
        assert_eq!(plan.children_billing_status, Some(BillingStatus::InDispute));
        assert!(!plan.creates_adjustment);
    }

    #[test]
    fn test_chargeback_approve_disputes_base() {
        let plan = VarianceResolver::resolution_plan(FlexAction::ChargebackApprove);
        assert_eq!(plan.base_billing_status, BillingStatus::InDispute);
    }

    #[test]
    fn test_rate_propagation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let updated =
            VarianceResolver::propagate_rate(dec!(0.25), &[(a, dec!(200)), (b, dec!(400))]);
        assert_eq!(updated, vec![(a, dec!(50)), (b, dec!(100))]);
    }
}
