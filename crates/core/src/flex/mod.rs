//! Variance classification and resolution ("flex").
//!
//! Given an applied allocation that deviates from the schedule's expected
//! amounts, classifies the deviation and decides whether to auto-execute an
//! adjustment, defer to a human decision, or route a chargeback into the
//! review queue.

pub mod error;
pub mod resolver;
pub mod types;

pub use error::FlexError;
pub use resolver::VarianceResolver;
pub use types::{
    AdjustmentPlan, DecisionAction, FlexAction, FlexClassification, FlexDecision,
    FlexResolutionPlan, FlexReviewStatus,
};
