//! Engine settings injected into decision functions.
//!
//! Tolerances and confidence floors are tenant/user configuration read on
//! every call. They are passed in explicitly so the decision functions stay
//! pure and unit-testable with fixed inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Candidate matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    /// Flat single-pass scoring, candidates tagged `"legacy"`.
    Legacy,
    /// Tiered account/product/amount scoring.
    Hierarchical,
}

impl MatchingMode {
    /// Returns the string form used in settings storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl std::str::FromStr for MatchingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "hierarchical" => Ok(Self::Hierarchical),
            other => Err(format!("Unknown matching mode: {other}")),
        }
    }
}

impl std::fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call engine settings resolved by the settings collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Tenant-level variance tolerance as a fraction of the expected amount.
    pub variance_tolerance: Decimal,
    /// Per-user confidence floor for displayed match suggestions.
    pub suggested_min_confidence: Decimal,
    /// Per-user confidence floor for the auto-match batch runner.
    pub auto_match_min_confidence: Decimal,
    /// Tenant-level matching mode toggle.
    pub engine_mode: MatchingMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            // 5% variance tolerance
            variance_tolerance: Decimal::new(5, 2),
            // show suggestions at >= 0.50
            suggested_min_confidence: Decimal::new(50, 2),
            // auto-match only at >= 0.90
            auto_match_min_confidence: Decimal::new(90, 2),
            engine_mode: MatchingMode::Hierarchical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_matching_mode_round_trip() {
        assert_eq!(MatchingMode::from_str("legacy").unwrap(), MatchingMode::Legacy);
        assert_eq!(
            MatchingMode::from_str("Hierarchical").unwrap(),
            MatchingMode::Hierarchical
        );
        assert_eq!(MatchingMode::Legacy.as_str(), "legacy");
        assert!(MatchingMode::from_str("fuzzy").is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.variance_tolerance, dec!(0.05));
        assert_eq!(settings.suggested_min_confidence, dec!(0.50));
        assert_eq!(settings.auto_match_min_confidence, dec!(0.90));
        assert_eq!(settings.engine_mode, MatchingMode::Hierarchical);
    }
}
