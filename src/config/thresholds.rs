use crate::core::ConfidenceTier;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Score cut-offs for the confidence tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(default = "default_essential")]
    pub essential: f64,

    #[serde(default = "default_recommended")]
    pub recommended: f64,

    #[serde(default = "default_optional")]
    pub optional: f64,
}

fn default_essential() -> f64 {
    0.6
}

fn default_recommended() -> f64 {
    0.3
}

fn default_optional() -> f64 {
    0.1
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            essential: default_essential(),
            recommended: default_recommended(),
            optional: default_optional(),
        }
    }
}

impl TierThresholds {
    /// Thresholds must be strictly decreasing and inside (0, 1]
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| v > 0.0 && v <= 1.0;
        if !(in_range(self.essential) && in_range(self.recommended) && in_range(self.optional)) {
            return Err(Error::Configuration(
                "tier thresholds must be within (0.0, 1.0]".to_string(),
            ));
        }
        if !(self.essential > self.recommended && self.recommended > self.optional) {
            return Err(Error::Configuration(format!(
                "tier thresholds must be strictly decreasing (essential {} > recommended {} > optional {})",
                self.essential, self.recommended, self.optional
            )));
        }
        Ok(())
    }

    pub fn classify(&self, score: f64) -> ConfidenceTier {
        if score >= self.essential {
            ConfidenceTier::Essential
        } else if score >= self.recommended {
            ConfidenceTier::Recommended
        } else if score >= self.optional {
            ConfidenceTier::Optional
        } else {
            ConfidenceTier::Risky
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries_are_inclusive() {
        let t = TierThresholds::default();
        assert_eq!(t.classify(1.0), ConfidenceTier::Essential);
        assert_eq!(t.classify(0.6), ConfidenceTier::Essential);
        assert_eq!(t.classify(0.59), ConfidenceTier::Recommended);
        assert_eq!(t.classify(0.3), ConfidenceTier::Recommended);
        assert_eq!(t.classify(0.1), ConfidenceTier::Optional);
        assert_eq!(t.classify(0.09), ConfidenceTier::Risky);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let t = TierThresholds {
            essential: 0.2,
            recommended: 0.3,
            optional: 0.1,
        };
        assert!(t.validate().is_err());
        assert!(TierThresholds::default().validate().is_ok());
    }
}
