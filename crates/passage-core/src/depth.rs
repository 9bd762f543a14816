//! Grounding-risk computation from charted depth, tide, and vessel draft.
//!
//! All depths are in feet relative to the chart datum (MLW unless the
//! configured datum adjustment says otherwise).

use serde::{Deserialize, Serialize};

use crate::error::SafetyError;
use crate::models::{CrewExperience, Waypoint};

/// Configuration for under-keel clearance requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthConfig {
    /// Required clearance as a percentage of vessel draft.
    pub minimum_clearance_percent: f64,
    /// Required clearance floor in feet, applied when the percentage
    /// yields less.
    pub minimum_absolute_clearance_ft: f64,
    /// Correction applied when charts use a datum other than MLW.
    pub chart_datum_adjustment_ft: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            minimum_clearance_percent: 20.0,
            minimum_absolute_clearance_ft: 2.0,
            chart_datum_adjustment_ft: 0.0,
        }
    }
}

/// How severe a depth finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthSeverity {
    Critical,
    High,
    Moderate,
    Safe,
}

impl DepthSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepthSeverity::Critical => "critical",
            DepthSeverity::High => "high",
            DepthSeverity::Moderate => "moderate",
            DepthSeverity::Safe => "safe",
        }
    }
}

/// Result of a single depth-safety evaluation. Derived value, not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthCalculation {
    pub location: Waypoint,
    pub charted_depth_ft: f64,
    pub tidal_adjustment_ft: f64,
    pub actual_depth_ft: f64,
    pub vessel_draft_ft: f64,
    pub minimum_clearance_ft: f64,
    pub clearance_available_ft: f64,
    pub is_grounding_risk: bool,
    pub severity: DepthSeverity,
    pub recommendation: String,
}

/// Stateless depth-safety engine parameterized by an immutable config.
#[derive(Debug, Clone, Default)]
pub struct DepthSafetyEngine {
    config: DepthConfig,
}

impl DepthSafetyEngine {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DepthConfig {
        &self.config
    }

    /// Evaluate grounding risk at a single location.
    ///
    /// Fails fast with [`SafetyError::InvalidInput`] for a negative charted
    /// depth or a non-positive draft; those indicate a caller bug, never a
    /// condition to degrade through.
    pub fn calculate_depth_safety(
        &self,
        location: Waypoint,
        charted_depth_ft: f64,
        vessel_draft_ft: f64,
        tidal_height_ft: f64,
    ) -> Result<DepthCalculation, SafetyError> {
        if charted_depth_ft < 0.0 {
            return Err(SafetyError::InvalidInput(format!(
                "charted depth must be non-negative, got {charted_depth_ft}"
            )));
        }
        if vessel_draft_ft <= 0.0 {
            return Err(SafetyError::InvalidInput(format!(
                "vessel draft must be positive, got {vessel_draft_ft}"
            )));
        }

        let actual_depth_ft =
            charted_depth_ft + tidal_height_ft + self.config.chart_datum_adjustment_ft;
        let minimum_clearance_ft = (vessel_draft_ft * self.config.minimum_clearance_percent
            / 100.0)
            .max(self.config.minimum_absolute_clearance_ft);
        let clearance_available_ft = actual_depth_ft - vessel_draft_ft;
        let is_grounding_risk = clearance_available_ft < minimum_clearance_ft;

        let (severity, recommendation) = if clearance_available_ft < 0.0 {
            (
                DepthSeverity::Critical,
                format!(
                    "DO NOT PROCEED: vessel will ground. Depth of {:.1} ft is {:.1} ft \
                     less than the {:.1} ft draft.",
                    actual_depth_ft, -clearance_available_ft, vessel_draft_ft
                ),
            )
        } else if clearance_available_ft < 1.0 {
            (
                DepthSeverity::Critical,
                format!(
                    "DO NOT PROCEED: only {:.1} ft under the keel. Wait for a higher \
                     tide or find an alternate route.",
                    clearance_available_ft
                ),
            )
        } else if clearance_available_ft < minimum_clearance_ft {
            (
                DepthSeverity::High,
                format!(
                    "High grounding risk: {:.1} ft clearance is below the {:.1} ft \
                     minimum. Transit only on a rising tide with continuous depth \
                     monitoring.",
                    clearance_available_ft, minimum_clearance_ft
                ),
            )
        } else if clearance_available_ft < minimum_clearance_ft * 1.5 {
            (
                DepthSeverity::Moderate,
                format!(
                    "Marginal clearance: {:.1} ft available against a {:.1} ft \
                     minimum. Reduce speed and watch the sounder.",
                    clearance_available_ft, minimum_clearance_ft
                ),
            )
        } else {
            (
                DepthSeverity::Safe,
                format!(
                    "Safe passage: {:.1} ft under-keel clearance.",
                    clearance_available_ft
                ),
            )
        };

        Ok(DepthCalculation {
            location,
            charted_depth_ft,
            tidal_adjustment_ft: tidal_height_ft,
            actual_depth_ft,
            vessel_draft_ft,
            minimum_clearance_ft,
            clearance_available_ft,
            is_grounding_risk,
            severity,
            recommendation,
        })
    }

    /// Minimum charted depth a vessel of the given draft needs for safe
    /// passage under the configured clearance rules.
    pub fn calculate_minimum_safe_depth(&self, vessel_draft_ft: f64) -> f64 {
        vessel_draft_ft
            + (vessel_draft_ft * self.config.minimum_clearance_percent / 100.0)
                .max(self.config.minimum_absolute_clearance_ft)
    }

    /// Scale a clearance requirement by crew experience.
    pub fn adjust_for_crew_experience(&self, base_clearance_ft: f64, level: CrewExperience) -> f64 {
        let multiplier = match level {
            CrewExperience::Novice => 1.5,
            CrewExperience::Intermediate => 1.2,
            CrewExperience::Advanced => 1.0,
            CrewExperience::Professional => 0.9,
        };
        base_clearance_ft * multiplier
    }

    /// Whether a spot remains passable at the lowest expected tide.
    pub fn check_at_low_water(
        &self,
        charted_depth_ft: f64,
        vessel_draft_ft: f64,
        lowest_tide_ft: f64,
    ) -> bool {
        charted_depth_ft + lowest_tide_ft >= self.calculate_minimum_safe_depth(vessel_draft_ft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DepthSafetyEngine {
        DepthSafetyEngine::default()
    }

    fn here() -> Waypoint {
        Waypoint::new(41.5, -70.7)
    }

    #[test]
    fn rejects_negative_depth_and_bad_draft() {
        assert!(engine()
            .calculate_depth_safety(here(), -1.0, 6.0, 0.0)
            .is_err());
        assert!(engine()
            .calculate_depth_safety(here(), 10.0, 0.0, 0.0)
            .is_err());
        assert!(engine()
            .calculate_depth_safety(here(), 10.0, -2.0, 0.0)
            .is_err());
    }

    #[test]
    fn clearance_arithmetic_is_exact() {
        let calc = engine()
            .calculate_depth_safety(here(), 20.0, 6.0, 1.5)
            .unwrap();
        assert_eq!(calc.actual_depth_ft, 21.5);
        assert_eq!(
            calc.clearance_available_ft,
            calc.actual_depth_ft - calc.vessel_draft_ft
        );
        assert_eq!(calc.severity, DepthSeverity::Safe);
        assert!(!calc.is_grounding_risk);
    }

    #[test]
    fn shoal_water_on_a_falling_tide_is_high_risk() {
        // depth 8 ft, draft 6.5 ft, tide -0.5 ft:
        // actual 7.5, clearance 1.0, minimum 2.0 (20% of 6.5 is 1.3 < 2.0)
        let calc = engine()
            .calculate_depth_safety(here(), 8.0, 6.5, -0.5)
            .unwrap();
        assert_eq!(calc.actual_depth_ft, 7.5);
        assert_eq!(calc.clearance_available_ft, 1.0);
        assert_eq!(calc.minimum_clearance_ft, 2.0);
        assert!(calc.is_grounding_risk);
        assert_eq!(calc.severity, DepthSeverity::High);
    }

    #[test]
    fn zero_clearance_is_critical() {
        let calc = engine()
            .calculate_depth_safety(here(), 6.0, 6.0, 0.0)
            .unwrap();
        assert_eq!(calc.clearance_available_ft, 0.0);
        assert_eq!(calc.severity, DepthSeverity::Critical);
        assert!(calc.is_grounding_risk);
    }

    #[test]
    fn negative_clearance_means_grounding() {
        let calc = engine()
            .calculate_depth_safety(here(), 5.0, 6.0, 0.0)
            .unwrap();
        assert_eq!(calc.clearance_available_ft, -1.0);
        assert_eq!(calc.severity, DepthSeverity::Critical);
        assert!(calc.recommendation.contains("ground"));
    }

    #[test]
    fn minimum_safe_depth_formula() {
        let engine = engine();
        // 20% of 6 ft is 1.2, below the 2 ft floor
        assert_eq!(engine.calculate_minimum_safe_depth(6.0), 8.0);
        // 20% of 20 ft is 4.0, above the floor
        assert_eq!(engine.calculate_minimum_safe_depth(20.0), 24.0);
    }

    #[test]
    fn crew_experience_multipliers() {
        let engine = engine();
        assert_eq!(
            engine.adjust_for_crew_experience(2.0, CrewExperience::Novice),
            3.0
        );
        assert_eq!(
            engine.adjust_for_crew_experience(2.0, CrewExperience::Intermediate),
            2.4
        );
        assert_eq!(
            engine.adjust_for_crew_experience(2.0, CrewExperience::Advanced),
            2.0
        );
        assert_eq!(
            engine.adjust_for_crew_experience(2.0, CrewExperience::Professional),
            1.8
        );
    }

    #[test]
    fn low_water_check() {
        let engine = engine();
        // draft 6 ft needs 8 ft; charted 9 ft at a -1 ft spring low is exactly 8
        assert!(engine.check_at_low_water(9.0, 6.0, -1.0));
        assert!(!engine.check_at_low_water(8.5, 6.0, -1.0));
    }
}
