//! # Calculation Settings
//!
//! Policy values that are not hard regulatory constants. They travel with a
//! project file so a saved assessment recalculates the same way later, and
//! the CLI can load them from a standalone JSON file.
//!
//! ```json
//! {
//!   "evacuation": { "singleStoreyStair": "corridor_throughput" },
//!   "ngps": { "largeAreaThresholdM2": 10000, "largeAreaMinVehicles": 2 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::CalcResult;
use crate::validation::Validator;

/// Largest apparatus count a policy may demand
pub const MAX_POLICY_VEHICLES: u32 = 50;

/// All calculator policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalSettings {
    pub evacuation: EvacuationPolicy,
    pub ngps: NgpsPolicy,
}

impl GlobalSettings {
    /// Validate every policy block, reporting all bad fields at once.
    pub fn validate(&self) -> CalcResult<()> {
        let mut v = Validator::new();
        self.ngps.check(&mut v);
        v.finish(())
    }
}

/// How the stair segment is treated when the route has no stair flights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StairSegmentRule {
    /// Rate the stair segment with the corridor constant, so it rarely limits flow
    #[default]
    CorridorThroughput,
    /// Leave the stair segment out of the bottleneck search
    Excluded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvacuationPolicy {
    pub single_storey_stair: StairSegmentRule,
}

/// Large-area apparatus bump. A recommendation, not a norm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NgpsPolicy {
    /// Areas strictly above this get at least `large_area_min_vehicles`
    pub large_area_threshold_m2: u32,
    pub large_area_min_vehicles: u32,
}

impl NgpsPolicy {
    pub fn validate(&self) -> CalcResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish(())
    }

    pub(crate) fn check(&self, v: &mut Validator) {
        v.in_range(
            "largeAreaMinVehicles",
            self.large_area_min_vehicles,
            1,
            MAX_POLICY_VEHICLES,
        );
    }
}

impl Default for NgpsPolicy {
    fn default() -> Self {
        NgpsPolicy {
            large_area_threshold_m2: 10_000,
            large_area_min_vehicles: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: GlobalSettings =
            serde_json::from_str(r#"{ "ngps": { "largeAreaThresholdM2": 20000 } }"#).unwrap();
        assert_eq!(settings.ngps.large_area_threshold_m2, 20_000);
        assert_eq!(settings.ngps.large_area_min_vehicles, 2);
        assert_eq!(settings.evacuation.single_storey_stair, StairSegmentRule::CorridorThroughput);
    }

    #[test]
    fn test_ngps_policy_bounds() {
        assert!(GlobalSettings::default().validate().is_ok());

        let mut policy = NgpsPolicy::default();
        policy.large_area_min_vehicles = 0;
        let err = policy.validate().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field_errors()[0].field, "largeAreaMinVehicles");

        policy.large_area_min_vehicles = 4_000_000_000;
        let settings = GlobalSettings {
            ngps: policy,
            ..GlobalSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field_errors()[0].value, "4000000000");
        assert_eq!(err.field_errors()[0].reason, "must be between 1 and 50");
    }

    #[test]
    fn test_stair_rule_serialization() {
        let json = serde_json::to_string(&StairSegmentRule::Excluded).unwrap();
        assert_eq!(json, "\"excluded\"");
    }
}
