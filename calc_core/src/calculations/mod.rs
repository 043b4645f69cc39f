//! # Fire-Safety Calculations
//!
//! Each calculator follows the same pattern:
//!
//! - `*Input` - Typed, validated parameters (JSON-serializable)
//! - `*Form` - Raw form with loosely typed fields, `parse()` into `*Input`
//! - `*Result` - Calculation results (JSON-serializable)
//! - `calculate(input) -> Result<*Result, CalcError>` - Pure calculation function
//!
//! ## Available Calculations
//!
//! - [`evacuation`] - Evacuation time against the permissible time
//! - [`fire_risk`] - Fire-risk score and band
//! - [`ngps`] - Non-state fire-fighting unit requirement and staffing
//!
//! ## Dispatch by name
//!
//! ```rust
//! use calc_core::calculations::{calculate_json, CalculatorKind};
//!
//! let body = r#"{ "industryType": "oil-gas", "areaM2": 8000, "category": "A", "distanceToStationKm": 5 }"#;
//! let result = calculate_json(CalculatorKind::Ngps, body).unwrap();
//! assert_eq!(result["unitType"], "fire_station");
//! ```

pub mod evacuation;
pub mod fire_risk;
pub mod ngps;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::settings::GlobalSettings;
use crate::validation::Choice;

// Re-export commonly used types
pub use evacuation::{EvacuationForm, EvacuationInput, EvacuationResult};
pub use fire_risk::{FireRiskForm, FireRiskInput, FireRiskResult};
pub use ngps::{NgpsForm, NgpsInput, NgpsResult};

/// Calculator selector, as used in `/calculate/{kind}` routes and CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculatorKind {
    Evacuation,
    FireRisk,
    Ngps,
}

impl CalculatorKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            CalculatorKind::Evacuation => "Evacuation time",
            CalculatorKind::FireRisk => "Fire risk",
            CalculatorKind::Ngps => "NGPS",
        }
    }
}

impl Choice for CalculatorKind {
    const ALL: &'static [Self] = &[
        CalculatorKind::Evacuation,
        CalculatorKind::FireRisk,
        CalculatorKind::Ngps,
    ];

    fn code(&self) -> &'static str {
        match self {
            CalculatorKind::Evacuation => "evacuation",
            CalculatorKind::FireRisk => "fire-risk",
            CalculatorKind::Ngps => "ngps",
        }
    }
}

impl std::str::FromStr for CalculatorKind {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalculatorKind::from_code(s).ok_or_else(|| {
            CalcError::invalid_input(
                "kind",
                s,
                format!("must be one of: {}", CalculatorKind::allowed_codes()),
            )
        })
    }
}

impl std::fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Enum wrapper for all calculation types.
///
/// This allows storing heterogeneous calculations in a single collection
/// while maintaining type safety and clean serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationItem {
    /// Evacuation time estimate for one escape route
    Evacuation(EvacuationInput),
    /// Fire-risk assessment of a building
    FireRisk(FireRiskInput),
    /// NGPS determination for a facility
    Ngps(NgpsInput),
}

impl CalculationItem {
    /// Get the user-provided label for this calculation
    pub fn label(&self) -> &str {
        match self {
            CalculationItem::Evacuation(i) => &i.label,
            CalculationItem::FireRisk(i) => &i.label,
            CalculationItem::Ngps(i) => &i.label,
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        match self {
            CalculationItem::Evacuation(i) => i.label = label,
            CalculationItem::FireRisk(i) => i.label = label,
            CalculationItem::Ngps(i) => i.label = label,
        }
    }

    pub fn kind(&self) -> CalculatorKind {
        match self {
            CalculationItem::Evacuation(_) => CalculatorKind::Evacuation,
            CalculationItem::FireRisk(_) => CalculatorKind::FireRisk,
            CalculationItem::Ngps(_) => CalculatorKind::Ngps,
        }
    }

    /// Get the calculation type as a string
    pub fn calc_type(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Run the calculation under the given settings.
    pub fn calculate(&self, settings: &GlobalSettings) -> CalcResult<CalculationOutcome> {
        Ok(match self {
            CalculationItem::Evacuation(i) => {
                CalculationOutcome::Evacuation(evacuation::calculate_with(i, &settings.evacuation)?)
            }
            CalculationItem::FireRisk(i) => CalculationOutcome::FireRisk(fire_risk::calculate(i)?),
            CalculationItem::Ngps(i) => CalculationOutcome::Ngps(ngps::calculate_with(i, &settings.ngps)?),
        })
    }
}

/// Result of any calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result")]
pub enum CalculationOutcome {
    Evacuation(EvacuationResult),
    FireRisk(FireRiskResult),
    Ngps(NgpsResult),
}

impl CalculationOutcome {
    pub fn kind(&self) -> CalculatorKind {
        match self {
            CalculationOutcome::Evacuation(_) => CalculatorKind::Evacuation,
            CalculationOutcome::FireRisk(_) => CalculatorKind::FireRisk,
            CalculationOutcome::Ngps(_) => CalculatorKind::Ngps,
        }
    }

    /// One-line verdict for summaries and report headings
    pub fn headline(&self) -> String {
        match self {
            CalculationOutcome::Evacuation(r) => format!(
                "{:.2} min of {:.0} min permitted ({}), bottleneck: {}",
                r.evacuation_time_min,
                r.required_time_min,
                r.status.display_name(),
                r.bottleneck
            ),
            CalculationOutcome::FireRisk(r) => format!(
                "Risk {:.1} / 100 ({})",
                r.total_risk,
                r.risk_level.display_name()
            ),
            CalculationOutcome::Ngps(r) => match r.unit_type {
                ngps::UnitType::NotRequired => r.unit_type.display_name().to_string(),
                _ => format!(
                    "{}, {} vehicle(s), {} staff on a 3-shift roster",
                    r.unit_type.display_name(),
                    r.vehicle_count,
                    r.staff_for_3_shifts
                ),
            },
        }
    }

    /// Recommendations or determination details
    pub fn notes(&self) -> &[String] {
        match self {
            CalculationOutcome::Evacuation(r) => &r.recommendations,
            CalculationOutcome::FireRisk(r) => &r.recommendations,
            CalculationOutcome::Ngps(r) => &r.details,
        }
    }

    /// Whether the outcome calls for action (danger, high/critical risk, NGPS needed)
    pub fn needs_attention(&self) -> bool {
        match self {
            CalculationOutcome::Evacuation(r) => r.status == evacuation::EvacuationStatus::Danger,
            CalculationOutcome::FireRisk(r) => r.risk_level >= fire_risk::RiskLevel::High,
            CalculationOutcome::Ngps(r) => r.unit_type != ngps::UnitType::NotRequired,
        }
    }

    /// Bare result as JSON, without the type tag
    pub fn result_json(&self) -> CalcResult<serde_json::Value> {
        match self {
            CalculationOutcome::Evacuation(r) => serde_json::to_value(r),
            CalculationOutcome::FireRisk(r) => serde_json::to_value(r),
            CalculationOutcome::Ngps(r) => serde_json::to_value(r),
        }
        .map_err(CalcError::serialization)
    }
}

/// Parse a raw JSON form for `kind` into a validated calculation item.
pub fn parse_form(kind: CalculatorKind, body: &str) -> CalcResult<CalculationItem> {
    Ok(match kind {
        CalculatorKind::Evacuation => CalculationItem::Evacuation(from_json::<EvacuationForm>(body)?.parse()?),
        CalculatorKind::FireRisk => CalculationItem::FireRisk(from_json::<FireRiskForm>(body)?.parse()?),
        CalculatorKind::Ngps => CalculationItem::Ngps(from_json::<NgpsForm>(body)?.parse()?),
    })
}

fn from_json<T: serde::de::DeserializeOwned>(body: &str) -> CalcResult<T> {
    serde_json::from_str(body).map_err(CalcError::serialization)
}

/// Parse, validate and calculate a raw JSON form with default settings.
///
/// Returns the bare result object, as a `POST /calculate/{kind}` handler
/// would send it.
pub fn calculate_json(kind: CalculatorKind, body: &str) -> CalcResult<serde_json::Value> {
    calculate_json_with(kind, body, &GlobalSettings::default())
}

pub fn calculate_json_with(
    kind: CalculatorKind,
    body: &str,
    settings: &GlobalSettings,
) -> CalcResult<serde_json::Value> {
    parse_form(kind, body)?.calculate(settings)?.result_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE: &str = r#"{
        "peopleCount": 150, "buildingType": "office", "doorWidthM": 1.2,
        "corridorWidthM": 2.0, "corridorLengthM": 30, "stairWidthM": 1.5,
        "stairFlights": 3, "exitWidthM": 2.0, "mobilityImpairedCount": 0,
        "smokeDensity": "clear"
    }"#;

    #[test]
    fn test_kind_codes() {
        assert_eq!("fire-risk".parse::<CalculatorKind>().unwrap(), CalculatorKind::FireRisk);
        assert_eq!("FIRE_RISK".parse::<CalculatorKind>().unwrap(), CalculatorKind::FireRisk);
        let err = "sprinkler".parse::<CalculatorKind>().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(CalculatorKind::Ngps.to_string(), "ngps");
    }

    #[test]
    fn test_calculate_json_evacuation() {
        let result = calculate_json(CalculatorKind::Evacuation, OFFICE).unwrap();
        assert_eq!(result["status"], "safe");
        assert_eq!(result["bottleneck"], "door");
        assert_eq!(result["requiredTimeMin"], 6.0);
    }

    #[test]
    fn test_calculate_json_reports_validation() {
        let body = OFFICE.replace("\"doorWidthM\": 1.2", "\"doorWidthM\": 0");
        let err = calculate_json(CalculatorKind::Evacuation, &body).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field_errors()[0].field, "doorWidthM");
        assert_eq!(err.field_errors()[0].reason, "must be > 0");
    }

    #[test]
    fn test_malformed_body_is_serialization_error() {
        let err = calculate_json(CalculatorKind::Ngps, "[1, 2").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_item_roundtrip_and_outcome() {
        let mut item = parse_form(CalculatorKind::Evacuation, OFFICE).unwrap();
        item.set_label("Office, 3rd floor");
        assert_eq!(item.label(), "Office, 3rd floor");
        assert_eq!(item.calc_type(), "Evacuation time");

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"type\":\"Evacuation\""));
        let restored: CalculationItem = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, item);

        let outcome = item.calculate(&GlobalSettings::default()).unwrap();
        assert_eq!(outcome.kind(), CalculatorKind::Evacuation);
        assert!(outcome.headline().contains("SAFE"));
        assert!(!outcome.needs_attention());
    }

    #[test]
    fn test_settings_flow_into_calculation() {
        let body = r#"{ "industryType": "energy", "areaM2": 20000, "category": "G", "distanceToStationKm": 0 }"#;
        let item = parse_form(CalculatorKind::Ngps, body).unwrap();

        let defaults = item.calculate(&GlobalSettings::default()).unwrap();
        let mut settings = GlobalSettings::default();
        settings.ngps.large_area_threshold_m2 = 50_000;
        let relaxed = item.calculate(&settings).unwrap();

        match (defaults, relaxed) {
            (CalculationOutcome::Ngps(a), CalculationOutcome::Ngps(b)) => {
                assert_eq!(a.vehicle_count, 2);
                assert_eq!(b.vehicle_count, 1);
            }
            other => panic!("unexpected outcomes: {:?}", other),
        }
    }

    #[test]
    fn test_oversized_policy_is_validation_error() {
        let body = r#"{ "industryType": "energy", "areaM2": 20000, "category": "G", "distanceToStationKm": 0 }"#;
        let settings: GlobalSettings =
            serde_json::from_str(r#"{ "ngps": { "largeAreaMinVehicles": 4000000000 } }"#).unwrap();
        let err = calculate_json_with(CalculatorKind::Ngps, body, &settings).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "largeAreaMinVehicles");
    }
}
