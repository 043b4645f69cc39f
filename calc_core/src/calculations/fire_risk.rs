//! # Fire-Risk Assessment
//!
//! Scores a facility from 0 (negligible) to 100 (critical) and maps the score
//! to a risk band.
//!
//! ## Method
//!
//! ```text
//! risk = base(category) × k(building type)
//!      + Σ weight × min(factor value, cap)        area, density, storeys, power, hazmat, maintenance
//!      − Σ protective system credits              detection, suppression, smoke removal, barriers, extinguishers
//!      − training credit
//! risk = clamp(risk, 0, 100)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use calc_core::calculations::fire_risk::{calculate, FacilityType, FireRiskInput, RiskLevel};
//! use calc_core::category::HazardCategory;
//!
//! let input = FireRiskInput {
//!     label: "Paint shop".to_string(),
//!     building_type: FacilityType::Production,
//!     category: HazardCategory::A,
//!     area_m2: 5_000,
//!     occupancy: 50,
//!     floors: 2,
//!     has_fire_detection: false,
//!     has_suppression: false,
//!     has_smoke_removal: false,
//!     has_fire_barriers: false,
//!     has_extinguishers: false,
//!     has_hazmat: true,
//!     electrical_load_kw: 200,
//!     maintenance_quality: 3,
//!     staff_training: 3,
//! };
//!
//! let result = calculate(&input).unwrap();
//! assert_eq!(result.total_risk, 100.0);
//! assert_eq!(result.risk_level, RiskLevel::Critical);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::HazardCategory;
use crate::errors::CalcResult;
use crate::norms::{self, basis};
use crate::validation::{Choice, FieldValue, Validator};

/// Building purpose for risk weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityType {
    #[default]
    Production,
    Warehouse,
    Administrative,
    Public,
    Residential,
}

impl FacilityType {
    /// Multiplier applied to the category base risk
    pub fn coefficient(&self) -> f64 {
        match self {
            FacilityType::Production => 1.0,
            FacilityType::Warehouse => 0.9,
            FacilityType::Administrative => 0.7,
            FacilityType::Public => 0.8,
            FacilityType::Residential => 0.6,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FacilityType::Production => "Production",
            FacilityType::Warehouse => "Warehouse",
            FacilityType::Administrative => "Administrative",
            FacilityType::Public => "Public",
            FacilityType::Residential => "Residential",
        }
    }
}

impl Choice for FacilityType {
    const ALL: &'static [Self] = &[
        FacilityType::Production,
        FacilityType::Warehouse,
        FacilityType::Administrative,
        FacilityType::Public,
        FacilityType::Residential,
    ];

    fn code(&self) -> &'static str {
        match self {
            FacilityType::Production => "production",
            FacilityType::Warehouse => "warehouse",
            FacilityType::Administrative => "administrative",
            FacilityType::Public => "public",
            FacilityType::Residential => "residential",
        }
    }
}

/// Base risk of a hazard category before weighting
pub fn base_category_risk(category: HazardCategory) -> f64 {
    match category {
        HazardCategory::A => 90.0,
        HazardCategory::B => 75.0,
        HazardCategory::V => 60.0,
        HazardCategory::G => 40.0,
        HazardCategory::D => 25.0,
    }
}

/// Active fire-protection systems, each with a fixed risk credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectiveSystem {
    Detection,
    Suppression,
    SmokeRemoval,
    FireBarriers,
    Extinguishers,
}

impl ProtectiveSystem {
    pub const ALL: [ProtectiveSystem; 5] = [
        ProtectiveSystem::Detection,
        ProtectiveSystem::Suppression,
        ProtectiveSystem::SmokeRemoval,
        ProtectiveSystem::FireBarriers,
        ProtectiveSystem::Extinguishers,
    ];

    /// Points subtracted from the score when the system is installed
    pub fn credit(&self) -> f64 {
        match self {
            ProtectiveSystem::Detection => 15.0,
            ProtectiveSystem::Suppression => 25.0,
            ProtectiveSystem::SmokeRemoval => 10.0,
            ProtectiveSystem::FireBarriers => 12.0,
            ProtectiveSystem::Extinguishers => 5.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProtectiveSystem::Detection => "Automatic fire detection",
            ProtectiveSystem::Suppression => "Automatic fire suppression",
            ProtectiveSystem::SmokeRemoval => "Smoke removal",
            ProtectiveSystem::FireBarriers => "Fire barriers",
            ProtectiveSystem::Extinguishers => "Fire extinguishers",
        }
    }

    fn missing_advice(&self) -> &'static str {
        match self {
            ProtectiveSystem::Detection => {
                "Install an automatic fire alarm system with warning and evacuation control."
            }
            ProtectiveSystem::Suppression => "Install an automatic fire suppression system.",
            ProtectiveSystem::SmokeRemoval => "Provide smoke removal ventilation for escape routes and large rooms.",
            ProtectiveSystem::FireBarriers => {
                "Divide the building into fire compartments with fire walls, fire doors and dampers."
            }
            ProtectiveSystem::Extinguishers => {
                "Provide primary fire extinguishers in line with the equipment norms for the premises."
            }
        }
    }
}

/// Risk band derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Band a score: >= 80 critical, >= 65 high, >= 45 medium, >= 25 low.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::Critical
        } else if score >= 65.0 {
            RiskLevel::High
        } else if score >= 45.0 {
            RiskLevel::Medium
        } else if score >= 25.0 {
            RiskLevel::Low
        } else {
            RiskLevel::VeryLow
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very low",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

/// One line of the score breakdown. `contribution = weight × value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub name: String,
    pub weight: f64,
    pub value: f64,
    pub max_value: f64,
    pub contribution: f64,
}

impl RiskFactor {
    fn new(name: impl Into<String>, weight: f64, value: f64, max_value: f64) -> Self {
        let value = value.clamp(0.0, max_value);
        RiskFactor {
            name: name.into(),
            weight,
            value,
            max_value,
            contribution: weight * value,
        }
    }
}

/// Typed, validated fire-risk parameters.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "Warehouse No. 2",
///   "buildingType": "warehouse",
///   "category": "V",
///   "areaM2": 2400,
///   "occupancy": 12,
///   "floors": 1,
///   "hasFireDetection": true,
///   "hasSuppression": false,
///   "hasSmokeRemoval": false,
///   "hasFireBarriers": true,
///   "hasExtinguishers": true,
///   "hasHazmat": false,
///   "electricalLoadKw": 120,
///   "maintenanceQuality": 3,
///   "staffTraining": 4
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireRiskInput {
    #[serde(default)]
    pub label: String,

    pub building_type: FacilityType,
    pub category: HazardCategory,

    /// Floor area (m²)
    pub area_m2: u32,
    /// Design number of people on site
    pub occupancy: u32,
    /// Storeys above ground
    pub floors: u32,

    #[serde(default)]
    pub has_fire_detection: bool,
    #[serde(default)]
    pub has_suppression: bool,
    #[serde(default)]
    pub has_smoke_removal: bool,
    #[serde(default)]
    pub has_fire_barriers: bool,
    #[serde(default)]
    pub has_extinguishers: bool,

    /// Hazardous materials stored or processed on site
    #[serde(default)]
    pub has_hazmat: bool,

    /// Installed electrical load (kW)
    #[serde(default)]
    pub electrical_load_kw: u32,

    /// Maintenance of protection systems, 1 (poor) to 5 (excellent)
    pub maintenance_quality: u32,
    /// Staff fire-safety training, 1 (none) to 5 (drilled regularly)
    pub staff_training: u32,
}

impl FireRiskInput {
    /// Validate input parameters, reporting every problem at once.
    pub fn validate(&self) -> CalcResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish(())
    }

    fn check(&self, v: &mut Validator) {
        v.positive_count("areaM2", self.area_m2);
        v.positive_count("occupancy", self.occupancy);
        v.positive_count("floors", self.floors);
        v.in_range(
            "maintenanceQuality",
            self.maintenance_quality,
            norms::QUALITY_MIN,
            norms::QUALITY_MAX,
        );
        v.in_range("staffTraining", self.staff_training, norms::QUALITY_MIN, norms::QUALITY_MAX);
    }

    /// Whether a protective system is installed
    pub fn has(&self, system: ProtectiveSystem) -> bool {
        match system {
            ProtectiveSystem::Detection => self.has_fire_detection,
            ProtectiveSystem::Suppression => self.has_suppression,
            ProtectiveSystem::SmokeRemoval => self.has_smoke_removal,
            ProtectiveSystem::FireBarriers => self.has_fire_barriers,
            ProtectiveSystem::Extinguishers => self.has_extinguishers,
        }
    }

    /// People per 100 m² of floor area
    pub fn occupancy_density(&self) -> f64 {
        f64::from(self.occupancy) / f64::from(self.area_m2) * 100.0
    }
}

/// Raw fire-risk form. Checkboxes may be omitted (unchecked).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FireRiskForm {
    pub label: Option<FieldValue>,
    pub building_type: Option<FieldValue>,
    pub category: Option<FieldValue>,
    pub area_m2: Option<FieldValue>,
    pub occupancy: Option<FieldValue>,
    pub floors: Option<FieldValue>,
    pub has_fire_detection: Option<FieldValue>,
    pub has_suppression: Option<FieldValue>,
    pub has_smoke_removal: Option<FieldValue>,
    pub has_fire_barriers: Option<FieldValue>,
    pub has_extinguishers: Option<FieldValue>,
    pub has_hazmat: Option<FieldValue>,
    pub electrical_load_kw: Option<FieldValue>,
    pub maintenance_quality: Option<FieldValue>,
    pub staff_training: Option<FieldValue>,
}

impl FireRiskForm {
    /// Coerce and validate the form into a [`FireRiskInput`].
    pub fn parse(&self) -> CalcResult<FireRiskInput> {
        let mut v = Validator::new();
        let input = FireRiskInput {
            label: v.text(self.label.as_ref()),
            building_type: v
                .choice("buildingType", self.building_type.as_ref())
                .unwrap_or_default(),
            category: v.choice("category", self.category.as_ref()).unwrap_or_default(),
            area_m2: v.whole_number("areaM2", self.area_m2.as_ref()),
            occupancy: v.whole_number("occupancy", self.occupancy.as_ref()),
            floors: v.whole_number("floors", self.floors.as_ref()),
            has_fire_detection: v.flag("hasFireDetection", self.has_fire_detection.as_ref()),
            has_suppression: v.flag("hasSuppression", self.has_suppression.as_ref()),
            has_smoke_removal: v.flag("hasSmokeRemoval", self.has_smoke_removal.as_ref()),
            has_fire_barriers: v.flag("hasFireBarriers", self.has_fire_barriers.as_ref()),
            has_extinguishers: v.flag("hasExtinguishers", self.has_extinguishers.as_ref()),
            has_hazmat: v.flag("hasHazmat", self.has_hazmat.as_ref()),
            electrical_load_kw: match &self.electrical_load_kw {
                Some(raw) => v.whole_number("electricalLoadKw", Some(raw)),
                None => 0,
            },
            maintenance_quality: v.whole_number("maintenanceQuality", self.maintenance_quality.as_ref()),
            staff_training: v.whole_number("staffTraining", self.staff_training.as_ref()),
        };
        input.check(&mut v);
        v.finish(input)
    }
}

/// Results from the fire-risk assessment.
///
/// ## JSON Example
///
/// ```json
/// {
///   "totalRisk": 41.3,
///   "riskLevel": "low",
///   "factors": [
///     { "name": "Hazard category V", "weight": 0.9, "value": 60.0, "maxValue": 90.0, "contribution": 54.0 }
///   ],
///   "recommendations": [
///     "Install an automatic fire suppression system.",
///     "Regulatory basis: Technical Regulation ..."
///   ],
///   "regulatoryBasis": "Technical Regulation ..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireRiskResult {
    /// Final score clamped to [0, 100]
    pub total_risk: f64,
    pub risk_level: RiskLevel,
    /// Score breakdown in evaluation order
    pub factors: Vec<RiskFactor>,
    /// Fixed advice, regulatory basis last
    pub recommendations: Vec<String>,
    pub regulatory_basis: String,
}

impl FireRiskResult {
    /// Score before clamping
    pub fn raw_score(&self) -> f64 {
        self.factors.iter().map(|f| f.contribution).sum()
    }
}

/// Score fire risk.
///
/// # Returns
///
/// * `Ok(FireRiskResult)` - Score, band, breakdown and recommendations
/// * `Err(CalcError::ValidationFailed)` - Every invalid field
pub fn calculate(input: &FireRiskInput) -> CalcResult<FireRiskResult> {
    input.validate()?;

    let factors = score_factors(input);
    let raw: f64 = factors.iter().map(|f| f.contribution).sum();
    let total_risk = raw.clamp(0.0, 100.0);
    let risk_level = RiskLevel::from_score(total_risk);

    debug!(
        category = %input.category,
        raw_score = raw,
        total_risk,
        risk_level = ?risk_level,
        "fire risk scored"
    );

    Ok(FireRiskResult {
        total_risk,
        risk_level,
        factors,
        recommendations: recommendations(input, risk_level),
        regulatory_basis: basis::FIRE_RISK.to_string(),
    })
}

fn score_factors(input: &FireRiskInput) -> Vec<RiskFactor> {
    let area = f64::from(input.area_m2);
    let mut factors = vec![
        RiskFactor::new(
            format!("Hazard category {}", input.category),
            input.building_type.coefficient(),
            base_category_risk(input.category),
            90.0,
        ),
        RiskFactor::new("Floor area", 0.2, 10.0 * area.log10(), 50.0),
        RiskFactor::new("Occupancy density", 0.25, 2.0 * input.occupancy_density(), 40.0),
        RiskFactor::new("Storeys", 0.15, 4.0 * f64::from(input.floors.saturating_sub(1)), 40.0),
        RiskFactor::new(
            "Electrical load",
            0.15,
            f64::from(input.electrical_load_kw) / 20.0,
            40.0,
        ),
        RiskFactor::new(
            "Hazardous materials",
            0.3,
            if input.has_hazmat { 30.0 } else { 0.0 },
            30.0,
        ),
    ];

    for system in ProtectiveSystem::ALL {
        let credit = if input.has(system) { system.credit() } else { 0.0 };
        factors.push(RiskFactor::new(system.display_name(), -1.0, credit, system.credit()));
    }

    let maintenance_gap = norms::QUALITY_BASELINE.saturating_sub(input.maintenance_quality);
    factors.push(RiskFactor::new(
        "Maintenance shortfall",
        1.0,
        5.0 * f64::from(maintenance_gap),
        10.0,
    ));

    let training_surplus = input.staff_training.saturating_sub(norms::QUALITY_BASELINE);
    factors.push(RiskFactor::new(
        "Staff training",
        -1.0,
        3.0 * f64::from(training_surplus),
        6.0,
    ));

    factors
}

fn recommendations(input: &FireRiskInput, level: RiskLevel) -> Vec<String> {
    let mut out = Vec::new();
    match level {
        RiskLevel::Critical => out.push(
            "Critical fire risk: restrict operation of the most hazardous areas until \
             compensating measures are in place and commission an independent fire-risk audit."
                .to_string(),
        ),
        RiskLevel::High => out.push(
            "High fire risk: prepare a risk-reduction plan with deadlines and commission a \
             fire-risk audit."
                .to_string(),
        ),
        _ => {}
    }
    for system in ProtectiveSystem::ALL {
        if !input.has(system) {
            out.push(system.missing_advice().to_string());
        }
    }
    if input.has_hazmat {
        out.push(
            "Store hazardous materials in separate compartments with explosion-proof electrical \
             equipment and spill containment."
                .to_string(),
        );
    }
    if input.maintenance_quality < norms::QUALITY_BASELINE {
        out.push(
            "Put fire-protection systems under a maintenance contract with scheduled inspections \
             and a service log."
                .to_string(),
        );
    }
    if input.staff_training < norms::QUALITY_BASELINE {
        out.push("Train staff in fire safety and run evacuation drills at least twice a year.".to_string());
    }
    if out.is_empty() {
        out.push("Maintain the current fire-protection measures and review this assessment annually.".to_string());
    }
    out.push(format!("Regulatory basis: {}", basis::FIRE_RISK));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paint_shop() -> FireRiskInput {
        FireRiskInput {
            label: "Paint shop".to_string(),
            building_type: FacilityType::Production,
            category: HazardCategory::A,
            area_m2: 5_000,
            occupancy: 50,
            floors: 2,
            has_fire_detection: false,
            has_suppression: false,
            has_smoke_removal: false,
            has_fire_barriers: false,
            has_extinguishers: false,
            has_hazmat: true,
            electrical_load_kw: 200,
            maintenance_quality: 3,
            staff_training: 3,
        }
    }

    fn protected_office() -> FireRiskInput {
        FireRiskInput {
            label: "Head office".to_string(),
            building_type: FacilityType::Administrative,
            category: HazardCategory::D,
            area_m2: 1_000,
            occupancy: 40,
            floors: 3,
            has_fire_detection: true,
            has_suppression: true,
            has_smoke_removal: true,
            has_fire_barriers: true,
            has_extinguishers: true,
            has_hazmat: false,
            electrical_load_kw: 100,
            maintenance_quality: 5,
            staff_training: 5,
        }
    }

    #[test]
    fn test_unprotected_category_a_is_critical() {
        let result = calculate(&paint_shop()).unwrap();
        assert_eq!(result.total_risk, 100.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);

        let hazmat = result.factors.iter().find(|f| f.name == "Hazardous materials").unwrap();
        assert!((hazmat.contribution - 9.0).abs() < 1e-9);
        assert!(result.raw_score() > 100.0);
    }

    #[test]
    fn test_factor_breakdown() {
        let result = calculate(&paint_shop()).unwrap();
        let names: Vec<_> = result.factors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names[0], "Hazard category A");
        assert_eq!(result.factors.len(), 13);

        let area = &result.factors[1];
        // 10 * log10(5000) = 36.99
        assert!((area.value - 36.99).abs() < 0.01);
        assert!((area.contribution - 7.398).abs() < 0.01);

        let density = &result.factors[2];
        // 50 people on 5000 m2 = 1 per 100 m2
        assert!((density.value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_protected_office_is_very_low() {
        let result = calculate(&protected_office()).unwrap();
        // 25*0.7 + 0.2*30 + 0.25*8 + 0.15*8 + 0.15*5 - 67 - 6 < 0
        assert_eq!(result.total_risk, 0.0);
        assert_eq!(result.risk_level, RiskLevel::VeryLow);
        assert_eq!(
            result.recommendations,
            vec![
                "Maintain the current fire-protection measures and review this assessment annually.".to_string(),
                format!("Regulatory basis: {}", basis::FIRE_RISK),
            ]
        );
    }

    #[test]
    fn test_regulatory_basis_is_last() {
        let mut input = protected_office();
        input.has_suppression = false;
        input.has_hazmat = true;
        let result = calculate(&input).unwrap();
        let last = result.recommendations.last().unwrap();
        assert!(last.starts_with("Regulatory basis:"));
        assert_eq!(*last, format!("Regulatory basis: {}", result.regulatory_basis));
        assert_eq!(
            result.recommendations.iter().filter(|r| r.starts_with("Regulatory basis:")).count(),
            1
        );
    }

    #[test]
    fn test_warehouse_category_v() {
        let input = FireRiskInput {
            label: "Warehouse".to_string(),
            building_type: FacilityType::Warehouse,
            category: HazardCategory::V,
            area_m2: 2_400,
            occupancy: 12,
            floors: 1,
            has_fire_detection: true,
            has_suppression: false,
            has_smoke_removal: false,
            has_fire_barriers: true,
            has_extinguishers: true,
            has_hazmat: false,
            electrical_load_kw: 120,
            maintenance_quality: 3,
            staff_training: 4,
        };
        let result = calculate(&input).unwrap();
        // 54 + 6.76 + 0.25 + 0 + 0.9 - 15 - 12 - 5 - 3 = 26.9
        assert!((result.total_risk - 26.91).abs() < 0.05);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result
            .recommendations
            .contains(&"Install an automatic fire suppression system.".to_string()));
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(79.999), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(65.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(64.999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(45.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(25.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(24.999), RiskLevel::VeryLow);
    }

    #[test]
    fn test_poor_maintenance_adds_penalty() {
        let mut input = protected_office();
        input.category = HazardCategory::B;
        input.building_type = FacilityType::Production;
        let good = calculate(&input).unwrap().total_risk;
        input.maintenance_quality = 1;
        let poor = calculate(&input).unwrap();
        assert!((poor.total_risk - good - 10.0).abs() < 1e-9);
        assert!(poor.recommendations.iter().any(|r| r.contains("maintenance contract")));
    }

    #[test]
    fn test_high_band_recommendation() {
        let mut input = paint_shop();
        input.has_fire_detection = true;
        input.has_extinguishers = true;
        input.has_hazmat = false;
        let result = calculate(&input).unwrap();
        // 90 + 7.398 + 0.5 + 0.6 + 1.5 - 15 - 5 = 79.998, just under critical
        assert!((result.total_risk - 79.998).abs() < 0.001);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.recommendations[0].starts_with("High fire risk"));

        input.has_smoke_removal = true;
        let lower = calculate(&input).unwrap();
        assert!((result.total_risk - lower.total_risk - 10.0).abs() < 1e-9);
        assert_eq!(lower.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_validation_reports_all_fields() {
        let mut input = paint_shop();
        input.area_m2 = 0;
        input.floors = 0;
        input.staff_training = 6;
        let err = calculate(&input).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["areaM2", "floors", "staffTraining"]);
    }

    #[test]
    fn test_form_parse() {
        let form: FireRiskForm = serde_json::from_str(
            r#"{
                "buildingType": "public",
                "category": "Б",
                "areaM2": "1 200",
                "occupancy": 300,
                "floors": "2",
                "hasFireDetection": "on",
                "hasExtinguishers": true,
                "maintenanceQuality": "4",
                "staffTraining": 2
            }"#,
        )
        .unwrap();
        let input = form.parse().unwrap();
        assert_eq!(input.category, HazardCategory::B);
        assert_eq!(input.area_m2, 1_200);
        assert!(input.has_fire_detection);
        assert!(!input.has_suppression);
        assert_eq!(input.electrical_load_kw, 0);
    }

    #[test]
    fn test_form_rejects_bad_scale() {
        let form: FireRiskForm = serde_json::from_str(
            r#"{ "buildingType": "factory", "category": "A", "areaM2": 100, "occupancy": 5,
                 "floors": 1, "maintenanceQuality": 0, "staffTraining": "3.5" }"#,
        )
        .unwrap();
        let err = form.parse().unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["buildingType", "staffTraining", "maintenanceQuality"]);
    }

    fn arb_input() -> impl Strategy<Value = FireRiskInput> {
        (
            (0usize..5, 0usize..5, 1u32..1_000_000, 1u32..100_000, 1u32..200),
            proptest::collection::vec(any::<bool>(), 6),
            (0u32..100_000, 1u32..=5, 1u32..=5),
        )
            .prop_map(|((ty, cat, area, occupancy, floors), flags, (kw, maintenance, training))| {
                FireRiskInput {
                    label: String::new(),
                    building_type: FacilityType::ALL[ty],
                    category: HazardCategory::ALL[cat],
                    area_m2: area,
                    occupancy,
                    floors,
                    has_fire_detection: flags[0],
                    has_suppression: flags[1],
                    has_smoke_removal: flags[2],
                    has_fire_barriers: flags[3],
                    has_extinguishers: flags[4],
                    has_hazmat: flags[5],
                    electrical_load_kw: kw,
                    maintenance_quality: maintenance,
                    staff_training: training,
                }
            })
    }

    proptest! {
        #[test]
        fn total_risk_stays_in_range(input in arb_input()) {
            let result = calculate(&input).unwrap();
            prop_assert!((0.0..=100.0).contains(&result.total_risk));
            prop_assert_eq!(result.risk_level, RiskLevel::from_score(result.total_risk));
        }

        #[test]
        fn protection_never_increases_risk(input in arb_input(), system in 0usize..5) {
            let mut without = input.clone();
            let mut with = input;
            match ProtectiveSystem::ALL[system] {
                ProtectiveSystem::Detection => { without.has_fire_detection = false; with.has_fire_detection = true; }
                ProtectiveSystem::Suppression => { without.has_suppression = false; with.has_suppression = true; }
                ProtectiveSystem::SmokeRemoval => { without.has_smoke_removal = false; with.has_smoke_removal = true; }
                ProtectiveSystem::FireBarriers => { without.has_fire_barriers = false; with.has_fire_barriers = true; }
                ProtectiveSystem::Extinguishers => { without.has_extinguishers = false; with.has_extinguishers = true; }
            }
            let before = calculate(&without).unwrap().total_risk;
            let after = calculate(&with).unwrap().total_risk;
            prop_assert!(after <= before);
        }

        #[test]
        fn scoring_is_deterministic(input in arb_input()) {
            prop_assert_eq!(calculate(&input).unwrap(), calculate(&input).unwrap());
        }
    }
}
