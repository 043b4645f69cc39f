//! # NGPS Determiner
//!
//! Decides whether a facility must keep its own non-state fire-fighting unit
//! (NGPS), is advised to keep a smaller fire post, or can rely on the state
//! fire service, and sizes the apparatus and staff roster.
//!
//! ## Rules
//!
//! - Industries on the mandatory list keep a fire station with the vehicle
//!   count of their technical base, raised for large sites.
//! - Other facilities of category A, B or V farther than 3 km from a state
//!   fire station are advised to keep a fire post (no vehicles).
//!
//! ```text
//! staff per shift = 2            (v = 0)
//!                 = 4            (v = 1)
//!                 = 6 + 2(v − 2) (v ≥ 2)
//! staff total     = per shift × shifts + 2 management if v > 0
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::HazardCategory;
use crate::errors::CalcResult;
use crate::norms::{self, basis};
use crate::settings::NgpsPolicy;
use crate::validation::{Choice, FieldValue, Validator};

/// Industry of the facility operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndustryType {
    OilGas,
    Chemical,
    Energy,
    Mining,
    Airport,
    FuelDepot,
    Metro,
    Nuclear,
    #[default]
    Other,
}

impl IndustryType {
    /// Vehicles in the technical base of a mandatory NGPS unit.
    /// `None` for industries without the obligation.
    pub fn tech_base(&self) -> Option<u32> {
        match self {
            IndustryType::OilGas
            | IndustryType::Chemical
            | IndustryType::Airport
            | IndustryType::Nuclear => Some(2),
            IndustryType::Energy
            | IndustryType::Mining
            | IndustryType::FuelDepot
            | IndustryType::Metro => Some(1),
            IndustryType::Other => None,
        }
    }

    pub fn requires_ngps(&self) -> bool {
        self.tech_base().is_some()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IndustryType::OilGas => "Oil and gas",
            IndustryType::Chemical => "Chemical",
            IndustryType::Energy => "Energy",
            IndustryType::Mining => "Mining",
            IndustryType::Airport => "Airport",
            IndustryType::FuelDepot => "Fuel depot",
            IndustryType::Metro => "Metro",
            IndustryType::Nuclear => "Nuclear",
            IndustryType::Other => "Other",
        }
    }
}

impl Choice for IndustryType {
    const ALL: &'static [Self] = &[
        IndustryType::OilGas,
        IndustryType::Chemical,
        IndustryType::Energy,
        IndustryType::Mining,
        IndustryType::Airport,
        IndustryType::FuelDepot,
        IndustryType::Metro,
        IndustryType::Nuclear,
        IndustryType::Other,
    ];

    fn code(&self) -> &'static str {
        match self {
            IndustryType::OilGas => "oil-gas",
            IndustryType::Chemical => "chemical",
            IndustryType::Energy => "energy",
            IndustryType::Mining => "mining",
            IndustryType::Airport => "airport",
            IndustryType::FuelDepot => "fuel-depot",
            IndustryType::Metro => "metro",
            IndustryType::Nuclear => "nuclear",
            IndustryType::Other => "other",
        }
    }
}

/// Kind of on-site fire protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitType {
    #[serde(rename = "fire_station")]
    FireStation,
    #[serde(rename = "fire_post")]
    FirePost,
    /// State fire service only
    #[serde(rename = "none")]
    NotRequired,
}

impl UnitType {
    pub fn display_name(&self) -> &'static str {
        match self {
            UnitType::FireStation => "NGPS fire station",
            UnitType::FirePost => "Fire post",
            UnitType::NotRequired => "Not required",
        }
    }
}

/// Staff on duty in one shift for `vehicles` fire engines.
///
/// Saturates at `u32::MAX` rather than overflowing.
pub fn staff_per_shift(vehicles: u32) -> u32 {
    match vehicles {
        0 => 2,
        1 => 4,
        v => (v - 2).saturating_mul(2).saturating_add(6),
    }
}

/// Headcount for a roster of `shifts` shifts, including unit management
/// when the unit has apparatus.
pub fn staff_total(vehicles: u32, shifts: u32) -> u32 {
    let management = if vehicles > 0 {
        norms::UNIT_MANAGEMENT_STAFF
    } else {
        0
    };
    staff_per_shift(vehicles)
        .saturating_mul(shifts)
        .saturating_add(management)
}

/// Typed, validated NGPS parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgpsInput {
    #[serde(default)]
    pub label: String,

    pub industry_type: IndustryType,
    /// Site area (m²)
    pub area_m2: u32,
    /// Highest hazard category on site
    pub category: HazardCategory,
    /// Road distance to the nearest state fire station (km)
    pub distance_to_station_km: f64,
}

impl NgpsInput {
    pub fn validate(&self) -> CalcResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish(())
    }

    fn check(&self, v: &mut Validator) {
        v.positive_count("areaM2", self.area_m2);
        v.non_negative("distanceToStationKm", self.distance_to_station_km);
    }

    /// Hazardous facility outside the state service radius
    pub fn needs_post(&self) -> bool {
        self.category.is_hazardous() && self.distance_to_station_km > norms::FIRE_STATION_RADIUS_KM
    }
}

/// Raw NGPS form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NgpsForm {
    pub label: Option<FieldValue>,
    pub industry_type: Option<FieldValue>,
    pub area_m2: Option<FieldValue>,
    pub category: Option<FieldValue>,
    pub distance_to_station_km: Option<FieldValue>,
}

impl NgpsForm {
    pub fn parse(&self) -> CalcResult<NgpsInput> {
        let mut v = Validator::new();
        let input = NgpsInput {
            label: v.text(self.label.as_ref()),
            industry_type: v
                .choice("industryType", self.industry_type.as_ref())
                .unwrap_or_default(),
            area_m2: v.whole_number("areaM2", self.area_m2.as_ref()),
            category: v.choice("category", self.category.as_ref()).unwrap_or_default(),
            distance_to_station_km: v.number("distanceToStationKm", self.distance_to_station_km.as_ref()),
        };
        input.check(&mut v);
        v.finish(input)
    }
}

/// NGPS determination.
///
/// ## JSON Example
///
/// ```json
/// {
///   "required": true,
///   "isPost": false,
///   "unitType": "fire_station",
///   "vehicleCount": 2,
///   "staffPerShift": 6,
///   "staffFor3Shifts": 20,
///   "staffFor4Shifts": 26,
///   "details": ["Industry: Oil and gas (NGPS mandatory)"],
///   "justification": "Law of the Republic of Kazakhstan ..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgpsResult {
    /// NGPS unit is mandatory for the industry
    pub required: bool,
    /// Fire post recommended instead of a full unit
    pub is_post: bool,
    pub unit_type: UnitType,
    pub vehicle_count: u32,
    pub staff_per_shift: u32,
    pub staff_for_3_shifts: u32,
    pub staff_for_4_shifts: u32,
    pub details: Vec<String>,
    pub justification: String,
}

/// Determine NGPS requirements with the default policy.
pub fn calculate(input: &NgpsInput) -> CalcResult<NgpsResult> {
    calculate_with(input, &NgpsPolicy::default())
}

/// Determine NGPS requirements.
///
/// # Arguments
///
/// * `input` - Facility parameters
/// * `policy` - Large-area vehicle bump; an out-of-range policy is reported
///   alongside the input fields
pub fn calculate_with(input: &NgpsInput, policy: &NgpsPolicy) -> CalcResult<NgpsResult> {
    let mut v = Validator::new();
    input.check(&mut v);
    policy.check(&mut v);
    v.finish(())?;

    let mut details = vec![format!(
        "Industry: {}{}",
        input.industry_type.display_name(),
        if input.industry_type.requires_ngps() {
            " (NGPS mandatory)"
        } else {
            ""
        }
    )];

    let result = if let Some(base) = input.industry_type.tech_base() {
        let mut vehicles = base;
        details.push(format!("Technical base: {} fire engine(s)", base));
        if input.area_m2 > policy.large_area_threshold_m2 && vehicles < policy.large_area_min_vehicles {
            vehicles = policy.large_area_min_vehicles;
            details.push(format!(
                "Site area {} m² exceeds {} m²: at least {} fire engines recommended",
                input.area_m2, policy.large_area_threshold_m2, policy.large_area_min_vehicles
            ));
        }
        staffed(true, UnitType::FireStation, vehicles, details, basis::NGPS_REQUIRED)
    } else if input.needs_post() {
        details.push(format!(
            "Category {} facility {:.1} km from the nearest state fire station \
             (service radius {} km)",
            input.category,
            input.distance_to_station_km,
            norms::FIRE_STATION_RADIUS_KM
        ));
        staffed(false, UnitType::FirePost, 0, details, basis::NGPS_POST)
    } else {
        details.push("Covered by the state fire service".to_string());
        NgpsResult {
            required: false,
            is_post: false,
            unit_type: UnitType::NotRequired,
            vehicle_count: 0,
            staff_per_shift: 0,
            staff_for_3_shifts: 0,
            staff_for_4_shifts: 0,
            details,
            justification: basis::NGPS_NONE.to_string(),
        }
    };

    debug!(
        industry = input.industry_type.code(),
        unit_type = ?result.unit_type,
        vehicles = result.vehicle_count,
        staff_3_shifts = result.staff_for_3_shifts,
        "NGPS determined"
    );

    Ok(result)
}

fn staffed(
    required: bool,
    unit_type: UnitType,
    vehicles: u32,
    mut details: Vec<String>,
    justification: &str,
) -> NgpsResult {
    let per_shift = staff_per_shift(vehicles);
    let three = staff_total(vehicles, norms::THREE_SHIFTS);
    let four = staff_total(vehicles, norms::FOUR_SHIFTS);
    details.push(format!(
        "Staff: {} per shift; {} for a 3-shift roster, {} for a 4-shift roster",
        per_shift, three, four
    ));
    NgpsResult {
        required,
        is_post: unit_type == UnitType::FirePost,
        unit_type,
        vehicle_count: vehicles,
        staff_per_shift: per_shift,
        staff_for_3_shifts: three,
        staff_for_4_shifts: four,
        details,
        justification: justification.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(industry: IndustryType, area: u32, category: HazardCategory, distance: f64) -> NgpsInput {
        NgpsInput {
            label: String::new(),
            industry_type: industry,
            area_m2: area,
            category,
            distance_to_station_km: distance,
        }
    }

    #[test]
    fn test_oil_gas_requires_station() {
        let result = calculate(&input(IndustryType::OilGas, 8_000, HazardCategory::A, 5.0)).unwrap();
        assert!(result.required);
        assert!(!result.is_post);
        assert_eq!(result.unit_type, UnitType::FireStation);
        assert_eq!(result.vehicle_count, 2);
        assert_eq!(result.staff_per_shift, 6);
        assert_eq!(result.staff_for_3_shifts, 20);
        assert_eq!(result.staff_for_4_shifts, 26);
        assert_eq!(result.justification, basis::NGPS_REQUIRED);
    }

    #[test]
    fn test_hazardous_remote_site_gets_post() {
        let result = calculate(&input(IndustryType::Other, 4_000, HazardCategory::V, 5.0)).unwrap();
        assert!(!result.required);
        assert!(result.is_post);
        assert_eq!(result.unit_type, UnitType::FirePost);
        assert_eq!(result.vehicle_count, 0);
        assert_eq!(result.staff_per_shift, 2);
        assert_eq!(result.staff_for_3_shifts, 6);
        assert_eq!(result.staff_for_4_shifts, 8);
    }

    #[test]
    fn test_post_needs_distance_beyond_radius() {
        let at_radius = calculate(&input(IndustryType::Other, 4_000, HazardCategory::A, 3.0)).unwrap();
        assert_eq!(at_radius.unit_type, UnitType::NotRequired);
        assert_eq!(at_radius.staff_per_shift, 0);
        assert_eq!(at_radius.staff_for_4_shifts, 0);
        assert_eq!(at_radius.justification, basis::NGPS_NONE);

        let low_hazard = calculate(&input(IndustryType::Other, 4_000, HazardCategory::G, 50.0)).unwrap();
        assert_eq!(low_hazard.unit_type, UnitType::NotRequired);
    }

    #[test]
    fn test_large_area_bump() {
        let small = calculate(&input(IndustryType::Mining, 10_000, HazardCategory::D, 1.0)).unwrap();
        assert_eq!(small.vehicle_count, 1);
        assert_eq!(small.staff_per_shift, 4);
        assert_eq!(small.staff_for_3_shifts, 14);

        let large = calculate(&input(IndustryType::Mining, 10_001, HazardCategory::D, 1.0)).unwrap();
        assert_eq!(large.vehicle_count, 2);
        assert!(large.details.iter().any(|d| d.contains("exceeds 10000")));
    }

    #[test]
    fn test_policy_changes_bump() {
        let policy = NgpsPolicy {
            large_area_threshold_m2: 50_000,
            large_area_min_vehicles: 3,
        };
        let facility = input(IndustryType::Airport, 60_000, HazardCategory::B, 0.0);
        let result = calculate_with(&facility, &policy).unwrap();
        assert_eq!(result.vehicle_count, 3);
        assert_eq!(result.staff_per_shift, 8);
    }

    #[test]
    fn test_staffing_formula() {
        assert_eq!(staff_per_shift(0), 2);
        assert_eq!(staff_per_shift(1), 4);
        assert_eq!(staff_per_shift(2), 6);
        assert_eq!(staff_per_shift(4), 10);
        assert_eq!(staff_total(0, 3), 6);
        assert_eq!(staff_total(1, 4), 18);
        assert_eq!(staff_total(3, 3), 26);
    }

    #[test]
    fn test_out_of_range_policy_is_rejected() {
        let policy = NgpsPolicy {
            large_area_threshold_m2: 10_000,
            large_area_min_vehicles: 4_000_000_000,
        };
        let facility = input(IndustryType::Mining, 0, HazardCategory::D, 1.0);
        let err = calculate_with(&facility, &policy).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["areaM2", "largeAreaMinVehicles"]);

        let zero = NgpsPolicy {
            large_area_min_vehicles: 0,
            ..NgpsPolicy::default()
        };
        let facility = input(IndustryType::Mining, 20_000, HazardCategory::D, 1.0);
        assert_eq!(calculate_with(&facility, &zero).unwrap_err().error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_staffing_saturates() {
        assert_eq!(staff_per_shift(u32::MAX), u32::MAX);
        assert_eq!(staff_total(u32::MAX / 2, 4), u32::MAX);
        assert_eq!(staff_per_shift(50), 102);
    }

    #[test]
    fn test_validation() {
        let facility = input(IndustryType::Metro, 0, HazardCategory::A, -1.0);
        let err = calculate(&facility).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["areaM2", "distanceToStationKm"]);
        assert_eq!(facility.validate().unwrap_err(), err);
    }

    #[test]
    fn test_form_parse() {
        let form: NgpsForm = serde_json::from_str(
            r#"{ "industryType": "Fuel_Depot", "areaM2": "12 500", "category": "б", "distanceToStationKm": "7,5" }"#,
        )
        .unwrap();
        let parsed = form.parse().unwrap();
        assert_eq!(parsed.industry_type, IndustryType::FuelDepot);
        assert_eq!(parsed.area_m2, 12_500);
        assert_eq!(parsed.category, HazardCategory::B);
        assert_eq!(parsed.distance_to_station_km, 7.5);
    }

    #[test]
    fn test_unknown_industry_is_rejected() {
        let form: NgpsForm = serde_json::from_str(
            r#"{ "industryType": "shipyard", "areaM2": 100, "category": "A", "distanceToStationKm": 1 }"#,
        )
        .unwrap();
        let err = form.parse().unwrap_err();
        assert_eq!(err.field_errors()[0].field, "industryType");
        assert!(err.field_errors()[0].reason.contains("oil-gas"));
    }

    #[test]
    fn test_result_json_shape() {
        let result = calculate(&input(IndustryType::Other, 4_000, HazardCategory::V, 5.0)).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["unitType"], "fire_post");
        assert_eq!(json["staffFor3Shifts"], 6);
        assert_eq!(json["isPost"], true);
    }

    proptest! {
        #[test]
        fn farther_never_withdraws_post(
            cat in 0usize..5,
            area in 1u32..100_000,
            near in 0.0f64..20.0,
            extra in 0.0f64..20.0,
        ) {
            let category = HazardCategory::ALL[cat];
            let close = calculate(&input(IndustryType::Other, area, category, near)).unwrap();
            let far = calculate(&input(IndustryType::Other, area, category, near + extra)).unwrap();
            if close.is_post {
                prop_assert!(far.is_post);
            }
        }

        #[test]
        fn determination_is_deterministic(
            ind in 0usize..9,
            cat in 0usize..5,
            area in 1u32..1_000_000,
            distance in 0.0f64..50.0,
        ) {
            let facility = input(IndustryType::ALL[ind], area, HazardCategory::ALL[cat], distance);
            prop_assert_eq!(calculate(&facility).unwrap(), calculate(&facility).unwrap());
        }

        #[test]
        fn mandatory_industries_always_have_vehicles(ind in 0usize..8, area in 1u32..1_000_000) {
            let industry = IndustryType::ALL[ind];
            let result = calculate(&input(industry, area, HazardCategory::D, 0.0)).unwrap();
            prop_assert!(result.required);
            prop_assert!(result.vehicle_count >= 1);
            prop_assert_eq!(result.staff_for_4_shifts - result.staff_for_3_shifts, result.staff_per_shift);
        }
    }
}
