//! # Evacuation Time Estimate
//!
//! Estimates how long occupants need to leave a building along one escape
//! route and compares it with the permissible evacuation time for the type
//! of building.
//!
//! ## Method
//!
//! - Each path element (door, corridor, stair, exit) passes
//!   `width × unit throughput` people per minute; the slowest one is the
//!   bottleneck and sets the queueing time.
//! - Walking time adds the corridor length at 100 m/min and 3.5 m per stair
//!   flight at 60 m/min.
//! - Smoke and occupants with limited mobility scale the total.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::calculations::evacuation::{
//!     calculate, EvacuationInput, EvacuationStatus, OccupancyType, PathSegment, SmokeDensity,
//! };
//!
//! let input = EvacuationInput {
//!     label: "Office block, 3rd floor".to_string(),
//!     people_count: 150,
//!     building_type: OccupancyType::Office,
//!     door_width_m: 1.2,
//!     corridor_width_m: 2.0,
//!     corridor_length_m: 30.0,
//!     stair_width_m: 1.5,
//!     stair_flights: 3,
//!     exit_width_m: 2.0,
//!     mobility_impaired_count: 0,
//!     smoke_density: SmokeDensity::Clear,
//! };
//!
//! let result = calculate(&input).unwrap();
//! assert_eq!(result.bottleneck, PathSegment::Door);
//! assert_eq!(result.status, EvacuationStatus::Safe);
//! assert!((result.evacuation_time_min - 2.558).abs() < 0.01);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CalcResult;
use crate::norms::{self, basis, throughput};
use crate::settings::{EvacuationPolicy, StairSegmentRule};
use crate::validation::{Choice, FieldValue, Validator};

/// Building use, which sets the permissible evacuation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyType {
    #[default]
    Office,
    Residential,
    Educational,
    Healthcare,
    Retail,
    Hotel,
    Industrial,
    Warehouse,
}

impl OccupancyType {
    /// Permissible evacuation time in minutes
    pub fn required_time_min(&self) -> f64 {
        match self {
            OccupancyType::Retail => 3.0,
            OccupancyType::Educational => 4.0,
            OccupancyType::Office | OccupancyType::Industrial => 6.0,
            OccupancyType::Residential | OccupancyType::Hotel | OccupancyType::Warehouse => 8.0,
            OccupancyType::Healthcare => 10.0,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            OccupancyType::Office => "Office",
            OccupancyType::Residential => "Residential",
            OccupancyType::Educational => "Educational",
            OccupancyType::Healthcare => "Healthcare",
            OccupancyType::Retail => "Retail",
            OccupancyType::Hotel => "Hotel",
            OccupancyType::Industrial => "Industrial",
            OccupancyType::Warehouse => "Warehouse",
        }
    }
}

impl Choice for OccupancyType {
    const ALL: &'static [Self] = &[
        OccupancyType::Office,
        OccupancyType::Residential,
        OccupancyType::Educational,
        OccupancyType::Healthcare,
        OccupancyType::Retail,
        OccupancyType::Hotel,
        OccupancyType::Industrial,
        OccupancyType::Warehouse,
    ];

    fn code(&self) -> &'static str {
        match self {
            OccupancyType::Office => "office",
            OccupancyType::Residential => "residential",
            OccupancyType::Educational => "educational",
            OccupancyType::Healthcare => "healthcare",
            OccupancyType::Retail => "retail",
            OccupancyType::Hotel => "hotel",
            OccupancyType::Industrial => "industrial",
            OccupancyType::Warehouse => "warehouse",
        }
    }
}

/// Smoke on the escape route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmokeDensity {
    #[default]
    Clear,
    Light,
    Heavy,
}

impl SmokeDensity {
    /// Slow-down applied to the whole evacuation time
    pub fn multiplier(&self) -> f64 {
        match self {
            SmokeDensity::Clear => 1.0,
            SmokeDensity::Light => 1.3,
            SmokeDensity::Heavy => 1.8,
        }
    }
}

impl Choice for SmokeDensity {
    const ALL: &'static [Self] = &[SmokeDensity::Clear, SmokeDensity::Light, SmokeDensity::Heavy];

    fn code(&self) -> &'static str {
        match self {
            SmokeDensity::Clear => "clear",
            SmokeDensity::Light => "light",
            SmokeDensity::Heavy => "heavy",
        }
    }
}

/// Element of the escape route, in the order people pass through them.
///
/// The derived ordering is the tie-break order for the bottleneck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSegment {
    Door,
    Corridor,
    Stair,
    Exit,
}

impl PathSegment {
    pub const ALL: [PathSegment; 4] = [
        PathSegment::Door,
        PathSegment::Corridor,
        PathSegment::Stair,
        PathSegment::Exit,
    ];

    /// People per minute per metre of width
    pub fn unit_throughput(&self) -> f64 {
        match self {
            PathSegment::Door => throughput::DOOR,
            PathSegment::Corridor => throughput::CORRIDOR,
            PathSegment::Stair => throughput::STAIR,
            PathSegment::Exit => throughput::EXIT,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            PathSegment::Door => "door",
            PathSegment::Corridor => "corridor",
            PathSegment::Stair => "stair",
            PathSegment::Exit => "exit",
        }
    }

    /// Fixed advice for widening this element
    fn remedy(&self) -> &'static str {
        match self {
            PathSegment::Door => {
                "Increase the clear width of evacuation doors; doors must open in the direction of exit."
            }
            PathSegment::Corridor => {
                "Widen the corridor or remove equipment and furniture narrowing the escape route."
            }
            PathSegment::Stair => "Widen the stair flights or provide an additional evacuation stair.",
            PathSegment::Exit => "Widen the final exit or add an exit leading directly outside.",
        }
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome of comparing the estimate with the permissible time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvacuationStatus {
    /// At most 80 % of the permissible time
    Safe,
    /// Within the permissible time but above 80 %
    Warning,
    /// Longer than the permissible time
    Danger,
}

impl EvacuationStatus {
    pub fn classify(evacuation_time_min: f64, required_time_min: f64) -> Self {
        if evacuation_time_min <= norms::SAFE_TIME_FRACTION * required_time_min {
            EvacuationStatus::Safe
        } else if evacuation_time_min <= required_time_min {
            EvacuationStatus::Warning
        } else {
            EvacuationStatus::Danger
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EvacuationStatus::Safe => "SAFE",
            EvacuationStatus::Warning => "WARNING",
            EvacuationStatus::Danger => "DANGER",
        }
    }
}

/// Typed, validated evacuation parameters.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "Office block, 3rd floor",
///   "peopleCount": 150,
///   "buildingType": "office",
///   "doorWidthM": 1.2,
///   "corridorWidthM": 2.0,
///   "corridorLengthM": 30.0,
///   "stairWidthM": 1.5,
///   "stairFlights": 3,
///   "exitWidthM": 2.0,
///   "mobilityImpairedCount": 0,
///   "smokeDensity": "clear"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvacuationInput {
    /// User label (e.g. "Block B, ground floor")
    #[serde(default)]
    pub label: String,

    /// Number of people using the route
    pub people_count: u32,

    pub building_type: OccupancyType,

    pub door_width_m: f64,
    pub corridor_width_m: f64,
    pub corridor_length_m: f64,
    pub stair_width_m: f64,

    /// Stair flights to descend; 0 for a ground-floor route
    pub stair_flights: u32,

    pub exit_width_m: f64,

    /// Occupants needing assistance; may not exceed `people_count`
    #[serde(default)]
    pub mobility_impaired_count: u32,

    #[serde(default)]
    pub smoke_density: SmokeDensity,
}

impl EvacuationInput {
    /// Validate input parameters, reporting every problem at once.
    pub fn validate(&self) -> CalcResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish(())
    }

    fn check(&self, v: &mut Validator) {
        v.positive_count("peopleCount", self.people_count);
        v.positive("doorWidthM", self.door_width_m);
        v.positive("corridorWidthM", self.corridor_width_m);
        v.positive("corridorLengthM", self.corridor_length_m);
        v.positive("stairWidthM", self.stair_width_m);
        v.positive("exitWidthM", self.exit_width_m);
        if !v.is_rejected("peopleCount") {
            v.at_most(
                "mobilityImpairedCount",
                self.mobility_impaired_count,
                "peopleCount",
                self.people_count,
            );
        }
    }

    fn width_m(&self, segment: PathSegment) -> f64 {
        match segment {
            PathSegment::Door => self.door_width_m,
            PathSegment::Corridor => self.corridor_width_m,
            PathSegment::Stair => self.stair_width_m,
            PathSegment::Exit => self.exit_width_m,
        }
    }

    /// Throughput of each segment in people per minute.
    pub fn segment_throughputs(&self, policy: &EvacuationPolicy) -> BTreeMap<PathSegment, f64> {
        let mut throughputs = BTreeMap::new();
        for segment in PathSegment::ALL {
            let unit = match segment {
                PathSegment::Stair if self.stair_flights == 0 => match policy.single_storey_stair {
                    StairSegmentRule::CorridorThroughput => throughput::CORRIDOR,
                    StairSegmentRule::Excluded => continue,
                },
                _ => segment.unit_throughput(),
            };
            throughputs.insert(segment, self.width_m(segment) * unit);
        }
        throughputs
    }
}

/// Raw evacuation form as submitted by a browser or a JSON file.
///
/// Every field may be a number or a string; missing fields are reported as
/// "is required".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvacuationForm {
    pub label: Option<FieldValue>,
    pub people_count: Option<FieldValue>,
    pub building_type: Option<FieldValue>,
    pub door_width_m: Option<FieldValue>,
    pub corridor_width_m: Option<FieldValue>,
    pub corridor_length_m: Option<FieldValue>,
    pub stair_width_m: Option<FieldValue>,
    pub stair_flights: Option<FieldValue>,
    pub exit_width_m: Option<FieldValue>,
    pub mobility_impaired_count: Option<FieldValue>,
    pub smoke_density: Option<FieldValue>,
}

impl EvacuationForm {
    /// Coerce and validate the form into an [`EvacuationInput`].
    ///
    /// `mobilityImpairedCount` defaults to 0 and `smokeDensity` to clear
    /// when left empty.
    pub fn parse(&self) -> CalcResult<EvacuationInput> {
        let mut v = Validator::new();
        let input = EvacuationInput {
            label: v.text(self.label.as_ref()),
            people_count: v.whole_number("peopleCount", self.people_count.as_ref()),
            building_type: v
                .choice("buildingType", self.building_type.as_ref())
                .unwrap_or_default(),
            door_width_m: v.number("doorWidthM", self.door_width_m.as_ref()),
            corridor_width_m: v.number("corridorWidthM", self.corridor_width_m.as_ref()),
            corridor_length_m: v.number("corridorLengthM", self.corridor_length_m.as_ref()),
            stair_width_m: v.number("stairWidthM", self.stair_width_m.as_ref()),
            stair_flights: v.whole_number("stairFlights", self.stair_flights.as_ref()),
            exit_width_m: v.number("exitWidthM", self.exit_width_m.as_ref()),
            mobility_impaired_count: match &self.mobility_impaired_count {
                Some(raw) => v.whole_number("mobilityImpairedCount", Some(raw)),
                None => 0,
            },
            smoke_density: match &self.smoke_density {
                Some(raw) => v.choice("smokeDensity", Some(raw)).unwrap_or_default(),
                None => SmokeDensity::Clear,
            },
        };
        input.check(&mut v);
        v.finish(input)
    }
}

/// Results from the evacuation time estimate.
///
/// ## JSON Example
///
/// ```json
/// {
///   "evacuationTimeMin": 2.56,
///   "requiredTimeMin": 6.0,
///   "status": "safe",
///   "bottleneck": "door",
///   "perSegmentThroughput": { "door": 72.0, "corridor": 160.0, "stair": 75.0, "exit": 180.0 },
///   "queueTimeMin": 2.08,
///   "horizontalTimeMin": 0.3,
///   "stairTimeMin": 0.175,
///   "smokeMultiplier": 1.0,
///   "mobilityMultiplier": 1.0,
///   "recommendations": ["..."]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvacuationResult {
    /// Estimated evacuation time (min)
    pub evacuation_time_min: f64,

    /// Permissible evacuation time for the building type (min)
    pub required_time_min: f64,

    pub status: EvacuationStatus,

    /// Segment with the lowest throughput
    pub bottleneck: PathSegment,

    /// Throughput of each rated segment (people/min)
    pub per_segment_throughput: BTreeMap<PathSegment, f64>,

    // === Breakdown (before multipliers) ===
    /// Time to pass everyone through the bottleneck
    pub queue_time_min: f64,
    /// Walking time along the corridor
    pub horizontal_time_min: f64,
    /// Walking time down the stair flights
    pub stair_time_min: f64,

    pub smoke_multiplier: f64,
    pub mobility_multiplier: f64,

    /// Fixed advice, regulatory basis last
    pub recommendations: Vec<String>,
}

impl EvacuationResult {
    /// Remaining margin against the permissible time (negative when exceeded)
    pub fn margin_min(&self) -> f64 {
        self.required_time_min - self.evacuation_time_min
    }
}

/// Estimate evacuation time with the default policy.
///
/// # Returns
///
/// * `Ok(EvacuationResult)` - Estimate with status and recommendations
/// * `Err(CalcError::ValidationFailed)` - Every invalid field
pub fn calculate(input: &EvacuationInput) -> CalcResult<EvacuationResult> {
    calculate_with(input, &EvacuationPolicy::default())
}

/// Estimate evacuation time under an explicit policy.
pub fn calculate_with(input: &EvacuationInput, policy: &EvacuationPolicy) -> CalcResult<EvacuationResult> {
    input.validate()?;

    let per_segment_throughput = input.segment_throughputs(policy);

    // Door, corridor and exit are always rated, so the door seeds the search.
    let mut bottleneck = (PathSegment::Door, input.width_m(PathSegment::Door) * throughput::DOOR);
    for (&segment, &rate) in &per_segment_throughput {
        if rate < bottleneck.1 {
            bottleneck = (segment, rate);
        }
    }
    let (bottleneck, min_throughput) = bottleneck;

    let people = f64::from(input.people_count);
    let queue_time_min = people / min_throughput;
    let horizontal_time_min = input.corridor_length_m / norms::HORIZONTAL_SPEED_M_PER_MIN;
    let stair_time_min = if input.stair_flights > 0 {
        f64::from(input.stair_flights) * norms::FLIGHT_LENGTH_M / norms::STAIR_SPEED_M_PER_MIN
    } else {
        0.0
    };

    let smoke_multiplier = input.smoke_density.multiplier();
    let mobility_multiplier =
        1.0 + f64::from(input.mobility_impaired_count) / people * norms::MOBILITY_PENALTY;

    let evacuation_time_min =
        (queue_time_min + horizontal_time_min + stair_time_min) * smoke_multiplier * mobility_multiplier;
    let required_time_min = input.building_type.required_time_min();
    let status = EvacuationStatus::classify(evacuation_time_min, required_time_min);

    debug!(
        people = input.people_count,
        bottleneck = %bottleneck,
        evacuation_time_min,
        required_time_min,
        status = ?status,
        "evacuation time estimated"
    );

    Ok(EvacuationResult {
        evacuation_time_min,
        required_time_min,
        status,
        bottleneck,
        per_segment_throughput,
        queue_time_min,
        horizontal_time_min,
        stair_time_min,
        smoke_multiplier,
        mobility_multiplier,
        recommendations: recommendations(input, status, bottleneck),
    })
}

fn recommendations(input: &EvacuationInput, status: EvacuationStatus, bottleneck: PathSegment) -> Vec<String> {
    let mut out = Vec::new();
    match status {
        EvacuationStatus::Safe => out.push(
            "Estimated evacuation time is within the permissible limit. \
             Keep escape routes and exits free of obstructions."
                .to_string(),
        ),
        EvacuationStatus::Warning => {
            out.push(format!(
                "Estimated evacuation time is close to the permissible limit. \
                 The {} limits the flow of people.",
                bottleneck
            ));
            out.push(bottleneck.remedy().to_string());
        }
        EvacuationStatus::Danger => {
            out.push(format!(
                "Estimated evacuation time exceeds the permissible limit. \
                 The {} limits the flow of people; additional evacuation exits or a lower \
                 design occupancy are required.",
                bottleneck
            ));
            out.push(bottleneck.remedy().to_string());
        }
    }
    if input.smoke_density != SmokeDensity::Clear {
        out.push("Provide smoke exhaust ventilation and smoke-tight doors on escape routes.".to_string());
    }
    if input.mobility_impaired_count > 0 {
        out.push(
            "Plan assisted evacuation for people with limited mobility \
             (safe zones, trained helpers, evacuation chairs)."
                .to_string(),
        );
    }
    out.push(format!("Regulatory basis: {}", basis::EVACUATION));
    out
}
