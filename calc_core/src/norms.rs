//! # Regulatory Norms
//!
//! Fixed reference values used by the calculators. These are static data
//! taken from the fire-safety norms of the Republic of Kazakhstan, not
//! per-request configuration; policy values that may be revised live in
//! [`crate::settings`] instead.

/// Citations printed with calculation results.
pub mod basis {
    /// Evacuation time estimate
    pub const EVACUATION: &str = "SN RK 2.02-01-2019 \"Fire safety of buildings and structures\", \
        evacuation routes and exits; Technical Regulation \"General Requirements for Fire Safety\"";

    /// Fire-risk assessment
    pub const FIRE_RISK: &str = "Technical Regulation \"General Requirements for Fire Safety\" \
        (fire-risk assessment methodology); SN RK 2.02-01-2019; SP RK 2.02-104-2014 \
        (automatic fire alarm and suppression systems)";

    /// NGPS mandatory for the industry
    pub const NGPS_REQUIRED: &str = "Law of the Republic of Kazakhstan \"On Civil Protection\": \
        organisations of the listed industries must establish a non-state fire-fighting \
        service (NGPS) unit";

    /// Fire post recommended
    pub const NGPS_POST: &str = "Technical Regulation \"General Requirements for Fire Safety\": \
        hazard category A, B or V facilities beyond the 3 km service radius of the nearest \
        state fire station are advised to keep a fire post";

    /// No dedicated unit needed
    pub const NGPS_NONE: &str = "Law of the Republic of Kazakhstan \"On Civil Protection\": \
        fire protection is provided by the state fire service; a dedicated NGPS unit is \
        not required";
}

/// Unit throughput of path elements, people per minute per metre of width.
pub mod throughput {
    pub const DOOR: f64 = 60.0;
    pub const CORRIDOR: f64 = 80.0;
    /// Descending stair
    pub const STAIR: f64 = 50.0;
    pub const EXIT: f64 = 90.0;
}

/// Horizontal walking speed on escape routes (m/min)
pub const HORIZONTAL_SPEED_M_PER_MIN: f64 = 100.0;

/// Walking speed down a stair (m/min)
pub const STAIR_SPEED_M_PER_MIN: f64 = 60.0;

/// Path length along one stair flight (m)
pub const FLIGHT_LENGTH_M: f64 = 3.5;

/// Share of the permissible time under which evacuation is considered safe
pub const SAFE_TIME_FRACTION: f64 = 0.8;

/// Extra delay per occupant share with limited mobility
pub const MOBILITY_PENALTY: f64 = 0.5;

/// Service radius of a state fire station (km)
pub const FIRE_STATION_RADIUS_KM: f64 = 3.0;

/// Reference staff training / maintenance level on the 1..5 scale
pub const QUALITY_BASELINE: u32 = 3;

/// Lowest and highest grades on the quality scale
pub const QUALITY_MIN: u32 = 1;
pub const QUALITY_MAX: u32 = 5;

/// Watch pattern lengths reported by the NGPS determiner
pub const THREE_SHIFTS: u32 = 3;
pub const FOUR_SHIFTS: u32 = 4;

/// Unit commander and driver-on-duty outside the shift roster
pub const UNIT_MANAGEMENT_STAFF: u32 = 2;
