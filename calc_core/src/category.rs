//! Explosion and fire hazard categories of premises and buildings.
//!
//! Category A is the most hazardous (flammable gases and liquids with a flash
//! point up to 28 °C), D the least (non-combustible materials in a cold state).
//! The Latin letters follow the transliteration used in Kazakh norms:
//! А, Б, В, Г, Д become A, B, V, G, D.

use serde::{Deserialize, Serialize};

use crate::validation::Choice;

/// Hazard category A through D (descending hazard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum HazardCategory {
    A,
    B,
    V,
    G,
    #[default]
    D,
}

impl HazardCategory {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            HazardCategory::A => "A (explosion and fire hazard, increased)",
            HazardCategory::B => "B (explosion and fire hazard)",
            HazardCategory::V => "V (fire hazard)",
            HazardCategory::G => "G (moderate fire hazard)",
            HazardCategory::D => "D (reduced fire hazard)",
        }
    }

    /// Categories A, B and V handle flammable materials in quantities that
    /// call for on-site fire protection when the public service is far away.
    pub fn is_hazardous(&self) -> bool {
        matches!(self, HazardCategory::A | HazardCategory::B | HazardCategory::V)
    }
}

impl Choice for HazardCategory {
    const ALL: &'static [Self] = &[
        HazardCategory::A,
        HazardCategory::B,
        HazardCategory::V,
        HazardCategory::G,
        HazardCategory::D,
    ];

    fn code(&self) -> &'static str {
        match self {
            HazardCategory::A => "A",
            HazardCategory::B => "B",
            HazardCategory::V => "V",
            HazardCategory::G => "G",
            HazardCategory::D => "D",
        }
    }

    fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "A" | "А" => Some(HazardCategory::A),
            "B" | "Б" => Some(HazardCategory::B),
            "V" | "В" => Some(HazardCategory::V),
            "G" | "Г" => Some(HazardCategory::G),
            "D" | "Д" => Some(HazardCategory::D),
            _ => None,
        }
    }
}

impl std::fmt::Display for HazardCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
