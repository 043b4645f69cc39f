//! # Project Data Structures
//!
//! The `Project` struct is the root container for a facility's fire-safety
//! assessment. Projects serialize to `.ort` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (version, engineer, facility, timestamps)
//! ├── settings: GlobalSettings (evacuation and NGPS policies)
//! └── items: HashMap<Uuid, CalculationItem> (all calculations)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use calc_core::project::Project;
//!
//! let project = Project::new("A. Seitkali", "Pavlodar tank farm", "KazTrans LLP");
//!
//! // Serialize to JSON (see file_io module for atomic saves)
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! assert!(json.contains("Pavlodar tank farm"));
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::{CalculationItem, CalculationOutcome};
use crate::errors::{CalcError, CalcResult};
use crate::settings::GlobalSettings;

/// Current schema version for .ort files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container.
///
/// This is the top-level struct that gets serialized to `.ort` files.
/// Items are stored in a flat UUID-keyed map for O(1) lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub meta: ProjectMetadata,

    /// Policies applied to every calculation in the project
    #[serde(default)]
    pub settings: GlobalSettings,

    /// All calculation items, keyed by UUID
    pub items: HashMap<Uuid, CalculationItem>,
}

impl Project {
    /// Create a new empty project.
    ///
    /// # Arguments
    ///
    /// * `engineer` - Name of the responsible fire-safety engineer
    /// * `facility` - Facility under assessment
    /// * `organization` - Operating organization (may be empty)
    ///
    /// # Example
    ///
    /// ```rust
    /// use calc_core::project::Project;
    ///
    /// let project = Project::new("John Doe", "Warehouse No. 2", "");
    /// assert_eq!(project.meta.engineer, "John Doe");
    /// ```
    pub fn new(engineer: impl Into<String>, facility: impl Into<String>, organization: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                engineer: engineer.into(),
                facility: facility.into(),
                organization: organization.into(),
                created: now,
                modified: now,
            },
            settings: GlobalSettings::default(),
            items: HashMap::new(),
        }
    }

    /// Add a calculation item to the project.
    ///
    /// Returns the UUID assigned to the item.
    ///
    /// # Example
    ///
    /// ```rust
    /// use calc_core::project::Project;
    /// use calc_core::calculations::CalculationItem;
    /// use calc_core::calculations::ngps::{IndustryType, NgpsInput};
    /// use calc_core::category::HazardCategory;
    ///
    /// let mut project = Project::new("Engineer", "Depot", "Client");
    ///
    /// let depot = NgpsInput {
    ///     label: "Fuel depot".to_string(),
    ///     industry_type: IndustryType::FuelDepot,
    ///     area_m2: 6_000,
    ///     category: HazardCategory::A,
    ///     distance_to_station_km: 12.0,
    /// };
    ///
    /// let id = project.add_item(CalculationItem::Ngps(depot));
    /// assert!(project.items.contains_key(&id));
    /// ```
    pub fn add_item(&mut self, item: CalculationItem) -> Uuid {
        let id = Uuid::new_v4();
        self.items.insert(id, item);
        self.touch();
        id
    }

    /// Remove a calculation item by UUID.
    ///
    /// Returns the removed item if it existed.
    pub fn remove_item(&mut self, id: &Uuid) -> Option<CalculationItem> {
        let item = self.items.remove(id);
        if item.is_some() {
            self.touch();
        }
        item
    }

    /// Get a calculation item by UUID.
    pub fn get_item(&self, id: &Uuid) -> Option<&CalculationItem> {
        self.items.get(id)
    }

    /// Resolve a full UUID or a unique prefix of one (as printed by
    /// `project show`) to an item id.
    pub fn resolve_id(&self, raw: &str) -> CalcResult<Uuid> {
        let wanted = raw.trim().to_lowercase();
        if let Ok(id) = Uuid::parse_str(&wanted) {
            return if self.items.contains_key(&id) {
                Ok(id)
            } else {
                Err(CalcError::ItemNotFound { id: raw.to_string() })
            };
        }
        let mut matches = self
            .items
            .keys()
            .filter(|id| !wanted.is_empty() && id.to_string().starts_with(&wanted));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(*id),
            (Some(_), Some(_)) => Err(CalcError::invalid_input("id", raw, "matches more than one item")),
            _ => Err(CalcError::ItemNotFound { id: raw.to_string() }),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Run every item under the project settings.
    ///
    /// Items are ordered by label, then id, so summaries and reports are
    /// stable between runs. An item that no longer validates (e.g. a
    /// hand-edited file) carries its error instead of a result.
    pub fn evaluate(&self) -> Vec<EvaluatedItem<'_>> {
        let mut evaluated: Vec<_> = self
            .items
            .iter()
            .map(|(id, item)| EvaluatedItem {
                id: *id,
                item,
                outcome: item.calculate(&self.settings),
            })
            .collect();
        evaluated.sort_by(|a, b| {
            a.item
                .label()
                .cmp(b.item.label())
                .then_with(|| a.id.cmp(&b.id))
        });
        evaluated
    }
}

impl Default for Project {
    fn default() -> Self {
        Project::new("", "", "")
    }
}

/// One project item with its calculated outcome.
#[derive(Debug)]
pub struct EvaluatedItem<'a> {
    pub id: Uuid,
    pub item: &'a CalculationItem,
    pub outcome: CalcResult<CalculationOutcome>,
}

impl EvaluatedItem<'_> {
    /// First 8 hex digits of the id, enough to address the item from the CLI
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the responsible fire-safety engineer
    pub engineer: String,

    /// Facility under assessment
    pub facility: String,

    /// Operating organization
    #[serde(default)]
    pub organization: String,

    /// When the project was created
    pub created: DateTime<Utc>,

    /// When the project was last modified
    pub modified: DateTime<Utc>,
}
