//! # calc_core - Fire-Safety Calculation Engine
//!
//! `calc_core` is the computational heart of Ortcalc: evacuation time,
//! fire-risk scoring and NGPS (non-state fire-fighting service) determination
//! for facilities assessed under the fire-safety norms of the Republic of
//! Kazakhstan. All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Every error at once**: Validation reports all bad fields, not the first
//! - **Auditable**: Each formula is registered with its normative source
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::calculations::{calculate_json, CalculatorKind};
//!
//! let body = r#"{
//!     "peopleCount": 150, "buildingType": "office", "doorWidthM": "1,2",
//!     "corridorWidthM": 2.0, "corridorLengthM": 30, "stairWidthM": 1.5,
//!     "stairFlights": 3, "exitWidthM": 2.0
//! }"#;
//!
//! let result = calculate_json(CalculatorKind::Evacuation, body).unwrap();
//! assert_eq!(result["status"], "safe");
//! assert_eq!(result["bottleneck"], "door");
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - The three calculators and name-based dispatch
//! - [`validation`] - Form coercion and field-level validation
//! - [`category`] - Explosion and fire hazard categories A to D
//! - [`norms`] - Regulatory constants and citations
//! - [`settings`] - Policy values that travel with a project
//! - [`project`] - Project container and metadata
//! - [`file_io`] - File operations with atomic saves and locking
//! - [`report`] - PDF reports via Typst
//! - [`formulas`] - Formula registry and `FORMULAS.md` generation
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod category;
pub mod errors;
pub mod file_io;
pub mod formulas;
pub mod norms;
pub mod project;
pub mod report;
pub mod settings;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use calculations::{calculate_json, CalculationItem, CalculationOutcome, CalculatorKind};
pub use category::HazardCategory;
pub use errors::{CalcError, CalcResult, FieldError};
pub use file_io::{load_project, save_project, FileLock};
pub use project::{Project, ProjectMetadata};
pub use settings::GlobalSettings;
