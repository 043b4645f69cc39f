//! # Input Validation & Normalization
//!
//! Forms arrive as loosely typed JSON: a width may be `1.2`, `"1.2"` or
//! `"1,2"` depending on the browser locale. [`Validator`] coerces those raw
//! [`FieldValue`]s into typed values and checks their bounds, collecting one
//! [`FieldError`] per bad field instead of stopping at the first.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::validation::{FieldValue, Validator};
//!
//! let mut v = Validator::new();
//! let width = v.number("doorWidthM", Some(&FieldValue::Text("1,2".into())));
//! let people = v.whole_number("peopleCount", Some(&FieldValue::Text("12.5".into())));
//! v.positive("doorWidthM", width);
//!
//! assert_eq!(width, 1.2);
//! assert_eq!(people, 0);
//! let err = v.finish(()).unwrap_err();
//! assert_eq!(err.field_errors().len(), 1);
//! assert_eq!(err.field_errors()[0].field, "peopleCount");
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult, FieldError};

/// A raw form value before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Flag(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// A closed set of codes accepted for an enum-valued field.
pub trait Choice: Sized + Copy + 'static {
    /// Every variant, in display order
    const ALL: &'static [Self];

    /// Canonical code used in JSON (e.g. "office", "fire-risk")
    fn code(&self) -> &'static str;

    /// Parse a code, ignoring case and `_`/`-`/space differences
    fn from_code(raw: &str) -> Option<Self> {
        let wanted = normalize_code(raw);
        Self::ALL
            .iter()
            .copied()
            .find(|c| normalize_code(c.code()) == wanted)
    }

    /// Comma-separated list of accepted codes for error messages
    fn allowed_codes() -> String {
        Self::ALL
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_lowercase().replace(['_', ' '], "-")
}

/// Strip grouping spaces (including NBSP) and accept a decimal comma.
fn normalize_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

/// Collects field errors while coercing and bounds-checking a form.
///
/// Only the first problem per field is kept, so a value that fails to parse
/// is not reported again by the range check that follows.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    /// Record a problem for `field` unless one is already recorded.
    pub fn reject(&mut self, field: &str, value: impl Into<String>, reason: impl Into<String>) {
        if self.is_rejected(field) {
            return;
        }
        self.errors.push(FieldError::new(field, value, reason));
    }

    pub fn is_rejected(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Return `value` if nothing was rejected, otherwise every collected error.
    pub fn finish<T>(self, value: T) -> CalcResult<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(CalcError::validation(self.errors))
        }
    }

    fn present<'a>(&mut self, field: &str, raw: Option<&'a FieldValue>) -> Option<&'a FieldValue> {
        match raw {
            Some(value) if !value.is_blank() => Some(value),
            _ => {
                self.reject(field, "", "is required");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Coercion
    // ------------------------------------------------------------------

    /// Coerce a decimal number. Returns 0.0 when rejected.
    pub fn number(&mut self, field: &str, raw: Option<&FieldValue>) -> f64 {
        let Some(value) = self.present(field, raw) else {
            return 0.0;
        };
        let parsed = match value {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => normalize_number(s).parse::<f64>().ok(),
            FieldValue::Flag(_) => None,
        };
        match parsed {
            Some(n) if n.is_finite() => n,
            Some(_) => {
                self.reject(field, value.to_string(), "must be a finite number");
                0.0
            }
            None => {
                self.reject(field, value.to_string(), "must be a number");
                0.0
            }
        }
    }

    /// Coerce a non-negative base-10 integer. Returns 0 when rejected.
    pub fn whole_number(&mut self, field: &str, raw: Option<&FieldValue>) -> u32 {
        let Some(value) = self.present(field, raw) else {
            return 0;
        };
        let parsed: Result<i64, &'static str> = match value {
            FieldValue::Number(n) if !n.is_finite() || n.fract() != 0.0 => Err("must be a whole number"),
            FieldValue::Number(n) if n.abs() > i64::MAX as f64 => Err("is too large"),
            FieldValue::Number(n) => Ok(*n as i64),
            FieldValue::Text(s) => {
                let cleaned = normalize_number(s);
                match cleaned.parse::<i64>() {
                    Ok(n) => Ok(n),
                    Err(_) if cleaned.parse::<f64>().is_ok() => Err("must be a whole number"),
                    Err(_) => Err("must be a number"),
                }
            }
            FieldValue::Flag(_) => Err("must be a number"),
        };
        match parsed {
            Ok(n) if n < 0 => {
                self.reject(field, value.to_string(), "must be >= 0");
                0
            }
            Ok(n) => match u32::try_from(n) {
                Ok(n) => n,
                Err(_) => {
                    self.reject(field, value.to_string(), "is too large");
                    0
                }
            },
            Err(reason) => {
                self.reject(field, value.to_string(), reason);
                0
            }
        }
    }

    /// Coerce a checkbox. A missing value means unchecked.
    pub fn flag(&mut self, field: &str, raw: Option<&FieldValue>) -> bool {
        match raw {
            None => false,
            Some(FieldValue::Flag(b)) => *b,
            Some(FieldValue::Number(n)) if *n == 0.0 => false,
            Some(FieldValue::Number(n)) if *n == 1.0 => true,
            Some(FieldValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "" | "false" | "no" | "off" | "0" | "нет" => false,
                "true" | "yes" | "on" | "1" | "да" => true,
                _ => {
                    self.reject(field, s.clone(), "must be true or false");
                    false
                }
            },
            Some(other) => {
                self.reject(field, other.to_string(), "must be true or false");
                false
            }
        }
    }

    /// Coerce one of a closed set of codes.
    pub fn choice<T: Choice>(&mut self, field: &str, raw: Option<&FieldValue>) -> Option<T> {
        let value = self.present(field, raw)?;
        let parsed = match value {
            FieldValue::Text(s) => T::from_code(s),
            _ => None,
        };
        if parsed.is_none() {
            self.reject(
                field,
                value.to_string(),
                format!("must be one of: {}", T::allowed_codes()),
            );
        }
        parsed
    }

    /// Free text (labels). Never rejected.
    pub fn text(&mut self, raw: Option<&FieldValue>) -> String {
        raw.map(|v| v.to_string().trim().to_string()).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------

    pub fn positive(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.reject(field, value.to_string(), "must be > 0");
        }
    }

    pub fn non_negative(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.reject(field, value.to_string(), "must be >= 0");
        }
    }

    pub fn positive_count(&mut self, field: &str, value: u32) {
        if value == 0 {
            self.reject(field, value.to_string(), "must be > 0");
        }
    }

    pub fn in_range(&mut self, field: &str, value: u32, min: u32, max: u32) {
        if value < min || value > max {
            self.reject(
                field,
                value.to_string(),
                format!("must be between {} and {}", min, max),
            );
        }
    }

    /// Cross-field check: `value` may not exceed the value of `limit_field`.
    pub fn at_most(&mut self, field: &str, value: u32, limit_field: &str, limit: u32) {
        if value > limit {
            self.reject(
                field,
                value.to_string(),
                format!("must not exceed {} ({})", limit_field, limit),
            );
        }
    }
}
