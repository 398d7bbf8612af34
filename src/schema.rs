// 📐 Shape Layer - Request Validation
// Validates an appearance creation body before anything touches the store.
//
// The rating check duplicates the one inside `Rating::new`; this layer exists
// to reject bad input with a readable message and no database round-trip.

use crate::entities::Rating;
use serde_json::{Map, Value};
use std::fmt;

/// Fields an appearance creation body must carry, in reporting order
pub const REQUIRED_APPEARANCE_FIELDS: [&str; 3] = ["rating", "episode_id", "guest_id"];

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, Vec<ValidationError>>;

// ============================================================================
// APPEARANCE REQUEST
// ============================================================================

/// A creation request that passed boundary validation.
///
/// Only the rating is checked here. An id that is not a JSON integer can
/// never match a row, so it is carried as `None` and reported as not found
/// by the caller, the same as any other id that fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAppearance {
    pub rating: Rating,
    pub episode_id: Option<i64>,
    pub guest_id: Option<i64>,
}

/// Names of required fields absent from `body`, in declaration order
pub fn missing_fields(body: &Map<String, Value>) -> Vec<&'static str> {
    REQUIRED_APPEARANCE_FIELDS
        .iter()
        .copied()
        .filter(|field| !body.contains_key(*field))
        .collect()
}

/// Validate a POST /appearances body.
///
/// `None`, a non-object, or an empty object count as "no data". Missing
/// fields are reported together; then the rating must be an integer in range.
pub fn validate_new_appearance(body: Option<&Value>) -> ValidationResult<NewAppearance> {
    let body = match body {
        Some(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(vec![ValidationError::new("body", "No data provided")]),
    };

    let missing = missing_fields(body);
    if !missing.is_empty() {
        let names = missing.join(", ");
        return Err(vec![ValidationError::new(
            names.clone(),
            format!("Missing fields: {}", names),
        )]);
    }

    let rating = body["rating"]
        .as_i64()
        .and_then(|value| Rating::new(value).ok())
        .ok_or_else(|| {
            vec![ValidationError::new(
                "rating",
                format!(
                    "Rating must be an integer between {} and {}",
                    Rating::MIN,
                    Rating::MAX
                ),
            )]
        })?;

    Ok(NewAppearance {
        rating,
        episode_id: body["episode_id"].as_i64(),
        guest_id: body["guest_id"].as_i64(),
    })
}
