//! Required-field checks and numeric conversion of a [`FeatureRecord`].
//!
//! [`validate`] only checks presence. Value format is checked later by
//! [`feature_vector`], during the predicting phase.

use crate::record::FeatureRecord;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const SEPAL_LENGTH: &str = "Sepal length";
pub const SEPAL_WIDTH: &str = "Sepal width";
pub const PETAL_LENGTH: &str = "Petal length";
pub const PETAL_WIDTH: &str = "Petal width";

/// Required fields, in the order the predictor expects them.
pub const REQUIRED_FIELDS: [&str; 4] = [SEPAL_LENGTH, SEPAL_WIDTH, PETAL_LENGTH, PETAL_WIDTH];

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// True iff every required field name is present in `record`.
pub fn validate(record: &FeatureRecord) -> bool {
    REQUIRED_FIELDS.iter().all(|field| record.contains(field))
}

/// Required fields absent from `record`, in the fixed field order.
pub fn missing_fields(record: &FeatureRecord) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !record.contains(field))
        .collect()
}

// ---------------------------------------------------------------------------
// Numeric conversion
// ---------------------------------------------------------------------------

/// A required field whose value is not a finite number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Field '{field}' has non-numeric value '{value}'")]
pub struct MalformedValue {
    pub field: &'static str,
    pub value: String,
}

/// Convert the required fields to numbers in the fixed field order.
///
/// Values are trimmed before parsing. `NaN` and infinities are rejected.
/// A missing field is reported as malformed with an empty value.
pub fn feature_vector(record: &FeatureRecord) -> Result<[f64; 4], MalformedValue> {
    let mut out = [0.0; 4];
    for (slot, field) in out.iter_mut().zip(REQUIRED_FIELDS) {
        let raw = record.get(field).unwrap_or_default();
        *slot = match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                return Err(MalformedValue {
                    field,
                    value: raw.to_string(),
                })
            }
        };
    }
    Ok(out)
}
