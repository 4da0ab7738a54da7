//! Validation of candidate records
//!
//! Rules are applied in order: required fields, matrix shape, then name
//! uniqueness. Validation never touches the file system.

use serde_json::Value;
use thiserror::Error;

use crate::shape::{Matrix, ShapeRecord};

/// Unvalidated input for a new shape, as submitted by a client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateRecord {
    pub name: String,
    pub color: String,
    pub description: String,
    pub image: String,
    /// Raw matrix value; `None` when the client sent none
    pub matrix: Option<Value>,
}

/// Why a candidate was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Missing required fields (name, color, description, image, matrix)")]
    MissingFields,

    #[error("Matrix must be a 4x4 array")]
    MalformedMatrix,

    #[error("Block with this name already exists")]
    DuplicateName,
}

/// A string field is blank when nothing remains after trimming
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// A matrix is absent when missing or JSON `null`
pub fn is_absent(matrix: Option<&Value>) -> bool {
    matches!(matrix, None | Some(Value::Null))
}

/// Normalized form of a shape name (trimmed, upper-cased)
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Check a candidate against the collection and produce the record to store
pub fn validate(
    candidate: &CandidateRecord,
    existing: &[ShapeRecord],
) -> Result<ShapeRecord, Rejection> {
    let required = [
        &candidate.name,
        &candidate.color,
        &candidate.description,
        &candidate.image,
    ];
    if required.iter().any(|field| is_blank(field)) || is_absent(candidate.matrix.as_ref()) {
        return Err(Rejection::MissingFields);
    }

    let matrix = candidate
        .matrix
        .as_ref()
        .and_then(Matrix::from_value)
        .ok_or(Rejection::MalformedMatrix)?;

    let name = normalize_name(&candidate.name);
    if existing.iter().any(|shape| shape.has_name(&name)) {
        return Err(Rejection::DuplicateName);
    }

    Ok(ShapeRecord {
        name,
        color: candidate.color.trim().to_string(),
        description: candidate.description.trim().to_string(),
        image: candidate.image.trim().to_string(),
        matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::default_shapes;
    use serde_json::json;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            name: " x ".to_string(),
            color: " #123456".to_string(),
            description: "test ".to_string(),
            image: "images/x.svg".to_string(),
            matrix: Some(json!([[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]])),
        }
    }

    #[test]
    fn test_blank_predicates() {
        assert!(is_blank(""));
        assert!(is_blank("  \t\n"));
        assert!(!is_blank(" a "));
        assert!(is_absent(None));
        assert!(is_absent(Some(&Value::Null)));
        assert!(!is_absent(Some(&json!([]))));
    }

    #[test]
    fn test_accepts_and_normalizes() {
        let record = validate(&candidate(), &default_shapes()).unwrap();
        assert_eq!(record.name, "X");
        assert_eq!(record.color, "#123456");
        assert_eq!(record.description, "test");
        assert_eq!(record.image, "images/x.svg");
        assert_eq!(record.matrix.occupied(), 4);
    }

    #[test]
    fn test_missing_fields() {
        for field in 0..5 {
            let mut c = candidate();
            match field {
                0 => c.name = "   ".to_string(),
                1 => c.color = String::new(),
                2 => c.description = "\t".to_string(),
                3 => c.image = String::new(),
                _ => c.matrix = None,
            }
            assert_eq!(validate(&c, &[]), Err(Rejection::MissingFields));
        }
    }

    #[test]
    fn test_missing_fields_checked_before_matrix() {
        let mut c = candidate();
        c.name = String::new();
        c.matrix = Some(json!([[0]]));
        assert_eq!(validate(&c, &[]), Err(Rejection::MissingFields));
    }

    #[test]
    fn test_malformed_matrix() {
        let mut c = candidate();
        c.matrix = Some(json!([[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]));
        assert_eq!(validate(&c, &[]), Err(Rejection::MalformedMatrix));

        c.matrix = Some(json!([[0, 0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]));
        assert_eq!(validate(&c, &[]), Err(Rejection::MalformedMatrix));

        c.matrix = Some(json!("not a matrix"));
        assert_eq!(validate(&c, &[]), Err(Rejection::MalformedMatrix));

        c.matrix = Some(json!([]));
        assert_eq!(validate(&c, &[]), Err(Rejection::MalformedMatrix));
    }

    #[test]
    fn test_all_zero_matrix_is_allowed() {
        let mut c = candidate();
        c.matrix = Some(json!([[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]));
        assert!(validate(&c, &[]).is_ok());
    }

    #[test]
    fn test_duplicate_name_is_case_insensitive() {
        let mut c = candidate();
        c.name = "l".to_string();
        assert_eq!(validate(&c, &default_shapes()), Err(Rejection::DuplicateName));

        c.name = " i ".to_string();
        assert_eq!(validate(&c, &default_shapes()), Err(Rejection::DuplicateName));
    }
}
