//! Request body shapes for creating a shape
//!
//! Clients send JSON, URL-encoded forms or multipart forms with an optional
//! `image_file` upload. Each is parsed into a [`ShapePayload`] and then
//! flattened into one [`CandidateRecord`] before validation.

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::validator::CandidateRecord;

/// Multipart field carrying an uploaded image
pub const IMAGE_FILE_FIELD: &str = "image_file";

/// An uploaded file as received
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Malformed form data")]
    Multipart(#[from] multer::Error),
}

/// A create request body
#[derive(Debug, Clone)]
pub enum ShapePayload {
    Json(Value),
    Form(HashMap<String, String>),
    Multipart {
        fields: HashMap<String, String>,
        image_file: Option<UploadedFile>,
    },
}

impl ShapePayload {
    /// Parse a body according to its `Content-Type`.
    ///
    /// Unparseable JSON and URL-encoded bodies produce an empty payload,
    /// which then fails validation as missing fields.
    pub async fn parse(content_type: Option<&str>, body: Bytes) -> Result<Self, PayloadError> {
        let raw_content_type = content_type.unwrap_or("");
        let content_type = raw_content_type.to_ascii_lowercase();

        if content_type.contains("application/json") {
            let value = serde_json::from_slice(&body).unwrap_or_else(|e| {
                debug!(error = %e, "Ignoring unparseable JSON body");
                Value::Null
            });
            return Ok(ShapePayload::Json(value));
        }

        if content_type.starts_with("multipart/form-data") {
            // the boundary is case-sensitive, so hand over the header as sent
            return parse_multipart(raw_content_type, body).await;
        }

        let fields = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body)
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();
        Ok(ShapePayload::Form(fields))
    }

    /// Flatten into a candidate plus the optional upload
    pub fn into_candidate(self) -> (CandidateRecord, Option<UploadedFile>) {
        match self {
            ShapePayload::Json(value) => (candidate_from_json(&value), None),
            ShapePayload::Form(fields) => (candidate_from_fields(fields), None),
            ShapePayload::Multipart { fields, image_file } => {
                (candidate_from_fields(fields), image_file)
            }
        }
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<ShapePayload, PayloadError> {
    let boundary = multer::parse_boundary(content_type)?;
    let stream = futures_util::stream::once(async move { Ok::<_, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = HashMap::new();
    let mut image_file = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FILE_FIELD {
            let file_name = field.file_name().unwrap_or("").to_string();
            let data = field.bytes().await?;
            // An empty part without a file name means no file was chosen
            if !(file_name.is_empty() && data.is_empty()) {
                image_file = Some(UploadedFile { file_name, data });
            }
        } else {
            let text = field.text().await?;
            fields.insert(name, text);
        }
    }

    Ok(ShapePayload::Multipart { fields, image_file })
}

/// Text of a JSON scalar; anything else counts as blank
fn json_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Decode a matrix sent as a JSON string; non-array results keep the raw string
fn decode_matrix(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(decoded @ Value::Array(_)) => Some(decoded),
            _ => Some(Value::String(raw)),
        },
        other => Some(other),
    }
}

fn candidate_from_json(value: &Value) -> CandidateRecord {
    let Some(obj) = value.as_object() else {
        return CandidateRecord::default();
    };

    CandidateRecord {
        name: json_text(obj.get("name")),
        color: json_text(obj.get("color")),
        description: json_text(obj.get("description")),
        image: json_text(obj.get("image")),
        matrix: obj.get("matrix").cloned().and_then(decode_matrix),
    }
}

fn candidate_from_fields(mut fields: HashMap<String, String>) -> CandidateRecord {
    let matrix = fields.remove("matrix").map(Value::String).and_then(decode_matrix);
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();

    CandidateRecord {
        name: take("name"),
        color: take("color"),
        description: take("description"),
        image: take("image"),
        matrix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOUNDARY: &str = "----shapeboundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Bytes {
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, f
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Bytes::from(body)
    }

    #[tokio::test]
    async fn test_json_body() {
        let body = json!({
            "name": "x",
            "color": "#123456",
            "description": "test",
            "image": "images/x.svg",
            "matrix": [[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]]
        });
        let payload = ShapePayload::parse(
            Some("application/json; charset=utf-8"),
            Bytes::from(body.to_string()),
        )
        .await
        .unwrap();

        let (candidate, file) = payload.into_candidate();
        assert!(file.is_none());
        assert_eq!(candidate.name, "x");
        assert_eq!(candidate.matrix, Some(body["matrix"].clone()));
    }

    #[tokio::test]
    async fn test_invalid_json_is_empty_candidate() {
        let payload = ShapePayload::parse(Some("application/json"), Bytes::from_static(b"{oops"))
            .await
            .unwrap();
        assert_eq!(payload.into_candidate().0, CandidateRecord::default());
    }

    #[tokio::test]
    async fn test_json_scalars_and_string_matrix() {
        let body = json!({
            "name": 7,
            "color": true,
            "matrix": "[[1,1,1,1],[0,0,0,0],[0,0,0,0],[0,0,0,0]]"
        });
        let payload = ShapePayload::parse(Some("application/json"), Bytes::from(body.to_string()))
            .await
            .unwrap();

        let (candidate, _) = payload.into_candidate();
        assert_eq!(candidate.name, "7");
        assert_eq!(candidate.color, "");
        assert_eq!(
            candidate.matrix,
            Some(json!([[1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]))
        );
    }

    #[tokio::test]
    async fn test_urlencoded_form() {
        let body = serde_urlencoded::to_string([
            ("name", "q"),
            ("color", "#000000"),
            ("description", "form"),
            ("image", "images/q.png"),
            ("matrix", "[[1,0,0,0],[1,0,0,0],[1,0,0,0],[1,0,0,0]]"),
        ])
        .unwrap();
        let payload = ShapePayload::parse(
            Some("application/x-www-form-urlencoded"),
            Bytes::from(body),
        )
        .await
        .unwrap();

        let (candidate, _) = payload.into_candidate();
        assert_eq!(candidate.name, "q");
        assert_eq!(candidate.image, "images/q.png");
        assert_eq!(
            candidate.matrix,
            Some(json!([[1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]]))
        );
    }

    #[test]
    fn test_undecodable_matrix_string_is_kept() {
        assert_eq!(
            decode_matrix(Value::String("garbage".into())),
            Some(Value::String("garbage".into()))
        );
        assert_eq!(
            decode_matrix(Value::String("{\"a\":1}".into())),
            Some(Value::String("{\"a\":1}".into()))
        );
        assert_eq!(decode_matrix(Value::Null), None);
    }

    #[tokio::test]
    async fn test_multipart_with_file() {
        let body = multipart_body(&[
            ("name", None, b"m".as_slice()),
            ("color", None, b"#ffffff".as_slice()),
            ("matrix", None, b"[[0,0,0,0],[0,0,0,0],[0,0,0,0],[1,1,1,1]]".as_slice()),
            ("image_file", Some("shape.png"), b"\x89PNG\r\n\x1a\nrest".as_slice()),
        ]);
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        let payload = ShapePayload::parse(Some(&content_type), body).await.unwrap();

        let (candidate, file) = payload.into_candidate();
        assert_eq!(candidate.name, "m");
        assert_eq!(candidate.color, "#ffffff");
        assert!(candidate.matrix.is_some());

        let file = file.unwrap();
        assert_eq!(file.file_name, "shape.png");
        assert!(file.data.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_multipart_empty_file_part_is_absent() {
        let body = multipart_body(&[
            ("name", None, b"m".as_slice()),
            ("image_file", Some(""), b"".as_slice()),
        ]);
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        let payload = ShapePayload::parse(Some(&content_type), body).await.unwrap();

        assert!(payload.into_candidate().1.is_none());
    }

    #[tokio::test]
    async fn test_multipart_without_boundary_fails() {
        let result = ShapePayload::parse(Some("multipart/form-data"), Bytes::new()).await;
        assert!(matches!(result, Err(PayloadError::Multipart(_))));
    }
}
