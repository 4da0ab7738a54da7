//! Error types for tetromino-catalog

use hyper::StatusCode;
use thiserror::Error;

use crate::validator::Rejection;

/// Infrastructure errors (file system, serialization, configuration)
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of a create request.
///
/// The `Display` text is the reason string sent to the client.
#[derive(Error, Debug)]
pub enum CreateError {
    #[error("Ongeldig afbeeldingsformaat")]
    InvalidImage,

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Kon bestand niet opslaan")]
    ImageWrite(#[source] std::io::Error),

    #[error("Could not load data")]
    Load(#[source] CatalogError),

    #[error("Could not save data")]
    Persist(#[source] CatalogError),
}

impl CreateError {
    /// HTTP status this failure is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            CreateError::InvalidImage => StatusCode::BAD_REQUEST,
            CreateError::Rejected(Rejection::DuplicateName) => StatusCode::CONFLICT,
            CreateError::Rejected(_) => StatusCode::BAD_REQUEST,
            CreateError::ImageWrite(_) | CreateError::Load(_) | CreateError::Persist(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
