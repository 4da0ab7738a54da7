//! Tetromino Catalog - shape catalog service backed by a JSON file
//!
//! Lists tetromino shapes, fetches one by name and appends new ones. The
//! browser client renders the catalog and submits shapes through this API.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/tetromino-catalog/
//! ├── data/
//! │   └── blocks.json        # The whole collection, one JSON array
//! ├── images/                # Uploaded shape images
//! │   └── my_shape_1700000000_1a2b3c4d.png
//! └── config.toml            # Configuration
//! ```
//!
//! ## Shape Records
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `name` | Unique, case-insensitive, stored upper-case |
//! | `color` | Hex color code |
//! | `description` | Free text |
//! | `image` | `images/...` path or absolute URL |
//! | `matrix` | 4x4 grid of 0/1, row-major |
//!
//! A missing `blocks.json` is seeded with the seven classic tetrominoes.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod images;
pub mod payload;
pub mod shape;
pub mod store;
pub mod validator;

// Re-exports
pub use api::CatalogApi;
pub use config::Config;
pub use error::{CatalogError, CreateError};
pub use http::HttpServer;
pub use images::{ImageFormat, ImageStore};
pub use payload::{ShapePayload, UploadedFile};
pub use shape::{default_shapes, Matrix, ShapeRecord};
pub use store::ShapeStore;
pub use validator::{validate, CandidateRecord, Rejection};
