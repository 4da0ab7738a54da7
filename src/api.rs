//! Catalog operations: list, get by name, create
//!
//! Create runs as one transaction under the store's write lock:
//! sniff upload -> validate -> write image -> append -> save. On any
//! failure the collection file is untouched and a written image is removed.

use std::sync::Arc;
use tracing::{error, info};

use crate::error::{CatalogError, CreateError};
use crate::images::{generate_file_name, ImageFormat, ImageStore};
use crate::payload::ShapePayload;
use crate::shape::ShapeRecord;
use crate::store::ShapeStore;
use crate::validator::{normalize_name, validate};

pub struct CatalogApi {
    store: Arc<ShapeStore>,
    images: Arc<ImageStore>,
}

impl CatalogApi {
    pub fn new(store: Arc<ShapeStore>, images: Arc<ImageStore>) -> Self {
        Self { store, images }
    }

    /// All shapes in insertion order
    pub async fn list(&self) -> Result<Vec<ShapeRecord>, CatalogError> {
        self.store.load().await
    }

    /// Case-insensitive lookup by name
    pub async fn get(&self, name: &str) -> Result<Option<ShapeRecord>, CatalogError> {
        let needle = normalize_name(name);
        let shapes = self.store.load().await?;
        Ok(shapes.into_iter().find(|shape| shape.has_name(&needle)))
    }

    /// Validate and append a new shape, returning the stored record
    pub async fn create(&self, payload: ShapePayload) -> Result<ShapeRecord, CreateError> {
        let (mut candidate, upload) = payload.into_candidate();

        let upload = match upload {
            Some(file) => {
                let format = ImageFormat::sniff(&file.data).ok_or(CreateError::InvalidImage)?;
                let stored_name = generate_file_name(&file.file_name);
                candidate.image = ImageStore::relative_path(&stored_name);
                info!(
                    original = %file.file_name,
                    mime = format.mime_type(),
                    stored = %stored_name,
                    "Accepted image upload"
                );
                Some((stored_name, file.data))
            }
            None => None,
        };

        let guard = self.store.begin_write().await;

        let mut shapes = self.store.load_locked(&guard).await.map_err(|e| {
            error!(error = %e, "Could not load catalog");
            CreateError::Load(e)
        })?;

        let record = validate(&candidate, &shapes)?;

        if let Some((stored_name, data)) = &upload {
            self.images.write(stored_name, data).await.map_err(|e| {
                error!(error = %e, file = %stored_name, "Could not store uploaded image");
                CreateError::ImageWrite(e)
            })?;
        }

        shapes.push(record.clone());

        if let Err(e) = self.store.save(&guard, &shapes).await {
            error!(error = %e, name = %record.name, "Could not save catalog");
            if let Some((stored_name, _)) = &upload {
                self.images.remove(stored_name).await;
            }
            return Err(CreateError::Persist(e));
        }

        info!(name = %record.name, total = shapes.len(), "Created shape");
        Ok(record)
    }
}
