//! File-backed shape collection
//!
//! The whole collection lives in one JSON array. Reads go straight to the
//! file; every write (seeding included) happens under the guard returned by
//! [`ShapeStore::begin_write`], so a load-modify-save cycle in this process
//! cannot lose another's update. Other processes writing the same file are
//! not coordinated.

use crate::error::CatalogError;
use crate::shape::{default_shapes, ShapeRecord};
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Held while writing the backing file
pub type WriteGuard<'a> = MutexGuard<'a, ()>;

/// Owner of the backing JSON file
pub struct ShapeStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ShapeStore {
    /// Create a store for the given file. Nothing is read until [`load`](Self::load).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize writers. Hold the guard across load, validate and save.
    pub async fn begin_write(&self) -> WriteGuard<'_> {
        self.write_lock.lock().await
    }

    /// Load the collection, seeding the file with defaults if it is missing.
    ///
    /// A file that does not parse yields the defaults without being rewritten.
    /// Only seeding takes the write lock.
    pub async fn load(&self) -> Result<Vec<ShapeRecord>, CatalogError> {
        if let Some(shapes) = self.read_existing().await? {
            return Ok(shapes);
        }

        let guard = self.begin_write().await;
        self.load_locked(&guard).await
    }

    /// [`load`](Self::load) for a caller that already holds the write lock.
    pub async fn load_locked(
        &self,
        guard: &WriteGuard<'_>,
    ) -> Result<Vec<ShapeRecord>, CatalogError> {
        // Re-read: another writer may have created the file while we waited
        if let Some(shapes) = self.read_existing().await? {
            return Ok(shapes);
        }

        let shapes = default_shapes();
        match self.save(guard, &shapes).await {
            Ok(()) => info!(path = %self.path.display(), "Seeded catalog with default shapes"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not seed catalog file"),
        }
        Ok(shapes)
    }

    /// Overwrite the backing file with the given collection.
    ///
    /// Writes a uniquely named sibling temp file and renames it into place,
    /// so the old file stays intact if anything fails.
    pub async fn save(
        &self,
        _guard: &WriteGuard<'_>,
        shapes: &[ShapeRecord],
    ) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let body = to_pretty_json(shapes)?;
        let tmp_path = self.tmp_path();

        if let Err(e) = fs::write(&tmp_path, &body).await {
            fs::remove_file(&tmp_path).await.ok();
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            fs::remove_file(&tmp_path).await.ok();
            return Err(e.into());
        }

        debug!(count = shapes.len(), bytes = body.len(), "Saved catalog");
        Ok(())
    }

    /// Read and parse the file. `None` means it does not exist.
    async fn read_existing(&self) -> Result<Option<Vec<ShapeRecord>>, CatalogError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entries = match serde_json::from_slice::<Vec<Value>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Catalog file is not a JSON array, serving defaults"
                );
                return Ok(Some(default_shapes()));
            }
        };

        let mut shapes = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match ShapeRecord::from_stored(entry) {
                Some(shape) => shapes.push(shape),
                None => {
                    warn!(path = %self.path.display(), index, "Skipping unreadable catalog entry")
                }
            }
        }

        debug!(count = shapes.len(), "Loaded catalog");
        Ok(Some(shapes))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "blocks.json".into());
        name.push(format!(".{}.tmp", hex::encode(rand::random::<[u8; 4]>())));
        self.path.with_file_name(name)
    }
}

/// Pretty JSON with a 4-space indent; non-ASCII text is left unescaped.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CatalogError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}
