//! Uploaded shape images
//!
//! Uploads are accepted only when their bytes look like PNG, JPEG, GIF or
//! SVG. Each upload gets a fresh name derived from the client's file name,
//! the current time and a random suffix, and is referenced from records as
//! `images/<name>`.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Prefix of image paths stored in records
pub const IMAGE_URL_PREFIX: &str = "images";

/// How far into an upload to look for an `<svg` element
const SVG_SNIFF_LEN: usize = 1024;

/// Allowed upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
    Jpeg,
    Gif,
}

impl ImageFormat {
    /// Detect the format from file contents
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }
        if looks_like_svg(data) {
            return Some(ImageFormat::Svg);
        }
        None
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
        }
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SVG_SNIFF_LEN)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with('<') && text.contains("<svg")
}

/// Build a collision-resistant file name: `<stem>_<unix secs>_<hex>.<ext>`.
///
/// Characters of the stem and extension outside `[A-Za-z0-9._-]` become `_`.
pub fn unique_file_name(original: &str, now: DateTime<Utc>, suffix: [u8; 4]) -> String {
    // Browsers may send a full client-side path
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], &base[idx + 1..]),
        _ => (base, ""),
    };

    let mut name = format!("{}_{}_{}", sanitize(stem), now.timestamp(), hex::encode(suffix));
    if !ext.is_empty() {
        name.push('.');
        name.push_str(&sanitize(ext));
    }
    name
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate a unique name for an upload using the clock and a random suffix
pub fn generate_file_name(original: &str) -> String {
    unique_file_name(original, Utc::now(), rand::random())
}

/// Directory holding uploaded images
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Record path for a stored file name
    pub fn relative_path(file_name: &str) -> String {
        format!("{}/{}", IMAGE_URL_PREFIX, file_name)
    }

    /// Write an upload under `file_name`, creating the directory if needed
    pub async fn write(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        fs::write(&path, data).await?;

        info!(path = %path.display(), size = data.len(), "Stored uploaded image");
        Ok(path)
    }

    /// Remove a previously written upload; missing files are ignored
    pub async fn remove(&self, file_name: &str) {
        let path = self.dir.join(file_name);
        if fs::remove_file(&path).await.is_ok() {
            debug!(path = %path.display(), "Removed uploaded image");
        }
    }
}
