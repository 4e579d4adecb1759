//! Transfer planning
//!
//! Pure helpers that decide file names, destination paths and content types
//! before any bytes move.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Fallback content type for unknown extensions
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Known extensions and the MIME type sent during upload negotiation
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("csv", "text/csv"),
];

/// Metadata describing a local file, sent during upload negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "customId", skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl FileMetadata {
    /// Stat a local file and derive its upload metadata
    pub async fn from_path(path: &Path) -> Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        Self::from_fs(path, &meta)
    }

    /// Derive upload metadata from an already obtained stat result
    pub fn from_fs(path: &Path, meta: &std::fs::Metadata) -> Result<Self> {
        if !meta.is_file() {
            return Err(Error::InvalidInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", path.display())))?;

        Ok(Self::new(name, meta.len()))
    }

    /// Build metadata from a name and size, deriving the MIME type from the name
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let mime_type = Path::new(&name)
            .extension()
            .map(|ext| classify_content_type(&ext.to_string_lossy()))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        Self {
            name,
            size,
            mime_type,
            custom_id: None,
        }
    }
}

/// Displayed filename for a remote file key
///
/// Keys look like `<id>-<name>`; everything after the last `-` is taken as the
/// name. Keys without a `-` are returned unchanged. Only the final path
/// component survives, so a key can never point outside the output directory.
pub fn derive_filename(file_key: &str) -> &str {
    let name = match file_key.rfind('-') {
        Some(pos) => &file_key[pos + 1..],
        None => file_key,
    };
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match name {
        "." | ".." => "",
        _ => name,
    }
}

/// MIME type for a file extension (with or without the leading dot)
pub fn classify_content_type(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Decide where a downloaded file lands
///
/// Creates the target directory (or the parent of an explicit file path) when
/// it is missing. Does not check whether the target file already exists.
pub async fn resolve_output_path(filename: &str, output_hint: &str) -> Result<PathBuf> {
    if output_hint.is_empty() {
        return Ok(PathBuf::from(filename));
    }

    if output_hint.ends_with('/') || output_hint.ends_with('\\') {
        tokio::fs::create_dir_all(output_hint).await?;
        return Ok(Path::new(output_hint).join(filename));
    }

    let hint = Path::new(output_hint);
    if tokio::fs::metadata(hint)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Ok(hint.join(filename));
    }

    if let Some(parent) = hint.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    Ok(hint.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derive_filename() {
        assert_eq!(derive_filename("abc123-example.jpg"), "example.jpg");
        assert_eq!(derive_filename("nodash"), "nodash");
        assert_eq!(derive_filename("a-b-c.txt"), "c.txt");
        assert_eq!(derive_filename("trailing-"), "");
    }

    #[test]
    fn test_derive_filename_strips_directories() {
        assert_eq!(derive_filename("k-../../x"), "x");
        assert_eq!(derive_filename("k-/etc/passwd"), "passwd");
        assert_eq!(derive_filename("k-dir\\evil.exe"), "evil.exe");
        assert_eq!(derive_filename("nodash/inner.txt"), "inner.txt");
        assert_eq!(derive_filename("k-.."), "");
    }

    #[test]
    fn test_derive_filename_matches_last_segment() {
        for key in ["x-y", "k1-k2-k3-name.pdf", "-lead", "no_separator.bin"] {
            let expected = key.rsplit('-').next().unwrap();
            assert_eq!(derive_filename(key), expected, "key {key}");
        }
    }

    #[test]
    fn test_classify_content_type() {
        assert_eq!(classify_content_type("jpg"), "image/jpeg");
        assert_eq!(classify_content_type(".JPEG"), "image/jpeg");
        assert_eq!(classify_content_type("png"), "image/png");
        assert_eq!(classify_content_type("csv"), "text/csv");
        assert_eq!(classify_content_type("xml"), "application/xml");
        assert_eq!(classify_content_type("exe"), DEFAULT_CONTENT_TYPE);
        assert_eq!(classify_content_type(""), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_metadata_new() {
        let meta = FileMetadata::new("report.PDF", 42);
        assert_eq!(meta.mime_type, "application/pdf");
        assert_eq!(meta.size, 42);

        let meta = FileMetadata::new("Makefile", 1);
        assert_eq!(meta.mime_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_metadata_serializes_wire_names() {
        let meta = FileMetadata::new("a.txt", 3);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "a.txt", "size": 3, "type": "text/plain"})
        );
    }

    #[tokio::test]
    async fn test_metadata_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, b"{\"a\":1}").unwrap();

        let meta = FileMetadata::from_path(&path).await.unwrap();
        assert_eq!(meta.name, "data.json");
        assert_eq!(meta.size, 7);
        assert_eq!(meta.mime_type, "application/json");
    }

    #[tokio::test]
    async fn test_metadata_from_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileMetadata::from_path(temp_dir.path()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_output_empty_hint() {
        let path = resolve_output_path("x.jpg", "").await.unwrap();
        assert_eq!(path, PathBuf::from("x.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_output_trailing_separator_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let hint = format!("{}/downloads/", temp_dir.path().display());

        let path = resolve_output_path("x.jpg", &hint).await.unwrap();
        assert!(temp_dir.path().join("downloads").is_dir());
        assert_eq!(path, temp_dir.path().join("downloads").join("x.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_output_existing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let hint = temp_dir.path().to_string_lossy().into_owned();

        let path = resolve_output_path("x.jpg", &hint).await.unwrap();
        assert_eq!(path, temp_dir.path().join("x.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_output_file_path_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a").join("b").join("renamed.jpg");
        let hint = target.to_string_lossy().into_owned();

        let path = resolve_output_path("x.jpg", &hint).await.unwrap();
        assert_eq!(path, target);
        assert!(temp_dir.path().join("a").join("b").is_dir());
        assert!(!target.exists());
    }
}
