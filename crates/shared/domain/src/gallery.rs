//! File gallery: folders, stored files and upload acceptance rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_STRING_LENGTH, MAX_UPLOAD_BYTES};
use crate::error::{DomainError, DomainResult};

/// Who may fetch a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(DomainError::field(
                "visibility",
                "The selected visibility is invalid.",
            )),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gallery folder. `path` is materialized from the root, e.g. `/reports/2024`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Folder {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata of a stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GalleryFile {
    pub id: Uuid,
    pub folder_id: Option<Uuid>,
    pub original_name: String,
    /// Storage-relative path, unique
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub visibility: Visibility,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validate a folder name: non-empty, bounded, and a single path segment.
pub fn validate_folder_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::field("name", "The name field is required."));
    }
    if trimmed.chars().count() > MAX_STRING_LENGTH {
        return Err(DomainError::field(
            "name",
            "The name may not be greater than 255 characters.",
        ));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed == "." || trimmed == ".." {
        return Err(DomainError::field(
            "name",
            "The name may not contain path separators.",
        ));
    }
    Ok(trimmed.to_string())
}

/// Materialized path of a folder named `name` below `parent_path`.
pub fn folder_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), name),
        None => format!("/{}", name),
    }
}

/// Rewrite `path` when it lives at or below `old_prefix`.
///
/// Returns `None` for paths outside the renamed subtree.
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    path.strip_prefix(old_prefix)
        .filter(|rest| rest.starts_with('/'))
        .map(|rest| format!("{}{}", new_prefix, rest))
}

/// Lower-cased extension of a client-supplied file name.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Accept or reject an upload before anything touches storage.
///
/// Returns the normalized extension on success.
pub fn check_upload(
    field: &str,
    file_name: &str,
    size: usize,
    allowed: &[&str],
) -> DomainResult<String> {
    if size == 0 {
        return Err(DomainError::field(field, format!("The {} must not be empty.", field)));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(DomainError::field(
            field,
            format!(
                "The {} may not be greater than {} kilobytes.",
                field,
                MAX_UPLOAD_BYTES / 1024
            ),
        ));
    }
    match extension_of(file_name) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(DomainError::field(
            field,
            format!("The {} must be a file of type: {}.", field, allowed.join(", ")),
        )),
    }
}

/// MIME type served for a stored extension.
pub fn mime_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ALLOWED_AVATAR_EXTENSIONS, ALLOWED_UPLOAD_EXTENSIONS};

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension_of("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".env"), None);
    }

    #[test]
    fn test_check_upload_allow_list_and_size() {
        assert_eq!(
            check_upload("file", "photo.JPG", 1024, ALLOWED_UPLOAD_EXTENSIONS).unwrap(),
            "jpg"
        );
        assert!(check_upload("file", "script.exe", 1024, ALLOWED_UPLOAD_EXTENSIONS).is_err());
        assert!(check_upload("file", "big.mp4", MAX_UPLOAD_BYTES + 1, ALLOWED_UPLOAD_EXTENSIONS).is_err());
        assert!(check_upload("file", "edge.mp4", MAX_UPLOAD_BYTES, ALLOWED_UPLOAD_EXTENSIONS).is_ok());
        assert!(check_upload("avatar", "doc.pdf", 10, ALLOWED_AVATAR_EXTENSIONS).is_err());
    }

    #[test]
    fn test_folder_paths() {
        assert_eq!(folder_path(None, "reports"), "/reports");
        assert_eq!(folder_path(Some("/reports"), "2024"), "/reports/2024");

        assert_eq!(
            rebase_path("/reports/2024/q1", "/reports", "/archive").as_deref(),
            Some("/archive/2024/q1")
        );
        assert_eq!(rebase_path("/reports", "/reports", "/archive").as_deref(), Some("/archive"));
        assert_eq!(rebase_path("/reports-old", "/reports", "/archive"), None);
    }

    #[test]
    fn test_folder_name_rules() {
        assert_eq!(validate_folder_name("  Invoices ").unwrap(), "Invoices");
        assert!(validate_folder_name("").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name("..").is_err());
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("private".parse::<Visibility>().unwrap(), Visibility::Private);
        assert!("secret".parse::<Visibility>().is_err());
    }
}
