//! Remote object metadata as returned by the Drive v2 REST surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mime type the remote service uses to mark folder objects
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Well-known id of the root folder
pub const ROOT_ID: &str = "root";

/// Reference to a parent folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_root: bool,
}

impl ParentRef {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            is_root: id == ROOT_ID,
            id,
        }
    }
}

/// Label flags attached to a remote object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default)]
    pub trashed: bool,
}

/// Remote object descriptor
///
/// Owned by the remote service. Virtual file objects hold a cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mime_type: String,
    /// The service allows several parents; only the first is used
    #[serde(default)]
    pub parents: Vec<ParentRef>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub modified_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
    /// int64 encoded as a string on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

impl Descriptor {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    pub fn is_trashed(&self) -> bool {
        self.labels.trashed
    }

    /// First parent id, if any
    pub fn parent_id(&self) -> Option<&str> {
        self.parents.first().map(|p| p.id.as_str())
    }

    pub fn size(&self) -> Option<u64> {
        self.file_size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Partial metadata body for insert, update and copy calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<ParentRef>>,
}

impl Metadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parent(mut self, id: impl Into<String>) -> Self {
        self.parents = Some(vec![ParentRef::new(id)]);
        self
    }

    #[must_use]
    pub fn with_mime(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Upload payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Media {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_from_wire_json() {
        let json = r#"{
            "kind": "drive#file",
            "id": "0B123",
            "title": "page.txt",
            "mimeType": "text/plain",
            "parents": [{"kind": "drive#parentReference", "id": "0Bfolder", "isRoot": false}],
            "labels": {"starred": false, "trashed": false},
            "createdDate": "2016-03-01T10:00:00.000Z",
            "modifiedDate": "2016-03-02T11:30:00.000Z",
            "md5Checksum": "5d41402abc4b2a76b9719d911017c592",
            "fileSize": "5"
        }"#;
        let item: Descriptor = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "0B123");
        assert_eq!(item.parent_id(), Some("0Bfolder"));
        assert!(!item.is_folder());
        assert!(!item.is_trashed());
        assert_eq!(item.size(), Some(5));
        assert!(item.modified_date > item.created_date);
    }

    #[test]
    fn metadata_skips_unset_fields() {
        let body = serde_json::to_value(Metadata::titled("renamed.txt")).unwrap();
        assert_eq!(body, serde_json::json!({"title": "renamed.txt"}));

        let body = serde_json::to_value(Metadata::titled("x").with_parent("root")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"title": "x", "parents": [{"id": "root", "isRoot": true}]})
        );
    }
}
