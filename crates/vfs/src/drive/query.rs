//! Structured list queries
//!
//! Rendered to the service query grammar for HTTP, evaluated directly by
//! the in-memory drive.

use std::fmt;

use super::types::{Descriptor, FOLDER_MIME};

/// Filter for a list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// `'<id>' in parents`
    pub parent: Option<String>,
    /// `title = '<title>'`
    pub title: Option<String>,
    /// `mimeType = '<mime>'`
    pub mime_type: Option<String>,
    /// `trashed != true`
    pub exclude_trashed: bool,
    /// Result cap, sent as `maxResults`
    pub max_results: Option<u32>,
}

impl Query {
    /// Children of the folder with the given id
    pub fn children_of(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn folders_only(mut self) -> Self {
        self.mime_type = Some(FOLDER_MIME.to_string());
        self
    }

    #[must_use]
    pub const fn not_trashed(mut self) -> Self {
        self.exclude_trashed = true;
        self
    }

    #[must_use]
    pub const fn limit(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Evaluate the filter against a descriptor (ignores `max_results`)
    pub fn matches(&self, item: &Descriptor) -> bool {
        if let Some(parent) = &self.parent {
            if !item.parents.iter().any(|p| &p.id == parent) {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if &item.title != title {
                return false;
            }
        }
        if let Some(mime) = &self.mime_type {
            if &item.mime_type != mime {
                return false;
            }
        }
        !(self.exclude_trashed && item.is_trashed())
    }
}

/// Quote a string literal for the query grammar
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = Vec::new();
        if let Some(parent) = &self.parent {
            clauses.push(format!("{} in parents", quote(parent)));
        }
        if let Some(title) = &self.title {
            clauses.push(format!("title = {}", quote(title)));
        }
        if let Some(mime) = &self.mime_type {
            clauses.push(format!("mimeType = {}", quote(mime)));
        }
        if self.exclude_trashed {
            clauses.push("trashed != true".to_string());
        }
        f.write_str(&clauses.join(" and "))
    }
}
