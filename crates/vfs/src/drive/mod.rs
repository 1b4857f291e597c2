//! Remote document store surface
//!
//! `DriveApi` is the id-keyed query and mutation surface the virtual file
//! objects are built on. `HttpDriveClient` talks to the real service,
//! `MemoryDrive` keeps everything in memory for tests and offline use.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub mod http;
pub mod memory;
pub mod query;
pub mod types;

pub use http::{HttpDriveClient, HttpDriveConfig};
pub use memory::MemoryDrive;
pub use query::Query;
pub use types::{Descriptor, Labels, Media, Metadata, ParentRef, FOLDER_MIME, ROOT_ID};

/// Id-keyed remote operations
///
/// Every call is one round trip. Implementations report failures as
/// `anyhow` errors; the virtual layer lifts them into `FsError::Remote`.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// List objects matching a query
    async fn list(&self, query: &Query) -> Result<Vec<Descriptor>>;

    /// Fetch one descriptor by id (`root` names the root folder)
    async fn get(&self, id: &str) -> Result<Descriptor>;

    /// Download raw content
    async fn get_media(&self, id: &str) -> Result<Vec<u8>>;

    /// Create an object, optionally with content
    async fn insert(&self, metadata: &Metadata, media: Option<Media>) -> Result<Descriptor>;

    /// Update metadata and/or replace content
    async fn update(&self, id: &str, metadata: &Metadata, media: Option<Media>)
        -> Result<Descriptor>;

    /// Delete permanently
    async fn delete(&self, id: &str) -> Result<()>;

    /// Copy an object, applying the given metadata to the copy
    async fn copy(&self, id: &str, metadata: &Metadata) -> Result<Descriptor>;

    /// Bump the modified time
    async fn touch(&self, id: &str) -> Result<Descriptor>;
}

/// Handle shared by every virtual object of one process
pub type SharedDrive = Arc<dyn DriveApi>;
