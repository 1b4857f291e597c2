use std::sync::{PoisonError, RwLock};

use crate::drive::{Descriptor, DriveApi, Media, Metadata, SharedDrive};
use crate::error::{FsError, Result};
use crate::fs::FileStat;
use crate::path;
use crate::resolver::Resolver;

#[derive(Default)]
struct Cache {
    item: Option<Descriptor>,
    stale: bool,
}

/// Path plus cached descriptor, shared by `VirtualFile` and `VirtualFolder`.
///
/// `descriptor()` is the only way operations reach the remote object: it
/// resolves when the cache is stale and reuses the cached value otherwise.
/// Mutations either `adopt` the call's response or `invalidate`.
pub(crate) struct Node {
    drive: SharedDrive,
    path: String,
    cache: RwLock<Cache>,
}

impl Node {
    pub fn new(drive: SharedDrive, path: &str) -> Self {
        Self {
            drive,
            path: path::normalize(path),
            cache: RwLock::new(Cache {
                item: None,
                stale: true,
            }),
        }
    }

    /// Node whose descriptor is already known (e.g. from a listing)
    pub fn with_descriptor(drive: SharedDrive, path: &str, item: Descriptor) -> Self {
        let node = Self::new(drive, path);
        node.adopt(Some(item));
        node
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn drive(&self) -> &SharedDrive {
        &self.drive
    }

    pub fn api(&self) -> &dyn DriveApi {
        self.drive.as_ref()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.api())
    }

    /// Folder part of the path
    pub fn folder_path(&self) -> String {
        path::parent(&self.path)
    }

    pub fn title(&self) -> String {
        path::basename(&self.path)
    }

    /// Resolve-or-use-cached accessor
    pub async fn descriptor(&self) -> Result<Option<Descriptor>> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if !cache.stale {
                return Ok(cache.item.clone());
            }
        }
        let item = self.resolver().resolve(&self.path).await?;
        tracing::debug!(path = %self.path, found = item.is_some(), "Resolved");
        self.adopt(item.clone());
        Ok(item)
    }

    /// Descriptor of an existing object, else `FsError::NotFound`
    pub async fn require(&self) -> Result<Descriptor> {
        self.descriptor()
            .await?
            .filter(|item| !item.is_trashed())
            .ok_or_else(|| FsError::NotFound(self.path.clone()))
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self
            .descriptor()
            .await?
            .is_some_and(|item| !item.is_trashed()))
    }

    /// Trust `item` as the current state of the path
    pub fn adopt(&self, item: Option<Descriptor>) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.item = item;
        cache.stale = false;
    }

    /// Force the next access to resolve again
    pub fn invalidate(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .stale = true;
    }

    /// Create the object under its parent folder, which must exist
    pub async fn create(&self, mime_type: &str, media: Option<Media>) -> Result<Descriptor> {
        let parent = self.resolver().parent_id(&self.folder_path()).await?;
        let metadata = Metadata::titled(self.title())
            .with_mime(mime_type)
            .with_parent(parent);
        let item = self.api().insert(&metadata, media).await?;
        tracing::info!(path = %self.path, id = %item.id, "Created");
        self.adopt(Some(item.clone()));
        Ok(item)
    }

    /// Delete the object if present. The root is never deleted.
    pub async fn remove(&self) -> Result<()> {
        if self.path == "/" {
            return Err(FsError::PathLookup {
                path: self.path.clone(),
                parent: self.path.clone(),
            });
        }
        if let Some(item) = self.descriptor().await? {
            self.api().delete(&item.id).await?;
            tracing::info!(path = %self.path, id = %item.id, "Removed");
        }
        self.invalidate();
        Ok(())
    }

    pub async fn stat(&self) -> Result<FileStat> {
        let item = self.require().await?;
        Ok(FileStat {
            is_file: !item.is_folder(),
            is_dir: item.is_folder(),
            size: item.size().unwrap_or(0),
            created: item.created_date,
            modified: item.modified_date,
        })
    }
}
