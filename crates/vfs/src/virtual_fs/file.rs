use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::folder::VirtualFolder;
use super::node::Node;
use crate::drive::{Descriptor, Media, Metadata, SharedDrive};
use crate::error::{FsError, Result};
use crate::etag::Etag;
use crate::fs::{FileStat, FsFile, FsObject};
use crate::path;

/// Mime type used for content written without an explicit one
pub const DEFAULT_TEXT_MIME: &str = "text/plain";

/// A file in the remote store, addressed by path
///
/// The descriptor is resolved lazily on first use and cached until a
/// mutation invalidates it. Handles are not shared: two `VirtualFile`s for
/// the same path keep separate caches.
pub struct VirtualFile {
    node: Node,
    mime_type: String,
}

impl VirtualFile {
    pub fn new(drive: SharedDrive, path: &str) -> Self {
        Self {
            node: Node::new(drive, path),
            mime_type: DEFAULT_TEXT_MIME.to_string(),
        }
    }

    pub(crate) fn from_descriptor(drive: SharedDrive, path: &str, item: Descriptor) -> Self {
        Self {
            mime_type: item.mime_type.clone(),
            node: Node::with_descriptor(drive, path, item),
        }
    }

    /// Mime type sent with uploads
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn drive(&self) -> &SharedDrive {
        self.node.drive()
    }

    /// Folder part of the path
    pub fn folder_path(&self) -> String {
        self.node.folder_path()
    }

    /// Handle for the containing folder
    pub fn parent_folder(&self) -> VirtualFolder {
        VirtualFolder::new(self.drive().clone(), &self.folder_path())
    }

    /// Resolved descriptor, `None` when the path does not resolve
    pub async fn descriptor(&self) -> Result<Option<Descriptor>> {
        self.node.descriptor().await
    }

    /// Id of the first parent folder
    pub async fn parent(&self) -> Result<String> {
        let item = self.node.require().await?;
        item.parent_id()
            .map(String::from)
            .ok_or_else(|| FsError::NotFound(path::parent(self.path())))
    }

    /// True when the path resolves to a folder-type object
    pub async fn is_folder(&self) -> Result<bool> {
        Ok(self
            .node
            .descriptor()
            .await?
            .is_some_and(|item| item.is_folder()))
    }

    /// Both handles resolve to the same remote object
    pub async fn is_same(&self, other: &Self) -> Result<bool> {
        let mine = self.node.require().await?;
        let theirs = other.node.require().await?;
        Ok(mine.id == theirs.id)
    }

    /// Whether `name` names an existing folder. `/` always does, `""` never.
    /// Relative names are taken from this file's folder. Lookup errors
    /// count as "no".
    pub async fn folder_exists(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if path::normalize(name) == "/" {
            return true;
        }
        let folder = path::join(&self.folder_path(), name);
        match self.node.resolver().folder_chain(&folder).await {
            Ok(chain) => !chain.is_empty(),
            Err(e) => {
                tracing::warn!(%folder, error = %e, "Folder lookup failed");
                false
            }
        }
    }

    /// Raw content
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        let item = self.node.require().await?;
        Ok(self.node.api().get_media(&item.id).await?)
    }

    /// Absolute destination, refusing an existing target
    async fn destination(&self, dest: &str) -> Result<(String, String, String)> {
        let dest = path::join(&self.folder_path(), dest);
        if self.node.resolver().resolve(&dest).await?.is_some() {
            return Err(FsError::Exists(dest));
        }
        let (folder, title) = path::split(&dest);
        Ok((dest, folder, title))
    }

    /// Metadata placing an object at `folder`/`title`, with a parent change
    /// only when the folder differs from the current one
    async fn placement(&self, folder: &str, title: &str) -> Result<Metadata> {
        let metadata = Metadata::titled(title);
        if folder == self.folder_path() {
            return Ok(metadata);
        }
        let parent = self.node.resolver().parent_id(folder).await?;
        Ok(metadata.with_parent(parent))
    }

    /// Copy to `dest` and return the new remote object.
    ///
    /// A different destination folder must already exist
    /// (`FsError::InvalidFolder`). No handle is created for the copy.
    pub async fn copy_remote(&self, dest: &str) -> Result<Descriptor> {
        let item = self.node.require().await?;
        let (dest, folder, title) = self.destination(dest).await?;
        let metadata = self.placement(&folder, &title).await?;
        let copy = self.node.api().copy(&item.id, &metadata).await?;
        tracing::info!(from = %self.path(), to = %dest, id = %copy.id, "Copied");
        Ok(copy)
    }
}

#[async_trait]
impl FsObject for VirtualFile {
    fn path(&self) -> &str {
        self.node.path()
    }

    fn invalidate(&self) {
        self.node.invalidate();
    }

    async fn exists(&self) -> Result<bool> {
        self.node.exists().await
    }

    async fn stat(&self) -> Result<FileStat> {
        self.node.stat().await
    }

    async fn ctime(&self) -> Result<DateTime<Utc>> {
        Ok(self.node.require().await?.created_date)
    }

    async fn mtime(&self) -> Result<DateTime<Utc>> {
        Ok(self.node.require().await?.modified_date)
    }

    async fn touch(&self) -> Result<()> {
        let item = self.node.require().await?;
        let touched = self.node.api().touch(&item.id).await?;
        self.node.adopt(Some(touched));
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.node.remove().await
    }
}

#[async_trait]
impl FsFile for VirtualFile {
    async fn read(&self) -> Result<String> {
        String::from_utf8(self.read_bytes().await?)
            .map_err(|_| FsError::Unicode(self.path().to_string()))
    }

    async fn write(&self, text: &str) -> Result<()> {
        let media = Media::new(self.mime_type.clone(), text);
        match self.node.descriptor().await? {
            Some(item) if item.is_folder() => Err(FsError::Exists(self.path().to_string())),
            Some(item) if !item.is_trashed() => {
                let metadata = Metadata::titled(self.node.title()).with_mime(&self.mime_type);
                let updated = self.node.api().update(&item.id, &metadata, Some(media)).await?;
                tracing::info!(path = %self.path(), id = %updated.id, "Updated");
                self.node.adopt(Some(updated));
                Ok(())
            }
            _ => {
                self.node.create(&self.mime_type, Some(media)).await?;
                Ok(())
            }
        }
    }

    /// Moves the remote object. This handle keeps its old path, so it no
    /// longer exists afterwards; open a new handle on `dest` to follow it.
    async fn move_to(&self, dest: &str) -> Result<()> {
        let item = self.node.require().await?;
        if path::join(&self.folder_path(), dest) == self.path() {
            return Ok(());
        }
        let (dest, folder, title) = self.destination(dest).await?;
        let metadata = self.placement(&folder, &title).await?;
        self.node.api().update(&item.id, &metadata, None).await?;
        tracing::info!(from = %self.path(), to = %dest, id = %item.id, "Moved");
        self.node.invalidate();
        Ok(())
    }

    async fn copy_to(&self, dest: &str) -> Result<()> {
        self.copy_remote(dest).await.map(|_| ())
    }
}
