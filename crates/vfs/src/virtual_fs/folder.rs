use async_trait::async_trait;

use super::file::VirtualFile;
use super::node::Node;
use crate::drive::{Descriptor, Query, SharedDrive, FOLDER_MIME};
use crate::error::{FsError, Result};
use crate::fs::{child_path, FileStat, FsFolder, FsObject};
use crate::path;

/// A folder in the remote store, addressed by path
pub struct VirtualFolder {
    node: Node,
}

/// Resolved child of a folder
pub enum Child {
    File(VirtualFile),
    Folder(VirtualFolder),
}

impl VirtualFolder {
    pub fn new(drive: SharedDrive, path: &str) -> Self {
        Self {
            node: Node::new(drive, path),
        }
    }

    /// Handle for the root folder
    pub fn root(drive: SharedDrive) -> Self {
        Self::new(drive, "/")
    }

    fn from_descriptor(drive: SharedDrive, path: &str, item: Descriptor) -> Self {
        Self {
            node: Node::with_descriptor(drive, path, item),
        }
    }

    pub fn drive(&self) -> &SharedDrive {
        self.node.drive()
    }

    pub async fn descriptor(&self) -> Result<Option<Descriptor>> {
        self.node.descriptor().await
    }

    /// Non-trashed children of this folder, in listing order
    async fn children(&self) -> Result<Vec<Descriptor>> {
        let item = self.node.require().await?;
        if !item.is_folder() {
            return Err(FsError::NotFound(self.path().to_string()));
        }
        let query = Query::children_of(&item.id).not_trashed();
        Ok(self.node.api().list(&query).await?)
    }

    /// Resolve a path below this folder to a file or folder handle
    pub async fn child(&self, rel: &str) -> Result<Child> {
        let child = child_path(self.path(), rel)?;
        let item = self
            .node
            .resolver()
            .resolve(&child)
            .await?
            .ok_or_else(|| FsError::NotFound(child.clone()))?;
        let drive = self.drive().clone();
        Ok(if item.is_folder() {
            Child::Folder(Self::from_descriptor(drive, &child, item))
        } else {
            Child::File(VirtualFile::from_descriptor(drive, &child, item))
        })
    }
}

#[async_trait]
impl FsObject for VirtualFolder {
    fn path(&self) -> &str {
        self.node.path()
    }

    fn invalidate(&self) {
        self.node.invalidate();
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self
            .node
            .descriptor()
            .await?
            .is_some_and(|item| item.is_folder() && !item.is_trashed()))
    }

    async fn stat(&self) -> Result<FileStat> {
        self.node.stat().await
    }

    /// Create the folder when missing; its parent must exist
    async fn touch(&self) -> Result<()> {
        match self.node.descriptor().await? {
            Some(item) if item.is_folder() => Ok(()),
            Some(_) => Err(FsError::Exists(self.path().to_string())),
            None => {
                self.node.create(FOLDER_MIME, None).await?;
                Ok(())
            }
        }
    }

    /// Delete the folder and everything below it
    async fn remove(&self) -> Result<()> {
        self.node.remove().await
    }
}

#[async_trait]
impl FsFolder for VirtualFolder {
    type File = VirtualFile;

    async fn list_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .children()
            .await?
            .into_iter()
            .map(|item| item.title)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_files(&self) -> Result<Vec<VirtualFile>> {
        let drive = self.drive().clone();
        let mut files: Vec<VirtualFile> = self
            .children()
            .await?
            .into_iter()
            .filter(|item| !item.is_folder())
            .map(|item| {
                let child = path::join(self.path(), &item.title);
                VirtualFile::from_descriptor(drive.clone(), &child, item)
            })
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(files)
    }

    async fn list_folders(&self) -> Result<Vec<Self>> {
        let drive = self.drive().clone();
        let mut folders: Vec<Self> = self
            .children()
            .await?
            .into_iter()
            .filter(Descriptor::is_folder)
            .map(|item| {
                let child = path::join(self.path(), &item.title);
                Self::from_descriptor(drive.clone(), &child, item)
            })
            .collect();
        folders.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(folders)
    }

    fn file(&self, rel: &str) -> Result<VirtualFile> {
        let child = child_path(self.path(), rel)?;
        Ok(VirtualFile::new(self.drive().clone(), &child))
    }

    fn folder(&self, rel: &str) -> Result<Self> {
        let child = child_path(self.path(), rel)?;
        Ok(Self::new(self.drive().clone(), &child))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::drive::MemoryDrive;
    use crate::fs::FsFile;

    fn notebook() -> VirtualFolder {
        let drive: SharedDrive = Arc::new(MemoryDrive::with_files(vec![
            ("/notebooks/test/b.txt", "B"),
            ("/notebooks/test/a.txt", "A"),
            ("/notebooks/test/sub/c.txt", "C"),
        ]));
        VirtualFolder::new(drive, "/notebooks/test")
    }

    #[tokio::test]
    async fn test_listing() {
        let folder = notebook();
        assert_eq!(folder.list_names().await.unwrap(), vec!["a.txt", "b.txt", "sub"]);

        let files = folder.list_files().await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path()).collect();
        assert_eq!(paths, vec!["/notebooks/test/a.txt", "/notebooks/test/b.txt"]);
        assert_eq!(files[0].read().await.unwrap(), "A");

        let folders = folder.list_folders().await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].list_names().await.unwrap(), vec!["c.txt"]);
    }

    #[tokio::test]
    async fn test_listing_skips_removed() {
        let folder = notebook();
        folder.file("a.txt").unwrap().remove().await.unwrap();
        assert_eq!(folder.list_names().await.unwrap(), vec!["b.txt", "sub"]);
    }

    #[tokio::test]
    async fn test_list_missing_folder_is_not_found() {
        let folder = notebook();
        let missing = folder.folder("nope").unwrap();
        assert!(matches!(missing.list_names().await, Err(FsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_factories_enforce_containment() {
        let folder = notebook();
        assert_eq!(folder.file("sub/c.txt").unwrap().path(), "/notebooks/test/sub/c.txt");
        assert_eq!(folder.subdir("sub").unwrap().path(), "/notebooks/test/sub");
        assert!(matches!(folder.file("../x.txt"), Err(FsError::PathLookup { .. })));
        assert!(matches!(folder.folder("/etc"), Err(FsError::PathLookup { .. })));
    }

    #[tokio::test]
    async fn test_child_resolves_kind() {
        let folder = notebook();
        assert!(matches!(folder.child("sub").await.unwrap(), Child::Folder(_)));
        match folder.child("b.txt").await.unwrap() {
            Child::File(file) => assert_eq!(file.read().await.unwrap(), "B"),
            Child::Folder(_) => panic!("expected a file"),
        }
        assert!(matches!(folder.child("zzz").await, Err(FsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_touch_creates_folder() {
        let folder = notebook();
        let new = folder.folder("fresh").unwrap();
        assert!(!new.exists().await.unwrap());
        new.touch().await.unwrap();
        assert!(new.exists().await.unwrap());
        new.touch().await.unwrap();

        new.file("page.txt").unwrap().write("x").await.unwrap();
        assert_eq!(new.list_names().await.unwrap(), vec!["page.txt"]);

        let nested = folder.folder("a/b").unwrap();
        assert!(matches!(nested.touch().await, Err(FsError::InvalidFolder(_))));
        let over_file = folder.folder("a.txt").unwrap();
        assert!(matches!(over_file.touch().await, Err(FsError::Exists(_))));
    }

    #[tokio::test]
    async fn test_remove_folder_tree() {
        let folder = notebook();
        let sub = folder.folder("sub").unwrap();
        sub.remove().await.unwrap();
        assert!(!sub.exists().await.unwrap());
        assert!(!folder.file("sub/c.txt").unwrap().exists().await.unwrap());

        let root = VirtualFolder::root(folder.drive().clone());
        assert!(root.exists().await.unwrap());
        assert!(root.remove().await.is_err());
    }
}
