//! Path to remote object resolution
//!
//! Walks the remote namespace one segment at a time. Folder segments are
//! looked up with the folder mime filter under the previous folder id,
//! starting from `root`; the terminal segment is looked up without it
//! because it may be a file or a folder. Trashed objects never match.

use crate::drive::{Descriptor, DriveApi, Query, ROOT_ID};
use crate::error::{FsError, Result};
use crate::path;

/// Resolver over one drive handle
pub struct Resolver<'a> {
    drive: &'a dyn DriveApi,
}

impl<'a> Resolver<'a> {
    pub fn new(drive: &'a dyn DriveApi) -> Self {
        Self { drive }
    }

    /// First non-trashed child of `parent` titled `title`
    async fn lookup(&self, parent: &str, title: &str, folder: bool) -> Result<Option<Descriptor>> {
        let mut query = Query::children_of(parent).titled(title).not_trashed().limit(1);
        if folder {
            query = query.folders_only();
        }
        tracing::debug!(%query, "Resolver lookup");
        Ok(self.drive.list(&query).await?.into_iter().next())
    }

    /// Resolve a path to its descriptor.
    ///
    /// `None` when the terminal segment or any folder above it is missing.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, path: &str) -> Result<Option<Descriptor>> {
        let segments = path::segments(path);
        let Some((terminal, folders)) = segments.split_last() else {
            return Ok(Some(self.drive.get(ROOT_ID).await?));
        };

        let mut parent = ROOT_ID.to_string();
        for folder in folders {
            match self.lookup(&parent, folder, true).await? {
                Some(item) => parent = item.id,
                None => {
                    tracing::debug!(%folder, "Missing folder segment");
                    return Ok(None);
                }
            }
        }
        self.lookup(&parent, terminal, false).await
    }

    /// Resolve every segment of a folder path, root first.
    ///
    /// The root itself yields an empty chain. A missing segment is
    /// `FsError::InvalidFolder` naming the path up to that segment.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn folder_chain(&self, folder_path: &str) -> Result<Vec<Descriptor>> {
        let mut chain: Vec<Descriptor> = Vec::new();
        let mut walked = String::new();
        for segment in path::segments(folder_path) {
            walked = format!("{walked}/{segment}");
            let parent = chain.last().map_or(ROOT_ID, |d| d.id.as_str()).to_string();
            match self.lookup(&parent, &segment, true).await? {
                Some(item) => chain.push(item),
                None => return Err(FsError::InvalidFolder(walked)),
            }
        }
        Ok(chain)
    }

    /// Id of the folder at `folder_path` (`root` for `/`)
    pub async fn parent_id(&self, folder_path: &str) -> Result<String> {
        Ok(self
            .folder_chain(folder_path)
            .await?
            .pop()
            .map_or_else(|| ROOT_ID.to_string(), |d| d.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::MemoryDrive;

    fn drive() -> MemoryDrive {
        MemoryDrive::with_files(vec![
            ("/top.txt", "top"),
            ("/notebooks/test/testfile.txt", "hello"),
            ("/notebooks/empty/", ""),
        ])
    }

    #[tokio::test]
    async fn resolves_root_and_single_segment() {
        let drive = drive();
        let resolver = Resolver::new(&drive);

        let root = resolver.resolve("/").await.unwrap().unwrap();
        assert_eq!(root.id, ROOT_ID);

        let top = resolver.resolve("/top.txt").await.unwrap().unwrap();
        assert_eq!(top.title, "top.txt");

        let folder = resolver.resolve("/notebooks").await.unwrap().unwrap();
        assert!(folder.is_folder());
    }

    #[tokio::test]
    async fn resolves_nested_terminal() {
        let drive = drive();
        let resolver = Resolver::new(&drive);

        let file = resolver.resolve("/notebooks/test/testfile.txt").await.unwrap().unwrap();
        let folder = resolver.resolve("/notebooks/test").await.unwrap().unwrap();
        assert_eq!(file.parent_id(), Some(folder.id.as_str()));
        assert!(folder.is_folder());
    }

    #[tokio::test]
    async fn missing_segments_are_not_found() {
        let drive = drive();
        let resolver = Resolver::new(&drive);

        assert!(resolver.resolve("/nope.txt").await.unwrap().is_none());
        assert!(resolver.resolve("/notebooks/test/nope.txt").await.unwrap().is_none());
        assert!(resolver.resolve("/notebooks/missing/file.txt").await.unwrap().is_none());
        // A file cannot stand in for a folder segment
        assert!(resolver.resolve("/top.txt/child").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn trashed_terminal_is_not_found() {
        let drive = drive();
        let id = Resolver::new(&drive).resolve("/top.txt").await.unwrap().unwrap().id;
        drive.trash(&id).unwrap();
        assert!(Resolver::new(&drive).resolve("/top.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn folder_chain_walks_every_segment() {
        let drive = drive();
        let resolver = Resolver::new(&drive);

        assert!(resolver.folder_chain("/").await.unwrap().is_empty());

        let chain = resolver.folder_chain("/notebooks/test").await.unwrap();
        let titles: Vec<_> = chain.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["notebooks", "test"]);
        assert_eq!(chain[1].parent_id(), Some(chain[0].id.as_str()));

        assert_eq!(resolver.parent_id("/").await.unwrap(), ROOT_ID);
        assert_eq!(resolver.parent_id("/notebooks/test").await.unwrap(), chain[1].id);
    }

    #[tokio::test]
    async fn folder_chain_reports_invalid_segment() {
        let drive = drive();
        let resolver = Resolver::new(&drive);

        match resolver.folder_chain("/notebooks/missing/deeper").await {
            Err(FsError::InvalidFolder(p)) => assert_eq!(p, "/notebooks/missing"),
            other => panic!("expected InvalidFolder, got {other:?}"),
        }
        assert!(matches!(
            resolver.folder_chain("/top.txt").await,
            Err(FsError::InvalidFolder(_))
        ));
    }
}
