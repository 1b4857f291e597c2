use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FsError, Result};
use crate::etag::Etag;
use crate::path;

/// File metadata returned by stat operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub is_file: bool,
    pub is_dir: bool,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Operations shared by files and folders
///
/// Implemented for remote-backed (`VirtualFile`, `VirtualFolder`) and
/// local-disk (`LocalFile`, `LocalFolder`) objects alike.
#[async_trait]
pub trait FsObject: Send + Sync {
    /// Normalized absolute path
    fn path(&self) -> &str;

    /// Last path segment
    fn basename(&self) -> String {
        path::basename(self.path())
    }

    async fn exists(&self) -> Result<bool>;

    /// Metadata; `FsError::NotFound` when absent
    async fn stat(&self) -> Result<FileStat>;

    async fn ctime(&self) -> Result<DateTime<Utc>> {
        Ok(self.stat().await?.created)
    }

    async fn mtime(&self) -> Result<DateTime<Utc>> {
        Ok(self.stat().await?.modified)
    }

    /// Files: bump the modification time. Folders: create when missing.
    async fn touch(&self) -> Result<()>;

    /// Delete; a no-op when already absent
    async fn remove(&self) -> Result<()>;

    fn is_writable(&self) -> bool {
        true
    }

    /// Drop cached state; the next call observes the backing store
    fn invalidate(&self) {}
}

/// File capability
#[async_trait]
pub trait FsFile: FsObject {
    async fn read(&self) -> Result<String>;

    async fn read_lines(&self) -> Result<Vec<String>> {
        Ok(self.read().await?.split('\n').map(String::from).collect())
    }

    /// Create or replace the content
    async fn write(&self, text: &str) -> Result<()>;

    /// Join with `\n` and write; an empty list writes nothing
    async fn write_lines(&self, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        self.write(&lines.join("\n")).await
    }

    /// Read content together with a token for `write_with_etag`
    async fn read_with_etag(&self) -> Result<(String, Etag)> {
        self.invalidate();
        // mtime first: a change between the two calls then fails the
        // mtime check and falls through to the hash check
        let modified = self.mtime().await?;
        let text = self.read().await?;
        let etag = Etag::new(modified, &text);
        Ok((text, etag))
    }

    /// Write only if the file is unchanged since `etag` was taken.
    ///
    /// A missing file is always written. Otherwise the modification time
    /// must match, or failing that the content hash. `None` against an
    /// existing file is `FsError::Changed`. Cached state is dropped first so
    /// the check sees the store. The check and the write are not
    /// atomic: a concurrent writer can slip in between.
    async fn write_with_etag(&self, text: &str, etag: Option<&Etag>) -> Result<Etag> {
        self.invalidate();
        if self.exists().await? {
            let unchanged = match etag {
                Some(etag) => {
                    etag.modified == self.mtime().await? || etag.matches(&self.read().await?)
                }
                None => false,
            };
            if !unchanged {
                return Err(FsError::Changed(self.path().to_string()));
            }
        }
        self.write(text).await?;
        Ok(Etag::new(self.mtime().await?, text))
    }

    /// Move to `dest`; relative destinations are taken from the file's folder
    async fn move_to(&self, dest: &str) -> Result<()>;

    /// Copy to `dest`; relative destinations are taken from the file's folder
    async fn copy_to(&self, dest: &str) -> Result<()>;

    async fn rename(&self, dest: &str) -> Result<()> {
        self.move_to(dest).await
    }
}

/// Folder capability
#[async_trait]
pub trait FsFolder: FsObject + Sized {
    type File: FsFile;

    /// Sorted names of the direct children
    async fn list_names(&self) -> Result<Vec<String>>;

    async fn list_files(&self) -> Result<Vec<Self::File>>;

    async fn list_folders(&self) -> Result<Vec<Self>>;

    /// File handle for a path below this folder (not checked for existence)
    fn file(&self, path: &str) -> Result<Self::File>;

    /// Folder handle for a path below this folder (not checked for existence)
    fn folder(&self, path: &str) -> Result<Self>;

    fn subdir(&self, path: &str) -> Result<Self> {
        self.folder(path)
    }
}

/// Compose `rel` under `folder`, refusing results outside it
pub fn child_path(folder: &str, rel: &str) -> Result<String> {
    let joined = path::join(folder, rel);
    if path::is_below(&joined, folder) {
        Ok(joined)
    } else {
        Err(FsError::PathLookup {
            path: joined,
            parent: path::normalize(folder),
        })
    }
}
