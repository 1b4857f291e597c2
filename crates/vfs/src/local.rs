//! Local-disk implementation of the file and folder capabilities
//!
//! Virtual paths map onto a sandbox root directory. Paths whose real
//! location escapes the root (through symlinks) are refused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FsError, Result};
use crate::fs::{child_path, FileStat, FsFile, FsFolder, FsObject};
use crate::path;

/// Sandbox root shared by all handles opened from it
#[derive(Debug)]
struct Root {
    dir: PathBuf,
}

impl Root {
    /// Map a virtual path to a real one, verifying it stays in the sandbox
    fn resolve(&self, vpath: &str) -> Result<PathBuf> {
        let target = self.dir.join(vpath.trim_start_matches('/'));

        // Canonicalize the deepest existing ancestor; the rest cannot be a link
        let mut existing = target.as_path();
        let mut rest = Vec::new();
        while !existing.exists() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    rest.push(name.to_owned());
                    existing = parent;
                }
                _ => break,
            }
        }
        let mut resolved = existing.canonicalize()?;
        resolved.extend(rest.iter().rev());

        if !resolved.starts_with(&self.dir) {
            return Err(FsError::PathLookup {
                path: vpath.to_string(),
                parent: self.dir.display().to_string(),
            });
        }
        Ok(resolved)
    }
}

/// Run blocking filesystem work off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FsError::Io(io::Error::other(e)))?
}

/// Map an io error, turning "not found" into `FsError::NotFound(vpath)`
fn io_err(vpath: &str) -> impl Fn(io::Error) -> FsError + '_ {
    move |e| match e.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(vpath.to_string()),
        _ => FsError::Io(e),
    }
}

fn stat_path(real: &Path, vpath: &str) -> Result<FileStat> {
    let meta = fs::metadata(real).map_err(io_err(vpath))?;
    let modified: DateTime<Utc> = meta.modified()?.into();
    Ok(FileStat {
        is_file: meta.is_file(),
        is_dir: meta.is_dir(),
        size: meta.len(),
        created: meta.created().map_or(modified, Into::into),
        modified,
    })
}

/// Refuse an existing destination or a missing destination folder
fn check_destination(root: &Root, dest: &str) -> Result<PathBuf> {
    let real = root.resolve(dest)?;
    if real.exists() {
        return Err(FsError::Exists(dest.to_string()));
    }
    let folder = path::parent(dest);
    if !root.resolve(&folder)?.is_dir() {
        return Err(FsError::InvalidFolder(folder));
    }
    Ok(real)
}

/// File on local disk
#[derive(Debug, Clone)]
pub struct LocalFile {
    root: Arc<Root>,
    path: String,
}

/// Folder on local disk
#[derive(Debug, Clone)]
pub struct LocalFolder {
    root: Arc<Root>,
    path: String,
}

impl LocalFolder {
    /// Open a sandbox rooted at `dir`, creating it when missing
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            root: Arc::new(Root {
                dir: dir.canonicalize()?,
            }),
            path: "/".to_string(),
        })
    }

    /// Real directory backing this folder
    pub fn real_path(&self) -> Result<PathBuf> {
        self.root.resolve(&self.path)
    }

    async fn entries(&self) -> Result<Vec<(String, bool)>> {
        let real = self.real_path()?;
        let vpath = self.path.clone();
        blocking(move || {
            let mut entries = Vec::new();
            for entry in fs::read_dir(&real).map_err(io_err(&vpath))? {
                let entry = entry?;
                let is_dir = entry.file_type()?.is_dir();
                entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
            }
            entries.sort();
            Ok(entries)
        })
        .await
    }
}

impl LocalFile {
    pub fn real_path(&self) -> Result<PathBuf> {
        self.root.resolve(&self.path)
    }

    fn dest_path(&self, dest: &str) -> String {
        path::join(&path::parent(&self.path), dest)
    }
}

#[async_trait]
impl FsObject for LocalFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn exists(&self) -> Result<bool> {
        let real = self.real_path()?;
        blocking(move || Ok(real.is_file())).await
    }

    async fn stat(&self) -> Result<FileStat> {
        let real = self.real_path()?;
        let vpath = self.path.clone();
        blocking(move || stat_path(&real, &vpath)).await
    }

    async fn touch(&self) -> Result<()> {
        let real = self.real_path()?;
        let vpath = self.path.clone();
        blocking(move || {
            let file = fs::OpenOptions::new()
                .write(true)
                .open(&real)
                .map_err(io_err(&vpath))?;
            file.set_modified(SystemTime::now())?;
            Ok(())
        })
        .await
    }

    async fn remove(&self) -> Result<()> {
        let real = self.real_path()?;
        blocking(move || match fs::remove_file(&real) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        })
        .await
    }
}

#[async_trait]
impl FsFile for LocalFile {
    async fn read(&self) -> Result<String> {
        let real = self.real_path()?;
        let vpath = self.path.clone();
        blocking(move || {
            let data = fs::read(&real).map_err(io_err(&vpath))?;
            String::from_utf8(data).map_err(|_| FsError::Unicode(vpath))
        })
        .await
    }

    /// Write through a temporary sibling and rename over the target.
    /// Missing parent folders are created.
    async fn write(&self, text: &str) -> Result<()> {
        let real = self.real_path()?;
        let data = text.as_bytes().to_vec();
        blocking(move || {
            if let Some(parent) = real.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut tmp = real.clone().into_os_string();
            tmp.push(".drivefs-tmp");
            fs::write(&tmp, data)?;
            fs::rename(&tmp, &real)?;
            Ok(())
        })
        .await
    }

    async fn move_to(&self, dest: &str) -> Result<()> {
        let dest = self.dest_path(dest);
        if dest == self.path {
            return Ok(());
        }
        let src = self.real_path()?;
        let target = check_destination(&self.root, &dest)?;
        let vpath = self.path.clone();
        blocking(move || fs::rename(&src, &target).map_err(io_err(&vpath))).await?;
        tracing::info!(from = %self.path, to = %dest, "Moved");
        Ok(())
    }

    async fn copy_to(&self, dest: &str) -> Result<()> {
        let dest = self.dest_path(dest);
        let src = self.real_path()?;
        let target = check_destination(&self.root, &dest)?;
        let vpath = self.path.clone();
        blocking(move || {
            fs::copy(&src, &target).map_err(io_err(&vpath))?;
            Ok(())
        })
        .await?;
        tracing::info!(from = %self.path, to = %dest, "Copied");
        Ok(())
    }
}

#[async_trait]
impl FsObject for LocalFolder {
    fn path(&self) -> &str {
        &self.path
    }

    async fn exists(&self) -> Result<bool> {
        let real = self.real_path()?;
        blocking(move || Ok(real.is_dir())).await
    }

    async fn stat(&self) -> Result<FileStat> {
        let real = self.real_path()?;
        let vpath = self.path.clone();
        blocking(move || stat_path(&real, &vpath)).await
    }

    async fn touch(&self) -> Result<()> {
        let real = self.real_path()?;
        let vpath = self.path.clone();
        blocking(move || {
            if real.is_file() {
                return Err(FsError::Exists(vpath));
            }
            fs::create_dir_all(&real)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self) -> Result<()> {
        if self.path == "/" {
            return Err(FsError::PathLookup {
                path: "/".to_string(),
                parent: self.root.dir.display().to_string(),
            });
        }
        let real = self.real_path()?;
        blocking(move || match fs::remove_dir_all(&real) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        })
        .await
    }
}

#[async_trait]
impl FsFolder for LocalFolder {
    type File = LocalFile;

    async fn list_names(&self) -> Result<Vec<String>> {
        Ok(self.entries().await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn list_files(&self) -> Result<Vec<LocalFile>> {
        let mut files = Vec::new();
        for (name, is_dir) in self.entries().await? {
            if !is_dir {
                files.push(self.file(&name)?);
            }
        }
        Ok(files)
    }

    async fn list_folders(&self) -> Result<Vec<Self>> {
        let mut folders = Vec::new();
        for (name, is_dir) in self.entries().await? {
            if is_dir {
                folders.push(self.folder(&name)?);
            }
        }
        Ok(folders)
    }

    fn file(&self, rel: &str) -> Result<LocalFile> {
        Ok(LocalFile {
            root: self.root.clone(),
            path: child_path(&self.path, rel)?,
        })
    }

    fn folder(&self, rel: &str) -> Result<Self> {
        Ok(Self {
            root: self.root.clone(),
            path: child_path(&self.path, rel)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_read_remove() {
        let dir = tempdir().unwrap();
        let root = LocalFolder::open(dir.path()).unwrap();
        let file = root.file("notes/page.txt").unwrap();

        assert!(!file.exists().await.unwrap());
        file.write("Hello").await.unwrap();
        assert!(file.exists().await.unwrap());
        assert_eq!(file.read().await.unwrap(), "Hello");
        assert_eq!(file.stat().await.unwrap().size, 5);
        assert_eq!(root.list_names().await.unwrap(), vec!["notes"]);

        file.remove().await.unwrap();
        assert!(!file.exists().await.unwrap());
        assert!(matches!(file.read().await, Err(FsError::NotFound(_))));
        file.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_touch_requires_existing_file() {
        let dir = tempdir().unwrap();
        let root = LocalFolder::open(dir.path()).unwrap();
        let file = root.file("a.txt").unwrap();
        assert!(matches!(file.touch().await, Err(FsError::NotFound(_))));
        file.write("a").await.unwrap();
        file.touch().await.unwrap();
    }

    #[tokio::test]
    async fn test_move_and_copy_checks() {
        let dir = tempdir().unwrap();
        let root = LocalFolder::open(dir.path()).unwrap();
        let a = root.file("a.txt").unwrap();
        a.write("A").await.unwrap();
        root.file("b.txt").unwrap().write("B").await.unwrap();

        assert!(matches!(a.move_to("b.txt").await, Err(FsError::Exists(_))));
        assert!(matches!(a.copy_to("/missing/a.txt").await, Err(FsError::InvalidFolder(_))));

        root.folder("sub").unwrap().touch().await.unwrap();
        a.copy_to("/sub/a.txt").await.unwrap();
        assert!(a.exists().await.unwrap());
        assert_eq!(root.file("sub/a.txt").unwrap().read().await.unwrap(), "A");

        a.move_to("c.txt").await.unwrap();
        assert!(!a.exists().await.unwrap());
        assert_eq!(root.file("c.txt").unwrap().read().await.unwrap(), "A");
    }

    #[tokio::test]
    async fn test_listing_splits_files_and_folders() {
        let dir = tempdir().unwrap();
        let root = LocalFolder::open(dir.path()).unwrap();
        root.file("z.txt").unwrap().write("z").await.unwrap();
        root.folder("d").unwrap().touch().await.unwrap();

        let files: Vec<_> = root.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path(), "/z.txt");
        let folders = root.list_folders().await.unwrap();
        assert_eq!(folders[0].path(), "/d");
        assert!(root.remove().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let outside = tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let root = LocalFolder::open(dir.path()).unwrap();
        let file = root.file("link/secret.txt").unwrap();
        assert!(matches!(file.read().await, Err(FsError::PathLookup { .. })));
    }
}
