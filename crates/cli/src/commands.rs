//! Command handlers, shared by the remote and local backends

use std::io::Write;

use anyhow::{bail, Context, Result};
use drivefs_vfs::{FsFile, FsFolder, FsObject, LocalFile, LocalFolder, VirtualFile, VirtualFolder};

use crate::Command;

/// A folder tree the CLI can operate on
pub trait Store: FsFolder {
    /// Folder handle for any path in the tree, the root included
    fn open_folder(&self, path: &str) -> Result<Self>;

    /// File handle for an upload of `mime` content
    fn upload(&self, path: &str, mime: &str) -> Result<Self::File>;
}

impl Store for VirtualFolder {
    fn open_folder(&self, path: &str) -> Result<Self> {
        Ok(Self::new(self.drive().clone(), path))
    }

    fn upload(&self, path: &str, mime: &str) -> Result<VirtualFile> {
        Ok(self.file(path)?.with_mime_type(mime))
    }
}

impl Store for LocalFolder {
    fn open_folder(&self, path: &str) -> Result<Self> {
        if is_root(path) {
            return Ok(self.clone());
        }
        Ok(self.folder(path)?)
    }

    fn upload(&self, path: &str, _mime: &str) -> Result<LocalFile> {
        Ok(self.file(path)?)
    }
}

enum Kind {
    File,
    Folder,
    Missing,
}

async fn kind_of<S: Store>(store: &S, path: &str) -> Result<Kind> {
    if is_root(path) {
        return Ok(Kind::Folder);
    }
    if store.folder(path)?.exists().await? {
        Ok(Kind::Folder)
    } else if store.file(path)?.exists().await? {
        Ok(Kind::File)
    } else {
        Ok(Kind::Missing)
    }
}

fn is_root(path: &str) -> bool {
    path.trim_matches('/').is_empty()
}

/// Mime type for an upload, from the file extension
pub fn guess_mime(path: &str, fallback: &str) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(fallback)
        .to_string()
}

/// Run one command against `store`, writing results to `out`
pub async fn execute<S, W>(store: &S, command: Command, default_mime: &str, out: &mut W) -> Result<()>
where
    S: Store,
    W: Write,
{
    match command {
        Command::Exists { path } => {
            let found = !matches!(kind_of(store, &path).await?, Kind::Missing);
            writeln!(out, "{found}")?;
        }
        Command::Cat { path } => match store.file(&path)?.read().await {
            Ok(text) => write!(out, "{text}")?,
            Err(e) if e.is_not_found() => bail!("Not found: {path}"),
            Err(e) => return Err(e.into()),
        },
        Command::Put { path, from } => {
            let text = match from {
                Some(source) => std::fs::read_to_string(&source)
                    .with_context(|| format!("Failed to read {}", source.display()))?,
                None => read_stdin()?,
            };
            let mime = guess_mime(&path, default_mime);
            store.upload(&path, &mime)?.write(&text).await?;
            tracing::debug!(%path, %mime, bytes = text.len(), "Uploaded");
        }
        Command::Ls { path } => {
            let folder = store.open_folder(&path)?;
            let mut entries: Vec<String> = folder
                .list_folders()
                .await?
                .iter()
                .map(|f| format!("{}/", f.basename()))
                .collect();
            entries.extend(folder.list_files().await?.iter().map(|f| f.basename()));
            entries.sort();
            for entry in entries {
                writeln!(out, "{entry}")?;
            }
        }
        Command::Mkdir { path, parents } => {
            if parents {
                let mut current = String::new();
                for segment in path.split('/').filter(|s| !s.is_empty()) {
                    current = format!("{current}/{segment}");
                    store.folder(&current)?.touch().await?;
                }
            } else {
                store.folder(&path)?.touch().await?;
            }
        }
        Command::Touch { path } => {
            let file = store.file(&path)?;
            if file.exists().await? {
                file.touch().await?;
            } else {
                store.upload(&path, &guess_mime(&path, default_mime))?.write("").await?;
            }
        }
        Command::Rm { path, recursive } => match kind_of(store, &path).await? {
            Kind::Folder if recursive => store.folder(&path)?.remove().await?,
            Kind::Folder => bail!("{path} is a folder (use -r)"),
            Kind::File => store.file(&path)?.remove().await?,
            Kind::Missing => bail!("Not found: {path}"),
        },
        Command::Mv { from, to } => store.file(&from)?.move_to(&to).await?,
        Command::Cp { from, to } => store.file(&from)?.copy_to(&to).await?,
        Command::Stat { path } => {
            let stat = match kind_of(store, &path).await? {
                Kind::Folder => store.open_folder(&path)?.stat().await?,
                Kind::File => store.file(&path)?.stat().await?,
                Kind::Missing => bail!("Not found: {path}"),
            };
            let kind = if stat.is_dir { "folder" } else { "file" };
            writeln!(out, "kind: {kind}")?;
            writeln!(out, "size: {}", stat.size)?;
            writeln!(out, "created: {}", stat.created.to_rfc3339())?;
            writeln!(out, "modified: {}", stat.modified.to_rfc3339())?;
        }
        Command::Login { .. } => bail!("login needs the remote backend"),
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut text)
        .context("Failed to read stdin")?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use drivefs_vfs::{MemoryDrive, SharedDrive};
    use tempfile::tempdir;

    use super::*;

    async fn run<S: Store>(store: &S, command: Command) -> Result<String> {
        let mut out = Vec::new();
        execute(store, command, "text/plain", &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn remote() -> VirtualFolder {
        let drive: SharedDrive = Arc::new(MemoryDrive::with_files(vec![
            ("/notes/todo.txt", "milk"),
            ("/notes/archive/", ""),
        ]));
        VirtualFolder::root(drive)
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("/a/page.html", "text/plain"), "text/html");
        assert_eq!(guess_mime("/a/noext", "text/plain"), "text/plain");
    }

    #[tokio::test]
    async fn test_remote_listing_and_cat() {
        let store = remote();
        let ls = run(&store, Command::Ls { path: "/notes".into() }).await.unwrap();
        assert_eq!(ls, "archive/\ntodo.txt\n");
        let root = run(&store, Command::Ls { path: "/".into() }).await.unwrap();
        assert_eq!(root, "notes/\n");

        let cat = run(&store, Command::Cat { path: "/notes/todo.txt".into() }).await.unwrap();
        assert_eq!(cat, "milk");
        let exists = run(&store, Command::Exists { path: "/notes/nope".into() }).await.unwrap();
        assert_eq!(exists, "false\n");
        let missing = run(&store, Command::Cat { path: "/notes/nope".into() }).await;
        assert_eq!(missing.unwrap_err().to_string(), "Not found: /notes/nope");
    }

    #[tokio::test]
    async fn test_remote_put_mv_cp_rm() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("page.html");
        std::fs::write(&source, "<p>hi</p>").unwrap();

        let store = remote();
        run(&store, Command::Put { path: "/notes/page.html".into(), from: Some(source) })
            .await
            .unwrap();
        let page = store.file("/notes/page.html").unwrap();
        assert_eq!(page.read().await.unwrap(), "<p>hi</p>");
        assert_eq!(page.descriptor().await.unwrap().unwrap().mime_type, "text/html");

        run(&store, Command::Cp { from: "/notes/page.html".into(), to: "archive/page.html".into() })
            .await
            .unwrap();
        run(&store, Command::Mv { from: "/notes/todo.txt".into(), to: "done.txt".into() })
            .await
            .unwrap();
        let ls = run(&store, Command::Ls { path: "/notes".into() }).await.unwrap();
        assert_eq!(ls, "archive/\ndone.txt\npage.html\n");

        assert!(run(&store, Command::Rm { path: "/notes/archive".into(), recursive: false })
            .await
            .is_err());
        run(&store, Command::Rm { path: "/notes/archive".into(), recursive: true })
            .await
            .unwrap();
        assert!(run(&store, Command::Rm { path: "/notes/archive".into(), recursive: true })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_local_mkdir_touch_stat() {
        let dir = tempdir().unwrap();
        let store = LocalFolder::open(dir.path()).unwrap();
        run(&store, Command::Mkdir { path: "/a/b".into(), parents: true }).await.unwrap();
        run(&store, Command::Touch { path: "/a/b/empty.txt".into() }).await.unwrap();
        run(&store, Command::Touch { path: "/a/b/empty.txt".into() }).await.unwrap();

        let stat = run(&store, Command::Stat { path: "/a/b/empty.txt".into() }).await.unwrap();
        assert!(stat.starts_with("kind: file\nsize: 0\n"));
        let stat = run(&store, Command::Stat { path: "/a".into() }).await.unwrap();
        assert!(stat.starts_with("kind: folder\n"));
        assert!(run(&store, Command::Stat { path: "/zzz".into() }).await.is_err());
    }

    #[tokio::test]
    async fn test_remote_mkdir_needs_parents_flag() {
        let store = remote();
        assert!(run(&store, Command::Mkdir { path: "/x/y".into(), parents: false })
            .await
            .is_err());
        run(&store, Command::Mkdir { path: "/x/y".into(), parents: true }).await.unwrap();
        let exists = run(&store, Command::Exists { path: "/x/y".into() }).await.unwrap();
        assert_eq!(exists, "true\n");
    }
}
