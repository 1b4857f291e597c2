use std::fs::{self, File};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use drivefs_vfs::{FsError, FsFile, FsFolder, FsObject, LocalFolder};
use tempfile::tempdir;

fn backdate(path: &std::path::Path, secs: u64) -> Result<()> {
    let file = File::options().write(true).open(path)?;
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))?;
    Ok(())
}

#[tokio::test]
async fn external_edit_is_detected() -> Result<()> {
    let dir = tempdir()?;
    let root = LocalFolder::open(dir.path())?;
    let file = root.file("notes/today.txt")?;
    file.write("draft").await?;
    backdate(&file.real_path()?, 1_000_000)?;

    let (text, etag) = file.read_with_etag().await?;
    assert_eq!(text, "draft");

    fs::write(file.real_path()?, "edited elsewhere")?;
    backdate(&file.real_path()?, 2_000_000)?;

    let result = file.write_with_etag("mine", Some(&etag)).await;
    assert!(matches!(result, Err(FsError::Changed(_))));
    assert_eq!(file.read().await?, "edited elsewhere");
    Ok(())
}

#[tokio::test]
async fn touched_file_still_accepts_matching_content() -> Result<()> {
    let dir = tempdir()?;
    let root = LocalFolder::open(dir.path())?;
    let file = root.file("page.txt")?;
    file.write("same").await?;
    backdate(&file.real_path()?, 1_000_000)?;

    let (_, etag) = file.read_with_etag().await?;
    file.touch().await?;
    assert_ne!(file.mtime().await?, etag.modified);

    let renewed = file.write_with_etag("next", Some(&etag)).await?;
    assert!(renewed.matches("next"));
    assert_eq!(file.read().await?, "next");
    Ok(())
}

#[tokio::test]
async fn missing_file_needs_no_etag() -> Result<()> {
    let dir = tempdir()?;
    let root = LocalFolder::open(dir.path())?;
    let file = root.file("new.txt")?;
    file.write_with_etag("hello", None).await?;
    assert!(matches!(
        file.write_with_etag("again", None).await,
        Err(FsError::Changed(_))
    ));
    Ok(())
}
