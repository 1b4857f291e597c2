//! In-memory drive for testing
//!
//! Behaves like the remote service closely enough for the virtual file
//! objects: opaque ids, a `root` folder, parent links, trashed flags and
//! strictly increasing modification times.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::query::Query;
use super::types::{Descriptor, Labels, Media, Metadata, ParentRef, FOLDER_MIME, ROOT_ID};
use super::DriveApi;
use crate::path;

const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Clone, Debug)]
struct Entry {
    item: Descriptor,
    content: Vec<u8>,
}

struct State {
    entries: HashMap<String, Entry>,
    /// Insertion order, so listings are stable
    order: Vec<String>,
    next_id: u64,
    last_tick: DateTime<Utc>,
}

impl State {
    /// Next modification time, strictly after the previous one
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.last_tick = if now > self.last_tick {
            now
        } else {
            self.last_tick + Duration::milliseconds(1)
        };
        self.last_tick
    }

    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem{:06}", self.next_id)
    }

    fn get(&self, id: &str) -> Result<&Entry> {
        self.entries
            .get(id)
            .ok_or_else(|| anyhow!("File not found: {id}"))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Entry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| anyhow!("File not found: {id}"))
    }

    fn check_parents(&self, parents: &[ParentRef]) -> Result<()> {
        for parent in parents {
            match self.entries.get(&parent.id) {
                Some(entry) if entry.item.is_folder() => {}
                Some(_) => bail!("Parent is not a folder: {}", parent.id),
                None => bail!("Parent not found: {}", parent.id),
            }
        }
        Ok(())
    }

    fn add(&mut self, item: Descriptor, content: Vec<u8>) -> Descriptor {
        self.order.push(item.id.clone());
        self.entries.insert(
            item.id.clone(),
            Entry {
                item: item.clone(),
                content,
            },
        );
        item
    }

    fn new_item(
        &mut self,
        title: String,
        mime_type: String,
        parents: Vec<ParentRef>,
        size: usize,
    ) -> Descriptor {
        let now = self.tick();
        Descriptor {
            id: self.fresh_id(),
            title,
            mime_type,
            parents,
            labels: Labels::default(),
            created_date: now,
            modified_date: now,
            md5_checksum: None,
            file_size: Some(size.to_string()),
        }
    }

    /// Remove an entry and everything below it
    fn remove_tree(&mut self, id: &str) {
        let children: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.item.parents.iter().any(|p| p.id == id))
            .map(|e| e.item.id.clone())
            .collect();
        for child in children {
            self.remove_tree(&child);
        }
        self.entries.remove(id);
        self.order.retain(|o| o != id);
    }

    /// Find a non-trashed child by title, creating a folder when missing
    fn ensure_folder(&mut self, parent: &str, title: &str) -> String {
        let query = Query::children_of(parent).titled(title).folders_only().not_trashed();
        if let Some(id) = self
            .order
            .iter()
            .find(|id| self.entries.get(*id).is_some_and(|e| query.matches(&e.item)))
        {
            return id.clone();
        }
        let item = self.new_item(
            title.to_string(),
            FOLDER_MIME.to_string(),
            vec![ParentRef::new(parent)],
            0,
        );
        self.add(item, Vec::new()).id
    }
}

/// In-memory drive backend
///
/// All data is lost when the drive is dropped.
pub struct MemoryDrive {
    state: RwLock<State>,
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDrive {
    /// Create a drive holding only the root folder
    pub fn new() -> Self {
        let mut state = State {
            entries: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            last_tick: DateTime::<Utc>::MIN_UTC,
        };
        let now = state.tick();
        let root = Descriptor {
            id: ROOT_ID.to_string(),
            title: "My Drive".to_string(),
            mime_type: FOLDER_MIME.to_string(),
            parents: Vec::new(),
            labels: Labels::default(),
            created_date: now,
            modified_date: now,
            md5_checksum: None,
            file_size: None,
        };
        state.add(root, Vec::new());
        Self {
            state: RwLock::new(state),
        }
    }

    /// Create with initial text files; missing folders are created.
    /// A path ending in `/` creates just the folder.
    pub fn with_files(files: Vec<(&str, &str)>) -> Self {
        let drive = Self::new();
        {
            let mut state = drive.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            for (file_path, content) in files {
                let is_dir = file_path.ends_with('/');
                let parts = path::segments(file_path);
                let Some((last, folders)) = parts.split_last() else {
                    continue;
                };
                let mut parent = ROOT_ID.to_string();
                for folder in folders {
                    parent = state.ensure_folder(&parent, folder);
                }
                if is_dir {
                    state.ensure_folder(&parent, last);
                    continue;
                }
                let item = state.new_item(
                    last.clone(),
                    "text/plain".to_string(),
                    vec![ParentRef::new(parent)],
                    content.len(),
                );
                state.add(item, content.as_bytes().to_vec());
            }
        }
        drive
    }

    /// Move an object to the trash
    pub fn trash(&self, id: &str) -> Result<Descriptor> {
        let mut state = self.state.write().map_err(|_| anyhow!("Lock poisoned"))?;
        let now = state.tick();
        let entry = state.get_mut(id)?;
        entry.item.labels.trashed = true;
        entry.item.modified_date = now;
        Ok(entry.item.clone())
    }

    /// Number of stored objects, root included
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DriveApi for MemoryDrive {
    async fn list(&self, query: &Query) -> Result<Vec<Descriptor>> {
        let state = self.state.read().map_err(|_| anyhow!("Lock poisoned"))?;
        let cap = query.max_results.map_or(usize::MAX, |n| n as usize);
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| query.matches(&e.item))
            .take(cap)
            .map(|e| e.item.clone())
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Descriptor> {
        let state = self.state.read().map_err(|_| anyhow!("Lock poisoned"))?;
        Ok(state.get(id)?.item.clone())
    }

    async fn get_media(&self, id: &str) -> Result<Vec<u8>> {
        let state = self.state.read().map_err(|_| anyhow!("Lock poisoned"))?;
        let entry = state.get(id)?;
        if entry.item.is_folder() {
            bail!("Cannot download folder: {id}");
        }
        Ok(entry.content.clone())
    }

    async fn insert(&self, metadata: &Metadata, media: Option<Media>) -> Result<Descriptor> {
        let mut state = self.state.write().map_err(|_| anyhow!("Lock poisoned"))?;
        let parents = metadata
            .parents
            .clone()
            .unwrap_or_else(|| vec![ParentRef::new(ROOT_ID)]);
        state.check_parents(&parents)?;

        let mime_type = metadata
            .mime_type
            .clone()
            .or_else(|| media.as_ref().map(|m| m.mime_type.clone()))
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        let content = media.map(|m| m.data).unwrap_or_default();
        let title = metadata.title.clone().unwrap_or_else(|| "Untitled".to_string());
        let item = state.new_item(title, mime_type, parents, content.len());
        Ok(state.add(item, content))
    }

    async fn update(
        &self,
        id: &str,
        metadata: &Metadata,
        media: Option<Media>,
    ) -> Result<Descriptor> {
        let mut state = self.state.write().map_err(|_| anyhow!("Lock poisoned"))?;
        if let Some(parents) = &metadata.parents {
            state.check_parents(parents)?;
        }
        let now = state.tick();
        let entry = state.get_mut(id)?;
        if let Some(title) = &metadata.title {
            entry.item.title.clone_from(title);
        }
        if let Some(parents) = &metadata.parents {
            entry.item.parents.clone_from(parents);
        }
        if let Some(mime) = &metadata.mime_type {
            entry.item.mime_type.clone_from(mime);
        }
        if let Some(media) = media {
            if metadata.mime_type.is_none() {
                entry.item.mime_type = media.mime_type;
            }
            entry.item.file_size = Some(media.data.len().to_string());
            entry.content = media.data;
        }
        entry.item.modified_date = now;
        Ok(entry.item.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().map_err(|_| anyhow!("Lock poisoned"))?;
        if id == ROOT_ID {
            bail!("Cannot delete the root folder");
        }
        state.get(id)?;
        state.remove_tree(id);
        Ok(())
    }

    async fn copy(&self, id: &str, metadata: &Metadata) -> Result<Descriptor> {
        let mut state = self.state.write().map_err(|_| anyhow!("Lock poisoned"))?;
        let source = state.get(id)?.clone();
        if source.item.is_folder() {
            bail!("Cannot copy folder: {id}");
        }
        let parents = metadata
            .parents
            .clone()
            .unwrap_or_else(|| source.item.parents.clone());
        state.check_parents(&parents)?;

        let title = metadata
            .title
            .clone()
            .unwrap_or_else(|| format!("Copy of {}", source.item.title));
        let mime_type = metadata
            .mime_type
            .clone()
            .unwrap_or_else(|| source.item.mime_type.clone());
        let item = state.new_item(title, mime_type, parents, source.content.len());
        Ok(state.add(item, source.content))
    }

    async fn touch(&self, id: &str) -> Result<Descriptor> {
        let mut state = self.state.write().map_err(|_| anyhow!("Lock poisoned"))?;
        let now = state.tick();
        let entry = state.get_mut(id)?;
        entry.item.modified_date = now;
        Ok(entry.item.clone())
    }
}
