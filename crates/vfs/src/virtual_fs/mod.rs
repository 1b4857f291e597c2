//! Remote-backed file and folder objects

mod file;
mod folder;
mod node;

pub use file::{VirtualFile, DEFAULT_TEXT_MIME};
pub use folder::{Child, VirtualFolder};
