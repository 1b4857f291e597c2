//! Virtual filesystem layer over a Drive-style remote document store
//!
//! `VirtualFile` and `VirtualFolder` give remote objects the same file and
//! folder capabilities (`FsFile`, `FsFolder`) as `LocalFile` and
//! `LocalFolder` give the local disk. Paths are resolved against the remote
//! namespace by `Resolver`, one parent-scoped query per segment.

pub mod auth;
pub mod drive;
pub mod error;
pub mod etag;
pub mod fs;
pub mod local;
pub mod path;
pub mod resolver;
pub mod virtual_fs;

pub use auth::{Authenticator, OAuthClient, StaticToken, TokenCache, TokenSource};
pub use drive::{
    Descriptor, DriveApi, HttpDriveClient, HttpDriveConfig, MemoryDrive, SharedDrive,
};
pub use error::{FsError, Result};
pub use etag::Etag;
pub use fs::{FileStat, FsFile, FsFolder, FsObject};
pub use local::{LocalFile, LocalFolder};
pub use resolver::Resolver;
pub use virtual_fs::{Child, VirtualFile, VirtualFolder};
