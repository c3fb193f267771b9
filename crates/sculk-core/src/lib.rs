//! Pack operations for Sculk.
//!
//! This crate ties the pack model from `sculk-store` to the remote clients in
//! `sculk-remote`. Every operation takes an explicit [`Context`] holding the
//! API clients, the artifact downloader and the user-interaction callbacks, so
//! the same code runs against live services in the CLI and against in-process
//! fakes in tests.

pub mod add;
pub mod archive;
pub mod artifact;
pub mod context;
pub mod export;
pub mod formats;
pub mod import;
pub mod init;
pub mod install;
pub mod link;
pub mod list;
pub mod migrate;
pub mod remove;
pub mod session;
pub mod update;

pub use add::{
    add_curseforge, add_modrinth, add_url, AddOptions, AddReport, AddedManifest, UrlAddition,
};
pub use context::{Context, Interaction, NonInteractive, Services};
pub use export::{export_curseforge, export_modrinth, export_multimc, ExportReport};
pub use import::{import_curseforge, import_modrinth, ImportReport};
pub use init::{init_pack, InitOptions};
pub use install::{install_pack, InstallReport, PackSource};
pub use link::{link_pack, LinkReport, LinkTarget};
pub use list::{add_list, ListEntry, ListReport};
pub use migrate::migrate;
pub use remove::{remove_path, RemoveReport};
pub use session::PackSession;
pub use update::{update_pack, UpdateReport, UpdatedManifest};

pub use sculk_store::{refresh_pack, RefreshChange, RefreshReport};

use sculk_remote::RemoteError;
use sculk_schema::SchemaError;
use sculk_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("could not resolve dependency {0}")]
    UnresolvedDependency(String),
    #[error("no project matching '{0}'")]
    NotFound(String),
    #[error("no version of '{0}' is compatible with this pack")]
    NoCompatibleVersion(String),
    #[error("{0}")]
    Conflict(String),
    #[error("'{0}' does not allow third-party distribution")]
    NotDistributable(String),
    #[error("directory '{}' is not empty", .0.display())]
    NotEmpty(PathBuf),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cancelled")]
    Cancelled,
}

impl CoreError {
    /// Errors caused by a missing, malformed or wrongly versioned manifest.
    pub fn is_manifest_error(&self) -> bool {
        match self {
            CoreError::Store(e) => matches!(
                e,
                StoreError::MissingManifest(_)
                    | StoreError::MissingFileManifest(_)
                    | StoreError::StaleFormatVersion { .. }
                    | StoreError::NewerFormatVersion { .. }
                    | StoreError::Malformed { .. }
                    | StoreError::InvalidPath(_)
                    | StoreError::ReservedPath(_)
                    | StoreError::Serialization(_)
                    | StoreError::Schema(_)
            ),
            CoreError::Schema(_) | CoreError::Serialization(_) => true,
            _ => false,
        }
    }

    /// Errors where content on disk or on the wire does not match its hash.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            CoreError::Store(
                StoreError::HashMismatch { .. }
                    | StoreError::OutOfSync(_)
                    | StoreError::MissingFile(_)
            )
        )
    }
}
