//! Pack manifest model, format versions, and ecosystem vocabulary for Sculk.
//!
//! This crate defines the schema layer: the root `PackManifest` with its
//! `ManifestRef`/`FileRef` entries, per-artifact `FileManifest`s, the
//! `FormatVersion` ordering used by the migrator chain, the `Side`/`ModLoader`
//! enums and their mappings onto Modrinth, Curseforge and MultiMC vocabulary,
//! and the content digests used as identity and integrity checks.

pub mod compat;
pub mod digest;
pub mod manifest;
pub mod types;
pub mod version;

pub use compat::{
    CurseforgeModLoader, CurseforgeSide, ModrinthEnvSupport, ModrinthLoader, ProjectKind,
};
pub use digest::{murmur2, sha1_hex, sha256_hex, sha512_hex};
pub use manifest::{
    encode_json, CurseforgeSource, FileHashes, FileManifest, FileRef, LoaderSection,
    ManifestRef, ModrinthSource, PackManifest, Sources, UrlSource,
};
pub use types::{ModLoader, Side};
pub use version::FormatVersion;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid format version '{0}', expected '<major>.<minor>'")]
    InvalidFormatVersion(String),
    #[error("unknown side '{0}', expected both, client_only or server_only")]
    UnknownSide(String),
    #[error("unknown mod loader '{0}'")]
    UnknownLoader(String),
    #[error("unsupported Curseforge class id {0}")]
    UnsupportedClass(u32),
    #[error("unsupported Modrinth project type '{0}'")]
    UnsupportedProjectType(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
