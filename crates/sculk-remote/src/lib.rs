//! Network collaborators for Sculk packs.
//!
//! This crate provides a retrying HTTP client used for artifact downloads,
//! thin clients for the Modrinth and Curseforge APIs behind the [`ModrinthApi`]
//! and [`CurseforgeApi`] traits, and the user-level API configuration file.

pub mod config;
pub mod curseforge;
pub mod http;
pub mod modrinth;

pub use config::ApiConfig;
pub use curseforge::{CurseforgeApi, CurseforgeClient};
pub use http::HttpClient;
pub use modrinth::{ModrinthApi, ModrinthClient};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    NetworkExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("API config error: {0}")]
    Config(String),
}

/// Fetches raw artifact bytes by URL.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str) -> Result<Vec<u8>, RemoteError>;
}
