//! Modrinth API v2 client.

use crate::{ApiConfig, HttpClient, RemoteError};
use chrono::{DateTime, Utc};
use sculk_schema::{ModrinthEnvSupport, ModrinthLoader, ProjectKind, SchemaError, Side};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub project_type: String,
    pub client_side: ModrinthEnvSupport,
    pub server_side: ModrinthEnvSupport,
}

impl Project {
    pub fn side(&self) -> Side {
        ModrinthEnvSupport::to_side(self.client_side, self.server_side)
    }

    pub fn kind(&self) -> Result<ProjectKind, SchemaError> {
        ProjectKind::from_modrinth_type(&self.project_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub version_number: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<ModrinthLoader>,
    pub files: Vec<VersionFile>,
    pub date_published: DateTime<Utc>,
}

impl Version {
    /// The file flagged `primary`, or the first one when none is.
    pub fn primary_file(&self) -> Option<&VersionFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }

    pub fn supports(&self, loaders: &[ModrinthLoader], game_version: &str) -> bool {
        self.loaders.iter().any(|l| loaders.contains(l))
            && self.game_versions.iter().any(|v| v == game_version)
    }
}

/// The most recently published version, if any.
pub fn newest(versions: Vec<Version>) -> Option<Version> {
    versions.into_iter().max_by_key(|v| v.date_published)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dependency {
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Required,
    Optional,
    Incompatible,
    Embedded,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionFile {
    pub hashes: VersionFileHashes,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionFileHashes {
    pub sha1: String,
    pub sha512: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub project_id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub project_type: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

/// Read-only Modrinth operations used by pack commands.
pub trait ModrinthApi: Send + Sync {
    /// Look a project up by id or slug.
    fn project(&self, id_or_slug: &str) -> Result<Option<Project>, RemoteError>;

    /// Versions of a project compatible with any of `loaders` and `game_version`.
    fn project_versions(
        &self,
        project_id: &str,
        loaders: &[ModrinthLoader],
        game_version: &str,
    ) -> Result<Vec<Version>, RemoteError>;

    fn version(&self, version_id: &str) -> Result<Option<Version>, RemoteError>;

    fn version_by_hash(
        &self,
        hash: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Option<Version>, RemoteError>;

    fn search(
        &self,
        query: &str,
        loader: ModrinthLoader,
        game_version: &str,
    ) -> Result<Vec<SearchHit>, RemoteError>;
}

pub struct ModrinthClient {
    http: HttpClient,
    base: String,
}

impl ModrinthClient {
    pub fn new(http: HttpClient, config: &ApiConfig) -> Self {
        Self {
            http,
            base: format!("{}/v2", config.modrinth_url.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, RemoteError> {
        let raw = format!("{}/{path}", self.base);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        }
        .map_err(|e| RemoteError::Config(format!("invalid Modrinth URL {raw}: {e}")))?;
        Ok(url.into())
    }
}

fn json_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|s| format!("\"{}\"", s.as_ref()))
        .collect();
    format!("[{}]", quoted.join(","))
}

impl ModrinthApi for ModrinthClient {
    fn project(&self, id_or_slug: &str) -> Result<Option<Project>, RemoteError> {
        let url = self.url(&format!("project/{id_or_slug}"), &[])?;
        self.http.get_json_opt(&url, &[])
    }

    fn project_versions(
        &self,
        project_id: &str,
        loaders: &[ModrinthLoader],
        game_version: &str,
    ) -> Result<Vec<Version>, RemoteError> {
        let loader_names: Vec<&str> = loaders.iter().map(|l| l.as_str()).collect();
        let loaders = json_list(&loader_names);
        let game_versions = json_list(&[game_version]);
        let mut params = Vec::with_capacity(2);
        // Resource packs and shaders are not tied to a mod loader.
        if !loader_names.is_empty() {
            params.push(("loaders", loaders.as_str()));
        }
        params.push(("game_versions", game_versions.as_str()));
        let url = self.url(&format!("project/{project_id}/version"), &params)?;
        Ok(self.http.get_json_opt(&url, &[])?.unwrap_or_default())
    }

    fn version(&self, version_id: &str) -> Result<Option<Version>, RemoteError> {
        let url = self.url(&format!("version/{version_id}"), &[])?;
        self.http.get_json_opt(&url, &[])
    }

    fn version_by_hash(
        &self,
        hash: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Option<Version>, RemoteError> {
        let url = self.url(
            &format!("version_file/{hash}"),
            &[("algorithm", algorithm.as_str())],
        )?;
        self.http.get_json_opt(&url, &[])
    }

    fn search(
        &self,
        query: &str,
        loader: ModrinthLoader,
        game_version: &str,
    ) -> Result<Vec<SearchHit>, RemoteError> {
        let facets = format!(
            "[[\"categories:{}\"],[\"versions:{game_version}\"]]",
            loader.as_str()
        );
        let url = self.url("search", &[("query", query), ("facets", facets.as_str())])?;
        let response: SearchResponse = self.http.get_json(&url, &[])?;
        Ok(response.hits)
    }
}
