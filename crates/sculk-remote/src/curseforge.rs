//! Curseforge API client (official API or the curse.tools proxy).

use crate::{ApiConfig, HttpClient, RemoteError};
use chrono::{DateTime, Utc};
use sculk_schema::{CurseforgeModLoader, CurseforgeSide, ProjectKind, SchemaError, Side};
use serde::{Deserialize, Serialize};
use url::Url;

pub const MINECRAFT_GAME_ID: u32 = 432;
const HEADER_API_KEY: &str = "x-api-key";

/// Hash algorithm id Curseforge uses for SHA-1 in `hashes[].algo`.
const HASH_ALGO_SHA1: u32 = 1;

#[derive(Debug, Deserialize)]
struct Response<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mod {
    pub id: u32,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub class_id: Option<u32>,
    #[serde(default)]
    pub allow_mod_distribution: Option<bool>,
    #[serde(default)]
    pub main_file_id: u32,
}

impl Mod {
    /// Mods without a class are treated as plain mods.
    pub fn kind(&self) -> Result<ProjectKind, SchemaError> {
        self.class_id
            .map_or(Ok(ProjectKind::Mod), ProjectKind::from_curseforge_class)
    }

    /// Curseforge only withholds download URLs when the author explicitly opts out.
    pub fn distributable(&self) -> bool {
        self.allow_mod_distribution != Some(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: u32,
    pub mod_id: u32,
    #[serde(default)]
    pub display_name: String,
    pub file_name: String,
    pub file_length: u64,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<FileDependency>,
    pub file_date: DateTime<Utc>,
    #[serde(default)]
    pub hashes: Vec<FileHash>,
    #[serde(default)]
    pub file_fingerprint: Option<u32>,
}

impl File {
    pub fn side(&self) -> Side {
        CurseforgeSide::from_game_versions(&self.game_versions).to_side()
    }

    pub fn sha1(&self) -> Option<&str> {
        self.hashes
            .iter()
            .find(|h| h.algo == HASH_ALGO_SHA1)
            .map(|h| h.value.as_str())
    }

    pub fn required_dependencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.dependencies
            .iter()
            .filter(|d| d.relation_type == RelationType::RequiredDependency as u8)
            .map(|d| d.mod_id)
    }

    pub fn optional_dependencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.dependencies
            .iter()
            .filter(|d| d.relation_type == RelationType::OptionalDependency as u8)
            .map(|d| d.mod_id)
    }
}

/// The most recently published file, if any.
pub fn newest(files: Vec<File>) -> Option<File> {
    files.into_iter().max_by_key(|f| f.file_date)
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileHash {
    pub value: String,
    pub algo: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDependency {
    pub mod_id: u32,
    pub relation_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelationType {
    EmbeddedLibrary = 1,
    OptionalDependency = 2,
    RequiredDependency = 3,
    Tool = 4,
    Incompatible = 5,
    Include = 6,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintMatch {
    pub id: u32,
    pub file: File,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintMatches {
    #[serde(default)]
    exact_matches: Vec<FingerprintMatch>,
}

#[derive(Serialize)]
struct FingerprintRequest<'a> {
    fingerprints: &'a [u32],
}

/// Read-only Curseforge operations used by pack commands.
pub trait CurseforgeApi: Send + Sync {
    fn mod_by_id(&self, mod_id: u32) -> Result<Option<Mod>, RemoteError>;

    /// Exact slug lookup within Minecraft projects of any supported class.
    fn mod_by_slug(&self, slug: &str) -> Result<Option<Mod>, RemoteError>;

    fn search(&self, query: &str, game_version: &str) -> Result<Vec<Mod>, RemoteError>;

    fn mod_files(
        &self,
        mod_id: u32,
        game_version: &str,
        loader: Option<CurseforgeModLoader>,
    ) -> Result<Vec<File>, RemoteError>;

    fn file(&self, mod_id: u32, file_id: u32) -> Result<Option<File>, RemoteError>;

    /// Files whose Murmur2 fingerprint exactly matches one of `fingerprints`.
    fn fingerprint_matches(&self, fingerprints: &[u32])
        -> Result<Vec<FingerprintMatch>, RemoteError>;
}

pub struct CurseforgeClient {
    http: HttpClient,
    base: String,
    api_key: Option<String>,
}

impl CurseforgeClient {
    pub fn new(http: HttpClient, config: &ApiConfig) -> Self {
        Self {
            http,
            base: format!(
                "{}{}",
                config.curseforge_url.trim_end_matches('/'),
                config.curseforge_base_path.trim_end_matches('/')
            ),
            api_key: config.curseforge_api_key.clone(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, RemoteError> {
        let raw = format!("{}/{path}", self.base);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        }
        .map_err(|e| RemoteError::Config(format!("invalid Curseforge URL {raw}: {e}")))?;
        Ok(url.into())
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        self.api_key
            .as_deref()
            .map(|key| vec![(HEADER_API_KEY, key)])
            .unwrap_or_default()
    }

    fn get_data<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>, RemoteError> {
        let response: Option<Response<T>> = self.http.get_json_opt(url, &self.headers())?;
        Ok(response.map(|r| r.data))
    }
}

impl CurseforgeApi for CurseforgeClient {
    fn mod_by_id(&self, mod_id: u32) -> Result<Option<Mod>, RemoteError> {
        self.get_data(&self.url(&format!("mods/{mod_id}"), &[])?)
    }

    fn mod_by_slug(&self, slug: &str) -> Result<Option<Mod>, RemoteError> {
        let game_id = MINECRAFT_GAME_ID.to_string();
        let url = self.url(
            "mods/search",
            &[("gameId", game_id.as_str()), ("slug", slug)],
        )?;
        let mods: Vec<Mod> = self.get_data(&url)?.unwrap_or_default();
        Ok(mods
            .into_iter()
            .find(|m| m.slug == slug && m.kind().is_ok()))
    }

    fn search(&self, query: &str, game_version: &str) -> Result<Vec<Mod>, RemoteError> {
        let game_id = MINECRAFT_GAME_ID.to_string();
        let url = self.url(
            "mods/search",
            &[
                ("gameId", game_id.as_str()),
                ("searchFilter", query),
                ("gameVersion", game_version),
            ],
        )?;
        Ok(self.get_data(&url)?.unwrap_or_default())
    }

    fn mod_files(
        &self,
        mod_id: u32,
        game_version: &str,
        loader: Option<CurseforgeModLoader>,
    ) -> Result<Vec<File>, RemoteError> {
        let loader_id = loader.map(|l| l.id().to_string());
        let mut params = vec![("gameVersion", game_version)];
        if let Some(id) = loader_id.as_deref() {
            params.push(("modLoaderType", id));
        }
        let url = self.url(&format!("mods/{mod_id}/files"), &params)?;
        Ok(self.get_data(&url)?.unwrap_or_default())
    }

    fn file(&self, mod_id: u32, file_id: u32) -> Result<Option<File>, RemoteError> {
        self.get_data(&self.url(&format!("mods/{mod_id}/files/{file_id}"), &[])?)
    }

    fn fingerprint_matches(
        &self,
        fingerprints: &[u32],
    ) -> Result<Vec<FingerprintMatch>, RemoteError> {
        if fingerprints.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.url(&format!("fingerprints/{MINECRAFT_GAME_ID}"), &[])?;
        let response: Response<FingerprintMatches> =
            self.http
                .post_json(&url, &self.headers(), &FingerprintRequest { fingerprints })?;
        Ok(response.data.exact_matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::{test_config, MockServer};

    const FILE: &str = r#"{
        "id": 4711, "modId": 306612, "displayName": "Fabric API 0.92.0",
        "fileName": "fabric-api-0.92.0.jar", "fileLength": 2048,
        "downloadUrl": "https://edge.forgecdn.net/files/4711/fabric-api-0.92.0.jar",
        "gameVersions": ["1.20.1", "Fabric", "Client"],
        "dependencies": [
            { "modId": 1, "relationType": 3 },
            { "modId": 2, "relationType": 2 },
            { "modId": 3, "relationType": 6 }
        ],
        "fileDate": "2024-02-02T10:00:00Z",
        "hashes": [ { "value": "md5hash", "algo": 2 }, { "value": "sha1hash", "algo": 1 } ],
        "fileFingerprint": 123456
    }"#;

    fn client(server: &MockServer, key: Option<&str>) -> CurseforgeClient {
        let config = ApiConfig {
            curseforge_api_key: key.map(str::to_owned),
            ..test_config(&server.addr)
        };
        CurseforgeClient::new(HttpClient::new(&config), &config)
    }

    #[test]
    fn file_model_helpers() {
        let file: File = serde_json::from_str(FILE).unwrap();
        assert_eq!(file.side(), Side::ClientOnly);
        assert_eq!(file.sha1(), Some("sha1hash"));
        assert_eq!(file.required_dependencies().collect::<Vec<_>>(), [1]);
        assert_eq!(file.optional_dependencies().collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn mod_by_id_unwraps_data_and_sends_key() {
        let server = MockServer::start();
        server.route(
            "/cf/v1/mods/306612",
            200,
            br#"{"data":{"id":306612,"name":"Fabric API","slug":"fabric-api","classId":6,"allowModDistribution":true,"mainFileId":4711}}"#,
        );
        let client = client(&server, Some("secret"));

        let m = client.mod_by_id(306_612).unwrap().unwrap();
        assert_eq!(m.slug, "fabric-api");
        assert_eq!(m.kind().unwrap(), ProjectKind::Mod);
        assert!(m.distributable());
        assert!(client.mod_by_id(1).unwrap().is_none());

        let reqs = server.captured_requests();
        assert!(reqs.iter().all(|r| r.headers.get("x-api-key").map(String::as_str) == Some("secret")));
    }

    #[test]
    fn mod_by_slug_requires_exact_match() {
        let server = MockServer::start();
        server.route(
            "/cf/v1/mods/search?gameId=432&slug=jei",
            200,
            br#"{"data":[{"id":1,"name":"Not JEI","slug":"jei-addon"},{"id":238222,"name":"JEI","slug":"jei","classId":6}],"pagination":{}}"#,
        );
        let client = client(&server, None);
        assert_eq!(client.mod_by_slug("jei").unwrap().unwrap().id, 238_222);
        assert!(server.captured_requests()[0].headers.get("x-api-key").is_none());
    }

    #[test]
    fn mod_files_passes_loader_id() {
        let server = MockServer::start();
        let body = format!("{{\"data\":[{FILE}]}}");
        server.route(
            "/cf/v1/mods/306612/files?gameVersion=1.20.1&modLoaderType=4",
            200,
            body.as_bytes(),
        );
        let client = client(&server, None);
        let files = client
            .mod_files(306_612, "1.20.1", Some(CurseforgeModLoader::Fabric))
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(newest(files).unwrap().id, 4711);
    }

    #[test]
    fn fingerprints_are_posted() {
        let server = MockServer::start();
        let body = format!("{{\"data\":{{\"exactMatches\":[{{\"id\":306612,\"file\":{FILE}}}]}}}}");
        server.route("/cf/v1/fingerprints/432", 200, body.as_bytes());
        let client = client(&server, None);

        let matches = client.fingerprint_matches(&[123_456]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file.id, 4711);
        assert_eq!(
            server.captured_requests()[0].body,
            br#"{"fingerprints":[123456]}"#
        );
        assert!(client.fingerprint_matches(&[]).unwrap().is_empty());
    }

    #[test]
    fn undistributable_mod_is_flagged() {
        let m: Mod = serde_json::from_str(
            r#"{"id":1,"name":"x","slug":"x","classId":12,"allowModDistribution":false}"#,
        )
        .unwrap();
        assert!(!m.distributable());
        assert_eq!(m.kind().unwrap(), ProjectKind::ResourcePack);
    }
}
