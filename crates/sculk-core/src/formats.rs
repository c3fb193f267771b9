//! Third-party pack formats: Modrinth `.mrpack`, Curseforge modpack zips and
//! MultiMC instances.

use sculk_schema::ModrinthEnvSupport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MRPACK_INDEX: &str = "modrinth.index.json";
pub const MRPACK_FORMAT_VERSION: u32 = 1;
pub const MRPACK_GAME: &str = "minecraft";
pub const MRPACK_OVERRIDES: &str = "overrides";
pub const MRPACK_CLIENT_OVERRIDES: &str = "client-overrides";
pub const MRPACK_SERVER_OVERRIDES: &str = "server-overrides";

/// Hosts the Modrinth launcher accepts in `downloads`.
pub const MRPACK_ALLOWED_HOSTS: [&str; 4] = [
    "cdn.modrinth.com",
    "github.com",
    "raw.githubusercontent.com",
    "gitlab.com",
];

pub const CURSEFORGE_MANIFEST: &str = "manifest.json";
pub const CURSEFORGE_MANIFEST_TYPE: &str = "minecraftModpack";
pub const CURSEFORGE_MANIFEST_VERSION: u32 = 1;
pub const CURSEFORGE_OVERRIDES: &str = "overrides";

pub const MULTIMC_INSTANCE_CFG: &str = "instance.cfg";
pub const MULTIMC_PACK_JSON: &str = "mmc-pack.json";
pub const MULTIMC_GAME_DIR: &str = ".minecraft";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrpackIndex {
    pub format_version: u32,
    pub game: String,
    pub version_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub files: Vec<MrpackFile>,
    /// `minecraft` plus one loader key such as `fabric-loader`.
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrpackFile {
    pub path: String,
    pub hashes: MrpackHashes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<MrpackEnv>,
    pub downloads: Vec<String>,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrpackHashes {
    pub sha1: String,
    pub sha512: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrpackEnv {
    pub client: ModrinthEnvSupport,
    pub server: ModrinthEnvSupport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurseforgePackManifest {
    pub minecraft: CurseforgePackMinecraft,
    pub manifest_type: String,
    pub manifest_version: u32,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    pub files: Vec<CurseforgePackFile>,
    #[serde(default = "default_overrides")]
    pub overrides: String,
}

fn default_overrides() -> String {
    CURSEFORGE_OVERRIDES.to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurseforgePackMinecraft {
    pub version: String,
    pub mod_loaders: Vec<CurseforgePackModLoader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurseforgePackModLoader {
    /// `<loader>-<version>`, e.g. `fabric-0.15.7`.
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurseforgePackFile {
    #[serde(rename = "projectID", alias = "projectId")]
    pub project_id: u32,
    #[serde(rename = "fileID", alias = "fileId")]
    pub file_id: u32,
    #[serde(default = "required_default")]
    pub required: bool,
}

fn required_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiMcPack {
    pub format_version: u32,
    pub components: Vec<MultiMcComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiMcComponent {
    pub uid: String,
    pub version: String,
}
