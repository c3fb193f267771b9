//! Serialized shape of `manifest.sculk.json` and per-artifact `*.sculk.json`.

use crate::types::{ModLoader, Side};
use crate::version::FormatVersion;
use serde::{Deserialize, Serialize};

/// Encode any sculk JSON document: four-space indentation plus a trailing newline.
///
/// Every writer in the workspace goes through this function so that the
/// bytes hashed into a [`ManifestRef`] are reproducible.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackManifest {
    pub format_version: FormatVersion,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub version: String,
    pub minecraft: String,
    pub loader: LoaderSection,
    #[serde(default)]
    pub manifests: Vec<ManifestRef>,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

impl PackManifest {
    /// A fresh, empty pack stamped with [`FormatVersion::CURRENT`].
    pub fn new(name: &str, minecraft: &str, loader: ModLoader, loader_version: &str) -> Self {
        Self {
            format_version: FormatVersion::CURRENT,
            name: name.to_owned(),
            summary: None,
            author: None,
            version: "1.0.0".to_owned(),
            minecraft: minecraft.to_owned(),
            loader: LoaderSection {
                kind: loader,
                version: loader_version.to_owned(),
            },
            manifests: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn manifest_ref(&self, path: &str) -> Option<&ManifestRef> {
        self.manifests.iter().find(|r| r.path == path)
    }

    pub fn file_ref(&self, path: &str) -> Option<&FileRef> {
        self.files.iter().find(|r| r.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSection {
    #[serde(rename = "type")]
    pub kind: ModLoader,
    pub version: String,
}

/// Pointer from the root manifest to a file manifest, hashed over its serialized bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRef {
    pub path: String,
    pub sha256: String,
}

/// A loose tracked file (configs, options) with no source provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub side: Side,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileManifest {
    pub filename: String,
    pub side: Side,
    pub hashes: FileHashes,
    pub file_size: u64,
    pub sources: Sources,
}

impl FileManifest {
    /// Download candidates in install priority order: direct URL, Modrinth, Curseforge.
    pub fn download_urls(&self) -> Vec<&str> {
        let mut urls = Vec::with_capacity(3);
        if let Some(url) = &self.sources.url {
            urls.push(url.url.as_str());
        }
        if let Some(mr) = &self.sources.modrinth {
            urls.push(mr.file_url.as_str());
        }
        if let Some(cf) = &self.sources.curseforge {
            urls.push(cf.file_url.as_str());
        }
        urls
    }

    pub fn has_source(&self) -> bool {
        !self.sources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashes {
    pub sha1: String,
    pub sha512: String,
    pub murmur2: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curseforge: Option<CurseforgeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modrinth: Option<ModrinthSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<UrlSource>,
}

impl Sources {
    pub fn is_empty(&self) -> bool {
        self.curseforge.is_none() && self.modrinth.is_none() && self.url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurseforgeSource {
    pub project_id: u32,
    pub file_url: String,
    pub file_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModrinthSource {
    pub project_id: String,
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSource {
    pub url: String,
}
