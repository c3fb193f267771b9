//! Downloaded artifacts and the paths they live at inside a pack.

use crate::{Context, CoreError};
use sculk_schema::{murmur2, sha1_hex, sha512_hex, FileHashes, ProjectKind};
use sculk_store::{StoreError, FILE_MANIFEST_SUFFIX};
use tracing::debug;

/// Artifact bytes with every hash a file manifest records.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub hashes: FileHashes,
}

impl Artifact {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let hashes = FileHashes {
            sha1: sha1_hex(&bytes),
            sha512: sha512_hex(&bytes),
            murmur2: murmur2(&bytes),
        };
        Self { bytes, hashes }
    }

    pub fn fetch(ctx: &Context<'_>, url: &str) -> Result<Self, CoreError> {
        let bytes = ctx.download(url)?;
        debug!("downloaded {} bytes from {url}", bytes.len());
        Ok(Self::from_bytes(bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn verify_sha512(&self, label: &str, expected: &str) -> Result<(), CoreError> {
        check_hash(label, expected, &self.hashes.sha512)
    }

    pub fn verify_sha1(&self, label: &str, expected: &str) -> Result<(), CoreError> {
        check_hash(label, expected, &self.hashes.sha1)
    }
}

fn check_hash(label: &str, expected: &str, actual: &str) -> Result<(), CoreError> {
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(StoreError::HashMismatch {
            path: label.to_owned(),
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        }
        .into())
    }
}

/// `<kind dir>/<slug>.sculk.json`
pub fn sidecar_path(kind: ProjectKind, slug: &str) -> String {
    format!("{}/{slug}{FILE_MANIFEST_SUFFIX}", kind.dir())
}

/// The artifact named `filename` sits next to its manifest.
pub fn artifact_path(manifest_path: &str, filename: &str) -> String {
    match manifest_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{filename}"),
        None => filename.to_owned(),
    }
}

/// Lowercase, with whitespace runs collapsed to `-`.
pub fn slug_from_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Best-effort project slug from an artifact filename.
///
/// The extension is dropped and the name is cut before the first `-`
/// followed by a digit, so `sodium-fabric-0.5.8+mc1.20.1.jar` gives
/// `sodium-fabric`.
pub fn slug_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem);
    let bytes = stem.as_bytes();
    let cut = (1..bytes.len())
        .find(|&i| bytes[i - 1] == b'-' && bytes[i].is_ascii_digit())
        .map_or(stem.len(), |i| i - 1);
    let slug = slug_from_name(&stem[..cut].replace(['_', ' '], "-"));
    if slug.is_empty() {
        slug_from_name(stem)
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_computed_from_bytes() {
        let artifact = Artifact::from_bytes(b"hello".to_vec());
        assert_eq!(artifact.hashes.sha1, sha1_hex(b"hello"));
        assert_eq!(artifact.hashes.murmur2, murmur2(b"hello"));
        assert_eq!(artifact.size(), 5);
        assert!(artifact
            .verify_sha512("mods/a.jar", &sha512_hex(b"hello").to_uppercase())
            .is_ok());
    }

    #[test]
    fn mismatch_is_reported_with_label() {
        let artifact = Artifact::from_bytes(b"hello".to_vec());
        let err = artifact.verify_sha1("mods/a.jar", "00").unwrap_err();
        assert!(err.is_integrity_error());
        assert!(err.to_string().contains("mods/a.jar"));
    }

    #[test]
    fn paths() {
        assert_eq!(
            sidecar_path(ProjectKind::ShaderPack, "complementary"),
            "shaderpacks/complementary.sculk.json"
        );
        assert_eq!(
            artifact_path("mods/sodium.sculk.json", "sodium-0.5.8.jar"),
            "mods/sodium-0.5.8.jar"
        );
        assert_eq!(artifact_path("a.sculk.json", "a.jar"), "a.jar");
    }

    #[test]
    fn slugs() {
        assert_eq!(slug_from_name("My Cool  Mod"), "my-cool-mod");
        assert_eq!(
            slug_from_filename("sodium-fabric-0.5.8+mc1.20.1.jar"),
            "sodium-fabric"
        );
        assert_eq!(slug_from_filename("Iris_Shaders.zip"), "iris-shaders");
        assert_eq!(slug_from_filename("1.20-pack.zip"), "1.20-pack");
    }
}
