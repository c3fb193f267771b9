//! Mappings between sculk's vocabulary and the Modrinth / Curseforge / launcher ones.
//!
//! All functions here are total over sculk's own enums. The reverse
//! directions are lossy where the external vocabulary is richer.

use crate::types::{ModLoader, Side};
use crate::SchemaError;
use serde::{Deserialize, Serialize};

/// Modrinth's per-environment support flag (`client_side` / `server_side`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModrinthEnvSupport {
    Required,
    Optional,
    Unsupported,
    #[serde(other)]
    Unknown,
}

impl ModrinthEnvSupport {
    pub fn as_str(self) -> &'static str {
        match self {
            ModrinthEnvSupport::Required => "required",
            ModrinthEnvSupport::Optional => "optional",
            ModrinthEnvSupport::Unsupported => "unsupported",
            ModrinthEnvSupport::Unknown => "unknown",
        }
    }

    /// Collapse a `(client, server)` pair to a [`Side`].
    ///
    /// Only a side that is explicitly unsupported narrows the result; every
    /// other combination, including `unknown`, falls back to [`Side::Both`].
    pub fn to_side(client: Self, server: Self) -> Side {
        use ModrinthEnvSupport::{Optional, Required, Unsupported};
        match (client, server) {
            (Unsupported, Required | Optional) => Side::ServerOnly,
            (Required | Optional, Unsupported) => Side::ClientOnly,
            _ => Side::Both,
        }
    }

    /// The `(client, server)` pair advertised for a [`Side`] in exports.
    pub fn from_side(side: Side) -> (Self, Self) {
        use ModrinthEnvSupport::{Required, Unsupported};
        match side {
            Side::Both => (Required, Required),
            Side::ClientOnly => (Required, Unsupported),
            Side::ServerOnly => (Unsupported, Required),
        }
    }
}

/// Loader identifiers as Modrinth spells them in version `loaders` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModrinthLoader {
    Minecraft,
    Fabric,
    Forge,
    NeoForge,
    Quilt,
    #[serde(other)]
    Other,
}

impl ModrinthLoader {
    pub fn from_loader(loader: ModLoader) -> Self {
        match loader {
            ModLoader::Fabric => ModrinthLoader::Fabric,
            ModLoader::Forge => ModrinthLoader::Forge,
            ModLoader::Neoforge => ModrinthLoader::NeoForge,
            ModLoader::Quilt => ModrinthLoader::Quilt,
        }
    }

    pub fn to_loader(self) -> Option<ModLoader> {
        match self {
            ModrinthLoader::Fabric => Some(ModLoader::Fabric),
            ModrinthLoader::Forge => Some(ModLoader::Forge),
            ModrinthLoader::NeoForge => Some(ModLoader::Neoforge),
            ModrinthLoader::Quilt => Some(ModLoader::Quilt),
            ModrinthLoader::Minecraft | ModrinthLoader::Other => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModrinthLoader::Minecraft => "minecraft",
            ModrinthLoader::Fabric => "fabric",
            ModrinthLoader::Forge => "forge",
            ModrinthLoader::NeoForge => "neoforge",
            ModrinthLoader::Quilt => "quilt",
            ModrinthLoader::Other => "other",
        }
    }

    /// Modrinth loaders whose builds run on a pack using `loader`.
    ///
    /// Quilt loads Fabric mods, so Fabric builds are acceptable there.
    pub fn compatible_with(loader: ModLoader) -> &'static [ModrinthLoader] {
        match loader {
            ModLoader::Fabric => &[ModrinthLoader::Fabric],
            ModLoader::Forge => &[ModrinthLoader::Forge],
            ModLoader::Neoforge => &[ModrinthLoader::NeoForge],
            ModLoader::Quilt => &[ModrinthLoader::Quilt, ModrinthLoader::Fabric],
        }
    }
}

/// Dependency key for the loader in `modrinth.index.json`.
pub fn mrpack_dependency_key(loader: ModLoader) -> &'static str {
    match loader {
        ModLoader::Fabric => "fabric-loader",
        ModLoader::Forge => "forge",
        ModLoader::Neoforge => "neoforge",
        ModLoader::Quilt => "quilt-loader",
    }
}

pub fn loader_from_mrpack_dependency(key: &str) -> Option<ModLoader> {
    ModLoader::ALL
        .into_iter()
        .find(|l| mrpack_dependency_key(*l) == key)
}

/// Component uid for the loader in a MultiMC `mmc-pack.json`.
pub fn multimc_uid(loader: ModLoader) -> &'static str {
    match loader {
        ModLoader::Fabric => "net.fabricmc.fabric-loader",
        ModLoader::Forge => "net.minecraftforge",
        ModLoader::Neoforge => "net.neoforged",
        ModLoader::Quilt => "org.quiltmc.quilt-loader",
    }
}

/// Curseforge `modLoaderType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurseforgeModLoader {
    Any,
    Forge,
    Cauldron,
    LiteLoader,
    Fabric,
    Quilt,
    NeoForge,
}

impl CurseforgeModLoader {
    pub fn id(self) -> u32 {
        match self {
            CurseforgeModLoader::Any => 0,
            CurseforgeModLoader::Forge => 1,
            CurseforgeModLoader::Cauldron => 2,
            CurseforgeModLoader::LiteLoader => 3,
            CurseforgeModLoader::Fabric => 4,
            CurseforgeModLoader::Quilt => 5,
            CurseforgeModLoader::NeoForge => 6,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => CurseforgeModLoader::Any,
            1 => CurseforgeModLoader::Forge,
            2 => CurseforgeModLoader::Cauldron,
            3 => CurseforgeModLoader::LiteLoader,
            4 => CurseforgeModLoader::Fabric,
            5 => CurseforgeModLoader::Quilt,
            6 => CurseforgeModLoader::NeoForge,
            _ => return None,
        })
    }

    pub fn from_loader(loader: ModLoader) -> Self {
        match loader {
            ModLoader::Fabric => CurseforgeModLoader::Fabric,
            ModLoader::Forge => CurseforgeModLoader::Forge,
            ModLoader::Neoforge => CurseforgeModLoader::NeoForge,
            ModLoader::Quilt => CurseforgeModLoader::Quilt,
        }
    }

    pub fn to_loader(self) -> Option<ModLoader> {
        match self {
            CurseforgeModLoader::Fabric => Some(ModLoader::Fabric),
            CurseforgeModLoader::Forge => Some(ModLoader::Forge),
            CurseforgeModLoader::NeoForge => Some(ModLoader::Neoforge),
            CurseforgeModLoader::Quilt => Some(ModLoader::Quilt),
            CurseforgeModLoader::Any
            | CurseforgeModLoader::Cauldron
            | CurseforgeModLoader::LiteLoader => None,
        }
    }

    /// Loader id in a Curseforge pack `manifest.json`, e.g. `fabric-0.15.7`.
    pub fn pack_loader_id(loader: ModLoader, version: &str) -> String {
        format!("{}-{version}", loader.as_str())
    }

    /// Split a pack loader id back into loader and version.
    pub fn parse_pack_loader_id(id: &str) -> Result<(ModLoader, String), SchemaError> {
        let (name, version) = id
            .split_once('-')
            .ok_or_else(|| SchemaError::UnknownLoader(id.to_owned()))?;
        Ok((name.parse()?, version.to_owned()))
    }
}

/// Side derived from the `Client` / `Server` tags in a Curseforge file's game versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurseforgeSide {
    Client,
    Server,
    Both,
}

impl CurseforgeSide {
    pub fn from_game_versions<S: AsRef<str>>(versions: &[S]) -> Self {
        let client = versions.iter().any(|v| v.as_ref() == "Client");
        let server = versions.iter().any(|v| v.as_ref() == "Server");
        match (client, server) {
            (true, false) => CurseforgeSide::Client,
            (false, true) => CurseforgeSide::Server,
            _ => CurseforgeSide::Both,
        }
    }

    pub fn to_side(self) -> Side {
        match self {
            CurseforgeSide::Client => Side::ClientOnly,
            CurseforgeSide::Server => Side::ServerOnly,
            CurseforgeSide::Both => Side::Both,
        }
    }
}

/// Kinds of project a pack tracks, each stored in its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    Mod,
    ResourcePack,
    ShaderPack,
    DataPack,
}

impl ProjectKind {
    pub fn dir(self) -> &'static str {
        match self {
            ProjectKind::Mod => "mods",
            ProjectKind::ResourcePack => "resourcepacks",
            ProjectKind::ShaderPack => "shaderpacks",
            ProjectKind::DataPack => "datapacks",
        }
    }

    pub fn curseforge_class_id(self) -> u32 {
        match self {
            ProjectKind::Mod => 6,
            ProjectKind::ResourcePack => 12,
            ProjectKind::ShaderPack => 6552,
            ProjectKind::DataPack => 6945,
        }
    }

    pub fn from_curseforge_class(class_id: u32) -> Result<Self, SchemaError> {
        match class_id {
            6 => Ok(ProjectKind::Mod),
            12 => Ok(ProjectKind::ResourcePack),
            6552 => Ok(ProjectKind::ShaderPack),
            6945 => Ok(ProjectKind::DataPack),
            other => Err(SchemaError::UnsupportedClass(other)),
        }
    }

    pub fn from_modrinth_type(project_type: &str) -> Result<Self, SchemaError> {
        match project_type {
            "mod" => Ok(ProjectKind::Mod),
            "resourcepack" => Ok(ProjectKind::ResourcePack),
            "shader" => Ok(ProjectKind::ShaderPack),
            "datapack" => Ok(ProjectKind::DataPack),
            other => Err(SchemaError::UnsupportedProjectType(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modrinth_side_roundtrip_for_every_side() {
        for side in Side::ALL {
            let (client, server) = ModrinthEnvSupport::from_side(side);
            let back = ModrinthEnvSupport::to_side(client, server);
            assert_eq!(back, side);
            assert_eq!(ModrinthEnvSupport::from_side(back), (client, server));
        }
    }

    #[test]
    fn modrinth_optional_narrows_only_when_other_side_unsupported() {
        use ModrinthEnvSupport::{Optional, Required, Unknown, Unsupported};
        assert_eq!(ModrinthEnvSupport::to_side(Unsupported, Optional), Side::ServerOnly);
        assert_eq!(ModrinthEnvSupport::to_side(Optional, Unsupported), Side::ClientOnly);
        assert_eq!(ModrinthEnvSupport::to_side(Optional, Optional), Side::Both);
        assert_eq!(ModrinthEnvSupport::to_side(Required, Optional), Side::Both);
        assert_eq!(ModrinthEnvSupport::to_side(Unknown, Unsupported), Side::Both);
        assert_eq!(ModrinthEnvSupport::to_side(Unsupported, Unsupported), Side::Both);
    }

    #[test]
    fn modrinth_env_parses_unknown_values() {
        let v: ModrinthEnvSupport = serde_json::from_str("\"optional\"").unwrap();
        assert_eq!(v, ModrinthEnvSupport::Optional);
        let v: ModrinthEnvSupport = serde_json::from_str("\"something-new\"").unwrap();
        assert_eq!(v, ModrinthEnvSupport::Unknown);
    }

    #[test]
    fn loader_ids_roundtrip() {
        for loader in ModLoader::ALL {
            let mr = ModrinthLoader::from_loader(loader);
            assert_eq!(mr.to_loader(), Some(loader));
            assert_eq!(
                loader_from_mrpack_dependency(mrpack_dependency_key(loader)),
                Some(loader)
            );
            let cf = CurseforgeModLoader::from_loader(loader);
            assert_eq!(CurseforgeModLoader::from_id(cf.id()), Some(cf));
            assert_eq!(cf.to_loader(), Some(loader));
        }
        assert!(ModrinthLoader::compatible_with(ModLoader::Quilt).contains(&ModrinthLoader::Fabric));
        assert_eq!(CurseforgeModLoader::Fabric.id(), 4);
        assert_eq!(CurseforgeModLoader::NeoForge.id(), 6);
        assert_eq!(CurseforgeModLoader::from_id(7), None);
        assert_eq!(multimc_uid(ModLoader::Quilt), "org.quiltmc.quilt-loader");
    }

    #[test]
    fn modrinth_loader_serde() {
        let v: Vec<ModrinthLoader> =
            serde_json::from_str(r#"["neoforge", "fabric", "bukkit"]"#).unwrap();
        assert_eq!(
            v,
            vec![ModrinthLoader::NeoForge, ModrinthLoader::Fabric, ModrinthLoader::Other]
        );
        assert_eq!(ModrinthLoader::NeoForge.as_str(), "neoforge");
    }

    #[test]
    fn pack_loader_id() {
        let id = CurseforgeModLoader::pack_loader_id(ModLoader::Forge, "47.2.0");
        assert_eq!(id, "forge-47.2.0");
        let (loader, version) = CurseforgeModLoader::parse_pack_loader_id(&id).unwrap();
        assert_eq!(loader, ModLoader::Forge);
        assert_eq!(version, "47.2.0");
        assert!(CurseforgeModLoader::parse_pack_loader_id("forge").is_err());
    }

    #[test]
    fn curseforge_side_from_tags() {
        assert_eq!(
            CurseforgeSide::from_game_versions(&["1.20.1", "Client"]).to_side(),
            Side::ClientOnly
        );
        assert_eq!(
            CurseforgeSide::from_game_versions(&["Server", "1.20.1"]).to_side(),
            Side::ServerOnly
        );
        assert_eq!(
            CurseforgeSide::from_game_versions(&["Client", "Server"]),
            CurseforgeSide::Both
        );
        assert_eq!(
            CurseforgeSide::from_game_versions::<&str>(&[]),
            CurseforgeSide::Both
        );
    }

    #[test]
    fn project_kind_directories() {
        for kind in [
            ProjectKind::Mod,
            ProjectKind::ResourcePack,
            ProjectKind::ShaderPack,
            ProjectKind::DataPack,
        ] {
            assert_eq!(
                ProjectKind::from_curseforge_class(kind.curseforge_class_id()).unwrap(),
                kind
            );
        }
        assert_eq!(ProjectKind::from_modrinth_type("shader").unwrap().dir(), "shaderpacks");
        assert!(matches!(
            ProjectKind::from_curseforge_class(4471),
            Err(SchemaError::UnsupportedClass(4471))
        ));
        assert!(ProjectKind::from_modrinth_type("modpack").is_err());
    }
}
