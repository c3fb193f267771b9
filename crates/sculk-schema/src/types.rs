//! The pack's own vocabulary for install sides and mod loaders.
//!
//! Both enums serialize to the lowercase identifiers used in
//! `manifest.sculk.json` and per-file manifests.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which game side an artifact or loose file is installed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Both,
    ClientOnly,
    ServerOnly,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Both, Side::ClientOnly, Side::ServerOnly];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Both => "both",
            Side::ClientOnly => "client_only",
            Side::ServerOnly => "server_only",
        }
    }

    /// Whether something declared for `self` belongs in an install for `target`.
    ///
    /// `target` is the side being installed; `Both` as a target accepts everything.
    pub fn installs_on(self, target: Side) -> bool {
        match (self, target) {
            (Side::Both, _) | (_, Side::Both) => true,
            (declared, target) => declared == target,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "both" => Ok(Side::Both),
            "client" | "client_only" => Ok(Side::ClientOnly),
            "server" | "server_only" => Ok(Side::ServerOnly),
            _ => Err(SchemaError::UnknownSide(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModLoader {
    Fabric,
    Forge,
    Neoforge,
    Quilt,
}

impl ModLoader {
    pub const ALL: [ModLoader; 4] = [
        ModLoader::Fabric,
        ModLoader::Forge,
        ModLoader::Neoforge,
        ModLoader::Quilt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModLoader::Fabric => "fabric",
            ModLoader::Forge => "forge",
            ModLoader::Neoforge => "neoforge",
            ModLoader::Quilt => "quilt",
        }
    }
}

impl fmt::Display for ModLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModLoader {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModLoader::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchemaError::UnknownLoader(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Side::ClientOnly).unwrap(),
            "\"client_only\""
        );
        let back: Side = serde_json::from_str("\"server_only\"").unwrap();
        assert_eq!(back, Side::ServerOnly);
    }

    #[test]
    fn side_from_str_accepts_short_forms() {
        assert_eq!("client".parse::<Side>().unwrap(), Side::ClientOnly);
        assert_eq!("server-only".parse::<Side>().unwrap(), Side::ServerOnly);
        assert_eq!("BOTH".parse::<Side>().unwrap(), Side::Both);
        assert!("sideways".parse::<Side>().is_err());
    }

    #[test]
    fn side_install_filter() {
        assert!(Side::Both.installs_on(Side::ClientOnly));
        assert!(Side::ClientOnly.installs_on(Side::ClientOnly));
        assert!(!Side::ClientOnly.installs_on(Side::ServerOnly));
        assert!(!Side::ServerOnly.installs_on(Side::ClientOnly));
        assert!(Side::ServerOnly.installs_on(Side::Both));
    }

    #[test]
    fn loader_roundtrips_through_str() {
        for loader in ModLoader::ALL {
            assert_eq!(loader.as_str().parse::<ModLoader>().unwrap(), loader);
            let json = serde_json::to_string(&loader).unwrap();
            assert_eq!(json, format!("\"{}\"", loader.as_str()));
        }
    }

    #[test]
    fn loader_rejects_unknown() {
        assert!(matches!(
            "liteloader".parse::<ModLoader>(),
            Err(SchemaError::UnknownLoader(_))
        ));
    }
}
