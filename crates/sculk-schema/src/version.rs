use crate::SchemaError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Pack format version, ordered lexicographically on `(major, minor)`.
///
/// Serialized as the string `"<major>.<minor>"`. Ordering is numeric per
/// component, so `1.10 > 1.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    /// The version every newly written pack is stamped with.
    pub const CURRENT: FormatVersion = FormatVersion::new(1, 1);

    /// Assumed for root manifests that carry no `formatVersion` field.
    pub const UNVERSIONED: FormatVersion = FormatVersion::new(0, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Read `formatVersion` from an untyped root manifest, defaulting to `0.0`.
    pub fn from_root_json(root: &serde_json::Value) -> Result<Self, SchemaError> {
        match root.get("formatVersion").and_then(serde_json::Value::as_str) {
            Some(s) => s.parse(),
            None => Ok(Self::UNVERSIONED),
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for FormatVersion {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidFormatVersion(s.to_owned());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_numeric_not_lexical() {
        assert!(FormatVersion::new(1, 10) > FormatVersion::new(1, 9));
        assert!(FormatVersion::new(2, 0) > FormatVersion::new(1, 99));
        assert!(FormatVersion::new(0, 0) < FormatVersion::new(1, 0));
        assert_eq!(FormatVersion::new(1, 1), FormatVersion::CURRENT);
    }

    #[test]
    fn parses_and_displays() {
        let v: FormatVersion = "1.10".parse().unwrap();
        assert_eq!(v, FormatVersion::new(1, 10));
        assert_eq!(v.to_string(), "1.10");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "1", "1.", ".1", "a.b", "1.2.3", "-1.0"] {
            assert!(bad.parse::<FormatVersion>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&FormatVersion::CURRENT).unwrap();
        assert_eq!(json, "\"1.1\"");
        let back: FormatVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FormatVersion::CURRENT);
    }

    #[test]
    fn absent_field_is_unversioned() {
        let root = serde_json::json!({ "name": "pack" });
        assert_eq!(
            FormatVersion::from_root_json(&root).unwrap(),
            FormatVersion::UNVERSIONED
        );
        let root = serde_json::json!({ "formatVersion": "1.0" });
        assert_eq!(
            FormatVersion::from_root_json(&root).unwrap(),
            FormatVersion::new(1, 0)
        );
    }
}
