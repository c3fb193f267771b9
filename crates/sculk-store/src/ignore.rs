//! `.sculkignore`: glob patterns for loose files that are never tracked.

use crate::layout::PackLayout;
use crate::StoreError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;

#[derive(Debug, Clone)]
pub struct SculkIgnore {
    patterns: Vec<String>,
    set: GlobSet,
}

impl SculkIgnore {
    /// Build from pattern lines. Blank lines and `#` comments are skipped;
    /// a trailing `/` matches everything below that directory.
    pub fn from_patterns<I, S>(lines: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut patterns = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let pattern = match line.strip_suffix('/') {
                Some(dir) => format!("{dir}/**"),
                None => line.to_owned(),
            };
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| StoreError::Malformed {
                    path: crate::layout::IGNORE_FILE.to_owned(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
            patterns.push(pattern);
        }
        let set = builder.build().map_err(|e| StoreError::Malformed {
            path: crate::layout::IGNORE_FILE.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self { patterns, set })
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Load the pack's `.sculkignore`; a missing file ignores nothing.
    pub fn load(layout: &PackLayout) -> Result<Self, StoreError> {
        let path = layout.ignore_file();
        if !path.exists() {
            return Ok(Self::empty());
        }
        let content = fs::read_to_string(path)?;
        Self::from_patterns(content.lines())
    }

    pub fn is_ignored(&self, rel: &str) -> bool {
        self.set.is_match(rel)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
