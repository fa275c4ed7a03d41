//! Whitelist of regexes that exclude files and whole directory subtrees.
//!
//! Each rule is start-anchored: `example1.png` matches the file name
//! `example1.png`, and `^icon_pot_anim_.*$` matches every name with that prefix.
//! Rules are OR-ed, a single match excludes the candidate.

use crate::error::CompressError;
use regex::Regex;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    rules: Vec<Regex>,
}

impl Allowlist {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CompressError> {
        let rules = patterns
            .iter()
            .map(|pattern| Regex::new(&format!("^(?:{})", pattern.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Bare file name check
    pub fn matches_file_name(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(name))
    }

    /// Full directory path check, done before descending
    pub fn matches_dir(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.rules.iter().any(|rule| rule.is_match(&path))
    }
}
