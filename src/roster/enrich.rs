use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Status reported when a lookup finds nothing for a person.
pub const NOT_FOUND_STATUS: &str = "NC";

/// Per-person status lookup against an external source.
///
/// Called once per planned entry with the lookup name and the secondary
/// name; the answer is attached to the render row, never to the record.
pub trait StatusLookup {
    fn lookup(&self, name: &str, secondary_name: &str) -> String;
}

/// Lookup used when no source is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLookup;

impl StatusLookup for NoLookup {
    fn lookup(&self, _name: &str, _secondary_name: &str) -> String {
        NOT_FOUND_STATUS.to_string()
    }
}

/// Statuses pre-fetched into a JSON object keyed by lookup name.
#[derive(Debug, Default, Clone)]
pub struct FileLookup {
    statuses: HashMap<String, String>,
}

impl FileLookup {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let statuses: HashMap<String, String> = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(path = %path.display(), entries = statuses.len(), "loaded lookup statuses");
        Ok(Self::from_map(statuses))
    }

    pub fn from_map(statuses: HashMap<String, String>) -> Self {
        let statuses = statuses
            .into_iter()
            .map(|(name, status)| (name.trim().to_uppercase(), status))
            .collect();
        Self { statuses }
    }
}

impl StatusLookup for FileLookup {
    fn lookup(&self, name: &str, _secondary_name: &str) -> String {
        self.statuses
            .get(&name.trim().to_uppercase())
            .filter(|status| !status.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_STATUS.to_string())
    }
}

/// Name sent to the lookup: aliases are printed in parentheses after the
/// name and are not part of it.
pub fn lookup_name(primary_name: &str) -> &str {
    primary_name
        .split('(')
        .next()
        .unwrap_or(primary_name)
        .trim()
}
