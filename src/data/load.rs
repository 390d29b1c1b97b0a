use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::ClusterHierarchy;
use super::parse::parse_hierarchy_document;

pub fn load_hierarchy(path: &Path) -> Result<ClusterHierarchy> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read hierarchy file {}", path.display()))?;

    parse_hierarchy_document(&raw)
        .with_context(|| format!("failed to parse hierarchy file {}", path.display()))
}
