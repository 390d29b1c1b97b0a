use anyhow::{Context, Result};
use serde::Deserialize;

use super::model::{ClusterHierarchy, ClusterNode, Level};

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawClusterNode {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) level: RawLevel,
    #[serde(default)]
    pub(super) weight: u64,
    #[serde(default)]
    pub(super) children: Vec<RawClusterNode>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum RawLevel {
    L2,
    L1,
    L0,
}

impl From<RawLevel> for Level {
    fn from(raw: RawLevel) -> Self {
        match raw {
            RawLevel::L2 => Self::L2,
            RawLevel::L1 => Self::L1,
            RawLevel::L0 => Self::L0,
        }
    }
}

impl From<RawClusterNode> for ClusterNode {
    fn from(raw: RawClusterNode) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            level: raw.level.into(),
            // Absent and zero weights both read as 1.
            weight: raw.weight.max(1),
            children: raw.children.into_iter().map(ClusterNode::from).collect(),
        }
    }
}

pub(super) fn parse_hierarchy_document(raw: &str) -> Result<ClusterHierarchy> {
    let top_level: Vec<RawClusterNode> =
        serde_json::from_str(raw).context("invalid cluster hierarchy JSON")?;

    ClusterHierarchy::new(top_level.into_iter().map(ClusterNode::from).collect())
}
