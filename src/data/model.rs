use std::collections::HashSet;

use anyhow::{Result, bail};

pub const SYNTHETIC_ROOT_ID: &str = "__root__";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    L2,
    L1,
    L0,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Self::L2 => "category",
            Self::L1 => "cluster",
            Self::L0 => "subcluster",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClusterNode {
    pub id: String,
    pub name: String,
    pub level: Level,
    pub weight: u64,
    pub children: Vec<ClusterNode>,
}

impl ClusterNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn packing_value(&self) -> u64 {
        self.weight.max(1)
    }
}

#[derive(Clone, Debug)]
pub struct ClusterHierarchy {
    root: ClusterNode,
    synthetic_root: bool,
    top_level_ids: Vec<String>,
    node_count: usize,
    leaf_count: usize,
}

impl ClusterHierarchy {
    pub fn new(top_level: Vec<ClusterNode>) -> Result<Self> {
        if top_level.is_empty() {
            bail!("hierarchy has no top-level clusters");
        }

        let mut seen = HashSet::new();
        let mut node_count = 0usize;
        let mut leaf_count = 0usize;
        let mut stack = top_level.iter().collect::<Vec<_>>();
        while let Some(node) = stack.pop() {
            if node.id == SYNTHETIC_ROOT_ID {
                bail!("cluster id {SYNTHETIC_ROOT_ID} is reserved");
            }
            if !seen.insert(node.id.as_str()) {
                bail!("duplicate cluster id: {}", node.id);
            }
            node_count += 1;
            if node.children.is_empty() {
                leaf_count += 1;
            }
            stack.extend(node.children.iter());
        }

        let top_level_ids = top_level.iter().map(|node| node.id.clone()).collect();
        let synthetic_root = top_level.len() > 1;
        let root = if synthetic_root {
            ClusterNode {
                id: SYNTHETIC_ROOT_ID.to_string(),
                name: String::new(),
                level: Level::L2,
                weight: 0,
                children: top_level,
            }
        } else {
            top_level.into_iter().next().expect("top level is non-empty")
        };

        Ok(Self {
            root,
            synthetic_root,
            top_level_ids,
            node_count,
            leaf_count,
        })
    }

    pub fn root(&self) -> &ClusterNode {
        &self.root
    }

    pub fn has_synthetic_root(&self) -> bool {
        self.synthetic_root
    }

    pub fn top_level(&self) -> &[ClusterNode] {
        if self.synthetic_root {
            &self.root.children
        } else {
            std::slice::from_ref(&self.root)
        }
    }

    pub fn top_level_position(&self, id: &str) -> Option<usize> {
        self.top_level_ids.iter().position(|entry| entry == id)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn find(&self, id: &str) -> Option<&ClusterNode> {
        if id == SYNTHETIC_ROOT_ID {
            return None;
        }
        if !self.synthetic_root && id == self.root.id {
            return Some(&self.root);
        }

        let mut stack = self.root.children.iter().collect::<Vec<_>>();
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Ancestor chain from just below the (possibly synthetic) root down to the
    /// node itself, inclusive. The hierarchy root resolves to an empty chain.
    pub fn ancestor_path(&self, id: &str) -> Option<Vec<&ClusterNode>> {
        if id == SYNTHETIC_ROOT_ID || (!self.synthetic_root && id == self.root.id) {
            return Some(Vec::new());
        }

        fn descend<'a>(
            node: &'a ClusterNode,
            id: &str,
            path: &mut Vec<&'a ClusterNode>,
        ) -> bool {
            path.push(node);
            if node.id == id {
                return true;
            }
            for child in &node.children {
                if descend(child, id, path) {
                    return true;
                }
            }
            path.pop();
            false
        }

        let mut path = Vec::new();
        for below_root in &self.root.children {
            if descend(below_root, id, &mut path) {
                return Some(path);
            }
        }
        None
    }

    pub fn nearest_l2_ancestor(&self, id: &str) -> Option<&ClusterNode> {
        let path = self.ancestor_path(id)?;
        path.iter()
            .rev()
            .find(|node| node.level == Level::L2)
            .copied()
            .or_else(|| {
                (!self.synthetic_root && self.root.level == Level::L2).then_some(&self.root)
            })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{l1, l2, leaf, sample_hierarchy};
    use super::*;

    #[test]
    fn multiple_top_level_nodes_get_a_synthetic_root() {
        let hierarchy = sample_hierarchy();
        assert!(hierarchy.has_synthetic_root());
        assert_eq!(hierarchy.root().id, SYNTHETIC_ROOT_ID);
        assert_eq!(hierarchy.top_level().len(), 2);
        assert_eq!(hierarchy.node_count(), 14);
        assert_eq!(hierarchy.leaf_count(), 8);
    }

    #[test]
    fn single_top_level_node_is_the_root() {
        let hierarchy =
            ClusterHierarchy::new(vec![l2("only", vec![l1("l1-1", vec![leaf("l0-1", 1)])])])
                .expect("valid hierarchy");
        assert!(!hierarchy.has_synthetic_root());
        assert_eq!(hierarchy.root().id, "only");
        assert_eq!(hierarchy.top_level().len(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = ClusterHierarchy::new(vec![
            l2("dup", vec![]),
            l2("dup", vec![]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn synthetic_root_never_resolves() {
        let hierarchy = sample_hierarchy();
        assert!(hierarchy.find(SYNTHETIC_ROOT_ID).is_none());
        assert_eq!(
            hierarchy.ancestor_path(SYNTHETIC_ROOT_ID).map(|path| path.len()),
            Some(0)
        );
    }

    #[test]
    fn ancestor_path_excludes_synthetic_root() {
        let hierarchy = sample_hierarchy();
        let path = hierarchy.ancestor_path("l0-5").expect("leaf exists");
        let ids = path.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["l2-2", "l1-3", "l0-5"]);
    }

    #[test]
    fn ancestor_path_of_single_root_is_empty() {
        let hierarchy =
            ClusterHierarchy::new(vec![l2("only", vec![l1("l1-1", vec![])])]).expect("valid");
        assert_eq!(hierarchy.ancestor_path("only").map(|path| path.len()), Some(0));
        let ids = hierarchy
            .ancestor_path("l1-1")
            .expect("node exists")
            .iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["l1-1"]);
    }

    #[test]
    fn nearest_l2_ancestor_walks_upward() {
        let hierarchy = sample_hierarchy();
        assert_eq!(
            hierarchy.nearest_l2_ancestor("l0-7").map(|node| node.id.as_str()),
            Some("l2-2")
        );
        assert_eq!(
            hierarchy.nearest_l2_ancestor("l2-1").map(|node| node.id.as_str()),
            Some("l2-1")
        );
    }

    #[test]
    fn missing_ids_resolve_to_none() {
        let hierarchy = sample_hierarchy();
        assert!(hierarchy.find("ghost").is_none());
        assert!(hierarchy.ancestor_path("ghost").is_none());
    }
}
