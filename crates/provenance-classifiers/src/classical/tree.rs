//! Binary decision trees for the forest and boosting artifacts

use provenance_core::{Error, Result};
use serde::Deserialize;

/// Tree node. The root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[feature] <= threshold` goes left, otherwise right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal value: a probability for forests, a margin for boosting
    Leaf { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Check node references against the tree and the model's input width
    pub fn validate(&self, width: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::config("tree has no nodes"));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= width {
                    return Err(Error::config(format!(
                        "node {} splits on feature {} but the model has {} inputs",
                        idx, feature, width
                    )));
                }
                for child in [left, right] {
                    if *child >= self.nodes.len() || *child == idx {
                        return Err(Error::config(format!(
                            "node {} points to invalid child {}",
                            idx, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf
    pub fn evaluate(&self, row: &[f64]) -> Result<f64> {
        let mut idx = 0;
        // A path longer than the node count has revisited a node.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row.get(*feature).copied().ok_or_else(|| {
                        Error::inference(format!("row has no feature {}", feature))
                    })?;
                    idx = if x <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(Error::inference(format!("tree references missing node {}", idx)))
                }
            }
        }
        Err(Error::inference("tree contains a cycle"))
    }

    /// Increment `counts[feature]` for every split in this tree
    pub fn count_splits(&self, counts: &mut [usize]) {
        for node in &self.nodes {
            if let TreeNode::Split { feature, .. } = node {
                if let Some(count) = counts.get_mut(*feature) {
                    *count += 1;
                }
            }
        }
    }
}
