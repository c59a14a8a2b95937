//! Isolation tree node implementation
//!
//! Nodes live in a flat array owned by the tree; children are addressed by
//! index so a fitted tree is a plain, immutable block of data that can be
//! shared across scoring threads.

use crate::{MLError, MLResult, Sample};

/// Node type in the isolation tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeType {
    /// Internal node with split condition
    Internal {
        /// Feature index to split on
        feature: usize,
        /// Split value
        split_value: f64,
        /// Left child index
        left: usize,
        /// Right child index
        right: usize,
    },
    /// Leaf node (external)
    External {
        /// Number of training samples that reached this leaf
        size: usize,
    },
}

/// Tree node with its depth from the root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Node type and data
    pub node_type: NodeType,
    /// Path length from root
    pub depth: usize,
}

impl Node {
    /// Create an internal node
    pub fn internal(feature: usize, split_value: f64, left: usize, right: usize, depth: usize) -> Self {
        Self {
            node_type: NodeType::Internal {
                feature,
                split_value,
                left,
                right,
            },
            depth,
        }
    }

    /// Create an external (leaf) node
    pub fn external(size: usize, depth: usize) -> Self {
        Self {
            node_type: NodeType::External { size },
            depth,
        }
    }

    /// Check if node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.node_type, NodeType::External { .. })
    }

    /// Path length credited to a sample that terminates here
    ///
    /// Leaves add `c(size)`: the expected remaining depth had the tree kept
    /// splitting the samples that were cut off by the depth limit.
    pub fn path_length(&self) -> f64 {
        match self.node_type {
            NodeType::External { size } => self.depth as f64 + c_factor(size),
            NodeType::Internal { .. } => self.depth as f64,
        }
    }

    /// Traverse to next node based on sample
    ///
    /// Returns the child index to visit next
    pub fn traverse(&self, sample: &Sample) -> MLResult<usize> {
        match self.node_type {
            NodeType::Internal { feature, split_value, left, right } => {
                let feature_value = sample.get_feature(feature)
                    .ok_or(MLError::InvalidFeature)?;

                if feature_value < split_value {
                    Ok(left)
                } else {
                    Ok(right)
                }
            }
            NodeType::External { .. } => {
                Err(MLError::InvalidConfig("Cannot traverse from leaf node"))
            }
        }
    }
}

/// Euler-Mascheroni constant
const EULER: f64 = 0.577_215_664_901_532_9;

/// Calculate c(n) factor for path length adjustment
///
/// Average path length of an unsuccessful search in a binary search tree
/// built from `n` keys: `2 H(n-1) - 2 (n-1) / n`, with the harmonic number
/// approximated as `ln(n-1) + γ`.
pub fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER) - 2.0 * (n - 1.0) / n
        }
    }
}
