//! Isolation tree implementation
//!
//! Trees are built by recursively partitioning data until isolation is achieved
//! or maximum depth is reached. Nodes are stored in pre-order: a node's index
//! is reserved before its children are built, so the root is always index 0.

use crate::{MLError, MLResult, Node, NodeType, Rng, Sample};

/// Attempts at finding a non-degenerate split feature before falling back
const SPLIT_ATTEMPTS: usize = 10;

/// Configuration for isolation tree
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Random seed for this tree
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            seed: 42,
        }
    }
}

/// Isolation tree structure
#[derive(Debug, Clone)]
pub struct IsolationTree {
    /// Tree nodes in pre-order array representation
    pub nodes: Vec<Node>,
    /// Configuration
    pub config: TreeConfig,
    /// Random number generator
    rng: Rng,
}

impl IsolationTree {
    /// Create a new isolation tree
    pub fn new(config: TreeConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config,
            rng: Rng::new(config.seed),
        }
    }

    /// Train the tree on samples
    pub fn fit(&mut self, samples: &[&Sample]) -> MLResult<()> {
        if samples.is_empty() {
            return Err(MLError::InsufficientData);
        }

        let width = samples[0].num_features();
        if width == 0 || samples.iter().any(|s| s.num_features() != width) {
            return Err(MLError::InvalidFeature);
        }

        self.nodes.clear();
        self.build_tree(samples, 0)?;

        Ok(())
    }

    /// Build tree recursively, returning the index of the subtree root
    fn build_tree(&mut self, samples: &[&Sample], depth: usize) -> MLResult<usize> {
        let node_index = self.nodes.len();
        self.nodes.push(Node::external(samples.len(), depth));

        if depth >= self.config.max_depth || samples.len() <= 1 || self.all_same(samples) {
            return Ok(node_index);
        }

        let (feature, split_value) = self.select_split(samples)?;
        let (left_samples, right_samples) = partition(samples, feature, split_value);

        // Split landed on the minimum: nothing isolated, keep the leaf
        if left_samples.is_empty() || right_samples.is_empty() {
            return Ok(node_index);
        }

        let left_index = self.build_tree(&left_samples, depth + 1)?;
        let right_index = self.build_tree(&right_samples, depth + 1)?;

        self.nodes[node_index] = Node::internal(feature, split_value, left_index, right_index, depth);

        Ok(node_index)
    }

    /// Check if all samples are identical
    fn all_same(&self, samples: &[&Sample]) -> bool {
        let first = &samples[0].features;
        samples[1..].iter().all(|s| s.features == *first)
    }

    /// Select random feature and split value
    fn select_split(&mut self, samples: &[&Sample]) -> MLResult<(usize, f64)> {
        let num_features = samples[0].num_features();

        for _ in 0..SPLIT_ATTEMPTS {
            let feature = self.rng.next_range(num_features);
            let (min_val, max_val) = feature_range(samples, feature)?;

            if (max_val - min_val).abs() < f64::EPSILON {
                continue;
            }

            let split_value = self.rng.next_f64_range(min_val, max_val);
            return Ok((feature, split_value));
        }

        // Fallback: use first feature, median value
        Ok((0, median_value(samples, 0)?))
    }

    /// Calculate path length for a sample
    pub fn path_length(&self, sample: &Sample) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }

        let mut current_index = 0;

        loop {
            let node = &self.nodes[current_index];

            match node.node_type {
                NodeType::External { .. } => return node.path_length(),
                NodeType::Internal { .. } => match node.traverse(sample) {
                    Ok(next_index) if next_index < self.nodes.len() => current_index = next_index,
                    // Feature missing from the sample: stop here
                    _ => return node.depth as f64,
                },
            }
        }
    }

    /// Get the number of nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        self.nodes.iter()
            .map(|n| n.depth)
            .max()
            .unwrap_or(0)
    }
}

/// Get min/max range for a feature
fn feature_range(samples: &[&Sample], feature: usize) -> MLResult<(f64, f64)> {
    let mut min_val = f64::INFINITY;
    let mut max_val = f64::NEG_INFINITY;

    for sample in samples {
        let val = sample.get_feature(feature)
            .ok_or(MLError::InvalidFeature)?;
        min_val = min_val.min(val);
        max_val = max_val.max(val);
    }

    Ok((min_val, max_val))
}

/// Get median value for a feature
fn median_value(samples: &[&Sample], feature: usize) -> MLResult<f64> {
    let mut values = samples
        .iter()
        .map(|s| s.get_feature(feature).ok_or(MLError::InvalidFeature))
        .collect::<MLResult<Vec<f64>>>()?;

    values.sort_by(|a, b| a.total_cmp(b));

    Ok(values[values.len() / 2])
}

/// Partition samples based on split
fn partition<'a>(samples: &[&'a Sample], feature: usize, split_value: f64) -> (Vec<&'a Sample>, Vec<&'a Sample>) {
    samples
        .iter()
        .copied()
        .partition(|s| s.get_feature(feature).is_some_and(|v| v < split_value))
}
