//! Decision tree ensembles.
//!
//! A compact array-of-nodes representation: node 0 is the root and every
//! child index is strictly greater than its parent's, so trees are acyclic
//! by construction. Splits are numeric: a row goes left when
//! `value < threshold`, and NaN follows `default_left`.

use super::{ModelStructure, Predictor};

/// Node identifier (index into [`Tree::nodes`]).
pub type NodeId = u32;

/// A tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Split {
        feature: u32,
        threshold: f64,
        default_left: bool,
        left: NodeId,
        right: NodeId,
    },
    Leaf(f64),
}

/// Structural validation errors for [`Tree`] and [`Forest`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    Empty,
    #[error("node {node} points to child {child}, which is not after it or out of range")]
    InvalidChild { node: NodeId, child: NodeId },
    #[error("node {node} splits on feature {feature}, but the forest has {n_features} features")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },
}

/// A single decision tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a tree from its nodes, root first.
    pub fn new(nodes: Vec<Node>) -> Result<Self, TreeValidationError> {
        if nodes.is_empty() {
            return Err(TreeValidationError::Empty);
        }
        let n_nodes = nodes.len();
        for (idx, node) in nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = *node {
                for child in [left, right] {
                    if child as usize <= idx || child as usize >= n_nodes {
                        return Err(TreeValidationError::InvalidChild {
                            node: idx as NodeId,
                            child,
                        });
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    /// A depth-one tree: `feature < threshold ? left_value : right_value`.
    pub fn stump(feature: u32, threshold: f64, left_value: f64, right_value: f64) -> Self {
        Self {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    default_left: true,
                    left: 1,
                    right: 2,
                },
                Node::Leaf(left_value),
                Node::Leaf(right_value),
            ],
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// Child taken by `value` at a split node.
    #[inline]
    pub fn next_node(threshold: f64, default_left: bool, left: NodeId, right: NodeId, value: f64) -> NodeId {
        let go_left = if value.is_nan() {
            default_left
        } else {
            value < threshold
        };
        if go_left { left } else { right }
    }

    /// Predict the leaf value reached by `row`.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id: NodeId = 0;
        loop {
            match *self.node(id) {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let value = row.get(feature as usize).copied().unwrap_or(f64::NAN);
                    id = Self::next_node(threshold, default_left, left, right, value);
                }
            }
        }
    }

    /// Largest feature index referenced by a split, if any.
    pub fn max_feature(&self) -> Option<(NodeId, u32)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| match *node {
                Node::Split { feature, .. } => Some((idx as NodeId, feature)),
                Node::Leaf(_) => None,
            })
            .max_by_key(|&(_, feature)| feature)
    }
}

/// Additive ensemble of trees with a constant base score.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Tree>,
    base_score: f64,
    n_features: usize,
}

impl Forest {
    /// Empty forest over `n_features` inputs.
    pub fn new(n_features: usize) -> Self {
        Self {
            trees: Vec::new(),
            base_score: 0.0,
            n_features,
        }
    }

    pub fn with_base_score(mut self, base_score: f64) -> Self {
        self.base_score = base_score;
        self
    }

    /// Add a tree, checking its split features against the forest width.
    pub fn push_tree(&mut self, tree: Tree) -> Result<(), TreeValidationError> {
        if let Some((node, feature)) = tree.max_feature() {
            if feature as usize >= self.n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature,
                    n_features: self.n_features,
                });
            }
        }
        self.trees.push(tree);
        Ok(())
    }

    #[inline]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    #[inline]
    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}

impl Predictor for Forest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row_into(&self, row: &[f64], out: &mut [f64]) {
        out[0] = self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>();
    }

    fn structure(&self) -> ModelStructure<'_> {
        ModelStructure::Forest(self)
    }
}
