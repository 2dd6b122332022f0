//! Interventional TreeSHAP for tree ensembles.
//!
//! For one instance `x` and one reference row `r`, the interventional game
//! `v(S) = f(x_S, r_rest)` of a tree only changes at splits where `x` and
//! `r` disagree. Walking the tree while tracking which players were forced
//! to follow `x` (the *in* list) and which were forced to follow `r` (the
//! *out* list), a leaf with value `v` is reached exactly by coalitions that
//! contain every in-player and no out-player. With `a` in-players and `b`
//! out-players that leaf contributes
//!
//! ```text
//! +v / (a * C(a + b, a))   to every in-player
//! -v / (b * C(a + b, b))   to every out-player
//! ```
//!
//! Averaging over the (pinned) background rows gives the exact
//! interventional Shapley values over arbitrary player groupings.

use super::{AttributionBackend, AttributionRequest};
use crate::error::{CapabilityError, ExplainError};
use crate::explainability::shap::ShapValues;
use crate::model::{Forest, ModelStructure, Node, NodeId, Predictor, Tree};
use crate::players::{PlayerId, PlayerSet};

/// Exact interventional values for [`Forest`] models.
///
/// Cost per instance is `O(background_rows * total_nodes)` in the common
/// case, with no bound on the number of players.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBackend;

impl TreeBackend {
    fn forest<'m>(model: &'m dyn Predictor) -> Result<&'m Forest, CapabilityError> {
        match model.structure() {
            ModelStructure::Forest(forest) => Ok(forest),
            other => Err(CapabilityError::BackendUnsupported {
                backend: "tree",
                model: other.family(),
            }),
        }
    }
}

impl AttributionBackend for TreeBackend {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn check(&self, model: &dyn Predictor, _players: &PlayerSet) -> Result<(), CapabilityError> {
        Self::forest(model).map(|_| ())
    }

    fn attribute(&self, request: &AttributionRequest<'_>) -> Result<ShapValues, ExplainError> {
        let forest = Self::forest(request.model)?;
        let players = request.players;
        let n_players = players.len();
        let n_rows = request.background.nrows();
        let n_samples = request.instances.nrows();

        let per_instance = request.parallelism.maybe_par_map(0..n_samples, |sample| {
            let instance = request.instances.row(sample).to_vec();
            let mut phi = vec![0.0; n_players];
            let mut base = 0.0;
            let mut reference = vec![0.0; instance.len()];
            let mut path = PlayerPath::new(n_players);
            let mut out = [0.0];

            for row in request.background.rows() {
                reference.iter_mut().zip(row.iter()).for_each(|(d, &s)| *d = s);
                request.conditioning.pin_row(&mut reference, &instance);

                forest.predict_row_into(&reference, &mut out);
                base += out[0];

                for tree in forest.trees() {
                    let walk = Walk {
                        tree,
                        players,
                        instance: &instance,
                        reference: &reference,
                    };
                    walk.visit(0, &mut path, &mut phi);
                }
            }

            let scale = 1.0 / n_rows as f64;
            phi.iter_mut().for_each(|v| *v *= scale);
            (phi, base * scale)
        });

        let mut shap = ShapValues::zeros(n_samples, players.names());
        for (sample, (phi, base)) in per_instance.into_iter().enumerate() {
            shap.set_sample(sample, &phi, base);
        }
        Ok(shap)
    }
}

// =============================================================================
// Path state
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Undecided,
    In,
    Out,
}

/// Players split on so far along the current root-to-node path.
struct PlayerPath {
    side: Vec<Side>,
    ins: Vec<PlayerId>,
    outs: Vec<PlayerId>,
}

impl PlayerPath {
    fn new(n_players: usize) -> Self {
        Self {
            side: vec![Side::Undecided; n_players],
            ins: Vec::new(),
            outs: Vec::new(),
        }
    }

    fn push(&mut self, player: PlayerId, side: Side) {
        self.side[player] = side;
        match side {
            Side::In => self.ins.push(player),
            Side::Out => self.outs.push(player),
            Side::Undecided => {}
        }
    }

    fn pop(&mut self, player: PlayerId, side: Side) {
        match side {
            Side::In => self.ins.pop(),
            Side::Out => self.outs.pop(),
            Side::Undecided => None,
        };
        self.side[player] = Side::Undecided;
    }
}

/// `1 / (k * C(k + other, k))`, the weight a leaf gives each of `k` players
/// on one side when `other` players sit on the opposite side.
fn leaf_weight(k: usize, other: usize) -> f64 {
    let binom = (1..=k).fold(1.0, |acc, i| acc * (other + i) as f64 / i as f64);
    1.0 / (k as f64 * binom)
}

/// One (tree, instance, reference) traversal.
struct Walk<'a> {
    tree: &'a Tree,
    players: &'a PlayerSet,
    instance: &'a [f64],
    reference: &'a [f64],
}

impl Walk<'_> {
    fn visit(&self, node: NodeId, path: &mut PlayerPath, phi: &mut [f64]) {
        match *self.tree.node(node) {
            Node::Leaf(value) => Self::credit(value, path, phi),
            Node::Split {
                feature,
                threshold,
                default_left,
                left,
                right,
            } => {
                let f = feature as usize;
                let x_next = Tree::next_node(threshold, default_left, left, right, self.instance[f]);
                let r_next = Tree::next_node(threshold, default_left, left, right, self.reference[f]);
                if x_next == r_next {
                    return self.visit(x_next, path, phi);
                }

                let player = self.players.owner_of(f);
                match path.side[player] {
                    Side::In => self.visit(x_next, path, phi),
                    Side::Out => self.visit(r_next, path, phi),
                    Side::Undecided => {
                        path.push(player, Side::In);
                        self.visit(x_next, path, phi);
                        path.pop(player, Side::In);

                        path.push(player, Side::Out);
                        self.visit(r_next, path, phi);
                        path.pop(player, Side::Out);
                    }
                }
            }
        }
    }

    fn credit(value: f64, path: &PlayerPath, phi: &mut [f64]) {
        let (a, b) = (path.ins.len(), path.outs.len());
        if a + b == 0 {
            return;
        }
        if a > 0 {
            let w = value * leaf_weight(a, b);
            for &p in &path.ins {
                phi[p] += w;
            }
        }
        if b > 0 {
            let w = value * leaf_weight(b, a);
            for &p in &path.outs {
                phi[p] -= w;
            }
        }
    }
}
