//! Variance-reduction regression trees
//!
use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};

use super::DecisionTreeValidParams;
use super::NodeIter;
use crate::error::{RegressionError, Result};
use linfa::{
    dataset::{AsSingleTargets, DatasetBase},
    traits::{Fit, PredictInplace},
    Float,
};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Mean squared deviation of the targets from their own mean (population
/// variance). The subset handed in is never empty: empty partitions are
/// filtered out during split search and empty datasets are rejected before
/// the first node is grown.
fn mse<F: Float>(targets: &ArrayView1<F>) -> F {
    let mean = targets.mean().unwrap_or_else(F::zero);
    targets
        .mapv(|t| (t - mean) * (t - mean))
        .mean()
        .unwrap_or_else(F::zero)
}

/// Row indices on either side of a `feature <= threshold` test, in row order.
fn partition<F: Float>(
    records: &ArrayBase<impl Data<Elem = F>, Ix2>,
    feature_idx: usize,
    threshold: F,
) -> (Vec<usize>, Vec<usize>) {
    let mut left = Vec::new();
    let mut right = Vec::new();

    for (idx, value) in records.column(feature_idx).iter().enumerate() {
        if *value <= threshold {
            left.push(idx);
        } else {
            right.push(idx);
        }
    }

    (left, right)
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeKind<F> {
    /// Terminal node, predicts the stored subset mean
    Leaf,
    /// Decision node routing `feature <= threshold` left and the rest right.
    /// `left` and `right` are ids into the owning tree's node arena.
    Split {
        feature_idx: usize,
        threshold: F,
        gain: F,
        left: usize,
        right: usize,
    },
}

/// A node record in the tree arena
///
/// Every node keeps the mean of the target subset it was built from, even
/// decision nodes: the pruning pass rewrites deep `Split` records into `Leaf`
/// records in place, and the stored mean then becomes the prediction.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<F> {
    pub(crate) kind: NodeKind<F>,
    pub(crate) prediction: F,
    pub(crate) n_samples: usize,
    pub(crate) depth: usize,
}

impl<F: Float> TreeNode<F> {
    fn leaf(prediction: F, n_samples: usize, depth: usize) -> Self {
        TreeNode {
            kind: NodeKind::Leaf,
            prediction,
            n_samples,
            depth,
        }
    }

    /// Returns true if the node has no children
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    /// Returns the depth of the node, starting at 0 for the root
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of training samples the node was built from
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Returns the mean target value of the samples the node was built from.
    /// For leaf nodes this is the value the node predicts.
    pub fn prediction(&self) -> F {
        self.prediction
    }

    /// Return the split `(feature index, threshold, gain)` for decision nodes
    /// and `None` for leaves
    pub fn split(&self) -> Option<(usize, F, F)> {
        match self.kind {
            NodeKind::Leaf => None,
            NodeKind::Split {
                feature_idx,
                threshold,
                gain,
                ..
            } => Some((feature_idx, threshold, gain)),
        }
    }
}

/// One pending subset during iterative tree construction
struct BuildFrame<F> {
    node: usize,
    records: Array2<F>,
    targets: Array1<F>,
    depth: usize,
}

/// A fitted regression tree.
///
/// ### Structure
///
/// The tree is stored as an arena of [`TreeNode`] records indexed by integer
/// id. Each decision node holds a feature index and a threshold such that all
/// observations with `feature <= threshold` fall in the left subtree, while
/// the others fall in the right subtree. Leaf nodes predict the mean target
/// value of the training samples they were built from.
///
/// ### Algorithm
///
/// Nodes are grown from a work stack of row subsets. For each subset:
///
/// * If all targets are equal the node becomes a leaf with that value.
/// * Otherwise candidate thresholds are generated per feature as the
///   midpoints between consecutive distinct observed values, and each
///   candidate is scored by the reduction in size-weighted mean squared
///   error it achieves over the unsplit node.
/// * The first candidate with the strictly greatest positive gain is kept
///   (features ascending, thresholds ascending); if no candidate improves on
///   the unsplit node, the node becomes a leaf predicting the subset mean.
///
/// After building, a pruning pass collapses every decision node at or beyond
/// the configured maximum depth into a leaf, rewriting its record tag in
/// place. Records orphaned by the rewrite stay in the arena but are never
/// reachable from the root.
///
/// ### Example
///
/// ```rust
/// use bosque::DecisionTreeRegressor;
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let dataset = Dataset::new(array![[1.], [2.], [3.], [4.]], array![1., 1., 5., 5.]);
/// let tree = DecisionTreeRegressor::params().fit(&dataset).unwrap();
/// let prediction = tree.predict(&array![[1.5], [3.5]]);
///
/// assert_eq!(prediction, array![1., 5.]);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeRegressor<F> {
    pub(crate) nodes: Vec<TreeNode<F>>,
    pub(crate) root: usize,
    pub(crate) num_features: usize,
}

impl<F: Float, D: Data<Elem = F>, T: AsSingleTargets<Elem = F>>
    Fit<ArrayBase<D, Ix2>, T, RegressionError> for DecisionTreeValidParams<F>
{
    type Object = DecisionTreeRegressor<F>;

    /// Fit a regression tree on the dataset, then prune it to the configured
    /// maximum depth.
    fn fit(&self, dataset: &DatasetBase<ArrayBase<D, Ix2>, T>) -> Result<Self::Object> {
        let records = dataset.records();
        let targets = dataset.as_single_targets();

        if records.nrows() != targets.len() {
            return Err(RegressionError::ShapeMismatch(format!(
                "{} feature rows but {} target values",
                records.nrows(),
                targets.len()
            )));
        }
        if records.nrows() == 0 {
            return Err(RegressionError::DegenerateSample(
                "cannot fit a regression tree on an empty dataset".to_string(),
            ));
        }

        let mut nodes = grow(records.to_owned(), targets.to_owned());
        if let Some(max_depth) = self.max_depth() {
            prune(&mut nodes, max_depth);
        }

        Ok(DecisionTreeRegressor {
            nodes,
            root: 0,
            num_features: records.ncols(),
        })
    }
}

/// Grows the full (unpruned) tree, returning the node arena with the root at
/// id 0. Iterative with an explicit work stack, so construction depth is not
/// limited by the call stack.
fn grow<F: Float>(records: Array2<F>, targets: Array1<F>) -> Vec<TreeNode<F>> {
    let mut nodes = vec![TreeNode::leaf(F::zero(), targets.len(), 0)];
    let mut stack = vec![BuildFrame {
        node: 0,
        records,
        targets,
        depth: 0,
    }];

    while let Some(frame) = stack.pop() {
        // partitions are never empty, so every frame holds at least one row
        let n_samples = frame.targets.len();
        let first = frame.targets[0];

        // exact-fit stopping rule: a homogeneous subset is never split
        if frame.targets.iter().all(|&t| t == first) {
            nodes[frame.node] = TreeNode::leaf(first, n_samples, frame.depth);
            continue;
        }

        let mean = frame.targets.mean().unwrap_or(first);
        let node_impurity = mse(&frame.targets.view());

        // a split is only accepted if it strictly improves on "no split";
        // ties keep the first candidate found
        let mut best_gain = F::zero();
        let mut best_split = None;

        for feature_idx in 0..frame.records.ncols() {
            let mut levels: Vec<F> = frame.records.column(feature_idx).to_vec();
            levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Greater));
            levels.dedup();

            // midpoints between consecutive distinct values; a constant
            // column yields no candidates
            for pair in levels.windows(2) {
                let threshold = (pair[0] + pair[1]) / F::cast(2.0);
                let (left_idx, right_idx) = partition(&frame.records, feature_idx, threshold);
                if left_idx.is_empty() || right_idx.is_empty() {
                    continue;
                }

                let left_targets = frame.targets.select(Axis(0), &left_idx);
                let right_targets = frame.targets.select(Axis(0), &right_idx);

                let weighted_impurity = (F::cast(left_idx.len()) * mse(&left_targets.view())
                    + F::cast(right_idx.len()) * mse(&right_targets.view()))
                    / F::cast(n_samples);

                let gain = node_impurity - weighted_impurity;
                if gain > best_gain {
                    best_gain = gain;
                    best_split = Some((feature_idx, threshold));
                }
            }
        }

        match best_split {
            None => {
                nodes[frame.node] = TreeNode::leaf(mean, n_samples, frame.depth);
            }
            Some((feature_idx, threshold)) => {
                let (left_idx, right_idx) = partition(&frame.records, feature_idx, threshold);

                let left = nodes.len();
                nodes.push(TreeNode::leaf(F::zero(), 0, frame.depth + 1));
                let right = nodes.len();
                nodes.push(TreeNode::leaf(F::zero(), 0, frame.depth + 1));

                nodes[frame.node] = TreeNode {
                    kind: NodeKind::Split {
                        feature_idx,
                        threshold,
                        gain: best_gain,
                        left,
                        right,
                    },
                    prediction: mean,
                    n_samples,
                    depth: frame.depth,
                };

                stack.push(BuildFrame {
                    node: right,
                    records: frame.records.select(Axis(0), &right_idx),
                    targets: frame.targets.select(Axis(0), &right_idx),
                    depth: frame.depth + 1,
                });
                stack.push(BuildFrame {
                    node: left,
                    records: frame.records.select(Axis(0), &left_idx),
                    targets: frame.targets.select(Axis(0), &left_idx),
                    depth: frame.depth + 1,
                });
            }
        }
    }

    nodes
}

/// Collapses every decision node at or beyond `max_depth` into a leaf
/// predicting its stored subset mean. The collapse rule only looks at the
/// node's own depth, so a flat pass over the arena is equivalent to the
/// child-first recursion it replaces.
fn prune<F: Float>(nodes: &mut [TreeNode<F>], max_depth: usize) {
    for node in nodes.iter_mut() {
        if node.depth >= max_depth {
            node.kind = NodeKind::Leaf;
        }
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for DecisionTreeRegressor<F>
{
    /// Make predictions for each row of a matrix of features `x`.
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.num_features,
            "The number of features must match the number the tree was fitted with."
        );

        for (row, target) in x.rows().into_iter().zip(y.iter_mut()) {
            *target = self.predict_row(&row);
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros(x.nrows())
    }
}

impl<F: Float> DecisionTreeRegressor<F> {
    /// Follow a sample from the root down to a leaf and return the leaf value
    fn predict_row(&self, row: &ArrayBase<impl Data<Elem = F>, Ix1>) -> F {
        let mut id = self.root;
        loop {
            match self.nodes[id].kind {
                NodeKind::Leaf => return self.nodes[id].prediction,
                NodeKind::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    id = if row[feature_idx] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Create an iterator over the nodes reachable from the root,
    /// depth-first
    pub fn iter_nodes(&self) -> NodeIter<F> {
        NodeIter::new(&self.nodes, vec![self.root])
    }

    /// Return the root node of the tree
    pub fn root_node(&self) -> &TreeNode<F> {
        &self.nodes[self.root]
    }

    /// Return the number of features the tree was fitted with
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Return the number of nodes reachable from the root
    pub fn num_nodes(&self) -> usize {
        self.iter_nodes().count()
    }

    /// Return the number of leaves in the tree
    pub fn num_leaves(&self) -> usize {
        self.iter_nodes().filter(|node| node.is_leaf()).count()
    }

    /// Return the depth of the deepest node in the tree
    pub fn max_depth(&self) -> usize {
        self.iter_nodes()
            .fold(0, |max, node| usize::max(max, node.depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use linfa::prelude::*;
    use ndarray::{array, Array, Array1, Array2};
    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
    use rand::rngs::SmallRng;

    use crate::error::{RegressionError, Result};

    #[test]
    fn mse_example() {
        let targets = array![1.0f64, 1.0, 5.0, 5.0];

        // deviations from the mean 3 are all +-2
        assert_abs_diff_eq!(mse(&targets.view()), 4.0, epsilon = 1e-12);

        // a homogeneous subset has zero impurity
        let constant = array![2.0f64, 2.0, 2.0];
        assert_abs_diff_eq!(mse(&constant.view()), 0.0, epsilon = 1e-12);
    }

    #[test]
    /// The perfectly separable two-level dataset must split at the midpoint
    /// between the two target groups with the full variance as gain.
    fn perfect_split() -> Result<()> {
        let dataset = Dataset::new(array![[1.], [2.], [3.], [4.]], array![1., 1., 5., 5.]);
        let tree = DecisionTreeRegressor::params().fit(&dataset)?;

        let (feature_idx, threshold, gain) = tree.root_node().split().unwrap();
        assert_eq!(feature_idx, 0);
        assert_abs_diff_eq!(threshold, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(gain, 4.0, epsilon = 1e-12);

        // one decision node over two pure leaves
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.num_leaves(), 2);

        assert_eq!(tree.predict(&array![[1.], [4.]]), array![1., 5.]);
        Ok(())
    }

    #[test]
    /// An all-equal target collapses to a single leaf regardless of the
    /// features or the depth limit.
    fn homogeneous_targets_single_leaf() -> Result<()> {
        let dataset = Dataset::new(array![[1., 7.], [2., 0.], [3., 4.]], array![3., 3., 3.]);
        let tree = DecisionTreeRegressor::params().max_depth(Some(8)).fit(&dataset)?;

        assert_eq!(tree.num_nodes(), 1);
        assert!(tree.root_node().is_leaf());
        assert_eq!(
            tree.predict(&array![[0., 0.], [9., -3.]]),
            array![3., 3.]
        );
        Ok(())
    }

    #[test]
    /// A constant feature column offers no candidate thresholds, so a
    /// heterogeneous target without usable splits becomes a mean leaf.
    fn no_usable_split_falls_back_to_mean() -> Result<()> {
        let dataset = Dataset::new(array![[1.], [1.]], array![1., 2.]);
        let tree = DecisionTreeRegressor::params().fit(&dataset)?;

        assert_eq!(tree.num_nodes(), 1);
        assert_abs_diff_eq!(tree.predict(&array![[1.]])[0], 1.5, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    /// Check that no decision node survives at or beyond the depth cap
    fn depth_cap_invariant() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);
        let records = Array::random_using((60, 5), Uniform::new(-1., 1.), &mut rng);
        let targets: Array1<f64> = Array::random_using(60, Uniform::new(0., 10.), &mut rng);
        let dataset = Dataset::new(records, targets);

        for max_depth in &[1, 2, 5] {
            let tree = DecisionTreeRegressor::params()
                .max_depth(Some(*max_depth))
                .fit(&dataset)?;

            for node in tree.iter_nodes() {
                assert!(node.is_leaf() || node.depth() < *max_depth);
            }
        }
        Ok(())
    }

    #[test]
    /// A depth cap of zero prunes the root itself, leaving a tree that
    /// predicts the global target mean.
    fn zero_depth_predicts_global_mean() -> Result<()> {
        let dataset = Dataset::new(array![[1.], [2.], [3.], [4.]], array![1., 1., 5., 5.]);
        let tree = DecisionTreeRegressor::params().max_depth(Some(0)).fit(&dataset)?;

        assert!(tree.root_node().is_leaf());
        assert_abs_diff_eq!(tree.predict(&array![[2.]])[0], 3.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn prediction_is_aligned_with_input_rows() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(3);
        let records = Array::random_using((25, 3), Uniform::new(0., 1.), &mut rng);
        let targets: Array1<f64> = Array::random_using(25, Uniform::new(0., 1.), &mut rng);
        let dataset = Dataset::new(records.clone(), targets);

        let tree = DecisionTreeRegressor::params().max_depth(Some(4)).fit(&dataset)?;
        assert_eq!(tree.predict(&records).len(), 25);
        Ok(())
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let dataset = Dataset::new(
            Array2::<f64>::zeros((0, 2)),
            Array1::<f64>::zeros(0),
        );
        let res = DecisionTreeRegressor::params().fit(&dataset);
        assert!(matches!(res, Err(RegressionError::DegenerateSample(_))));
    }

    #[test]
    #[should_panic(expected = "number of features")]
    fn predict_rejects_wrong_feature_count() {
        let dataset = Dataset::new(array![[1.], [2.], [3.], [4.]], array![1., 1., 5., 5.]);
        let tree = DecisionTreeRegressor::params().fit(&dataset).unwrap();
        tree.predict(&array![[1., 2.]]);
    }
}
