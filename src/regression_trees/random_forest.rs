//! Random forest regression
//!
//! A bagged ensemble of regression trees: every member is fitted on an
//! independent bootstrap resample of the training data and predictions are
//! averaged over the ensemble.

use std::marker::PhantomData;

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::DecisionTreeRegressor;
use crate::error::{RegressionError, Result};
use linfa::{
    dataset::{AsSingleTargets, DatasetBase},
    traits::{Fit, PredictInplace},
    Dataset, Float, ParamGuard,
};

/// Draw `n_draws` rows uniformly at random with replacement, collecting the
/// chosen feature rows and targets in draw order. Duplicates are expected;
/// resampling with replacement is what decorrelates the ensemble members.
fn bootstrap<F: Float>(
    records: &ArrayView2<F>,
    targets: &ArrayView1<F>,
    n_draws: usize,
    rng: &mut impl Rng,
) -> (Array2<F>, Array1<F>) {
    let n = records.nrows();
    let indices: Vec<usize> = (0..n_draws).map(|_| rng.gen_range(0..n)).collect();

    (
        records.select(Axis(0), &indices),
        targets.select(Axis(0), &indices),
    )
}

/// A fitted random forest regression model.
///
/// ### Example
///
/// ```rust
/// use bosque::RandomForestRegressor;
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let dataset = Dataset::new(
///     array![[1.], [2.], [3.], [4.], [5.], [6.]],
///     array![1., 1., 1., 5., 5., 5.],
/// );
/// let forest = RandomForestRegressor::params()
///     .n_trees(10)
///     .sample_ratio(1.0)
///     .seed(42)
///     .fit(&dataset)
///     .unwrap();
///
/// let prediction = forest.predict(&array![[1.], [6.]]);
/// assert_eq!(prediction.len(), 2);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestRegressor<F> {
    trees: Vec<DecisionTreeRegressor<F>>,
    num_features: usize,
}

/// The set of hyperparameters that can be specified for fitting a
/// [random forest](RandomForestRegressor).
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug)]
pub struct RandomForestValidParams<F> {
    n_trees: usize,
    max_depth: Option<usize>,
    sample_ratio: f32,
    seed: u64,

    float_marker: PhantomData<F>,
}

impl<F: Float> RandomForestValidParams<F> {
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn sample_ratio(&self) -> f32 {
        self.sample_ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug)]
pub struct RandomForestParams<F>(RandomForestValidParams<F>);

impl<F: Float> RandomForestParams<F> {
    pub fn new() -> Self {
        Self(RandomForestValidParams {
            n_trees: 3,
            max_depth: Some(5),
            sample_ratio: 0.1,
            seed: 42,
            float_marker: PhantomData,
        })
    }

    /// Sets the number of trees in the ensemble
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.0.n_trees = n_trees;
        self
    }

    /// Sets the depth limit applied to every member tree, `None` for
    /// unpruned trees
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    /// Sets the bootstrap sample size as a fraction of the training set.
    /// Fractions below one train every tree on a strict subsample, which
    /// increases the diversity between ensemble members.
    pub fn sample_ratio(mut self, sample_ratio: f32) -> Self {
        self.0.sample_ratio = sample_ratio;
        self
    }

    /// Sets the seed of the random source used for bootstrap draws, making
    /// fits reproducible
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float> Default for RandomForestParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> RandomForestRegressor<F> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `n_trees = 3`
    /// * `max_depth = Some(5)`
    /// * `sample_ratio = 0.1`
    /// * `seed = 42`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> RandomForestParams<F> {
        RandomForestParams::new()
    }

    /// Return the fitted member trees in training order
    pub fn trees(&self) -> &[DecisionTreeRegressor<F>] {
        &self.trees
    }

    /// Return the number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of features the forest was fitted with
    pub fn num_features(&self) -> usize {
        self.num_features
    }
}

impl<F: Float> ParamGuard for RandomForestParams<F> {
    type Checked = RandomForestValidParams<F>;
    type Error = RegressionError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_trees == 0 {
            return Err(RegressionError::InvalidParams(
                "n_trees must be greater than zero".to_string(),
            ));
        }
        if !self.0.sample_ratio.is_finite() || self.0.sample_ratio <= 0.0 {
            return Err(RegressionError::InvalidParams(format!(
                "sample_ratio must be a positive finite fraction, got {}",
                self.0.sample_ratio
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, D: Data<Elem = F>, T: AsSingleTargets<Elem = F>>
    Fit<ArrayBase<D, Ix2>, T, RegressionError> for RandomForestValidParams<F>
{
    type Object = RandomForestRegressor<F>;

    /// Fit `n_trees` regression trees, each on an independent bootstrap
    /// resample drawn from a single seeded random stream.
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

        let n_draws = (records.nrows() as f32 * self.sample_ratio).round() as usize;
        if n_draws == 0 {
            return Err(RegressionError::DegenerateSample(format!(
                "sample_ratio {} of {} samples rounds to an empty bootstrap draw",
                self.sample_ratio,
                records.nrows()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree_params = DecisionTreeRegressor::params()
            .max_depth(self.max_depth)
            .check()?;

        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let (sample_records, sample_targets) =
                bootstrap(&records.view(), &targets, n_draws, &mut rng);
            let sample = Dataset::new(sample_records, sample_targets);
            trees.push(tree_params.fit(&sample)?);
        }

        Ok(RandomForestRegressor {
            trees,
            num_features: records.ncols(),
        })
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for RandomForestRegressor<F>
{
    /// Predict the elementwise mean of the member tree predictions.
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.num_features,
            "The number of features must match the number the forest was fitted with."
        );

        let mut accumulated = Array1::zeros(x.nrows());
        let mut member = Array1::zeros(x.nrows());
        for tree in &self.trees {
            tree.predict_inplace(x, &mut member);
            accumulated += &member;
        }

        *y = accumulated / F::cast(self.trees.len());
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros(x.nrows())
    }
}
