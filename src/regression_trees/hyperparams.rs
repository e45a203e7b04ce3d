use linfa::{Float, ParamGuard};
use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::RegressionError;
use crate::DecisionTreeRegressor;

/// The set of hyperparameters that can be specified for fitting a
/// [regression tree](crate::DecisionTreeRegressor).
///
/// ### Example
///
/// ```rust
/// use bosque::DecisionTreeRegressor;
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let params = DecisionTreeRegressor::params().max_depth(Some(3));
///
/// let dataset = Dataset::new(array![[1.], [2.], [3.], [4.]], array![1., 1., 5., 5.]);
/// let tree = params.fit(&dataset).unwrap();
/// assert!(tree.max_depth() <= 3);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug)]
pub struct DecisionTreeValidParams<F> {
    max_depth: Option<usize>,

    float_marker: PhantomData<F>,
}

impl<F: Float> DecisionTreeValidParams<F> {
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug)]
pub struct DecisionTreeParams<F>(DecisionTreeValidParams<F>);

impl<F: Float> DecisionTreeParams<F> {
    pub fn new() -> Self {
        Self(DecisionTreeValidParams {
            max_depth: None,
            float_marker: PhantomData,
        })
    }

    /// Sets the optional depth limit enforced by the pruning pass.
    /// `None` leaves the tree unpruned.
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }
}

impl<F: Float> Default for DecisionTreeParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> DecisionTreeRegressor<F> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `max_depth = None` (no pruning)
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> DecisionTreeParams<F> {
        DecisionTreeParams::new()
    }
}

impl<F: Float> ParamGuard for DecisionTreeParams<F> {
    type Checked = DecisionTreeValidParams<F>;
    type Error = RegressionError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
