//!
//! # Bagged regression trees and polynomial regression
//!
//! `bosque` provides pure Rust implementations of two from-scratch
//! regression algorithms built on the [linfa](https://github.com/rust-ml/linfa)
//! dataset and model traits:
//!
//! * [`RandomForestRegressor`] — a bagged ensemble of variance-reduction
//!   regression trees ([`DecisionTreeRegressor`]): every member tree is
//!   grown on an independent bootstrap resample of the training data by
//!   greedy threshold search over the continuous features, pruned to a
//!   configured depth, and the ensemble predicts the mean of the member
//!   predictions.
//! * [`PolynomialRegression`] — a polynomial basis expansion followed by a
//!   least-squares solve, the classical closed-form baseline to compare the
//!   forest against.
//!
//! Models are configured through hyperparameter builders, fitted on
//! [`linfa::Dataset`]s with [`linfa::traits::Fit`] and queried through
//! [`linfa::traits::Predict`], so the usual dataset utilities and regression
//! metrics from the linfa ecosystem apply directly.
//!

mod error;
mod polynomial;
mod regression_trees;

pub use error::{RegressionError, Result};
pub use polynomial::{FittedPolynomialRegression, PolynomialRegression};
pub use regression_trees::*;
