//! Polynomial least-squares regression
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

use linfa_linalg::qr::LeastSquaresQrInto;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use linfa::dataset::{AsSingleTargets, DatasetBase};
use linfa::traits::{Fit, PredictInplace};
use linfa::Float;

use crate::error::{RegressionError, Result};

/// Expanding a degree-10 basis over a handful of features is already in the
/// hundreds of thousands of columns; anything past this is a configuration
/// mistake, not a model.
const MAX_BASIS_TERMS: usize = 100_000;

/// A polynomial regression model.
///
/// The input features are expanded into the full polynomial basis of the
/// configured degree (a constant bias term, pure powers and, for
/// multivariate input, all cross terms) and a linear model is fitted on the
/// expanded features by minimizing the residual sum of squares, without
/// regularization.
///
/// ### Example
///
/// ```rust
/// use bosque::PolynomialRegression;
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// // y = 2x + 1
/// let dataset = Dataset::new(array![[0.0f64], [1.], [2.]], array![1., 3., 5.]);
/// let model = PolynomialRegression::new(1).fit(&dataset).unwrap();
/// let prediction = model.predict(&array![[3.]]);
///
/// assert!((prediction[0] - 7.0).abs() < 1e-8);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolynomialRegression {
    degree: usize,
}

/// A fitted polynomial regression model which can be used for making
/// predictions.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPolynomialRegression<F> {
    coefficients: Array1<F>,
    degree: usize,
    num_features: usize,
}

impl PolynomialRegression {
    /// Create a polynomial regression model of the given degree. Degree zero
    /// fits a constant, degree one is ordinary least squares on the raw
    /// features.
    pub fn new(degree: usize) -> PolynomialRegression {
        PolynomialRegression { degree }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl Default for PolynomialRegression {
    fn default() -> Self {
        PolynomialRegression::new(2)
    }
}

/// Enumerate the feature-index multisets making up the polynomial basis, by
/// ascending total degree and lexicographically within a degree. The empty
/// multiset is the bias term; `[0, 1]` stands for the cross term `x0 * x1`.
fn basis_terms(num_features: usize, degree: usize) -> Vec<Vec<usize>> {
    let mut terms: Vec<Vec<usize>> = vec![Vec::new()];
    let mut frontier: Vec<Vec<usize>> = vec![Vec::new()];

    for _ in 0..degree {
        let mut next = Vec::new();
        for term in &frontier {
            let start = term.last().copied().unwrap_or(0);
            for feature_idx in start..num_features {
                let mut extended = term.clone();
                extended.push(feature_idx);
                next.push(extended);
            }
        }
        terms.extend(next.iter().cloned());
        frontier = next;
    }

    terms
}

/// Number of basis terms, `C(num_features + degree, degree)`, or `None` on
/// overflow. Computed before enumerating so an absurd degree is rejected
/// without attempting the expansion.
fn num_basis_terms(num_features: usize, degree: usize) -> Option<usize> {
    let mut count: usize = 1;
    for i in 1..=degree {
        // C(n + i, i) = C(n + i - 1, i - 1) * (n + i) / i stays integral
        count = count.checked_mul(num_features.checked_add(i)?)? / i;
    }
    Some(count)
}

/// Map the raw features into the polynomial basis: one output column per
/// basis term, each the product of its feature columns.
fn expand<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>, degree: usize) -> Array2<F> {
    let terms = basis_terms(x.ncols(), degree);
    let mut expanded = Array2::ones((x.nrows(), terms.len()));

    for (j, term) in terms.iter().enumerate() {
        for &feature_idx in term {
            let column = x.column(feature_idx);
            let mut out = expanded.column_mut(j);
            out *= &column;
        }
    }

    expanded
}

/// Find the coefficients minimizing the 2-norm of `X b - y` with the QR
/// least-squares solver from linfa-linalg
fn solve_least_squares<F: Float>(mut x: Array2<F>, mut y: Array1<F>) -> Result<Array1<F>> {
    let (x, y) = (x.view_mut(), y.view_mut());

    let solution = x
        .least_squares_into(y.insert_axis(Axis(1)))?
        .remove_axis(Axis(1));

    Ok(solution)
}

impl<F: Float, D: Data<Elem = F>, T: AsSingleTargets<Elem = F>>
    Fit<ArrayBase<D, Ix2>, T, RegressionError> for PolynomialRegression
{
    type Object = FittedPolynomialRegression<F>;

    /// Fit a polynomial regression model given a feature matrix `X` of shape
    /// `(n_samples, n_features)` and a target variable `y` of shape
    /// `(n_samples)`.
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
                "cannot fit a polynomial model on an empty dataset".to_string(),
            ));
        }

        match num_basis_terms(records.ncols(), self.degree) {
            Some(n_terms) if n_terms <= MAX_BASIS_TERMS => (),
            _ => {
                return Err(RegressionError::InvalidParams(format!(
                    "degree {} over {} features expands past {} basis terms",
                    self.degree,
                    records.ncols(),
                    MAX_BASIS_TERMS
                )))
            }
        }

        let expanded = expand(records, self.degree);
        let coefficients = solve_least_squares(expanded, targets.to_owned())?;

        Ok(FittedPolynomialRegression {
            coefficients,
            degree: self.degree,
            num_features: records.ncols(),
        })
    }
}

impl<F: Float> FittedPolynomialRegression<F> {
    /// Get the fitted coefficients, ordered like the basis terms: bias
    /// first, then terms of ascending degree
    pub fn coefficients(&self) -> &Array1<F> {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for FittedPolynomialRegression<F>
{
    /// Re-expand `x` with the fitted basis and apply the coefficients.
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.num_features,
            "The number of features must match the number the model was fitted with."
        );

        *y = expand(x, self.degree).dot(&self.coefficients);
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros(x.nrows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use linfa::prelude::*;
    use ndarray::array;

    #[test]
    fn bivariate_degree_two_basis() {
        // expected columns: 1, a, b, a^2, ab, b^2
        let terms = basis_terms(2, 2);
        assert_eq!(
            terms,
            vec![
                vec![],
                vec![0],
                vec![1],
                vec![0, 0],
                vec![0, 1],
                vec![1, 1]
            ]
        );

        let expanded = expand(&array![[2., 3.]], 2);
        assert_abs_diff_eq!(
            expanded,
            array![[1., 2., 3., 4., 6., 9.]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn basis_size_matches_closed_form() {
        assert_eq!(num_basis_terms(2, 2), Some(6));
        assert_eq!(num_basis_terms(1, 3), Some(4));
        assert_eq!(num_basis_terms(3, 0), Some(1));
        assert_eq!(basis_terms(3, 4).len(), num_basis_terms(3, 4).unwrap());
    }

    #[test]
    /// A noiseless linear relation is recovered exactly by a degree-one model
    fn recovers_linear_relation() {
        let dataset = Dataset::new(
            array![[0.], [1.], [2.], [3.]],
            array![1., 3., 5., 7.], // y = 2x + 1
        );
        let model = PolynomialRegression::new(1).fit(&dataset).unwrap();

        assert_abs_diff_eq!(model.coefficients(), &array![1., 2.], epsilon = 1e-8);

        let prediction = model.predict(dataset.records());
        assert_abs_diff_eq!(prediction, array![1., 3., 5., 7.], epsilon = 1e-8);
    }

    #[test]
    /// f(x) = (x + 1)^2 requires the quadratic term
    fn fits_a_parabola() {
        let dataset = Dataset::new(
            array![[0.], [1.], [2.], [3.], [4.]],
            array![1., 4., 9., 16., 25.],
        );
        let model = PolynomialRegression::new(2).fit(&dataset).unwrap();

        assert_abs_diff_eq!(model.coefficients(), &array![1., 2., 1.], epsilon = 1e-7);
        assert_abs_diff_eq!(
            model.predict(&array![[5.]])[0],
            36.,
            epsilon = 1e-6
        );
    }

    #[test]
    /// A degree-zero model reduces to predicting the target mean
    fn degree_zero_predicts_the_mean() {
        let dataset = Dataset::new(array![[10.], [20.], [30.]], array![1., 2., 6.]);
        let model = PolynomialRegression::new(0).fit(&dataset).unwrap();

        assert_abs_diff_eq!(model.predict(&array![[5.]])[0], 3.0, epsilon = 1e-8);
    }

    #[test]
    fn rejects_absurd_expansion() {
        let dataset = Dataset::new(
            ndarray::Array2::<f64>::zeros((5, 10)),
            ndarray::Array1::<f64>::zeros(5),
        );
        let res = PolynomialRegression::new(30).fit(&dataset);
        assert!(matches!(res, Err(RegressionError::InvalidParams(_))));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let dataset = DatasetBase::new(array![[1.], [2.], [3.]], array![1., 2.]);
        let res = PolynomialRegression::new(1).fit(&dataset);
        assert!(matches!(res, Err(RegressionError::ShapeMismatch(_))));
    }
}
