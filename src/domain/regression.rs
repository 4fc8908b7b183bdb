use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegressionError {
    #[error("not enough observations: got {observations}, need at least {required}")]
    NotEnoughObservations { observations: usize, required: usize },
    #[error("feature rows must all have {expected} values")]
    RaggedFeatures { expected: usize },
    #[error("feature matrix is singular")]
    Singular,
}

/// Ordinary least squares model with an intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fits through the normal equations `(XᵀX) β = Xᵀy` on standardized
    /// features, then maps the coefficients back to the original scale.
    pub fn fit(features: &[Vec<f64>], targets: &[f64]) -> Result<Self, RegressionError> {
        let width = features.first().map_or(0, Vec::len);
        let required = width + 1;
        if features.len() != targets.len() || features.len() < required {
            return Err(RegressionError::NotEnoughObservations {
                observations: features.len().min(targets.len()),
                required,
            });
        }
        if features.iter().any(|row| row.len() != width) {
            return Err(RegressionError::RaggedFeatures { expected: width });
        }

        let count = features.len() as f64;
        let means: Vec<f64> = (0..width)
            .map(|j| features.iter().map(|row| row[j]).sum::<f64>() / count)
            .collect();
        let spreads: Vec<f64> = (0..width)
            .map(|j| {
                let variance = features
                    .iter()
                    .map(|row| (row[j] - means[j]).powi(2))
                    .sum::<f64>()
                    / count;
                variance.sqrt()
            })
            .collect();
        if spreads.iter().any(|spread| *spread == 0.0) {
            return Err(RegressionError::Singular);
        }

        let size = width + 1;
        let mut gram = vec![vec![0.0; size]; size];
        let mut moment = vec![0.0; size];

        for (row, &target) in features.iter().zip(targets) {
            let augmented: Vec<f64> = std::iter::once(1.0)
                .chain((0..width).map(|j| (row[j] - means[j]) / spreads[j]))
                .collect();
            for i in 0..size {
                moment[i] += augmented[i] * target;
                for j in 0..size {
                    gram[i][j] += augmented[i] * augmented[j];
                }
            }
        }

        let beta = solve(gram, moment)?;
        let coefficients: Vec<f64> = beta[1..]
            .iter()
            .zip(&spreads)
            .map(|(scaled, spread)| scaled / spread)
            .collect();
        let intercept = beta[0]
            - coefficients
                .iter()
                .zip(&means)
                .map(|(coefficient, mean)| coefficient * mean)
                .sum::<f64>();

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(coefficient, value)| coefficient * value)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>, RegressionError> {
    let size = rhs.len();

    for column in 0..size {
        let pivot = (column..size)
            .max_by(|&a, &b| matrix[a][column].abs().total_cmp(&matrix[b][column].abs()))
            .ok_or(RegressionError::Singular)?;

        let scale = matrix
            .iter()
            .map(|row| row[column].abs())
            .fold(0.0_f64, f64::max);
        if scale == 0.0 || matrix[pivot][column].abs() <= scale * 1e-12 {
            return Err(RegressionError::Singular);
        }

        matrix.swap(column, pivot);
        rhs.swap(column, pivot);

        for row in column + 1..size {
            let factor = matrix[row][column] / matrix[column][column];
            if factor == 0.0 {
                continue;
            }
            for k in column..size {
                matrix[row][k] -= factor * matrix[column][k];
            }
            rhs[row] -= factor * rhs[column];
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size)
            .map(|k| matrix[row][k] * solution[k])
            .sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    Ok(solution)
}

/// Seeded shuffle, then the first `ceil(len * test_fraction)` items become the test set.
/// Returns `(train, test)`.
pub fn train_test_split<T: Clone>(rows: &[T], test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut shuffled = rows.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let test_len = ((rows.len() as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let train = shuffled.split_off(test_len.min(shuffled.len()));

    (train, shuffled)
}

pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return None;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let total: f64 = actual.iter().map(|value| (value - mean).powi(2)).sum();
    if total == 0.0 {
        return None;
    }
    let residual: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Some(1.0 - residual / total)
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return None;
    }

    Some(
        actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / actual.len() as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::{LinearModel, RegressionError, mean_absolute_error, r_squared, train_test_split};

    #[test]
    fn recovers_exact_linear_relationship() {
        let features = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 3.0],
            vec![4.0, 1.0],
        ];
        let targets: Vec<f64> = features
            .iter()
            .map(|row| 10.0 + 2.0 * row[0] - 3.0 * row[1])
            .collect();

        let model = LinearModel::fit(&features, &targets).expect("fit should succeed");

        assert!((model.intercept - 10.0).abs() < 1e-9);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 3.0).abs() < 1e-9);
        assert!((model.predict(&[5.0, 5.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_too_few_observations() {
        let result = LinearModel::fit(&[vec![1.0, 2.0]], &[3.0]);
        assert_eq!(
            result,
            Err(RegressionError::NotEnoughObservations {
                observations: 1,
                required: 3,
            })
        );
    }

    #[test]
    fn rejects_collinear_features() {
        let features = vec![
            vec![1.0, 2.0],
            vec![2.0, 4.0],
            vec![3.0, 6.0],
            vec![4.0, 8.0],
        ];
        let result = LinearModel::fit(&features, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(result, Err(RegressionError::Singular));
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let rows: Vec<u32> = (0..10).collect();

        let (train_a, test_a) = train_test_split(&rows, 0.2, 42);
        let (train_b, test_b) = train_test_split(&rows, 0.2, 42);

        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);

        let mut all: Vec<u32> = train_a.iter().chain(&test_a).copied().collect();
        all.sort_unstable();
        assert_eq!(all, rows);
    }

    #[test]
    fn scores_predictions() {
        let actual = [1.0, 2.0, 3.0];
        assert_eq!(r_squared(&actual, &actual), Some(1.0));
        assert_eq!(mean_absolute_error(&actual, &[2.0, 2.0, 2.0]), Some(2.0 / 3.0));
        assert_eq!(r_squared(&[1.0, 1.0], &[1.0, 1.0]), None);
    }
}
