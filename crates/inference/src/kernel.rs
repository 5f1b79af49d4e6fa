//! Markov kernels (stochastic maps) between finite state sets.
//!
//! The temporal models use kernels for their transition model
//! (`state → state`) and sensor model (`state → evidence value`).

use crate::config::InferenceConfig;
use crate::error::ProbError;
use crate::matrix::Matrix;
use crate::ROUNDING_THRESHOLD;

/// A Markov kernel from a finite set X to a finite set Y.
///
/// Represented as a row-stochastic matrix where:
/// - `k[i][j]` = P(output = j | input = i)
/// - Each row sums to 1
///
/// Composition is matrix multiplication and the identity kernel is the
/// identity matrix.
///
/// # Example
///
/// ```rust
/// use compositional_inference::Kernel;
///
/// // Rain persistence: true=0, false=1
/// let transition = Kernel::new(vec![
///     vec![0.7, 0.3],
///     vec![0.3, 0.7],
/// ]).unwrap();
///
/// let tomorrow = transition.apply(&[1.0, 0.0]).unwrap();
/// assert!((tomorrow[0] - 0.7).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    /// Row-stochastic matrix: `k[i][j]` = P(output=j | input=i)
    pub k: Vec<Vec<f64>>,
    /// Number of input states
    pub n_inputs: usize,
    /// Number of output states
    pub n_outputs: usize,
}

impl Kernel {
    /// Create a new kernel from a row-stochastic matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The matrix is empty
    /// - Rows have different lengths
    /// - Any row doesn't sum to 1 (within tolerance)
    pub fn new(k: Vec<Vec<f64>>) -> Result<Self, ProbError> {
        Self::with_tolerance(k, ROUNDING_THRESHOLD)
    }

    /// Like [`new`](Self::new) with the configured rounding threshold.
    pub fn from_config(k: Vec<Vec<f64>>, config: &InferenceConfig) -> Result<Self, ProbError> {
        Self::with_tolerance(k, config.rounding_threshold)
    }

    /// Like [`new`](Self::new) with an explicit row-sum tolerance.
    pub fn with_tolerance(k: Vec<Vec<f64>>, tolerance: f64) -> Result<Self, ProbError> {
        let n_inputs = k.len();
        let n_outputs = k.first().map(Vec::len).unwrap_or(0);
        if n_inputs == 0 || n_outputs == 0 {
            return Err(ProbError::EmptyKernel);
        }

        for (i, row) in k.iter().enumerate() {
            if row.len() != n_outputs {
                return Err(ProbError::RaggedMatrix);
            }
            if row.iter().any(|&x| x < -tolerance) {
                return Err(ProbError::NegativeProbability);
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > tolerance {
                return Err(ProbError::RowNotNormalized {
                    context: "kernel".to_string(),
                    row: i,
                    sum,
                });
            }
        }

        Ok(Self {
            k,
            n_inputs,
            n_outputs,
        })
    }

    /// Create the identity kernel: deterministically map i to i.
    pub fn identity(n: usize) -> Self {
        let k: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let mut row = vec![0.0; n];
                row[i] = 1.0;
                row
            })
            .collect();
        Self {
            k,
            n_inputs: n,
            n_outputs: n,
        }
    }

    /// Compose two kernels: self ; other.
    ///
    /// If self: n → m and other: m → p, then (self ; other): n → p, with
    /// `(K ; L)(·|x) = Σᵧ K(y|x) · L(·|y)`.
    ///
    /// # Errors
    ///
    /// Returns an error if shapes don't match (self.n_outputs ≠ other.n_inputs).
    pub fn compose(&self, other: &Kernel) -> Result<Kernel, ProbError> {
        if self.n_outputs != other.n_inputs {
            return Err(ProbError::ShapeMismatch {
                expected: self.n_outputs,
                got: other.n_inputs,
            });
        }

        let mut result = vec![vec![0.0; other.n_outputs]; self.n_inputs];
        for (i, result_row) in result.iter_mut().enumerate() {
            for (k, result_elem) in result_row.iter_mut().enumerate() {
                *result_elem = (0..self.n_outputs)
                    .map(|j| self.k[i][j] * other.k[j][k])
                    .sum();
            }
        }

        Ok(Kernel {
            k: result,
            n_inputs: self.n_inputs,
            n_outputs: other.n_outputs,
        })
    }

    /// Push a distribution over inputs through the kernel.
    ///
    /// `K(p)[j] = Σᵢ p[i] · K[i,j]`
    pub fn apply(&self, p: &[f64]) -> Result<Vec<f64>, ProbError> {
        if p.len() != self.n_inputs {
            return Err(ProbError::ShapeMismatch {
                expected: self.n_inputs,
                got: p.len(),
            });
        }
        Ok((0..self.n_outputs)
            .map(|j| (0..self.n_inputs).map(|i| p[i] * self.k[i][j]).sum())
            .collect())
    }

    /// Get a specific conditional probability P(output=j | input=i).
    pub fn conditional(&self, input: usize, output: usize) -> Result<f64, ProbError> {
        let row = self.k.get(input).ok_or(ProbError::IndexOutOfBounds {
            index: input,
            size: self.n_inputs,
        })?;
        row.get(output).copied().ok_or(ProbError::IndexOutOfBounds {
            index: output,
            size: self.n_outputs,
        })
    }

    /// P(output = j | input = i) for every input i.
    pub fn column(&self, output: usize) -> Result<Vec<f64>, ProbError> {
        if output >= self.n_outputs {
            return Err(ProbError::IndexOutOfBounds {
                index: output,
                size: self.n_outputs,
            });
        }
        Ok(self.k.iter().map(|row| row[output]).collect())
    }

    /// The kernel as a dense matrix, inputs on rows.
    pub fn to_matrix(&self) -> Matrix {
        Matrix::from_row_major(self.n_inputs, self.n_outputs, self.k.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_new_valid() {
        let k = Kernel::new(vec![vec![0.3, 0.7], vec![0.5, 0.5]]).unwrap();
        assert_eq!(k.n_inputs, 2);
        assert_eq!(k.n_outputs, 2);
    }

    #[test]
    fn test_kernel_new_not_normalized() {
        let result = Kernel::new(vec![vec![0.3, 0.6], vec![0.5, 0.5]]);
        assert!(matches!(
            result,
            Err(ProbError::RowNotNormalized { row: 0, .. })
        ));
    }

    #[test]
    fn test_kernel_tolerance_from_config() {
        let rows = vec![vec![0.7, 0.299], vec![0.3, 0.7]];
        assert!(Kernel::from_config(rows.clone(), &InferenceConfig::new()).is_err());
        let loose = InferenceConfig::new().with_rounding_threshold(1e-2);
        assert!(Kernel::from_config(rows, &loose).is_ok());
    }

    #[test]
    fn test_kernel_apply() {
        let sensor = Kernel::new(vec![vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        let result = sensor.apply(&[0.5, 0.5]).unwrap();
        assert!((result[0] - 0.55).abs() < 1e-12);
        assert!((result[1] - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_compose() {
        let k1 = Kernel::new(vec![vec![0.5, 0.5], vec![0.3, 0.7]]).unwrap();
        let k2 = Kernel::new(vec![vec![0.6, 0.4], vec![0.2, 0.8]]).unwrap();
        let composed = k1.compose(&k2).unwrap();

        // [0, 0] = 0.5 * 0.6 + 0.5 * 0.2 = 0.4
        assert!((composed.k[0][0] - 0.4).abs() < 1e-12);
        assert!((composed.k[0][1] - 0.6).abs() < 1e-12);

        let id = Kernel::identity(2);
        assert_eq!(id.compose(&k1).unwrap(), k1);
    }

    #[test]
    fn test_sensor_column() {
        let sensor = Kernel::new(vec![vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        assert_eq!(sensor.column(0).unwrap(), vec![0.9, 0.2]);
        assert!(sensor.column(2).is_err());
        assert_eq!(sensor.conditional(1, 1).unwrap(), 0.8);
    }

    #[test]
    fn test_to_matrix() {
        let k = Kernel::new(vec![vec![0.7, 0.3], vec![0.3, 0.7]]).unwrap();
        let m = k.to_matrix();
        assert_eq!(m[(0, 1)], 0.3);
        assert_eq!(m.rows(), 2);
    }
}
