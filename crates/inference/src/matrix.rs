//! Dense real matrices for the HMM message-passing algorithms.
//!
//! Forward-backward works on column vectors (`n × 1`), diagonal sensor
//! matrices and the transition matrix. Fixed-lag smoothing additionally needs
//! inverses, computed here by Gauss-Jordan elimination with partial pivoting.

use std::fmt;
use std::ops::Index;

use crate::error::ProbError;

/// Pivots smaller than this are treated as zero when inverting.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Row-major dense matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Build a matrix from rows.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no rows or columns, or rows differ in
    /// length.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ProbError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if n_rows == 0 || n_cols == 0 {
            return Err(ProbError::EmptyKernel);
        }
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(ProbError::RaggedMatrix);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Wrap already-validated row-major data.
    pub(crate) fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(rows * cols, data.len());
        Self { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Square matrix with `diag` on the diagonal.
    pub fn diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diag.iter().enumerate() {
            m.data[i * n + i] = d;
        }
        m
    }

    /// Column vector (`n × 1`).
    pub fn column(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// Column vector of ones, the initial backward message.
    pub fn ones_column(n: usize) -> Self {
        Self::column(&vec![1.0; n])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Entries of a column vector, or the flattened data of any matrix.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        t
    }

    /// Matrix product `self · other`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix, ProbError> {
        if self.cols != other.rows {
            return Err(ProbError::ShapeMismatch {
                expected: self.cols,
                got: other.rows,
            });
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.data[k * other.cols + j];
                }
            }
        }
        Ok(out)
    }

    /// Entry-wise product of two matrices of the same shape.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix, ProbError> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(ProbError::ShapeMismatch {
                expected: self.data.len(),
                got: other.data.len(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a * b)
            .collect();
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Inverse by Gauss-Jordan elimination.
    ///
    /// # Errors
    ///
    /// Returns [`ProbError::SingularMatrix`] when a pivot vanishes, and
    /// [`ProbError::ShapeMismatch`] for non-square input.
    pub fn inverse(&self) -> Result<Matrix, ProbError> {
        if self.rows != self.cols {
            return Err(ProbError::ShapeMismatch {
                expected: self.rows,
                got: self.cols,
            });
        }
        let n = self.rows;
        let mut a = self.data.clone();
        let mut inv = Self::identity(n).data;

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a[x * n + col].abs().total_cmp(&a[y * n + col].abs()))
                .unwrap_or(col);
            if a[pivot * n + col].abs() < SINGULAR_EPSILON {
                return Err(ProbError::SingularMatrix);
            }
            if pivot != col {
                for j in 0..n {
                    a.swap(pivot * n + j, col * n + j);
                    inv.swap(pivot * n + j, col * n + j);
                }
            }

            let p = a[col * n + col];
            for j in 0..n {
                a[col * n + j] /= p;
                inv[col * n + j] /= p;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[row * n + j] -= factor * a[col * n + j];
                    inv[row * n + j] -= factor * inv[col * n + j];
                }
            }
        }

        Ok(Self {
            rows: n,
            cols: n,
            data: inv,
        })
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            let row: Vec<String> = (0..self.cols)
                .map(|j| format!("{:.4}", self.data[i * self.cols + j]))
                .collect();
            writeln!(f, "[{}]", row.join(", "))?;
        }
        Ok(())
    }
}
