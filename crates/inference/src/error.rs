//! Error types for probability operations.

use thiserror::Error;

/// Errors that can occur when building models or answering queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbError {
    /// Distribution doesn't sum to 1.
    #[error("Distribution not normalized: sum = {sum} (expected 1.0)")]
    NotNormalized { sum: f64 },

    /// A row of a CPT or kernel doesn't sum to 1.
    #[error("Row {row} of {context} not normalized: sum = {sum} (expected 1.0)")]
    RowNotNormalized {
        context: String,
        row: usize,
        sum: f64,
    },

    /// Negative probability encountered.
    #[error("Negative probability encountered")]
    NegativeProbability,

    /// All weights are zero (can't resample or normalize).
    #[error("Cannot normalize: all weights are zero")]
    ZeroWeights,

    /// A domain was declared without any values.
    #[error("Domain cannot be empty")]
    EmptyDomain,

    /// A domain lists the same value twice.
    #[error("Domain value {value} is listed more than once")]
    DuplicateDomainValue { value: String },

    /// Value table has the wrong number of cells for its scope.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// Wrong number of values supplied for an assignment or conditioning case.
    #[error("Arity mismatch: expected {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    /// A variable is not part of the table, CPT or network being addressed.
    #[error("Random variable {name} is not in scope")]
    UnknownVariable { name: String },

    /// A variable appears more than once where a set is expected.
    #[error("Random variable {name} appears more than once")]
    DuplicateVariable { name: String },

    /// A value is not part of a variable's domain.
    #[error("Value {value} is not in the domain of {variable}")]
    ValueNotInDomain { variable: String, value: String },

    /// An explicit product ordering doesn't cover exactly both scopes.
    #[error("Product variable ordering is inconsistent with the operand scopes")]
    InconsistentScope,

    /// Divisor scope is not contained in the dividend scope.
    #[error("Divisor scope must be a subset of the dividend scope")]
    NotASubset,

    /// A node references a parent that is not in the network.
    #[error("Node {variable} references missing parent {parent}")]
    MissingParent { variable: String, parent: String },

    /// The network graph contains a directed cycle.
    #[error("Bayesian network contains a cycle through {variable}")]
    CyclicNetwork { variable: String },

    /// A matrix that must be inverted is singular.
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    /// Kernel cannot be empty.
    #[error("Kernel cannot be empty")]
    EmptyKernel,

    /// Rows have different lengths.
    #[error("Kernel has ragged rows (rows have different lengths)")]
    RaggedMatrix,

    /// Evidence supplied to a temporal model is malformed.
    #[error("Invalid evidence: {reason}")]
    InvalidEvidence { reason: String },

    /// Configuration could not be parsed or is out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}
