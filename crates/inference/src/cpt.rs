//! Conditional probability tables.

use crate::config::InferenceConfig;
use crate::domain::{AssignmentProposition, RandomVariable, Value};
use crate::error::ProbError;
use crate::table::{CategoricalDistribution, ProbabilityTable};
use crate::ROUNDING_THRESHOLD;

/// `P(on | parents)` stored as a table over `parents ++ [on]`.
///
/// The `on` variable is the innermost (fastest varying) digit, so each
/// conditioning case occupies a contiguous row of `|D(on)|` cells. Rows are
/// checked to sum to 1 at construction.
///
/// # Example
///
/// ```rust
/// use compositional_inference::{ConditionalProbabilityTable, RandomVariable, Value};
///
/// let rain = RandomVariable::boolean("Rain");
/// let umbrella = RandomVariable::boolean("Umbrella");
/// let sensor = ConditionalProbabilityTable::new(
///     umbrella,
///     vec![0.9, 0.1, 0.2, 0.8],
///     vec![rain],
/// ).unwrap();
///
/// let row = sensor.conditioning_case(&[Value::Bool(false)]).unwrap();
/// assert_eq!(row.values(), &[0.2, 0.8]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalProbabilityTable {
    on: RandomVariable,
    parents: Vec<RandomVariable>,
    table: ProbabilityTable,
}

impl ConditionalProbabilityTable {
    /// Build a CPT from values laid out row-major over `[parents..., on]`.
    ///
    /// # Errors
    ///
    /// Fails if the value count is wrong, `on` is also a parent, a cell is
    /// negative or a row is further than the rounding threshold from 1.
    pub fn new(
        on: RandomVariable,
        values: Vec<f64>,
        parents: Vec<RandomVariable>,
    ) -> Result<Self, ProbError> {
        Self::with_tolerance(on, values, parents, ROUNDING_THRESHOLD)
    }

    /// Like [`new`](Self::new), checking rows against the configured
    /// rounding threshold.
    pub fn from_config(
        on: RandomVariable,
        values: Vec<f64>,
        parents: Vec<RandomVariable>,
        config: &InferenceConfig,
    ) -> Result<Self, ProbError> {
        Self::with_tolerance(on, values, parents, config.rounding_threshold)
    }

    /// Like [`new`](Self::new) with an explicit row-sum tolerance.
    pub fn with_tolerance(
        on: RandomVariable,
        values: Vec<f64>,
        parents: Vec<RandomVariable>,
        tolerance: f64,
    ) -> Result<Self, ProbError> {
        let mut scope = parents.clone();
        scope.push(on.clone());
        let table = ProbabilityTable::new(values, scope)?;

        let width = on.domain().size();
        for (row, cells) in table.values().chunks(width).enumerate() {
            if cells.iter().any(|&p| p < -tolerance) {
                return Err(ProbError::NegativeProbability);
            }
            let sum: f64 = cells.iter().sum();
            if (sum - 1.0).abs() > tolerance {
                return Err(ProbError::RowNotNormalized {
                    context: format!("CPT for {}", on),
                    row,
                    sum,
                });
            }
        }

        Ok(Self { on, parents, table })
    }

    /// The variable this CPT is a distribution over.
    pub fn on(&self) -> &RandomVariable {
        &self.on
    }

    pub fn parents(&self) -> &[RandomVariable] {
        &self.parents
    }

    /// The underlying table over `parents ++ [on]`.
    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    /// All variables of the CPT, parents first.
    pub fn vars(&self) -> &[RandomVariable] {
        self.table.vars()
    }

    /// The cells of one conditioning case, addressed by parent offsets.
    pub(crate) fn row_values(&self, parent_offsets: &[usize]) -> Result<&[f64], ProbError> {
        if parent_offsets.len() != self.parents.len() {
            return Err(ProbError::ArityMismatch {
                expected: self.parents.len(),
                got: parent_offsets.len(),
            });
        }
        let width = self.on.domain().size();
        let mut row = 0;
        for (parent, &offset) in self.parents.iter().zip(parent_offsets) {
            let size = parent.domain().size();
            if offset >= size {
                return Err(ProbError::IndexOutOfBounds {
                    index: offset,
                    size,
                });
            }
            row = row * size + offset;
        }
        let start = row * width;
        Ok(&self.table.values()[start..start + width])
    }

    fn row(&self, parent_offsets: &[usize]) -> Result<CategoricalDistribution, ProbError> {
        ProbabilityTable::new(
            self.row_values(parent_offsets)?.to_vec(),
            vec![self.on.clone()],
        )
    }

    /// The distribution of `on` given parent values in parent order.
    ///
    /// # Errors
    ///
    /// Fails if the number of values differs from the number of parents or a
    /// value is outside its parent's domain.
    pub fn conditioning_case(
        &self,
        parent_values: &[Value],
    ) -> Result<CategoricalDistribution, ProbError> {
        if parent_values.len() != self.parents.len() {
            return Err(ProbError::ArityMismatch {
                expected: self.parents.len(),
                got: parent_values.len(),
            });
        }
        let offsets = self
            .parents
            .iter()
            .zip(parent_values)
            .map(|(p, v)| p.offset_of(v))
            .collect::<Result<Vec<_>, _>>()?;
        self.row(&offsets)
    }

    /// The distribution of `on` given one proposition per parent, in any
    /// order.
    pub fn conditioning_case_for(
        &self,
        parent_values: &[AssignmentProposition],
    ) -> Result<CategoricalDistribution, ProbError> {
        if parent_values.len() != self.parents.len() {
            return Err(ProbError::ArityMismatch {
                expected: self.parents.len(),
                got: parent_values.len(),
            });
        }
        let mut offsets: Vec<Option<usize>> = vec![None; self.parents.len()];
        for ap in parent_values {
            let pos = self
                .parents
                .iter()
                .position(|p| p == ap.variable())
                .ok_or_else(|| ProbError::UnknownVariable {
                    name: ap.variable().name().to_string(),
                })?;
            if offsets[pos].replace(ap.offset()).is_some() {
                return Err(ProbError::DuplicateVariable {
                    name: ap.variable().name().to_string(),
                });
            }
        }
        let offsets: Vec<usize> = offsets.into_iter().flatten().collect();
        self.row(&offsets)
    }

    /// `P(on = v | parents = ...)` for a full assignment of the CPT scope.
    pub fn probability(&self, assignment: &[AssignmentProposition]) -> Result<f64, ProbError> {
        self.table.value_for(assignment)
    }

    /// Fix the evidence variables that belong to this CPT and return a factor
    /// over the remaining ones, keeping scope order.
    ///
    /// Propositions over variables outside the CPT are ignored, so the whole
    /// evidence of a query can be passed to every CPT.
    pub fn factor_for(&self, evidence: &[AssignmentProposition]) -> Result<ProbabilityTable, ProbError> {
        let fixed: Vec<AssignmentProposition> = evidence
            .iter()
            .filter(|ap| self.table.contains(ap.variable()))
            .cloned()
            .collect();
        let free: Vec<RandomVariable> = self
            .table
            .vars()
            .iter()
            .filter(|v| !fixed.iter().any(|ap| ap.variable() == *v))
            .cloned()
            .collect();
        let values: Vec<f64> = self.table.iter_with(&fixed)?.map(|(_, p)| p).collect();
        ProbabilityTable::new(values, free)
    }

    /// Inverse-CDF sample of `on` given parent values in parent order.
    pub fn sample(&self, u: f64, parent_values: &[Value]) -> Result<Value, ProbError> {
        self.conditioning_case(parent_values)?.sample(u)
    }
}
