//! Probability tables over ordered sets of discrete random variables.
//!
//! A [`ProbabilityTable`] stores one `f64` per joint assignment of its scope
//! in a flat vector. The offset of an assignment is a mixed-radix number whose
//! digits are the domain offsets of the scope variables, most significant
//! first:
//!
//! ```text
//! index = ((o₀ · |D₁| + o₁) · |D₂| + o₂) ...
//! ```
//!
//! For two booleans `[X, Y]` the cells are laid out as
//! `(t,t) (t,f) (f,t) (f,f)`. Every algorithm in this crate relies on this
//! order, so scopes are always ordered `Vec`s, never hashed sets.

use std::fmt;

use crate::domain::{AssignmentProposition, RandomVariable, Value};
use crate::error::ProbError;
use crate::ROUNDING_THRESHOLD;

/// A categorical distribution is a probability table whose cells sum to 1.
pub type CategoricalDistribution = ProbabilityTable;

/// Values associated with every joint assignment of an ordered scope.
///
/// Tables are values: operations such as [`normalize`](Self::normalize),
/// [`pointwise_product`](Self::pointwise_product) and
/// [`divide_by`](Self::divide_by) return new tables and never touch their
/// operands.
///
/// # Example
///
/// ```rust
/// use compositional_inference::{ProbabilityTable, RandomVariable};
///
/// let x = RandomVariable::boolean("X");
/// let y = RandomVariable::boolean("Y");
/// let t = ProbabilityTable::new(vec![1.0, 2.0, 3.0, 4.0], vec![x.clone(), y.clone()]).unwrap();
///
/// // X = false, Y = true lives at offset 1 * 2 + 0 = 2
/// let p = t.value_for(&[x.assign(false).unwrap(), y.assign(true).unwrap()]).unwrap();
/// assert_eq!(p, 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    vars: Vec<RandomVariable>,
    radices: Vec<usize>,
    values: Vec<f64>,
}

/// Number of cells needed to hold every joint assignment of `vars`.
pub fn expected_size(vars: &[RandomVariable]) -> usize {
    vars.iter().map(|v| v.domain().size()).product()
}

fn check_distinct(vars: &[RandomVariable]) -> Result<(), ProbError> {
    for (i, v) in vars.iter().enumerate() {
        if vars[..i].contains(v) {
            return Err(ProbError::DuplicateVariable {
                name: v.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Inverse-CDF selection over `weights`.
///
/// Returns the first offset whose cumulative mass reaches `u`. Float drift
/// at the top end resolves to the last offset.
pub(crate) fn sample_offset(weights: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if u <= cumulative {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

impl ProbabilityTable {
    /// Create a table (not necessarily normalized) from values laid out in
    /// mixed-radix order over `vars`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable repeats or the value count doesn't match
    /// the product of the domain sizes.
    pub fn new(values: Vec<f64>, vars: Vec<RandomVariable>) -> Result<Self, ProbError> {
        check_distinct(&vars)?;
        let expected = expected_size(&vars);
        if values.len() != expected {
            return Err(ProbError::ShapeMismatch {
                expected,
                got: values.len(),
            });
        }
        let radices = vars.iter().map(|v| v.domain().size()).collect();
        Ok(Self {
            vars,
            radices,
            values,
        })
    }

    /// An all-zero table over `vars`.
    pub fn zeros(vars: Vec<RandomVariable>) -> Result<Self, ProbError> {
        let size = expected_size(&vars);
        Self::new(vec![0.0; size], vars)
    }

    /// Create a validated categorical distribution.
    ///
    /// # Errors
    ///
    /// In addition to the checks of [`new`](Self::new), rejects negative
    /// cells and totals further than the rounding threshold from 1.
    pub fn distribution(values: Vec<f64>, vars: Vec<RandomVariable>) -> Result<Self, ProbError> {
        let table = Self::new(values, vars)?;
        if table.values.iter().any(|&p| p < -ROUNDING_THRESHOLD) {
            return Err(ProbError::NegativeProbability);
        }
        let sum = table.sum();
        if (sum - 1.0).abs() > ROUNDING_THRESHOLD {
            return Err(ProbError::NotNormalized { sum });
        }
        Ok(table)
    }

    /// The ordered scope of this table.
    pub fn vars(&self) -> &[RandomVariable] {
        &self.vars
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Tables always hold at least one cell; an empty scope holds a scalar.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, var: &RandomVariable) -> bool {
        self.vars.contains(var)
    }

    /// Position of `var` within the scope.
    pub fn position(&self, var: &RandomVariable) -> Option<usize> {
        self.vars.iter().position(|v| v == var)
    }

    fn position_or_err(&self, var: &RandomVariable) -> Result<usize, ProbError> {
        self.position(var).ok_or_else(|| ProbError::UnknownVariable {
            name: var.name().to_string(),
        })
    }

    /// Compose a flat index from per-variable domain offsets.
    pub fn index_of_offsets(&self, offsets: &[usize]) -> Result<usize, ProbError> {
        if offsets.len() != self.radices.len() {
            return Err(ProbError::ArityMismatch {
                expected: self.radices.len(),
                got: offsets.len(),
            });
        }
        let mut idx = 0;
        for (&offset, &radix) in offsets.iter().zip(&self.radices) {
            if offset >= radix {
                return Err(ProbError::IndexOutOfBounds {
                    index: offset,
                    size: radix,
                });
            }
            idx = idx * radix + offset;
        }
        Ok(idx)
    }

    /// Decompose a flat index into per-variable domain offsets.
    pub fn offsets_of_index(&self, mut idx: usize) -> Vec<usize> {
        let mut offsets = vec![0; self.radices.len()];
        for i in (0..self.radices.len()).rev() {
            offsets[i] = idx % self.radices[i];
            idx /= self.radices[i];
        }
        offsets
    }

    /// Look up a cell by values given in scope order.
    pub fn value(&self, values: &[Value]) -> Result<f64, ProbError> {
        if values.len() != self.vars.len() {
            return Err(ProbError::ArityMismatch {
                expected: self.vars.len(),
                got: values.len(),
            });
        }
        let offsets = self
            .vars
            .iter()
            .zip(values)
            .map(|(var, value)| var.offset_of(value))
            .collect::<Result<Vec<_>, _>>()?;
        self.value_at(&offsets)
    }

    /// Look up a cell by domain offsets given in scope order.
    pub fn value_at(&self, offsets: &[usize]) -> Result<f64, ProbError> {
        let idx = self.index_of_offsets(offsets)?;
        Ok(self.values[idx])
    }

    /// Look up a cell by propositions covering the whole scope, in any order.
    pub fn value_for(&self, assignments: &[AssignmentProposition]) -> Result<f64, ProbError> {
        if assignments.len() != self.vars.len() {
            return Err(ProbError::ArityMismatch {
                expected: self.vars.len(),
                got: assignments.len(),
            });
        }
        let mut offsets: Vec<Option<usize>> = vec![None; self.vars.len()];
        for ap in assignments {
            let pos = self.position_or_err(ap.variable())?;
            if offsets[pos].replace(ap.offset()).is_some() {
                return Err(ProbError::DuplicateVariable {
                    name: ap.variable().name().to_string(),
                });
            }
        }
        let offsets: Vec<usize> = offsets.into_iter().flatten().collect();
        self.value_at(&offsets)
    }

    /// Overwrite the cell at flat index `idx`.
    pub fn set_value(&mut self, idx: usize, value: f64) -> Result<(), ProbError> {
        let size = self.values.len();
        let cell = self
            .values
            .get_mut(idx)
            .ok_or(ProbError::IndexOutOfBounds { index: idx, size })?;
        *cell = value;
        Ok(())
    }

    /// Total mass of the table.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Whether the total mass is within `tolerance` of 1.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.sum() - 1.0).abs() <= tolerance
    }

    /// Divide every cell by the total mass.
    ///
    /// A table with zero total mass is returned unchanged (all zero); callers
    /// that need a proper distribution must check for that case.
    pub fn normalize(&self) -> Self {
        let mut out = self.clone();
        let sum = self.sum();
        if sum != 0.0 && sum != 1.0 {
            for p in &mut out.values {
                *p /= sum;
            }
        }
        out
    }

    /// Iterate over every joint assignment with its value, in index order.
    pub fn iter(&self) -> TableIter<'_> {
        TableIter {
            table: self,
            odometer: Odometer::new(self.radices.clone(), vec![None; self.radices.len()]),
        }
    }

    /// Iterate over the joint assignments consistent with `fixed`, in index
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if a fixed proposition names a variable outside the
    /// scope, or fixes a variable twice to different values.
    pub fn iter_with(&self, fixed: &[AssignmentProposition]) -> Result<TableIter<'_>, ProbError> {
        let mut pinned: Vec<Option<usize>> = vec![None; self.vars.len()];
        for ap in fixed {
            let pos = self.position_or_err(ap.variable())?;
            match pinned[pos] {
                Some(existing) if existing != ap.offset() => {
                    return Err(ProbError::DuplicateVariable {
                        name: ap.variable().name().to_string(),
                    })
                }
                _ => pinned[pos] = Some(ap.offset()),
            }
        }
        Ok(TableIter {
            table: self,
            odometer: Odometer::new(self.radices.clone(), pinned),
        })
    }

    /// Sum out `vars`, keeping the remaining scope in its original order.
    pub fn sum_out(&self, vars: &[RandomVariable]) -> Result<Self, ProbError> {
        for v in vars {
            self.position_or_err(v)?;
        }
        let keep: Vec<RandomVariable> = self
            .vars
            .iter()
            .filter(|v| !vars.contains(v))
            .cloned()
            .collect();
        self.marginal(&keep)
    }

    /// Marginal table over `keep`, in the order given.
    pub fn marginal(&self, keep: &[RandomVariable]) -> Result<Self, ProbError> {
        let positions = keep
            .iter()
            .map(|v| self.position_or_err(v))
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = Self::zeros(keep.to_vec())?;
        let mut odometer = Odometer::new(self.radices.clone(), vec![None; self.radices.len()]);
        while let Some(digits) = odometer.current() {
            let src = self.index_of_offsets(digits)?;
            let kept: Vec<usize> = positions.iter().map(|&p| digits[p]).collect();
            let dst = out.index_of_offsets(&kept)?;
            out.values[dst] += self.values[src];
            odometer.advance();
        }
        Ok(out)
    }

    /// Pointwise product; the result scope is this table's variables followed
    /// by the other table's variables not already present.
    ///
    /// Because the result ordering depends on the receiver, `a × b` and
    /// `b × a` hold the same function with different layouts. Use
    /// [`pointwise_product_pos`](Self::pointwise_product_pos) to fix it.
    pub fn pointwise_product(&self, other: &Self) -> Result<Self, ProbError> {
        let mut order = self.vars.clone();
        order.extend(other.vars.iter().filter(|v| !self.vars.contains(v)).cloned());
        self.pointwise_product_pos(other, &order)
    }

    /// Pointwise product with an explicit result ordering.
    ///
    /// # Errors
    ///
    /// Returns [`ProbError::InconsistentScope`] unless `order` is exactly the
    /// union of both scopes.
    pub fn pointwise_product_pos(
        &self,
        other: &Self,
        order: &[RandomVariable],
    ) -> Result<Self, ProbError> {
        check_distinct(order)?;
        let covers = |t: &Self| t.vars.iter().all(|v| order.contains(v));
        let union_only = order.iter().all(|v| self.contains(v) || other.contains(v));
        if !covers(self) || !covers(other) || !union_only {
            return Err(ProbError::InconsistentScope);
        }

        let mut product = Self::zeros(order.to_vec())?;
        let lhs_pos: Vec<usize> = self.vars.iter().filter_map(|v| product.position(v)).collect();
        let rhs_pos: Vec<usize> = other.vars.iter().filter_map(|v| product.position(v)).collect();

        let mut odometer = Odometer::new(product.radices.clone(), vec![None; order.len()]);
        let mut idx = 0;
        while let Some(digits) = odometer.current() {
            let lhs: Vec<usize> = lhs_pos.iter().map(|&p| digits[p]).collect();
            let rhs: Vec<usize> = rhs_pos.iter().map(|&p| digits[p]).collect();
            product.values[idx] = self.value_at(&lhs)? * other.value_at(&rhs)?;
            idx += 1;
            odometer.advance();
        }
        Ok(product)
    }

    /// Divide by a table whose scope is a subset of this one, broadcasting the
    /// divisor over the variables it lacks.
    ///
    /// A zero divisor cell yields 0 rather than NaN or infinity. This is a
    /// numerical convention, not a mathematical identity: mass divided by an
    /// impossible event silently disappears instead of flagging an ill-posed
    /// query, which changes what a later normalization produces.
    pub fn divide_by(&self, divisor: &Self) -> Result<Self, ProbError> {
        if !divisor.vars.iter().all(|v| self.contains(v)) {
            return Err(ProbError::NotASubset);
        }
        let positions: Vec<usize> = divisor
            .vars
            .iter()
            .filter_map(|v| self.position(v))
            .collect();

        let mut quotient = self.clone();
        let mut odometer = Odometer::new(self.radices.clone(), vec![None; self.radices.len()]);
        let mut idx = 0;
        while let Some(digits) = odometer.current() {
            let sub: Vec<usize> = positions.iter().map(|&p| digits[p]).collect();
            let d = divisor.value_at(&sub)?;
            quotient.values[idx] = if d == 0.0 { 0.0 } else { self.values[idx] / d };
            idx += 1;
            odometer.advance();
        }
        Ok(quotient)
    }

    /// Inverse-CDF sample from a single-variable distribution.
    ///
    /// Walks the domain in order, accumulating mass, and returns the first
    /// value whose cumulative probability reaches `u`.
    pub fn sample(&self, u: f64) -> Result<Value, ProbError> {
        let [var] = self.vars.as_slice() else {
            return Err(ProbError::ArityMismatch {
                expected: 1,
                got: self.vars.len(),
            });
        };
        let offset = sample_offset(&self.values, u);
        var.domain()
            .value_at(offset)
            .cloned()
            .ok_or(ProbError::IndexOutOfBounds {
                index: offset,
                size: var.domain().size(),
            })
    }
}

impl fmt::Display for ProbabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, p) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ">")
    }
}

/// A full joint assignment produced while iterating a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    propositions: Vec<AssignmentProposition>,
}

impl Assignment {
    pub fn get(&self, var: &RandomVariable) -> Option<&Value> {
        self.propositions
            .iter()
            .find(|ap| ap.variable() == var)
            .map(|ap| ap.value())
    }

    pub fn propositions(&self) -> &[AssignmentProposition] {
        &self.propositions
    }

    pub fn into_propositions(self) -> Vec<AssignmentProposition> {
        self.propositions
    }
}

/// Mixed-radix counter over a scope, skipping pinned digits.
///
/// The last digit moves fastest, so successive states visit increasing flat
/// indices.
#[derive(Debug, Clone)]
pub(crate) struct Odometer {
    radices: Vec<usize>,
    pinned: Vec<Option<usize>>,
    digits: Vec<usize>,
    done: bool,
}

impl Odometer {
    pub(crate) fn new(radices: Vec<usize>, pinned: Vec<Option<usize>>) -> Self {
        let digits = pinned.iter().map(|p| p.unwrap_or(0)).collect();
        Self {
            radices,
            pinned,
            digits,
            done: false,
        }
    }

    pub(crate) fn current(&self) -> Option<&[usize]> {
        if self.done {
            None
        } else {
            Some(&self.digits)
        }
    }

    pub(crate) fn advance(&mut self) {
        for i in (0..self.digits.len()).rev() {
            if self.pinned[i].is_some() {
                continue;
            }
            self.digits[i] += 1;
            if self.digits[i] < self.radices[i] {
                return;
            }
            self.digits[i] = 0;
        }
        self.done = true;
    }
}

/// Iterator over `(assignment, value)` pairs of a table in index order.
pub struct TableIter<'a> {
    table: &'a ProbabilityTable,
    odometer: Odometer,
}

impl Iterator for TableIter<'_> {
    type Item = (Assignment, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let digits = self.odometer.current()?;
        let mut idx = 0;
        let mut propositions = Vec::with_capacity(digits.len());
        for ((var, &radix), &offset) in self.table.vars.iter().zip(&self.table.radices).zip(digits)
        {
            idx = idx * radix + offset;
            propositions.extend(AssignmentProposition::from_offset(var.clone(), offset));
        }
        let value = self.table.values[idx];
        self.odometer.advance();
        Some((Assignment { propositions }, value))
    }
}
