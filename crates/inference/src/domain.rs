//! Random variables over finite domains.
//!
//! A [`RandomVariable`] pairs a name with a [`FiniteDomain`]: an ordered list
//! of distinct [`Value`]s. The order of a domain is significant: it fixes the
//! digit a value contributes to a probability table index and the order in
//! which inverse-CDF sampling walks the values.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::ProbError;

/// A single value a discrete random variable can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Symbol(Arc<str>),
}

impl Value {
    /// Create a symbolic value.
    pub fn symbol(s: &str) -> Self {
        Value::Symbol(Arc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::symbol(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// An ordered, finite, non-empty set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiniteDomain {
    values: Vec<Value>,
}

impl FiniteDomain {
    /// Create a domain from values in the order they should be indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains duplicates.
    pub fn new(values: Vec<Value>) -> Result<Self, ProbError> {
        if values.is_empty() {
            return Err(ProbError::EmptyDomain);
        }
        for (i, v) in values.iter().enumerate() {
            if values[..i].contains(v) {
                return Err(ProbError::DuplicateDomainValue {
                    value: v.to_string(),
                });
            }
        }
        Ok(Self { values })
    }

    /// The boolean domain `[true, false]`.
    ///
    /// `true` comes first so that tables read like the textbook layout.
    pub fn boolean() -> Self {
        Self {
            values: vec![Value::Bool(true), Value::Bool(false)],
        }
    }

    /// Integers `from..=to` in ascending order.
    pub fn integers(from: i64, to: i64) -> Result<Self, ProbError> {
        Self::new((from..=to).map(Value::Int).collect())
    }

    /// Symbolic values in the given order.
    pub fn symbols(names: &[&str]) -> Result<Self, ProbError> {
        Self::new(names.iter().map(|s| Value::symbol(s)).collect())
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Position of `value` within the domain.
    pub fn offset(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    pub fn value_at(&self, offset: usize) -> Option<&Value> {
        self.values.get(offset)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[derive(Debug)]
struct VariableInner {
    name: String,
    domain: FiniteDomain,
}

/// A named discrete random variable.
///
/// Cloning is cheap (the name and domain are shared). Two variables are
/// equal when their names are equal, so names must be unique within a model.
///
/// # Example
///
/// ```rust
/// use compositional_inference::{FiniteDomain, RandomVariable};
///
/// let rain = RandomVariable::new("Rain", FiniteDomain::boolean());
/// assert_eq!(rain.domain().size(), 2);
/// ```
#[derive(Clone)]
pub struct RandomVariable {
    inner: Arc<VariableInner>,
}

impl RandomVariable {
    pub fn new(name: impl Into<String>, domain: FiniteDomain) -> Self {
        Self {
            inner: Arc::new(VariableInner {
                name: name.into(),
                domain,
            }),
        }
    }

    /// Shorthand for a variable over [`FiniteDomain::boolean`].
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FiniteDomain::boolean())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn domain(&self) -> &FiniteDomain {
        &self.inner.domain
    }

    /// Offset of `value` in this variable's domain.
    ///
    /// # Errors
    ///
    /// Returns [`ProbError::ValueNotInDomain`] if the value is foreign.
    pub fn offset_of(&self, value: &Value) -> Result<usize, ProbError> {
        self.inner
            .domain
            .offset(value)
            .ok_or_else(|| ProbError::ValueNotInDomain {
                variable: self.inner.name.clone(),
                value: value.to_string(),
            })
    }

    /// Build the proposition `self = value`.
    pub fn assign(&self, value: impl Into<Value>) -> Result<AssignmentProposition, ProbError> {
        AssignmentProposition::new(self.clone(), value)
    }
}

impl PartialEq for RandomVariable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
    }
}

impl Eq for RandomVariable {}

impl Hash for RandomVariable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
    }
}

impl fmt::Debug for RandomVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

impl fmt::Display for RandomVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

/// An elementary proposition `variable = value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentProposition {
    variable: RandomVariable,
    value: Value,
    offset: usize,
}

impl AssignmentProposition {
    /// # Errors
    ///
    /// Returns [`ProbError::ValueNotInDomain`] if `value` is not in the
    /// variable's domain.
    pub fn new(variable: RandomVariable, value: impl Into<Value>) -> Result<Self, ProbError> {
        let value = value.into();
        let offset = variable.offset_of(&value)?;
        Ok(Self {
            variable,
            value,
            offset,
        })
    }

    pub(crate) fn from_offset(variable: RandomVariable, offset: usize) -> Option<Self> {
        let value = variable.domain().value_at(offset)?.clone();
        Some(Self {
            variable,
            value,
            offset,
        })
    }

    pub fn variable(&self) -> &RandomVariable {
        &self.variable
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Position of the value within the variable's domain.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for AssignmentProposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.variable, self.value)
    }
}
