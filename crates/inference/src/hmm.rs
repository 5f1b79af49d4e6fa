//! Hidden Markov models in matrix form.
//!
//! A single discrete state variable evolves through a transition kernel `T`
//! (`T[i][j] = P(X_t = j | X_{t-1} = i)`) and emits a single discrete
//! evidence variable through a sensor kernel (`S[i][k] = P(E_t = k | X_t = i)`).
//! For an observed value `k` the sensor model is the diagonal matrix `O_k`
//! with `S[i][k]` on the diagonal.

use crate::cpt::ConditionalProbabilityTable;
use crate::dbn::DynamicBayesianNetwork;
use crate::domain::{AssignmentProposition, RandomVariable};
use crate::bayesnet::BayesianNetwork;
use crate::error::ProbError;
use crate::kernel::Kernel;
use crate::matrix::Matrix;
use crate::table::{CategoricalDistribution, ProbabilityTable};
use crate::ROUNDING_THRESHOLD;

/// An HMM over one state variable and one evidence variable.
#[derive(Debug, Clone)]
pub struct HiddenMarkovModel {
    state: RandomVariable,
    evidence: RandomVariable,
    transition: Kernel,
    sensor: Kernel,
    prior: CategoricalDistribution,
    transition_matrix: Matrix,
}

impl HiddenMarkovModel {
    /// # Errors
    ///
    /// - [`ProbError::ShapeMismatch`] if a kernel's dimensions don't match
    ///   the variables' domains
    /// - [`ProbError::InconsistentScope`] if the prior is not over `state`
    /// - [`ProbError::NotNormalized`] if the prior doesn't sum to 1
    pub fn new(
        state: RandomVariable,
        evidence: RandomVariable,
        transition: Kernel,
        sensor: Kernel,
        prior: CategoricalDistribution,
    ) -> Result<Self, ProbError> {
        let n = state.domain().size();
        let m = evidence.domain().size();
        for (got, expected) in [
            (transition.n_inputs, n),
            (transition.n_outputs, n),
            (sensor.n_inputs, n),
            (sensor.n_outputs, m),
        ] {
            if got != expected {
                return Err(ProbError::ShapeMismatch { expected, got });
            }
        }
        if prior.vars() != [state.clone()] {
            return Err(ProbError::InconsistentScope);
        }
        if !prior.is_normalized(ROUNDING_THRESHOLD) {
            return Err(ProbError::NotNormalized { sum: prior.sum() });
        }
        let transition_matrix = transition.to_matrix();
        Ok(Self {
            state,
            evidence,
            transition,
            sensor,
            prior,
            transition_matrix,
        })
    }

    pub fn state_variable(&self) -> &RandomVariable {
        &self.state
    }

    pub fn evidence_variable(&self) -> &RandomVariable {
        &self.evidence
    }

    pub fn transition(&self) -> &Kernel {
        &self.transition
    }

    pub fn sensor(&self) -> &Kernel {
        &self.sensor
    }

    pub fn prior(&self) -> &CategoricalDistribution {
        &self.prior
    }

    /// `T` as a matrix, previous state on rows.
    pub fn transition_matrix(&self) -> &Matrix {
        &self.transition_matrix
    }

    /// The diagonal sensor matrix `O_e` for one time step's evidence.
    ///
    /// # Errors
    ///
    /// Returns [`ProbError::InvalidEvidence`] unless the evidence is exactly
    /// one proposition over the evidence variable.
    pub fn sensor_model(&self, evidence: &[AssignmentProposition]) -> Result<Matrix, ProbError> {
        let [ap] = evidence else {
            return Err(ProbError::InvalidEvidence {
                reason: format!(
                    "expected exactly one proposition on {}, got {}",
                    self.evidence,
                    evidence.len()
                ),
            });
        };
        if ap.variable() != &self.evidence {
            return Err(ProbError::InvalidEvidence {
                reason: format!("{} is not the evidence variable {}", ap.variable(), self.evidence),
            });
        }
        Ok(Matrix::diagonal(&self.sensor.column(ap.offset())?))
    }

    /// The all-ones column, the backward message at the last time step.
    pub fn unit_message(&self) -> Matrix {
        Matrix::ones_column(self.state.domain().size())
    }

    /// A distribution over the state as a column message.
    pub fn message(&self, distribution: &CategoricalDistribution) -> Result<Matrix, ProbError> {
        if distribution.vars() != [self.state.clone()] {
            return Err(ProbError::InconsistentScope);
        }
        Ok(Matrix::column(distribution.values()))
    }

    /// A column message back to a table over the state (not normalized).
    pub fn convert(&self, message: &Matrix) -> Result<CategoricalDistribution, ProbError> {
        if message.cols() != 1 {
            return Err(ProbError::ShapeMismatch {
                expected: 1,
                got: message.cols(),
            });
        }
        ProbabilityTable::new(message.as_slice().to_vec(), vec![self.state.clone()])
    }

    /// Unroll into a two-slice network `X_0 → X_1 → E_1`.
    ///
    /// The slice variables are named after the state and evidence variables
    /// with `_0` / `_1` suffixes and share their domains.
    pub fn to_dynamic_network(&self) -> Result<DynamicBayesianNetwork, ProbError> {
        let x0 = RandomVariable::new(format!("{}_0", self.state.name()), self.state.domain().clone());
        let x1 = RandomVariable::new(format!("{}_1", self.state.name()), self.state.domain().clone());
        let e1 = RandomVariable::new(
            format!("{}_1", self.evidence.name()),
            self.evidence.domain().clone(),
        );

        let prior_cpt = ConditionalProbabilityTable::new(x0.clone(), self.prior.values().to_vec(), vec![])?;
        let transition_cpt =
            ConditionalProbabilityTable::new(x1.clone(), self.transition.k.concat(), vec![x0.clone()])?;
        let sensor_cpt =
            ConditionalProbabilityTable::new(e1.clone(), self.sensor.k.concat(), vec![x1.clone()])?;

        let prior = BayesianNetwork::new(vec![prior_cpt.clone()])?;
        let network = BayesianNetwork::new(vec![prior_cpt, transition_cpt, sensor_cpt])?;
        DynamicBayesianNetwork::new(prior, network, vec![(x0, x1)], vec![e1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks;

    #[test]
    fn test_sensor_model_is_diagonal() {
        let model = networks::umbrella_hmm().unwrap();
        let umbrella = model.evidence_variable().clone();
        let o = model.sensor_model(&[umbrella.assign(true).unwrap()]).unwrap();
        assert_eq!(o[(0, 0)], 0.9);
        assert_eq!(o[(1, 1)], 0.2);
        assert_eq!(o[(0, 1)], 0.0);
    }

    #[test]
    fn test_sensor_model_rejects_malformed_evidence() {
        let model = networks::umbrella_hmm().unwrap();
        let umbrella = model.evidence_variable().clone();
        let rain = model.state_variable().clone();
        assert!(matches!(
            model.sensor_model(&[]),
            Err(ProbError::InvalidEvidence { .. })
        ));
        assert!(matches!(
            model.sensor_model(&[umbrella.assign(true).unwrap(), umbrella.assign(false).unwrap()]),
            Err(ProbError::InvalidEvidence { .. })
        ));
        assert!(matches!(
            model.sensor_model(&[rain.assign(true).unwrap()]),
            Err(ProbError::InvalidEvidence { .. })
        ));
    }

    #[test]
    fn test_kernel_shapes_checked() {
        let rain = RandomVariable::boolean("Rain");
        let umbrella = RandomVariable::boolean("Umbrella");
        let prior = ProbabilityTable::distribution(vec![0.5, 0.5], vec![rain.clone()]).unwrap();
        let result = HiddenMarkovModel::new(
            rain,
            umbrella,
            Kernel::identity(3),
            Kernel::identity(2),
            prior,
        );
        assert!(matches!(result, Err(ProbError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_convert_round_trip() {
        let model = networks::umbrella_hmm().unwrap();
        let msg = model.message(model.prior()).unwrap();
        assert_eq!(&model.convert(&msg).unwrap(), model.prior());
        assert_eq!(model.unit_message().as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn test_unrolled_network() {
        let model = networks::umbrella_hmm().unwrap();
        let dbn = model.to_dynamic_network().unwrap();
        assert_eq!(dbn.x1_in_topological_order().len(), 1);
        assert_eq!(dbn.x1_in_topological_order()[0].name(), "Rain_1");
        assert_eq!(dbn.evidence_variables()[0].name(), "Umbrella_1");
        assert_eq!(dbn.network().len(), 3);
    }
}
