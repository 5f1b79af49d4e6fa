//! Two-slice dynamic Bayesian networks.

use crate::bayesnet::BayesianNetwork;
use crate::domain::RandomVariable;
use crate::error::ProbError;

/// A DBN given by its first two slices.
///
/// - `prior`: a network over the state variables `X_0`
/// - `network`: the transition and sensor model over `X_0 ∪ X_1 ∪ E_1`
/// - `x0_to_x1`: pairs each `X_0` variable with its successor in `X_1`
/// - `evidence`: the observed variables `E_1`
///
/// The CPTs of the `X_0` nodes inside `network` are never consulted when
/// the model is rolled forward: `X_0` is always supplied by the previous
/// step.
#[derive(Debug, Clone)]
pub struct DynamicBayesianNetwork {
    prior: BayesianNetwork,
    network: BayesianNetwork,
    x0_to_x1: Vec<(RandomVariable, RandomVariable)>,
    evidence: Vec<RandomVariable>,
    x1_order: Vec<RandomVariable>,
}

impl DynamicBayesianNetwork {
    /// # Errors
    ///
    /// - [`ProbError::UnknownVariable`] if a mapped or evidence variable is
    ///   missing from the network, or an `X_0` variable from the prior
    /// - [`ProbError::DuplicateVariable`] if a variable is mapped twice or is
    ///   both state and evidence
    /// - [`ProbError::InconsistentScope`] if a pair's domains differ, or the
    ///   prior holds variables outside `X_0`
    pub fn new(
        prior: BayesianNetwork,
        network: BayesianNetwork,
        x0_to_x1: Vec<(RandomVariable, RandomVariable)>,
        evidence: Vec<RandomVariable>,
    ) -> Result<Self, ProbError> {
        let unknown = |v: &RandomVariable| ProbError::UnknownVariable {
            name: v.name().to_string(),
        };

        let mut seen: Vec<&RandomVariable> = Vec::new();
        let mapped = x0_to_x1.iter().flat_map(|(a, b)| [a, b]);
        for v in mapped.chain(evidence.iter()) {
            if seen.contains(&v) {
                return Err(ProbError::DuplicateVariable {
                    name: v.name().to_string(),
                });
            }
            seen.push(v);
            if !network.contains(v) {
                return Err(unknown(v));
            }
        }

        for (x0, x1) in &x0_to_x1 {
            if !prior.contains(x0) {
                return Err(unknown(x0));
            }
            if x0.domain() != x1.domain() {
                return Err(ProbError::InconsistentScope);
            }
        }
        if prior
            .variables_in_topological_order()
            .iter()
            .any(|v| !x0_to_x1.iter().any(|(x0, _)| x0 == v))
        {
            return Err(ProbError::InconsistentScope);
        }

        let x1_order = network
            .variables_in_topological_order()
            .iter()
            .filter(|v| x0_to_x1.iter().any(|(_, x1)| x1 == *v))
            .cloned()
            .collect();

        Ok(Self {
            prior,
            network,
            x0_to_x1,
            evidence,
            x1_order,
        })
    }

    /// Network over `X_0` used to initialise a rollout.
    pub fn prior(&self) -> &BayesianNetwork {
        &self.prior
    }

    /// Transition and sensor model over both slices.
    pub fn network(&self) -> &BayesianNetwork {
        &self.network
    }

    pub fn x0_to_x1(&self) -> &[(RandomVariable, RandomVariable)] {
        &self.x0_to_x1
    }

    pub fn x0_variables(&self) -> impl Iterator<Item = &RandomVariable> {
        self.x0_to_x1.iter().map(|(x0, _)| x0)
    }

    /// Successor of `x0` in the next slice.
    pub fn x1_for(&self, x0: &RandomVariable) -> Option<&RandomVariable> {
        self.x0_to_x1
            .iter()
            .find(|(a, _)| a == x0)
            .map(|(_, x1)| x1)
    }

    /// `X_1` in the network's topological order.
    pub fn x1_in_topological_order(&self) -> &[RandomVariable] {
        &self.x1_order
    }

    pub fn evidence_variables(&self) -> &[RandomVariable] {
        &self.evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::ConditionalProbabilityTable;
    use crate::networks;

    #[test]
    fn test_umbrella_dbn_structure() {
        let umbrella = networks::umbrella_dbn().unwrap();
        let dbn = &umbrella.dbn;
        assert_eq!(dbn.x1_for(&umbrella.rain_prev), Some(&umbrella.rain));
        assert_eq!(dbn.x1_in_topological_order(), &[umbrella.rain.clone()]);
        assert_eq!(dbn.evidence_variables(), &[umbrella.umbrella.clone()]);
        assert_eq!(dbn.x0_variables().count(), 1);
    }

    #[test]
    fn test_rejects_unmapped_prior_variable() {
        let x0 = RandomVariable::boolean("X_0");
        let y0 = RandomVariable::boolean("Y_0");
        let x1 = RandomVariable::boolean("X_1");
        let cpt_x0 = ConditionalProbabilityTable::new(x0.clone(), vec![0.5, 0.5], vec![]).unwrap();
        let cpt_y0 = ConditionalProbabilityTable::new(y0, vec![0.5, 0.5], vec![]).unwrap();
        let cpt_x1 =
            ConditionalProbabilityTable::new(x1.clone(), vec![0.9, 0.1, 0.1, 0.9], vec![x0.clone()]).unwrap();
        let prior = BayesianNetwork::new(vec![cpt_x0.clone(), cpt_y0]).unwrap();
        let network = BayesianNetwork::new(vec![cpt_x0, cpt_x1]).unwrap();
        assert!(matches!(
            DynamicBayesianNetwork::new(prior, network, vec![(x0, x1)], vec![]),
            Err(ProbError::InconsistentScope)
        ));
    }

    #[test]
    fn test_rejects_missing_evidence_variable() {
        let umbrella = networks::umbrella_dbn().unwrap();
        let stray = RandomVariable::boolean("Stray");
        let result = DynamicBayesianNetwork::new(
            umbrella.dbn.prior().clone(),
            umbrella.dbn.network().clone(),
            umbrella.dbn.x0_to_x1().to_vec(),
            vec![stray],
        );
        assert!(matches!(result, Err(ProbError::UnknownVariable { .. })));
    }
}
