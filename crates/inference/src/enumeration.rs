//! Exact inference by enumeration.
//!
//! ENUMERATION-ASK answers `P(X | e)` by summing the full joint over every
//! hidden variable. For each value combination of the query variables the
//! network is walked in topological order: observed variables contribute
//! their CPT entry, unobserved ones are summed out recursively. The resulting
//! unnormalized vector is normalized once at the end.
//!
//! Cost is exponential in the number of hidden variables; this is the
//! baseline exact method, not a production one.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::bayesnet::BayesianNetwork;
use crate::domain::{AssignmentProposition, RandomVariable};
use crate::error::ProbError;
use crate::table::{CategoricalDistribution, Odometer, ProbabilityTable};

/// Bound values during one enumeration.
///
/// Slots are laid out `[query][evidence][hidden]`, hidden ones in topological
/// order. Query and evidence slots are always bound. Hidden slots are bound
/// up to a high-water mark: binding hidden slot `s` moves the mark to
/// `s + 1`, which implicitly unbinds every deeper hidden slot left over from
/// a previous branch. Every query row starts with no hidden slot bound.
#[derive(Debug)]
struct ObservedEvidence {
    slots: HashMap<RandomVariable, usize>,
    offsets: Vec<usize>,
    observed: usize,
    bound: usize,
}

impl ObservedEvidence {
    fn new(
        query: &[RandomVariable],
        evidence: &[AssignmentProposition],
        bn: &BayesianNetwork,
    ) -> Self {
        let mut slots = HashMap::new();
        let mut offsets = Vec::with_capacity(bn.len());
        for q in query {
            slots.insert(q.clone(), offsets.len());
            offsets.push(0);
        }
        for ap in evidence {
            if !slots.contains_key(ap.variable()) {
                slots.insert(ap.variable().clone(), offsets.len());
                offsets.push(ap.offset());
            }
        }
        let observed = offsets.len();
        for var in bn.variables_in_topological_order() {
            if !slots.contains_key(var) {
                slots.insert(var.clone(), offsets.len());
                offsets.push(0);
            }
        }
        Self {
            slots,
            offsets,
            observed,
            bound: observed,
        }
    }

    /// Bind the next query row and drop every hidden binding.
    fn set_query(&mut self, query_offsets: &[usize]) {
        self.offsets[..query_offsets.len()].copy_from_slice(query_offsets);
        self.bound = self.observed;
    }

    fn offset(&self, var: &RandomVariable) -> Option<usize> {
        let slot = *self.slots.get(var)?;
        (slot < self.bound).then(|| self.offsets[slot])
    }

    fn extend(&mut self, var: &RandomVariable, offset: usize) {
        if let Some(&slot) = self.slots.get(var) {
            self.offsets[slot] = offset;
            self.bound = slot + 1;
        }
    }
}

/// ENUMERATION-ASK over a [`BayesianNetwork`].
///
/// # Example
///
/// ```rust
/// use compositional_inference::{networks, EnumerationAsk};
///
/// let alarm = networks::burglary_alarm().unwrap();
/// let evidence = [
///     alarm.john_calls.assign(true).unwrap(),
///     alarm.mary_calls.assign(true).unwrap(),
/// ];
/// let p = EnumerationAsk::new()
///     .ask(&[alarm.burglary.clone()], &evidence, &alarm.network)
///     .unwrap();
/// assert!((p.values()[0] - 0.284).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationAsk;

impl EnumerationAsk {
    pub fn new() -> Self {
        Self
    }

    /// Distribution over the joint values of `query` given `evidence`.
    ///
    /// The result is laid out over `query` in the order given. An evidence
    /// proposition on a query variable pins it: every query row that
    /// disagrees gets probability 0.
    ///
    /// # Errors
    ///
    /// - [`ProbError::UnknownVariable`] if a query or evidence variable is
    ///   not in the network
    /// - [`ProbError::DuplicateVariable`] if a query variable repeats or a
    ///   variable is observed twice
    pub fn ask(
        &self,
        query: &[RandomVariable],
        evidence: &[AssignmentProposition],
        bn: &BayesianNetwork,
    ) -> Result<CategoricalDistribution, ProbError> {
        bn.check_query(query, evidence)?;
        let template = ProbabilityTable::zeros(query.to_vec())?;

        debug!(
            query = ?query,
            evidence = evidence.len(),
            "enumeration ask"
        );

        let pinned: Vec<Option<usize>> = query
            .iter()
            .map(|q| {
                evidence
                    .iter()
                    .find(|ap| ap.variable() == q)
                    .map(|ap| ap.offset())
            })
            .collect();

        let radices: Vec<usize> = query.iter().map(|q| q.domain().size()).collect();
        let mut odometer = Odometer::new(radices, vec![None; query.len()]);
        let mut obs = ObservedEvidence::new(query, evidence, bn);
        let mut values = Vec::with_capacity(template.len());
        let order = bn.variables_in_topological_order();

        while let Some(digits) = odometer.current() {
            let conflicts = pinned
                .iter()
                .zip(digits)
                .any(|(pin, &d)| pin.is_some_and(|p| p != d));
            let q = if conflicts {
                0.0
            } else {
                obs.set_query(digits);
                enumerate_all(bn, order, &mut obs)?
            };
            trace!(row = ?digits, q, "query row");
            values.push(q);
            odometer.advance();
        }

        Ok(ProbabilityTable::new(values, query.to_vec())?.normalize())
    }
}

fn enumerate_all(
    bn: &BayesianNetwork,
    vars: &[RandomVariable],
    obs: &mut ObservedEvidence,
) -> Result<f64, ProbError> {
    let Some((y, rest)) = vars.split_first() else {
        return Ok(1.0);
    };
    let cpt = bn.node_or_err(y)?.cpt();

    let mut offsets = Vec::with_capacity(cpt.vars().len());
    for parent in cpt.parents() {
        let offset = obs.offset(parent).ok_or_else(|| ProbError::UnknownVariable {
            name: parent.name().to_string(),
        })?;
        offsets.push(offset);
    }

    match obs.offset(y) {
        Some(observed) => {
            offsets.push(observed);
            let p = cpt.table().value_at(&offsets)?;
            if p == 0.0 {
                return Ok(0.0);
            }
            Ok(p * enumerate_all(bn, rest, obs)?)
        }
        None => {
            let mut sum = 0.0;
            offsets.push(0);
            let last = offsets.len() - 1;
            for value in 0..y.domain().size() {
                offsets[last] = value;
                let p = cpt.table().value_at(&offsets)?;
                if p == 0.0 {
                    continue;
                }
                obs.extend(y, value);
                sum += p * enumerate_all(bn, rest, obs)?;
            }
            Ok(sum)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::ConditionalProbabilityTable;
    use crate::networks;
    use approx::assert_abs_diff_eq;

    /// `P(query | evidence)` by summing the full joint.
    fn brute_force(
        query: &[RandomVariable],
        evidence: &[AssignmentProposition],
        bn: &BayesianNetwork,
    ) -> ProbabilityTable {
        let all = ProbabilityTable::zeros(bn.variables_in_topological_order().to_vec()).unwrap();
        let mut out = ProbabilityTable::zeros(query.to_vec()).unwrap();
        for (a, _) in all.iter_with(evidence).unwrap() {
            let offsets: Vec<usize> = query
                .iter()
                .map(|q| q.offset_of(a.get(q).unwrap()).unwrap())
                .collect();
            let idx = out.index_of_offsets(&offsets).unwrap();
            let p = bn.joint_probability(a.propositions()).unwrap();
            out.set_value(idx, out.values()[idx] + p).unwrap();
        }
        out.normalize()
    }

    fn rain_sensor() -> (RandomVariable, RandomVariable, BayesianNetwork) {
        let rain = RandomVariable::boolean("Rain");
        let umbrella = RandomVariable::boolean("Umbrella");
        let bn = BayesianNetwork::new(vec![
            ConditionalProbabilityTable::new(rain.clone(), vec![0.5, 0.5], vec![]).unwrap(),
            ConditionalProbabilityTable::new(
                umbrella.clone(),
                vec![0.9, 0.1, 0.2, 0.8],
                vec![rain.clone()],
            )
            .unwrap(),
        ])
        .unwrap();
        (rain, umbrella, bn)
    }

    #[test]
    fn test_posterior_given_sensor() {
        let (rain, umbrella, bn) = rain_sensor();
        let p = EnumerationAsk::new()
            .ask(&[rain], &[umbrella.assign(true).unwrap()], &bn)
            .unwrap();
        // 0.45 / (0.45 + 0.1)
        assert_abs_diff_eq!(p.values()[0], 0.45 / 0.55, epsilon = 1e-12);
    }

    #[test]
    fn test_marginal_without_evidence() {
        let (_, umbrella, bn) = rain_sensor();
        let p = EnumerationAsk::new().ask(&[umbrella], &[], &bn).unwrap();
        assert_abs_diff_eq!(p.values()[0], 0.55, epsilon = 1e-12);
        assert_abs_diff_eq!(p.values()[1], 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_joint_query_sums_to_one() {
        let (rain, umbrella, bn) = rain_sensor();
        let p = EnumerationAsk::new()
            .ask(&[rain.clone(), umbrella.clone()], &[], &bn)
            .unwrap();
        assert_eq!(p.vars(), &[rain, umbrella]);
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.values()[0], 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_pinned_query_is_point_mass() {
        let (rain, _, bn) = rain_sensor();
        let p = EnumerationAsk::new()
            .ask(&[rain.clone()], &[rain.assign(false).unwrap()], &bn)
            .unwrap();
        assert_eq!(p.values(), &[0.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let (rain, umbrella, bn) = rain_sensor();
        let ask = EnumerationAsk::new();
        let stranger = RandomVariable::boolean("Stranger");
        assert!(matches!(
            ask.ask(&[stranger], &[], &bn),
            Err(ProbError::UnknownVariable { .. })
        ));
        assert!(matches!(
            ask.ask(&[rain.clone(), rain.clone()], &[], &bn),
            Err(ProbError::DuplicateVariable { .. })
        ));
        assert!(matches!(
            ask.ask(
                &[rain],
                &[umbrella.assign(true).unwrap(), umbrella.assign(false).unwrap()],
                &bn
            ),
            Err(ProbError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn test_hidden_variables_rebound_on_every_row() {
        // Cloudy and Sprinkler are hidden, Rain has two rows
        let s = networks::cloudy_sprinkler_rain().unwrap();
        let evidence = [s.wet_grass.assign(true).unwrap()];
        let query = [s.rain.clone()];
        let p = EnumerationAsk::new().ask(&query, &evidence, &s.network).unwrap();
        let expected = brute_force(&query, &evidence, &s.network);
        for (x, y) in p.values().iter().zip(expected.values()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(p.values()[0], 0.7079, epsilon = 1e-3);
    }

    #[test]
    fn test_joint_query_over_hidden_parents_matches_brute_force() {
        let s = networks::cloudy_sprinkler_rain().unwrap();
        let query = [s.cloudy.clone(), s.wet_grass.clone()];
        let p = EnumerationAsk::new().ask(&query, &[], &s.network).unwrap();
        let expected = brute_force(&query, &[], &s.network);
        assert_eq!(p.len(), 4);
        for (x, y) in p.values().iter().zip(expected.values()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_burglary_rows_match_brute_force() {
        let alarm = networks::burglary_alarm().unwrap();
        let evidence = [
            alarm.john_calls.assign(true).unwrap(),
            alarm.mary_calls.assign(true).unwrap(),
        ];
        let query = [alarm.burglary.clone()];
        let p = EnumerationAsk::new().ask(&query, &evidence, &alarm.network).unwrap();
        let expected = brute_force(&query, &evidence, &alarm.network);
        assert_abs_diff_eq!(p.values()[0], expected.values()[0], epsilon = 1e-12);
        assert_abs_diff_eq!(p.values()[0], 0.284, epsilon = 1e-3);
    }
}
