//! Particle filtering over dynamic Bayesian networks.
//!
//! Each call to [`ParticleFiltering::particle_filtering`] runs one step of
//! sequential importance resampling:
//!
//! 1. **Propagate**: every particle's state is rolled forward by sampling
//!    each `X_1` variable, in topological order, given its parents.
//! 2. **Weight**: each particle is weighted by `P(e | X_0, X_1)`, computed
//!    exactly by enumeration over the two-slice network.
//! 3. **Resample**: N particles are drawn with replacement in proportion to
//!    the weights; the result replaces the set wholesale.

use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

use crate::config::InferenceConfig;
use crate::dbn::DynamicBayesianNetwork;
use crate::domain::{AssignmentProposition, RandomVariable, Value};
use crate::enumeration::EnumerationAsk;
use crate::error::ProbError;
use crate::sampling::{prior_sample_with, Randomizer, RngRandomizer};
use crate::table::{sample_offset, CategoricalDistribution, ProbabilityTable};

/// One sampled assignment of the `X_1` variables with its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    state: Vec<AssignmentProposition>,
    weight: f64,
}

impl Particle {
    /// Propositions over `X_1`, in topological order.
    pub fn state(&self) -> &[AssignmentProposition] {
        &self.state
    }

    /// Importance weight; 1.0 once resampled.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn value_of(&self, var: &RandomVariable) -> Option<&Value> {
        self.state
            .iter()
            .find(|ap| ap.variable() == var)
            .map(|ap| ap.value())
    }
}

/// An ordered, fixed-size population of particles.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// The particles as N rows of propositions.
    pub fn rows(&self) -> Vec<Vec<AssignmentProposition>> {
        self.particles.iter().map(|p| p.state.clone()).collect()
    }

    /// Number of particles in which `ap` holds.
    pub fn count_with(&self, ap: &AssignmentProposition) -> usize {
        self.particles
            .iter()
            .filter(|p| p.value_of(ap.variable()) == Some(ap.value()))
            .count()
    }

    /// Weighted histogram of `var` across the set, normalized.
    pub fn estimate(&self, var: &RandomVariable) -> Result<CategoricalDistribution, ProbError> {
        let mut counts = vec![0.0; var.domain().size()];
        for p in &self.particles {
            let value = p.value_of(var).ok_or_else(|| ProbError::UnknownVariable {
                name: var.name().to_string(),
            })?;
            counts[var.offset_of(value)?] += p.weight;
        }
        Ok(ProbabilityTable::new(counts, vec![var.clone()])?.normalize())
    }
}

/// PARTICLE-FILTERING over a [`DynamicBayesianNetwork`].
///
/// The particle set is drawn from the DBN's prior network at construction,
/// so construction already consumes one draw per `X_0` variable per
/// particle from the randomizer.
#[derive(Debug, Clone)]
pub struct ParticleFiltering<R> {
    dbn: DynamicBayesianNetwork,
    n: usize,
    randomizer: R,
    // X_0 offsets per particle, aligned with dbn.x0_to_x1()
    current: Vec<Vec<usize>>,
}

impl ParticleFiltering<RngRandomizer<StdRng>> {
    /// Build with the particle count and seed of `config`.
    pub fn from_config(dbn: DynamicBayesianNetwork, config: &InferenceConfig) -> Result<Self, ProbError> {
        config.validate()?;
        Self::new(dbn, config.particle_count, config.randomizer())
    }
}

impl<R: Randomizer> ParticleFiltering<R> {
    /// # Errors
    ///
    /// Returns [`ProbError::InvalidConfig`] if `n` is zero, or any error
    /// raised while sampling the prior.
    pub fn new(dbn: DynamicBayesianNetwork, n: usize, mut randomizer: R) -> Result<Self, ProbError> {
        if n == 0 {
            return Err(ProbError::InvalidConfig {
                reason: "particle count must be positive".to_string(),
            });
        }
        let mut current = Vec::with_capacity(n);
        for _ in 0..n {
            let event = prior_sample_with(dbn.prior(), &mut randomizer)?;
            let offsets = dbn
                .x0_variables()
                .map(|x0| {
                    event
                        .iter()
                        .find(|ap| ap.variable() == x0)
                        .map(|ap| ap.offset())
                        .ok_or_else(|| ProbError::UnknownVariable {
                            name: x0.name().to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            current.push(offsets);
        }
        debug!(particles = n, "initialised particle set from prior");
        Ok(Self {
            dbn,
            n,
            randomizer,
            current,
        })
    }

    pub fn dbn(&self) -> &DynamicBayesianNetwork {
        &self.dbn
    }

    pub fn particle_count(&self) -> usize {
        self.n
    }

    /// Advance the filter by one time step given evidence over `E_1`.
    ///
    /// # Errors
    ///
    /// - [`ProbError::UnknownVariable`] if `e` mentions a variable outside `E_1`
    /// - [`ProbError::ZeroWeights`] if every particle has zero likelihood;
    ///   the stored particle set is left untouched
    pub fn particle_filtering(&mut self, e: &[AssignmentProposition]) -> Result<ParticleSet, ProbError> {
        for ap in e {
            if !self.dbn.evidence_variables().contains(ap.variable()) {
                return Err(ProbError::UnknownVariable {
                    name: ap.variable().name().to_string(),
                });
            }
        }

        // propagate
        let mut predicted = Vec::with_capacity(self.n);
        for x0_offsets in &self.current {
            predicted.push(propagate(&self.dbn, &mut self.randomizer, x0_offsets)?);
        }

        // weight
        let query: Vec<RandomVariable> = e.iter().map(|ap| ap.variable().clone()).collect();
        let ask = EnumerationAsk::new();
        let mut weights = Vec::with_capacity(self.n);
        for (x0_offsets, state) in self.current.iter().zip(&predicted) {
            let mut known = x0_propositions(&self.dbn, x0_offsets);
            known.extend(state.iter().cloned());
            let w = if e.is_empty() {
                1.0
            } else {
                ask.ask(&query, &known, self.dbn.network())?.value_for(e)?
            };
            weights.push(w);
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            warn!(particles = self.n, "all particle weights are zero");
            return Err(ProbError::ZeroWeights);
        }
        let normalized: Vec<f64> = weights.iter().map(|w| w / total).collect();
        trace!(weights = ?normalized, "particle weights");

        // resample
        let mut particles = Vec::with_capacity(self.n);
        for _ in 0..self.n {
            let i = sample_offset(&normalized, self.randomizer.next_double());
            particles.push(Particle {
                state: predicted[i].clone(),
                weight: 1.0,
            });
        }

        self.current = particles
            .iter()
            .map(|p| self.x1_offsets_as_x0(&p.state))
            .collect::<Result<_, _>>()?;
        debug!(particles = self.n, evidence = e.len(), "particle filtering step");
        Ok(ParticleSet { particles })
    }

    /// Re-key a particle's `X_1` values onto `X_0` for the next step.
    fn x1_offsets_as_x0(&self, state: &[AssignmentProposition]) -> Result<Vec<usize>, ProbError> {
        self.dbn
            .x0_to_x1()
            .iter()
            .map(|(_, x1)| {
                state
                    .iter()
                    .find(|ap| ap.variable() == x1)
                    .map(|ap| ap.offset())
                    .ok_or_else(|| ProbError::UnknownVariable {
                        name: x1.name().to_string(),
                    })
            })
            .collect()
    }
}

fn x0_propositions(dbn: &DynamicBayesianNetwork, offsets: &[usize]) -> Vec<AssignmentProposition> {
    dbn.x0_variables()
        .zip(offsets)
        .filter_map(|(x0, &o)| AssignmentProposition::from_offset(x0.clone(), o))
        .collect()
}

/// Sample `X_1` given `X_0`, one draw per variable in topological order.
fn propagate<R: Randomizer + ?Sized>(
    dbn: &DynamicBayesianNetwork,
    randomizer: &mut R,
    x0_offsets: &[usize],
) -> Result<Vec<AssignmentProposition>, ProbError> {
    let mut known = x0_propositions(dbn, x0_offsets);
    let mut state = Vec::with_capacity(dbn.x1_in_topological_order().len());
    for x1 in dbn.x1_in_topological_order() {
        let cpt = dbn.network().node_or_err(x1)?.cpt();
        let parents = cpt
            .parents()
            .iter()
            .map(|p| {
                known
                    .iter()
                    .find(|ap| ap.variable() == p)
                    .map(|ap| ap.offset())
                    .ok_or_else(|| ProbError::UnknownVariable {
                        name: p.name().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let offset = sample_offset(cpt.row_values(&parents)?, randomizer.next_double());
        let ap = AssignmentProposition::from_offset(x1.clone(), offset).ok_or(
            ProbError::IndexOutOfBounds {
                index: offset,
                size: x1.domain().size(),
            },
        )?;
        known.push(ap.clone());
        state.push(ap);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks;
    use crate::sampling::ReplayRandomizer;

    #[test]
    fn test_rejects_zero_particles() {
        let umbrella = networks::umbrella_dbn().unwrap();
        let result = ParticleFiltering::new(umbrella.dbn, 0, RngRandomizer::seeded(1));
        assert!(matches!(result, Err(ProbError::InvalidConfig { .. })));
    }

    #[test]
    fn test_rejects_non_evidence_variable() {
        let umbrella = networks::umbrella_dbn().unwrap();
        let mut pf = ParticleFiltering::new(umbrella.dbn, 5, RngRandomizer::seeded(1)).unwrap();
        assert!(matches!(
            pf.particle_filtering(&[umbrella.rain.assign(true).unwrap()]),
            Err(ProbError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_resampled_weights_are_one() {
        let umbrella = networks::umbrella_dbn().unwrap();
        let mut pf = ParticleFiltering::new(umbrella.dbn, 20, RngRandomizer::seeded(3)).unwrap();
        let set = pf
            .particle_filtering(&[umbrella.umbrella.assign(true).unwrap()])
            .unwrap();
        assert_eq!(set.len(), 20);
        assert!(set.iter().all(|p| p.weight() == 1.0));
        assert_eq!(set.rows().len(), 20);
    }

    #[test]
    fn test_all_zero_weights_leave_state_unchanged() {
        let rain_prev = RandomVariable::boolean("Rain_t-1");
        let rain = RandomVariable::boolean("Rain_t");
        let umbrella = RandomVariable::boolean("Umbrella_t");
        let prior_cpt =
            crate::ConditionalProbabilityTable::new(rain_prev.clone(), vec![1.0, 0.0], vec![]).unwrap();
        let dbn = DynamicBayesianNetwork::new(
            crate::BayesianNetwork::new(vec![prior_cpt.clone()]).unwrap(),
            crate::BayesianNetwork::new(vec![
                prior_cpt,
                crate::ConditionalProbabilityTable::new(
                    rain.clone(),
                    vec![1.0, 0.0, 0.0, 1.0],
                    vec![rain_prev.clone()],
                )
                .unwrap(),
                // rain always brings an umbrella
                crate::ConditionalProbabilityTable::new(
                    umbrella.clone(),
                    vec![1.0, 0.0, 0.0, 1.0],
                    vec![rain.clone()],
                )
                .unwrap(),
            ])
            .unwrap(),
            vec![(rain_prev, rain.clone())],
            vec![umbrella.clone()],
        )
        .unwrap();

        let mut pf = ParticleFiltering::new(dbn, 4, ReplayRandomizer::new(vec![0.5]).unwrap()).unwrap();
        let before = pf.current.clone();
        assert!(matches!(
            pf.particle_filtering(&[umbrella.assign(false).unwrap()]),
            Err(ProbError::ZeroWeights)
        ));
        assert_eq!(pf.current, before);
        let set = pf.particle_filtering(&[umbrella.assign(true).unwrap()]).unwrap();
        assert_eq!(set.count_with(&rain.assign(true).unwrap()), 4);
    }
}
