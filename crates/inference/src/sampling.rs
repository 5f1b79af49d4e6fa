//! Random sources and forward sampling over Bayesian networks.
//!
//! All randomness in the crate flows through the [`Randomizer`] trait so that
//! sampling algorithms can be replayed with a fixed sequence of draws in
//! tests.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::bayesnet::BayesianNetwork;
use crate::config::InferenceConfig;
use crate::domain::{AssignmentProposition, RandomVariable};
use crate::error::ProbError;
use crate::table::{sample_offset, CategoricalDistribution, ProbabilityTable};

/// A source of uniform draws in `[0, 1)`.
pub trait Randomizer {
    fn next_double(&mut self) -> f64;
}

impl<T: Randomizer + ?Sized> Randomizer for &mut T {
    fn next_double(&mut self) -> f64 {
        (**self).next_double()
    }
}

impl<T: Randomizer + ?Sized> Randomizer for Box<T> {
    fn next_double(&mut self) -> f64 {
        (**self).next_double()
    }
}

/// A [`Randomizer`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRandomizer<R = StdRng> {
    rng: R,
}

impl<R: Rng> RngRandomizer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngRandomizer<StdRng> {
    /// A reproducible randomizer.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Randomizer for RngRandomizer<R> {
    fn next_double(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, starting over once exhausted.
///
/// # Example
///
/// ```rust
/// use compositional_inference::{Randomizer, ReplayRandomizer};
///
/// let mut r = ReplayRandomizer::new(vec![0.1, 0.9]).unwrap();
/// assert_eq!(r.next_double(), 0.1);
/// assert_eq!(r.next_double(), 0.9);
/// assert_eq!(r.next_double(), 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct ReplayRandomizer {
    values: Vec<f64>,
    next: usize,
}

impl ReplayRandomizer {
    /// # Errors
    ///
    /// Returns [`ProbError::InvalidConfig`] for an empty sequence.
    pub fn new(values: Vec<f64>) -> Result<Self, ProbError> {
        if values.is_empty() {
            return Err(ProbError::InvalidConfig {
                reason: "replay sequence cannot be empty".to_string(),
            });
        }
        Ok(Self { values, next: 0 })
    }
}

impl Randomizer for ReplayRandomizer {
    fn next_double(&mut self) -> f64 {
        let u = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        u
    }
}

/// Draw one value offset for every variable of `bn` in topological order.
///
/// Variables listed in `fixed` are not sampled; their offsets are used as
/// given and `on_fixed` is called with the CPT entry they contribute.
fn forward_sample<R, F>(
    bn: &BayesianNetwork,
    fixed: &HashMap<RandomVariable, usize>,
    randomizer: &mut R,
    mut on_fixed: F,
) -> Result<HashMap<RandomVariable, usize>, ProbError>
where
    R: Randomizer + ?Sized,
    F: FnMut(f64),
{
    let mut event: HashMap<RandomVariable, usize> = HashMap::with_capacity(bn.len());
    for var in bn.variables_in_topological_order() {
        let cpt = bn.node_or_err(var)?.cpt();
        let parents = cpt
            .parents()
            .iter()
            .map(|p| {
                event.get(p).copied().ok_or_else(|| ProbError::UnknownVariable {
                    name: p.name().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let row = cpt.row_values(&parents)?;
        let offset = match fixed.get(var) {
            Some(&observed) => {
                on_fixed(row[observed]);
                observed
            }
            None => sample_offset(row, randomizer.next_double()),
        };
        event.insert(var.clone(), offset);
    }
    Ok(event)
}

/// Sample a full event from `bn`, one draw per variable in topological
/// order. Propositions come back in that order.
pub(crate) fn prior_sample_with<R: Randomizer + ?Sized>(
    bn: &BayesianNetwork,
    randomizer: &mut R,
) -> Result<Vec<AssignmentProposition>, ProbError> {
    let event = forward_sample(bn, &HashMap::new(), randomizer, |_| {})?;
    Ok(bn
        .variables_in_topological_order()
        .iter()
        .filter_map(|var| AssignmentProposition::from_offset(var.clone(), event[var]))
        .collect())
}

/// PRIOR-SAMPLE: forward sampling of complete events.
#[derive(Debug, Clone)]
pub struct PriorSample<R> {
    randomizer: R,
}

impl<R: Randomizer> PriorSample<R> {
    pub fn new(randomizer: R) -> Self {
        Self { randomizer }
    }

    /// One complete event drawn from the network's joint distribution.
    pub fn prior_sample(&mut self, bn: &BayesianNetwork) -> Result<Vec<AssignmentProposition>, ProbError> {
        prior_sample_with(bn, &mut self.randomizer)
    }
}

/// Result of likelihood weighting with diagnostics.
#[derive(Debug, Clone)]
pub struct LikelihoodWeightingResult {
    /// Estimated posterior distribution.
    pub posterior: CategoricalDistribution,
    /// Effective sample size `(Σw)² / Σw²`.
    pub effective_sample_size: f64,
    /// Number of samples drawn.
    pub samples: usize,
}

/// LIKELIHOOD-WEIGHTING: approximate `P(X | e)` by forward sampling with the
/// evidence clamped.
///
/// Each sample fixes the evidence variables to their observed values and
/// multiplies the sample's weight by the likelihood of each observation
/// given its sampled parents.
#[derive(Debug, Clone)]
pub struct LikelihoodWeighting<R> {
    randomizer: R,
    samples: usize,
}

impl LikelihoodWeighting<RngRandomizer<StdRng>> {
    /// Build from the sample count and seed of `config`.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, ProbError> {
        config.validate()?;
        Ok(Self::new(config.randomizer(), config.sample_count))
    }
}

impl<R: Randomizer> LikelihoodWeighting<R> {
    pub fn new(randomizer: R, samples: usize) -> Self {
        Self {
            randomizer,
            samples,
        }
    }

    pub fn ask(
        &mut self,
        query: &[RandomVariable],
        evidence: &[AssignmentProposition],
        bn: &BayesianNetwork,
    ) -> Result<CategoricalDistribution, ProbError> {
        Ok(self.ask_with_diagnostics(query, evidence, bn)?.posterior)
    }

    /// Like [`ask`](Self::ask), also reporting the effective sample size.
    ///
    /// If every sample has zero weight the posterior falls back to uniform.
    pub fn ask_with_diagnostics(
        &mut self,
        query: &[RandomVariable],
        evidence: &[AssignmentProposition],
        bn: &BayesianNetwork,
    ) -> Result<LikelihoodWeightingResult, ProbError> {
        bn.check_query(query, evidence)?;
        let mut counts = ProbabilityTable::zeros(query.to_vec())?;
        let fixed: HashMap<RandomVariable, usize> = evidence
            .iter()
            .map(|ap| (ap.variable().clone(), ap.offset()))
            .collect();

        let mut total = 0.0;
        let mut total_sq = 0.0;
        for _ in 0..self.samples {
            let mut weight = 1.0;
            let event = forward_sample(bn, &fixed, &mut self.randomizer, |p| weight *= p)?;
            if weight > 0.0 {
                let offsets: Vec<usize> = query.iter().map(|q| event[q]).collect();
                let idx = counts.index_of_offsets(&offsets)?;
                counts.set_value(idx, counts.values()[idx] + weight)?;
                total += weight;
                total_sq += weight * weight;
            }
        }

        let posterior = if total > 0.0 {
            counts.normalize()
        } else {
            warn!(
                samples = self.samples,
                "all likelihood weights are zero, falling back to uniform"
            );
            let n = counts.len();
            ProbabilityTable::new(vec![1.0 / n as f64; n], query.to_vec())?
        };
        let effective_sample_size = if total_sq > 0.0 {
            total * total / total_sq
        } else {
            0.0
        };
        debug!(
            samples = self.samples,
            effective_sample_size, "likelihood weighting finished"
        );

        Ok(LikelihoodWeightingResult {
            posterior,
            effective_sample_size,
            samples: self.samples,
        })
    }
}
