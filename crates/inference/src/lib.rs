//! # Inference - Discrete Probabilistic Reasoning
//!
//! This crate implements a discrete probability data model and three families
//! of inference built on it:
//!
//! - **Exact enumeration** over Bayesian networks ([`EnumerationAsk`])
//! - **Forward-backward and fixed-lag smoothing** over hidden Markov models
//!   ([`ForwardBackward`], [`FixedLagSmoothing`])
//! - **Particle filtering** over two-slice dynamic Bayesian networks
//!   ([`ParticleFiltering`])
//!
//! plus forward sampling and likelihood weighting ([`PriorSample`],
//! [`LikelihoodWeighting`]).
//!
//! ## Core Concepts
//!
//! - **Variables have ordered finite domains**: the position of a value in
//!   its domain is its digit in every table index
//! - **Tables are mixed-radix arrays**: the first variable of a scope is the
//!   most significant digit, the last varies fastest
//! - **CPTs put the child last**: `P(X | A, B)` is a table over `[A, B, X]`
//!   whose rows each sum to 1
//! - **Randomness is injected**: every sampler draws from a [`Randomizer`],
//!   so runs can be seeded or replayed exactly
//!
//! ## Example: Burglary Alarm
//!
//! ```rust
//! use compositional_inference::{networks, EnumerationAsk};
//!
//! let alarm = networks::burglary_alarm().unwrap();
//! let evidence = [
//!     alarm.john_calls.assign(true).unwrap(),
//!     alarm.mary_calls.assign(true).unwrap(),
//! ];
//!
//! let p = EnumerationAsk::new()
//!     .ask(&[alarm.burglary.clone()], &evidence, &alarm.network)
//!     .unwrap();
//! assert!((p.values()[0] - 0.284).abs() < 1e-3);  // P(burglary | j, m)
//! ```

mod bayesnet;
mod config;
mod cpt;
mod dbn;
mod domain;
mod enumeration;
mod error;
mod hmm;
mod kernel;
mod matrix;
pub mod networks;
mod particle;
mod sampling;
mod smoothing;
mod table;

pub use bayesnet::{BayesianNetwork, Node};
pub use config::InferenceConfig;
pub use cpt::ConditionalProbabilityTable;
pub use dbn::DynamicBayesianNetwork;
pub use domain::{AssignmentProposition, FiniteDomain, RandomVariable, Value};
pub use enumeration::EnumerationAsk;
pub use error::ProbError;
pub use hmm::HiddenMarkovModel;
pub use kernel::Kernel;
pub use matrix::Matrix;
pub use particle::{Particle, ParticleFiltering, ParticleSet};
pub use sampling::{
    LikelihoodWeighting, LikelihoodWeightingResult, PriorSample, Randomizer, ReplayRandomizer,
    RngRandomizer,
};
pub use smoothing::{FixedLagSmoothing, ForwardBackward};
pub use table::{expected_size, Assignment, CategoricalDistribution, ProbabilityTable, TableIter};

/// Default tolerance when checking that a distribution or CPT row sums to 1.
pub const ROUNDING_THRESHOLD: f64 = 1e-8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_matches_full_joint() {
        let t = networks::toothache_cavity_catch().unwrap();
        let vars = t.network.variables_in_topological_order().to_vec();

        // brute-force P(Cavity | toothache) from the full joint
        let mut joint = ProbabilityTable::zeros(vars).unwrap();
        let cells: Vec<f64> = joint
            .iter()
            .map(|(a, _)| t.network.joint_probability(a.propositions()).unwrap())
            .collect();
        for (i, p) in cells.into_iter().enumerate() {
            joint.set_value(i, p).unwrap();
        }
        let evidence = [t.toothache.assign(true).unwrap()];
        let mut consistent = [0.0; 2];
        for (a, p) in joint.iter_with(&evidence).unwrap() {
            let cavity = t.cavity.offset_of(a.get(&t.cavity).unwrap()).unwrap();
            consistent[cavity] += p;
        }
        let z: f64 = consistent.iter().sum();

        let p = EnumerationAsk::new()
            .ask(&[t.cavity.clone()], &evidence, &t.network)
            .unwrap();
        assert!((p.values()[0] - consistent[0] / z).abs() < 1e-12);
        // 0.12 / (0.12 + 0.08)
        assert!((p.values()[0] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_error_messages() {
        let err = ProbError::RowNotNormalized {
            context: "CPT for Alarm".to_string(),
            row: 2,
            sum: 0.9,
        };
        assert_eq!(
            err.to_string(),
            "Row 2 of CPT for Alarm not normalized: sum = 0.9 (expected 1.0)"
        );
    }
}
