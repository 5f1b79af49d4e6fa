//! Configuration for the approximate inference engines.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ProbError;
use crate::sampling::RngRandomizer;
use crate::ROUNDING_THRESHOLD;

fn default_rounding_threshold() -> f64 {
    ROUNDING_THRESHOLD
}

fn default_particle_count() -> usize {
    InferenceConfig::DEFAULT_PARTICLE_COUNT
}

fn default_sample_count() -> usize {
    InferenceConfig::DEFAULT_SAMPLE_COUNT
}

/// Engine settings.
///
/// The rounding threshold is applied by
/// [`ConditionalProbabilityTable::from_config`](crate::ConditionalProbabilityTable::from_config)
/// and [`Kernel::from_config`](crate::Kernel::from_config); the counts and
/// seed drive the sampling-based engines.
///
/// Builder style; every field has a default so partial JSON documents are
/// accepted.
///
/// # Examples
///
/// ```
/// use compositional_inference::InferenceConfig;
///
/// let config = InferenceConfig::new()
///     .with_particle_count(500)
///     .with_seed(42);
/// assert_eq!(config.particle_count, 500);
///
/// let parsed = InferenceConfig::from_json(r#"{ "particle_count": 50 }"#).unwrap();
/// assert_eq!(parsed.particle_count, 50);
/// assert_eq!(parsed.seed, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Tolerance used when checking that rows and distributions sum to 1
    #[serde(default = "default_rounding_threshold")]
    pub rounding_threshold: f64,
    /// Number of particles N kept by particle filtering
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    /// Number of weighted samples drawn by likelihood weighting
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
}

impl InferenceConfig {
    pub const DEFAULT_PARTICLE_COUNT: usize = 1000;
    pub const DEFAULT_SAMPLE_COUNT: usize = 10_000;

    /// Defaults: threshold 1e-8, 1000 particles, 10 000 samples, no seed.
    pub fn new() -> Self {
        Self {
            rounding_threshold: ROUNDING_THRESHOLD,
            particle_count: Self::DEFAULT_PARTICLE_COUNT,
            sample_count: Self::DEFAULT_SAMPLE_COUNT,
            seed: None,
        }
    }

    pub fn with_rounding_threshold(mut self, threshold: f64) -> Self {
        self.rounding_threshold = threshold;
        self
    }

    pub fn with_particle_count(mut self, n: usize) -> Self {
        self.particle_count = n;
        self
    }

    pub fn with_sample_count(mut self, n: usize) -> Self {
        self.sample_count = n;
        self
    }

    /// Set the random seed for deterministic behavior.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ProbError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ProbError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ProbError> {
        serde_json::to_string_pretty(self).map_err(|e| ProbError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    /// Check that counts are positive and the threshold is usable.
    pub fn validate(&self) -> Result<(), ProbError> {
        if !(self.rounding_threshold >= 0.0 && self.rounding_threshold < 1.0) {
            return Err(ProbError::InvalidConfig {
                reason: format!(
                    "rounding_threshold must be in [0, 1), got {}",
                    self.rounding_threshold
                ),
            });
        }
        if self.particle_count == 0 {
            return Err(ProbError::InvalidConfig {
                reason: "particle_count must be positive".to_string(),
            });
        }
        if self.sample_count == 0 {
            return Err(ProbError::InvalidConfig {
                reason: "sample_count must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// A randomizer seeded from `seed`, or from OS entropy when unset.
    pub fn randomizer(&self) -> RngRandomizer<StdRng> {
        match self.seed {
            Some(seed) => RngRandomizer::new(StdRng::seed_from_u64(seed)),
            None => RngRandomizer::new(StdRng::from_entropy()),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::new()
    }
}
