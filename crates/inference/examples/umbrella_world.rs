//! Temporal inference in the umbrella world
//!
//! Run with: cargo run -p compositional-inference --example umbrella_world
//!
//! This example demonstrates:
//! - Filtering with the forward message
//! - Offline smoothing with forward-backward
//! - Online smoothing with a fixed lag
//! - Particle filtering on the same model as a two-slice DBN
//!
//! A guard sees whether the director carries an umbrella and must infer
//! whether it is raining outside.

use compositional_inference::{
    networks, FixedLagSmoothing, ForwardBackward, InferenceConfig, ParticleFiltering, ProbError,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ProbError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Umbrella World ===\n");

    let hmm = networks::umbrella_hmm()?;
    let umbrella = hmm.evidence_variable().clone();
    let days = [true, true, false, true, true];
    let evidence = days
        .iter()
        .map(|&d| Ok(vec![umbrella.assign(d)?]))
        .collect::<Result<Vec<_>, ProbError>>()?;

    println!("Transition T:\n{}", hmm.transition_matrix());
    println!("Observations: {:?}", days);
    println!();

    // -------------------------------------------------------------------------
    // 1. Filtering
    // -------------------------------------------------------------------------
    println!("1. Filtering: P(Rain_t | e_1:t)");
    println!("-------------------------------");
    println!();

    let fb = ForwardBackward::new(hmm.clone());
    let mut f = fb.hmm().prior().clone();
    for (t, e) in evidence.iter().enumerate() {
        f = fb.forward(&f, e)?;
        println!("  t={}  {}", t + 1, f);
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Smoothing
    // -------------------------------------------------------------------------
    println!("2. Smoothing: P(Rain_k | e_1:5)");
    println!("-------------------------------");
    println!();

    for (k, s) in fb.forward_backward(&evidence, fb.hmm().prior())?.iter().enumerate() {
        println!("  k={}  {}", k + 1, s);
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. Fixed-Lag Smoothing
    // -------------------------------------------------------------------------
    println!("3. Fixed-Lag Smoothing (d = 2)");
    println!("------------------------------");
    println!();

    let mut fls = FixedLagSmoothing::new(hmm, 2)?;
    for e in &evidence {
        let t = fls.time();
        match fls.fixed_lag_smoothing(e)? {
            Some(s) => println!("  t={}  P(Rain_{} | e_1:{}) = {}", t, t - 2, t, s),
            None => println!("  t={}  (not enough evidence yet)", t),
        }
    }
    println!();

    // -------------------------------------------------------------------------
    // 4. Particle Filtering
    // -------------------------------------------------------------------------
    println!("4. Particle Filtering");
    println!("---------------------");
    println!();

    let world = networks::umbrella_dbn()?;
    let config = InferenceConfig::new().with_particle_count(2000).with_seed(1);
    let mut pf = ParticleFiltering::from_config(world.dbn.clone(), &config)?;
    for (t, &d) in days.iter().enumerate() {
        let set = pf.particle_filtering(&[world.umbrella.assign(d)?])?;
        println!(
            "  t={}  rainy particles: {:4} / {}  estimate {}",
            t + 1,
            set.count_with(&world.rain.assign(true)?),
            set.len(),
            set.estimate(&world.rain)?
        );
    }

    Ok(())
}
