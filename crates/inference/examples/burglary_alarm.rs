//! Exact and approximate queries on the burglary alarm network
//!
//! Run with: cargo run -p compositional-inference --example burglary_alarm
//!
//! Set `RUST_LOG=compositional_inference=debug` to watch the engines work.
//!
//! This example demonstrates:
//! - Building a network from CPTs
//! - ENUMERATION-ASK for P(Burglary | JohnCalls, MaryCalls)
//! - Likelihood weighting against the exact answer
//! - Configuration loaded from JSON

use compositional_inference::{networks, EnumerationAsk, InferenceConfig, LikelihoodWeighting, ProbError};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ProbError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Burglary Alarm ===\n");

    // -------------------------------------------------------------------------
    // 1. The Network
    // -------------------------------------------------------------------------
    println!("1. The Network");
    println!("--------------");
    println!();
    println!("  Burglary   Earthquake");
    println!("         ↘   ↙");
    println!("         Alarm");
    println!("        ↙     ↘");
    println!("  JohnCalls  MaryCalls");
    println!();

    let alarm = networks::burglary_alarm()?;
    for cpt in alarm.network.cpts() {
        println!("  P({} | {:?}) = {}", cpt.on(), cpt.parents(), cpt.table());
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Exact Inference
    // -------------------------------------------------------------------------
    println!("2. Exact Inference");
    println!("------------------");
    println!();

    let evidence = [alarm.john_calls.assign(true)?, alarm.mary_calls.assign(true)?];
    let exact = EnumerationAsk::new().ask(&[alarm.burglary.clone()], &evidence, &alarm.network)?;
    println!("  P(Burglary | j, m) = {}", exact);

    let both = EnumerationAsk::new().ask(
        &[alarm.burglary.clone(), alarm.earthquake.clone()],
        &evidence,
        &alarm.network,
    )?;
    println!("  P(Burglary, Earthquake | j, m) = {}", both);
    println!();

    // -------------------------------------------------------------------------
    // 3. Likelihood Weighting
    // -------------------------------------------------------------------------
    println!("3. Likelihood Weighting");
    println!("-----------------------");
    println!();

    let config = InferenceConfig::from_json(r#"{ "sample_count": 200000, "seed": 42 }"#)?;
    let result = LikelihoodWeighting::from_config(&config)?.ask_with_diagnostics(
        &[alarm.burglary.clone()],
        &evidence,
        &alarm.network,
    )?;
    println!("  samples:               {}", result.samples);
    println!("  effective sample size: {:.1}", result.effective_sample_size);
    println!("  estimate:              {}", result.posterior);
    println!("  exact:                 {}", exact);
    println!();
    println!("Evidence this unlikely leaves most weight on a few samples.");

    Ok(())
}
