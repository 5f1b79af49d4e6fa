//! # Bayesian Network Tests
//!
//! Exact and approximate queries against the textbook networks:
//! - Enumeration on the burglary alarm and sprinkler networks
//! - Likelihood weighting against the exact answers
//! - Seeded runs are reproducible

use approx::assert_abs_diff_eq;
use compositional_inference::{
    networks, EnumerationAsk, InferenceConfig, LikelihoodWeighting, PriorSample, ProbError,
    RngRandomizer,
};

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn test_burglary_given_both_calls() {
    let alarm = networks::burglary_alarm().unwrap();
    let evidence = [
        alarm.john_calls.assign(true).unwrap(),
        alarm.mary_calls.assign(true).unwrap(),
    ];
    let p = EnumerationAsk::new()
        .ask(&[alarm.burglary.clone()], &evidence, &alarm.network)
        .unwrap();

    assert_abs_diff_eq!(p.values()[0], 0.284, epsilon = 1e-3);
    assert_abs_diff_eq!(p.values()[1], 0.716, epsilon = 1e-3);
}

#[test]
fn test_burglary_prior_without_evidence() {
    let alarm = networks::burglary_alarm().unwrap();
    let p = EnumerationAsk::new()
        .ask(&[alarm.burglary.clone()], &[], &alarm.network)
        .unwrap();
    assert_abs_diff_eq!(p.values()[0], 0.001, epsilon = 1e-12);
}

#[test]
fn test_joint_query_is_a_distribution() {
    let alarm = networks::burglary_alarm().unwrap();
    let evidence = [alarm.john_calls.assign(true).unwrap()];
    let p = EnumerationAsk::new()
        .ask(
            &[alarm.burglary.clone(), alarm.earthquake.clone()],
            &evidence,
            &alarm.network,
        )
        .unwrap();
    assert_eq!(p.len(), 4);
    assert!(p.is_normalized(1e-12));
}

#[test]
fn test_sprinkler_given_wet_grass() {
    let s = networks::cloudy_sprinkler_rain().unwrap();
    let evidence = [s.wet_grass.assign(true).unwrap()];
    let ask = EnumerationAsk::new();

    let rain = ask.ask(&[s.rain.clone()], &evidence, &s.network).unwrap();
    assert_abs_diff_eq!(rain.values()[0], 0.7079, epsilon = 1e-3);

    let sprinkler = ask.ask(&[s.sprinkler.clone()], &evidence, &s.network).unwrap();
    assert_abs_diff_eq!(sprinkler.values()[0], 0.4298, epsilon = 1e-3);
}

#[test]
fn test_evidence_on_unknown_variable() {
    let alarm = networks::burglary_alarm().unwrap();
    let s = networks::cloudy_sprinkler_rain().unwrap();
    let result = EnumerationAsk::new().ask(
        &[alarm.burglary.clone()],
        &[s.cloudy.assign(true).unwrap()],
        &alarm.network,
    );
    assert!(matches!(result, Err(ProbError::UnknownVariable { .. })));
}

// ============================================================================
// Sampling
// ============================================================================

#[test]
fn test_likelihood_weighting_approximates_enumeration() {
    let s = networks::cloudy_sprinkler_rain().unwrap();
    let evidence = [s.sprinkler.assign(true).unwrap()];

    let exact = EnumerationAsk::new()
        .ask(&[s.rain.clone()], &evidence, &s.network)
        .unwrap();
    let config = InferenceConfig::new().with_sample_count(20_000).with_seed(11);
    let result = LikelihoodWeighting::from_config(&config)
        .unwrap()
        .ask_with_diagnostics(&[s.rain.clone()], &evidence, &s.network)
        .unwrap();

    // P(Rain | sprinkler) = 0.3
    assert_abs_diff_eq!(exact.values()[0], 0.3, epsilon = 1e-9);
    assert_abs_diff_eq!(result.posterior.values()[0], exact.values()[0], epsilon = 0.02);
    assert_eq!(result.samples, 20_000);
    assert!(result.effective_sample_size > 0.0);
    assert!(result.effective_sample_size <= 20_000.0);
}

#[test]
fn test_seeded_runs_repeat() {
    let alarm = networks::burglary_alarm().unwrap();
    let evidence = [alarm.john_calls.assign(true).unwrap()];
    let run = || {
        LikelihoodWeighting::new(RngRandomizer::seeded(3), 500)
            .ask(&[alarm.alarm.clone()], &evidence, &alarm.network)
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_prior_samples_follow_topological_order() {
    let alarm = networks::burglary_alarm().unwrap();
    let mut sampler = PriorSample::new(RngRandomizer::seeded(5));
    for _ in 0..20 {
        let event = sampler.prior_sample(&alarm.network).unwrap();
        let vars: Vec<_> = event.iter().map(|ap| ap.variable().clone()).collect();
        assert_eq!(vars, alarm.network.variables_in_topological_order());
    }
}
