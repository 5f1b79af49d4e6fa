//! Canonical example models.
//!
//! Small textbook networks used by the demos and tests. Every variable is
//! boolean with domain `[true, false]`, so each CPT row below reads
//! `P(true | ...), P(false | ...)`, and rows run over the parent values
//! with the last parent varying fastest.

use crate::bayesnet::BayesianNetwork;
use crate::cpt::ConditionalProbabilityTable;
use crate::dbn::DynamicBayesianNetwork;
use crate::domain::RandomVariable;
use crate::error::ProbError;
use crate::hmm::HiddenMarkovModel;
use crate::kernel::Kernel;
use crate::table::ProbabilityTable;

/// Boolean CPT from `P(on = true | row)` for each parent row.
fn boolean_cpt(
    on: &RandomVariable,
    p_true: &[f64],
    parents: &[&RandomVariable],
) -> Result<ConditionalProbabilityTable, ProbError> {
    let values = p_true.iter().flat_map(|&p| [p, 1.0 - p]).collect();
    ConditionalProbabilityTable::new(
        on.clone(),
        values,
        parents.iter().map(|&p| p.clone()).collect(),
    )
}

/// The burglary alarm network.
///
/// ```text
/// Burglary   Earthquake
///        ↘   ↙
///        Alarm
///       ↙     ↘
/// JohnCalls  MaryCalls
/// ```
#[derive(Debug, Clone)]
pub struct BurglaryAlarm {
    pub burglary: RandomVariable,
    pub earthquake: RandomVariable,
    pub alarm: RandomVariable,
    pub john_calls: RandomVariable,
    pub mary_calls: RandomVariable,
    pub network: BayesianNetwork,
}

pub fn burglary_alarm() -> Result<BurglaryAlarm, ProbError> {
    let burglary = RandomVariable::boolean("Burglary");
    let earthquake = RandomVariable::boolean("Earthquake");
    let alarm = RandomVariable::boolean("Alarm");
    let john_calls = RandomVariable::boolean("JohnCalls");
    let mary_calls = RandomVariable::boolean("MaryCalls");

    let network = BayesianNetwork::new(vec![
        boolean_cpt(&burglary, &[0.001], &[])?,
        boolean_cpt(&earthquake, &[0.002], &[])?,
        // B,E = tt, tf, ft, ff
        boolean_cpt(&alarm, &[0.95, 0.94, 0.29, 0.001], &[&burglary, &earthquake])?,
        boolean_cpt(&john_calls, &[0.90, 0.05], &[&alarm])?,
        boolean_cpt(&mary_calls, &[0.70, 0.01], &[&alarm])?,
    ])?;

    Ok(BurglaryAlarm {
        burglary,
        earthquake,
        alarm,
        john_calls,
        mary_calls,
        network,
    })
}

/// The cloudy / sprinkler / rain / wet grass network.
///
/// ```text
///        Cloudy
///      ↙       ↘
/// Sprinkler    Rain
///      ↘       ↙
///       WetGrass
/// ```
#[derive(Debug, Clone)]
pub struct SprinklerNetwork {
    pub cloudy: RandomVariable,
    pub sprinkler: RandomVariable,
    pub rain: RandomVariable,
    pub wet_grass: RandomVariable,
    pub network: BayesianNetwork,
}

pub fn cloudy_sprinkler_rain() -> Result<SprinklerNetwork, ProbError> {
    let cloudy = RandomVariable::boolean("Cloudy");
    let sprinkler = RandomVariable::boolean("Sprinkler");
    let rain = RandomVariable::boolean("Rain");
    let wet_grass = RandomVariable::boolean("WetGrass");

    let network = BayesianNetwork::new(vec![
        boolean_cpt(&cloudy, &[0.5], &[])?,
        boolean_cpt(&sprinkler, &[0.1, 0.5], &[&cloudy])?,
        boolean_cpt(&rain, &[0.8, 0.2], &[&cloudy])?,
        // S,R = tt, tf, ft, ff
        boolean_cpt(&wet_grass, &[0.99, 0.9, 0.9, 0.0], &[&sprinkler, &rain])?,
    ])?;

    Ok(SprinklerNetwork {
        cloudy,
        sprinkler,
        rain,
        wet_grass,
        network,
    })
}

/// Cavity with two conditionally independent symptoms.
#[derive(Debug, Clone)]
pub struct ToothacheNetwork {
    pub cavity: RandomVariable,
    pub toothache: RandomVariable,
    pub catch: RandomVariable,
    pub network: BayesianNetwork,
}

pub fn toothache_cavity_catch() -> Result<ToothacheNetwork, ProbError> {
    let cavity = RandomVariable::boolean("Cavity");
    let toothache = RandomVariable::boolean("Toothache");
    let catch = RandomVariable::boolean("Catch");

    let network = BayesianNetwork::new(vec![
        boolean_cpt(&cavity, &[0.2], &[])?,
        boolean_cpt(&toothache, &[0.6, 0.1], &[&cavity])?,
        boolean_cpt(&catch, &[0.9, 0.2], &[&cavity])?,
    ])?;

    Ok(ToothacheNetwork {
        cavity,
        toothache,
        catch,
        network,
    })
}

/// The umbrella world as an HMM over `Rain` observed through `Umbrella`.
pub fn umbrella_hmm() -> Result<HiddenMarkovModel, ProbError> {
    let rain = RandomVariable::boolean("Rain");
    let umbrella = RandomVariable::boolean("Umbrella");
    HiddenMarkovModel::new(
        rain.clone(),
        umbrella,
        Kernel::new(vec![vec![0.7, 0.3], vec![0.3, 0.7]])?,
        Kernel::new(vec![vec![0.9, 0.1], vec![0.2, 0.8]])?,
        ProbabilityTable::distribution(vec![0.5, 0.5], vec![rain])?,
    )
}

/// The umbrella world as a two-slice DBN.
#[derive(Debug, Clone)]
pub struct UmbrellaDbn {
    pub rain_prev: RandomVariable,
    pub rain: RandomVariable,
    pub umbrella: RandomVariable,
    pub dbn: DynamicBayesianNetwork,
}

pub fn umbrella_dbn() -> Result<UmbrellaDbn, ProbError> {
    let rain_prev = RandomVariable::boolean("Rain_t-1");
    let rain = RandomVariable::boolean("Rain_t");
    let umbrella = RandomVariable::boolean("Umbrella_t");

    let prior_cpt = boolean_cpt(&rain_prev, &[0.5], &[])?;
    let prior = BayesianNetwork::new(vec![prior_cpt.clone()])?;
    let network = BayesianNetwork::new(vec![
        prior_cpt,
        boolean_cpt(&rain, &[0.7, 0.3], &[&rain_prev])?,
        boolean_cpt(&umbrella, &[0.9, 0.2], &[&rain])?,
    ])?;
    let dbn = DynamicBayesianNetwork::new(
        prior,
        network,
        vec![(rain_prev.clone(), rain.clone())],
        vec![umbrella.clone()],
    )?;

    Ok(UmbrellaDbn {
        rain_prev,
        rain,
        umbrella,
        dbn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burglary_joint_sums_to_one() {
        let alarm = burglary_alarm().unwrap();
        let vars = alarm.network.variables_in_topological_order().to_vec();
        let scope = ProbabilityTable::zeros(vars).unwrap();
        let total: f64 = scope
            .iter()
            .map(|(a, _)| alarm.network.joint_probability(a.propositions()).unwrap())
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_networks_build() {
        assert_eq!(cloudy_sprinkler_rain().unwrap().network.len(), 4);
        assert_eq!(toothache_cavity_catch().unwrap().network.edge_count(), 2);
        assert_eq!(umbrella_dbn().unwrap().dbn.network().len(), 3);
    }

    #[test]
    fn test_wet_grass_without_water_is_dry() {
        let s = cloudy_sprinkler_rain().unwrap();
        let cpt = s.network.node(&s.wet_grass).unwrap().cpt();
        let row = cpt
            .conditioning_case_for(&[s.rain.assign(false).unwrap(), s.sprinkler.assign(false).unwrap()])
            .unwrap();
        assert_eq!(row.values(), &[0.0, 1.0]);
    }
}
