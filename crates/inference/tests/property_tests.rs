//! Property tests for table algebra and message passing invariants

use compositional_inference::{
    networks, FiniteDomain, ForwardBackward, Kernel, ProbabilityTable, RandomVariable,
};
use proptest::prelude::*;

fn ab_scope() -> (RandomVariable, RandomVariable) {
    let a = RandomVariable::boolean("A");
    let b = RandomVariable::new("B", FiniteDomain::integers(0, 2).unwrap());
    (a, b)
}

fn stochastic_row(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

proptest! {
    #[test]
    fn normalize_sums_to_one(values in prop::collection::vec(1e-6f64..10.0, 6)) {
        let (a, b) = ab_scope();
        let t = ProbabilityTable::new(values, vec![a, b]).unwrap().normalize();
        prop_assert!((t.sum() - 1.0).abs() < 1e-9);
        prop_assert!(t.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn marginal_of_normalized_table_is_normalized(values in prop::collection::vec(1e-6f64..10.0, 6)) {
        let (a, b) = ab_scope();
        let t = ProbabilityTable::new(values, vec![a.clone(), b.clone()]).unwrap().normalize();
        let over_b = t.sum_out(&[a]).unwrap();
        prop_assert_eq!(over_b.vars(), &[b][..]);
        prop_assert!((over_b.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn product_then_divide_recovers_table(
        joint in prop::collection::vec(0.0f64..5.0, 6),
        factor in prop::collection::vec(0.1f64..5.0, 3),
    ) {
        let (a, b) = ab_scope();
        let t = ProbabilityTable::new(joint, vec![a, b.clone()]).unwrap();
        let f = ProbabilityTable::new(factor, vec![b]).unwrap();
        let back = t.pointwise_product(&f).unwrap().divide_by(&f).unwrap();
        for (x, y) in back.values().iter().zip(t.values()) {
            prop_assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn product_commutes_up_to_layout(
        left in prop::collection::vec(0.0f64..5.0, 2),
        right in prop::collection::vec(0.0f64..5.0, 3),
    ) {
        let (a, b) = ab_scope();
        let ta = ProbabilityTable::new(left, vec![a.clone()]).unwrap();
        let tb = ProbabilityTable::new(right, vec![b.clone()]).unwrap();
        let order = [a, b];
        let ab = ta.pointwise_product_pos(&tb, &order).unwrap();
        let ba = tb.pointwise_product_pos(&ta, &order).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn kernel_composition_stays_stochastic(
        r1 in prop::collection::vec(0.01f64..1.0, 3),
        r2 in prop::collection::vec(0.01f64..1.0, 3),
        s1 in prop::collection::vec(0.01f64..1.0, 2),
        s2 in prop::collection::vec(0.01f64..1.0, 2),
        s3 in prop::collection::vec(0.01f64..1.0, 2),
    ) {
        let f = Kernel::new(vec![stochastic_row(r1), stochastic_row(r2)]).unwrap();
        let g = Kernel::new(vec![stochastic_row(s1), stochastic_row(s2), stochastic_row(s3)]).unwrap();
        let h = f.compose(&g).unwrap();
        prop_assert_eq!(h.n_inputs, 2);
        prop_assert_eq!(h.n_outputs, 2);
        for row in &h.k {
            prop_assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn smoothed_estimates_are_distributions(days in prop::collection::vec(any::<bool>(), 1..8)) {
        let fb = ForwardBackward::new(networks::umbrella_hmm().unwrap());
        let umbrella = fb.hmm().evidence_variable().clone();
        let evidence: Vec<_> = days.iter().map(|&d| vec![umbrella.assign(d).unwrap()]).collect();
        let smoothed = fb.forward_backward(&evidence, fb.hmm().prior()).unwrap();
        prop_assert_eq!(smoothed.len(), days.len());
        for s in &smoothed {
            prop_assert!(s.is_normalized(1e-9));
        }
    }
}
