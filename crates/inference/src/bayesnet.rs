//! Bayesian networks as directed acyclic graphs of conditional tables.
//!
//! A Bayesian network is a directed acyclic graph where:
//! - Nodes are random variables
//! - Edges run from each parent to its child
//! - Each node carries `P(node | parents)` as a [`ConditionalProbabilityTable`]
//!
//! The graph is derived from the CPTs, so a node's parents are exactly the
//! parent scope of its table. The topological order is computed once with
//! petgraph and cached; every inference routine walks it.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::cpt::ConditionalProbabilityTable;
use crate::domain::{AssignmentProposition, RandomVariable};
use crate::error::ProbError;

/// One random variable of a network with its CPT and graph neighbours.
#[derive(Debug, Clone)]
pub struct Node {
    variable: RandomVariable,
    cpt: ConditionalProbabilityTable,
    children: Vec<RandomVariable>,
}

impl Node {
    pub fn variable(&self) -> &RandomVariable {
        &self.variable
    }

    pub fn cpt(&self) -> &ConditionalProbabilityTable {
        &self.cpt
    }

    pub fn parents(&self) -> &[RandomVariable] {
        self.cpt.parents()
    }

    pub fn children(&self) -> &[RandomVariable] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.cpt.parents().is_empty()
    }
}

/// An immutable Bayesian network.
///
/// # Example
///
/// ```rust
/// use compositional_inference::{BayesianNetwork, ConditionalProbabilityTable, RandomVariable};
///
/// let rain = RandomVariable::boolean("Rain");
/// let wet = RandomVariable::boolean("WetGrass");
/// let net = BayesianNetwork::new(vec![
///     ConditionalProbabilityTable::new(wet.clone(), vec![0.9, 0.1, 0.1, 0.9], vec![rain.clone()]).unwrap(),
///     ConditionalProbabilityTable::new(rain.clone(), vec![0.2, 0.8], vec![]).unwrap(),
/// ]).unwrap();
///
/// assert_eq!(net.variables_in_topological_order(), &[rain, wet]);
/// ```
#[derive(Debug, Clone)]
pub struct BayesianNetwork {
    graph: DiGraph<RandomVariable, ()>,
    nodes: Vec<Node>,
    index: HashMap<RandomVariable, usize>,
    order: Vec<RandomVariable>,
}

impl BayesianNetwork {
    /// Build a network from one CPT per variable, in any order.
    ///
    /// # Errors
    ///
    /// - [`ProbError::DuplicateVariable`] if two CPTs are over the same variable
    /// - [`ProbError::MissingParent`] if a CPT names a parent without a CPT
    /// - [`ProbError::CyclicNetwork`] if the parent links form a cycle
    pub fn new(cpts: Vec<ConditionalProbabilityTable>) -> Result<Self, ProbError> {
        let mut graph = DiGraph::new();
        let mut node_ids: HashMap<RandomVariable, NodeIndex> = HashMap::new();
        for cpt in &cpts {
            let id = graph.add_node(cpt.on().clone());
            if node_ids.insert(cpt.on().clone(), id).is_some() {
                return Err(ProbError::DuplicateVariable {
                    name: cpt.on().name().to_string(),
                });
            }
        }

        for cpt in &cpts {
            let child = node_ids[cpt.on()];
            for parent in cpt.parents() {
                let parent_id = node_ids.get(parent).ok_or_else(|| ProbError::MissingParent {
                    variable: cpt.on().name().to_string(),
                    parent: parent.name().to_string(),
                })?;
                graph.add_edge(*parent_id, child, ());
            }
        }

        let sorted = toposort(&graph, None).map_err(|cycle| ProbError::CyclicNetwork {
            variable: graph[cycle.node_id()].name().to_string(),
        })?;
        let order: Vec<RandomVariable> = sorted.into_iter().map(|id| graph[id].clone()).collect();

        let nodes: Vec<Node> = cpts
            .iter()
            .map(|cpt| Node {
                variable: cpt.on().clone(),
                children: cpts
                    .iter()
                    .filter(|c| c.parents().contains(cpt.on()))
                    .map(|c| c.on().clone())
                    .collect(),
                cpt: cpt.clone(),
            })
            .collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.variable.clone(), i))
            .collect();

        debug!(
            nodes = nodes.len(),
            edges = graph.edge_count(),
            "built Bayesian network"
        );

        Ok(Self {
            graph,
            nodes,
            index,
            order,
        })
    }

    /// Variables ordered so that every parent precedes its children.
    ///
    /// The order is fixed at construction and identical across calls.
    pub fn variables_in_topological_order(&self) -> &[RandomVariable] {
        &self.order
    }

    pub fn node(&self, var: &RandomVariable) -> Option<&Node> {
        self.index.get(var).map(|&i| &self.nodes[i])
    }

    pub(crate) fn node_or_err(&self, var: &RandomVariable) -> Result<&Node, ProbError> {
        self.node(var).ok_or_else(|| ProbError::UnknownVariable {
            name: var.name().to_string(),
        })
    }

    /// Validate the arguments of a query: every variable must belong to the
    /// network, query variables must be distinct and no variable may be
    /// observed twice.
    pub fn check_query(
        &self,
        query: &[RandomVariable],
        evidence: &[AssignmentProposition],
    ) -> Result<(), ProbError> {
        for (i, q) in query.iter().enumerate() {
            self.node_or_err(q)?;
            if query[..i].contains(q) {
                return Err(ProbError::DuplicateVariable {
                    name: q.name().to_string(),
                });
            }
        }
        for (i, ap) in evidence.iter().enumerate() {
            self.node_or_err(ap.variable())?;
            if evidence[..i].iter().any(|e| e.variable() == ap.variable()) {
                return Err(ProbError::DuplicateVariable {
                    name: ap.variable().name().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, var: &RandomVariable) -> bool {
        self.index.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The CPTs of the network, in construction order.
    pub fn cpts(&self) -> impl Iterator<Item = &ConditionalProbabilityTable> {
        self.nodes.iter().map(|n| &n.cpt)
    }

    /// Probability of a full joint assignment: the product of every node's
    /// CPT entry.
    pub fn joint_probability(&self, assignment: &[AssignmentProposition]) -> Result<f64, ProbError> {
        let mut p = 1.0;
        for cpt in self.cpts() {
            let local: Vec<AssignmentProposition> = cpt
                .vars()
                .iter()
                .map(|v| {
                    assignment
                        .iter()
                        .find(|ap| ap.variable() == v)
                        .cloned()
                        .ok_or_else(|| ProbError::UnknownVariable {
                            name: v.name().to_string(),
                        })
                })
                .collect::<Result<_, _>>()?;
            p *= cpt.probability(&local)?;
        }
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (RandomVariable, RandomVariable, RandomVariable, Vec<ConditionalProbabilityTable>) {
        let a = RandomVariable::boolean("A");
        let b = RandomVariable::boolean("B");
        let c = RandomVariable::boolean("C");
        let cpts = vec![
            ConditionalProbabilityTable::new(c.clone(), vec![0.9, 0.1, 0.4, 0.6], vec![b.clone()]).unwrap(),
            ConditionalProbabilityTable::new(b.clone(), vec![0.3, 0.7, 0.8, 0.2], vec![a.clone()]).unwrap(),
            ConditionalProbabilityTable::new(a.clone(), vec![0.25, 0.75], vec![]).unwrap(),
        ];
        (a, b, c, cpts)
    }

    #[test]
    fn test_topological_order() {
        let (a, b, c, cpts) = chain();
        let net = BayesianNetwork::new(cpts).unwrap();
        assert_eq!(net.variables_in_topological_order(), &[a.clone(), b.clone(), c.clone()]);
        assert_eq!(net.node(&a).unwrap().children(), &[b.clone()]);
        assert_eq!(net.node(&c).unwrap().parents(), &[b]);
        assert!(net.node(&a).unwrap().is_root());
        assert_eq!(net.edge_count(), 2);
    }

    #[test]
    fn test_missing_parent() {
        let a = RandomVariable::boolean("A");
        let b = RandomVariable::boolean("B");
        let cpt = ConditionalProbabilityTable::new(b, vec![0.5, 0.5, 0.5, 0.5], vec![a]).unwrap();
        assert!(matches!(
            BayesianNetwork::new(vec![cpt]),
            Err(ProbError::MissingParent { .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let a = RandomVariable::boolean("A");
        let b = RandomVariable::boolean("B");
        let cpts = vec![
            ConditionalProbabilityTable::new(a.clone(), vec![0.5, 0.5, 0.5, 0.5], vec![b.clone()]).unwrap(),
            ConditionalProbabilityTable::new(b, vec![0.5, 0.5, 0.5, 0.5], vec![a]).unwrap(),
        ];
        assert!(matches!(
            BayesianNetwork::new(cpts),
            Err(ProbError::CyclicNetwork { .. })
        ));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let a = RandomVariable::boolean("A");
        let cpts = vec![
            ConditionalProbabilityTable::new(a.clone(), vec![0.5, 0.5], vec![]).unwrap(),
            ConditionalProbabilityTable::new(a, vec![0.1, 0.9], vec![]).unwrap(),
        ];
        assert!(matches!(
            BayesianNetwork::new(cpts),
            Err(ProbError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn test_joint_probability() {
        let (a, b, c, cpts) = chain();
        let net = BayesianNetwork::new(cpts).unwrap();
        let p = net
            .joint_probability(&[
                a.assign(true).unwrap(),
                b.assign(false).unwrap(),
                c.assign(true).unwrap(),
            ])
            .unwrap();
        assert!((p - 0.25 * 0.7 * 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_cpts_in_construction_order() {
        let (a, b, c, cpts) = chain();
        let net = BayesianNetwork::new(cpts).unwrap();
        let on: Vec<&RandomVariable> = net.cpts().map(|cpt| cpt.on()).collect();
        assert_eq!(on, vec![&c, &b, &a]);
    }
}
