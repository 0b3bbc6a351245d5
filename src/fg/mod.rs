//! The propositional factor graph: a bipartite graph of random variables and factors.

pub mod factor;
pub mod rv;

pub use factor::{Factor, PotentialTable};
pub use rv::{RandVar, RangeValue};

use crate::error::{CoreError, Result};
use std::collections::{HashSet, LinkedList};
use std::rc::Rc;

/// Either side of the bipartite graph, for BFS traversal, reachability queries,
/// and the generic `neighbors` query that answers "neighbors of either node
/// kind" directly, rather than only through the RV- and factor-scoped helpers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Rv(String),
    Factor(String),
}

/// A propositional factor graph: an ordered list of random variables and an ordered
/// list of factors over them.
///
/// Node order is preserved from insertion for both sides; nothing here ever
/// iterates a `HashMap`/`HashSet` directly over the nodes themselves, so the
/// integer colors color refinement hands out are reproducible run to run.
#[derive(Debug, Clone)]
pub struct FactorGraph {
    pub rvs: Vec<Rc<RandVar>>,
    pub factors: Vec<Factor>,
}

impl FactorGraph {
    pub fn new() -> Self {
        Self {
            rvs: Vec::new(),
            factors: Vec::new(),
        }
    }

    pub fn add_rv(&mut self, rv: RandVar) -> Rc<RandVar> {
        let rc = Rc::new(rv);
        self.rvs.push(Rc::clone(&rc));
        rc
    }

    pub fn add_factor(&mut self, factor: Factor) {
        self.factors.push(factor);
    }

    /// Remove the named RV and drop every scope reference to it, the way a
    /// vertex removal drops its incident edges. Factors left with a shrunken
    /// scope keep whatever potential table they had; `validate` is what
    /// catches tables that no longer match, not `remove_rv` itself.
    pub fn remove_rv(&mut self, name: &str) {
        self.rvs.retain(|rv| rv.name != name);
        for factor in &mut self.factors {
            factor.scope.retain(|rv| rv.name != name);
        }
    }

    /// Remove the named factor, taking every edge it owned with it.
    pub fn remove_factor(&mut self, name: &str) {
        self.factors.retain(|f| f.name != name);
    }

    pub fn rv_by_name(&self, name: &str) -> Option<&Rc<RandVar>> {
        self.rvs.iter().find(|rv| rv.name == name)
    }

    pub fn factor_by_name(&self, name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.name == name)
    }

    pub fn contains_rv(&self, name: &str) -> bool {
        self.rv_by_name(name).is_some()
    }

    pub fn contains_factor(&self, name: &str) -> bool {
        self.factor_by_name(name).is_some()
    }

    /// Whether an edge connects the named RV to the named factor, i.e. the RV
    /// appears in that factor's scope.
    pub fn contains_edge(&self, rv_name: &str, factor_name: &str) -> bool {
        self.factor_by_name(factor_name)
            .map(|f| f.scope.iter().any(|rv| rv.name == rv_name))
            .unwrap_or(false)
    }

    /// The factors whose scope includes the named RV, in factor-list order.
    pub fn incident_factors(&self, rv_name: &str) -> Vec<&Factor> {
        self.factors
            .iter()
            .filter(|f| f.scope.iter().any(|rv| rv.name == rv_name))
            .collect()
    }

    /// The RVs in a factor's scope that neighbor a given RV through that factor,
    /// i.e. the rest of the factor's scope.
    pub fn factor_neighbors(&self, factor_name: &str) -> Vec<&Rc<RandVar>> {
        match self.factor_by_name(factor_name) {
            Some(f) => f.scope.iter().collect(),
            None => Vec::new(),
        }
    }

    /// Every unknown factor (empty effective potential table), in factor-list order.
    pub fn unknown_factors(&self) -> Vec<&Factor> {
        self.factors.iter().filter(|f| f.is_unknown()).collect()
    }

    /// Neighbors of either node kind in the bipartite graph: a RV's neighbors
    /// are its incident factors, a factor's neighbors are the RVs in its scope.
    pub fn neighbors(&self, node: &Node) -> Vec<Node> {
        match node {
            Node::Rv(name) => self
                .incident_factors(name)
                .into_iter()
                .map(|f| Node::Factor(f.name.clone()))
                .collect(),
            Node::Factor(name) => self
                .factor_neighbors(name)
                .into_iter()
                .map(|rv| Node::Rv(rv.name.clone()))
                .collect(),
        }
    }

    /// BFS over the bipartite graph starting from the named RV, following the
    /// teacher's `LinkedList`-as-queue shape used throughout
    /// `static_a::{search,connected_components}`.
    fn reachable_from(&self, start: Node) -> HashSet<Node> {
        let mut visited = HashSet::new();
        let mut queue = LinkedList::new();
        queue.push_back(start.clone());
        visited.insert(start);

        while let Some(node) = queue.pop_front() {
            for next in self.neighbors(&node) {
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    /// Whether the whole graph is a single connected component.
    pub fn is_connected(&self) -> bool {
        let total = self.rvs.len() + self.factors.len();
        if total == 0 {
            return true;
        }
        let start = self
            .rvs
            .first()
            .map(|rv| Node::Rv(rv.name.clone()))
            .or_else(|| self.factors.first().map(|f| Node::Factor(f.name.clone())))
            .unwrap();
        self.reachable_from(start).len() == total
    }

    /// Structural invariants: unique names on each side, every factor's scope
    /// resolved against `self.rvs` by `Rc` identity, and every known factor's
    /// table sized to its scope.
    pub fn validate(&self) -> Result<()> {
        let mut seen_rvs = HashSet::new();
        for rv in &self.rvs {
            if !seen_rvs.insert(rv.name.as_str()) {
                return Err(CoreError::InvariantViolation(format!(
                    "duplicate random variable name '{}'",
                    rv.name
                )));
            }
        }

        let mut seen_factors = HashSet::new();
        for factor in &self.factors {
            if !seen_factors.insert(factor.name.as_str()) {
                return Err(CoreError::InvariantViolation(format!(
                    "duplicate factor name '{}'",
                    factor.name
                )));
            }
            if factor.scope.is_empty() {
                return Err(CoreError::InvariantViolation(format!(
                    "factor '{}' has an empty scope",
                    factor.name
                )));
            }
            for rv in &factor.scope {
                if !self.rvs.iter().any(|candidate| Rc::ptr_eq(candidate, rv)) {
                    return Err(CoreError::InvariantViolation(format!(
                        "factor '{}' references RV '{}' that is not owned by this graph",
                        factor.name, rv.name
                    )));
                }
            }
            if !factor.is_valid() {
                return Err(CoreError::InvariantViolation(format!(
                    "factor '{}' potential table does not match its scope's ranges",
                    factor.name
                )));
            }
        }

        Ok(())
    }
}

impl Default for FactorGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FactorGraph {
    fn eq(&self, other: &Self) -> bool {
        self.rvs.len() == other.rvs.len()
            && self.rvs.iter().zip(&other.rvs).all(|(a, b)| a == b)
            && self.factors == other.factors
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn small_graph() -> FactorGraph {
        let mut g = FactorGraph::new();
        let a = g.add_rv(RandVar::new("A", vec!["T".into(), "F".into()]));
        let b = g.add_rv(RandVar::new("B", vec!["T".into(), "F".into()]));
        g.add_factor(Factor::unknown("f1", vec![Rc::clone(&a), Rc::clone(&b)]));
        g
    }

    #[test]
    fn incident_factors_finds_scope_membership() {
        let g = small_graph();
        assert_eq!(g.incident_factors("A").len(), 1);
        assert_eq!(g.incident_factors("A")[0].name, "f1");
        assert!(g.incident_factors("missing").is_empty());
    }

    #[test]
    fn connected_graph_reports_connected() {
        let g = small_graph();
        assert!(g.is_connected());
    }

    #[test]
    fn disconnected_graph_reports_not_connected() {
        let mut g = small_graph();
        g.add_rv(RandVar::new("C", vec!["T".into(), "F".into()]));
        assert!(!g.is_connected());
    }

    #[test]
    fn validate_rejects_factor_with_foreign_rv() {
        let mut g = small_graph();
        let foreign = Rc::new(RandVar::new("Z", vec!["T".into(), "F".into()]));
        g.add_factor(Factor::unknown("f2", vec![foreign]));
        assert!(g.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_graph() {
        let g = small_graph();
        assert!(g.validate().is_ok());
    }

    #[test]
    fn unknown_factors_returns_only_empty_tables() {
        let mut g = small_graph();
        let a = Rc::clone(&g.rvs[0]);
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 1.0);
        table.insert(vec!["F".into()], 0.0);
        g.add_factor(Factor::new("f2", vec![a], table));

        let unknown = g.unknown_factors();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].name, "f1");
    }

    #[test]
    fn contains_edge_reflects_scope_membership() {
        let g = small_graph();
        assert!(g.contains_edge("A", "f1"));
        assert!(g.contains_edge("B", "f1"));
        assert!(!g.contains_edge("A", "missing"));
    }

    #[test]
    fn neighbors_answers_either_node_kind() {
        let g = small_graph();
        assert_eq!(g.neighbors(&Node::Rv("A".to_string())), vec![Node::Factor("f1".to_string())]);
        assert_eq!(
            g.neighbors(&Node::Factor("f1".to_string())),
            vec![Node::Rv("A".to_string()), Node::Rv("B".to_string())]
        );
    }

    #[test]
    fn remove_factor_drops_its_edges() {
        let mut g = small_graph();
        g.remove_factor("f1");
        assert!(!g.contains_factor("f1"));
        assert!(g.incident_factors("A").is_empty());
    }

    #[test]
    fn remove_rv_drops_scope_references_but_keeps_the_factor() {
        let mut g = small_graph();
        g.remove_rv("A");
        assert!(!g.contains_rv("A"));
        assert!(g.contains_factor("f1"));
        assert!(!g.contains_edge("A", "f1"));
        assert!(g.contains_edge("B", "f1"));
    }
}
