//! The parfactor graph: the lifted, parameterized counterpart of `crate::fg`.

pub mod builder;

pub use builder::{build, CommutativeArgsCache, HistCache};

use crate::error::{CoreError, Result};
use crate::fg::RangeValue;
use std::collections::{HashSet, LinkedList};

/// A logical variable: a name and a finite ordered domain of distinct individuals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalVar {
    pub name: String,
    pub domain: Vec<String>,
}

impl LogicalVar {
    pub fn new(name: impl Into<String>, domain: Vec<String>) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

/// One component of a parfactor potential key: a concrete range value at a plain
/// PRV position, or a histogram (multiset of range-value counts) at a counting
/// position. Kept as a typed enum rather than a rendered string so the potential
/// table's key type never needs a string round-trip for lookups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssignmentComponent {
    Value(usize),
    Histogram(Vec<usize>),
}

/// A parameterized random variable.
#[derive(Debug, Clone)]
pub struct Prv {
    pub name: String,
    pub range: Vec<RangeValue>,
    pub logvars: Vec<String>,
    pub counted_over: Option<String>,
    pub counted_in: Vec<String>,
}

impl Prv {
    pub fn propositional(name: impl Into<String>, range: Vec<RangeValue>) -> Self {
        Self {
            name: name.into(),
            range,
            logvars: Vec::new(),
            counted_over: None,
            counted_in: Vec::new(),
        }
    }

    pub fn parameterized(name: impl Into<String>, range: Vec<RangeValue>, logvars: Vec<String>) -> Self {
        Self {
            name: name.into(),
            range,
            logvars,
            counted_over: None,
            counted_in: Vec::new(),
        }
    }

    pub fn is_propositional(&self) -> bool {
        self.logvars.is_empty()
    }

    /// True for a PRV counting in a given parfactor: it must have an aggregation
    /// LV and be registered as counting in that parfactor by name.
    pub fn is_crv_in(&self, parfactor_name: &str) -> bool {
        self.counted_over.is_some() && self.counted_in.iter().any(|n| n == parfactor_name)
    }
}

/// Equality deliberately skips `counted_in`: it is derived state that can only be
/// read back consistently through the owning `ParfactorGraph`, and including it
/// here would require resolving a cycle back through parfactors that reference
/// this PRV.
impl PartialEq for Prv {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.range == other.range
            && self.logvars == other.logvars
            && self.counted_over == other.counted_over
    }
}

pub type ParfactorPotentials = std::collections::BTreeMap<Vec<AssignmentComponent>, f64>;

/// A parfactor: an ordered scope of PRV names and a potential table keyed on
/// assignment-component tuples.
#[derive(Debug, Clone, PartialEq)]
pub struct Parfactor {
    pub name: String,
    pub scope: Vec<String>,
    pub potentials: ParfactorPotentials,
}

impl Parfactor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Vec::new(),
            potentials: ParfactorPotentials::new(),
        }
    }

    pub fn has_logical_scope(&self, pfg: &ParfactorGraph) -> bool {
        self.scope
            .iter()
            .any(|prv_name| match pfg.prv_by_name(prv_name) {
                Some(prv) => !prv.is_propositional(),
                None => false,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Prv(String),
    Parfactor(String),
}

/// The parfactor graph: bipartite over PRVs and parfactors, carrying the same
/// structural invariants as `crate::fg::FactorGraph`.
#[derive(Debug, Clone, Default)]
pub struct ParfactorGraph {
    pub logvars: Vec<LogicalVar>,
    pub prvs: Vec<Prv>,
    pub parfactors: Vec<Parfactor>,
}

impl ParfactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_logvar(&mut self, logvar: LogicalVar) {
        self.logvars.push(logvar);
    }

    pub fn add_prv(&mut self, prv: Prv) {
        self.prvs.push(prv);
    }

    pub fn add_parfactor(&mut self, parfactor: Parfactor) {
        self.parfactors.push(parfactor);
    }

    pub fn logvar_by_name(&self, name: &str) -> Option<&LogicalVar> {
        self.logvars.iter().find(|l| l.name == name)
    }

    pub fn prv_by_name(&self, name: &str) -> Option<&Prv> {
        self.prvs.iter().find(|p| p.name == name)
    }

    pub fn prv_by_name_mut(&mut self, name: &str) -> Option<&mut Prv> {
        self.prvs.iter_mut().find(|p| p.name == name)
    }

    pub fn parfactor_by_name(&self, name: &str) -> Option<&Parfactor> {
        self.parfactors.iter().find(|p| p.name == name)
    }

    fn neighbors(&self, node: &Node) -> Vec<Node> {
        match node {
            Node::Prv(name) => self
                .parfactors
                .iter()
                .filter(|pf| pf.scope.iter().any(|s| s == name))
                .map(|pf| Node::Parfactor(pf.name.clone()))
                .collect(),
            Node::Parfactor(name) => match self.parfactor_by_name(name) {
                Some(pf) => pf.scope.iter().cloned().map(Node::Prv).collect(),
                None => Vec::new(),
            },
        }
    }

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

    pub fn is_connected(&self) -> bool {
        let total = self.prvs.len() + self.parfactors.len();
        if total == 0 {
            return true;
        }
        let start = self
            .prvs
            .first()
            .map(|p| Node::Prv(p.name.clone()))
            .or_else(|| self.parfactors.first().map(|pf| Node::Parfactor(pf.name.clone())))
            .unwrap();
        self.reachable_from(start).len() == total
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen_prvs = HashSet::new();
        for prv in &self.prvs {
            if !seen_prvs.insert(prv.name.as_str()) {
                return Err(CoreError::InvariantViolation(format!(
                    "duplicate PRV name '{}'",
                    prv.name
                )));
            }
        }
        let mut seen_pfs = HashSet::new();
        for pf in &self.parfactors {
            if !seen_pfs.insert(pf.name.as_str()) {
                return Err(CoreError::InvariantViolation(format!(
                    "duplicate parfactor name '{}'",
                    pf.name
                )));
            }
            for prv_name in &pf.scope {
                if self.prv_by_name(prv_name).is_none() {
                    return Err(CoreError::InvariantViolation(format!(
                        "parfactor '{}' references unknown PRV '{}'",
                        pf.name, prv_name
                    )));
                }
            }
        }
        Ok(())
    }
}
