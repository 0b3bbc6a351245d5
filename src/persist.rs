//! JSON persistence for factor graphs and queries.
//!
//! The on-disk shape is this crate's own contract: a `FactorGraph` serializes as
//! its RVs plus a plain list of factors with scope given by RV name (never by
//! `Rc` identity, which has no JSON representation), and potential tables as an
//! assoc list of `(assignment, value)` pairs rather than a map, since JSON object
//! keys must be strings and an assignment is a tuple of range values.

use crate::error::{CoreError, Result};
use crate::fg::{Factor, FactorGraph, PotentialTable, RandVar, RangeValue};
use crate::query::Query;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Serialize, Deserialize)]
struct WireFactor {
    name: String,
    scope: Vec<String>,
    potentials: Vec<(Vec<RangeValue>, f64)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFactorGraph {
    rvs: Vec<RandVar>,
    factors: Vec<WireFactor>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDocument {
    graph: WireFactorGraph,
    #[serde(default)]
    queries: Vec<Query>,
}

fn to_wire(fg: &FactorGraph) -> WireFactorGraph {
    WireFactorGraph {
        rvs: fg.rvs.iter().map(|rv| (**rv).clone()).collect(),
        factors: fg
            .factors
            .iter()
            .map(|f| WireFactor {
                name: f.name.clone(),
                scope: f.scope.iter().map(|rv| rv.name.clone()).collect(),
                potentials: f.potentials.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            })
            .collect(),
    }
}

fn from_wire(wire: WireFactorGraph) -> Result<FactorGraph> {
    let mut fg = FactorGraph::new();
    for rv in wire.rvs {
        fg.add_rv(rv);
    }
    for wf in wire.factors {
        let mut scope: Vec<Rc<RandVar>> = Vec::with_capacity(wf.scope.len());
        for name in &wf.scope {
            let rv = fg
                .rv_by_name(name)
                .cloned()
                .ok_or_else(|| CoreError::InvariantViolation(format!("factor '{}' references unknown RV '{}'", wf.name, name)))?;
            scope.push(rv);
        }
        let mut potentials = PotentialTable::new();
        for (key, value) in wf.potentials {
            potentials.insert(key, value);
        }
        fg.add_factor(Factor::new(wf.name, scope, potentials));
    }
    fg.validate()?;
    Ok(fg)
}

/// Save a factor graph and its queries to a JSON string.
pub fn save(fg: &FactorGraph, queries: &[Query]) -> Result<String> {
    let doc = WireDocument {
        graph: to_wire(fg),
        queries: queries.to_vec(),
    };
    serde_json::to_string_pretty(&doc).map_err(|e| CoreError::InvalidArgument(e.to_string()))
}

/// Load a factor graph and its queries from a JSON string, validating the graph
/// before returning it.
pub fn load(json: &str) -> Result<(FactorGraph, Vec<Query>)> {
    let doc: WireDocument = serde_json::from_str(json).map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
    let fg = from_wire(doc.graph)?;
    Ok((fg, doc.queries))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_small_graph() {
        let mut fg = FactorGraph::new();
        let a = fg.add_rv(RandVar::new("A", vec!["T".into(), "F".into()]));
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["F".into()], 0.5);
        fg.add_factor(Factor::new("f", vec![a], table));

        let queries = vec![Query::new("A")];
        let json = save(&fg, &queries).expect("serializes");
        let (loaded, loaded_queries) = load(&json).expect("deserializes");

        assert_eq!(loaded, fg);
        assert_eq!(loaded_queries, queries);
    }

    #[test]
    fn rejects_factor_referencing_unknown_rv() {
        let bad = r#"{
            "graph": {
                "rvs": [{"name": "A", "range": ["T", "F"], "evidence": null}],
                "factors": [{"name": "f", "scope": ["Missing"], "potentials": []}]
            },
            "queries": []
        }"#;
        assert!(load(bad).is_err());
    }
}
