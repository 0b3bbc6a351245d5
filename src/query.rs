//! Query rewriter (C6): translates a query over original RV names into
//! statements over the parfactor graph's representative names.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A query over original random-variable names: the variable to query, plus an
/// evidence assignment over other variables. The evidence map is a `BTreeMap`
/// so a given evidence set always renders in the same order regardless of
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query_var: String,
    pub evidence: BTreeMap<String, String>,
}

impl Query {
    pub fn new(query_var: impl Into<String>) -> Self {
        Self {
            query_var: query_var.into(),
            evidence: BTreeMap::new(),
        }
    }

    pub fn with_evidence(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.evidence.insert(var.into(), value.into());
        self
    }
}

/// Rewrite a query's RV names into their parfactor-graph representative names,
/// producing one `obs name=value;` line per evidence pair followed by one
/// `query name;` line.
pub fn rewrite(query: &Query, rv_to_individual: &HashMap<String, String>) -> Vec<String> {
    let mut lines: Vec<String> = query
        .evidence
        .iter()
        .map(|(var, value)| {
            let name = rv_to_individual.get(var).cloned().unwrap_or_else(|| var.clone());
            format!("obs {}={};", name, value)
        })
        .collect();

    let query_name = rv_to_individual
        .get(&query.query_var)
        .cloned()
        .unwrap_or_else(|| query.query_var.clone());
    lines.push(format!("query {};", query_name));
    lines
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rewrites_evidence_in_key_order_then_query() {
        let mut rv_to_individual = HashMap::new();
        rv_to_individual.insert("A".to_string(), "R0(l_0_1)".to_string());
        rv_to_individual.insert("B".to_string(), "R0(l_0_2)".to_string());
        rv_to_individual.insert("C".to_string(), "R1".to_string());

        let query = Query::new("C").with_evidence("B", "T").with_evidence("A", "F");
        let lines = rewrite(&query, &rv_to_individual);

        assert_eq!(
            lines,
            vec![
                "obs R0(l_0_1)=F;".to_string(),
                "obs R0(l_0_2)=T;".to_string(),
                "query R1;".to_string(),
            ]
        );
    }

    #[test]
    fn falls_back_to_original_name_when_unmapped() {
        let rv_to_individual = HashMap::new();
        let query = Query::new("Z");
        assert_eq!(rewrite(&query, &rv_to_individual), vec!["query Z;".to_string()]);
    }
}
