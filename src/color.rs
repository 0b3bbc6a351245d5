//! Color refinement (C2): the Weisfeiler–Leman-style fixed-point coloring of the
//! factor graph's random variables and factors.

use crate::fg::FactorGraph;
use itertools::Itertools;
use std::collections::HashMap;

/// The two color mappings produced by refinement, keyed by node name. The two
/// maps' value spaces never numerically overlap: `node_colors` occupies
/// `[0, |RVs|)` and `factor_colors` is always offset by `|RVs|`, satisfying the
/// disjoint-codomain invariant regardless of how many distinct colors each side
/// ends up using.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coloring {
    pub node_colors: HashMap<String, usize>,
    pub factor_colors: HashMap<String, usize>,
}

impl Coloring {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Bucket items into fresh encounter-order integers by a derived signature,
/// starting the numbering at `offset`.
fn relabel_by_signature<T, K: PartialEq>(
    items: &[T],
    signature: impl Fn(&T) -> K,
    offset: usize,
) -> Vec<usize> {
    let mut signatures: Vec<K> = Vec::new();
    items
        .iter()
        .map(|item| {
            let sig = signature(item);
            let idx = match signatures.iter().position(|s| s == &sig) {
                Some(idx) => idx,
                None => {
                    signatures.push(sig);
                    signatures.len() - 1
                }
            };
            offset + idx
        })
        .collect()
}

/// The initial coloring defined in §4.2: RVs by `(range, evidence)`, factors by
/// effective potential table, factor colors offset by `|RVs|`.
pub fn init_colors(fg: &FactorGraph) -> Coloring {
    let rv_count = fg.rvs.len();

    let node_values = relabel_by_signature(&fg.rvs, |rv| rv.init_key(), 0);
    let node_colors = fg
        .rvs
        .iter()
        .zip(node_values)
        .map(|(rv, color)| (rv.name.clone(), color))
        .collect();

    let factor_values = relabel_by_signature(
        &fg.factors,
        |f| crate::fg::factor::potential_signature(f.effective_potentials()),
        rv_count,
    );
    let factor_colors = fg
        .factors
        .iter()
        .zip(factor_values)
        .map(|(f, color)| (f.name.clone(), color))
        .collect();

    Coloring {
        node_colors,
        factor_colors,
    }
}

/// One full refinement pass: recompute factor colors from neighbor node colors
/// (step 1-2 of §4.2), then node colors from neighbor factor colors (step 3-4).
/// Returns whether either side's coloring changed.
fn refine_pass(fg: &FactorGraph, coloring: &mut Coloring) -> bool {
    let mut changed = false;
    let rv_count = fg.rvs.len();

    let factor_signatures: Vec<Vec<usize>> = fg
        .factors
        .iter()
        .map(|f| {
            let mut sig: Vec<usize> = f
                .scope
                .iter()
                .map(|rv| coloring.node_colors[&rv.name])
                .collect();
            sig.push(coloring.factor_colors[&f.name]);
            sig
        })
        .collect();

    let new_factor_values = relabel_by_signature(&factor_signatures, |s| s.clone(), rv_count);
    let mut new_factor_colors = HashMap::new();
    for (factor, color) in fg.factors.iter().zip(new_factor_values) {
        if coloring.factor_colors.get(&factor.name) != Some(&color) {
            changed = true;
        }
        new_factor_colors.insert(factor.name.clone(), color);
    }
    coloring.factor_colors = new_factor_colors;

    let rv_signatures: Vec<Vec<(usize, usize)>> = fg
        .rvs
        .iter()
        .map(|rv| {
            let mut sig: Vec<(usize, usize)> = fg
                .incident_factors(&rv.name)
                .into_iter()
                .map(|f| {
                    let position = f.scope.iter().position(|s| s.name == rv.name).unwrap_or(0);
                    (coloring.factor_colors[&f.name], position)
                })
                .sorted()
                .collect();
            sig.push((coloring.node_colors[&rv.name], 0));
            sig
        })
        .collect();

    let new_node_values = relabel_by_signature(&rv_signatures, |s| s.clone(), 0);
    let mut new_node_colors = HashMap::new();
    for (rv, color) in fg.rvs.iter().zip(new_node_values) {
        if coloring.node_colors.get(&rv.name) != Some(&color) {
            changed = true;
        }
        new_node_colors.insert(rv.name.clone(), color);
    }
    coloring.node_colors = new_node_colors;

    changed
}

/// Run color refinement to a fixed point, optionally starting from a seed
/// coloring instead of the default `(range, evidence)` / potential-table
/// initialization. Bounded by `|RVs| + |Fs|` passes, as argued in §4.2.
pub fn refine(fg: &FactorGraph, seed: Option<Coloring>) -> Coloring {
    let mut coloring = seed.unwrap_or_else(|| init_colors(fg));
    let max_passes = fg.rvs.len() + fg.factors.len() + 1;
    for _ in 0..max_passes {
        if !refine_pass(fg, &mut coloring) {
            break;
        }
    }
    coloring
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fg::{Factor, FactorGraph, PotentialTable, RandVar};
    use std::rc::Rc;

    fn boolean_rv(name: &str) -> RandVar {
        RandVar::new(name, vec!["T".into(), "F".into()])
    }

    #[test]
    fn init_colors_groups_rvs_by_range_and_evidence() {
        let mut fg = FactorGraph::new();
        fg.add_rv(boolean_rv("A"));
        fg.add_rv(boolean_rv("B"));
        fg.add_rv(RandVar::new("C", vec!["X".into(), "Y".into(), "Z".into()]));
        let coloring = init_colors(&fg);

        assert_eq!(coloring.node_colors["A"], coloring.node_colors["B"]);
        assert_ne!(coloring.node_colors["A"], coloring.node_colors["C"]);
    }

    #[test]
    fn init_colors_offsets_factor_colors_past_rv_count() {
        let mut fg = FactorGraph::new();
        let a = fg.add_rv(boolean_rv("A"));
        fg.add_factor(Factor::unknown("f1", vec![Rc::clone(&a)]));
        let coloring = init_colors(&fg);

        assert!(coloring.factor_colors["f1"] >= fg.rvs.len());
    }

    #[test]
    fn refine_converges_to_stable_partition_for_symmetric_graph() {
        let mut fg = FactorGraph::new();
        let a = fg.add_rv(boolean_rv("A"));
        let b = fg.add_rv(boolean_rv("B"));
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["F".into()], 0.5);
        fg.add_factor(Factor::new("fa", vec![Rc::clone(&a)], table.clone()));
        fg.add_factor(Factor::new("fb", vec![Rc::clone(&b)], table));

        let coloring = refine(&fg, None);
        assert_eq!(coloring.node_colors["A"], coloring.node_colors["B"]);
        assert_eq!(coloring.factor_colors["fa"], coloring.factor_colors["fb"]);
    }

    #[test]
    fn refine_splits_rvs_with_different_factor_degree() {
        let mut fg = FactorGraph::new();
        let a = fg.add_rv(boolean_rv("A"));
        let b = fg.add_rv(boolean_rv("B"));
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["F".into()], 0.5);
        fg.add_factor(Factor::new("fa1", vec![Rc::clone(&a)], table.clone()));
        fg.add_factor(Factor::new("fa2", vec![Rc::clone(&a)], table.clone()));
        fg.add_factor(Factor::new("fb1", vec![Rc::clone(&b)], table));

        let coloring = refine(&fg, None);
        assert_ne!(coloring.node_colors["A"], coloring.node_colors["B"]);
    }
}
