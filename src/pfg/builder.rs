//! Groups-to-parfactor-graph builder (C4): turns a colored factor graph into a
//! parfactor graph by treating each color class as a parameterized object.

use super::{AssignmentComponent, LogicalVar, Parfactor, ParfactorGraph, Prv};
use crate::color::Coloring;
use crate::error::{CoreError, Result};
use crate::fg::{Factor, FactorGraph, RandVar};
use std::collections::HashMap;
use std::rc::Rc;

/// Factor name → the RV names that may be aggregated because the factor is
/// invariant under their permutation (supplied by an upstream commutative-factor
/// analyzer that this crate does not implement).
pub type CommutativeArgsCache = HashMap<String, Vec<String>>;

/// Factor name → commutative RV-name set (sorted, for a stable cache key) →
/// histogram-keyed potential table: `(histogram counts over the CRV's range,
/// value indices for the remaining scope positions) → potential`.
pub type HistCache = HashMap<String, HashMap<Vec<String>, HashMap<(Vec<usize>, Vec<usize>), f64>>>;

struct RvGroup {
    color: usize,
    members: Vec<Rc<RandVar>>,
}

struct FactorGroup<'a> {
    color: usize,
    members: Vec<&'a Factor>,
}

fn extract_rv_groups(fg: &FactorGraph, coloring: &Coloring) -> Vec<RvGroup> {
    let mut colors: Vec<usize> = fg.rvs.iter().map(|rv| coloring.node_colors[&rv.name]).collect();
    colors.sort_unstable();
    colors.dedup();

    colors
        .into_iter()
        .map(|color| RvGroup {
            color,
            members: fg
                .rvs
                .iter()
                .filter(|rv| coloring.node_colors[&rv.name] == color)
                .cloned()
                .collect(),
        })
        .collect()
}

fn extract_factor_groups<'a>(fg: &'a FactorGraph, coloring: &Coloring) -> Vec<FactorGroup<'a>> {
    let mut colors: Vec<usize> = fg.factors.iter().map(|f| coloring.factor_colors[&f.name]).collect();
    colors.sort_unstable();
    colors.dedup();

    colors
        .into_iter()
        .map(|color| FactorGroup {
            color,
            members: fg
                .factors
                .iter()
                .filter(|f| coloring.factor_colors[&f.name] == color)
                .collect(),
        })
        .collect()
}

/// Stage 3's pairing test: do RV groups `g1` and `g2` share exactly one
/// consistent correspondence across every factor incident to both?
fn has_identical_logvar(fg: &FactorGraph, g1: &[Rc<RandVar>], g2: &[Rc<RandVar>]) -> bool {
    let in_g1 = |name: &str| g1.iter().any(|rv| rv.name == name);
    let in_g2 = |name: &str| g2.iter().any(|rv| rv.name == name);

    let common: Vec<&Factor> = fg
        .factors
        .iter()
        .filter(|f| f.scope.iter().any(|rv| in_g1(&rv.name)) && f.scope.iter().any(|rv| in_g2(&rv.name)))
        .collect();
    if common.is_empty() {
        return false;
    }

    let mut forward: HashMap<String, String> = HashMap::new();
    let mut backward: HashMap<String, String> = HashMap::new();
    for f in common {
        let g1_members: Vec<&Rc<RandVar>> = f.scope.iter().filter(|rv| in_g1(&rv.name)).collect();
        let g2_members: Vec<&Rc<RandVar>> = f.scope.iter().filter(|rv| in_g2(&rv.name)).collect();
        if g1_members.len() != 1 || g2_members.len() != 1 {
            return false;
        }
        let a = g1_members[0].name.clone();
        let b = g2_members[0].name.clone();
        if let Some(existing) = forward.get(&a) {
            if existing != &b {
                return false;
            }
        } else {
            forward.insert(a.clone(), b.clone());
        }
        if let Some(existing) = backward.get(&b) {
            if existing != &a {
                return false;
            }
        } else {
            backward.insert(b, a);
        }
    }
    true
}

/// Move `front` to index 0 of `scope`, preserving the relative order of the rest.
fn reorder_scope_front(scope: &mut Vec<String>, front: &str) {
    if let Some(pos) = scope.iter().position(|s| s == front) {
        let name = scope.remove(pos);
        scope.insert(0, name);
    }
}

/// Run the full C4 pipeline: group extraction, placeholder PRVs/parfactors,
/// shared-logical-variable detection, CRV/potential re-encoding, and the
/// ground-RV-to-representative-string map.
pub fn build(
    fg: &FactorGraph,
    coloring: &Coloring,
    commutative_args_cache: Option<&CommutativeArgsCache>,
    hist_cache: Option<&HistCache>,
) -> Result<(ParfactorGraph, HashMap<String, String>)> {
    let empty_commutative = CommutativeArgsCache::new();
    let empty_hist = HistCache::new();
    let commutative_args_cache = commutative_args_cache.unwrap_or(&empty_commutative);
    let hist_cache = hist_cache.unwrap_or(&empty_hist);

    let rv_groups = extract_rv_groups(fg, coloring);
    let factor_groups = extract_factor_groups(fg, coloring);

    let mut pfg = ParfactorGraph::new();
    let mut color_to_prv: HashMap<usize, String> = HashMap::new();

    // Stage 2a: placeholder PRVs, one per RV group.
    for (idx, group) in rv_groups.iter().enumerate() {
        let prv_name = format!("R{}", idx);
        let representative_range = group.members[0].range.clone();
        if group.members.len() > 1 {
            let logvar_name = format!("L{}", idx);
            let domain: Vec<String> = (1..=group.members.len())
                .map(|i| format!("l_{}_{}", idx, i))
                .collect();
            pfg.add_logvar(LogicalVar::new(logvar_name.clone(), domain));
            pfg.add_prv(Prv::parameterized(prv_name.clone(), representative_range, vec![logvar_name]));
        } else {
            pfg.add_prv(Prv::propositional(prv_name.clone(), representative_range));
        }
        color_to_prv.insert(group.color, prv_name);
    }

    // Stage 2b: placeholder parfactors with connected scopes.
    for (idx, group) in factor_groups.iter().enumerate() {
        let pf_name = format!("pf{}", idx);
        let mut pf = Parfactor::new(pf_name.clone());
        for f in &group.members {
            for rv in &f.scope {
                let color = coloring.node_colors[&rv.name];
                let prv_name = &color_to_prv[&color];
                if !pf.scope.iter().any(|s| s == prv_name) {
                    pf.scope.push(prv_name.clone());
                }
            }
        }
        pfg.add_parfactor(pf);
    }

    // Stage 3: shared logical variables between equally-sized RV groups.
    for i in 0..rv_groups.len() {
        for j in (i + 1)..rv_groups.len() {
            let g1 = &rv_groups[i];
            let g2 = &rv_groups[j];
            if g1.members.len() != g2.members.len() || g1.members.len() <= 1 {
                continue;
            }
            if has_identical_logvar(fg, &g1.members, &g2.members) {
                let g1_logvars = pfg.prv_by_name(&color_to_prv[&g1.color]).unwrap().logvars.clone();
                if let Some(p2) = pfg.prv_by_name_mut(&color_to_prv[&g2.color]) {
                    p2.logvars = g1_logvars;
                }
            }
        }
    }

    // Stage 4: CRVs and potential re-encoding.
    for (idx, group) in factor_groups.iter().enumerate() {
        let pf_name = format!("pf{}", idx);
        let representative = group.members[0];
        let k_f = representative.scope.len();
        let k_pf = pfg.parfactor_by_name(&pf_name).unwrap().scope.len();

        if k_f == k_pf {
            let mut table = super::ParfactorPotentials::new();
            let pf_scope = pfg.parfactor_by_name(&pf_name).unwrap().scope.clone();
            let position_of: Vec<usize> = representative
                .scope
                .iter()
                .map(|rv| {
                    let color = coloring.node_colors[&rv.name];
                    let prv_name = &color_to_prv[&color];
                    pf_scope.iter().position(|s| s == prv_name).unwrap_or(0)
                })
                .collect();

            for (key, value) in representative.effective_potentials() {
                let mut assembled = vec![AssignmentComponent::Value(0); k_pf];
                for (pos, value_at_pos) in key.iter().enumerate() {
                    let rv = &representative.scope[pos];
                    let range_idx = rv
                        .range
                        .iter()
                        .position(|v| v == value_at_pos)
                        .unwrap_or(0);
                    assembled[position_of[pos]] = AssignmentComponent::Value(range_idx);
                }
                table.insert(assembled, *value);
            }
            pfg.parfactor_by_name_mut(&pf_name).unwrap().potentials = table;
        } else {
            let commutative_set = commutative_args_cache
                .get(&representative.name)
                .ok_or_else(|| CoreError::MissingCommutativityAnnotation(representative.name.clone()))?;

            let c_name = commutative_set
                .first()
                .ok_or_else(|| CoreError::MissingCommutativityAnnotation(representative.name.clone()))?;
            let c_rv = representative
                .scope
                .iter()
                .find(|rv| &rv.name == c_name)
                .ok_or_else(|| CoreError::MissingCommutativityAnnotation(representative.name.clone()))?;
            let color = coloring.node_colors[&c_rv.name];
            let p_name = color_to_prv[&color].clone();

            let logvar_name = {
                let p = pfg.prv_by_name(&p_name).ok_or_else(|| {
                    CoreError::InvariantViolation(format!("PRV '{}' missing for factor '{}'", p_name, representative.name))
                })?;
                if p.logvars.len() != 1 {
                    return Err(CoreError::InvariantViolation(format!(
                        "counting PRV '{}' must have exactly one logical variable",
                        p_name
                    )));
                }
                p.logvars[0].clone()
            };

            {
                let p = pfg.prv_by_name_mut(&p_name).unwrap();
                p.counted_over = Some(logvar_name);
                p.counted_in.push(pf_name.clone());
            }

            {
                let pf = pfg.parfactor_by_name_mut(&pf_name).unwrap();
                reorder_scope_front(&mut pf.scope, &p_name);
            }

            let mut sorted_set = commutative_set.clone();
            sorted_set.sort();
            let hist_table = hist_cache
                .get(&representative.name)
                .and_then(|by_set| by_set.get(&sorted_set))
                .ok_or_else(|| CoreError::MissingCommutativityAnnotation(representative.name.clone()))?;

            let mut table = super::ParfactorPotentials::new();
            for ((histogram, rest), value) in hist_table {
                let mut assembled = vec![AssignmentComponent::Histogram(histogram.clone())];
                assembled.extend(rest.iter().map(|idx| AssignmentComponent::Value(*idx)));
                table.insert(assembled, *value);
            }
            pfg.parfactor_by_name_mut(&pf_name).unwrap().potentials = table;
        }
    }

    // Stage 5: ground-RV-to-representative-string map.
    let mut rv_to_individual: HashMap<String, String> = HashMap::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    for rv in &fg.rvs {
        let color = coloring.node_colors[&rv.name];
        let prv_name = color_to_prv[&color].clone();
        let prv = pfg.prv_by_name(&prv_name).unwrap();
        if prv.is_propositional() {
            rv_to_individual.insert(rv.name.clone(), prv_name);
        } else {
            let logvar = pfg.logvar_by_name(&prv.logvars[0]).unwrap();
            let counter = counters.entry(prv_name.clone()).or_insert(1);
            let individual = logvar.domain[*counter - 1].clone();
            rv_to_individual.insert(rv.name.clone(), format!("{}({})", prv_name, individual));
            *counter += 1;
        }
    }

    Ok((pfg, rv_to_individual))
}

impl ParfactorGraph {
    fn parfactor_by_name_mut(&mut self, name: &str) -> Option<&mut Parfactor> {
        self.parfactors.iter_mut().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color;
    use crate::fg::{Factor, FactorGraph, PotentialTable, RandVar};

    fn boolean_rv(name: &str) -> RandVar {
        RandVar::new(name, vec!["T".into(), "F".into()])
    }

    #[test]
    fn trivial_propositional_factor_builds_single_prv_and_parfactor() {
        let mut fg = FactorGraph::new();
        let a = fg.add_rv(boolean_rv("A"));
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["F".into()], 0.5);
        fg.add_factor(Factor::new("f", vec![Rc::clone(&a)], table));

        let coloring = color::refine(&fg, None);
        let (pfg, rv_to_individual) = build(&fg, &coloring, None, None).expect("build succeeds");

        assert_eq!(pfg.prvs.len(), 1);
        assert_eq!(pfg.prvs[0].name, "R0");
        assert!(pfg.prvs[0].is_propositional());
        assert_eq!(pfg.parfactors.len(), 1);
        assert_eq!(pfg.parfactors[0].scope, vec!["R0".to_string()]);
        assert_eq!(rv_to_individual["A"], "R0");
    }

    #[test]
    fn repeated_rvs_produce_parameterized_prv_with_logvar() {
        let mut fg = FactorGraph::new();
        let a = fg.add_rv(boolean_rv("A"));
        let b = fg.add_rv(boolean_rv("B"));
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["F".into()], 0.5);
        fg.add_factor(Factor::new("fa", vec![Rc::clone(&a)], table.clone()));
        fg.add_factor(Factor::new("fb", vec![Rc::clone(&b)], table));

        let coloring = color::refine(&fg, None);
        let (pfg, rv_to_individual) = build(&fg, &coloring, None, None).expect("build succeeds");

        assert_eq!(pfg.prvs.len(), 1);
        assert!(!pfg.prvs[0].is_propositional());
        assert_eq!(pfg.logvars.len(), 1);
        assert_eq!(pfg.logvars[0].domain.len(), 2);
        assert_ne!(rv_to_individual["A"], rv_to_individual["B"]);
    }
}
