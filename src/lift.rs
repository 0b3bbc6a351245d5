//! Unknown-factor lifting (C3): grouping unknown factors with structurally
//! compatible peers so they can adopt a shared potential table before the final
//! color refinement pass.

use crate::color::{self, Coloring};
use crate::error::{CoreError, Result};
use crate::fg::{Factor, FactorGraph};
use std::cell::RefCell;
use std::collections::HashMap;

/// Memoized symmetric cache for `possibly_identical`, keyed by an unordered pair
/// of factor names so `(a, b)` and `(b, a)` share one entry.
#[derive(Default)]
struct PossiblyIdenticalCache {
    entries: RefCell<HashMap<(String, String), bool>>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl PossiblyIdenticalCache {
    fn get_or_compute(&self, f1: &Factor, f2: &Factor, compute: impl FnOnce() -> bool) -> bool {
        let key = pair_key(&f1.name, &f2.name);
        if let Some(&cached) = self.entries.borrow().get(&key) {
            return cached;
        }
        let result = compute();
        self.entries.borrow_mut().insert(key, result);
        result
    }
}

/// The multiset test behind "neighborhoods are symmetric": `(range, evidence,
/// incident-factor-count)` triples over each factor's scope, compared as sorted
/// multisets so edge identity never matters, only multiplicities.
fn symmetric_neighborhoods(fg: &FactorGraph, f1: &Factor, f2: &Factor) -> bool {
    if f1.scope.len() != f2.scope.len() {
        return false;
    }
    let triples = |f: &Factor| -> Vec<(Vec<crate::fg::RangeValue>, Option<crate::fg::RangeValue>, usize)> {
        let mut v: Vec<_> = f
            .scope
            .iter()
            .map(|rv| {
                (
                    rv.range.clone(),
                    rv.evidence.clone(),
                    fg.incident_factors(&rv.name).len(),
                )
            })
            .collect();
        v.sort();
        v
    };
    triples(f1) == triples(f2)
}

/// True iff `F1` and `F2` may represent the same underlying relation: at least
/// one is unknown or their effective potentials are equal, and their scopes are
/// structurally symmetric.
fn possibly_identical(fg: &FactorGraph, cache: &PossiblyIdenticalCache, f1: &Factor, f2: &Factor) -> bool {
    cache.get_or_compute(f1, f2, || {
        let tables_compatible =
            f1.is_unknown() || f2.is_unknown() || f1.effective_potentials() == f2.effective_potentials();
        tables_compatible && symmetric_neighborhoods(fg, f1, f2)
    })
}

/// Seed colors per §4.3 step 1: the usual C2 initialization, then every unknown
/// factor (in stable order) gets a unique color starting at `|Fs|+1`.
fn seed_with_unique_unknown_colors(fg: &FactorGraph) -> Coloring {
    let mut coloring = color::init_colors(fg);
    let unique_base = fg.factors.len() + 1;
    for (idx, factor) in fg.factors.iter().filter(|f| f.is_unknown()).enumerate() {
        coloring
            .factor_colors
            .insert(factor.name.clone(), unique_base + idx);
    }
    coloring
}

/// Run the unknown-factor lifter and return the final, post-C2 coloring along
/// with the graph carrying any newly-imputed potential tables.
pub fn lift(fg: &mut FactorGraph, threshold: f64) -> Result<Coloring> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(CoreError::InvalidArgument(format!(
            "lift threshold must be in [0, 1], got {}",
            threshold
        )));
    }

    let mut coloring = seed_with_unique_unknown_colors(fg);
    let cache = PossiblyIdenticalCache::default();

    let unknown_names: Vec<String> = fg
        .factors
        .iter()
        .filter(|f| f.is_unknown())
        .map(|f| f.name.clone())
        .collect();

    for f1_name in &unknown_names {
        // f1 may have been fused into an earlier unknown factor's color group
        // already; that does not change its own identity as a candidate source.
        let f1 = match fg.factor_by_name(f1_name) {
            Some(f) => f.clone(),
            None => continue,
        };

        let mut candidates: Vec<String> = Vec::new();
        for f2 in &fg.factors {
            if f2.name == f1.name {
                continue;
            }
            if !possibly_identical(fg, &cache, &f1, f2) {
                continue;
            }
            if f2.is_unknown() {
                let f1_color = coloring.factor_colors[&f1.name];
                coloring.factor_colors.insert(f2.name.clone(), f1_color);
            } else {
                candidates.push(f2.name.clone());
            }
        }

        if candidates.is_empty() {
            continue;
        }

        // Largest pairwise-possibly-identical subset via the documented
        // neighborhood-union proxy (§4.3 step 3): not exact maximum clique.
        let candidate_factors: Vec<Factor> = candidates
            .iter()
            .map(|name| fg.factor_by_name(name).unwrap().clone())
            .collect();

        let mut best_set: Vec<usize> = Vec::new();
        for (i, c2) in candidate_factors.iter().enumerate() {
            let mut neighborhood = vec![i];
            for (j, c3) in candidate_factors.iter().enumerate() {
                if i == j {
                    continue;
                }
                if possibly_identical(fg, &cache, c2, c3) {
                    neighborhood.push(j);
                }
            }
            if neighborhood.len() > best_set.len() {
                best_set = neighborhood;
            }
        }

        let ratio = best_set.len() as f64 / candidates.len() as f64;
        if ratio >= threshold {
            let f1_color = coloring.factor_colors[&f1.name];
            let donor_name = candidate_factors[best_set[0]].name.clone();
            for &idx in &best_set {
                coloring
                    .factor_colors
                    .insert(candidate_factors[idx].name.clone(), f1_color);
            }
            let donor_table = fg
                .factor_by_name(&donor_name)
                .unwrap()
                .effective_potentials()
                .clone();
            if let Some(f1_mut) = fg.factors.iter_mut().find(|f| f.name == f1.name) {
                f1_mut.impute(donor_table);
            }
        }
    }

    Ok(color::refine(fg, Some(coloring)))
}
