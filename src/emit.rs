//! Textual emitter (C5): renders a parfactor graph into the line-oriented model
//! description consumed by the external inference engine.

use crate::error::{CoreError, Result};
use crate::pfg::{AssignmentComponent, Parfactor, ParfactorGraph, Prv};
use itertools::Itertools;

/// Currently the only range shape the engine understands: exactly two distinct
/// values map to its Boolean type. Anything else is `UnsupportedRange`.
fn translate_range(prv: &Prv) -> Result<&'static str> {
    if prv.range.len() == 2 {
        Ok("Boolean")
    } else {
        Err(CoreError::UnsupportedRange(format!(
            "PRV '{}' has a range of size {}, only two-valued ranges are supported",
            prv.name,
            prv.range.len()
        )))
    }
}

fn render_component(component: &AssignmentComponent, prv: &Prv) -> String {
    match component {
        AssignmentComponent::Value(idx) => prv.range[*idx].to_string(),
        AssignmentComponent::Histogram(counts) => counts.iter().map(|c| c.to_string()).join(";"),
    }
}

fn render_key(pfg: &ParfactorGraph, pf: &Parfactor, key: &[AssignmentComponent]) -> String {
    key.iter()
        .zip(&pf.scope)
        .map(|(component, prv_name)| {
            let prv = pfg.prv_by_name(prv_name).expect("parfactor scope references a live PRV");
            render_component(component, prv)
        })
        .join(", ")
}

/// First-occurrence-ordered local variable labels (`X1, X2, …`) for the distinct
/// logical variables used across a parfactor's scope.
fn local_var_labels(pfg: &ParfactorGraph, pf: &Parfactor) -> Vec<(String, String)> {
    let mut labels = Vec::new();
    for prv_name in &pf.scope {
        let prv = match pfg.prv_by_name(prv_name) {
            Some(p) => p,
            None => continue,
        };
        for lv in &prv.logvars {
            if !labels.iter().any(|(name, _)| name == lv) {
                labels.push((lv.clone(), format!("X{}", labels.len() + 1)));
            }
        }
    }
    labels
}

fn render_scope_entry(pfg: &ParfactorGraph, pf: &Parfactor, prv_name: &str, labels: &[(String, String)]) -> String {
    let prv = pfg.prv_by_name(prv_name).expect("parfactor scope references a live PRV");
    if prv.is_propositional() {
        return prv.name.clone();
    }
    let args: Vec<&str> = prv
        .logvars
        .iter()
        .map(|lv| labels.iter().find(|(name, _)| name == lv).map(|(_, x)| x.as_str()).unwrap_or("X?"))
        .collect();
    let call = format!("{}({})", prv.name, args.join(", "));
    if prv.is_crv_in(&pf.name) {
        let lv = &prv.logvars[0];
        let x = labels
            .iter()
            .find(|(name, _)| name == lv)
            .map(|(_, x)| x.as_str())
            .unwrap_or("X?");
        format!("#({} {})[{}]", lv, x, call)
    } else {
        call
    }
}

fn emit_type_declarations(pfg: &ParfactorGraph) -> Vec<String> {
    pfg.logvars.iter().map(|lv| format!("type {};", lv.name)).collect()
}

fn emit_guaranteed_declarations(pfg: &ParfactorGraph) -> Vec<String> {
    pfg.logvars
        .iter()
        .map(|lv| format!("guaranteed {} {};", lv.name, lv.domain.join(", ")))
        .collect()
}

fn emit_random_declarations(pfg: &ParfactorGraph) -> Result<Vec<String>> {
    pfg.prvs
        .iter()
        .map(|prv| {
            let ty = translate_range(prv)?;
            if prv.is_propositional() {
                Ok(format!("random {} {};", ty, prv.name))
            } else {
                Ok(format!("random {} {}({});", ty, prv.name, prv.logvars.join(", ")))
            }
        })
        .collect()
}

fn emit_parfactor_statement(pfg: &ParfactorGraph, pf: &Parfactor) -> String {
    let labels = local_var_labels(pfg, pf);

    let mut keyed: Vec<(String, f64)> = pf
        .potentials
        .iter()
        .map(|(key, value)| (render_key(pfg, pf, key), *value))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    let values = keyed.iter().map(|(_, v)| v.to_string()).join(", ");

    let args = pf
        .scope
        .iter()
        .map(|prv_name| render_scope_entry(pfg, pf, prv_name, &labels))
        .join(", ");

    if labels.is_empty() {
        format!("factor MultiArrayPotential[[{}]] ({});", values, args)
    } else {
        let lv_list = labels
            .iter()
            .map(|(name, x)| format!("{} {}", name, x))
            .join(", ");
        format!("parfactor {}. MultiArrayPotential[[{}]] ({});", lv_list, values, args)
    }
}

/// Render the complete model description for a parfactor graph.
pub fn emit_model(pfg: &ParfactorGraph) -> Result<String> {
    let mut lines = Vec::new();
    lines.extend(emit_type_declarations(pfg));
    lines.extend(emit_guaranteed_declarations(pfg));
    lines.extend(emit_random_declarations(pfg)?);
    for pf in &pfg.parfactors {
        lines.push(emit_parfactor_statement(pfg, pf));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pfg::{LogicalVar, ParfactorPotentials};

    #[test]
    fn emits_propositional_factor_with_descending_potentials() {
        let mut pfg = ParfactorGraph::default();
        pfg.add_prv(Prv::propositional("R0", vec!["T".into(), "F".into()]));
        let mut pf = Parfactor::new("pf0");
        pf.scope = vec!["R0".to_string()];
        let mut table = ParfactorPotentials::new();
        table.insert(vec![AssignmentComponent::Value(0)], 0.5);
        table.insert(vec![AssignmentComponent::Value(1)], 0.5);
        pf.potentials = table;
        pfg.add_parfactor(pf);

        let text = emit_model(&pfg).expect("emits");
        assert!(text.contains("random Boolean R0;"));
        assert!(text.contains("factor MultiArrayPotential"));
        assert!(!text.contains("parfactor "));
    }

    #[test]
    fn emits_parfactor_with_logvar_declarations() {
        let mut pfg = ParfactorGraph::default();
        pfg.add_logvar(LogicalVar::new("L0", vec!["l_0_1".into(), "l_0_2".into()]));
        pfg.add_prv(Prv::parameterized("R0", vec!["T".into(), "F".into()], vec!["L0".into()]));
        let mut pf = Parfactor::new("pf0");
        pf.scope = vec!["R0".to_string()];
        pfg.add_parfactor(pf);

        let text = emit_model(&pfg).expect("emits");
        assert!(text.contains("type L0;"));
        assert!(text.contains("guaranteed L0 l_0_1, l_0_2;"));
        assert!(text.contains("random Boolean R0(L0);"));
        assert!(text.contains("parfactor L0 X1."));
    }

    #[test]
    fn rejects_non_boolean_range() {
        let mut pfg = ParfactorGraph::default();
        pfg.add_prv(Prv::propositional("R0", vec!["a".into(), "b".into(), "c".into()]));
        assert!(emit_model(&pfg).is_err());
    }
}
