use indexmap::IndexMap;

use crate::bind::propagate;
use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::descriptor::{Describe, FieldType, TypeDescriptor};
use crate::dispatch;
use crate::error::DeriveError;
use crate::ir::DerivationPlan;

/// Plans keyed by type name, in the order they were derived.
pub type PlanSet = IndexMap<String, DerivationPlan>;

/// Oracles other than [`Registry`](crate::descriptor::Registry) are not
/// trusted to have validated their output, so every descriptor is checked here.
pub fn lower_descriptor(descriptor: &TypeDescriptor, classifier: &Classifier) -> Result<DerivationPlan, DeriveError> {
    descriptor.validate()?;
    let initial = descriptor.structural_parameters();
    let constructors = descriptor
        .constructors
        .iter()
        .enumerate()
        .map(|(i, c)| propagate(classifier, &descriptor.name, i, c, &initial))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        type_name = %descriptor.name,
        constructors = constructors.len(),
        "lowered type descriptor"
    );

    Ok(DerivationPlan {
        type_name: descriptor.name.clone(),
        parameters: descriptor.parameters.clone(),
        indices: descriptor.indices.clone(),
        dispatch: dispatch::build(constructors.len()),
        constructors,
    })
}

pub fn lower_to_ir<O: Describe + ?Sized>(
    oracle: &O,
    type_name: &str,
    config: &EngineConfig,
) -> Result<DerivationPlan, DeriveError> {
    let descriptor = oracle.describe(type_name)?;
    lower_descriptor(&descriptor, &Classifier::new(config))
}

/// Plans for `roots` plus every algebraic type their fields mention.
///
/// Names the oracle rejects as unknown or non-algebraic are leaves and are
/// skipped when reached through a field; they are errors only as roots.
pub fn lower_with_dependencies<O: Describe + ?Sized>(
    oracle: &O,
    roots: &[String],
    config: &EngineConfig,
) -> Result<PlanSet, DeriveError> {
    let classifier = Classifier::new(config);
    let mut out = PlanSet::new();
    let mut pending: Vec<(String, bool)> = roots.iter().rev().map(|r| (r.clone(), true)).collect();

    while let Some((name, is_root)) = pending.pop() {
        if out.contains_key(&name) {
            continue;
        }
        let descriptor = match oracle.describe(&name) {
            Ok(d) => d,
            Err(DeriveError::UnknownType(_) | DeriveError::NotAlgebraicType { .. }) if !is_root => continue,
            Err(e) => return Err(e),
        };
        let plan = lower_descriptor(&descriptor, &classifier)?;
        let mut heads = Vec::new();
        for c in &descriptor.constructors {
            for f in &c.fields {
                collect_heads(f, &mut |h| {
                    if !out.contains_key(h) && h != name {
                        heads.push(h.to_string());
                    }
                });
            }
        }
        // reversed so dependencies are visited in the order they appear
        pending.extend(heads.into_iter().rev().map(|h| (h, false)));
        out.insert(name, plan);
    }
    Ok(out)
}

fn collect_heads(ty: &FieldType, visit: &mut impl FnMut(&str)) {
    match ty {
        FieldType::Param(_) => {}
        FieldType::App { args, .. } | FieldType::Nested { args, .. } => {
            if let Some(h) = ty.head_name() {
                visit(h);
            }
            for a in args {
                collect_heads(a, visit);
            }
        }
        FieldType::Arrow(a, b) => {
            collect_heads(a, visit);
            collect_heads(b, visit);
        }
    }
}
