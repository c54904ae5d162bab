//! Binary derivations: equality, typed equality, typed ordering.
use super::{TypeCtx, Writer, binds_comment};
use crate::classify::Classification;
use crate::ir::{DispatchArm, FieldStep};

fn sides(step: &FieldStep) -> (String, String) {
    (format!("l{}", step.position), format!("r{}", step.position))
}

fn field_literal(step: &FieldStep) -> String { format!("{:?}", step.ty.to_string()) }

pub(super) fn emit_eq(w: &mut Writer, ty: &TypeCtx<'_>) {
    w.open(ty.impl_header("PartialEq + TypedEq", "PartialEq"));
    w.open("fn eq(&self, other: &Self) -> bool {");
    w.open("match (self, other) {");
    for c in &ty.plan.constructors {
        let conj: Vec<String> = c
            .fields
            .iter()
            .map(|step| {
                let (l, r) = sides(step);
                match &step.classification {
                    Classification::Plain => format!("{l} == {r}"),
                    Classification::Indexed { .. } => format!("{l}.typed_eq({r}).is_some()"),
                    Classification::Recurse => format!("eq_iter({l}.iter(), {r}.iter())"),
                }
            })
            .collect();
        let body = if conj.is_empty() { "true".to_string() } else { conj.join(" && ") };
        w.line(format!("({}, {}) => {body},", ty.pattern(c, "l"), ty.pattern(c, "r")));
    }
    if ty.plan.constructors.len() > 1 {
        w.line("_ => false,");
    }
    w.close("}");
    w.close("}");
    w.close("}");
}

pub(super) fn emit_typed_eq(w: &mut Writer, ty: &TypeCtx<'_>) {
    let witness = format!("Some(Witness {{ proves: {} }})", ty.proves());
    w.open(ty.impl_header("PartialEq + TypedEq", "TypedEq"));
    w.open("fn typed_eq(&self, other: &Self) -> Option<Witness> {");
    w.open("match (self, other) {");
    for c in &ty.plan.constructors {
        let head = format!("({}, {})", ty.pattern(c, "l"), ty.pattern(c, "r"));
        if c.is_nullary() {
            w.line(format!("{head} => {witness},"));
            continue;
        }
        w.open(format!("{head} => {{"));
        for step in &c.fields {
            let (l, r) = sides(step);
            match &step.classification {
                Classification::Plain => {
                    w.open(format!("if {l} != {r} {{"));
                    w.line("return None;");
                    w.close("}");
                }
                Classification::Indexed { .. } => {
                    if let Some(comment) = binds_comment(step) {
                        w.line(comment);
                    }
                    w.line(format!("{l}.typed_eq({r})?;"));
                }
                Classification::Recurse => {
                    w.line(format!("typed_eq_iter({l}.iter(), {r}.iter(), {})?;", field_literal(step)));
                }
            }
        }
        w.line(&witness);
        w.close("}");
    }
    if ty.plan.constructors.len() > 1 {
        w.line("_ => None,");
    }
    w.close("}");
    w.close("}");
    w.close("}");
}

pub(super) fn emit_typed_ord(w: &mut Writer, ty: &TypeCtx<'_>) {
    let equal = format!("WitnessOrdering::Equal(Witness {{ proves: {} }})", ty.proves());
    w.open(ty.impl_header("TypedOrd", "TypedOrd"));
    w.open("fn typed_cmp(&self, other: &Self) -> WitnessOrdering {");
    w.open("match (self, other) {");
    for arm in &ty.plan.dispatch.arms {
        match *arm {
            DispatchArm::Same(i) => {
                let c = &ty.plan.constructors[i];
                let head = format!("({}, {})", ty.pattern(c, "l"), ty.pattern(c, "r"));
                if c.is_nullary() {
                    w.line(format!("{head} => {equal},"));
                    continue;
                }
                w.open(format!("{head} => {{"));
                for step in &c.fields {
                    let (l, r) = sides(step);
                    let scrutinee = match &step.classification {
                        Classification::Recurse => {
                            format!("typed_cmp_iter({l}.iter(), {r}.iter(), {})", field_literal(step))
                        }
                        _ => format!("{l}.typed_cmp({r})"),
                    };
                    if let Some(comment) = binds_comment(step) {
                        w.line(comment);
                    }
                    w.open(format!("match {scrutinee} {{"));
                    w.line("WitnessOrdering::Equal(_) => {}");
                    w.line("decided => return decided,");
                    w.close("}");
                }
                w.line(&equal);
                w.close("}");
            }
            DispatchArm::LeftFirst(i) => {
                w.line(format!("({}, _) => WitnessOrdering::Less,", ty.wildcard(&ty.plan.constructors[i])));
            }
            DispatchArm::RightFirst(i) => {
                w.line(format!("(_, {}) => WitnessOrdering::Greater,", ty.wildcard(&ty.plan.constructors[i])));
            }
        }
    }
    w.close("}");
    w.close("}");
    w.close("}");
}
