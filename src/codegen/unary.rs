//! Single-value derivations: traversal, hash, show.
use super::naming::escape_braces;
use super::{TypeCtx, Writer};
use crate::classify::Classification;
use crate::descriptor::Shape;
use crate::ir::FieldStep;

fn x(step: &FieldStep) -> String { format!("x{}", step.position) }

pub(super) fn emit_traverse(w: &mut Writer, ty: &TypeCtx<'_>) {
    w.open(ty.impl_header("Clone + 'static", "Traverse"));
    w.open("fn traverse<V: FieldVisitor>(&self, visitor: &mut V) -> Result<Self, V::Error> {");
    w.open("Ok(match self {");
    for c in &ty.plan.constructors {
        let pattern = ty.pattern(c, "x");
        if c.is_nullary() {
            w.line(format!("{pattern} => {pattern},"));
            continue;
        }
        w.open(format!("{pattern} => {{"));
        for step in &c.fields {
            let strategy = match &step.classification {
                Classification::Plain => {
                    w.line(format!("let y{} = {}.clone();", step.position, x(step)));
                    continue;
                }
                Classification::Indexed { .. } => "Strategy::Indexed",
                Classification::Recurse => "Strategy::Recurse",
            };
            let label = match &step.label {
                Some(l) => format!("Some({l:?})"),
                None => "None".to_string(),
            };
            w.line(format!(
                "let y{} = visitor.visit(FieldSite {{ constructor: {:?}, position: {}, label: {label}, strategy: {strategy} }}, {})?;",
                step.position,
                c.name,
                step.position,
                x(step),
            ));
        }
        w.line(ty.pattern(c, "y"));
        w.close("}");
    }
    w.close("})");
    w.close("}");
    w.close("}");
}

pub(super) fn emit_hash(w: &mut Writer, ty: &TypeCtx<'_>) {
    w.open(ty.impl_header("SaltedHash", "SaltedHash"));
    w.open("fn salted_hash(&self, salt: u64) -> u64 {");
    w.open("match self {");
    for c in &ty.plan.constructors {
        let pattern = ty.pattern(c, "x");
        if c.is_nullary() {
            w.line(format!("{pattern} => combine(salt, {}),", c.index));
            continue;
        }
        w.open(format!("{pattern} => {{"));
        w.line(format!("let h = combine(salt, {});", c.index));
        let last = c.fields.len() - 1;
        for (i, step) in c.fields.iter().enumerate() {
            let expr = match &step.classification {
                Classification::Recurse => format!("hash_iter(h, {}.iter())", x(step)),
                _ => format!("{}.salted_hash(h)", x(step)),
            };
            if i == last { w.line(expr) } else { w.line(format!("let h = {expr};")) }
        }
        w.close("}");
    }
    w.close("}");
    w.close("}");
    w.close("}");
}

pub(super) fn emit_show(w: &mut Writer, ty: &TypeCtx<'_>) {
    w.open(ty.impl_header("ShowPrec", "ShowPrec"));
    w.open("fn show_prec(&self, d: u8) -> String {");
    w.open("match self {");
    for c in &ty.plan.constructors {
        let pattern = ty.pattern(c, "x");
        if c.is_nullary() {
            w.line(format!("{pattern} => {:?}.to_string(),", c.name));
            continue;
        }
        let field = |step: &FieldStep, prec: u8| match &step.classification {
            Classification::Recurse => format!("show_iter({}.iter())", x(step)),
            _ => format!("{}.show_prec({prec})", x(step)),
        };
        let name = escape_braces(&c.name);
        let (wrap, template, args): (String, String, Vec<String>) = match &c.shape {
            Shape::Positional => {
                let holes = vec!["{}"; c.fields.len()].join(" ");
                let args = c.fields.iter().map(|s| field(s, 11)).collect();
                ("d > 10".into(), format!("{name} {holes}"), args)
            }
            Shape::Labeled { .. } => {
                let parts: Vec<String> = c
                    .fields
                    .iter()
                    .map(|s| format!("{} = {{}}", escape_braces(s.label.as_deref().unwrap_or("_"))))
                    .collect();
                let args = c.fields.iter().map(|s| field(s, 0)).collect();
                ("d >= 11".into(), format!("{name} {{{{{}}}}}", parts.join(", ")), args)
            }
            Shape::Infix { fixity } => {
                let op = if c.is_operator() { name } else { format!("`{name}`") };
                let args = c.fields.iter().map(|s| field(s, fixity + 1)).collect();
                (format!("d > {fixity}"), format!("{{}} {op} {{}}"), args)
            }
        };
        w.line(format!("{pattern} => paren({wrap}, format!({template:?}, {})),", args.join(", ")));
    }
    w.close("}");
    w.close("}");
    w.close("}");
}
