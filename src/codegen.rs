//! Rust source emitter.
//!
//! Each plan becomes an enum plus one impl per selected derivation. Index
//! parameters are erased from the Rust types; they survive only as the
//! witness checks the impls perform at run time. Output depends on nothing
//! but the plans and the configuration, so repeated runs are byte-identical.
mod compare;
mod naming;
mod prelude;
mod unary;

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::config::{Derivation, EngineConfig};
use crate::descriptor::{FieldType, ParamName, Shape, TypeHead};
use crate::ir::{ConstructorPlan, DerivationPlan, FieldStep};
use crate::lower::PlanSet;

pub struct Codegen<'a> {
    plans: &'a PlanSet,
    derive: BTreeSet<Derivation>,
    salt: u64,
    /// Per described type, the parameter positions that survive as generics.
    generics: BTreeMap<String, Vec<usize>>,
    out: String,
}

/// Names for one type, shared by its enum and its impls.
pub(crate) struct TypeCtx<'p> {
    pub plan: &'p DerivationPlan,
    pub ident: String,
    pub variants: Vec<String>,
    pub generics: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// WRITER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
pub(crate) struct Writer {
    buf: String,
    depth: usize,
}

impl Writer {
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buf.push_str("    ");
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    fn finish(self) -> String { self.buf }
}

// ————————————————————————————————————————————————————————————————————————————
// CODEGEN
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Codegen<'a> {
    pub fn new(plans: &'a PlanSet, config: &EngineConfig) -> Self {
        Self {
            plans,
            derive: Derivation::closure(&config.derive),
            salt: config.hash_salt,
            generics: surviving_generics(plans),
            out: String::new(),
        }
    }

    /// File header plus the support items the impls name.
    pub fn emit_prelude(&mut self) {
        self.out.push_str(prelude::HEADER);
        self.out.push_str("\n\n");
        self.out.push_str(prelude::PRELUDE);
        self.out.push_str(&format!("\npub const HASH_SALT: u64 = {:#018x};\n", self.salt));
    }

    pub fn emit(&mut self, plan: &DerivationPlan) {
        let src = self.render(plan);
        self.push(&src);
    }

    /// Every plan in the set, rendered in parallel and written in set order.
    pub fn emit_all(&mut self) {
        let plans: Vec<&DerivationPlan> = self.plans.values().collect();
        let this = &*self;
        let rendered: Vec<String> = plans.par_iter().map(|plan| this.render(plan)).collect();
        for src in &rendered {
            self.push(src);
        }
    }

    fn push(&mut self, src: &str) {
        self.out.push('\n');
        self.out.push_str(src);
    }

    /// Source for one type. Does not touch the output buffer.
    pub fn render(&self, plan: &DerivationPlan) -> String {
        let ty = self.type_ctx(plan);
        let mut w = Writer::default();
        self.emit_enum(&mut w, &ty);
        for derivation in &self.derive {
            w.line("");
            match derivation {
                Derivation::Eq => compare::emit_eq(&mut w, &ty),
                Derivation::TypedEq => compare::emit_typed_eq(&mut w, &ty),
                Derivation::TypedOrd => compare::emit_typed_ord(&mut w, &ty),
                Derivation::Traverse => unary::emit_traverse(&mut w, &ty),
                Derivation::Hash => unary::emit_hash(&mut w, &ty),
                Derivation::Show => unary::emit_show(&mut w, &ty),
            }
        }
        w.finish()
    }

    pub fn into_string(self) -> String { self.out }

    fn type_ctx<'p>(&self, plan: &'p DerivationPlan) -> TypeCtx<'p> {
        let generics = self
            .kept_params(plan)
            .into_iter()
            .map(|p| naming::generic_ident(p))
            .collect();
        TypeCtx {
            plan,
            ident: naming::type_ident(&plan.type_name),
            variants: naming::variant_idents(plan.constructors.iter().map(|c| c.name.as_str())),
            generics,
        }
    }

    fn kept_params<'p>(&self, plan: &'p DerivationPlan) -> Vec<&'p ParamName> {
        self.generics
            .get(&plan.type_name)
            .map(|positions| positions.iter().map(|i| &plan.parameters[*i]).collect())
            .unwrap_or_default()
    }

    fn emit_enum(&self, w: &mut Writer, ty: &TypeCtx<'_>) {
        let scope: BTreeMap<&str, String> = self
            .kept_params(ty.plan)
            .into_iter()
            .map(|p| (p.as_str(), naming::generic_ident(p)))
            .collect();
        if !ty.plan.indices.is_empty() {
            let erased: Vec<&str> = ty.plan.indices.iter().map(String::as_str).collect();
            w.line(format!("/// Erased indices: {}.", erased.join(", ")));
        }
        w.line("#[derive(Debug, Clone)]");
        w.open(format!("pub enum {}{} {{", ty.ident, angle(&ty.generics)));
        for (c, variant) in ty.plan.constructors.iter().zip(&ty.variants) {
            if let Shape::Infix { fixity } = c.shape {
                w.line(format!("/// `{}`, fixity {fixity}", c.name));
            }
            let types: Vec<String> = c.fields.iter().map(|f| self.field_type(&f.ty, &scope)).collect();
            match &c.shape {
                _ if c.is_nullary() => w.line(format!("{variant},")),
                Shape::Labeled { .. } => {
                    let fields: Vec<String> = c
                        .fields
                        .iter()
                        .zip(&types)
                        .map(|(f, t)| format!("{}: {t}", label_ident(f)))
                        .collect();
                    w.line(format!("{variant} {{ {} }},", fields.join(", ")));
                }
                _ => w.line(format!("{variant}({}),", types.join(", "))),
            }
        }
        w.close("}");
    }

    /// Described types are boxed so recursive definitions have a size.
    fn field_type(&self, ty: &FieldType, scope: &BTreeMap<&str, String>) -> String {
        let rendered = self.rust_type(ty, scope).unwrap_or_else(|| "()".to_string());
        match ty {
            FieldType::App { head: TypeHead::Named(h), .. } if self.plans.contains_key(h) => {
                format!("Box<{rendered}>")
            }
            _ => rendered,
        }
    }

    /// `None` when the whole type is an erased parameter.
    fn rust_type(&self, ty: &FieldType, scope: &BTreeMap<&str, String>) -> Option<String> {
        match ty {
            FieldType::Param(p) | FieldType::App { head: TypeHead::Param(p), .. } => scope.get(p.as_str()).cloned(),
            FieldType::App { head: TypeHead::Named(h), args } => Some(self.named_type(h, args, scope)),
            FieldType::Nested { container, args } => Some(self.named_type(container, args, scope)),
            // rejected by the classifier before a plan exists
            FieldType::Arrow(..) => None,
        }
    }

    fn named_type(&self, head: &str, args: &[FieldType], scope: &BTreeMap<&str, String>) -> String {
        let (base, args) = match self.generics.get(head) {
            Some(positions) => {
                let args: Vec<String> = positions
                    .iter()
                    .filter_map(|i| args.get(*i))
                    .map(|a| self.rust_type(a, scope).unwrap_or_else(|| "()".to_string()))
                    .collect();
                (naming::type_ident(head), args)
            }
            None => {
                let args: Vec<String> = args.iter().filter_map(|a| self.rust_type(a, scope)).collect();
                let base = naming::primitive(head).map(String::from).unwrap_or_else(|| naming::type_ident(head));
                (base, args)
            }
        };
        format!("{base}{}", angle(&args))
    }
}

impl TypeCtx<'_> {
    /// `impl<T: Bound> Trait for Name<T> {`
    pub fn impl_header(&self, bound: &str, trait_name: &str) -> String {
        if self.generics.is_empty() {
            return format!("impl {trait_name} for {} {{", self.ident);
        }
        let params: Vec<String> = self.generics.iter().map(|g| format!("{g}: {bound}")).collect();
        format!("impl<{}> {trait_name} for {}{} {{", params.join(", "), self.ident, angle(&self.generics))
    }

    fn path(&self, c: &ConstructorPlan) -> String {
        format!("{}::{}", self.ident, self.variants[c.index])
    }

    /// Pattern (or constructor expression) with `{prefix}{position}` in every
    /// field slot.
    pub fn pattern(&self, c: &ConstructorPlan, prefix: &str) -> String {
        let slots: Vec<String> = c.fields.iter().map(|f| format!("{prefix}{}", f.position)).collect();
        self.build(c, &slots)
    }

    pub fn build(&self, c: &ConstructorPlan, slots: &[String]) -> String {
        let path = self.path(c);
        if c.is_nullary() {
            return path;
        }
        match c.shape {
            Shape::Labeled { .. } => {
                let fields: Vec<String> = c
                    .fields
                    .iter()
                    .zip(slots)
                    .map(|(f, s)| format!("{}: {s}", label_ident(f)))
                    .collect();
                format!("{path} {{ {} }}", fields.join(", "))
            }
            _ => format!("{path}({})", slots.join(", ")),
        }
    }

    /// Pattern matching any value built with `c`.
    pub fn wildcard(&self, c: &ConstructorPlan) -> String {
        let path = self.path(c);
        match c.shape {
            _ if c.is_nullary() => path,
            Shape::Labeled { .. } => format!("{path} {{ .. }}"),
            _ => format!("{path}(..)"),
        }
    }

    pub fn proves(&self) -> String { format!("{:?}", self.plan.type_name) }
}

fn label_ident(f: &FieldStep) -> String {
    match &f.label {
        Some(l) => naming::field_ident(l),
        None => format!("_{}", f.position),
    }
}

fn angle(args: &[String]) -> String {
    if args.is_empty() { String::new() } else { format!("<{}>", args.join(", ")) }
}

/// Comment naming the parameters a successful witness binds.
pub(crate) fn binds_comment(step: &FieldStep) -> Option<String> {
    let introduces = step.classification.introduces()?;
    if introduces.is_empty() {
        return None;
    }
    let names: Vec<&str> = introduces.iter().map(String::as_str).collect();
    Some(format!("// witness binds {}", names.join(", ")))
}

/// Positions of the structural parameters that some field actually mentions
/// once erased arguments are dropped. Dropping one parameter can orphan
/// another, so this iterates to a fixed point.
fn surviving_generics(plans: &PlanSet) -> BTreeMap<String, Vec<usize>> {
    let mut kept: BTreeMap<String, Vec<usize>> = plans
        .values()
        .map(|p| {
            let positions = (0..p.parameters.len())
                .filter(|i| !p.indices.contains(&p.parameters[*i]))
                .collect();
            (p.type_name.clone(), positions)
        })
        .collect();
    loop {
        let mut changed = false;
        for plan in plans.values() {
            let current = &kept[&plan.type_name];
            let scope: BTreeSet<&str> = current.iter().map(|i| plan.parameters[*i].as_str()).collect();
            let mut used = BTreeSet::new();
            for c in &plan.constructors {
                for f in &c.fields {
                    mentions(&f.ty, &scope, &kept, &mut used);
                }
            }
            let next: Vec<usize> = current
                .iter()
                .copied()
                .filter(|i| used.contains(plan.parameters[*i].as_str()))
                .collect();
            if next.len() != current.len() {
                kept.insert(plan.type_name.clone(), next);
                changed = true;
            }
        }
        if !changed {
            return kept;
        }
    }
}

fn mentions<'t>(
    ty: &'t FieldType,
    scope: &BTreeSet<&str>,
    kept: &BTreeMap<String, Vec<usize>>,
    used: &mut BTreeSet<&'t str>,
) {
    match ty {
        FieldType::Param(p) | FieldType::App { head: TypeHead::Param(p), .. } => {
            if scope.contains(p.as_str()) {
                used.insert(p.as_str());
            }
        }
        FieldType::App { head: TypeHead::Named(h), args } | FieldType::Nested { container: h, args } => {
            match kept.get(h) {
                Some(positions) => {
                    for a in positions.iter().filter_map(|i| args.get(*i)) {
                        mentions(a, scope, kept, used);
                    }
                }
                None => {
                    for a in args {
                        mentions(a, scope, kept, used);
                    }
                }
            }
        }
        FieldType::Arrow(..) => {}
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Registry;
    use crate::lower::lower_with_dependencies;
    use serde_json::json;

    fn plans(config: &EngineConfig) -> PlanSet {
        let registry = Registry::from_json(&json!({ "types": [
            { "kind": "primitive", "name": "Int" },
            { "kind": "algebraic", "name": "Pair", "parameters": ["t"],
              "constructors": [ { "name": "MkPair", "fields": ["t", "t"] } ] },
            { "kind": "algebraic", "name": "Nat", "parameters": ["n"], "indices": ["n"],
              "constructors": [ { "name": "Zero" }, { "name": "Succ", "fields": ["Nat m"] } ] },
            { "kind": "algebraic", "name": "Op", "parameters": ["n"], "indices": ["n"],
              "constructors": [
                { "name": "Scale", "fields": ["Int", "Vector n"] },
                { "name": "Apply", "fields": ["Vector<k>", "Matrix<k, k>"] },
                { "name": "Batch", "fields": ["[Nat j]"] },
                { "name": ":*:", "fields": ["Op a", "Op b"], "infix": true, "fixity": 7 },
                { "name": "Tagged", "fields": [ { "label": "tag", "type": "Int" },
                                                { "label": "type", "type": "Nat z" } ] }
              ] },
            { "kind": "algebraic", "name": "Vector", "parameters": ["n"], "indices": ["n"],
              "constructors": [ { "name": "VNil" }, { "name": "VCons", "fields": ["Int", "Vector m"] } ] },
            { "kind": "algebraic", "name": "Tagged", "parameters": ["t", "n"], "indices": ["n"],
              "constructors": [ { "name": "Tag", "fields": ["Vector t"] } ] }
        ]}))
        .unwrap();
        let roots: Vec<String> = ["Pair", "Nat", "Op", "Tagged"].iter().map(|s| s.to_string()).collect();
        lower_with_dependencies(&registry, &roots, config).unwrap()
    }

    fn render_all(config: &EngineConfig) -> String {
        let plans = plans(config);
        let mut cg = Codegen::new(&plans, config);
        cg.emit_prelude();
        cg.emit_all();
        cg.into_string()
    }

    #[test]
    fn enums_erase_indices_and_box_described_types() {
        let src = render_all(&EngineConfig::default());
        assert!(src.contains("pub enum Pair<T> {"));
        assert!(src.contains("    MkPair(T, T),"));
        assert!(src.contains("pub enum Nat {"));
        assert!(src.contains("    Succ(Box<Nat>),"));
        assert!(src.contains("    Scale(i64, Box<Vector>),"));
        assert!(src.contains("    Apply(Box<Vector>, Matrix),"));
        assert!(src.contains("    Batch(Vec<Nat>),"));
        assert!(src.contains("    /// `:*:`, fixity 7\n    ColonStarColon(Box<Op>, Box<Op>),"));
        assert!(src.contains("    Tagged { tag: i64, r#type: Box<Nat> },"));
    }

    #[test]
    fn parameters_only_reachable_through_indices_are_dropped() {
        let plans = plans(&EngineConfig::default());
        let generics = surviving_generics(&plans);
        assert_eq!(generics["Pair"], vec![0]);
        assert_eq!(generics["Tagged"], Vec::<usize>::new());
        let src = render_all(&EngineConfig::default());
        assert!(src.contains("pub enum Tagged {"));
        assert!(src.contains("    Tag(Box<Vector>),"));
    }

    #[test]
    fn ordering_follows_the_dispatch_arms() {
        let src = render_all(&EngineConfig::default());
        let start = src.find("impl TypedOrd for Nat {").unwrap();
        let body = &src[start..];
        let zero_same = body.find("(Nat::Zero, Nat::Zero) => WitnessOrdering::Equal").unwrap();
        let zero_left = body.find("(Nat::Zero, _) => WitnessOrdering::Less,").unwrap();
        let zero_right = body.find("(_, Nat::Zero) => WitnessOrdering::Greater,").unwrap();
        let succ_same = body.find("(Nat::Succ(l0), Nat::Succ(r0)) => {").unwrap();
        assert!(zero_same < zero_left && zero_left < zero_right && zero_right < succ_same);
        assert!(!body.contains("(Nat::Succ(..), _)"));
        assert!(body.contains("// witness binds m"));
    }

    #[test]
    fn field_strategies_shape_the_comparisons() {
        let src = render_all(&EngineConfig::default());
        assert!(src.contains("(Op::Scale(l0, l1), Op::Scale(r0, r1)) => l0 == r0 && l1.typed_eq(r1).is_some(),"));
        assert!(src.contains("(Op::Batch(l0), Op::Batch(r0)) => eq_iter(l0.iter(), r0.iter()),"));
        assert!(src.contains("(Op::Apply(l0, l1), Op::Apply(r0, r1)) => l0.typed_eq(r0).is_some() && l1 == r1,"));
        assert!(src.contains("typed_cmp_iter(l0.iter(), r0.iter(), \"[Nat j]\")"));
        assert!(src.contains("impl<T: PartialEq + TypedEq> PartialEq for Pair<T> {"));
    }

    #[test]
    fn show_and_hash_bodies() {
        let src = render_all(&EngineConfig::default());
        assert!(src.contains("Nat::Zero => \"Zero\".to_string(),"));
        assert!(src.contains("Nat::Succ(x0) => paren(d > 10, format!(\"Succ {}\", x0.show_prec(11))),"));
        assert!(src.contains("paren(d > 7, format!(\"{} :*: {}\", x0.show_prec(8), x1.show_prec(8)))"));
        assert!(src.contains("paren(d >= 11, format!(\"Tagged {{tag = {}, type = {}}}\", x0.show_prec(0), x1.show_prec(0)))"));
        assert!(src.contains("Op::Batch(x0) => paren(d > 10, format!(\"Batch {}\", show_iter(x0.iter()))),"));
        assert!(src.contains("Nat::Zero => combine(salt, 0),"));
        assert!(src.contains("let h = combine(salt, 1);"));
        assert!(src.contains("pub const HASH_SALT: u64 = 0xdc36d1615b7400a4;"));
    }

    #[test]
    fn traversal_visits_only_non_plain_fields() {
        let src = render_all(&EngineConfig::default());
        assert!(src.contains("let y0 = x0.clone();"));
        assert!(src.contains(
            "let y1 = visitor.visit(FieldSite { constructor: \"Scale\", position: 1, label: None, strategy: Strategy::Indexed }, x1)?;"
        ));
        assert!(src.contains("strategy: Strategy::Recurse }, x0)?;"));
        assert!(src.contains("Op::Tagged { tag: y0, r#type: y1 }"));
    }

    #[test]
    fn selection_and_determinism() {
        let config = EngineConfig {
            derive: [Derivation::Show].into_iter().collect(),
            ..EngineConfig::default()
        };
        let src = render_all(&config);
        assert!(src.contains("impl ShowPrec for Nat {"));
        assert!(!src.contains("impl TypedOrd for Nat {"));
        assert!(!src.contains("impl PartialEq for Nat {"));
        assert_eq!(render_all(&EngineConfig::default()), render_all(&EngineConfig::default()));
    }

    /// Types whose every head is described or primitive, so the output is a
    /// complete crate.
    fn closed_plans(config: &EngineConfig) -> PlanSet {
        let registry = Registry::from_json(&json!({ "types": [
            { "kind": "primitive", "name": "Int" },
            { "kind": "algebraic", "name": "Pair", "parameters": ["t"],
              "constructors": [ { "name": "MkPair", "fields": ["t", "t"] } ] },
            { "kind": "algebraic", "name": "Nat", "parameters": ["n"], "indices": ["n"],
              "constructors": [ { "name": "Zero" }, { "name": "Succ", "fields": ["Nat m"] } ] },
            { "kind": "algebraic", "name": "Vector", "parameters": ["n"], "indices": ["n"],
              "constructors": [ { "name": "VNil" }, { "name": "VCons", "fields": ["Int", "Vector m"] } ] },
            { "kind": "algebraic", "name": "Op", "parameters": ["n"], "indices": ["n"],
              "constructors": [
                { "name": "Scale", "fields": ["Int", "Vector n"] },
                { "name": "Batch", "fields": ["[Nat j]"] },
                { "name": ":*:", "fields": ["Op a", "Op b"], "infix": true, "fixity": 7 },
                { "name": "Tagged", "fields": [ { "label": "tag", "type": "Int" },
                                                { "label": "type", "type": "Nat z" } ] }
              ] }
        ]}))
        .unwrap();
        let roots: Vec<String> = ["Pair", "Op"].iter().map(|s| s.to_string()).collect();
        lower_with_dependencies(&registry, &roots, config).unwrap()
    }

    /// Runs `rustc` on the emitted source. Skipped when no compiler can be
    /// spawned.
    fn assert_compiles(name: &str, src: &str) {
        let dir = std::env::temp_dir().join(format!("gderive-rustc-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("generated.rs");
        std::fs::write(&file, src).unwrap();
        let rustc = std::env::var_os("RUSTC").unwrap_or_else(|| "rustc".into());
        let output = std::process::Command::new(rustc)
            .args(["--crate-type", "lib", "--edition", "2021", "--crate-name", "generated", "--out-dir"])
            .arg(&dir)
            .arg(&file)
            .output();
        match output {
            Ok(output) => assert!(
                output.status.success(),
                "emitted source does not compile:\n{}",
                String::from_utf8_lossy(&output.stderr)
            ),
            Err(err) => eprintln!("skipping rustc check: {err}"),
        }
    }

    fn render_closed(derive: &[Derivation]) -> String {
        let config = EngineConfig { derive: derive.iter().copied().collect(), ..EngineConfig::default() };
        let plans = closed_plans(&config);
        let mut cg = Codegen::new(&plans, &config);
        cg.emit_prelude();
        cg.emit_all();
        cg.into_string()
    }

    #[test]
    fn every_derivation_compiles() {
        assert_compiles("all", &render_closed(&Derivation::ALL));
    }

    #[test]
    fn equality_subsets_emit_what_their_bodies_call() {
        let eq_only = render_closed(&[Derivation::Eq]);
        assert!(eq_only.contains("impl PartialEq for Nat {"));
        assert!(eq_only.contains("impl TypedEq for Nat {"));
        assert!(!eq_only.contains("impl TypedOrd for Nat {"));
        assert_compiles("eq", &eq_only);

        let typed_eq_only = render_closed(&[Derivation::TypedEq]);
        assert!(typed_eq_only.contains("impl<T: PartialEq + TypedEq> PartialEq for Pair<T> {"));
        assert_compiles("typed-eq", &typed_eq_only);

        for single in [Derivation::TypedOrd, Derivation::Traverse, Derivation::Hash, Derivation::Show] {
            assert_compiles(&format!("{single:?}"), &render_closed(&[single]));
        }
    }

    #[test]
    fn sequential_and_parallel_emission_agree() {
        let config = EngineConfig::default();
        let plans = plans(&config);
        let mut one = Codegen::new(&plans, &config);
        for plan in plans.values() {
            one.emit(plan);
        }
        let mut all = Codegen::new(&plans, &config);
        all.emit_all();
        assert_eq!(one.into_string(), all.into_string());
    }
}
