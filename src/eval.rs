//! Closure emitter: runs derivation plans directly against [`Value`]s.
//!
//! Synthesis lives in `lower`; this module only interprets the resulting
//! plans, field step by field step, in declaration order.
pub mod leaf;
pub mod value;
pub mod witness;

#[cfg(test)]
mod prop_tests;

use std::convert::Infallible;

use crate::classify::Classification;
use crate::config::EngineConfig;
use crate::descriptor::{FieldType, Shape};
use crate::error::DeriveError;
use crate::ir::{ConstructorPlan, DerivationPlan, FieldStep, Resolution};
use crate::lower::PlanSet;

pub use leaf::{Leaf, StdLeaf, combine};
pub use value::{FieldSite, Value, Witness, WitnessOrdering};
pub use witness::{DerivedWitness, WitnessOracle};

#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    plans: &'a PlanSet,
    leaf: &'a dyn Leaf,
    witness: &'a dyn WitnessOracle,
    salt: u64,
}

/// The derived operations of one type.
#[derive(Clone, Copy)]
pub struct Derived<'a> {
    ev: Evaluator<'a>,
    plan: &'a DerivationPlan,
}

// ————————————————————————————————————————————————————————————————————————————
// EVALUATOR
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Evaluator<'a> {
    pub fn new(plans: &'a PlanSet, config: &EngineConfig) -> Self {
        Self { plans, leaf: &StdLeaf, witness: &DerivedWitness, salt: config.hash_salt }
    }

    pub fn with_leaf(self, leaf: &'a dyn Leaf) -> Self { Self { leaf, ..self } }

    pub fn with_witness(self, witness: &'a dyn WitnessOracle) -> Self { Self { witness, ..self } }

    pub fn derived(&self, type_name: &str) -> Result<Derived<'a>, DeriveError> {
        let plan = self
            .plans
            .get(type_name)
            .ok_or_else(|| DeriveError::UnknownType(type_name.to_string()))?;
        Ok(Derived { ev: *self, plan })
    }

    /// Plan for the outermost described type of `ty`, if there is one.
    fn plan_for(&self, ty: &FieldType) -> Option<Derived<'a>> {
        let plan = self.plans.get(ty.head_name()?)?;
        Some(Derived { ev: *self, plan })
    }

    fn elements<'v>(ty: &'v FieldType, a: &'v Value, b: &'v Value) -> Option<(&'v FieldType, &'v [Value], &'v [Value])> {
        match (ty.element_type(), a, b) {
            (Some(elem), Value::List(xs), Value::List(ys)) => Some((elem, xs, ys)),
            _ => None,
        }
    }

    /// Structural equality at an arbitrary field type.
    pub fn equals_at(&self, ty: &FieldType, a: &Value, b: &Value) -> bool {
        if let Some((elem, xs, ys)) = Self::elements(ty, a, b) {
            return xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.equals_at(elem, x, y));
        }
        match self.plan_for(ty) {
            Some(d) => d.equals(a, b),
            None => self.leaf.equals(a, b),
        }
    }

    pub fn typed_equality_at(&self, ty: &FieldType, a: &Value, b: &Value) -> Option<Witness> {
        if let Some((elem, xs, ys)) = Self::elements(ty, a, b) {
            if xs.len() != ys.len() {
                return None;
            }
            for (x, y) in xs.iter().zip(ys) {
                self.typed_equality_at(elem, x, y)?;
            }
            return Some(Witness::new(ty.to_string()));
        }
        match self.plan_for(ty) {
            Some(d) => d.typed_equality(a, b),
            None => self.leaf.equals(a, b).then(|| Witness::new(ty.to_string())),
        }
    }

    pub fn compare_typed_at(&self, ty: &FieldType, a: &Value, b: &Value) -> WitnessOrdering {
        if let Some((elem, xs, ys)) = Self::elements(ty, a, b) {
            for (x, y) in xs.iter().zip(ys) {
                match self.compare_typed_at(elem, x, y) {
                    WitnessOrdering::Equal(_) => continue,
                    decided => return decided,
                }
            }
            return WitnessOrdering::from_ordering(xs.len().cmp(&ys.len()), ty.to_string());
        }
        match self.plan_for(ty) {
            Some(d) => d.compare_typed(a, b),
            None => WitnessOrdering::from_ordering(self.leaf.compare(a, b), ty.to_string()),
        }
    }

    pub fn hash_at(&self, ty: &FieldType, salt: u64, v: &Value) -> u64 {
        if let (Some(elem), Value::List(xs)) = (ty.element_type(), v) {
            return xs
                .iter()
                .fold(combine(salt, xs.len() as u64), |h, x| self.hash_at(elem, h, x));
        }
        match self.plan_for(ty) {
            Some(d) => d.hash_with_salt(salt, v),
            None => self.leaf.hash_into(salt, v),
        }
    }

    pub fn show_at(&self, ty: &FieldType, d: u8, v: &Value) -> String {
        if let (Some(elem), Value::List(xs)) = (ty.element_type(), v) {
            let inner: Vec<String> = xs.iter().map(|x| self.show_at(elem, 0, x)).collect();
            return format!("[{}]", inner.join(","));
        }
        match self.plan_for(ty) {
            Some(derived) => derived.show_prec(d, v),
            None => self.leaf.show_prec(d, v),
        }
    }

    fn field_equals(&self, step: &FieldStep, a: &Value, b: &Value) -> bool {
        match &step.classification {
            Classification::Plain => self.leaf.equals(a, b),
            Classification::Indexed { .. } => self.witness.try_witness_equality(self, &step.ty, a, b).is_some(),
            Classification::Recurse => self.equals_at(&step.ty, a, b),
        }
    }

    fn field_hash(&self, step: &FieldStep, salt: u64, v: &Value) -> u64 {
        match &step.classification {
            Classification::Plain => self.leaf.hash_into(salt, v),
            _ => self.hash_at(&step.ty, salt, v),
        }
    }

    fn field_show(&self, step: &FieldStep, d: u8, v: &Value) -> String {
        match &step.classification {
            Classification::Plain => self.leaf.show_prec(d, v),
            _ => self.show_at(&step.ty, d, v),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DERIVED OPERATIONS
// ————————————————————————————————————————————————————————————————————————————

fn paren(wrap: bool, s: String) -> String {
    if wrap { format!("({s})") } else { s }
}

impl<'a> Derived<'a> {
    pub fn plan(&self) -> &'a DerivationPlan { self.plan }

    /// Constructor plan and arguments, or `None` for a value this type does
    /// not describe; such values are handled by the leaf primitives.
    fn split<'v>(&self, v: &'v Value) -> Option<(&'a ConstructorPlan, &'v [Value])> {
        match v {
            Value::Con { ctor, args } => {
                let c = self.plan.constructor(ctor)?;
                (c.arity() == args.len()).then_some((c, args.as_slice()))
            }
            _ => None,
        }
    }

    /// Both sides split and dispatched to the same constructor.
    fn pair<'v>(&self, x: &'v Value, y: &'v Value) -> Option<Result<(&'a ConstructorPlan, &'v [Value], &'v [Value]), Resolution>> {
        let (lc, la) = self.split(x)?;
        let (rc, ra) = self.split(y)?;
        Some(match self.plan.dispatch.resolve(lc.index, rc.index)? {
            Resolution::Same(_) => Ok((lc, la, ra)),
            other => Err(other),
        })
    }

    pub fn equals(&self, x: &Value, y: &Value) -> bool {
        match self.pair(x, y) {
            None => self.ev.leaf.equals(x, y),
            Some(Err(_)) => false,
            Some(Ok((c, la, ra))) => c
                .fields
                .iter()
                .all(|step| self.ev.field_equals(step, &la[step.position], &ra[step.position])),
        }
    }

    pub fn typed_equality(&self, x: &Value, y: &Value) -> Option<Witness> {
        let (c, la, ra) = match self.pair(x, y) {
            None => return self.ev.leaf.equals(x, y).then(|| Witness::new(&self.plan.type_name)),
            Some(Err(_)) => return None,
            Some(Ok(same)) => same,
        };
        for step in &c.fields {
            let (a, b) = (&la[step.position], &ra[step.position]);
            match &step.classification {
                Classification::Plain => {
                    if !self.ev.leaf.equals(a, b) {
                        return None;
                    }
                }
                Classification::Indexed { .. } => {
                    self.ev.witness.try_witness_equality(&self.ev, &step.ty, a, b)?;
                }
                Classification::Recurse => {
                    self.ev.typed_equality_at(&step.ty, a, b)?;
                }
            }
        }
        Some(Witness::new(&self.plan.type_name))
    }

    pub fn compare_typed(&self, x: &Value, y: &Value) -> WitnessOrdering {
        let (c, la, ra) = match self.pair(x, y) {
            None => return WitnessOrdering::from_ordering(self.ev.leaf.compare(x, y), &self.plan.type_name),
            Some(Err(Resolution::Less)) => return WitnessOrdering::Less,
            Some(Err(_)) => return WitnessOrdering::Greater,
            Some(Ok(same)) => same,
        };
        for step in &c.fields {
            let (a, b) = (&la[step.position], &ra[step.position]);
            let decided = match &step.classification {
                Classification::Plain => {
                    WitnessOrdering::from_ordering(self.ev.leaf.compare(a, b), step.ty.to_string())
                }
                Classification::Indexed { .. } => self.ev.witness.try_witness_order(&self.ev, &step.ty, a, b),
                Classification::Recurse => self.ev.compare_typed_at(&step.ty, a, b),
            };
            if !decided.is_equal() {
                return decided;
            }
        }
        WitnessOrdering::Equal(Witness::new(&self.plan.type_name))
    }

    /// Rebuild `x` with every non-plain field passed through `f`.
    ///
    /// The first failure is returned as-is and nothing is rebuilt.
    pub fn traverse<E, F>(&self, x: &Value, mut f: F) -> Result<Value, E>
    where
        F: FnMut(&FieldSite<'_>, &Value) -> Result<Value, E>,
    {
        let Some((c, args)) = self.split(x) else {
            return Ok(x.clone());
        };
        let args = c
            .fields
            .iter()
            .map(|step| {
                let v = &args[step.position];
                match &step.classification {
                    Classification::Plain => Ok(v.clone()),
                    classification => {
                        let site = FieldSite {
                            constructor: &c.name,
                            position: step.position,
                            label: step.label.as_deref(),
                            ty: &step.ty,
                            classification,
                        };
                        f(&site, v)
                    }
                }
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Value::Con { ctor: c.name.clone(), args })
    }

    pub fn map<F>(&self, x: &Value, mut f: F) -> Value
    where
        F: FnMut(&FieldSite<'_>, &Value) -> Value,
    {
        match self.traverse(x, |site, v| Ok::<_, Infallible>(f(site, v))) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    pub fn hash(&self, x: &Value) -> u64 { self.hash_with_salt(self.ev.salt, x) }

    pub fn hash_with_salt(&self, salt: u64, x: &Value) -> u64 {
        let Some((c, args)) = self.split(x) else {
            return self.ev.leaf.hash_into(salt, x);
        };
        c.fields
            .iter()
            .fold(combine(salt, c.index as u64), |h, step| self.ev.field_hash(step, h, &args[step.position]))
    }

    pub fn show(&self, x: &Value) -> String { self.show_prec(0, x) }

    pub fn show_prec(&self, d: u8, x: &Value) -> String {
        let Some((c, args)) = self.split(x) else {
            return self.ev.leaf.show_prec(d, x);
        };
        if c.is_nullary() {
            return c.name.clone();
        }
        let field = |step: &FieldStep, prec: u8| self.ev.field_show(step, prec, &args[step.position]);
        match &c.shape {
            Shape::Positional => {
                let mut s = c.name.clone();
                for step in &c.fields {
                    s.push(' ');
                    s.push_str(&field(step, 11));
                }
                paren(d > 10, s)
            }
            Shape::Labeled { .. } => {
                let parts: Vec<String> = c
                    .fields
                    .iter()
                    .map(|step| format!("{} = {}", step.label.as_deref().unwrap_or("_"), field(step, 0)))
                    .collect();
                paren(d >= 11, format!("{} {{{}}}", c.name, parts.join(", ")))
            }
            Shape::Infix { fixity } => {
                let op = if c.is_operator() { c.name.clone() } else { format!("`{}`", c.name) };
                let s = format!("{} {op} {}", field(&c.fields[0], fixity + 1), field(&c.fields[1], fixity + 1));
                paren(d > *fixity, s)
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
