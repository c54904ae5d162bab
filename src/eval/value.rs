use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use crate::classify::Classification;
use crate::descriptor::FieldType;

/// Dynamic value the evaluator runs derived operations against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    List(Vec<Value>),
    Con { ctor: String, args: Vec<Value> },
}

impl Value {
    pub fn con(ctor: impl Into<String>, args: Vec<Value>) -> Self {
        Value::Con { ctor: ctor.into(), args }
    }

    pub fn nullary(ctor: impl Into<String>) -> Self { Self::con(ctor, Vec::new()) }

    pub fn float(x: f64) -> Self { Value::Float(OrderedFloat(x)) }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self { Value::Int(x) }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self { Value::Bool(x) }
}

impl From<&str> for Value {
    fn from(x: &str) -> Self { Value::Str(x.to_string()) }
}

/// Proof that two values' type indices coincide. Only the engine mints these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    proves: String,
}

impl Witness {
    pub(crate) fn new(proves: impl Into<String>) -> Self { Self { proves: proves.into() } }

    /// The type the witness was produced for.
    pub fn proves(&self) -> &str { &self.proves }
}

/// Three-way comparison whose equal case carries a witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessOrdering {
    Less,
    Equal(Witness),
    Greater,
}

impl WitnessOrdering {
    pub fn to_ordering(&self) -> Ordering {
        match self {
            WitnessOrdering::Less => Ordering::Less,
            WitnessOrdering::Equal(_) => Ordering::Equal,
            WitnessOrdering::Greater => Ordering::Greater,
        }
    }

    pub(crate) fn from_ordering(ord: Ordering, proves: impl Into<String>) -> Self {
        match ord {
            Ordering::Less => WitnessOrdering::Less,
            Ordering::Equal => WitnessOrdering::Equal(Witness::new(proves)),
            Ordering::Greater => WitnessOrdering::Greater,
        }
    }

    pub fn is_equal(&self) -> bool { matches!(self, WitnessOrdering::Equal(_)) }
}

/// Where a traversal transform is being applied.
#[derive(Debug, Clone, Copy)]
pub struct FieldSite<'a> {
    pub constructor: &'a str,
    pub position: usize,
    pub label: Option<&'a str>,
    pub ty: &'a FieldType,
    pub classification: &'a Classification,
}
