// Operation description shared by every emitter. No emission details here.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::classify::{BoundSet, Classification};
use crate::descriptor::{FieldType, ParamName, Shape};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivationPlan {
    pub type_name: String,
    pub parameters: Vec<ParamName>,
    pub indices: BTreeSet<ParamName>,
    pub constructors: Vec<ConstructorPlan>,
    pub dispatch: Dispatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructorPlan {
    pub index: usize,        // declaration position; also the hash tag
    pub name: String,
    pub shape: Shape,
    pub fields: Vec<FieldStep>,
    pub bound_after: BoundSet, // what a fully successful scan has proven
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldStep {
    pub position: usize,
    pub ty: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bound_before: BoundSet,
    pub classification: Classification,
}

/// Outer case analysis; arms are tried in order, first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    pub arms: Vec<DispatchArm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "arm", content = "constructor", rename_all = "snake_case")]
pub enum DispatchArm {
    /// `(C, C)`: compare field by field.
    Same(usize),
    /// `(C, _)`: the right side uses a later constructor.
    LeftFirst(usize),
    /// `(_, C)`: the left side uses a later constructor.
    RightFirst(usize),
}

/// What the dispatch decided for one pair of constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Same(usize),
    Less,
    Greater,
}

impl DerivationPlan {
    pub fn constructor(&self, name: &str) -> Option<&ConstructorPlan> {
        self.constructors.iter().find(|c| c.name == name)
    }
}

impl ConstructorPlan {
    pub fn arity(&self) -> usize { self.fields.len() }

    pub fn is_nullary(&self) -> bool { self.fields.is_empty() }

    /// Symbolic names start with `:`; identifier-named infix constructors
    /// render in backticks.
    pub fn is_operator(&self) -> bool { self.name.starts_with(':') }
}
