//! Normalized description of an algebraic data type.
//!
//! Produced by an oracle implementing [`Describe`] and consumed read-only by
//! every derivation. Constructor order is significant: it is the fallback
//! total order between values built with different constructors.
pub mod registry;
pub mod ty;

use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DeriveError;

pub use registry::Registry;
pub use ty::{FieldType, ParamName, TypeHead};

/// Fixity used for infix constructors that do not declare one.
pub const DEFAULT_FIXITY: u8 = 9;

static IDENT_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9_']*$").unwrap());
static OPERATOR_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:[!#$%&*+./<=>?@\\^|~:-]*$").unwrap());
static PARAM_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][A-Za-z0-9_']*$").unwrap());
static LABEL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][A-Za-z0-9_']*$").unwrap());

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub parameters: Vec<ParamName>,
    /// Subset of `parameters` acting as type indices.
    pub indices: BTreeSet<ParamName>,
    pub constructors: Vec<ConstructorDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructorDescriptor {
    pub name: String,
    pub fields: Vec<FieldType>,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Positional,
    Labeled { labels: Vec<String> },
    /// Always exactly two fields.
    Infix { fixity: u8 },
}

/// What the oracle found behind a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Algebraic,
    Primitive,
    Function,
    Opaque,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefinitionKind::Algebraic => "an algebraic type",
            DefinitionKind::Primitive => "a primitive type",
            DefinitionKind::Function => "a function type",
            DefinitionKind::Opaque => "an opaque foreign type",
        })
    }
}

/// The reflection oracle: resolves a type name to its constructor set.
pub trait Describe {
    fn describe(&self, type_name: &str) -> Result<TypeDescriptor, DeriveError>;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeDescriptor {
    /// Parameters compared structurally; everything else starts unbound.
    pub fn structural_parameters(&self) -> BTreeSet<ParamName> {
        self.parameters
            .iter()
            .filter(|p| !self.indices.contains(*p))
            .cloned()
            .collect()
    }

    pub fn constructor(&self, name: &str) -> Option<(usize, &ConstructorDescriptor)> {
        self.constructors.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// Check the model invariants the oracle promises.
    pub fn validate(&self) -> Result<(), DeriveError> {
        let bad = |reason: String| DeriveError::MalformedDescriptor { name: self.name.clone(), reason };

        if !IDENT_SYMBOL.is_match(&self.name) {
            return Err(bad(format!("`{}` is not a valid type name", self.name)));
        }
        let mut seen = BTreeSet::new();
        for p in &self.parameters {
            if !PARAM_NAME.is_match(p) {
                return Err(bad(format!("`{p}` is not a valid parameter name")));
            }
            if !seen.insert(p) {
                return Err(bad(format!("duplicate parameter `{p}`")));
            }
        }
        if let Some(stray) = self.indices.iter().find(|i| !seen.contains(i)) {
            return Err(bad(format!("index `{stray}` is not a declared parameter")));
        }
        if self.constructors.is_empty() {
            return Err(bad("no constructors".into()));
        }
        let mut names = BTreeSet::new();
        for c in &self.constructors {
            if !names.insert(c.name.as_str()) {
                return Err(bad(format!("duplicate constructor `{}`", c.name)));
            }
            c.validate().map_err(bad)?;
        }
        Ok(())
    }
}

impl ConstructorDescriptor {
    pub fn positional(name: impl Into<String>, fields: Vec<FieldType>) -> Self {
        Self { name: name.into(), fields, shape: Shape::Positional }
    }

    pub fn arity(&self) -> usize { self.fields.len() }

    fn validate(&self) -> Result<(), String> {
        let symbol_ok = IDENT_SYMBOL.is_match(&self.name)
            || (matches!(self.shape, Shape::Infix { .. }) && OPERATOR_SYMBOL.is_match(&self.name));
        if !symbol_ok {
            return Err(format!("`{}` is not a valid constructor symbol", self.name));
        }
        match &self.shape {
            Shape::Positional => Ok(()),
            Shape::Labeled { labels } => {
                if labels.len() != self.fields.len() {
                    return Err(format!(
                        "`{}` has {} labels for {} fields",
                        self.name,
                        labels.len(),
                        self.fields.len()
                    ));
                }
                let mut seen = BTreeSet::new();
                for l in labels {
                    if !LABEL_NAME.is_match(l) || !seen.insert(l) {
                        return Err(format!("`{}` has an invalid or duplicate label `{l}`", self.name));
                    }
                }
                Ok(())
            }
            Shape::Infix { fixity } => {
                if self.fields.len() != 2 {
                    return Err(format!("infix constructor `{}` must have exactly 2 fields", self.name));
                }
                if *fixity > 9 {
                    return Err(format!("infix constructor `{}` has fixity {fixity} (max 9)", self.name));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> TypeDescriptor {
        TypeDescriptor {
            name: "Vector".into(),
            parameters: vec!["a".into(), "n".into()],
            indices: ["n".to_string()].into_iter().collect(),
            constructors: vec![
                ConstructorDescriptor::positional("VNil", vec![]),
                ConstructorDescriptor::positional(
                    "VCons",
                    vec!["a".parse().unwrap(), "Vector a m".parse().unwrap()],
                ),
            ],
        }
    }

    #[test]
    fn structural_parameters_exclude_indices() {
        let d = vector();
        assert!(d.validate().is_ok());
        assert_eq!(d.structural_parameters().into_iter().collect::<Vec<_>>(), vec!["a".to_string()]);
        assert_eq!(d.constructor("VCons").map(|(i, _)| i), Some(1));
    }

    #[test]
    fn infix_arity_is_enforced() {
        let mut d = vector();
        d.constructors[1].shape = Shape::Infix { fixity: 5 };
        assert!(d.validate().is_ok());
        d.constructors[0].shape = Shape::Infix { fixity: 5 };
        assert!(matches!(d.validate(), Err(DeriveError::MalformedDescriptor { .. })));
    }

    #[test]
    fn operator_symbols_require_infix_shape() {
        let mut d = vector();
        d.constructors[1].name = ":>".into();
        assert!(d.validate().is_err());
        d.constructors[1].shape = Shape::Infix { fixity: DEFAULT_FIXITY };
        assert!(d.validate().is_ok());
    }

    #[test]
    fn stray_index_and_duplicates_are_rejected() {
        let mut d = vector();
        d.indices.insert("k".into());
        assert!(d.validate().is_err());

        let mut d = vector();
        d.parameters.push("a".into());
        assert!(d.validate().is_err());

        let mut d = vector();
        d.constructors.push(ConstructorDescriptor::positional("VNil", vec![]));
        assert!(d.validate().is_err());
    }
}
