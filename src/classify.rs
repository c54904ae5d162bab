//! Per-field strategy selection.
//!
//! Rules, first match wins:
//! 1. every parameter the field mentions is bound        → `Plain`
//! 2. an application with an unbound parameter argument  → `Indexed { introduces }`
//! 3. the outer constructor is an indexed collection     → `Recurse`
//! 4. anything else                                       → `Indexed` (no new bindings)
use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::descriptor::{FieldType, ParamName};

/// Parameters proven equal so far while scanning one constructor.
pub type BoundSet = BTreeSet<ParamName>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Classification {
    Plain,
    Indexed { introduces: BTreeSet<ParamName> },
    Recurse,
}

/// Why a field cannot be derived at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedShape(pub String);

#[derive(Debug, Clone)]
pub struct Classifier {
    config: EngineConfig,
}

impl Classification {
    pub fn is_plain(&self) -> bool { matches!(self, Classification::Plain) }

    pub fn introduces(&self) -> Option<&BTreeSet<ParamName>> {
        match self {
            Classification::Indexed { introduces } => Some(introduces),
            _ => None,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self { Self::new(&EngineConfig::default()) }
}

impl Classifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self { config: config.clone() }
    }

    fn is_collection(&self, field: &FieldType) -> bool {
        match field {
            FieldType::Nested { .. } => true,
            FieldType::App { .. } => field.head_name().is_some_and(|h| self.config.is_collection(h)),
            _ => false,
        }
    }

    pub fn classify(&self, field: &FieldType, bound: &BoundSet) -> Result<Classification, UnsupportedShape> {
        if field.contains_arrow() {
            return Err(UnsupportedShape("function-typed fields cannot be compared".into()));
        }
        let free = field.free_params();
        if free.is_subset(bound) {
            return Ok(Classification::Plain);
        }
        if let FieldType::Param(p) = field {
            return Err(UnsupportedShape(format!(
                "`{p}` is an unconstrained type variable; nothing is known about its values"
            )));
        }
        let introduces: BTreeSet<ParamName> = field
            .direct_param_args()
            .into_iter()
            .filter(|p| !bound.contains(*p))
            .cloned()
            .collect();
        if !introduces.is_empty() {
            return Ok(Classification::Indexed { introduces });
        }
        if self.is_collection(field) {
            return Ok(Classification::Recurse);
        }
        Ok(Classification::Indexed { introduces: BTreeSet::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> FieldType { s.parse().unwrap() }

    fn bound(ps: &[&str]) -> BoundSet { ps.iter().map(|p| p.to_string()).collect() }

    #[test]
    fn fully_bound_fields_are_plain() {
        let c = Classifier::default();
        assert_eq!(c.classify(&ty("Int"), &bound(&[])), Ok(Classification::Plain));
        assert_eq!(c.classify(&ty("Map k v"), &bound(&["k", "v"])), Ok(Classification::Plain));
        assert_eq!(c.classify(&ty("t"), &bound(&["t"])), Ok(Classification::Plain));
    }

    #[test]
    fn unbound_direct_argument_is_indexed() {
        let c = Classifier::default();
        assert_eq!(
            c.classify(&ty("Matrix n m"), &bound(&["n"])),
            Ok(Classification::Indexed { introduces: bound(&["m"]) })
        );
        assert_eq!(
            c.classify(&ty("f a"), &bound(&["f"])),
            Ok(Classification::Indexed { introduces: bound(&["a"]) })
        );
    }

    #[test]
    fn collections_of_indexed_elements_recurse() {
        let c = Classifier::default();
        assert_eq!(c.classify(&ty("[Vector n]"), &bound(&[])), Ok(Classification::Recurse));
        assert_eq!(c.classify(&ty("Map Int (Vector n)"), &bound(&[])), Ok(Classification::Recurse));
    }

    #[test]
    fn deeper_unbound_references_fall_back_to_indexed_without_bindings() {
        let c = Classifier::default();
        assert_eq!(
            c.classify(&ty("Maybe (Vector n)"), &bound(&[])),
            Ok(Classification::Indexed { introduces: BTreeSet::new() })
        );
    }

    #[test]
    fn classification_flips_with_the_bound_set() {
        let c = Classifier::default();
        let m = ty("Matrix<n, n>");
        assert!(!c.classify(&m, &bound(&[])).unwrap().is_plain());
        assert!(c.classify(&m, &bound(&["n"])).unwrap().is_plain());
    }

    #[test]
    fn exotic_shapes_are_unsupported() {
        let c = Classifier::default();
        assert!(c.classify(&ty("Int -> Int"), &bound(&[])).is_err());
        assert!(c.classify(&ty("a"), &bound(&[])).is_err());
    }

    #[test]
    fn configured_collections_are_honoured() {
        let mut cfg = EngineConfig::default();
        cfg.collections.insert("Seq".into());
        assert!(cfg.is_collection("Seq"));
        let c = Classifier::new(&cfg);
        assert_eq!(c.classify(&ty("Seq (Vector n)"), &bound(&[])), Ok(Classification::Recurse));
        assert_eq!(
            Classifier::default().classify(&ty("Seq (Vector n)"), &bound(&[])),
            Ok(Classification::Indexed { introduces: BTreeSet::new() })
        );
    }
}
