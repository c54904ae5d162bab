//! In-memory reflection oracle backed by JSON descriptor documents.
//!
//! ```json
//! { "types": [
//!     { "kind": "primitive", "name": "Int" },
//!     { "kind": "algebraic", "name": "Vector", "parameters": ["a", "n"], "indices": ["n"],
//!       "constructors": [
//!         { "name": "VNil" },
//!         { "name": "VCons", "fields": ["a", "Vector a m"] } ] } ] }
//! ```
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ConstructorDescriptor, DEFAULT_FIXITY, DefinitionKind, Describe, FieldType, Shape, TypeDescriptor};
use crate::error::{DeriveError, LoadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Algebraic(TypeDescriptor),
    Other(DefinitionKind),
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    defs: IndexMap<String, Definition>,
}

// ------------------------------ Raw documents ------------------------------ //

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    types: Vec<RawDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawDefinition {
    Algebraic {
        name: String,
        #[serde(default)]
        parameters: Vec<String>,
        #[serde(default)]
        indices: Vec<String>,
        constructors: Vec<RawConstructor>,
    },
    Primitive { name: String },
    Function { name: String },
    Opaque { name: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstructor {
    name: String,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    infix: bool,
    #[serde(default)]
    fixity: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    Bare(String),
    Labeled {
        label: String,
        #[serde(rename = "type")]
        ty: String,
    },
}

/// Deserialize with JSON-path context in error messages.
fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

impl RawConstructor {
    fn into_descriptor(self, type_name: &str) -> Result<ConstructorDescriptor, DeriveError> {
        let labeled = self.fields.iter().filter(|f| matches!(f, RawField::Labeled { .. })).count();
        if labeled != 0 && labeled != self.fields.len() {
            return Err(DeriveError::MalformedDescriptor {
                name: type_name.to_string(),
                reason: format!("constructor `{}` mixes labeled and unlabeled fields", self.name),
            });
        }
        if self.fixity.is_some() && !self.infix {
            return Err(DeriveError::MalformedDescriptor {
                name: type_name.to_string(),
                reason: format!("constructor `{}` declares a fixity but is not infix", self.name),
            });
        }

        let parse = |text: &str| {
            text.parse::<FieldType>().map_err(|err| DeriveError::MalformedDescriptor {
                name: type_name.to_string(),
                reason: format!("constructor `{}`: {err}", self.name),
            })
        };
        let mut labels = Vec::with_capacity(labeled);
        let mut fields = Vec::with_capacity(self.fields.len());
        for f in &self.fields {
            match f {
                RawField::Bare(ty) => fields.push(parse(ty)?),
                RawField::Labeled { label, ty } => {
                    labels.push(label.clone());
                    fields.push(parse(ty)?);
                }
            }
        }
        let shape = if self.infix {
            Shape::Infix { fixity: self.fixity.unwrap_or(DEFAULT_FIXITY) }
        } else if labeled > 0 {
            Shape::Labeled { labels }
        } else {
            Shape::Positional
        };
        Ok(ConstructorDescriptor { name: self.name, fields, shape })
    }
}

// ------------------------------- Registry --------------------------------- //

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Register an algebraic type after checking its invariants.
    pub fn insert(&mut self, descriptor: TypeDescriptor) -> Result<(), DeriveError> {
        descriptor.validate()?;
        let name = descriptor.name.clone();
        self.put(name, Definition::Algebraic(descriptor));
        Ok(())
    }

    pub fn insert_kind(&mut self, name: impl Into<String>, kind: DefinitionKind) {
        self.put(name.into(), Definition::Other(kind));
    }

    fn put(&mut self, name: String, def: Definition) {
        if self.defs.contains_key(&name) {
            tracing::warn!(type_name = %name, "descriptor redefined; keeping the latest definition");
        }
        self.defs.insert(name, def);
    }

    pub fn get(&self, name: &str) -> Option<&Definition> { self.defs.get(name) }

    /// Names of every algebraic type, in registration order.
    pub fn algebraic_names(&self) -> Vec<String> {
        self.defs
            .iter()
            .filter(|(_, d)| matches!(d, Definition::Algebraic(_)))
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn len(&self) -> usize { self.defs.len() }

    pub fn is_empty(&self) -> bool { self.defs.is_empty() }

    /// Parse one descriptor document; returns how many definitions it held.
    pub fn load_str(&mut self, src: &str, origin: &Path) -> Result<usize, LoadError> {
        let doc: Document = from_str_with_path(src).map_err(|message| LoadError::Json {
            path: origin.to_path_buf(),
            message,
        })?;
        let count = doc.types.len();
        for raw in doc.types {
            match raw {
                RawDefinition::Algebraic { name, parameters, indices, constructors } => {
                    let constructors = constructors
                        .into_iter()
                        .map(|c| c.into_descriptor(&name))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.insert(TypeDescriptor {
                        name,
                        parameters,
                        indices: indices.into_iter().collect(),
                        constructors,
                    })?;
                }
                RawDefinition::Primitive { name } => self.insert_kind(name, DefinitionKind::Primitive),
                RawDefinition::Function { name } => self.insert_kind(name, DefinitionKind::Function),
                RawDefinition::Opaque { name } => self.insert_kind(name, DefinitionKind::Opaque),
            }
        }
        tracing::debug!(origin = %origin.display(), count, "loaded descriptor document");
        Ok(count)
    }

    pub fn load_path(&mut self, path: &Path) -> Result<usize, LoadError> {
        let src = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&src, path)
    }

    pub fn load_paths<I>(paths: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut out = Self::new();
        for p in paths {
            out.load_path(&p)?;
        }
        Ok(out)
    }

    /// Convenience for in-memory documents.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, LoadError> {
        let mut out = Self::new();
        out.load_str(&value.to_string(), Path::new("<memory>"))?;
        Ok(out)
    }
}

impl Describe for Registry {
    fn describe(&self, type_name: &str) -> Result<TypeDescriptor, DeriveError> {
        match self.defs.get(type_name) {
            None => Err(DeriveError::UnknownType(type_name.to_string())),
            Some(Definition::Algebraic(d)) => Ok(d.clone()),
            Some(Definition::Other(kind)) => Err(DeriveError::NotAlgebraicType {
                name: type_name.to_string(),
                kind: *kind,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({ "types": [
            { "kind": "primitive", "name": "Int" },
            { "kind": "function", "name": "Handler" },
            { "kind": "algebraic", "name": "Shape", "constructors": [
                { "name": "Circle", "fields": ["Int"] },
                { "name": "Rect", "fields": [ { "label": "width", "type": "Int" },
                                             { "label": "height", "type": "Int" } ] },
                { "name": ":+:", "fields": ["Shape", "Shape"], "infix": true, "fixity": 6 }
            ]}
        ]})
    }

    #[test]
    fn shapes_are_derived_from_field_forms() {
        let reg = Registry::from_json(&sample()).unwrap();
        let d = reg.describe("Shape").unwrap();
        assert_eq!(d.constructors[0].shape, Shape::Positional);
        assert_eq!(
            d.constructors[1].shape,
            Shape::Labeled { labels: vec!["width".into(), "height".into()] }
        );
        assert_eq!(d.constructors[2].shape, Shape::Infix { fixity: 6 });
        assert_eq!(reg.algebraic_names(), vec!["Shape".to_string()]);
    }

    #[test]
    fn oracle_failures_are_classified() {
        let reg = Registry::from_json(&sample()).unwrap();
        assert_eq!(reg.describe("Nope"), Err(DeriveError::UnknownType("Nope".into())));
        assert!(matches!(
            reg.describe("Handler"),
            Err(DeriveError::NotAlgebraicType { kind: DefinitionKind::Function, .. })
        ));
        assert!(matches!(
            reg.describe("Int"),
            Err(DeriveError::NotAlgebraicType { kind: DefinitionKind::Primitive, .. })
        ));
    }

    #[test]
    fn bad_field_syntax_is_malformed_with_parser_message() {
        let doc = json!({ "types": [
            { "kind": "algebraic", "name": "T", "constructors": [
                { "name": "C", "fields": ["Int", { "label": "v", "type": "Vector<n" }] } ] }
        ]});
        match Registry::from_json(&doc) {
            Err(LoadError::Descriptor(DeriveError::MalformedDescriptor { name, reason })) => {
                assert_eq!(name, "T");
                assert!(reason.contains("constructor `C`"), "{reason}");
                assert!(reason.contains("unterminated `<...>` argument list"), "{reason}");
            }
            other => panic!("expected a malformed descriptor, got {other:?}"),
        }
    }

    #[test]
    fn structural_json_errors_report_path() {
        let doc = json!({ "types": [
            { "kind": "algebraic", "name": "T", "constructors": [ { "name": "C", "fields": [3] } ] }
        ]});
        match Registry::from_json(&doc) {
            Err(LoadError::Json { message, .. }) => assert!(message.contains("types[0]"), "{message}"),
            other => panic!("expected json error, got {other:?}"),
        }
    }

    #[test]
    fn mixed_labels_are_malformed() {
        let doc = json!({ "types": [
            { "kind": "algebraic", "name": "T", "constructors": [
                { "name": "C", "fields": ["Int", { "label": "x", "type": "Int" }] } ] }
        ]});
        assert!(matches!(
            Registry::from_json(&doc),
            Err(LoadError::Descriptor(DeriveError::MalformedDescriptor { .. }))
        ));
    }

    #[test]
    fn later_definitions_win() {
        let mut reg = Registry::from_json(&sample()).unwrap();
        reg.insert_kind("Shape", DefinitionKind::Opaque);
        assert!(reg.describe("Shape").is_err());
        assert_eq!(reg.len(), 3);
    }
}
