//! Generation-time failures.
//!
//! None of these are ever raised while running a derived operation against
//! values; mismatched data produces negative results, not errors.
use std::path::PathBuf;
use thiserror::Error;

use crate::descriptor::DefinitionKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("`{name}` is not an algebraic type (it is {kind})")]
    NotAlgebraicType { name: String, kind: DefinitionKind },

    #[error("unsupported field shape in `{type_name}::{constructor}` field #{position} (`{field}`): {reason}")]
    UnsupportedFieldShape {
        type_name: String,
        constructor: String,
        position: usize,
        field: String,
        reason: String,
    },

    #[error("malformed descriptor for `{name}`: {reason}")]
    MalformedDescriptor { name: String, reason: String },
}

/// Failures while reading descriptor documents into a registry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid descriptor document {}: {message}", path.display())]
    Json { path: PathBuf, message: String },

    #[error(transparent)]
    Descriptor(#[from] DeriveError),
}
