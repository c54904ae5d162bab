//! Engine configuration. Every field has a default so an empty JSON object
//! (or no file at all) is a valid configuration.
use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Salt used when the caller does not supply one.
pub const DEFAULT_HASH_SALT: u64 = 0xdc36_d161_5b74_00a4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Derivation {
    Eq,
    TypedEq,
    TypedOrd,
    Traverse,
    Hash,
    Show,
}

impl Derivation {
    pub const ALL: [Derivation; 6] = [
        Derivation::Eq,
        Derivation::TypedEq,
        Derivation::TypedOrd,
        Derivation::Traverse,
        Derivation::Hash,
        Derivation::Show,
    ];

    /// Families the emitted impl of `self` calls into. Equality tests
    /// indexed fields through `typed_eq`; typed equality rejects plain
    /// fields with `!=`.
    pub fn requires(self) -> &'static [Derivation] {
        match self {
            Derivation::Eq => &[Derivation::TypedEq],
            Derivation::TypedEq => &[Derivation::Eq],
            Derivation::TypedOrd | Derivation::Traverse | Derivation::Hash | Derivation::Show => &[],
        }
    }

    /// `selected` plus everything it transitively requires.
    pub fn closure(selected: &BTreeSet<Derivation>) -> BTreeSet<Derivation> {
        let mut out = selected.clone();
        let mut pending: Vec<Derivation> = selected.iter().copied().collect();
        while let Some(d) = pending.pop() {
            for &req in d.requires() {
                if out.insert(req) {
                    tracing::debug!(required = ?req, by = ?d, "adding required derivation");
                    pending.push(req);
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Type constructors treated as indexed collections by the classifier.
    pub collections: BTreeSet<String>,
    pub hash_salt: u64,
    /// Families emitted by the Rust emitter.
    pub derive: BTreeSet<Derivation>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collections: ["List", "Map", "DMap", "Set"].into_iter().map(String::from).collect(),
            hash_salt: DEFAULT_HASH_SALT,
            derive: Derivation::ALL.into_iter().collect(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let de = &mut serde_json::Deserializer::from_str(&src);
        serde_path_to_error::deserialize(de)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn is_collection(&self, head: &str) -> bool {
        self.collections.contains(head)
    }
}
