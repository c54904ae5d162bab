//! Derives equality, typed equality, typed ordering, traversal, hashing and
//! rendering for indexed algebraic data types from a descriptor model.
//!
//! descriptor → (classify, bind, dispatch) → ir → (eval | codegen)
pub mod bind;
pub mod classify;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod ir;
pub mod lower;

pub use config::EngineConfig;
pub use descriptor::{Describe, Registry, TypeDescriptor};
pub use error::{DeriveError, LoadError};
pub use lower::{PlanSet, lower_to_ir, lower_with_dependencies};
