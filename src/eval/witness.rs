use super::{Evaluator, Value, Witness, WitnessOrdering};
use crate::descriptor::FieldType;

/// Witness boundary for indexed fields.
pub trait WitnessOracle: Sync {
    fn try_witness_equality(&self, ev: &Evaluator<'_>, ty: &FieldType, a: &Value, b: &Value) -> Option<Witness>;
    fn try_witness_order(&self, ev: &Evaluator<'_>, ty: &FieldType, a: &Value, b: &Value) -> WitnessOrdering;
}

/// Uses the engine's own typed operations for described types and the leaf
/// primitives for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedWitness;

impl WitnessOracle for DerivedWitness {
    fn try_witness_equality(&self, ev: &Evaluator<'_>, ty: &FieldType, a: &Value, b: &Value) -> Option<Witness> {
        ev.typed_equality_at(ty, a, b)
    }

    fn try_witness_order(&self, ev: &Evaluator<'_>, ty: &FieldType, a: &Value, b: &Value) -> WitnessOrdering {
        ev.compare_typed_at(ty, a, b)
    }
}
