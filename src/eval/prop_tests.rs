//! Property tests for derived operations using proptest.
//!
//! Laws checked for arbitrary values of the fixture types:
//!
//! 1. Reflexivity of `equals`, `typed_equality`, `compare_typed`
//! 2. `compare_typed(x, y)` is the inverse of `compare_typed(y, x)`
//! 3. A witness implies `equals`
//! 4. `equals` implies equal hashes for any salt
//! 5. Mapping the identity reproduces an equal value
//! 6. An earlier constructor is always less than a later one

use proptest::prelude::*;

use super::tests::{nat, plans};
use super::{Evaluator, Value, WitnessOrdering};
use crate::config::EngineConfig;

fn arb_nat() -> impl Strategy<Value = Value> {
    (0usize..5).prop_map(nat)
}

fn arb_vector() -> impl Strategy<Value = Value> {
    prop::collection::vec(-3i64..3, 0..4).prop_map(|xs| {
        xs.into_iter()
            .rev()
            .fold(Value::nullary("VNil"), |acc, x| Value::con("VCons", vec![Value::Int(x), acc]))
    })
}

fn arb_op() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        (-2i64..2, arb_vector()).prop_map(|(i, v)| Value::con("Scale", vec![Value::Int(i), v])),
        (arb_vector(), -2i64..2).prop_map(|(v, m)| Value::con("Apply", vec![v, Value::Int(m)])),
        prop::collection::vec(arb_nat(), 0..3).prop_map(|ns| Value::con("Batch", vec![Value::List(ns)])),
        (-2i64..2, arb_nat()).prop_map(|(t, n)| Value::con("Tagged", vec![Value::Int(t), n])),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        (inner.clone(), inner).prop_map(|(l, r)| Value::con(":*:", vec![l, r]))
    })
}

fn ctor_index(ty: &str, v: &Value) -> usize {
    let Value::Con { ctor, .. } = v else { unreachable!("generated values are constructors") };
    plans()[ty].constructor(ctor).map(|c| c.index).unwrap_or(usize::MAX)
}

proptest! {
    #[test]
    fn reflexive(x in arb_op()) {
        let plans = plans();
        let ev = Evaluator::new(&plans, &EngineConfig::default());
        let d = ev.derived("Op").unwrap();
        prop_assert!(d.equals(&x, &x));
        prop_assert!(d.typed_equality(&x, &x).is_some());
        prop_assert!(d.compare_typed(&x, &x).is_equal());
    }

    #[test]
    fn ordering_is_antisymmetric(x in arb_op(), y in arb_op()) {
        let plans = plans();
        let ev = Evaluator::new(&plans, &EngineConfig::default());
        let d = ev.derived("Op").unwrap();
        let xy = d.compare_typed(&x, &y).to_ordering();
        let yx = d.compare_typed(&y, &x).to_ordering();
        prop_assert_eq!(xy, yx.reverse());
        prop_assert_eq!(xy.is_eq(), d.equals(&x, &y));
    }

    #[test]
    fn witness_implies_equality_implies_hash(x in arb_op(), y in arb_op(), salt in any::<u64>()) {
        let plans = plans();
        let ev = Evaluator::new(&plans, &EngineConfig::default());
        let d = ev.derived("Op").unwrap();
        if d.typed_equality(&x, &y).is_some() {
            prop_assert!(d.equals(&x, &y));
        }
        if d.equals(&x, &y) {
            prop_assert_eq!(d.hash_with_salt(salt, &x), d.hash_with_salt(salt, &y));
        }
        // equal copies must hash alike too
        let x2 = x.clone();
        prop_assert_eq!(d.hash_with_salt(salt, &x), d.hash_with_salt(salt, &x2));
    }

    #[test]
    fn identity_traversal(x in arb_op()) {
        let plans = plans();
        let ev = Evaluator::new(&plans, &EngineConfig::default());
        let d = ev.derived("Op").unwrap();
        let y = d.map(&x, |_, v| v.clone());
        prop_assert!(d.equals(&x, &y));
        prop_assert_eq!(y, x);
    }

    #[test]
    fn constructor_order_dominates(x in arb_op(), y in arb_op()) {
        let plans = plans();
        let ev = Evaluator::new(&plans, &EngineConfig::default());
        let d = ev.derived("Op").unwrap();
        let (i, j) = (ctor_index("Op", &x), ctor_index("Op", &y));
        if i < j {
            prop_assert_eq!(d.compare_typed(&x, &y), WitnessOrdering::Less);
        }
    }

    #[test]
    fn nullary_show_ignores_precedence(d in 0u8..=11, n in arb_nat()) {
        let plans = plans();
        let ev = Evaluator::new(&plans, &EngineConfig::default());
        let nat = ev.derived("Nat").unwrap();
        prop_assert_eq!(nat.show_prec(d, &Value::nullary("Zero")), "Zero");
        let shown = nat.show_prec(d, &n);
        prop_assert_eq!(shown.starts_with('('), d > 10 && n != Value::nullary("Zero"));
    }
}
