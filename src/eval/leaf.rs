//! Leaf primitives for plain fields.
use std::cmp::Ordering;

use super::Value;

const FNV_PRIME: u64 = 16_777_619;

/// The fixed hash combinator every derived hash folds with.
pub fn combine(h: u64, x: u64) -> u64 {
    h.wrapping_mul(FNV_PRIME) ^ x
}

pub trait Leaf: Sync {
    fn equals(&self, a: &Value, b: &Value) -> bool;
    fn compare(&self, a: &Value, b: &Value) -> Ordering;
    fn hash_into(&self, salt: u64, v: &Value) -> u64;
    fn show_prec(&self, d: u8, v: &Value) -> String;
}

/// Structural primitives over [`Value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdLeaf;

fn paren(wrap: bool, s: String) -> String {
    if wrap { format!("({s})") } else { s }
}

fn float_bits(x: f64) -> u64 {
    // 0.0 == -0.0 and NaN == NaN under OrderedFloat
    if x == 0.0 {
        0
    } else if x.is_nan() {
        0x7ff8_0000_0000_0000
    } else {
        x.to_bits()
    }
}

impl Leaf for StdLeaf {
    fn equals(&self, a: &Value, b: &Value) -> bool { a == b }

    fn compare(&self, a: &Value, b: &Value) -> Ordering { a.cmp(b) }

    fn hash_into(&self, salt: u64, v: &Value) -> u64 {
        match v {
            Value::Unit => combine(salt, 0),
            Value::Bool(b) => combine(combine(salt, 1), *b as u64),
            Value::Int(i) => combine(combine(salt, 2), *i as u64),
            Value::Float(x) => combine(combine(salt, 3), float_bits(x.0)),
            Value::Str(s) => s
                .bytes()
                .fold(combine(combine(salt, 4), s.len() as u64), |h, b| combine(h, b as u64)),
            Value::List(xs) => xs
                .iter()
                .fold(combine(combine(salt, 5), xs.len() as u64), |h, x| self.hash_into(h, x)),
            Value::Con { ctor, args } => {
                let h = self.hash_into(combine(salt, 6), &Value::Str(ctor.clone()));
                args.iter().fold(h, |h, x| self.hash_into(h, x))
            }
        }
    }

    fn show_prec(&self, d: u8, v: &Value) -> String {
        match v {
            Value::Unit => "()".into(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Int(i) => paren(d > 6 && *i < 0, i.to_string()),
            Value::Float(x) => paren(d > 6 && x.0.is_sign_negative(), format!("{:?}", x.0)),
            Value::Str(s) => format!("{s:?}"),
            Value::List(xs) => {
                let inner: Vec<String> = xs.iter().map(|x| self.show_prec(0, x)).collect();
                format!("[{}]", inner.join(","))
            }
            Value::Con { ctor, args } if args.is_empty() => ctor.clone(),
            Value::Con { ctor, args } => {
                let mut s = ctor.clone();
                for a in args {
                    s.push(' ');
                    s.push_str(&self.show_prec(11, a));
                }
                paren(d > 10, s)
            }
        }
    }
}
