//! Support items every generated impl relies on.
//!
//! The primitive leaf impls (integers, `bool`, `f64`, `String`, `char`,
//! `()`) hash and render like `eval::StdLeaf`. A plain field holding a
//! described type does not: the evaluator hands it to the leaf, which hashes
//! the constructor name, while generated code calls the derived impl, which
//! hashes the constructor index.

pub(super) const HEADER: &str = "// @generated by gderive. Do not edit by hand.";

pub(super) const PRELUDE: &str = r#"use std::cmp::Ordering;

/// Proof that two values' type indices coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Witness {
    pub proves: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessOrdering {
    Less,
    Equal(Witness),
    Greater,
}

impl WitnessOrdering {
    pub fn from_ordering(ord: Ordering, proves: &'static str) -> Self {
        match ord {
            Ordering::Less => WitnessOrdering::Less,
            Ordering::Equal => WitnessOrdering::Equal(Witness { proves }),
            Ordering::Greater => WitnessOrdering::Greater,
        }
    }

    pub fn to_ordering(self) -> Ordering {
        match self {
            WitnessOrdering::Less => Ordering::Less,
            WitnessOrdering::Equal(_) => Ordering::Equal,
            WitnessOrdering::Greater => Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Indexed,
    Recurse,
}

/// Where a traversal is visiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSite {
    pub constructor: &'static str,
    pub position: usize,
    pub label: Option<&'static str>,
    pub strategy: Strategy,
}

pub trait TypedEq {
    fn typed_eq(&self, other: &Self) -> Option<Witness>;
}

pub trait TypedOrd {
    fn typed_cmp(&self, other: &Self) -> WitnessOrdering;
}

pub trait SaltedHash {
    fn salted_hash(&self, salt: u64) -> u64;

    fn derived_hash(&self) -> u64 {
        self.salted_hash(HASH_SALT)
    }
}

pub trait ShowPrec {
    fn show_prec(&self, d: u8) -> String;

    fn show(&self) -> String {
        self.show_prec(0)
    }
}

pub trait FieldVisitor {
    type Error;
    fn visit<F: Clone + 'static>(&mut self, site: FieldSite, field: &F) -> Result<F, Self::Error>;
}

pub trait Traverse: Sized {
    fn traverse<V: FieldVisitor>(&self, visitor: &mut V) -> Result<Self, V::Error>;
}

pub fn combine(h: u64, x: u64) -> u64 {
    h.wrapping_mul(16_777_619) ^ x
}

pub fn paren(wrap: bool, s: String) -> String {
    if wrap { format!("({s})") } else { s }
}

pub fn eq_iter<'a, T: PartialEq + 'a>(
    l: impl ExactSizeIterator<Item = &'a T>,
    r: impl ExactSizeIterator<Item = &'a T>,
) -> bool {
    l.len() == r.len() && l.zip(r).all(|(x, y)| x == y)
}

pub fn typed_eq_iter<'a, T: TypedEq + 'a>(
    l: impl ExactSizeIterator<Item = &'a T>,
    r: impl ExactSizeIterator<Item = &'a T>,
    proves: &'static str,
) -> Option<Witness> {
    if l.len() != r.len() {
        return None;
    }
    for (x, y) in l.zip(r) {
        x.typed_eq(y)?;
    }
    Some(Witness { proves })
}

pub fn typed_cmp_iter<'a, T: TypedOrd + 'a>(
    l: impl ExactSizeIterator<Item = &'a T>,
    r: impl ExactSizeIterator<Item = &'a T>,
    proves: &'static str,
) -> WitnessOrdering {
    let (n, m) = (l.len(), r.len());
    for (x, y) in l.zip(r) {
        match x.typed_cmp(y) {
            WitnessOrdering::Equal(_) => {}
            decided => return decided,
        }
    }
    WitnessOrdering::from_ordering(n.cmp(&m), proves)
}

pub fn hash_iter<'a, T: SaltedHash + 'a>(salt: u64, xs: impl ExactSizeIterator<Item = &'a T>) -> u64 {
    let h = combine(salt, xs.len() as u64);
    xs.fold(h, |h, x| x.salted_hash(h))
}

pub fn show_iter<'a, T: ShowPrec + 'a>(xs: impl Iterator<Item = &'a T>) -> String {
    let inner: Vec<String> = xs.map(|x| x.show_prec(0)).collect();
    format!("[{}]", inner.join(","))
}

macro_rules! leaf_integer {
    ($($t:ty),*) => {$(
        impl TypedEq for $t {
            fn typed_eq(&self, other: &Self) -> Option<Witness> {
                (self == other).then_some(Witness { proves: stringify!($t) })
            }
        }
        impl TypedOrd for $t {
            fn typed_cmp(&self, other: &Self) -> WitnessOrdering {
                WitnessOrdering::from_ordering(self.cmp(other), stringify!($t))
            }
        }
        impl SaltedHash for $t {
            fn salted_hash(&self, salt: u64) -> u64 {
                combine(combine(salt, 2), *self as u64)
            }
        }
        impl ShowPrec for $t {
            fn show_prec(&self, d: u8) -> String {
                let s = self.to_string();
                paren(d > 6 && s.starts_with('-'), s)
            }
        }
    )*};
}

leaf_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl TypedEq for () {
    fn typed_eq(&self, _: &Self) -> Option<Witness> {
        Some(Witness { proves: "()" })
    }
}

impl TypedOrd for () {
    fn typed_cmp(&self, _: &Self) -> WitnessOrdering {
        WitnessOrdering::Equal(Witness { proves: "()" })
    }
}

impl SaltedHash for () {
    fn salted_hash(&self, salt: u64) -> u64 {
        combine(salt, 0)
    }
}

impl ShowPrec for () {
    fn show_prec(&self, _: u8) -> String {
        "()".to_string()
    }
}

impl TypedEq for bool {
    fn typed_eq(&self, other: &Self) -> Option<Witness> {
        (self == other).then_some(Witness { proves: "bool" })
    }
}

impl TypedOrd for bool {
    fn typed_cmp(&self, other: &Self) -> WitnessOrdering {
        WitnessOrdering::from_ordering(self.cmp(other), "bool")
    }
}

impl SaltedHash for bool {
    fn salted_hash(&self, salt: u64) -> u64 {
        combine(combine(salt, 1), *self as u64)
    }
}

impl ShowPrec for bool {
    fn show_prec(&self, _: u8) -> String {
        if *self { "True".to_string() } else { "False".to_string() }
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn float_bits(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else if x.is_nan() {
        0x7ff8_0000_0000_0000
    } else {
        x.to_bits()
    }
}

impl TypedEq for f64 {
    fn typed_eq(&self, other: &Self) -> Option<Witness> {
        float_cmp(*self, *other).is_eq().then_some(Witness { proves: "f64" })
    }
}

impl TypedOrd for f64 {
    fn typed_cmp(&self, other: &Self) -> WitnessOrdering {
        WitnessOrdering::from_ordering(float_cmp(*self, *other), "f64")
    }
}

impl SaltedHash for f64 {
    fn salted_hash(&self, salt: u64) -> u64 {
        combine(combine(salt, 3), float_bits(*self))
    }
}

impl ShowPrec for f64 {
    fn show_prec(&self, d: u8) -> String {
        paren(d > 6 && self.is_sign_negative(), format!("{self:?}"))
    }
}

impl TypedEq for String {
    fn typed_eq(&self, other: &Self) -> Option<Witness> {
        (self == other).then_some(Witness { proves: "String" })
    }
}

impl TypedOrd for String {
    fn typed_cmp(&self, other: &Self) -> WitnessOrdering {
        WitnessOrdering::from_ordering(self.cmp(other), "String")
    }
}

impl SaltedHash for String {
    fn salted_hash(&self, salt: u64) -> u64 {
        let h = combine(combine(salt, 4), self.len() as u64);
        self.bytes().fold(h, |h, b| combine(h, b as u64))
    }
}

impl ShowPrec for String {
    fn show_prec(&self, _: u8) -> String {
        format!("{self:?}")
    }
}

impl TypedEq for char {
    fn typed_eq(&self, other: &Self) -> Option<Witness> {
        (self == other).then_some(Witness { proves: "char" })
    }
}

impl TypedOrd for char {
    fn typed_cmp(&self, other: &Self) -> WitnessOrdering {
        WitnessOrdering::from_ordering(self.cmp(other), "char")
    }
}

impl SaltedHash for char {
    fn salted_hash(&self, salt: u64) -> u64 {
        self.to_string().salted_hash(salt)
    }
}

impl ShowPrec for char {
    fn show_prec(&self, _: u8) -> String {
        format!("{self:?}")
    }
}

impl<T: TypedEq> TypedEq for Vec<T> {
    fn typed_eq(&self, other: &Self) -> Option<Witness> {
        typed_eq_iter(self.iter(), other.iter(), "Vec")
    }
}

impl<T: TypedOrd> TypedOrd for Vec<T> {
    fn typed_cmp(&self, other: &Self) -> WitnessOrdering {
        typed_cmp_iter(self.iter(), other.iter(), "Vec")
    }
}

impl<T: SaltedHash> SaltedHash for Vec<T> {
    fn salted_hash(&self, salt: u64) -> u64 {
        hash_iter(combine(salt, 5), self.iter())
    }
}

impl<T: ShowPrec> ShowPrec for Vec<T> {
    fn show_prec(&self, _: u8) -> String {
        show_iter(self.iter())
    }
}
"#;
