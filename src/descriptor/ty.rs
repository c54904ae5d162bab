//! Field type expressions and their textual syntax.
//!
//! Accepted forms: `Int`, `Vector n`, `Vector<n>`, `Matrix<n, n>`,
//! `Maybe (Vector n)`, `f a`, `[Vector n]`, `a -> b`.
use std::collections::BTreeSet;
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type ParamName = String;

/// Container name used for the `[t]` list syntax.
pub const LIST_CONTAINER: &str = "List";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeHead {
    Named(String),
    Param(ParamName),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Param(ParamName),
    App { head: TypeHead, args: Vec<FieldType> },
    Nested { container: String, args: Vec<FieldType> },
    /// Only representable so it can be rejected during classification.
    Arrow(Box<FieldType>, Box<FieldType>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntaxError {
    pub input: String,
    pub message: String,
}

impl fmt::Display for TypeSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse type `{}`: {}", self.input, self.message)
    }
}

impl std::error::Error for TypeSyntaxError {}

// ————————————————————————————————————————————————————————————————————————————
// QUERIES
// ————————————————————————————————————————————————————————————————————————————

impl FieldType {
    pub fn named(head: impl Into<String>, args: Vec<FieldType>) -> Self {
        FieldType::App { head: TypeHead::Named(head.into()), args }
    }

    pub fn param(name: impl Into<String>) -> Self {
        FieldType::Param(name.into())
    }

    /// Every parameter referenced anywhere in the expression, heads included.
    pub fn free_params(&self) -> BTreeSet<ParamName> {
        let mut out = BTreeSet::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params(&self, out: &mut BTreeSet<ParamName>) {
        match self {
            FieldType::Param(p) => {
                out.insert(p.clone());
            }
            FieldType::App { head, args } => {
                if let TypeHead::Param(p) = head {
                    out.insert(p.clone());
                }
                for a in args { a.collect_params(out); }
            }
            FieldType::Nested { args, .. } => {
                for a in args { a.collect_params(out); }
            }
            FieldType::Arrow(a, b) => {
                a.collect_params(out);
                b.collect_params(out);
            }
        }
    }

    /// Parameters that appear directly as arguments of an application.
    pub fn direct_param_args(&self) -> Vec<&ParamName> {
        match self {
            FieldType::App { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    FieldType::Param(p) => Some(p),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains_arrow(&self) -> bool {
        match self {
            FieldType::Param(_) => false,
            FieldType::App { args, .. } | FieldType::Nested { args, .. } => {
                args.iter().any(FieldType::contains_arrow)
            }
            FieldType::Arrow(..) => true,
        }
    }

    /// Name of the outermost concrete type constructor, if there is one.
    pub fn head_name(&self) -> Option<&str> {
        match self {
            FieldType::App { head: TypeHead::Named(n), .. } => Some(n),
            FieldType::Nested { container, .. } => Some(container),
            _ => None,
        }
    }

    /// Element type of a container: its last argument.
    pub fn element_type(&self) -> Option<&FieldType> {
        match self {
            FieldType::App { args, .. } | FieldType::Nested { args, .. } => args.last(),
            _ => None,
        }
    }

    fn is_atomic(&self) -> bool {
        match self {
            FieldType::Param(_) => true,
            FieldType::App { args, .. } => args.is_empty(),
            FieldType::Nested { container, args } => container == LIST_CONTAINER && args.len() == 1,
            FieldType::Arrow(..) => false,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

struct Atom<'a>(&'a FieldType);

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_atomic() { write!(f, "{}", self.0) } else { write!(f, "({})", self.0) }
    }
}

impl fmt::Display for TypeHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHead::Named(n) | TypeHead::Param(n) => f.write_str(n),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Param(p) => f.write_str(p),
            FieldType::Nested { container, args } if container == LIST_CONTAINER && args.len() == 1 => {
                write!(f, "[{}]", args[0])
            }
            FieldType::App { head, args } => {
                write!(f, "{head}")?;
                for a in args { write!(f, " {}", Atom(a))?; }
                Ok(())
            }
            FieldType::Nested { container, args } => {
                f.write_str(container)?;
                for a in args { write!(f, " {}", Atom(a))?; }
                Ok(())
            }
            FieldType::Arrow(a, b) => {
                if matches!(**a, FieldType::Arrow(..)) {
                    write!(f, "({a}) -> {b}")
                } else {
                    write!(f, "{a} -> {b}")
                }
            }
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let src = String::deserialize(deserializer)?;
        src.parse().map_err(serde::de::Error::custom)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Lt,
    Gt,
    Comma,
    Arrow,
}

fn tokenize(src: &str) -> Result<Vec<Tok>, String> {
    let mut out = Vec::new();
    let mut it: Peekable<Chars<'_>> = src.chars().peekable();
    while let Some(&c) = it.peek() {
        match c {
            c if c.is_whitespace() => { it.next(); }
            '(' => { it.next(); out.push(Tok::LParen); }
            ')' => { it.next(); out.push(Tok::RParen); }
            '[' => { it.next(); out.push(Tok::LBracket); }
            ']' => { it.next(); out.push(Tok::RBracket); }
            '<' => { it.next(); out.push(Tok::Lt); }
            '>' => { it.next(); out.push(Tok::Gt); }
            ',' => { it.next(); out.push(Tok::Comma); }
            '-' => {
                it.next();
                if it.next() != Some('>') {
                    return Err("expected `->`".into());
                }
                out.push(Tok::Arrow);
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = it.peek() {
                    if c.is_alphanumeric() || matches!(c, '_' | '\'' | '.') {
                        name.push(c);
                        it.next();
                    } else {
                        break;
                    }
                }
                out.push(Tok::Ident(name));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(out)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> { self.toks.get(self.pos) }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: Tok) -> Result<(), String> {
        match self.bump() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(format!("expected {want:?}, found {t:?}")),
            None => Err(format!("expected {want:?}, found end of input")),
        }
    }

    fn ty(&mut self) -> Result<FieldType, String> {
        let lhs = self.app()?;
        if self.peek() == Some(&Tok::Arrow) {
            self.bump();
            let rhs = self.ty()?;
            return Ok(FieldType::Arrow(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn starts_atom(&self) -> bool {
        matches!(self.peek(), Some(Tok::Ident(_) | Tok::LParen | Tok::LBracket))
    }

    fn app(&mut self) -> Result<FieldType, String> {
        let head = self.atom()?;
        if !self.starts_atom() {
            return Ok(head);
        }
        let mut extra = Vec::new();
        while self.starts_atom() {
            extra.push(self.atom()?);
        }
        match head {
            FieldType::Param(p) => Ok(FieldType::App { head: TypeHead::Param(p), args: extra }),
            FieldType::App { head, mut args } => {
                args.extend(extra);
                Ok(FieldType::App { head, args })
            }
            other => Err(format!("`{other}` cannot be applied to arguments")),
        }
    }

    fn atom(&mut self) -> Result<FieldType, String> {
        match self.bump() {
            Some(Tok::Ident(name)) => {
                let mut args = Vec::new();
                if self.peek() == Some(&Tok::Lt) {
                    self.bump();
                    loop {
                        args.push(self.ty()?);
                        match self.bump() {
                            Some(Tok::Comma) => continue,
                            Some(Tok::Gt) => break,
                            _ => return Err("unterminated `<...>` argument list".into()),
                        }
                    }
                }
                let is_param = name.chars().next().is_some_and(|c| c.is_lowercase() || c == '_');
                Ok(match (is_param, args.is_empty()) {
                    (true, true) => FieldType::Param(name),
                    (true, false) => FieldType::App { head: TypeHead::Param(name), args },
                    (false, _) => FieldType::App { head: TypeHead::Named(name), args },
                })
            }
            Some(Tok::LParen) => {
                if self.peek() == Some(&Tok::RParen) {
                    self.bump();
                    return Ok(FieldType::named("()", Vec::new()));
                }
                let inner = self.ty()?;
                self.expect(Tok::RParen)?;
                Ok(inner)
            }
            Some(Tok::LBracket) => {
                let inner = self.ty()?;
                self.expect(Tok::RBracket)?;
                Ok(FieldType::Nested { container: LIST_CONTAINER.into(), args: vec![inner] })
            }
            Some(t) => Err(format!("unexpected {t:?}")),
            None => Err("unexpected end of input".into()),
        }
    }
}

impl FromStr for FieldType {
    type Err = TypeSyntaxError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let fail = |message: String| TypeSyntaxError { input: src.to_string(), message };
        let toks = tokenize(src).map_err(fail)?;
        if toks.is_empty() {
            return Err(fail("empty type".into()));
        }
        let mut parser = Parser { toks, pos: 0 };
        let ty = parser.ty().map_err(fail)?;
        if let Some(t) = parser.peek() {
            return Err(fail(format!("trailing input at {t:?}")));
        }
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FieldType { s.parse().unwrap() }

    #[test]
    fn angle_and_juxtaposition_forms_agree() {
        assert_eq!(p("Matrix<n, n>"), p("Matrix n n"));
        assert_eq!(p("Vector<n>").to_string(), "Vector n");
    }

    #[test]
    fn nested_application_is_parenthesized_on_display() {
        let t = p("Maybe (Vector n)");
        assert_eq!(t.to_string(), "Maybe (Vector n)");
        assert_eq!(t.free_params().into_iter().collect::<Vec<_>>(), vec!["n".to_string()]);
        assert!(t.direct_param_args().is_empty());
    }

    #[test]
    fn list_syntax_is_a_nested_container() {
        let t = p("[Vector n]");
        assert!(matches!(t, FieldType::Nested { ref container, .. } if container == LIST_CONTAINER));
        assert_eq!(t.to_string(), "[Vector n]");
        assert_eq!(t.element_type(), Some(&p("Vector n")));
    }

    #[test]
    fn parameter_heads_are_free() {
        let t = p("f a");
        assert_eq!(t.free_params().len(), 2);
        assert_eq!(t.direct_param_args(), vec!["a"]);
    }

    #[test]
    fn arrows_parse_right_associative() {
        let t = p("a -> b -> c");
        assert!(t.contains_arrow());
        assert_eq!(t.to_string(), "a -> b -> c");
        assert_eq!(p("(a -> b) -> c").to_string(), "(a -> b) -> c");
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!("".parse::<FieldType>().is_err());
        assert!("Vector<n".parse::<FieldType>().is_err());
        assert!("[a] b".parse::<FieldType>().is_err());
        assert!("a - b".parse::<FieldType>().is_err());
    }
}
