//! Descriptor symbols → Rust identifiers.

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
    "while", "yield",
];

// cannot be raw identifiers
const RESERVED: &[&str] = &["crate", "self", "super", "Self", "_"];

fn sanitize(name: &str) -> String {
    name.replace('\'', "_")
}

fn escape(ident: String) -> String {
    if RESERVED.contains(&ident.as_str()) {
        format!("{ident}_")
    } else if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else {
        ident
    }
}

fn symbol_word(c: char) -> String {
    match c {
        ':' => "Colon".into(),
        '!' => "Bang".into(),
        '#' => "Hash".into(),
        '$' => "Dollar".into(),
        '%' => "Percent".into(),
        '&' => "Amp".into(),
        '*' => "Star".into(),
        '+' => "Plus".into(),
        '.' => "Dot".into(),
        '/' => "Slash".into(),
        '<' => "Lt".into(),
        '=' => "Eq".into(),
        '>' => "Gt".into(),
        '?' => "Question".into(),
        '@' => "At".into(),
        '\\' => "Backslash".into(),
        '^' => "Caret".into(),
        '|' => "Pipe".into(),
        '~' => "Tilde".into(),
        '-' => "Minus".into(),
        other => format!("U{:04X}", other as u32),
    }
}

/// Type and variant names. Operator constructors are spelled out symbol by
/// symbol: `:*:` becomes `ColonStarColon`.
pub fn type_ident(name: &str) -> String {
    if name.starts_with(':') {
        return name.chars().map(symbol_word).collect();
    }
    escape(sanitize(name))
}

/// Struct-variant field names.
pub fn field_ident(label: &str) -> String {
    escape(sanitize(label))
}

/// Generic parameter names: `t` becomes `T`.
pub fn generic_ident(param: &str) -> String {
    let s = sanitize(param);
    let mut chars = s.chars();
    let ident = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::from("T"),
    };
    escape(ident)
}

/// Rust spelling of a well-known leaf type.
pub fn primitive(name: &str) -> Option<&'static str> {
    Some(match name {
        "Int" | "Int64" => "i64",
        "Int32" => "i32",
        "Integer" => "i128",
        "Word" | "Word64" => "u64",
        "Word8" => "u8",
        "Double" | "Float" => "f64",
        "Bool" => "bool",
        "Char" => "char",
        "String" | "Text" => "String",
        "Unit" | "()" => "()",
        "List" => "Vec",
        _ => return None,
    })
}

/// Variant identifiers for a type, in constructor order. Clashes between a
/// spelled-out operator and a declared name are broken with the position.
pub fn variant_idents<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (i, name) in names.into_iter().enumerate() {
        let mut ident = type_ident(name);
        if out.contains(&ident) {
            ident = format!("{ident}{i}");
        }
        out.push(ident);
    }
    out
}

/// `text` as it must appear inside a `format!` string.
pub fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
