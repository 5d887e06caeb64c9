//! Canonical forms for types, defaults, and schema objects.
//!
//! Catalog introspection and hand-written declarations spell the same thing in
//! different ways (`int4` vs `integer`, `'{}'::text[]` vs `ARRAY[]::text[]`,
//! `CURRENT_TIMESTAMP` vs `now()`). Everything the diff engine compares for
//! equality goes through this module first.
//!
//! Normalization only merges spellings PostgreSQL treats as identical. When in
//! doubt a spelling is left alone: a missed merge costs a redundant
//! `ALTER`, a wrong merge hides a real change.

use std::sync::LazyLock;

use delta_schema::{Constraint, ConstraintKind, DEFAULT_INDEX_METHOD, Index, ReferentialAction};
use regex_lite::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Type aliases and their canonical spelling.
const TYPE_ALIASES: &[(&str, &str)] = &[
    ("character varying", "varchar"),
    ("char varying", "varchar"),
    ("character", "char"),
    ("bpchar", "char"),
    ("timestamp without time zone", "timestamp"),
    ("timestamp with time zone", "timestamptz"),
    ("time without time zone", "time"),
    ("time with time zone", "timetz"),
    ("bit varying", "varbit"),
    ("float8", "double precision"),
    ("float4", "real"),
    ("int8", "bigint"),
    ("int4", "integer"),
    ("int2", "smallint"),
    ("int", "integer"),
    ("bool", "boolean"),
    ("decimal", "numeric"),
    ("serial2", "smallserial"),
    ("serial4", "serial"),
    ("serial8", "bigserial"),
];

/// Aliases ordered longest first so compound spellings win over their prefixes.
static ALIASES_LONGEST_FIRST: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    let mut aliases = TYPE_ALIASES.to_vec();
    aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
    aliases
});

/// Function spellings that evaluate to the same value.
const EQUIVALENT_CALLS: &[(&str, &str)] = &[
    ("now()", "now()"),
    ("current_timestamp", "now()"),
    ("current_timestamp()", "now()"),
    ("transaction_timestamp()", "now()"),
    ("gen_random_uuid()", "gen_random_uuid()"),
    ("uuid_generate_v4()", "gen_random_uuid()"),
    ("public.uuid_generate_v4()", "gen_random_uuid()"),
    ("jsonb_build_object()", "{}"),
    ("json_build_object()", "{}"),
    ("jsonb_build_array()", "[]"),
    ("json_build_array()", "[]"),
    ("array[]", "{}"),
];

static CAST_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?i)"?[a-z_][a-z0-9_."]*(\s+[a-z_]+)*\s*(\(\s*\d+(\s*,\s*\d+)?\s*\))?(\s+[a-z_]+)*(\[\d*\])*$"#,
    )
    .expect("valid cast pattern")
});

static FK_REFERENCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)references\s+("[^"]+"|[a-z0-9_.$]+)\s*(?:\(([^)]*)\))?"#)
        .expect("valid references pattern")
});

static FK_ON_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)on\s+delete\s+(no\s+action|restrict|cascade|set\s+null|set\s+default)")
        .expect("valid on delete pattern")
});

static FK_ON_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)on\s+update\s+(no\s+action|restrict|cascade|set\s+null|set\s+default)")
        .expect("valid on update pattern")
});

static FK_COLUMNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)foreign\s+key\s*\(([^)]*)\)").expect("valid foreign key pattern")
});

// ================================================================
// Types
// ================================================================

/// Normalize a DBMS type name to its canonical spelling.
///
/// ```rust
/// use delta_migrate::canonical::normalize_type;
///
/// assert_eq!(normalize_type("CHARACTER VARYING(255)"), "varchar(255)");
/// assert_eq!(normalize_type("int4"), "integer");
/// assert_eq!(normalize_type("timestamp(3) with time zone"), "timestamptz(3)");
/// assert_eq!(normalize_type("_int4"), "integer[]");
/// ```
pub fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return lower;
    }

    let (mut body, mut dimensions) = split_array_suffix(&lower);
    if dimensions == 0 {
        if let Some(element) = body.strip_prefix('_') {
            if !element.is_empty() && !element.contains(' ') {
                body = element;
                dimensions = 1;
            }
        }
    }

    let (base, modifier) = split_modifier(body);
    let mut normalized = canonical_base(&base);
    if let Some(modifier) = modifier {
        normalized.push('(');
        normalized.push_str(&modifier);
        normalized.push(')');
    }
    for _ in 0..dimensions {
        normalized.push_str("[]");
    }
    normalized
}

/// Strip trailing `[]` / `[n]` suffixes, returning the element type and the
/// number of dimensions.
fn split_array_suffix(s: &str) -> (&str, usize) {
    let mut body = s.trim_end();
    let mut dimensions = 0;
    while body.ends_with(']') {
        match body.rfind('[') {
            Some(open) if body[open + 1..body.len() - 1].chars().all(|c| c.is_ascii_digit()) => {
                body = body[..open].trim_end();
                dimensions += 1;
            }
            _ => break,
        }
    }
    if let Some(element) = body.strip_suffix(" array") {
        body = element.trim_end();
        dimensions += 1;
    }
    (body, dimensions)
}

/// Pull the first parenthesized modifier out of a type, wherever it sits
/// (`timestamp(3) with time zone` keeps the precision in the middle).
fn split_modifier(s: &str) -> (String, Option<String>) {
    let Some(open) = s.find('(') else {
        return (collapse_whitespace(s), None);
    };
    let Some(close) = s[open..].find(')').map(|i| open + i) else {
        return (collapse_whitespace(s), None);
    };
    let modifier: String = s[open + 1..close]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let base = format!("{} {}", &s[..open], &s[close + 1..]);
    (collapse_whitespace(&base), Some(modifier))
}

fn canonical_base(base: &str) -> String {
    for (alias, canonical) in ALIASES_LONGEST_FIRST.iter() {
        if base == *alias {
            return (*canonical).to_string();
        }
        if let Some(rest) = base.strip_prefix(alias) {
            if rest.starts_with(' ') {
                return format!("{}{}", canonical, rest);
            }
        }
    }
    base.to_string()
}

// ================================================================
// Defaults
// ================================================================

/// Normalize a default-value expression.
///
/// Casts, wrapping parentheses, and single quotes around literals are
/// removed; equivalent function calls and empty literals collapse to one
/// spelling. Anything unrecognized is returned trimmed but otherwise as is.
///
/// ```rust
/// use delta_migrate::canonical::normalize_default;
///
/// assert_eq!(normalize_default("'active'::character varying"), "active");
/// assert_eq!(normalize_default("CURRENT_TIMESTAMP"), "now()");
/// assert_eq!(normalize_default("'{}'::text[]"), "{}");
/// assert_eq!(normalize_default("'00:00:00'::interval"), "interval '0'");
/// ```
pub fn normalize_default(raw: &str) -> String {
    let mut expr = raw.trim().to_string();
    if expr.is_empty() {
        return expr;
    }

    let mut cast: Option<String> = None;
    loop {
        let before = expr.clone();
        expr = strip_wrapping_parens(&expr).to_string();
        if let Some((inner, ty)) = split_trailing_cast(&expr) {
            if cast.is_none() {
                cast = Some(normalize_type(ty));
            }
            expr = inner.trim().to_string();
        }
        if expr == before {
            break;
        }
    }

    let mut interval = cast.as_deref().is_some_and(|t| t.starts_with("interval"));
    if let Some(rest) = strip_keyword(&expr, "interval") {
        if rest.starts_with('\'') {
            interval = true;
            expr = rest.to_string();
        }
    }

    let compact: String = expr
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if let Some((_, canonical)) = EQUIVALENT_CALLS.iter().find(|(call, _)| *call == compact) {
        return (*canonical).to_string();
    }

    let literal = unquote(&expr);
    let value = literal.as_deref().unwrap_or(&expr).trim();
    let lower_value = value.to_ascii_lowercase();

    if interval {
        if is_zero_interval(&lower_value) {
            return "interval '0'".to_string();
        }
        return format!("interval '{}'", collapse_whitespace(&lower_value));
    }

    match cast.as_deref() {
        Some("boolean") => match lower_value.as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => return "true".to_string(),
            "f" | "false" | "n" | "no" | "off" | "0" => return "false".to_string(),
            _ => {}
        },
        Some(ty) if ty.starts_with("timestamp") || ty == "date" => {
            if lower_value == "now" {
                return "now()".to_string();
            }
        }
        _ => {}
    }

    let compact_value: String = lower_value.chars().filter(|c| !c.is_whitespace()).collect();
    match compact_value.as_str() {
        "{}" | "[]" if literal.is_some() => return compact_value,
        "true" | "false" | "null" if literal.is_none() => return compact_value,
        _ => {}
    }

    value.to_string()
}

fn is_zero_interval(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return false;
    }
    let stripped = compact.trim_start_matches('@');
    let units = [
        "seconds", "second", "secs", "sec", "minutes", "mins", "min", "hours", "hour", "days",
        "day", "months", "mons", "years", "year", "s",
    ];
    let mut digits = stripped;
    for unit in units {
        if let Some(rest) = stripped.strip_suffix(unit) {
            digits = rest;
            break;
        }
    }
    !digits.is_empty() && digits.chars().all(|c| matches!(c, '0' | ':' | '.'))
}

/// Remove parentheses that wrap the whole expression.
fn strip_wrapping_parens(s: &str) -> &str {
    let mut current = s.trim();
    while current.starts_with('(') && current.ends_with(')') && closes_at_end(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

/// Whether the opening parenthesis at index 0 is closed by the final byte.
fn closes_at_end(s: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let last = s.len() - 1;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == last;
                }
            }
            _ => {}
        }
    }
    false
}

/// Split `expr::type` at the last top-level cast.
fn split_trailing_cast(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut found = None;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth = depth.saturating_sub(1),
            b':' if !in_quote && depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                found = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    let pos = found?;
    let ty = s[pos + 2..].trim();
    if pos == 0 || !CAST_TYPE.is_match(ty) {
        return None;
    }
    Some((&s[..pos], ty))
}

/// Strip a leading keyword followed by whitespace, case-insensitively.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Unwrap a single-quoted literal, undoing `''` escapes.
fn unquote(s: &str) -> Option<String> {
    if s.len() < 2 || !s.starts_with('\'') || !s.ends_with('\'') {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    if inner.replace("''", "").contains('\'') {
        return None;
    }
    Some(inner.replace("''", "'"))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ================================================================
// Expressions & identifiers
// ================================================================

/// Normalize a free-form SQL expression (index predicate, CHECK body).
///
/// Keywords and identifiers are lower-cased outside string literals,
/// whitespace is collapsed, and wrapping parentheses are removed.
pub fn normalize_expression(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_quote = false;
    let mut pending_space = false;
    for c in raw.trim().chars() {
        if in_quote {
            out.push(c);
            if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() && !out.ends_with('(') && c != ')' && c != ',' {
            out.push(' ');
        }
        pending_space = false;
        if c == '\'' {
            in_quote = true;
        }
        out.push(c.to_ascii_lowercase());
    }
    strip_wrapping_parens(&out).to_string()
}

/// Normalize an identifier: quoted names keep their case, bare names fold to
/// lower case.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_ascii_lowercase()
    }
}

fn normalize_identifier_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_identifier)
        .filter(|s| !s.is_empty())
        .collect()
}

// ================================================================
// Signatures
// ================================================================

/// Fixed-size fingerprint of an index or constraint definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Signature(String);

impl Signature {
    fn of(parts: &[String]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated digest for log output.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sorted_columns<S: AsRef<str>>(columns: &[S]) -> String {
    let mut columns: Vec<String> = columns
        .iter()
        .map(|c| normalize_identifier(c.as_ref()))
        .collect();
    columns.sort();
    columns.join(",")
}

/// Signature of an index on `table`.
///
/// Column order is ignored: the signature only decides whether two indexes
/// are the same object under different names.
pub fn index_signature(table: &str, index: &Index) -> Signature {
    let predicate = index
        .predicate
        .as_deref()
        .map(normalize_expression)
        .unwrap_or_default();
    Signature::of(&[
        normalize_identifier(table),
        sorted_columns(&index.columns),
        index.unique.to_string(),
        index.primary.to_string(),
        index_method(index),
        predicate,
    ])
}

/// Lower-cased access method; an empty method means the default.
pub fn index_method(index: &Index) -> String {
    let method = index.method.trim();
    if method.is_empty() {
        DEFAULT_INDEX_METHOD.to_string()
    } else {
        method.to_ascii_lowercase()
    }
}

/// Signature of a table constraint.
///
/// PRIMARY KEY and UNIQUE constraints are identified by kind and column set;
/// FOREIGN KEY adds the normalized target and actions; CHECK adds the
/// normalized expression.
pub fn constraint_signature(constraint: &Constraint) -> Signature {
    let mut parts = vec![constraint.kind.as_sql().to_string()];
    match constraint.kind {
        ConstraintKind::PrimaryKey | ConstraintKind::Unique => {
            parts.push(sorted_columns(&constraint.columns));
        }
        ConstraintKind::Check => {
            parts.push(sorted_columns(&constraint.columns));
            parts.push(normalize_check(&constraint.definition));
        }
        ConstraintKind::ForeignKey => {
            let columns = if constraint.columns.is_empty() {
                FK_COLUMNS
                    .captures(&constraint.definition)
                    .and_then(|c| c.get(1))
                    .map(|m| sorted_columns(&normalize_identifier_list(m.as_str())))
                    .unwrap_or_default()
            } else {
                sorted_columns(&constraint.columns)
            };
            parts.push(columns);
            parts.extend(foreign_key_parts(&constraint.definition));
        }
    }
    Signature::of(&parts)
}

/// Normalized CHECK body, without the `CHECK` keyword.
pub fn normalize_check(definition: &str) -> String {
    normalize_expression(check_body(definition))
}

/// CHECK body as written, without the `CHECK` keyword and outer parentheses.
pub fn check_body(definition: &str) -> &str {
    let trimmed = definition.trim().trim_end_matches(';').trim_end();
    let body = match trimmed.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("check") => {
            let rest = &trimmed[5..];
            if rest.starts_with(char::is_whitespace) || rest.trim_start().starts_with('(') {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    };
    strip_wrapping_parens(body)
}

fn foreign_key_parts(definition: &str) -> Vec<String> {
    let Some(caps) = FK_REFERENCES.captures(definition) else {
        return vec![normalize_expression(definition)];
    };
    let table = caps
        .get(1)
        .map(|m| normalize_identifier(m.as_str()))
        .unwrap_or_default();
    let columns = caps
        .get(2)
        .map(|m| normalize_identifier_list(m.as_str()).join(","))
        .unwrap_or_default();
    let action = |re: &Regex| {
        re.captures(definition)
            .and_then(|c| c.get(1))
            .and_then(|m| ReferentialAction::parse(m.as_str()))
            .unwrap_or_default()
            .as_sql()
            .to_string()
    };
    vec![
        format!("{}({})", table, columns),
        action(&FK_ON_DELETE),
        action(&FK_ON_UPDATE),
    ]
}
