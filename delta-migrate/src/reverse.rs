//! Best-effort reversal of DDL text.
//!
//! Used when only SQL is available, e.g. a hand-written migration file with no
//! structured "before" schema. Statements that cannot be inverted from their
//! own text become a marked comment instead of an error, so reversal never
//! halts a pipeline.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

use crate::canonical::normalize_identifier;

/// Optionally schema-qualified, optionally quoted identifier.
const IDENT: &str = r#"(?:"(?:[^"]|"")+"|[\w$]+)(?:\.(?:"(?:[^"]|"")+"|[\w$]+))?"#;

fn pattern(source: &str) -> Regex {
    Regex::new(&format!("(?is)^{}", source.replace("IDENT", IDENT))).expect("valid reverser pattern")
}

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"create\s+(?:(?:global|local)\s+)?(?:temp(?:orary)?\s+|unlogged\s+)?table\s+(?:if\s+not\s+exists\s+)?(IDENT)")
});
static CREATE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"create\s+(?:unique\s+)?index\s+(?:concurrently\s+)?(?:if\s+not\s+exists\s+)?(IDENT)\s+on\s")
});
static CREATE_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"create\s+(?:temp(?:orary)?\s+|unlogged\s+)?sequence\s+(?:if\s+not\s+exists\s+)?(IDENT)")
});
static CREATE_TYPE: LazyLock<Regex> = LazyLock::new(|| pattern(r"create\s+type\s+(IDENT)"));
static CREATE_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"create\s+(?:or\s+replace\s+)?function\s+(IDENT)\s*\(([^)]*)\)")
});
static CREATE_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"create\s+(?:or\s+replace\s+)?(?:constraint\s+)?trigger\s+(IDENT)\s.*?\son\s+(IDENT)")
});
static ALTER_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"alter\s+table\s+(?:if\s+exists\s+)?(?:only\s+)?(IDENT)\s+(.+)$")
});
static ALTER_RENAME: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"alter\s+(index|sequence|type)\s+(?:if\s+exists\s+)?(IDENT)\s+rename\s+to\s+(IDENT)\s*$")
});
static DROP: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"drop\s+(table|index|sequence|type|function|trigger)\s+(?:concurrently\s+)?(?:if\s+exists\s+)?(IDENT)(?:\s+on\s+(IDENT))?")
});

static ADD_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"add\s+column\s+(?:if\s+not\s+exists\s+)?(IDENT)"));
static ADD_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| pattern(r"add\s+constraint\s+(IDENT)"));
static RENAME_TO: LazyLock<Regex> = LazyLock::new(|| pattern(r"rename\s+to\s+(IDENT)\s*$"));
static RENAME_INNER: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"rename\s+(column\s+|constraint\s+)?(IDENT)\s+to\s+(IDENT)\s*$")
});
static DROP_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"drop\s+(?:column\s+)?(?:if\s+exists\s+)?(IDENT)"));
static DROP_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"drop\s+constraint\s+(?:if\s+exists\s+)?(IDENT)"));
static ALTER_COLUMN: LazyLock<Regex> = LazyLock::new(|| pattern(r"alter\s+(?:column\s+)?IDENT\s"));

/// Kind of object a statement creates or drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Object {
    Table,
    Index,
    Sequence,
    Type,
    Function,
    Trigger,
    Column,
    Constraint,
}

impl Object {
    fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "table" => Some(Self::Table),
            "index" => Some(Self::Index),
            "sequence" => Some(Self::Sequence),
            "type" => Some(Self::Type),
            "function" => Some(Self::Function),
            "trigger" => Some(Self::Trigger),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::Index => "INDEX",
            Self::Sequence => "SEQUENCE",
            Self::Type => "TYPE",
            Self::Function => "FUNCTION",
            Self::Trigger => "TRIGGER",
            Self::Column => "COLUMN",
            Self::Constraint => "CONSTRAINT",
        }
    }
}

/// Identity of a defined object: kind plus canonical (table-scoped) name.
type Key = (Object, String);

enum Reversal {
    /// Inverse statement.
    Sql(String),
    /// Inverse statement; the forward statement also defines `Key`.
    Defines(String, Key),
    /// No inverse can be derived.
    Irreversible(String),
}

/// Inverts DDL text statement by statement.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementReverser;

impl StatementReverser {
    /// Create a reverser.
    pub fn new() -> Self {
        Self
    }

    /// Reverse a batch of statements.
    ///
    /// The result undoes the input when run after it: each statement is
    /// inverted and the inverses are emitted in reverse order. A DROP of an
    /// object created earlier in the same text reverses to that CREATE.
    pub fn reverse(&self, sql: &str) -> String {
        let mut defined: HashMap<Key, &str> = HashMap::new();
        let mut reversed = Vec::new();
        let mut irreversible = 0usize;

        for statement in split_statements(sql) {
            let body = strip_leading_comments(statement);
            if body.is_empty() {
                continue;
            }
            match reverse_statement(body, &defined) {
                Reversal::Sql(sql) => reversed.push(sql),
                Reversal::Defines(sql, key) => {
                    defined.insert(key, body);
                    reversed.push(sql);
                }
                Reversal::Irreversible(reason) => {
                    irreversible += 1;
                    reversed.push(cannot_reverse(body, &reason));
                }
            }
        }

        reversed.reverse();
        tracing::debug!(
            statements = reversed.len(),
            irreversible,
            "reversed sql statements"
        );
        reversed.join("\n\n")
    }
}

fn reverse_statement(body: &str, defined: &HashMap<Key, &str>) -> Reversal {
    if let Some(caps) = CREATE_TABLE.captures(body) {
        return create(Object::Table, &caps[1], format!("DROP TABLE IF EXISTS {} CASCADE;", &caps[1]));
    }
    if let Some(caps) = CREATE_INDEX.captures(body) {
        return create(Object::Index, &caps[1], format!("DROP INDEX IF EXISTS {};", &caps[1]));
    }
    if let Some(caps) = CREATE_SEQUENCE.captures(body) {
        return create(Object::Sequence, &caps[1], format!("DROP SEQUENCE IF EXISTS {};", &caps[1]));
    }
    if let Some(caps) = CREATE_TYPE.captures(body) {
        return create(Object::Type, &caps[1], format!("DROP TYPE IF EXISTS {};", &caps[1]));
    }
    if let Some(caps) = CREATE_FUNCTION.captures(body) {
        let args = collapse(&caps[2]);
        return create(
            Object::Function,
            &caps[1],
            format!("DROP FUNCTION IF EXISTS {}({});", &caps[1], args),
        );
    }
    if let Some(caps) = CREATE_TRIGGER.captures(body) {
        let key = (Object::Trigger, scoped(&caps[2], &caps[1]));
        return Reversal::Defines(
            format!("DROP TRIGGER IF EXISTS {} ON {};", &caps[1], &caps[2]),
            key,
        );
    }
    if let Some(caps) = ALTER_RENAME.captures(body) {
        let kind = caps[1].to_ascii_uppercase();
        return Reversal::Sql(format!(
            "ALTER {} {} RENAME TO {};",
            kind,
            requalify(&caps[2], &caps[3]),
            unqualified(&caps[2])
        ));
    }
    if let Some(caps) = ALTER_TABLE.captures(body) {
        return reverse_alter_table(&caps[1], caps[2].trim(), defined);
    }
    if let Some(caps) = DROP.captures(body) {
        return reverse_drop(&caps, defined);
    }
    Reversal::Irreversible("unrecognized statement".to_string())
}

fn create(object: Object, name: &str, drop: String) -> Reversal {
    Reversal::Defines(drop, (object, object_key(name)))
}

fn reverse_alter_table(table: &str, action: &str, defined: &HashMap<Key, &str>) -> Reversal {
    if has_top_level_comma(action) {
        return Reversal::Irreversible("ALTER TABLE with several actions".to_string());
    }

    if let Some(caps) = ADD_COLUMN.captures(action) {
        return Reversal::Defines(
            format!("ALTER TABLE {} DROP COLUMN IF EXISTS {};", table, &caps[1]),
            (Object::Column, scoped(table, &caps[1])),
        );
    }
    if let Some(caps) = ADD_CONSTRAINT.captures(action) {
        return Reversal::Defines(
            format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};", table, &caps[1]),
            (Object::Constraint, scoped(table, &caps[1])),
        );
    }
    if let Some(caps) = RENAME_TO.captures(action) {
        return Reversal::Sql(format!(
            "ALTER TABLE {} RENAME TO {};",
            requalify(table, &caps[1]),
            unqualified(table)
        ));
    }
    if let Some(caps) = RENAME_INNER.captures(action) {
        let keyword = caps
            .get(1)
            .map(|m| format!("{} ", m.as_str().trim().to_ascii_uppercase()))
            .unwrap_or_else(|| "COLUMN ".to_string());
        return Reversal::Sql(format!(
            "ALTER TABLE {} RENAME {}{} TO {};",
            table, keyword, &caps[3], &caps[2]
        ));
    }
    if let Some(caps) = DROP_CONSTRAINT.captures(action) {
        return restore(Object::Constraint, scoped(table, &caps[1]), defined);
    }
    if let Some(caps) = DROP_COLUMN.captures(action) {
        return restore(Object::Column, scoped(table, &caps[1]), defined);
    }
    if ALTER_COLUMN.is_match(action) {
        return Reversal::Irreversible("ALTER COLUMN needs the previous column definition".to_string());
    }
    Reversal::Irreversible("unrecognized ALTER TABLE action".to_string())
}

fn reverse_drop(caps: &Captures<'_>, defined: &HashMap<Key, &str>) -> Reversal {
    let Some(object) = Object::parse(&caps[1]) else {
        return Reversal::Irreversible("unrecognized statement".to_string());
    };
    let key = match (object, caps.get(3)) {
        (Object::Trigger, Some(table)) => scoped(table.as_str(), &caps[2]),
        _ => object_key(&caps[2]),
    };
    restore(object, key, defined)
}

/// Reverse a DROP from an earlier definition in the same text.
fn restore(object: Object, name: String, defined: &HashMap<Key, &str>) -> Reversal {
    let key = (object, name);
    match defined.get(&key) {
        Some(definition) => Reversal::Sql(format!("{};", definition)),
        None => Reversal::Irreversible(format!(
            "DROP {} needs the previous {} definition",
            object.as_sql(),
            object.as_sql().to_ascii_lowercase()
        )),
    }
}

fn cannot_reverse(statement: &str, reason: &str) -> String {
    let mut out = format!("-- CANNOT AUTO-REVERSE: {}", reason);
    for line in format!("{};", statement).lines() {
        out.push_str("\n-- ");
        out.push_str(line);
    }
    out
}

/// Split SQL text on `;`, ignoring semicolons inside quotes, comments, and
/// dollar-quoted bodies. Empty statements are dropped.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_quoted(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
            }
            b'$' => match dollar_tag(&sql[i..]) {
                Some(tag) => {
                    let body = i + tag.len();
                    i = sql[body..]
                        .find(tag)
                        .map_or(bytes.len(), |n| body + n + tag.len());
                }
                None => i += 1,
            },
            b';' => {
                push_statement(&mut statements, &sql[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    push_statement(&mut statements, &sql[start..]);
    statements
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, statement: &'a str) {
    let statement = statement.trim();
    if !statement.is_empty() {
        statements.push(statement);
    }
}

fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            // Doubled quote is an escape
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// `$tag$` at the start of `rest`, if any. Positional parameters (`$1`) are
/// not tags.
fn dollar_tag(rest: &str) -> Option<&str> {
    let end = rest[1..].find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))? + 1;
    let starts_with_digit = rest.as_bytes().get(1).is_some_and(u8::is_ascii_digit);
    (rest.as_bytes()[end] == b'$' && !starts_with_digit).then(|| &rest[..=end])
}

fn strip_leading_comments(statement: &str) -> &str {
    let mut rest = statement.trim_start();
    loop {
        if rest.starts_with("--") {
            rest = rest.find('\n').map_or("", |n| &rest[n + 1..]).trim_start();
        } else if let Some(inner) = rest.strip_prefix("/*") {
            rest = inner.find("*/").map_or("", |n| &inner[n + 2..]).trim_start();
        } else {
            return rest.trim_end();
        }
    }
}

fn has_top_level_comma(action: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in action.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Split a possibly qualified name into (schema prefix with dot, last part).
fn split_qualified(name: &str) -> (&str, &str) {
    let mut in_quote = false;
    let mut split = None;
    for (i, c) in name.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '.' if !in_quote => split = Some(i),
            _ => {}
        }
    }
    match split {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    }
}

fn unqualified(name: &str) -> &str {
    split_qualified(name).1
}

/// Put `name` in the schema `qualified` lives in.
fn requalify(qualified: &str, name: &str) -> String {
    let (schema, _) = split_qualified(qualified);
    format!("{}{}", schema, unqualified(name))
}

fn object_key(name: &str) -> String {
    normalize_identifier(unqualified(name))
}

fn scoped(table: &str, name: &str) -> String {
    format!("{}.{}", object_key(table), object_key(name))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
