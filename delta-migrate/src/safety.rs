//! Safety classification of column type changes.

use crate::canonical::normalize_type;

/// Integer types ordered by width.
const INTEGER_WIDTHS: &[&str] = &["smallint", "integer", "bigint"];

/// Type families whose bare name has no length limit once the modifier is
/// dropped.
const UNBOUNDED_WHEN_BARE: &[&str] = &["varchar", "numeric", "varbit"];

/// Whether changing a column from `from` to `to` can fail or lose data.
///
/// Only a fixed list of widenings is considered safe; every other change of
/// the normalized type is unsafe.
///
/// ```rust
/// use delta_migrate::safety::is_unsafe_type_change;
///
/// assert!(!is_unsafe_type_change("int4", "bigint"));
/// assert!(!is_unsafe_type_change("varchar(50)", "text"));
/// assert!(is_unsafe_type_change("text", "varchar(50)"));
/// ```
pub fn is_unsafe_type_change(from: &str, to: &str) -> bool {
    let from = normalize_type(from);
    let to = normalize_type(to);
    if from == to {
        return false;
    }
    !is_safe_widening(&from, &to)
}

fn is_safe_widening(from: &str, to: &str) -> bool {
    let (from_base, from_mod) = split(from);
    let (to_base, to_mod) = split(to);

    if let (Some(a), Some(b)) = (width_rank(from_base), width_rank(to_base)) {
        return from_mod.is_none() && to_mod.is_none() && a < b;
    }

    match (from_base, to_base) {
        ("real", "double precision") => from_mod.is_none() && to_mod.is_none(),
        ("timestamp", "timestamptz") | ("time", "timetz") => from_mod == to_mod || to_mod.is_none(),
        ("varchar" | "char" | "text", "text") => to_mod.is_none(),
        ("varchar" | "char", "varchar") | ("char", "char") | ("varbit", "varbit") | ("bit", "varbit") => {
            match (length(from_mod), to_mod) {
                (_, None) if UNBOUNDED_WHEN_BARE.contains(&to_base) => true,
                (Some(a), Some(_)) => length(to_mod).is_some_and(|b| b >= a),
                _ => false,
            }
        }
        ("numeric", "numeric") => numeric_widens(from_mod, to_mod),
        ("integer" | "smallint" | "bigint", "numeric") => to_mod.is_none(),
        _ => false,
    }
}

fn width_rank(base: &str) -> Option<usize> {
    INTEGER_WIDTHS.iter().position(|t| *t == base)
}

/// Split a normalized type into base name and modifier text.
fn split(ty: &str) -> (&str, Option<&str>) {
    if ty.ends_with("[]") {
        return (ty, None);
    }
    match ty.find('(') {
        Some(open) if ty.ends_with(')') => (&ty[..open], Some(&ty[open + 1..ty.len() - 1])),
        _ => (ty, None),
    }
}

fn length(modifier: Option<&str>) -> Option<u32> {
    modifier?.parse().ok()
}

/// `numeric(p,s)` widens when neither the scale nor the integer digits
/// shrink; dropping the modifier altogether always widens.
fn numeric_widens(from: Option<&str>, to: Option<&str>) -> bool {
    let Some(to) = to else {
        return true;
    };
    let Some(from) = from else {
        return false;
    };
    match (precision_scale(from), precision_scale(to)) {
        (Some((p1, s1)), Some((p2, s2))) => s2 >= s1 && p2 - s2 >= p1 - s1,
        _ => false,
    }
}

fn precision_scale(modifier: &str) -> Option<(i64, i64)> {
    let mut parts = modifier.split(',');
    let precision = parts.next()?.trim().parse().ok()?;
    let scale = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((precision, scale))
}
