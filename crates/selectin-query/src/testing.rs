//! Helpers for asserting on rendered SQL text in tests.
//!
//! Statement text is awkward to compare whole: column order is an
//! implementation detail and bound parameters hide the interesting values.
//! These helpers pull a rendered [`Statement`] apart so tests can assert on
//! the pieces that matter.

use crate::select::Statement;
use regex::Regex;
use selectin_core::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn selected_columns_rex() -> &'static Regex {
    static REX: OnceLock<Regex> = OnceLock::new();
    REX.get_or_init(|| Regex::new(r"^SELECT (.*?)\s+FROM").expect("valid regex"))
}

fn column_name_rex() -> &'static Regex {
    static REX: OnceLock<Regex> = OnceLock::new();
    REX.get_or_init(|| Regex::new(r#"(\S+?)(?: AS \w+)?(?:,|$)"#).expect("valid regex"))
}

fn placeholder_rex() -> &'static Regex {
    static REX: OnceLock<Regex> = OnceLock::new();
    REX.get_or_init(|| Regex::new(r"[$?](\d+)").expect("valid regex"))
}

/// Extract the set of column names from a statement's SELECT clause.
///
/// Example: `SELECT a, "u"."b", c AS c_1 FROM ...` yields
/// `{a, "u"."b", c}` (quotes preserved, `AS` aliases stripped).
#[must_use]
pub fn selected_columns(sql: &str) -> BTreeSet<String> {
    let Some(m) = selected_columns_rex().captures(sql) else {
        return BTreeSet::new();
    };
    let clause = m.get(1).map_or("", |g| g.as_str());
    column_name_rex()
        .captures_iter(clause)
        .filter_map(|c| c.get(1))
        .map(|g| g.as_str().to_string())
        .collect()
}

/// Inline bound parameters into a statement's SQL for readable assertions.
///
/// This intentionally does not escape values; the output is for test
/// expectations, never for execution. Works on numbered placeholders
/// (`$1`, `?1`), which is what [`Dialect::Postgres`] and
/// [`Dialect::Sqlite`] render.
///
/// [`Dialect::Postgres`]: crate::expr::Dialect::Postgres
/// [`Dialect::Sqlite`]: crate::expr::Dialect::Sqlite
#[must_use]
pub fn inline_params(stmt: &Statement) -> String {
    placeholder_rex()
        .replace_all(&stmt.sql, |caps: &regex::Captures<'_>| {
            let index: usize = caps[1].parse().unwrap_or(0);
            match index.checked_sub(1).and_then(|i| stmt.params.get(i)) {
                Some(value) => literal(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Render a value as an unescaped SQL-ish literal.
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(s) => format!("'{s}'"),
        Value::Bytes(b) => format!(
            "X'{}'",
            b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()
        ),
        Value::Uuid(b) => format!(
            "'{}'",
            b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()
        ),
        Value::Date(v) => v.to_string(),
        Value::Timestamp(v) => v.to_string(),
    }
}
