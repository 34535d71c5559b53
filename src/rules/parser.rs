//! # Rule configuration parsing.
//!
//! Turns the host-supplied configuration string into `(prefix, quota)` pairs:
//!
//! ```text
//! config := entry (',' entry)*
//! entry  := [ path ':' ] ruleExpr
//! ```
//!
//! Whitespace around commas and around the `path:` boundary is trimmed.
//! An entry without a path keys the empty prefix, which literally prefixes
//! every request path — it becomes the fallback rule for traffic matching
//! nothing longer. Duplicate paths are not an error: the last occurrence
//! wins, so later entries can override earlier ones.

use std::sync::Arc;

use crate::error::ConfigError;
use crate::rules::quota::Quota;

/// Splits a configuration string into unique `(prefix, quota)` pairs.
///
/// Pairs keep first-occurrence order; a duplicate path overwrites the quota
/// in place. Ordering for prefix matching is the table's concern.
pub(crate) fn parse_entries(source: &str) -> Result<Vec<(Arc<str>, Quota)>, ConfigError> {
    let mut entries: Vec<(Arc<str>, Quota)> = Vec::new();

    for raw in source.split(',') {
        let entry = raw.trim();
        if entry.is_empty() {
            return Err(ConfigError::EmptyEntry);
        }

        let (path, expr) = match entry.split_once(':') {
            Some((path, expr)) => (path.trim(), expr.trim()),
            None => ("", entry),
        };
        let quota = Quota::parse_expr(expr, entry)?;

        match entries.iter_mut().find(|(p, _)| p.as_ref() == path) {
            Some(existing) => existing.1 = quota,
            None => entries.push((Arc::from(path), quota)),
        }
    }

    Ok(entries)
}
