//! # Rule table: longest-prefix lookup and startup validation.
//!
//! [`RuleTable`] holds the parsed `(prefix, quota)` pairs sorted longest
//! prefix first, so resolution is "first literal prefix match wins" — the
//! more specific rule dominates when several prefixes match. The table is
//! built once at startup and never mutated (hot-swap is out of scope).
//!
//! ## Rules
//! - A request path matches a prefix by `str::starts_with` (no globbing).
//! - The empty prefix (from a pathless entry) matches everything and acts
//!   as the fallback rule.
//! - A path matching nothing is "unmatched": no floor, no ceiling, still
//!   counted against pool capacity.
//!
//! ## Example
//! ```
//! use poolgate::RuleTable;
//!
//! let table = RuleTable::parse("/app1:min=5;max=10%, /app1/admin:min=1")?;
//! let (prefix, quota) = table.lookup("/app1/admin/users").unwrap();
//! assert_eq!(prefix, "/app1/admin"); // longer prefix wins
//! assert_eq!(quota.min, 1);
//! assert!(table.lookup("/other").is_none());
//! # Ok::<(), poolgate::ConfigError>(())
//! ```

use std::sync::Arc;

use crate::error::{ConfigError, GateError};
use crate::rules::parser::parse_entries;
use crate::rules::quota::Quota;

/// Immutable mapping from path prefix to [`Quota`].
///
/// Internally a vector sorted by descending prefix length (ties broken
/// lexicographically), which keeps resolution deterministic and makes two
/// parses of equivalent configurations compare equal regardless of entry
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    entries: Vec<(Arc<str>, Quota)>,
}

impl RuleTable {
    /// Parses a full configuration string into a table.
    ///
    /// See the module docs of [`crate::ConfigError`] for the grammar; the
    /// same input always yields an identical table.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_entries(parse_entries(source)?))
    }

    fn from_entries(mut entries: Vec<(Arc<str>, Quota)>) -> Self {
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Number of configured rules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the matched `(prefix, quota)` for a request path, or `None`
    /// when the path is unmatched.
    pub fn lookup(&self, path: &str) -> Option<(&str, &Quota)> {
        self.entries
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_ref()))
            .map(|(prefix, quota)| (prefix.as_ref(), quota))
    }

    /// Iterates configured rules, longest prefix first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quota)> {
        self.entries.iter().map(|(prefix, q)| (prefix.as_ref(), q))
    }

    /// Sum of minimum reservations across all rules.
    pub fn sum_min(&self) -> usize {
        self.entries.iter().map(|(_, q)| q.min).sum()
    }

    /// Checks that the summed minimum reservations fit the pool.
    ///
    /// A table promising more floor slots than the pool has threads can never
    /// honor all reservations at once; the gate refuses to start.
    ///
    /// # Example
    /// ```
    /// use poolgate::RuleTable;
    ///
    /// let table = RuleTable::parse("/app1:min=10, /app2:min=10")?;
    /// assert!(table.validate(18).is_err());
    /// assert!(table.validate(20).is_ok());
    /// # Ok::<(), poolgate::ConfigError>(())
    /// ```
    pub fn validate(&self, capacity: usize) -> Result<(), GateError> {
        let promised = self.sum_min();
        if promised > capacity {
            return Err(GateError::UnsatisfiableReservation { promised, capacity });
        }
        Ok(())
    }

    /// Ledger bucket for a request path: the index of the longest matching
    /// prefix, or `len()` for unmatched traffic (the shared overflow bucket).
    pub(crate) fn resolve(&self, path: &str) -> usize {
        self.entries
            .iter()
            .position(|(prefix, _)| path.starts_with(prefix.as_ref()))
            .unwrap_or(self.entries.len())
    }

    /// Quota governing a bucket; unmatched traffic is uncapped.
    pub(crate) fn quota(&self, bucket: usize) -> Quota {
        match self.entries.get(bucket) {
            Some((_, quota)) => *quota,
            None => Quota::uncapped(),
        }
    }

    /// Shared prefix string for a bucket (`None` for the unmatched bucket).
    pub(crate) fn prefix(&self, bucket: usize) -> Option<Arc<str>> {
        self.entries.get(bucket).map(|(prefix, _)| Arc::clone(prefix))
    }
}
