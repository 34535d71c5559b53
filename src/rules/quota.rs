//! # Per-path admission quota.
//!
//! A [`Quota`] is the policy attached to one path prefix:
//! - `min` — guaranteed concurrent slots the path may always claim;
//! - `max` / `max_percent` — optional ceiling, absolute or as a percentage
//!   of total pool capacity.
//!
//! At most one ceiling form is set; the grammar cannot produce both. A quota
//! with neither is uncapped above its floor.
//!
//! ## Grammar
//! ```text
//! ruleExpr := 'min=' INT (';' maxExpr)?
//! maxExpr  := 'max=' INT ['%']
//! ```
//!
//! ## Example
//! ```
//! use poolgate::Quota;
//!
//! let q = Quota::parse("min=5;max=40%")?;
//! assert_eq!(q.min, 5);
//! assert_eq!(q.max, None);
//! assert_eq!(q.max_percent, Some(40));
//! assert_eq!(q.effective_max(20), Some(8));
//! # Ok::<(), poolgate::ConfigError>(())
//! ```

use crate::error::ConfigError;

/// Admission policy for one path prefix.
///
/// Immutable once parsed. Unmatched traffic behaves as [`Quota::uncapped`]:
/// no floor, no ceiling, still counted against the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Guaranteed minimum of concurrent slots (the reservation floor).
    pub min: usize,
    /// Absolute ceiling on concurrent slots, if configured.
    pub max: Option<usize>,
    /// Percentage-of-capacity ceiling in `[0, 100]`, if configured.
    pub max_percent: Option<u8>,
}

impl Quota {
    /// Quota applied to traffic with no configured rule: no floor, no ceiling.
    pub const fn uncapped() -> Self {
        Self {
            min: 0,
            max: None,
            max_percent: None,
        }
    }

    /// Parses a single rule expression (`min=INT[;max=INT[%]]`).
    ///
    /// Whitespace around segments is trimmed. Fails when `min` is missing or
    /// not leading, an integer does not parse, a percentage is outside
    /// `[0, 100]`, or extra segments follow the ceiling.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let entry = source.trim();
        if entry.is_empty() {
            return Err(ConfigError::EmptyEntry);
        }
        Self::parse_expr(entry, entry)
    }

    /// Parses a rule expression with `entry` as the error context: the
    /// config parser passes the full entry text so errors name the entry
    /// including its path part.
    pub(crate) fn parse_expr(expr: &str, entry: &str) -> Result<Self, ConfigError> {
        let mut segments = expr.split(';').map(str::trim);

        let first = segments.next().unwrap_or("");
        let min_text = first
            .strip_prefix("min=")
            .ok_or_else(|| ConfigError::MissingMin {
                entry: entry.to_string(),
            })?;
        let min: usize = min_text.parse().map_err(|_| ConfigError::InvalidMin {
            entry: entry.to_string(),
            value: min_text.to_string(),
        })?;

        let mut max = None;
        let mut max_percent = None;
        if let Some(second) = segments.next() {
            let max_text =
                second
                    .strip_prefix("max=")
                    .ok_or_else(|| ConfigError::UnexpectedSegment {
                        entry: entry.to_string(),
                        segment: second.to_string(),
                    })?;
            if let Some(pct_text) = max_text.strip_suffix('%') {
                let pct: u32 = pct_text.parse().map_err(|_| ConfigError::InvalidMax {
                    entry: entry.to_string(),
                    value: max_text.to_string(),
                })?;
                if pct > 100 {
                    return Err(ConfigError::PercentOutOfRange {
                        entry: entry.to_string(),
                        value: pct,
                    });
                }
                max_percent = Some(pct as u8);
            } else {
                max = Some(max_text.parse().map_err(|_| ConfigError::InvalidMax {
                    entry: entry.to_string(),
                    value: max_text.to_string(),
                })?);
            }
        }

        if let Some(extra) = segments.next() {
            return Err(ConfigError::UnexpectedSegment {
                entry: entry.to_string(),
                segment: extra.to_string(),
            });
        }

        Ok(Self {
            min,
            max,
            max_percent,
        })
    }

    /// Resolves the ceiling against a fixed pool capacity.
    ///
    /// - `max` set → that value;
    /// - `max_percent` set → `round(max_percent / 100 × capacity)`;
    /// - neither → `None` (unbounded).
    pub fn effective_max(&self, capacity: usize) -> Option<usize> {
        if self.max.is_some() {
            return self.max;
        }
        self.max_percent
            .map(|pct| ((f64::from(pct) / 100.0) * capacity as f64).round() as usize)
    }

    /// `true` when either ceiling form is configured.
    pub fn is_capped(&self) -> bool {
        self.max.is_some() || self.max_percent.is_some()
    }
}
