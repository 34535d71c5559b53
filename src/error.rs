//! Error types used by the gate at configuration and startup time.
//!
//! This module defines two error enums:
//!
//! - [`ConfigError`] — the rule string does not match the grammar.
//! - [`GateError`] — the gate cannot be built or a suspended continuation
//!   cannot complete.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Per-request admission decisions never produce errors: "suspend" is a normal
//! outcome, and a bad completion signal from the host is reported as a
//! [`CompletionViolation`](crate::EventKind::CompletionViolation) event rather
//! than raised.

use thiserror::Error;

/// # Errors produced while parsing a rule configuration string.
///
/// The grammar is `entry := [path ':'] 'min=' INT (';' 'max=' INT ['%'])?`,
/// with entries separated by commas. Any violation is fatal at startup:
/// the host must refuse to start rather than run with a partial rule table.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// An entry has no `min=` segment, or it is not the first segment.
    #[error("rule entry {entry:?} is missing a leading min= segment")]
    MissingMin {
        /// The offending entry text (trimmed).
        entry: String,
    },

    /// The `min=` value is not a non-negative integer.
    #[error("invalid min value {value:?} in rule entry {entry:?}")]
    InvalidMin {
        /// The offending entry text (trimmed).
        entry: String,
        /// The text that failed to parse as an integer.
        value: String,
    },

    /// The `max=` value is not a non-negative integer (with optional `%`).
    #[error("invalid max value {value:?} in rule entry {entry:?}")]
    InvalidMax {
        /// The offending entry text (trimmed).
        entry: String,
        /// The text that failed to parse as an integer.
        value: String,
    },

    /// A percentage ceiling is outside `[0, 100]`.
    #[error("max percent {value} out of range [0, 100] in rule entry {entry:?}")]
    PercentOutOfRange {
        /// The offending entry text (trimmed).
        entry: String,
        /// The parsed percentage.
        value: u32,
    },

    /// An entry contains a segment the grammar does not allow (for example a
    /// second `max=`, or trailing text after the ceiling).
    #[error("unexpected segment {segment:?} in rule entry {entry:?}")]
    UnexpectedSegment {
        /// The offending entry text (trimmed).
        entry: String,
        /// The segment that did not match the grammar.
        segment: String,
    },

    /// An entry is empty after trimming (e.g. `"a, ,b"` or an empty string).
    #[error("empty rule entry in configuration")]
    EmptyEntry,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolgate::ConfigError;
    ///
    /// let err = ConfigError::MissingMin { entry: "max=7".into() };
    /// assert_eq!(err.as_label(), "config_missing_min");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingMin { .. } => "config_missing_min",
            ConfigError::InvalidMin { .. } => "config_invalid_min",
            ConfigError::InvalidMax { .. } => "config_invalid_max",
            ConfigError::PercentOutOfRange { .. } => "config_percent_out_of_range",
            ConfigError::UnexpectedSegment { .. } => "config_unexpected_segment",
            ConfigError::EmptyEntry => "config_empty_entry",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced when building or closing a gate.
///
/// `UnsatisfiableReservation` and `InvalidCapacity` are startup failures:
/// they are returned by [`GateBuilder::build`](crate::GateBuilder::build) and
/// the host should treat them as refuse-to-start. `Closed` is the only error
/// a suspended continuation can resolve to.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    /// The summed minimum reservations exceed total pool capacity.
    ///
    /// A gate started in this state would promise floors it can never honor
    /// simultaneously, so initialization fails instead.
    #[error("sum of minimum reservations ({promised}) exceeds pool capacity ({capacity})")]
    UnsatisfiableReservation {
        /// Sum of `min` over all configured rules.
        promised: usize,
        /// Total pool capacity the gate was given.
        capacity: usize,
    },

    /// The configured pool capacity is zero.
    ///
    /// A zero-capacity gate would park every arrival forever; failing loudly
    /// at startup beats a silent hang.
    #[error("pool capacity must be positive")]
    InvalidCapacity,

    /// The gate was closed while the unit of work was suspended.
    ///
    /// Returned by awaiting a [`Pending`](crate::Pending) whose queue entry
    /// was drained by [`Gate::close`](crate::Gate::close).
    #[error("gate closed while suspended")]
    Closed,
}

impl GateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolgate::GateError;
    ///
    /// let err = GateError::UnsatisfiableReservation { promised: 20, capacity: 18 };
    /// assert_eq!(err.as_label(), "gate_unsatisfiable_reservation");
    /// assert!(err.is_startup());
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            GateError::UnsatisfiableReservation { .. } => "gate_unsatisfiable_reservation",
            GateError::InvalidCapacity => "gate_invalid_capacity",
            GateError::Closed => "gate_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Indicates whether this error is a startup failure (refuse-to-start)
    /// as opposed to a runtime outcome.
    ///
    /// # Example
    /// ```
    /// use poolgate::GateError;
    ///
    /// assert!(GateError::InvalidCapacity.is_startup());
    /// assert!(!GateError::Closed.is_startup());
    /// ```
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            GateError::UnsatisfiableReservation { .. } | GateError::InvalidCapacity
        )
    }
}
