//! Quota rules: parsing, prefix matching, startup validation.
//!
//! This module turns the host-supplied rule string into the immutable
//! [`RuleTable`] the gate consults on every arrival:
//!
//! ```text
//! "/app1:min=5;max=10%, /app2:min=2"
//!         │
//!         ▼ parser (entries, trimming, duplicate last-wins)
//! [ ("/app1", Quota{min:5, max_percent:10}),
//!   ("/app2", Quota{min:2}) ]
//!         │
//!         ▼ RuleTable (longest-prefix-first order)
//! resolve("/app1/soap") → Quota{min:5, max_percent:10}
//! resolve("/other")     → unmatched (uncapped)
//! ```
//!
//! Internal modules:
//! - [`quota`]: the per-path policy and single-expression parsing;
//! - [`parser`]: configuration-string splitting;
//! - [`table`]: longest-prefix lookup and the capacity validator.

mod parser;
mod quota;
mod table;

pub use quota::Quota;
pub use table::RuleTable;
