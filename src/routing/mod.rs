//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (forward or answer locally)
//!     → matcher.rs (evaluate include/exclude patterns)
//!
//! Rule Compilation (at startup):
//!     ForwardingConfig
//!     → Parse patterns (exact, prefix)
//!     → Freeze as immutable ForwardingRules
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always gets the same decision

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::ForwardingRules;
