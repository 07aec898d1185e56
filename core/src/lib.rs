//! Geologic Core
//!
//! Exact logical core of an interactive geometry construction assistant:
//! equalities between references with congruence closure, modular angle
//! equations, log-ratio equations, and incidence deduction rules, each checked
//! against floating-point shadows before anything exact is changed.

pub mod algebra; // Exact rows, integer and rational bases, angle classes
pub mod config;
pub mod error;
pub mod ir; // Intermediate representation (refs, numeric shadows, facts)
pub mod logic; // Closure driver
pub mod rules; // Deduction rules
pub mod store; // Union-find with memoized relations

pub use algebra::{AngleTracker, IntBasis, RatBasis, Row};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use ir::*;
pub use logic::{Claim, CoreStats, LogicalCore};
pub use rules::{all_rules, Rule};
pub use store::EqualityStore;
