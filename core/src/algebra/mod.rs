//! Exact algebra over references
//!
//! - **row**: sparse equation rows
//! - **int_basis**: lattice of integer rows known to vanish modulo 1 (angles)
//! - **rat_basis**: rational equations solved by Gauss–Jordan (log-ratios)
//! - **angles**: modular equivalence classes on top of the integer basis

mod angles;
mod int_basis;
mod rat_basis;
mod row;

pub use angles::AngleTracker;
pub use int_basis::IntBasis;
pub use rat_basis::RatBasis;
pub use row::{Coefficient, Row};

use crate::ir::Ref;

/// Two basis variables proven related: `denom·(a − b)` vanishes
///
/// For the rational basis `denom` is always 1 and the variables are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GluePair {
    pub a: Ref,
    pub b: Ref,
    pub denom: i64,
}

/// Outcome of inserting a row into a basis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasisUpdate {
    /// The row was not already implied
    pub changed: bool,
    /// Variables whose values collided after the insertion
    pub glued: Vec<GluePair>,
}
