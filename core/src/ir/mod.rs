//! Intermediate representation shared by every layer of the core
//!
//! - **symbols**: reference identifiers and object kinds
//! - **numeric**: floating-point shadows used as a sanity oracle
//! - **facts**: relation labels, memoization keys and trigger facts
//!
//! # Example
//!
//! ```rust
//! use geologic_core::ir::*;
//!
//! let mut alloc = RefAllocator::new();
//! let p = alloc.alloc();
//! let l = alloc.alloc();
//!
//! let shadow = Numeric::line_through(Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0));
//! assert_eq!(shadow.kind(), ObjKind::Line);
//!
//! let fact = Fact::new(Label::LiesOn, &[p, l], &[]);
//! assert!(fact.mentions(l));
//! ```

mod facts;
mod numeric;
mod symbols;

pub use facts::{Fact, Label, RelKey};
pub use numeric::{distance_to_integer, ops, Numeric, Point2D};
pub use symbols::{ObjKind, Ref, RefAllocator};
