//! Reference identifiers for geometric and numeric objects
//!
//! Every object known to the core is a [`Ref`]: a dense index allocated once by
//! the closure driver and never reused. The object kind travels with the numeric
//! shadow, see [`super::Numeric`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one geometric or numeric object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ref(pub u32);

impl Ref {
    /// Position of this reference in index-addressed tables
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of object a reference stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjKind {
    Point,
    Line,
    Circle,
    Angle,
    Ratio,
}

impl ObjKind {
    /// Kinds whose equalities are also tracked by an equation basis
    pub fn is_algebraic(self) -> bool {
        matches!(self, ObjKind::Angle | ObjKind::Ratio)
    }
}

/// Monotonic allocator for references
///
/// Owned by the closure driver; no other component allocates.
#[derive(Debug, Clone, Default)]
pub struct RefAllocator {
    next: u32,
}

impl RefAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next reference
    pub fn alloc(&mut self) -> Ref {
        let r = Ref(self.next);
        self.next = self
            .next
            .checked_add(1)
            .unwrap_or_else(|| panic!("reference space exhausted after {}", r));
        r
    }

    /// Number of references handed out so far
    pub fn len(&self) -> usize {
        self.next as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_monotonic() {
        let mut alloc = RefAllocator::new();
        let a = alloc.alloc();
        let b = alloc.alloc();
        let c = alloc.alloc();

        assert_eq!(a, Ref(0));
        assert!(a < b && b < c, "references must be handed out in order");
        assert_eq!(alloc.len(), 3);
    }

    #[test]
    fn test_ref_display() {
        assert_eq!(Ref(17).to_string(), "#17");
        assert_eq!(Ref(17).index(), 17);
    }

    #[test]
    fn test_algebraic_kinds() {
        assert!(ObjKind::Angle.is_algebraic());
        assert!(ObjKind::Ratio.is_algebraic());
        assert!(!ObjKind::Point.is_algebraic());
        assert!(!ObjKind::Circle.is_algebraic());
    }
}
