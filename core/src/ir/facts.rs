//! Relation labels, relation keys and trigger facts
//!
//! A relation instance is `(label, args) -> vals`. The store memoizes it under a
//! [`RelKey`]; the rule engine sees the flattened [`Fact`] `args ++ vals`.

use super::symbols::{ObjKind, Ref};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relation kind
///
/// Built-in labels are the incidence and metric relations the deduction rules
/// react to. `Named` labels belong to collaborators: they are memoized and
/// congruence-closed but never trigger a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    /// `(point, line) -> ()`
    LiesOn,
    /// `(point, circle) -> ()`
    LiesOnCircle,
    /// `(line) -> (angle)`
    Direction,
    /// `(circle) -> (point)`
    Center,
    /// `(circle) -> (ratio)`
    Radius,
    /// `(center, radius) -> (circle)`
    CircleBy,
    Named(String),
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Label::Named(name.into())
    }

    /// Expected kinds of `args` and `vals`, `None` for collaborator labels
    pub fn signature(&self) -> Option<(&'static [ObjKind], &'static [ObjKind])> {
        const NONE: &[ObjKind] = &[];
        const POINT: &[ObjKind] = &[ObjKind::Point];
        const LINE: &[ObjKind] = &[ObjKind::Line];
        const CIRCLE: &[ObjKind] = &[ObjKind::Circle];
        const ANGLE: &[ObjKind] = &[ObjKind::Angle];
        const RATIO: &[ObjKind] = &[ObjKind::Ratio];
        const POINT_LINE: &[ObjKind] = &[ObjKind::Point, ObjKind::Line];
        const POINT_CIRCLE: &[ObjKind] = &[ObjKind::Point, ObjKind::Circle];
        const POINT_RATIO: &[ObjKind] = &[ObjKind::Point, ObjKind::Ratio];

        match self {
            Label::LiesOn => Some((POINT_LINE, NONE)),
            Label::LiesOnCircle => Some((POINT_CIRCLE, NONE)),
            Label::Direction => Some((LINE, ANGLE)),
            Label::Center => Some((CIRCLE, POINT)),
            Label::Radius => Some((CIRCLE, RATIO)),
            Label::CircleBy => Some((POINT_RATIO, CIRCLE)),
            Label::Named(_) => None,
        }
    }

    /// Whether instances of this label are kept in the rule engine's fact index
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            Label::LiesOn | Label::LiesOnCircle | Label::Direction | Label::Center | Label::Radius
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::LiesOn => write!(f, "lies_on"),
            Label::LiesOnCircle => write!(f, "lies_on_circle"),
            Label::Direction => write!(f, "direction_of"),
            Label::Center => write!(f, "center_of"),
            Label::Radius => write!(f, "radius_of"),
            Label::CircleBy => write!(f, "circle"),
            Label::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Memoization key of a relation instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelKey {
    pub label: Label,
    pub args: Vec<Ref>,
}

impl RelKey {
    pub fn new(label: Label, args: Vec<Ref>) -> Self {
        Self { label, args }
    }
}

impl fmt::Display for RelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.label)?;
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a)?;
        }
        write!(f, ")")
    }
}

/// Flattened relation instance as seen by the deduction rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fact {
    pub label: Label,
    /// `args ++ vals`
    pub terms: Vec<Ref>,
}

impl Fact {
    pub fn new(label: Label, args: &[Ref], vals: &[Ref]) -> Self {
        let mut terms = Vec::with_capacity(args.len() + vals.len());
        terms.extend_from_slice(args);
        terms.extend_from_slice(vals);
        Self { label, terms }
    }

    /// Rewrite every term through `canon`
    pub fn canonical(&self, canon: impl Fn(Ref) -> Ref) -> Self {
        Self {
            label: self.label.clone(),
            terms: self.terms.iter().map(|&r| canon(r)).collect(),
        }
    }

    pub fn mentions(&self, r: Ref) -> bool {
        self.terms.contains(&r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_signatures() {
        let (args, vals) = Label::Direction.signature().unwrap();
        assert_eq!(args, &[ObjKind::Line]);
        assert_eq!(vals, &[ObjKind::Angle]);

        assert!(Label::named("midpoint").signature().is_none());
    }

    #[test]
    fn test_indexed_labels() {
        assert!(Label::LiesOn.is_indexed());
        assert!(Label::Radius.is_indexed());
        assert!(!Label::CircleBy.is_indexed());
        assert!(!Label::named("lies_on").is_indexed());
    }

    #[test]
    fn test_fact_flattening() {
        let fact = Fact::new(Label::Direction, &[Ref(3)], &[Ref(7)]);
        assert_eq!(fact.terms, vec![Ref(3), Ref(7)]);
        assert!(fact.mentions(Ref(7)));

        let moved = fact.canonical(|r| if r == Ref(3) { Ref(1) } else { r });
        assert_eq!(moved.terms, vec![Ref(1), Ref(7)]);
    }

    #[test]
    fn test_key_display() {
        let key = RelKey::new(Label::LiesOn, vec![Ref(1), Ref(2)]);
        assert_eq!(key.to_string(), "lies_on(#1, #2)");
    }
}
