//! Line incidence rules

use super::{common, Action, Rule, RuleContext};
use crate::ir::{Fact, Label};

/// Two points determine a line: distinct P, Q on both L and M ⇒ L = M.
/// Dually, distinct lines L, M through both P and Q ⇒ P = Q.
pub struct LinePointUniqueness;

impl Rule for LinePointUniqueness {
    fn id(&self) -> &'static str {
        "line_point_uniqueness"
    }

    fn triggers(&self) -> Vec<Label> {
        vec![Label::LiesOn]
    }

    fn apply(&self, ctx: &RuleContext<'_>, fact: &Fact) -> Vec<Action> {
        let mut actions = Vec::new();
        let (p, l) = (fact.terms[0], fact.terms[1]);
        let on_l = ctx.facts.points_on_line(l);

        for m in ctx.facts.lines_through(p) {
            if m == l {
                continue;
            }
            let shared = common(&on_l, &ctx.facts.points_on_line(m));
            if ctx.distinct(l, m) {
                // distinct lines meet at most once
                for q in shared.into_iter().filter(|&q| q != p) {
                    actions.push(Action::Glue(p, q));
                }
            } else if shared.iter().any(|&q| q != p && ctx.distinct(p, q)) {
                actions.push(Action::Glue(l, m));
            }
        }

        actions
    }
}

/// Parallel through a point is unique: L ∥ M sharing a point ⇒ L = M
pub struct ParallelThroughPoint;

impl Rule for ParallelThroughPoint {
    fn id(&self) -> &'static str {
        "parallel_through_point"
    }

    fn triggers(&self) -> Vec<Label> {
        vec![Label::LiesOn, Label::Direction]
    }

    fn apply(&self, ctx: &RuleContext<'_>, fact: &Fact) -> Vec<Action> {
        let mut actions = Vec::new();

        match fact.label {
            Label::LiesOn => {
                let (p, l) = (fact.terms[0], fact.terms[1]);
                let Some(d) = ctx.direction(l) else {
                    return actions;
                };
                for m in ctx.facts.lines_through(p) {
                    if m != l && ctx.direction(m) == Some(d) {
                        actions.push(Action::Glue(l, m));
                    }
                }
            }
            Label::Direction => {
                let (l, d) = (fact.terms[0], fact.terms[1]);
                let on_l = ctx.facts.points_on_line(l);
                if on_l.is_empty() {
                    return actions;
                }
                for m in ctx.facts.lines_with_direction(d) {
                    if m != l && !common(&on_l, &ctx.facts.points_on_line(m)).is_empty() {
                        actions.push(Action::Glue(l, m));
                    }
                }
            }
            _ => {}
        }

        actions
    }
}
