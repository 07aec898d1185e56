//! Circle deduction rules

use super::{common, Action, Rule, RuleContext};
use crate::ir::{ops, Fact, Label, Ref};

/// Two curves crossing in two distinct points: numerically coincident points on
/// both curves are the same point
pub struct CircleIntersection;

impl CircleIntersection {
    fn glue_coincident(ctx: &RuleContext<'_>, p: Ref, shared: Vec<Ref>, actions: &mut Vec<Action>) {
        for q in shared {
            if q != p && ctx.coincide(p, q) {
                actions.push(Action::Glue(p, q));
            }
        }
    }

    fn line_and_circle(ctx: &RuleContext<'_>, p: Ref, line: Ref, circle: Ref, actions: &mut Vec<Action>) {
        if !ops::line_crosses_circle(ctx.numeric(line), ctx.numeric(circle), ctx.epsilon) {
            return;
        }
        let shared = common(
            &ctx.facts.points_on_line(line),
            &ctx.facts.points_on_circle(circle),
        );
        Self::glue_coincident(ctx, p, shared, actions);
    }
}

impl Rule for CircleIntersection {
    fn id(&self) -> &'static str {
        "circle_intersection"
    }

    fn triggers(&self) -> Vec<Label> {
        vec![Label::LiesOn, Label::LiesOnCircle]
    }

    fn apply(&self, ctx: &RuleContext<'_>, fact: &Fact) -> Vec<Action> {
        let mut actions = Vec::new();
        let p = fact.terms[0];

        match fact.label {
            Label::LiesOnCircle => {
                let c = fact.terms[1];
                let on_c = ctx.facts.points_on_circle(c);
                for other in ctx.facts.circles_through(p) {
                    if other == c
                        || !ops::circles_cross(ctx.numeric(c), ctx.numeric(other), ctx.epsilon)
                    {
                        continue;
                    }
                    let shared = common(&on_c, &ctx.facts.points_on_circle(other));
                    Self::glue_coincident(ctx, p, shared, &mut actions);
                }
                for line in ctx.facts.lines_through(p) {
                    Self::line_and_circle(ctx, p, line, c, &mut actions);
                }
            }
            Label::LiesOn => {
                let l = fact.terms[1];
                for c in ctx.facts.circles_through(p) {
                    Self::line_and_circle(ctx, p, l, c, &mut actions);
                }
            }
            _ => {}
        }

        actions
    }
}

/// A center and a radius determine a circle: circle(O, r) is memoized, and a
/// second circle with the same center and radius is glued to the first
pub struct CircleFromCenterRadius;

impl Rule for CircleFromCenterRadius {
    fn id(&self) -> &'static str {
        "circle_by_center_radius"
    }

    fn triggers(&self) -> Vec<Label> {
        vec![Label::Center, Label::Radius]
    }

    fn apply(&self, ctx: &RuleContext<'_>, fact: &Fact) -> Vec<Action> {
        let c = fact.terms[0];
        let (Some(center), Some(radius)) = (ctx.center(c), ctx.radius(c)) else {
            return Vec::new();
        };

        match ctx.store.get(&Label::CircleBy, &[center, radius]) {
            Some(&[known]) if known != ctx.store.root(c) => vec![Action::Glue(c, known)],
            Some(_) => Vec::new(),
            None => vec![Action::Memoize {
                label: Label::CircleBy,
                args: vec![center, radius],
                vals: vec![c],
            }],
        }
    }
}

/// Three points determine a circle: numerically equal circles sharing three
/// distinct points are the same circle
pub struct Circumcircle;

impl Rule for Circumcircle {
    fn id(&self) -> &'static str {
        "circumcircle"
    }

    fn triggers(&self) -> Vec<Label> {
        vec![Label::LiesOnCircle]
    }

    fn apply(&self, ctx: &RuleContext<'_>, fact: &Fact) -> Vec<Action> {
        let mut actions = Vec::new();
        let (p, c) = (fact.terms[0], fact.terms[1]);
        let on_c = ctx.facts.points_on_circle(c);
        if on_c.len() < 3 {
            return actions;
        }

        for other in ctx.facts.circles_through(p) {
            if other == c || ctx.distinct(c, other) {
                continue;
            }
            let mut witnesses: Vec<Ref> = Vec::new();
            for q in common(&on_c, &ctx.facts.points_on_circle(other)) {
                if witnesses.iter().all(|&w| ctx.distinct(w, q)) {
                    witnesses.push(q);
                }
                if witnesses.len() == 3 {
                    actions.push(Action::Glue(c, other));
                    break;
                }
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Numeric;
    use crate::rules::FactIndex;
    use crate::store::EqualityStore;

    const EPS: f64 = 1e-9;

    fn setup(numerics: &[Numeric]) -> EqualityStore {
        let mut store = EqualityStore::new();
        for i in 0..numerics.len() as u32 {
            store.register(Ref(i));
        }
        store
    }

    fn on_circle(p: u32, c: u32) -> Fact {
        Fact::new(Label::LiesOnCircle, &[Ref(p), Ref(c)], &[])
    }

    #[test]
    fn test_circle_circle_intersection() {
        // unit circles around (0, 0) and (1, 0) meet at (1/2, ±√3/2)
        let h = 3f64.sqrt() / 2.0;
        let numerics = vec![
            Numeric::circle(0.0, 0.0, 1.0),
            Numeric::circle(1.0, 0.0, 1.0),
            Numeric::point(0.5, h),
            Numeric::point(0.5, h),
            Numeric::point(0.5, -h),
        ];
        let store = setup(&numerics);
        let mut facts = FactIndex::new();
        for f in [
            on_circle(2, 0),
            on_circle(2, 1),
            on_circle(4, 0),
            on_circle(4, 1),
            on_circle(3, 0),
            on_circle(3, 1),
        ] {
            facts.insert(f);
        }
        let ctx = RuleContext {
            store: &store,
            facts: &facts,
            numerics: &numerics,
            epsilon: EPS,
        };

        let actions = CircleIntersection.apply(&ctx, &on_circle(3, 1));
        assert_eq!(actions, vec![Action::Glue(Ref(3), Ref(2))]);
    }

    #[test]
    fn test_line_circle_intersection() {
        // x-axis through the unit circle meets it at (±1, 0)
        let numerics = vec![
            Numeric::circle(0.0, 0.0, 1.0),
            Numeric::line(0.0, 1.0, 0.0),
            Numeric::point(1.0, 0.0),
            Numeric::point(1.0, 0.0),
        ];
        let store = setup(&numerics);
        let mut facts = FactIndex::new();
        for f in [
            on_circle(2, 0),
            Fact::new(Label::LiesOn, &[Ref(2), Ref(1)], &[]),
            on_circle(3, 0),
        ] {
            facts.insert(f);
        }
        let trigger = Fact::new(Label::LiesOn, &[Ref(3), Ref(1)], &[]);
        facts.insert(trigger.clone());
        let ctx = RuleContext {
            store: &store,
            facts: &facts,
            numerics: &numerics,
            epsilon: EPS,
        };

        assert_eq!(
            CircleIntersection.apply(&ctx, &trigger),
            vec![Action::Glue(Ref(3), Ref(2))]
        );
    }

    #[test]
    fn test_tangent_line_is_ignored() {
        let numerics = vec![
            Numeric::circle(0.0, 0.0, 1.0),
            Numeric::line(0.0, 1.0, 1.0),
            Numeric::point(0.0, 1.0),
            Numeric::point(0.0, 1.0),
        ];
        let store = setup(&numerics);
        let mut facts = FactIndex::new();
        for f in [
            on_circle(2, 0),
            on_circle(3, 0),
            Fact::new(Label::LiesOn, &[Ref(2), Ref(1)], &[]),
            Fact::new(Label::LiesOn, &[Ref(3), Ref(1)], &[]),
        ] {
            facts.insert(f);
        }
        let ctx = RuleContext {
            store: &store,
            facts: &facts,
            numerics: &numerics,
            epsilon: EPS,
        };

        assert!(CircleIntersection.apply(&ctx, &on_circle(3, 0)).is_empty());
    }

    #[test]
    fn test_center_radius_memoizes_then_glues() {
        // 0, 1: circles, 2: center, 3: radius
        let numerics = vec![
            Numeric::circle(0.0, 0.0, 2.0),
            Numeric::circle(0.0, 0.0, 2.0),
            Numeric::point(0.0, 0.0),
            Numeric::Ratio(2f64.ln()),
        ];
        let mut store = setup(&numerics);
        store.add(Label::Center, &[Ref(0)], &[Ref(2)]);
        store.add(Label::Radius, &[Ref(0)], &[Ref(3)]);
        let facts = FactIndex::new();

        let actions = {
            let ctx = RuleContext {
                store: &store,
                facts: &facts,
                numerics: &numerics,
                epsilon: EPS,
            };
            CircleFromCenterRadius.apply(&ctx, &Fact::new(Label::Radius, &[Ref(0)], &[Ref(3)]))
        };
        assert_eq!(
            actions,
            vec![Action::Memoize {
                label: Label::CircleBy,
                args: vec![Ref(2), Ref(3)],
                vals: vec![Ref(0)],
            }]
        );

        store.add(Label::CircleBy, &[Ref(2), Ref(3)], &[Ref(0)]);
        store.add(Label::Center, &[Ref(1)], &[Ref(2)]);
        store.add(Label::Radius, &[Ref(1)], &[Ref(3)]);
        let ctx = RuleContext {
            store: &store,
            facts: &facts,
            numerics: &numerics,
            epsilon: EPS,
        };
        let trigger = Fact::new(Label::Center, &[Ref(1)], &[Ref(2)]);
        assert_eq!(
            CircleFromCenterRadius.apply(&ctx, &trigger),
            vec![Action::Glue(Ref(1), Ref(0))]
        );
        assert!(CircleFromCenterRadius
            .apply(&ctx, &Fact::new(Label::Center, &[Ref(0)], &[Ref(2)]))
            .is_empty());
    }

    #[test]
    fn test_circumcircle_needs_three_points() {
        // 0, 1: the unit circle twice; 2, 3, 4: points on it
        let numerics = vec![
            Numeric::circle(0.0, 0.0, 1.0),
            Numeric::circle(0.0, 0.0, 1.0),
            Numeric::point(1.0, 0.0),
            Numeric::point(0.0, 1.0),
            Numeric::point(-1.0, 0.0),
        ];
        let store = setup(&numerics);
        let mut facts = FactIndex::new();
        for f in [on_circle(2, 0), on_circle(3, 0), on_circle(4, 0), on_circle(2, 1), on_circle(3, 1)] {
            facts.insert(f);
        }

        {
            let ctx = RuleContext {
                store: &store,
                facts: &facts,
                numerics: &numerics,
                epsilon: EPS,
            };
            assert!(Circumcircle.apply(&ctx, &on_circle(3, 1)).is_empty());
        }

        facts.insert(on_circle(4, 1));
        let ctx = RuleContext {
            store: &store,
            facts: &facts,
            numerics: &numerics,
            epsilon: EPS,
        };
        assert_eq!(
            Circumcircle.apply(&ctx, &on_circle(4, 1)),
            vec![Action::Glue(Ref(1), Ref(0))]
        );
    }
}
