//! Deduction rules for incidence reasoning
//!
//! Rules are triggered by newly indexed facts and never mutate anything: they
//! queue [`Action`]s that the closure driver applies once the current merge has
//! settled.

pub mod circle;
pub mod index;
pub mod line;

pub use circle::*;
pub use index::{common, FactIndex};
pub use line::*;

use crate::ir::{Fact, Label, Numeric, Ref};
use crate::store::EqualityStore;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Rule trait - all deduction rules implement this
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Labels whose new instances fire this rule
    fn triggers(&self) -> Vec<Label>;

    /// React to a newly indexed fact
    ///
    /// `fact` is canonical and already present in `ctx.facts`.
    fn apply(&self, ctx: &RuleContext<'_>, fact: &Fact) -> Vec<Action>;
}

/// Consequence of a rule, applied later by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Glue(Ref, Ref),
    /// Memoize `label(args) = vals`, or glue the values if `label(args)` is
    /// already known
    Memoize {
        label: Label,
        args: Vec<Ref>,
        vals: Vec<Ref>,
    },
}

/// A queued action and the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub rule: &'static str,
    pub action: Action,
}

/// Read-only view handed to the rules
pub struct RuleContext<'a> {
    pub store: &'a EqualityStore,
    pub facts: &'a FactIndex,
    pub numerics: &'a [Numeric],
    pub epsilon: f64,
}

impl<'a> RuleContext<'a> {
    pub fn numeric(&self, r: Ref) -> &'a Numeric {
        match self.numerics.get(r.index()) {
            Some(n) => n,
            None => panic!("no numeric shadow for {}", r),
        }
    }

    /// The shadows of `a` and `b` describe different objects
    pub fn distinct(&self, a: Ref, b: Ref) -> bool {
        !self.coincide(a, b)
    }

    pub fn coincide(&self, a: Ref, b: Ref) -> bool {
        self.numeric(a).agrees_with(self.numeric(b), self.epsilon)
    }

    fn value(&self, label: Label, arg: Ref) -> Option<Ref> {
        self.store
            .get(&label, &[arg])
            .and_then(|vals| vals.first().copied())
    }

    pub fn direction(&self, line: Ref) -> Option<Ref> {
        self.value(Label::Direction, line)
    }

    pub fn center(&self, circle: Ref) -> Option<Ref> {
        self.value(Label::Center, circle)
    }

    pub fn radius(&self, circle: Ref) -> Option<Ref> {
        self.value(Label::Radius, circle)
    }
}

/// Get all available deduction rules
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = Vec::new();

    // Line rules (2)
    rules.push(Box::new(line::LinePointUniqueness));
    rules.push(Box::new(line::ParallelThroughPoint));

    // Circle rules (3)
    rules.push(Box::new(circle::CircleIntersection));
    rules.push(Box::new(circle::CircleFromCenterRadius));
    rules.push(Box::new(circle::Circumcircle));

    rules
}

/// Per-instance rule table, fact index and pending action queue
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    /// label -> positions in `rules`
    table: FxHashMap<Label, Vec<usize>>,
    facts: FactIndex,
    pending: VecDeque<Deduction>,
    draining: bool,
    firings: BTreeMap<&'static str, usize>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::with_rules(all_rules())
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        let mut table: FxHashMap<Label, Vec<usize>> = FxHashMap::default();
        for (i, rule) in rules.iter().enumerate() {
            for label in rule.triggers() {
                table.entry(label).or_default().push(i);
            }
        }
        Self {
            rules,
            table,
            facts: FactIndex::new(),
            pending: VecDeque::new(),
            draining: false,
            firings: BTreeMap::new(),
        }
    }

    /// Index a canonical fact and fire its rules if it is new
    pub fn insert(
        &mut self,
        fact: Fact,
        store: &EqualityStore,
        numerics: &[Numeric],
        epsilon: f64,
    ) -> bool {
        if !fact.label.is_indexed() || !self.facts.insert(fact.clone()) {
            return false;
        }
        self.fire(&fact, store, numerics, epsilon);
        true
    }

    /// Re-key every indexed fact mentioning a dissolved root
    ///
    /// `merged` holds `(dissolved, survivor)` pairs as returned by the store.
    /// Facts that are new after re-keying fire their rules again.
    pub fn dissolve(
        &mut self,
        merged: &[(Ref, Ref)],
        store: &EqualityStore,
        numerics: &[Numeric],
        epsilon: f64,
    ) {
        let mut stale = Vec::new();
        for &(old, _) in merged {
            stale.extend(self.facts.take_mentioning(old));
        }

        let mut fresh = Vec::new();
        for fact in stale {
            let moved = fact.canonical(|r| store.root(r));
            if self.facts.insert(moved.clone()) {
                fresh.push(moved);
            }
        }

        for fact in &fresh {
            self.fire(fact, store, numerics, epsilon);
        }
    }

    fn fire(&mut self, fact: &Fact, store: &EqualityStore, numerics: &[Numeric], epsilon: f64) {
        let Some(ids) = self.table.get(&fact.label) else {
            return;
        };
        let ctx = RuleContext {
            store,
            facts: &self.facts,
            numerics,
            epsilon,
        };
        for &i in ids {
            let rule = &self.rules[i];
            for action in rule.apply(&ctx, fact) {
                debug!(rule = rule.id(), trigger = ?fact, action = ?action, "deduced");
                *self.firings.entry(rule.id()).or_default() += 1;
                self.pending.push_back(Deduction {
                    rule: rule.id(),
                    action,
                });
            }
        }
    }

    /// Enter the drain loop; false if a drain is already running further up
    pub fn begin_drain(&mut self) -> bool {
        !std::mem::replace(&mut self.draining, true)
    }

    pub fn end_drain(&mut self) {
        self.draining = false;
    }

    pub fn next_pending(&mut self) -> Option<Deduction> {
        self.pending.pop_front()
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    pub fn facts(&self) -> &FactIndex {
        &self.facts
    }

    /// Actions produced so far, per rule id
    pub fn firings(&self) -> &BTreeMap<&'static str, usize> {
        &self.firings
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        let rules = all_rules();
        assert_eq!(rules.len(), 5);

        let mut ids: Vec<&str> = rules.iter().map(|r| r.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5, "rule ids must be unique");

        let engine = RuleEngine::new();
        assert_eq!(engine.table[&Label::LiesOn].len(), 3);
        assert_eq!(engine.table[&Label::LiesOnCircle].len(), 2);
        assert!(!engine.table.contains_key(&Label::CircleBy));
    }

    #[test]
    fn test_drain_guard() {
        let mut engine = RuleEngine::new();
        assert!(engine.begin_drain());
        assert!(!engine.begin_drain());
        engine.end_drain();
        assert!(engine.begin_drain());
    }

    #[test]
    fn test_unindexed_labels_do_not_fire() {
        let mut engine = RuleEngine::new();
        let store = EqualityStore::new();
        let fact = Fact::new(Label::named("midpoint"), &[Ref(0)], &[Ref(1)]);

        assert!(!engine.insert(fact, &store, &[], 1e-9));
        assert_eq!(engine.num_pending(), 0);
    }
}
