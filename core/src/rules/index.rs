//! Index of trigger-relevant relation instances

use crate::ir::{Fact, Label, Ref};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// Indexed facts the deduction rules search through
///
/// Facts are stored flattened (`args ++ vals`) and canonical at insertion time.
#[derive(Debug, Clone, Default)]
pub struct FactIndex {
    /// Deduplicated set of all facts
    facts: BTreeSet<Fact>,

    /// `(label, position, ref)` -> terms of the facts with `ref` at `position`
    by_position: FxHashMap<(Label, usize, Ref), BTreeSet<Vec<Ref>>>,

    /// Facts mentioning each reference
    by_ref: FxHashMap<Ref, BTreeSet<Fact>>,
}

impl FactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact, returning true if it was not indexed yet
    pub fn insert(&mut self, fact: Fact) -> bool {
        if self.facts.contains(&fact) {
            return false;
        }
        for (pos, &r) in fact.terms.iter().enumerate() {
            self.by_position
                .entry((fact.label.clone(), pos, r))
                .or_default()
                .insert(fact.terms.clone());
            self.by_ref.entry(r).or_default().insert(fact.clone());
        }
        self.facts.insert(fact);
        true
    }

    pub fn remove(&mut self, fact: &Fact) -> bool {
        if !self.facts.remove(fact) {
            return false;
        }
        for (pos, &r) in fact.terms.iter().enumerate() {
            let key = (fact.label.clone(), pos, r);
            if let Some(set) = self.by_position.get_mut(&key) {
                set.remove(&fact.terms);
                if set.is_empty() {
                    self.by_position.remove(&key);
                }
            }
            if let Some(set) = self.by_ref.get_mut(&r) {
                set.remove(fact);
                if set.is_empty() {
                    self.by_ref.remove(&r);
                }
            }
        }
        true
    }

    /// Remove and return every fact mentioning `r`, in order
    pub fn take_mentioning(&mut self, r: Ref) -> Vec<Fact> {
        let stale: Vec<Fact> = self
            .by_ref
            .get(&r)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for fact in &stale {
            self.remove(fact);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> + '_ {
        self.facts.iter()
    }

    /// Term `want` of every `label` fact having `r` at position `pos`
    fn project(&self, label: Label, pos: usize, r: Ref, want: usize) -> Vec<Ref> {
        self.by_position
            .get(&(label, pos, r))
            .map(|set| set.iter().map(|terms| terms[want]).collect())
            .unwrap_or_default()
    }

    pub fn points_on_line(&self, line: Ref) -> Vec<Ref> {
        self.project(Label::LiesOn, 1, line, 0)
    }

    pub fn lines_through(&self, point: Ref) -> Vec<Ref> {
        self.project(Label::LiesOn, 0, point, 1)
    }

    pub fn points_on_circle(&self, circle: Ref) -> Vec<Ref> {
        self.project(Label::LiesOnCircle, 1, circle, 0)
    }

    pub fn circles_through(&self, point: Ref) -> Vec<Ref> {
        self.project(Label::LiesOnCircle, 0, point, 1)
    }

    pub fn lines_with_direction(&self, direction: Ref) -> Vec<Ref> {
        self.project(Label::Direction, 1, direction, 0)
    }
}

/// Elements of `a` also in `b`, scanning the smaller side
pub fn common(a: &[Ref], b: &[Ref]) -> Vec<Ref> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let large: FxHashSet<Ref> = large.iter().copied().collect();
    small.iter().copied().filter(|r| large.contains(r)).collect()
}
