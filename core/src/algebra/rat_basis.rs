//! Incremental Gauss–Jordan basis over the rationals
//!
//! Every row is solved for its pivot (coefficient −1), and a pivot appears in no
//! other row, so the non-pivot part of a row is the canonical value of its pivot.

use super::{BasisUpdate, GluePair, Row};
use crate::ir::Ref;
use num_rational::Rational64;
use num_traits::One;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::trace;

type RatKey = Vec<(Ref, Rational64)>;

/// Rational equation basis used for ratio chasing
#[derive(Debug, Clone, Default)]
pub struct RatBasis {
    rows: FxHashMap<Ref, Row<Rational64>>,
    occurs: FxHashMap<Ref, FxHashSet<Ref>>,
    keys: FxHashMap<Ref, RatKey>,
    buckets: FxHashMap<RatKey, BTreeSet<Ref>>,
}

impl RatBasis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, pivot: Ref) -> Option<&Row<Rational64>> {
        self.rows.get(&pivot)
    }

    /// Insert `Σ c·v = 0`
    pub fn add(&mut self, row: Row<Rational64>) -> BasisUpdate {
        let row = self.reduce(row);
        let Some((p, a)) = row.highest() else {
            return BasisUpdate::default();
        };
        let row = row.scaled(&(-Rational64::one() / a));
        trace!(pivot = %p, row = %row, "new ratio pivot");

        let mut dependents: Vec<Ref> = self
            .occurs
            .get(&p)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        dependents.sort();

        for &q in &dependents {
            if let Some(mut other) = self.rows.get(&q).cloned() {
                let e = other.get(p);
                other.add_scaled(&row, &e);
                self.set_row(q, other);
            }
        }
        self.set_row(p, row);

        let mut update = BasisUpdate {
            changed: true,
            glued: Vec::new(),
        };
        self.refile(p, &mut update);
        for q in dependents {
            self.refile(q, &mut update);
        }

        #[cfg(debug_assertions)]
        if let Err(violation) = self.check_invariants() {
            panic!("rational basis invariant broken after insertion: {}", violation);
        }

        update
    }

    /// Canonical value of `v` over free variables
    pub fn value_of(&self, v: Ref) -> Row<Rational64> {
        match self.rows.get(&v) {
            Some(row) => {
                let mut value = row.clone();
                value.remove(v);
                value
            }
            None => Row::single(v, Rational64::one()),
        }
    }

    /// Whether `Σ c·v = 0` follows from the basis
    pub fn query(&self, row: &Row<Rational64>) -> bool {
        self.reduce(row.clone()).is_zero()
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        for (&p, row) in &self.rows {
            if row.get(p) != -Rational64::one() {
                return Err(format!("pivot {} is not normalized", p));
            }
            for v in row.vars().filter(|&v| v != p) {
                if self.rows.contains_key(&v) {
                    return Err(format!("pivot {} still appears in row of {}", v, p));
                }
                if !self.occurs.get(&v).is_some_and(|s| s.contains(&p)) {
                    return Err(format!("occurrence of {} in row of {} not indexed", v, p));
                }
            }
            let key = Self::key_of_row(p, row);
            if self.keys.get(&p) != Some(&key) {
                return Err(format!("stale key for pivot {}", p));
            }
            if !self.buckets.get(&key).is_some_and(|b| b.contains(&p)) {
                return Err(format!("pivot {} missing from its value bucket", p));
            }
        }
        for (key, bucket) in &self.buckets {
            if bucket.is_empty() {
                return Err(format!("empty bucket for {:?}", key));
            }
            if bucket.iter().any(|q| self.keys.get(q) != Some(key)) {
                return Err(format!("bucket {:?} holds a stale entry", key));
            }
        }
        Ok(())
    }

    fn reduce(&self, mut row: Row<Rational64>) -> Row<Rational64> {
        let pivots: Vec<Ref> = row.vars().filter(|v| self.rows.contains_key(v)).collect();
        for v in pivots {
            let e = row.get(v);
            if let Some(base) = self.rows.get(&v) {
                row.add_scaled(base, &e);
            }
        }
        row
    }

    fn key_of_row(p: Ref, row: &Row<Rational64>) -> RatKey {
        row.iter()
            .filter(|&(v, _)| v != p)
            .map(|(v, c)| (v, *c))
            .collect()
    }

    fn set_row(&mut self, p: Ref, row: Row<Rational64>) {
        if let Some(old) = self.rows.remove(&p) {
            for v in old.vars().filter(|&v| v != p) {
                if let Some(set) = self.occurs.get_mut(&v) {
                    set.remove(&p);
                    if set.is_empty() {
                        self.occurs.remove(&v);
                    }
                }
            }
        }
        for v in row.vars().filter(|&v| v != p) {
            self.occurs.entry(v).or_default().insert(p);
        }
        self.rows.insert(p, row);
    }

    fn refile(&mut self, p: Ref, update: &mut BasisUpdate) {
        let Some(row) = self.rows.get(&p) else {
            return;
        };
        let key = Self::key_of_row(p, row);
        if self.keys.get(&p) == Some(&key) {
            return;
        }

        if let Some(old) = self.keys.remove(&p) {
            if let Some(bucket) = self.buckets.get_mut(&old) {
                bucket.remove(&p);
                if bucket.is_empty() {
                    self.buckets.remove(&old);
                }
            }
        }

        let partner = self
            .buckets
            .get(&key)
            .and_then(|b| b.iter().copied().find(|&q| q != p));
        let free = match key.as_slice() {
            [(x, c)] if c.is_one() && *x != p && !self.rows.contains_key(x) => Some(*x),
            _ => None,
        };
        if let Some(b) = partner.or(free) {
            update.glued.push(GluePair { a: p, b, denom: 1 });
        }

        self.buckets.entry(key.clone()).or_default().insert(p);
        self.keys.insert(p, key);
    }
}
