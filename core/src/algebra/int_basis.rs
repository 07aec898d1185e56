//! Incremental integer lattice basis
//!
//! Rows are integer combinations of angle variables known to be `≡ 0 (mod 1)`.
//! The basis is kept in Hermite normal form with respect to the variable order:
//! every row is owned by its highest variable (the pivot) with a positive
//! coefficient `k`, and every entry of another row on that pivot lies in `[0, k)`.

use super::{BasisUpdate, GluePair, Row};
use crate::ir::Ref;
use num_integer::Integer;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::trace;

/// Canonical value of a variable: `terms / denom`, in lowest terms
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct IntKey {
    denom: i64,
    terms: Vec<(Ref, i64)>,
}

impl IntKey {
    fn reduced(denom: i64, terms: Vec<(Ref, i64)>) -> Self {
        let g = terms.iter().fold(denom, |g, (_, c)| g.gcd(c));
        Self {
            denom: denom / g,
            terms: terms.into_iter().map(|(v, c)| (v, c / g)).collect(),
        }
    }

    /// The variable this key is the free value of, if any
    fn as_free_var(&self) -> Option<Ref> {
        match self.terms.as_slice() {
            [(v, 1)] if self.denom == 1 => Some(*v),
            _ => None,
        }
    }
}

/// Integer equation basis used for angle chasing
#[derive(Debug, Clone, Default)]
pub struct IntBasis {
    /// pivot -> row, pivot coefficient positive
    rows: FxHashMap<Ref, Row<i64>>,
    /// variable -> pivots of the other rows mentioning it
    occurs: FxHashMap<Ref, FxHashSet<Ref>>,
    keys: FxHashMap<Ref, IntKey>,
    buckets: FxHashMap<IntKey, BTreeSet<Ref>>,
}

impl IntBasis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pivot rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, pivot: Ref) -> Option<&Row<i64>> {
        self.rows.get(&pivot)
    }

    /// Insert a row, returning whether the lattice grew and which variables
    /// became provably related
    pub fn add(&mut self, row: Row<i64>) -> BasisUpdate {
        let mut update = BasisUpdate::default();
        let mut dirty = BTreeSet::new();
        let mut row = row;

        while let Some((p, a)) = row.highest() {
            let Some(base) = self.rows.get(&p).cloned() else {
                if a < 0 {
                    row = row.negated();
                }
                self.reduce_below(&mut row, p);
                trace!(pivot = %p, row = %row, "new pivot row");
                self.set_row(p, row);
                dirty.insert(p);
                update.changed = true;
                break;
            };

            let c = base.get(p);
            if a % c == 0 {
                row.add_scaled(&base, &-(a / c));
                continue;
            }

            // Replace {base, row} by a unimodular pair: one row keeps the gcd on
            // the pivot, the other loses the pivot and continues downwards.
            let bezout = c.extended_gcd(&a);
            let g = bezout.gcd;
            let mut kept = base.scaled(&bezout.x);
            kept.add_scaled(&row, &bezout.y);
            let mut rest = base.scaled(&(a / g));
            rest.add_scaled(&row, &-(c / g));
            if g < 0 {
                kept = kept.negated();
            }
            debug_assert_eq!(rest.get(p), 0);

            self.reduce_below(&mut kept, p);
            trace!(pivot = %p, row = %kept, "pivot row tightened");
            self.set_row(p, kept);
            dirty.insert(p);
            update.changed = true;
            row = rest;
        }

        self.settle(dirty, &mut update);

        #[cfg(debug_assertions)]
        if let Err(violation) = self.check_invariants() {
            panic!("integer basis invariant broken after insertion: {}", violation);
        }

        update
    }

    /// Smallest `k > 0` such that `k·row` lies in the lattice, or 0 if none
    pub fn query(&self, row: &Row<i64>) -> i64 {
        let mut row = row.clone();
        let mut mult = 1i64;

        while let Some((v, a)) = row.highest() {
            let Some(base) = self.rows.get(&v) else {
                return 0;
            };
            let c = base.get(v);
            let m = c / a.gcd(&c);
            let a = if m != 1 {
                row = row.scaled(&m);
                mult *= m;
                a * m
            } else {
                a
            };
            row.add_scaled(base, &-(a / c));
        }

        mult
    }

    /// Verify the structural invariants, describing the first violation
    ///
    /// Values are not required to be unique across pivots. Pivots with the same
    /// value share a bucket, and filing a pivot into an occupied bucket is what
    /// reports the pair as glued, so a bucket with several pivots lists
    /// variables already related. What is checked is that every pivot sits in
    /// exactly the bucket of its current value and no bucket holds a stale
    /// entry.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (&p, row) in &self.rows {
            match row.highest() {
                Some((top, k)) if top == p && k > 0 => {}
                other => return Err(format!("row of {} has leading term {:?}", p, other)),
            }
            for (v, e) in row.iter() {
                if v == p {
                    continue;
                }
                if let Some(base) = self.rows.get(&v) {
                    let k = base.get(v);
                    if *e < 0 || *e >= k {
                        return Err(format!("row of {} not reduced on pivot {}: {} vs {}", p, v, e, k));
                    }
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
            for q in bucket {
                if self.keys.get(q) != Some(key) {
                    return Err(format!("bucket entry {} does not carry its key", q));
                }
            }
        }
        for (v, pivots) in &self.occurs {
            for p in pivots {
                if !self.rows.get(p).is_some_and(|r| r.contains(*v)) {
                    return Err(format!("stale occurrence of {} in row of {}", v, p));
                }
            }
        }
        Ok(())
    }

    fn key_of_row(p: Ref, row: &Row<i64>) -> IntKey {
        let k = row.get(p);
        let terms = row
            .iter()
            .filter(|&(v, _)| v != p)
            .map(|(v, c)| (v, -*c))
            .collect();
        IntKey::reduced(k, terms)
    }

    /// Reduce the entries of `row` below `pivot` modulo the pivot rows
    fn reduce_below(&self, row: &mut Row<i64>, pivot: Ref) -> bool {
        let mut changed = false;
        let mut cursor = pivot;
        while let Some((v, e)) = row.highest_below(cursor) {
            if let Some(base) = self.rows.get(&v) {
                let t = e.div_euclid(base.get(v));
                if t != 0 {
                    row.add_scaled(base, &-t);
                    changed = true;
                }
            }
            cursor = v;
        }
        changed
    }

    fn set_row(&mut self, p: Ref, row: Row<i64>) {
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

    /// Re-reduce rows depending on changed pivots, refiling their keys
    fn settle(&mut self, mut dirty: BTreeSet<Ref>, update: &mut BasisUpdate) {
        while let Some(p) = dirty.pop_first() {
            self.refile(p, update);

            let mut dependents: Vec<Ref> = self
                .occurs
                .get(&p)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default();
            dependents.sort();

            for q in dependents {
                let Some(mut row) = self.rows.get(&q).cloned() else {
                    continue;
                };
                if self.reduce_below(&mut row, q) {
                    self.set_row(q, row);
                    dirty.insert(q);
                }
            }
        }
    }

    fn refile(&mut self, p: Ref, update: &mut BasisUpdate) {
        let Some(row) = self.rows.get(&p) else {
            return;
        };
        let k = row.get(p);
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
        if let Some(q) = partner {
            let kq = self.rows.get(&q).map_or(1, |r| r.get(q));
            update.glued.push(GluePair { a: p, b: q, denom: k * kq });
        } else if let Some(x) = key.as_free_var() {
            if x != p && !self.rows.contains_key(&x) {
                update.glued.push(GluePair { a: p, b: x, denom: k });
            }
        }

        self.buckets.entry(key.clone()).or_default().insert(p);
        self.keys.insert(p, key);
    }
}
