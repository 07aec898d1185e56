//! Modular angle equivalence on top of the integer basis
//!
//! Angles live in `R / Z` (one unit is half a turn). Each variable is tracked as
//! `root + offset` with an exact rational offset in `[0, 1)`; the integer basis
//! only ever sees rows over roots whose constant is an integer.

use super::{GluePair, IntBasis, Row};
use crate::ir::{distance_to_integer, Ref};
use num_rational::Rational64;
use num_traits::Zero;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;

fn normalize(f: Rational64) -> Rational64 {
    f - f.floor()
}

fn to_f64(f: Rational64) -> f64 {
    *f.numer() as f64 / *f.denom() as f64
}

/// Equivalence classes of angle variables modulo 1
#[derive(Debug, Clone)]
pub struct AngleTracker {
    basis: IntBasis,
    numeric: FxHashMap<Ref, f64>,
    /// variable -> (root, offset) with `variable = root + offset (mod 1)`
    equal_to: FxHashMap<Ref, (Ref, Rational64)>,
    /// root -> offset -> variables sitting exactly there
    classes: FxHashMap<Ref, BTreeMap<Rational64, Vec<Ref>>>,
    epsilon: f64,
    max_denominator: i64,
}

impl AngleTracker {
    pub fn new(epsilon: f64, max_denominator: i64) -> Self {
        Self {
            basis: IntBasis::new(),
            numeric: FxHashMap::default(),
            equal_to: FxHashMap::default(),
            classes: FxHashMap::default(),
            epsilon,
            max_denominator,
        }
    }

    /// Register a fresh angle variable with its numeric value (in half-turns)
    pub fn add_var(&mut self, v: Ref, value: f64) {
        let previous = self.numeric.insert(v, value);
        assert!(previous.is_none(), "angle variable {} registered twice", v);
        self.equal_to.insert(v, (v, Rational64::zero()));
        self.classes
            .entry(v)
            .or_default()
            .insert(Rational64::zero(), vec![v]);
    }

    pub fn contains(&self, v: Ref) -> bool {
        self.equal_to.contains_key(&v)
    }

    /// Class root of `v` and the exact offset of `v` from it
    pub fn root(&self, v: Ref) -> (Ref, Rational64) {
        match self.equal_to.get(&v) {
            Some(&entry) => entry,
            None => panic!("angle variable {} was never registered", v),
        }
    }

    pub fn basis(&self) -> &IntBasis {
        &self.basis
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Distance of `Σ c·num(v) − value` from the nearest integer
    pub fn numeric_residual(&self, eq: &Row<i64>, value: Rational64) -> f64 {
        let sum: f64 = eq
            .iter()
            .map(|(v, c)| *c as f64 * self.value_of(v))
            .sum();
        distance_to_integer(sum - to_f64(value))
    }

    /// Whether `Σ c·v ≡ value (mod 1)` is proven
    pub fn query(&self, eq: &Row<i64>, value: Rational64) -> bool {
        let (folded, rest) = self.fold(eq, value);
        if folded.is_zero() {
            return rest.is_zero();
        }
        let d = *rest.denom();
        let k = self.basis.query(&folded.scaled(&d));
        if k == 0 || d % k != 0 || k * d > self.max_denominator {
            return false;
        }
        self.numeric_residual(eq, value) < self.epsilon
    }

    /// Assert `Σ c·v ≡ value (mod 1)`, returning pairs of variables that became
    /// exactly equal
    ///
    /// The caller must have checked the numeric residual first.
    pub fn postulate(&mut self, eq: &Row<i64>, value: Rational64) -> Vec<(Ref, Ref)> {
        let residual = self.numeric_residual(eq, value);
        assert!(
            residual < self.epsilon,
            "angle equation {} ≡ {} postulated against its shadows (residual {:e})",
            eq,
            value,
            residual
        );

        let mut out = Vec::new();
        let (folded, rest) = self.fold(eq, value);
        if folded.is_zero() {
            assert!(
                rest.is_zero(),
                "angle equation {} ≡ {} contradicts exact offsets (off by {})",
                eq,
                value,
                rest
            );
            return out;
        }

        let d = *rest.denom();
        let update = self.basis.add(folded.scaled(&d));
        for pair in update.glued {
            self.merge_numeric(pair, &mut out);
        }

        // A plain difference of two roots pins their offset exactly
        if let [(a, ca), (b, cb)] = folded.to_terms().as_slice() {
            if ca.abs() == 1 && *ca == -*cb {
                let (u, w) = if *ca == 1 { (*a, *b) } else { (*b, *a) };
                self.join(u, w, rest, &mut out);
            }
        }

        out
    }

    /// Exact equality request `a = b`
    pub fn glue(&mut self, a: Ref, b: Ref) -> Vec<(Ref, Ref)> {
        self.postulate(&Row::difference(a, b), Rational64::zero())
    }

    /// Whether `a` and `b` are proven to be the very same angle
    pub fn has_exact_difference(&self, a: Ref, b: Ref) -> bool {
        self.root(a) == self.root(b)
    }

    /// An asserted variable `y` with `y ≡ −x`, if one exists
    ///
    /// Any root `s` related to `root(x)` has some multiple of `root(x) + s` in
    /// the lattice, and the higher of the two must then own a pivot row.
    pub fn get_complement(&self, x: Ref) -> Option<Ref> {
        let (r, o) = self.root(x);

        let mut candidates: Vec<Ref> = self
            .classes
            .keys()
            .copied()
            .filter(|&s| self.basis.row(r.max(s)).is_some())
            .collect();
        candidates.sort();

        for s in candidates {
            let k = self
                .basis
                .query(&Row::from_terms([(r, 1), (s, 1)]));
            if k == 0 || k > self.max_denominator {
                continue;
            }
            // r + s ≡ j / k, with j recovered from the shadows
            let gap = self.value_of(r) + self.value_of(s);
            let j = (gap * k as f64).round() as i64;
            let exact = normalize(Rational64::new(j, k));
            if distance_to_integer(gap - to_f64(exact)) >= self.epsilon {
                continue;
            }
            let target = normalize(-exact - o);
            if let Some(v) = self
                .classes
                .get(&s)
                .and_then(|c| c.get(&target))
                .and_then(|vars| vars.first())
            {
                return Some(*v);
            }
        }
        None
    }

    fn value_of(&self, v: Ref) -> f64 {
        match self.numeric.get(&v) {
            Some(&x) => x,
            None => panic!("angle variable {} has no shadow", v),
        }
    }

    /// Rewrite `Σ c·v ≡ value` over class roots
    fn fold(&self, eq: &Row<i64>, value: Rational64) -> (Row<i64>, Rational64) {
        let mut folded = Row::new();
        let mut rest = value;
        for (v, c) in eq.iter() {
            let (root, offset) = self.root(v);
            folded.add_term(root, *c);
            rest -= offset * Rational64::from_integer(*c);
        }
        (folded, normalize(rest))
    }

    /// Merge two basis-related variables, reading the exact fraction off the
    /// shadows
    fn merge_numeric(&mut self, pair: GluePair, out: &mut Vec<(Ref, Ref)>) {
        let GluePair { a, b, denom } = pair;
        if self.root(a).0 == self.root(b).0 {
            return;
        }
        let gap = self.value_of(a) - self.value_of(b);
        let j = (gap * denom as f64).round() as i64;
        let exact = normalize(Rational64::new(j, denom));
        let miss = distance_to_integer(gap - to_f64(exact));
        assert!(
            miss < self.epsilon,
            "basis relates {} and {} with denominator {} but their shadows are {:e} off",
            a,
            b,
            denom,
            miss
        );
        self.join(a, b, exact, out);
    }

    /// Record `a − b ≡ diff` exactly
    fn join(&mut self, a: Ref, b: Ref, diff: Rational64, out: &mut Vec<(Ref, Ref)>) {
        let (ra, oa) = self.root(a);
        let (rb, ob) = self.root(b);
        if ra == rb {
            assert_eq!(
                normalize(oa - ob),
                normalize(diff),
                "{} and {} already share a class at a different offset",
                a,
                b
            );
            return;
        }

        // ra − rb
        let dist = normalize(diff - oa + ob);
        let size = |r: Ref| -> usize {
            self.classes
                .get(&r)
                .map_or(0, |c| c.values().map(Vec::len).sum())
        };
        let (keep, gone, shift) = if size(ra) >= size(rb) {
            (ra, rb, normalize(-dist))
        } else {
            (rb, ra, dist)
        };

        let moved = self.classes.remove(&gone).unwrap_or_default();
        let target = self.classes.entry(keep).or_default();
        for (offset, vars) in moved {
            let shifted = normalize(offset + shift);
            for &v in &vars {
                self.equal_to.insert(v, (keep, shifted));
            }
            match target.get_mut(&shifted) {
                Some(existing) => {
                    out.push((existing[0], vars[0]));
                    existing.extend(vars);
                }
                None => {
                    target.insert(shifted, vars);
                }
            }
        }
        debug!(kept = %keep, dissolved = %gone, offset = %shift, "angle classes merged");
    }
}

impl Default for AngleTracker {
    fn default() -> Self {
        Self::new(1e-9, 10_000)
    }
}
