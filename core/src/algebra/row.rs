//! Sparse linear rows over references

use crate::ir::Ref;
use num_traits::{Num, One, Zero};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Neg;

/// Coefficient domain of an equation row
pub trait Coefficient: Num + Clone + Neg<Output = Self> + Ord + Hash + fmt::Debug + fmt::Display {}

impl<T> Coefficient for T where T: Num + Clone + Neg<Output = T> + Ord + Hash + fmt::Debug + fmt::Display {}

/// Sparse row `Σ coef·var`; zero coefficients are never stored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row<C> {
    terms: BTreeMap<Ref, C>,
}

impl<C: Coefficient> Default for Row<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Coefficient> Row<C> {
    pub fn new() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    /// Build a row, summing repeated variables
    pub fn from_terms(terms: impl IntoIterator<Item = (Ref, C)>) -> Self {
        let mut row = Self::new();
        for (v, c) in terms {
            row.add_term(v, c);
        }
        row
    }

    /// The row `a - b`
    pub fn difference(a: Ref, b: Ref) -> Self {
        Self::from_terms([(a, C::one()), (b, -C::one())])
    }

    pub fn single(v: Ref, c: C) -> Self {
        Self::from_terms([(v, c)])
    }

    /// Coefficient of `v` (zero when absent)
    pub fn get(&self, v: Ref) -> C {
        self.terms.get(&v).cloned().unwrap_or_else(C::zero)
    }

    pub fn add_term(&mut self, v: Ref, c: C) {
        if c.is_zero() {
            return;
        }
        let sum = self.get(v) + c;
        if sum.is_zero() {
            self.terms.remove(&v);
        } else {
            self.terms.insert(v, sum);
        }
    }

    pub fn remove(&mut self, v: Ref) -> Option<C> {
        self.terms.remove(&v)
    }

    /// `self += k·other`
    pub fn add_scaled(&mut self, other: &Row<C>, k: &C) {
        if k.is_zero() {
            return;
        }
        for (&v, c) in &other.terms {
            self.add_term(v, c.clone() * k.clone());
        }
    }

    pub fn scaled(&self, k: &C) -> Self {
        if k.is_zero() {
            return Self::new();
        }
        Self {
            terms: self
                .terms
                .iter()
                .map(|(&v, c)| (v, c.clone() * k.clone()))
                .collect(),
        }
    }

    pub fn negated(&self) -> Self {
        self.scaled(&-C::one())
    }

    /// Highest-indexed variable and its coefficient
    pub fn highest(&self) -> Option<(Ref, C)> {
        self.terms.iter().next_back().map(|(&v, c)| (v, c.clone()))
    }

    /// Highest variable strictly below `bound`
    pub fn highest_below(&self, bound: Ref) -> Option<(Ref, C)> {
        self.terms
            .range(..bound)
            .next_back()
            .map(|(&v, c)| (v, c.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ref, &C)> + '_ {
        self.terms.iter().map(|(&v, c)| (v, c))
    }

    pub fn vars(&self) -> impl Iterator<Item = Ref> + '_ {
        self.terms.keys().copied()
    }

    pub fn contains(&self, v: Ref) -> bool {
        self.terms.contains_key(&v)
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in variable order, as an owned vector
    pub fn to_terms(&self) -> Vec<(Ref, C)> {
        self.terms.iter().map(|(&v, c)| (v, c.clone())).collect()
    }
}

impl<C: Coefficient> fmt::Display for Row<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, (v, c)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            if c.is_one() {
                write!(f, "{}", v)?;
            } else {
                write!(f, "{}·{}", c, v)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Rational64;

    #[test]
    fn test_zero_terms_vanish() {
        let mut row: Row<i64> = Row::from_terms([(Ref(1), 2), (Ref(2), -1), (Ref(1), -2)]);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get(Ref(1)), 0);

        row.add_term(Ref(2), 1);
        assert!(row.is_zero());
    }

    #[test]
    fn test_add_scaled() {
        let mut a: Row<i64> = Row::from_terms([(Ref(1), 1), (Ref(2), 3)]);
        let b: Row<i64> = Row::from_terms([(Ref(2), 1), (Ref(3), 1)]);

        a.add_scaled(&b, &-3);

        assert_eq!(a.to_terms(), vec![(Ref(1), 1), (Ref(3), -3)]);
    }

    #[test]
    fn test_highest() {
        let row: Row<Rational64> = Row::from_terms([
            (Ref(4), Rational64::new(1, 2)),
            (Ref(9), Rational64::from_integer(-1)),
            (Ref(2), Rational64::from_integer(3)),
        ]);

        assert_eq!(row.highest(), Some((Ref(9), Rational64::from_integer(-1))));
        assert_eq!(row.highest_below(Ref(9)).map(|(v, _)| v), Some(Ref(4)));
        assert_eq!(row.highest_below(Ref(2)), None);
    }

    #[test]
    fn test_display() {
        let row: Row<i64> = Row::from_terms([(Ref(1), 1), (Ref(2), -2)]);
        assert_eq!(row.to_string(), "#1 + -2·#2");
        assert_eq!(Row::<i64>::new().to_string(), "0");
    }
}
