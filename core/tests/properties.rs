//! Soundness properties of the equation bases

use geologic_core::{IntBasis, RatBasis, Ref, Row};
use num_rational::Rational64;
use proptest::prelude::*;

const VARS: u32 = 5;

fn int_row(coefs: &[i64]) -> Row<i64> {
    Row::from_terms(coefs.iter().enumerate().map(|(i, &c)| (Ref(i as u32), c)))
}

fn rat_row(coefs: &[i64]) -> Row<Rational64> {
    Row::from_terms(
        coefs
            .iter()
            .enumerate()
            .map(|(i, &c)| (Ref(i as u32), Rational64::from_integer(c))),
    )
}

/// Rows over the first `VARS` references with small coefficients
fn rows() -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec(prop::collection::vec(-3i64..=3, VARS as usize), 1..5)
}

/// Sum of `rows` with a ±1 sign each
fn combination(rows: &[Vec<i64>], signs: &[bool]) -> Vec<i64> {
    let mut sum = vec![0i64; VARS as usize];
    for (row, &positive) in rows.iter().zip(signs) {
        for (acc, c) in sum.iter_mut().zip(row) {
            *acc += if positive { *c } else { -*c };
        }
    }
    sum
}

proptest! {
    #[test]
    fn test_int_basis_is_closed_under_combination(
        rows in rows(),
        signs in prop::collection::vec(any::<bool>(), 5),
    ) {
        let mut basis = IntBasis::new();
        for row in &rows {
            basis.add(int_row(row));
            prop_assert!(basis.check_invariants().is_ok(), "{:?}", basis.check_invariants());
        }

        for row in &rows {
            prop_assert_eq!(basis.query(&int_row(row)), 1);
        }
        let sum = combination(&rows, &signs);
        prop_assert_eq!(basis.query(&int_row(&sum)), 1);
    }

    #[test]
    fn test_int_basis_rejects_fresh_variables(rows in rows(), c in 1i64..4) {
        let mut basis = IntBasis::new();
        for row in &rows {
            basis.add(int_row(row));
        }

        let mut probe = int_row(&rows[0]);
        probe.add_term(Ref(VARS), c);
        prop_assert_eq!(basis.query(&probe), 0);
    }

    #[test]
    fn test_rat_basis_is_closed_under_combination(
        rows in rows(),
        signs in prop::collection::vec(any::<bool>(), 5),
    ) {
        let mut basis = RatBasis::new();
        for row in &rows {
            basis.add(rat_row(row));
            prop_assert!(basis.check_invariants().is_ok(), "{:?}", basis.check_invariants());
        }

        let sum = combination(&rows, &signs);
        prop_assert!(basis.query(&rat_row(&sum)));
        prop_assert!(basis.query(&rat_row(&sum).scaled(&Rational64::new(2, 3))));

        let mut probe = rat_row(&sum);
        probe.add_term(Ref(VARS), Rational64::from_integer(1));
        prop_assert!(!basis.query(&probe));
    }
}
