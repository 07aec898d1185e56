//! Closure driver
//!
//! [`LogicalCore`] owns the equality store, the angle tracker, the ratio basis
//! and the rule engine, and keeps them mutually closed: every public mutation
//! runs the merge fixpoint to completion before it returns.

use crate::algebra::{AngleTracker, RatBasis, Row};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::ir::{Fact, Label, Numeric, ObjKind, Ref, RefAllocator};
use crate::rules::{Action, Deduction, RuleEngine};
use crate::store::EqualityStore;
use num_rational::Rational64;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, trace};

/// An equality or equation, as asserted or checked by collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    Equal(Ref, Ref),
    /// `Σ c·v ≡ value (mod 1)` over angle references
    Angle { row: Row<i64>, value: Rational64 },
    /// `Σ c·log v = log constant` over ratio references
    Ratio {
        row: Row<Rational64>,
        constant: Rational64,
    },
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Claim::Equal(a, b) => write!(f, "{} = {}", a, b),
            Claim::Angle { row, value } => write!(f, "{} ≡ {} (mod 1)", row, value),
            Claim::Ratio { row, constant } => write!(f, "{} = log {}", row, constant),
        }
    }
}

/// Size counters of a [`LogicalCore`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreStats {
    pub refs: usize,
    pub classes: usize,
    pub relations: usize,
    pub indexed_facts: usize,
    pub angle_rows: usize,
    pub angle_classes: usize,
    pub ratio_rows: usize,
    /// Class merges performed by the equality store
    pub merges: usize,
    /// Actions produced per rule id
    pub rule_firings: BTreeMap<String, usize>,
}

/// The logical core: equalities, relations, angle and ratio equations
pub struct LogicalCore {
    config: CoreConfig,
    refs: RefAllocator,
    numerics: Vec<Numeric>,
    store: EqualityStore,
    angles: AngleTracker,
    ratios: RatBasis,
    engine: RuleEngine,
    /// prime -> reference standing for `log p`
    primes: BTreeMap<u64, Ref>,
    merges: usize,
}

impl LogicalCore {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            angles: AngleTracker::new(config.epsilon, config.max_denominator),
            config,
            refs: RefAllocator::new(),
            numerics: Vec::new(),
            store: EqualityStore::new(),
            ratios: RatBasis::new(),
            engine: RuleEngine::new(),
            primes: BTreeMap::new(),
            merges: 0,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Allocate a reference with an immutable numeric shadow
    pub fn add_obj(&mut self, numeric: Numeric) -> Ref {
        let r = self.refs.alloc();
        self.store.register(r);
        if let Numeric::Angle(value) = numeric {
            self.angles.add_var(r, value);
        }
        self.numerics.push(numeric);
        debug_assert_eq!(self.numerics.len(), self.refs.len());
        trace!(reference = %r, kind = ?numeric.kind(), "object added");
        r
    }

    /// Assert `a = b` and close over every consequence
    pub fn glue(&mut self, a: Ref, b: Ref) -> CoreResult<()> {
        let residual = self.numeric(a).discrepancy(self.numeric(b));
        if residual >= self.config.epsilon {
            debug!(%a, %b, residual, "glue rejected by shadows");
            return Err(CoreError::numeric(Claim::Equal(a, b).to_string(), residual));
        }
        self.glue_reaction(VecDeque::from([(a, b)]));
        self.drain_deductions();
        Ok(())
    }

    /// Memoize `label(args) = vals`, firing deduction rules if it is new
    ///
    /// # Panics
    ///
    /// If the references do not match the kinds of a built-in label, or if
    /// `label(args)` is already memoized with different values.
    pub fn add_constr(&mut self, label: Label, args: &[Ref], vals: &[Ref]) -> bool {
        if let Some((arg_kinds, val_kinds)) = label.signature() {
            let kinds = |refs: &[Ref]| -> Vec<ObjKind> { refs.iter().map(|&r| self.kind(r)).collect() };
            assert!(
                kinds(args) == arg_kinds && kinds(vals) == val_kinds,
                "{} expects {:?} -> {:?}, got {:?} -> {:?}",
                label,
                arg_kinds,
                val_kinds,
                kinds(args),
                kinds(vals)
            );
        }
        let new = self.memoize(label, args, vals);
        self.drain_deductions();
        new
    }

    /// Values memoized for `label(args)`, canonical
    pub fn get_constr(&self, label: &Label, args: &[Ref]) -> Option<Vec<Ref>> {
        self.store.get(label, args).map(<[Ref]>::to_vec)
    }

    pub fn check_equal(&self, a: Ref, b: Ref) -> bool {
        self.store.is_equal(a, b)
    }

    /// Assert `Σ c·v ≡ value (mod 1)` over angle references
    pub fn add_angle_equation(&mut self, row: &Row<i64>, value: Rational64) -> CoreResult<()> {
        self.expect_kind(row.vars(), ObjKind::Angle, "angle equation");
        let residual = self.angles.numeric_residual(row, value);
        if residual >= self.config.epsilon {
            let claim = Claim::Angle {
                row: row.clone(),
                value,
            };
            debug!(%claim, residual, "angle equation rejected by shadows");
            return Err(CoreError::numeric(claim.to_string(), residual));
        }

        let emitted = self.angles.postulate(row, value);
        self.glue_reaction(emitted.into());
        self.drain_deductions();
        Ok(())
    }

    pub fn check_angle_equation(&self, row: &Row<i64>, value: Rational64) -> bool {
        self.expect_kind(row.vars(), ObjKind::Angle, "angle equation");
        self.angles.query(row, value)
    }

    /// Assert `Σ c·log v = log constant` over ratio references
    ///
    /// The shadow of a ratio reference is already a logarithm.
    pub fn add_ratio_equation(&mut self, row: &Row<Rational64>, constant: Rational64) -> CoreResult<()> {
        self.expect_kind(row.vars(), ObjKind::Ratio, "ratio equation");
        let residual = self.ratio_residual(row, constant);
        if residual >= self.config.epsilon {
            let claim = Claim::Ratio {
                row: row.clone(),
                constant,
            };
            debug!(%claim, residual, "ratio equation rejected by shadows");
            return Err(CoreError::numeric(claim.to_string(), residual));
        }

        let mut full = row.clone();
        for (p, e) in log_factors(constant) {
            let r = self.prime_ref(p);
            full.add_term(r, -e);
        }
        let update = self.ratios.add(full);
        let emitted: VecDeque<(Ref, Ref)> = update.glued.into_iter().map(|g| (g.a, g.b)).collect();
        self.glue_reaction(emitted);
        self.drain_deductions();
        Ok(())
    }

    pub fn check_ratio_equation(&self, row: &Row<Rational64>, constant: Rational64) -> bool {
        self.expect_kind(row.vars(), ObjKind::Ratio, "ratio equation");
        if !constant.is_positive() {
            return false;
        }
        let mut full = row.clone();
        for (p, e) in log_factors(constant) {
            // a prime never mentioned cannot be proven about
            let Some(&r) = self.primes.get(&p) else {
                return false;
            };
            full.add_term(r, -e);
        }
        self.ratios.query(&full)
    }

    /// Assert a claim; rejected claims leave the core untouched
    pub fn postulate(&mut self, claim: Claim) -> CoreResult<()> {
        match claim {
            Claim::Equal(a, b) => self.glue(a, b),
            Claim::Angle { row, value } => self.add_angle_equation(&row, value),
            Claim::Ratio { row, constant } => self.add_ratio_equation(&row, constant),
        }
    }

    /// Check a claim against the exact knowledge
    pub fn prove(&self, claim: &Claim) -> CoreResult<()> {
        let holds = match claim {
            Claim::Equal(a, b) => self.check_equal(*a, *b),
            Claim::Angle { row, value } => self.check_angle_equation(row, *value),
            Claim::Ratio { row, constant } => self.check_ratio_equation(row, *constant),
        };
        if holds {
            Ok(())
        } else {
            Err(CoreError::logical(claim.to_string()))
        }
    }

    /// An angle reference exactly opposite to `x`, if one is known
    pub fn get_angle_complement(&self, x: Ref) -> Option<Ref> {
        self.expect_kind([x].into_iter(), ObjKind::Angle, "angle complement");
        self.angles.get_complement(x)
    }

    /// Whether two angle references are proven to be the very same angle
    pub fn has_exact_angle_difference(&self, a: Ref, b: Ref) -> bool {
        self.expect_kind([a, b].into_iter(), ObjKind::Angle, "angle difference");
        self.angles.has_exact_difference(a, b)
    }

    pub fn root(&self, a: Ref) -> Ref {
        self.store.root(a)
    }

    pub fn kind(&self, a: Ref) -> ObjKind {
        self.numeric(a).kind()
    }

    pub fn numeric(&self, a: Ref) -> &Numeric {
        match self.numerics.get(a.index()) {
            Some(n) => n,
            None => panic!("reference {} was not allocated by this core", a),
        }
    }

    pub fn num_refs(&self) -> usize {
        self.refs.len()
    }

    pub fn stats(&self) -> CoreStats {
        CoreStats {
            refs: self.store.num_refs(),
            classes: self.store.num_classes(),
            relations: self.store.num_relations(),
            indexed_facts: self.engine.facts().len(),
            angle_rows: self.angles.basis().len(),
            angle_classes: self.angles.num_classes(),
            ratio_rows: self.ratios.len(),
            merges: self.merges,
            rule_firings: self
                .engine
                .firings()
                .iter()
                .map(|(id, n)| (id.to_string(), *n))
                .collect(),
        }
    }

    /// Verify the structural invariants of every component
    pub fn check_invariants(&self) -> Result<(), String> {
        self.angles
            .basis()
            .check_invariants()
            .map_err(|e| format!("angle basis: {}", e))?;
        self.ratios
            .check_invariants()
            .map_err(|e| format!("ratio basis: {}", e))?;
        for fact in self.engine.facts().iter() {
            if fact.terms.iter().any(|&r| !self.store.is_root(r)) {
                return Err(format!("indexed fact {:?} is not canonical", fact));
            }
        }
        if self.engine.num_pending() > 0 {
            return Err(format!("{} deductions left undrained", self.engine.num_pending()));
        }
        Ok(())
    }

    /// Store merges and basis merges until neither has anything left
    fn glue_reaction(&mut self, mut store_queue: VecDeque<(Ref, Ref)>) {
        let mut basis_queue: VecDeque<(Ref, Ref)> = VecDeque::new();
        let mut dissolved: Vec<(Ref, Ref)> = Vec::new();

        loop {
            if let Some((a, b)) = store_queue.pop_front() {
                for (old, new) in self.store.glue(a, b) {
                    self.merges += 1;
                    if self.kind(old).is_algebraic() {
                        basis_queue.push_back((old, new));
                    }
                    dissolved.push((old, new));
                }
                continue;
            }

            if let Some((a, b)) = basis_queue.pop_front() {
                let emitted = match self.kind(a) {
                    ObjKind::Angle => self.angles.glue(a, b),
                    ObjKind::Ratio => self
                        .ratios
                        .add(Row::difference(a, b))
                        .glued
                        .into_iter()
                        .map(|g| (g.a, g.b))
                        .collect(),
                    kind => panic!("merge of {} and {} routed to a basis, but they are {:?}", a, b, kind),
                };
                store_queue.extend(emitted);
                continue;
            }

            break;
        }

        if !dissolved.is_empty() {
            debug!(count = dissolved.len(), "re-keying indexed facts");
            self.engine
                .dissolve(&dissolved, &self.store, &self.numerics, self.config.epsilon);
        }
    }

    /// Apply queued rule actions until the queue runs dry
    fn drain_deductions(&mut self) {
        if !self.engine.begin_drain() {
            return;
        }
        while let Some(Deduction { rule, action }) = self.engine.next_pending() {
            match action {
                Action::Glue(a, b) => {
                    if self.store.is_equal(a, b) {
                        continue;
                    }
                    let residual = self.numeric(a).discrepancy(self.numeric(b));
                    assert!(
                        residual < self.config.epsilon,
                        "rule {} glued {} and {} whose shadows differ by {:e}",
                        rule,
                        a,
                        b,
                        residual
                    );
                    debug!(rule, %a, %b, "rule glue");
                    self.glue_reaction(VecDeque::from([(a, b)]));
                }
                Action::Memoize { label, args, vals } => {
                    let known = self.store.get(&label, &args).map(<[Ref]>::to_vec);
                    match known {
                        Some(known) => {
                            let pairs: VecDeque<(Ref, Ref)> = known
                                .into_iter()
                                .zip(vals)
                                .filter(|(x, y)| x != y)
                                .collect();
                            self.glue_reaction(pairs);
                        }
                        None => {
                            debug!(rule, relation = %label, "rule memo");
                            self.memoize(label, &args, &vals);
                        }
                    }
                }
            }
        }
        self.engine.end_drain();
    }

    fn memoize(&mut self, label: Label, args: &[Ref], vals: &[Ref]) -> bool {
        if !self.store.add(label.clone(), args, vals) {
            return false;
        }
        if label.is_indexed() {
            let fact = Fact::new(label, &self.store.canonical(args), &self.store.canonical(vals));
            self.engine
                .insert(fact, &self.store, &self.numerics, self.config.epsilon);
        }
        true
    }

    fn prime_ref(&mut self, p: u64) -> Ref {
        if let Some(&r) = self.primes.get(&p) {
            return r;
        }
        let r = self.add_obj(Numeric::Ratio((p as f64).ln()));
        self.primes.insert(p, r);
        r
    }

    fn ratio_residual(&self, row: &Row<Rational64>, constant: Rational64) -> f64 {
        if !constant.is_positive() {
            return f64::INFINITY;
        }
        let sum: f64 = row
            .iter()
            .map(|(v, c)| {
                let c = *c.numer() as f64 / *c.denom() as f64;
                c * self.numeric(v).scalar().unwrap_or(f64::NAN)
            })
            .sum();
        let log = (*constant.numer() as f64).ln() - (*constant.denom() as f64).ln();
        (sum - log).abs()
    }

    fn expect_kind(&self, refs: impl Iterator<Item = Ref>, kind: ObjKind, what: &str) {
        for r in refs {
            let actual = self.kind(r);
            assert_eq!(actual, kind, "{} over {} which is {:?}", what, r, actual);
        }
    }
}

impl Default for LogicalCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Prime factorization of a positive rational as `(p, exponent)` pairs
fn log_factors(constant: Rational64) -> Vec<(u64, Rational64)> {
    let mut out = Vec::new();
    for (n, sign) in [(*constant.numer(), 1), (*constant.denom(), -1)] {
        let mut n = n.unsigned_abs();
        let mut p = 2u64;
        while p <= n / p {
            let mut e = 0i64;
            while n % p == 0 {
                n /= p;
                e += 1;
            }
            if e > 0 {
                out.push((p, Rational64::from_integer(sign * e)));
            }
            p += if p == 2 { 1 } else { 2 };
        }
        if n > 1 {
            out.push((n, Rational64::from_integer(sign)));
        }
    }
    out.retain(|(_, e)| !e.is_zero());
    out
}
