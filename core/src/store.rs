//! Union-find over references with memoized relations
//!
//! Every reference points directly at its class root. Relation instances are kept
//! canonical: whenever a class dissolves, the relations it owned are re-keyed and
//! colliding instances glue their values (congruence closure).

use crate::ir::{Label, Ref, RelKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Equality store with congruence closure
#[derive(Debug, Clone, Default)]
pub struct EqualityStore {
    parent: Vec<Ref>,
    /// Members of each root, empty for non-roots
    members: Vec<Vec<Ref>>,
    relations: FxHashMap<RelKey, Vec<Ref>>,
    /// Relation keys mentioning each root in their args or vals
    owned: Vec<FxHashSet<RelKey>>,
}

impl EqualityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a freshly allocated reference known as a singleton class
    pub fn register(&mut self, r: Ref) {
        assert_eq!(
            r.index(),
            self.parent.len(),
            "references must be registered in allocation order"
        );
        self.parent.push(r);
        self.members.push(vec![r]);
        self.owned.push(FxHashSet::default());
    }

    pub fn root(&self, a: Ref) -> Ref {
        match self.parent.get(a.index()) {
            Some(&r) => r,
            None => panic!("reference {} is not registered in the equality store", a),
        }
    }

    pub fn is_equal(&self, a: Ref, b: Ref) -> bool {
        self.root(a) == self.root(b)
    }

    pub fn is_root(&self, a: Ref) -> bool {
        self.root(a) == a
    }

    /// Rewrite references to their roots
    pub fn canonical(&self, refs: &[Ref]) -> Vec<Ref> {
        refs.iter().map(|&r| self.root(r)).collect()
    }

    /// Values memoized for `label(args)`, canonical
    pub fn get(&self, label: &Label, args: &[Ref]) -> Option<&[Ref]> {
        let key = RelKey::new(label.clone(), self.canonical(args));
        self.relations.get(&key).map(Vec::as_slice)
    }

    /// Memoize `label(args) = vals`, returning whether the instance is new
    ///
    /// # Panics
    ///
    /// If `label(args)` is already memoized with different values.
    pub fn add(&mut self, label: Label, args: &[Ref], vals: &[Ref]) -> bool {
        let key = RelKey::new(label, self.canonical(args));
        let vals = self.canonical(vals);
        if let Some(existing) = self.relations.get(&key) {
            if *existing != vals {
                panic!(
                    "relation {} already memoized with {:?}, cannot add {:?}",
                    key, existing, vals
                );
            }
            return false;
        }
        trace!(relation = %key, vals = ?vals, "memoized");
        self.link(key, vals);
        true
    }

    /// Merge the classes of `a` and `b` and close under congruence
    ///
    /// Returns every `(dissolved, survivor)` pair of roots in merge order; empty
    /// if `a` and `b` were already equal.
    pub fn glue(&mut self, a: Ref, b: Ref) -> Vec<(Ref, Ref)> {
        let mut merged = Vec::new();
        let mut queue = VecDeque::from([(a, b)]);

        while let Some((a, b)) = queue.pop_front() {
            let (ra, rb) = (self.root(a), self.root(b));
            if ra == rb {
                continue;
            }

            let wa = self.weight(ra);
            let wb = self.weight(rb);
            let (keep, gone) = if wa > wb || (wa == wb && ra < rb) {
                (ra, rb)
            } else {
                (rb, ra)
            };

            let moved = std::mem::take(&mut self.members[gone.index()]);
            for &m in &moved {
                self.parent[m.index()] = keep;
            }
            self.members[keep.index()].extend(moved);

            let mut keys: Vec<RelKey> = std::mem::take(&mut self.owned[gone.index()])
                .into_iter()
                .collect();
            keys.sort();

            for key in keys {
                let Some(vals) = self.unlink(&key) else {
                    continue;
                };
                let key = RelKey::new(key.label, self.canonical(&key.args));
                let vals = self.canonical(&vals);

                match self.relations.get(&key).cloned() {
                    Some(existing) if existing == vals => {}
                    Some(existing) => {
                        assert_eq!(
                            existing.len(),
                            vals.len(),
                            "relation {} memoized with two different arities",
                            key
                        );
                        for (&x, &y) in existing.iter().zip(&vals) {
                            if x != y {
                                queue.push_back((x, y));
                            }
                        }
                    }
                    None => self.link(key, vals),
                }
            }

            debug!(dissolved = %gone, survivor = %keep, "classes merged");
            merged.push((gone, keep));
        }

        merged
    }

    pub fn num_refs(&self) -> usize {
        self.parent.len()
    }

    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    pub fn num_classes(&self) -> usize {
        self.parent
            .iter()
            .enumerate()
            .filter(|&(i, r)| r.index() == i)
            .count()
    }

    /// Number of references in the class of `root`
    pub fn class_size(&self, root: Ref) -> usize {
        self.members[self.root(root).index()].len()
    }

    fn weight(&self, root: Ref) -> usize {
        self.members[root.index()].len() + self.owned[root.index()].len()
    }

    fn link(&mut self, key: RelKey, vals: Vec<Ref>) {
        for &r in key.args.iter().chain(&vals) {
            self.owned[r.index()].insert(key.clone());
        }
        self.relations.insert(key, vals);
    }

    fn unlink(&mut self, key: &RelKey) -> Option<Vec<Ref>> {
        let vals = self.relations.remove(key)?;
        for &r in key.args.iter().chain(&vals) {
            self.owned[r.index()].remove(key);
        }
        Some(vals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(n: u32) -> (EqualityStore, Vec<Ref>) {
        let mut store = EqualityStore::new();
        let refs: Vec<Ref> = (0..n).map(Ref).collect();
        for &r in &refs {
            store.register(r);
        }
        (store, refs)
    }

    #[test]
    fn test_equivalence_laws() {
        let (mut store, r) = store_with(3);

        assert!(store.is_equal(r[0], r[0]));
        store.glue(r[0], r[1]);
        assert!(store.is_equal(r[1], r[0]));
        store.glue(r[1], r[2]);
        assert!(store.is_equal(r[0], r[2]));
        assert_eq!(store.num_classes(), 1);
        assert_eq!(store.class_size(r[2]), 3);
    }

    #[test]
    fn test_glue_is_idempotent() {
        let (mut store, r) = store_with(2);

        assert_eq!(store.glue(r[0], r[1]), vec![(r[1], r[0])]);
        assert!(store.glue(r[1], r[0]).is_empty());
        assert!(store.glue(r[0], r[0]).is_empty());
    }

    #[test]
    fn test_heavier_class_survives() {
        let (mut store, r) = store_with(4);
        store.glue(r[2], r[3]);

        let merged = store.glue(r[0], r[3]);
        assert_eq!(merged, vec![(r[0], r[2])]);
        assert!(store.is_root(r[2]));
        assert_eq!(store.class_size(r[0]), 3);
    }

    #[test]
    fn test_congruence_closure() {
        let (mut store, r) = store_with(4);
        let (a, b, m1, m2) = (r[0], r[1], r[2], r[3]);
        let mid = Label::named("midpoint");

        assert!(store.add(mid.clone(), &[a], &[m1]));
        assert!(store.add(mid.clone(), &[b], &[m2]));
        assert_eq!(store.num_relations(), 2);

        let merged = store.glue(a, b);
        assert_eq!(merged.len(), 2);
        assert!(store.is_equal(m1, m2));
        assert_eq!(store.num_relations(), 1);
        assert_eq!(store.get(&mid, &[b]), Some(&[store.root(m1)][..]));
    }

    #[test]
    fn test_nested_congruence() {
        let (mut store, r) = store_with(6);
        let (a, b, x, y, p, q) = (r[0], r[1], r[2], r[3], r[4], r[5]);
        let f = Label::named("f");
        let g = Label::named("g");

        store.add(f.clone(), &[a], &[x]);
        store.add(f, &[b], &[y]);
        store.add(g.clone(), &[x], &[p]);
        store.add(g, &[y], &[q]);

        store.glue(a, b);
        assert!(store.is_equal(x, y));
        assert!(store.is_equal(p, q));
    }

    #[test]
    fn test_add_is_canonical() {
        let (mut store, r) = store_with(3);
        store.glue(r[0], r[1]);

        assert!(store.add(Label::LiesOn, &[r[1], r[2]], &[]));
        assert!(!store.add(Label::LiesOn, &[r[0], r[2]], &[]));
        assert!(store.get(&Label::LiesOn, &[r[0], r[2]]).is_some());
        assert!(store.get(&Label::LiesOn, &[r[2], r[0]]).is_none());
    }

    #[test]
    #[should_panic(expected = "already memoized")]
    fn test_conflicting_values_panic() {
        let (mut store, r) = store_with(3);
        store.add(Label::Center, &[r[0]], &[r[1]]);
        store.add(Label::Center, &[r[0]], &[r[2]]);
    }
}
