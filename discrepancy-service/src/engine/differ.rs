//! Key-set difference between two transaction sets.

use crate::engine::transaction_set::TransactionSet;

/// The three disjoint key groups of `keys(A) ∪ keys(B)`.
///
/// `only_a` and `common` follow A's iteration order, `only_b` follows B's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPartition<'a> {
    pub only_a: Vec<&'a str>,
    pub only_b: Vec<&'a str>,
    pub common: Vec<&'a str>,
}

impl KeyPartition<'_> {
    /// Size of the key union.
    pub fn total(&self) -> usize {
        self.only_a.len() + self.only_b.len() + self.common.len()
    }
}

/// Partition keys in O(|A| + |B|) using the sets' hash indexes.
pub fn diff<'a>(a: &'a TransactionSet, b: &'a TransactionSet) -> KeyPartition<'a> {
    let mut partition = KeyPartition {
        only_a: Vec::new(),
        only_b: Vec::new(),
        common: Vec::with_capacity(a.len().min(b.len())),
    };

    for t in a.iter() {
        let key = t.transaction_id.as_str();
        if b.contains(key) {
            partition.common.push(key);
        } else {
            partition.only_a.push(key);
        }
    }

    for t in b.iter() {
        let key = t.transaction_id.as_str();
        if !a.contains(key) {
            partition.only_b.push(key);
        }
    }

    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::record;
    use crate::models::Side;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn set(side: Side, ids: &[&str]) -> TransactionSet {
        TransactionSet::from_records(
            side,
            ids.iter().map(|id| record(id, dec!(1), "ok")).collect::<Vec<_>>(),
        )
        .unwrap()
    }

    #[test]
    fn groups_partition_the_key_union() {
        let a = set(Side::SystemA, &["T1", "T2", "T3", "T5"]);
        let b = set(Side::SystemB, &["T2", "T4", "T5", "T6"]);
        let p = diff(&a, &b);

        assert_eq!(p.only_a, vec!["T1", "T3"]);
        assert_eq!(p.only_b, vec!["T4", "T6"]);
        assert_eq!(p.common, vec!["T2", "T5"]);

        let union: HashSet<&str> = a
            .iter()
            .chain(b.iter())
            .map(|t| t.transaction_id.as_str())
            .collect();
        let mut seen = HashSet::new();
        for key in p.only_a.iter().chain(&p.only_b).chain(&p.common) {
            assert!(seen.insert(*key), "{key} appears in more than one group");
        }
        assert_eq!(seen, union);
        assert_eq!(p.total(), union.len());
    }

    #[test]
    fn empty_sides() {
        let a = set(Side::SystemA, &["T1"]);
        let b = set(Side::SystemB, &[]);
        let p = diff(&a, &b);
        assert_eq!(p.only_a, vec!["T1"]);
        assert!(p.only_b.is_empty());
        assert!(p.common.is_empty());

        let p = diff(&b, &b);
        assert_eq!(p.total(), 0);
    }

    #[test]
    fn duplicates_do_not_inflate_groups() {
        let a = set(Side::SystemA, &["T1", "T1", "T1"]);
        let b = set(Side::SystemB, &["T1"]);
        let p = diff(&a, &b);
        assert_eq!(p.common, vec!["T1"]);
        assert_eq!(p.total(), 1);
    }
}
