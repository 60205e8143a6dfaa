//! Immutable keyed view over one side's transactions.

use crate::engine::error::EngineError;
use crate::models::{Side, Transaction, TransactionRecord};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Transactions of one system keyed by `transaction_id`.
///
/// Duplicate ids resolve last-write-wins: the later record replaces the
/// earlier one but keeps the slot of the first occurrence, so iteration
/// order is input order of first appearance.
#[derive(Debug, Clone)]
pub struct TransactionSet {
    side: Side,
    entries: Vec<Transaction>,
    index: HashMap<String, usize>,
}

impl TransactionSet {
    /// Build a set from ordered input records.
    ///
    /// A record without a (non-blank) `transaction_id` fails the whole build
    /// with [`EngineError::MalformedRecord`].
    pub fn from_records<I>(side: Side, records: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = TransactionRecord>,
    {
        let records = records.into_iter();
        let (lower, _) = records.size_hint();
        let mut entries: Vec<Transaction> = Vec::with_capacity(lower);
        let mut index: HashMap<String, usize> = HashMap::with_capacity(lower);

        for (position, record) in records.enumerate() {
            let transaction_id = match record.transaction_id {
                Some(id) if !id.trim().is_empty() => id,
                Some(_) => {
                    return Err(EngineError::MalformedRecord {
                        side,
                        index: position,
                        reason: "transaction_id is blank",
                    })
                }
                None => {
                    return Err(EngineError::MalformedRecord {
                        side,
                        index: position,
                        reason: "transaction_id is missing",
                    })
                }
            };

            let transaction = Transaction {
                transaction_id,
                amount: record.amount,
                currency: record.currency,
                status: record.status,
            };

            match index.entry(transaction.transaction_id.clone()) {
                Entry::Occupied(slot) => entries[*slot.get()] = transaction,
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                    entries.push(transaction);
                }
            }
        }

        Ok(Self {
            side,
            entries,
            index,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Number of distinct transaction ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, transaction_id: &str) -> Option<&Transaction> {
        self.index.get(transaction_id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, transaction_id: &str) -> bool {
        self.index.contains_key(transaction_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.entries.iter()
    }
}
