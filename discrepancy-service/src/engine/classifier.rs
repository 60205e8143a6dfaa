//! Turns a key partition into typed discrepancies.

use crate::engine::differ::KeyPartition;
use crate::engine::transaction_set::TransactionSet;
use crate::models::{DiscrepancyType, NewDiscrepancy, Transaction};

/// Classify every key of `partition`.
///
/// Output order is `only_a`, then `only_b`, then `common`, each in partition
/// order; `seq` numbers the output from 0. Consumers must not attach meaning
/// to that order beyond it being stable for a given input.
///
/// Amounts compare with exact decimal equality (`10` == `10.00`), statuses
/// with case-sensitive string equality. A common key can yield one
/// `amount_mismatch` and one `status_mismatch`, never more.
pub fn classify(
    a: &TransactionSet,
    b: &TransactionSet,
    partition: &KeyPartition<'_>,
) -> Vec<NewDiscrepancy> {
    let mut out = Vec::with_capacity(partition.only_a.len() + partition.only_b.len());

    for key in &partition.only_a {
        if let Some(ta) = a.get(key) {
            let seq = out.len() as i64;
            out.push(missing(seq, ta, DiscrepancyType::MissingInB));
        }
    }

    for key in &partition.only_b {
        if let Some(tb) = b.get(key) {
            let seq = out.len() as i64;
            out.push(missing(seq, tb, DiscrepancyType::MissingInA));
        }
    }

    for key in &partition.common {
        let (Some(ta), Some(tb)) = (a.get(key), b.get(key)) else {
            continue;
        };

        if ta.amount != tb.amount {
            out.push(NewDiscrepancy {
                seq: out.len() as i64,
                transaction_id: ta.transaction_id.clone(),
                discrepancy_type: DiscrepancyType::AmountMismatch,
                amount_a: ta.amount,
                amount_b: tb.amount,
                status_a: ta.status.clone(),
                status_b: tb.status.clone(),
                currency: ta.currency.clone(),
            });
        }

        if ta.status != tb.status {
            out.push(NewDiscrepancy {
                seq: out.len() as i64,
                transaction_id: ta.transaction_id.clone(),
                discrepancy_type: DiscrepancyType::StatusMismatch,
                amount_a: None,
                amount_b: None,
                status_a: ta.status.clone(),
                status_b: tb.status.clone(),
                currency: ta.currency.clone(),
            });
        }
    }

    out
}

/// A one-sided discrepancy carrying the present side's fields.
fn missing(seq: i64, t: &Transaction, discrepancy_type: DiscrepancyType) -> NewDiscrepancy {
    let (amount_a, amount_b, status_a, status_b) = match discrepancy_type {
        DiscrepancyType::MissingInB => (t.amount, None, t.status.clone(), None),
        _ => (None, t.amount, None, t.status.clone()),
    };

    NewDiscrepancy {
        seq,
        transaction_id: t.transaction_id.clone(),
        discrepancy_type,
        amount_a,
        amount_b,
        status_a,
        status_b,
        currency: t.currency.clone(),
    }
}
