use std::collections::{BTreeMap, HashMap};

use crate::client::ClientRequest;

/// Bounded set of in-flight requests keyed by transaction id.
///
/// Entries are kept in insertion order; once the table holds more than
/// `capacity` requests the oldest inserted one is dropped. Transaction ids
/// wrap, so insertion order is tracked with a separate sequence number.
#[derive(Debug)]
pub struct TransactionTable {
    capacity: usize,
    next_seq: u64,
    by_seq: BTreeMap<u64, ClientRequest>,
    seq_by_id: HashMap<u16, u64>,
}

impl TransactionTable {
    pub fn new(capacity: usize) -> Self {
        TransactionTable {
            capacity,
            next_seq: 0,
            by_seq: BTreeMap::new(),
            seq_by_id: HashMap::with_capacity(capacity),
        }
    }

    /// Append `request`, returning the entry evicted to stay within capacity.
    pub fn insert(&mut self, request: ClientRequest) -> Option<ClientRequest> {
        let id = request.transaction_id();
        if let Some(stale_seq) = self.seq_by_id.remove(&id) {
            tracing::error!(transaction_id = id, "transaction id reused while still pending");
            self.by_seq.remove(&stale_seq);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_by_id.insert(id, seq);
        self.by_seq.insert(seq, request);

        if self.by_seq.len() > self.capacity {
            let (_, oldest) = self.by_seq.pop_first()?;
            self.seq_by_id.remove(&oldest.transaction_id());
            return Some(oldest);
        }
        None
    }

    /// Remove and return the pending request with `transaction_id`.
    pub fn take(&mut self, transaction_id: u16) -> Option<ClientRequest> {
        let seq = self.seq_by_id.remove(&transaction_id)?;
        let request = self.by_seq.remove(&seq);
        debug_assert!(request.is_some(), "transaction index out of sync");
        request
    }

    pub fn contains(&self, transaction_id: u16) -> bool {
        self.seq_by_id.contains_key(&transaction_id)
    }

    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pending transaction ids, oldest first.
    pub fn pending_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.by_seq.values().map(|r| r.transaction_id())
    }
}
