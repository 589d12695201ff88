//! The in-memory record slot and its transaction wait chain.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};

use crate::tx::{ChainLink, Tx};

/// Payload and version of a row, guarded by the row's reader/writer lock.
pub(crate) struct RowState<R> {
    pub(crate) payload: Option<R>,
    /// Strictly monotone across commits. `0` marks a reservation or a
    /// tombstone, never a committed record.
    pub(crate) cas: u64,
}

/// The sole authoritative container of one committed record.
///
/// Rows are opaque outside the crate: index containers store `Arc<Row<R>>`
/// purely as a value to keep and compare by identity.
pub struct Row<R> {
    state: RwLock<RowState<R>>,
    chain: Chain,
}

/// Head of the row's wait chain: the tokens currently visiting the row.
///
/// The chain is not a lock: [`Chain::acquire`] never blocks. It is an
/// ownership registry that turns "this transaction would block on itself"
/// into an observable boolean, which the engine uses to choose rollback
/// over blocking.
#[derive(Default)]
struct Chain {
    head: Mutex<Option<Arc<ChainLink>>>,
}

/// Every chain operation, on every row, runs under this one lock.
///
/// The scan and the push that follows it have to be one atomic step
/// *across rows*: with row-local locking, two writers probing each other's
/// rows can each scan the foreign chain before the other's push lands,
/// both push, and both fall asleep on the foreign row lock. Serializing
/// the scans guarantees the second one sees the first one's splice and
/// detects itself. The critical section is a short pointer walk.
static CHAINS: Mutex<()> = Mutex::new(());

impl Chain {
    /// Pushes `tx` onto the chain unless it is already reachable from the
    /// head, in which case nothing changes and `false` is reported.
    ///
    /// The token's link is pointed at the previous head rather than
    /// cleared, so a token visiting several rows splices their chains:
    /// a membership scan on one row then also walks the visitors of the
    /// rows its own visitors are waiting on. That transitivity is what
    /// lets two cross-locked writers discover each other.
    fn acquire(&self, tx: &Tx) -> bool {
        let _serial = CHAINS.lock();
        let mut head = self.head.lock();
        let mut cursor = head.clone();
        while let Some(link) = cursor {
            if Arc::ptr_eq(&link, &tx.node) {
                return false;
            }
            cursor = link.next.lock().clone();
        }
        let rest = head.take();
        *tx.node.next.lock() = rest;
        *head = Some(Arc::clone(&tx.node));
        true
    }

    /// Unlinks `tx` from the chain.
    ///
    /// # Panics
    ///
    /// If the token is not on the chain. Releasing an unheld token is a
    /// contract violation, not a runtime condition.
    fn release(&self, tx: &Tx) {
        let _serial = CHAINS.lock();
        let mut head = self.head.lock();
        if let Some(first) = head.as_ref() {
            if Arc::ptr_eq(first, &tx.node) {
                let rest = tx.node.next.lock().take();
                *head = rest;
                return;
            }
        }
        let mut link = head.clone();
        while let Some(current) = link {
            let next = current.next.lock().clone();
            if let Some(found) = next.as_ref() {
                if Arc::ptr_eq(found, &tx.node) {
                    let rest = tx.node.next.lock().take();
                    *current.next.lock() = rest;
                    return;
                }
            }
            link = next;
        }
        panic!("released a transaction token that was never acquired");
    }
}

impl<R> Row<R> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Row {
            state: RwLock::new(RowState {
                payload: None,
                cas: 0,
            }),
            chain: Chain::default(),
        })
    }

    /// Registers `tx` as a visitor and takes the row exclusively.
    ///
    /// # Panics
    ///
    /// If `tx` is already visiting the row. Callers must probe with
    /// [`Row::committed`] or [`Row::fetch`] first; locking through a
    /// re-entry would either self-deadlock or bypass write exclusion.
    pub(crate) fn lock<'a>(&'a self, tx: &'a Tx) -> RowGuard<'a, R> {
        assert!(
            self.chain.acquire(tx),
            "re-entrant lock on a row this transaction already holds"
        );
        RowGuard {
            row: self,
            tx,
            state: Some(self.state.write()),
        }
    }

    /// Whether the row holds a committed record.
    ///
    /// Same-tx re-entry reports `true`: a row this transaction is already
    /// visiting has to look like a foreign commit so the caller backs off
    /// and rolls back instead of blocking on a lock it may itself hold.
    /// Treating re-entry as "retry" instead would reinstate the
    /// cross-collision deadlock this chain exists to break.
    pub(crate) fn committed(&self, tx: &Tx) -> bool {
        if !self.chain.acquire(tx) {
            return true;
        }
        let committed = self.state.read().cas > 0;
        self.chain.release(tx);
        committed
    }

    /// Reads `(payload, cas)` under the shared lock.
    ///
    /// Reservations, tombstones and same-tx re-entry all read as absent;
    /// on re-entry the shared lock is not even attempted, since this
    /// transaction may hold the row exclusively elsewhere.
    pub(crate) fn fetch(&self, tx: &Tx) -> Option<(R, u64)>
    where
        R: Clone,
    {
        if !self.chain.acquire(tx) {
            return None;
        }
        let found = {
            let state = self.state.read();
            match (&state.payload, state.cas) {
                (Some(payload), cas) if cas > 0 => Some((payload.clone(), cas)),
                _ => None,
            }
        };
        self.chain.release(tx);
        found
    }

    /// Snapshot without a token, for enumeration. May block briefly behind
    /// a writer.
    pub(crate) fn peek(&self) -> Option<(R, u64)>
    where
        R: Clone,
    {
        let state = self.state.read();
        match (&state.payload, state.cas) {
            (Some(payload), cas) if cas > 0 => Some((payload.clone(), cas)),
            _ => None,
        }
    }
}

/// Exclusive access to a row's state, bound to the visiting transaction.
///
/// Dropping the guard releases the write lock first and unlinks the token
/// from the wait chain second.
pub(crate) struct RowGuard<'a, R> {
    row: &'a Row<R>,
    tx: &'a Tx,
    state: Option<RwLockWriteGuard<'a, RowState<R>>>,
}

impl<R> Deref for RowGuard<'_, R> {
    type Target = RowState<R>;

    fn deref(&self) -> &RowState<R> {
        self.state.as_deref().expect("row guard already released")
    }
}

impl<R> DerefMut for RowGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut RowState<R> {
        self.state
            .as_deref_mut()
            .expect("row guard already released")
    }
}

impl<R> Drop for RowGuard<'_, R> {
    fn drop(&mut self) {
        self.state.take();
        self.row.chain.release(self.tx);
    }
}
