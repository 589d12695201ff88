use std::sync::Arc;

use parking_lot::Mutex;

/// The identity of one in-flight operation.
///
/// A token is what rows record on their wait chains; it carries no state
/// beyond the single chain link and compares by identity. Create one per
/// top-level [`put`](crate::Collection::put), [`get`](crate::Collection::get)
/// or [`delete`](crate::Collection::delete) call. A token must not be used
/// from two threads at once; reusing it for sequential calls is fine.
#[derive(Default)]
pub struct Tx {
    pub(crate) node: Arc<ChainLink>,
}

impl Tx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// One link in a row's wait chain.
///
/// The link is the token's only state. Pointing it at another visitor is
/// how chains splice across rows (see the chain notes in `row.rs`).
#[derive(Default)]
pub(crate) struct ChainLink {
    pub(crate) next: Mutex<Option<Arc<ChainLink>>>,
}
