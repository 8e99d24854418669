//! Process-wide interning table for plan nodes.
//!
//! Structurally identical nodes built independently resolve to one shared
//! allocation. Entries are weak: the cache never keeps a node alive, and dead
//! entries are pruned every [`PRUNE_INTERVAL`] insertions.

use super::expr::ExprNode;
use super::rel::RelNode;
use log::trace;
use parking_lot::RwLock;
use qv_core::NodeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Number of insertions between sweeps of dead entries
pub const PRUNE_INTERVAL: usize = 4096;

type Table<T> = RwLock<HashMap<NodeId, Weak<T>>>;

/// Deduplication cache keyed by structural id
pub struct NodeCache {
    rels: Table<RelNode>,
    exprs: Table<ExprNode>,
    inserts: AtomicUsize,
}

/// Live entry counts, as reported by [`NodeCache::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live relational nodes
    pub rels: usize,
    /// Live scalar nodes
    pub exprs: usize,
}

impl NodeCache {
    fn new() -> Self {
        Self {
            rels: RwLock::new(HashMap::new()),
            exprs: RwLock::new(HashMap::new()),
            inserts: AtomicUsize::new(0),
        }
    }

    /// The shared cache used by every node constructor
    pub fn global() -> &'static NodeCache {
        static CACHE: OnceLock<NodeCache> = OnceLock::new();
        CACHE.get_or_init(NodeCache::new)
    }

    pub(crate) fn intern_rel(&self, id: NodeId, make: impl FnOnce() -> RelNode) -> Arc<RelNode> {
        let (node, inserted) = intern(&self.rels, id, make);
        if inserted {
            self.after_insert();
        }
        node
    }

    pub(crate) fn intern_expr(&self, id: NodeId, make: impl FnOnce() -> ExprNode) -> Arc<ExprNode> {
        let (node, inserted) = intern(&self.exprs, id, make);
        if inserted {
            self.after_insert();
        }
        node
    }

    fn after_insert(&self) {
        let n = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PRUNE_INTERVAL == 0 {
            self.prune();
        }
    }

    /// Drop entries whose node has been freed; returns how many were removed
    pub fn prune(&self) -> usize {
        let removed = prune_table(&self.rels) + prune_table(&self.exprs);
        trace!("Node cache pruned {} dead entries", removed);
        removed
    }

    /// Count live entries
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            rels: live_count(&self.rels),
            exprs: live_count(&self.exprs),
        }
    }
}

fn intern<T>(table: &Table<T>, id: NodeId, make: impl FnOnce() -> T) -> (Arc<T>, bool) {
    if let Some(existing) = table.read().get(&id).and_then(Weak::upgrade) {
        return (existing, false);
    }

    let mut guard = table.write();
    // Another thread may have inserted between the two locks
    if let Some(existing) = guard.get(&id).and_then(Weak::upgrade) {
        return (existing, false);
    }
    let node = Arc::new(make());
    guard.insert(id, Arc::downgrade(&node));
    (node, true)
}

fn prune_table<T>(table: &Table<T>) -> usize {
    let mut guard = table.write();
    let before = guard.len();
    guard.retain(|_, weak| weak.strong_count() > 0);
    before - guard.len()
}

fn live_count<T>(table: &Table<T>) -> usize {
    table
        .read()
        .values()
        .filter(|weak| weak.strong_count() > 0)
        .count()
}
