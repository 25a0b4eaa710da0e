// src/mirror/coalesce.rs

//! Per-identity mirror coalescing (singleflight pattern)
//!
//! When multiple requests race to mirror the same missing package, this
//! module ensures only one download/index attempt is made. The other callers
//! wait for the in-flight operation and share its outcome.

use crate::identity::PackageIdentity;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

use super::MirrorOutcome;

/// Coalesces concurrent mirror operations for the same package identity
///
/// If a mirror of an identity is in progress, subsequent calls for that
/// identity wait for its outcome rather than starting a duplicate
/// download. Different identities never contend.
pub struct MirrorCoalescer {
    /// In-flight mirrors (identity -> broadcast sender)
    inflight: DashMap<PackageIdentity, broadcast::Sender<MirrorOutcome>>,
    /// Count of coalesced (deduplicated) mirror calls
    coalesced_count: AtomicU64,
}

impl MirrorCoalescer {
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
            coalesced_count: AtomicU64::new(0),
        }
    }

    /// Run `mirror_op` for `identity` unless one is already in flight
    ///
    /// Returns the outcome of either this call's own operation or the
    /// in-flight one it joined.
    pub async fn coalesce<F, Fut>(&self, identity: &PackageIdentity, mirror_op: F) -> MirrorOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MirrorOutcome>,
    {
        // A single entry() call both checks for an in-flight mirror and
        // reserves the slot; two racing first callers cannot both win
        let tx = loop {
            match self.inflight.entry(identity.clone()) {
                Entry::Occupied(entry) => {
                    let mut rx = entry.get().subscribe();
                    drop(entry); // Release map shard lock before awaiting

                    debug!("Coalescing mirror of {}", identity);
                    self.coalesced_count.fetch_add(1, Ordering::Relaxed);

                    match rx.recv().await {
                        Ok(outcome) => return outcome,
                        Err(_) => {
                            // Sender dropped without broadcasting; contend
                            // for the slot again
                            debug!("In-flight mirror of {} vanished, retrying", identity);
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    let (tx, _rx) = broadcast::channel(1);
                    entry.insert(tx.clone());
                    break tx;
                }
            }
        };

        let outcome = mirror_op().await;

        // Ignore send errors: no waiters is fine
        let _ = tx.send(outcome.clone());
        self.inflight.remove(identity);

        outcome
    }

    /// Number of mirror calls that joined an in-flight operation
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced_count.load(Ordering::Relaxed)
    }

    /// Number of currently in-flight mirror operations
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}

impl Default for MirrorCoalescer {
    fn default() -> Self {
        Self::new()
    }
}
