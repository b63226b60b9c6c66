//! Per-resource execution chains.
//!
//! Each queued operation owns a [`ChainSlot`]. The slot holds a [`Link`] to its
//! predecessor and a sender its successor is listening on. The table stores only
//! the tail link per resource; an entry is removed once its tail settles with no
//! successor behind it.
//!
//! A slot dropped before its turn (its `execute` future was cancelled) hands
//! its pending predecessor link to its successor, or puts it back as the tail
//! if nobody is queued behind it and it has not settled yet. Either way nobody
//! can overtake an operation that is still running.

use std::sync::Arc;

use steward_utils::lock_unpoisoned;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::arbiter::Inner;

#[derive(Debug)]
pub(crate) enum Handoff {
    /// Predecessor finished (success, error or panic): it is our turn.
    Settled,
    /// Predecessor was cancelled while still waiting; keep waiting on this.
    Inherit(Link),
}

#[derive(Debug)]
pub(crate) struct Link {
    pub(crate) ticket: u64,
    pub(crate) settled: oneshot::Receiver<Handoff>,
}

#[derive(Debug)]
pub(crate) struct ChainSlot {
    inner: Arc<Inner>,
    resource: String,
    ticket: u64,
    waiting: Option<Link>,
    done: Option<oneshot::Sender<Handoff>>,
    turn_reached: bool,
}

impl ChainSlot {
    pub(crate) fn new(
        inner: Arc<Inner>,
        resource: String,
        ticket: u64,
        waiting: Option<Link>,
        done: oneshot::Sender<Handoff>,
    ) -> Self {
        Self {
            inner,
            resource,
            ticket,
            waiting,
            done: Some(done),
            turn_reached: false,
        }
    }

    /// Wait until every operation queued earlier on this resource has settled.
    ///
    /// Cancellation safe: the pending link stays in `self.waiting` until its
    /// receiver resolves.
    pub(crate) async fn wait_turn(&mut self) {
        while let Some(link) = self.waiting.as_mut() {
            let handoff = (&mut link.settled).await;
            self.waiting = match handoff {
                Ok(Handoff::Inherit(next)) => Some(next),
                // A dropped sender means the predecessor is gone; nothing left to wait for.
                Ok(Handoff::Settled) | Err(_) => None,
            };
        }
        self.turn_reached = true;
    }
}

impl Drop for ChainSlot {
    fn drop(&mut self) {
        let pending = if self.turn_reached {
            None
        } else {
            self.waiting.take()
        };

        // Tail check and hand-off happen under one lock so a concurrent enqueue
        // either sees us as tail or has already taken our receiver.
        let mut state = lock_unpoisoned(&self.inner.state);
        let is_tail = state
            .chains
            .get(&self.resource)
            .is_some_and(|tail| tail.ticket == self.ticket);

        if is_tail {
            match pending.and_then(unsettled) {
                Some(link) => {
                    state.chains.insert(self.resource.clone(), link);
                }
                None => {
                    state.chains.remove(&self.resource);
                    tracing::trace!(resource = %self.resource, "Chain drained");
                }
            }
        } else if let Some(done) = self.done.take() {
            let handoff = pending.map_or(Handoff::Settled, Handoff::Inherit);
            // The successor may itself have been dropped; nothing to do then.
            let _ = done.send(handoff);
        }
    }
}

/// Follow `link` through any hand-offs already delivered; `None` once the chain
/// ahead of it has fully settled.
fn unsettled(mut link: Link) -> Option<Link> {
    loop {
        match link.settled.try_recv() {
            Ok(Handoff::Inherit(next)) => link = next,
            Ok(Handoff::Settled) | Err(TryRecvError::Closed) => return None,
            Err(TryRecvError::Empty) => return Some(link),
        }
    }
}
