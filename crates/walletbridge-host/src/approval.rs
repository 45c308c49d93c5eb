//! Approval queue.
//!
//! Requests that need an explicit user decision wait here until the popup
//! (or any external resolver) settles them. Entries are FIFO; ids start at
//! 100 and are never reused. Each id settles exactly once: resolve, reject,
//! or purge when the originating page context goes away.
//!
//! Only contexts registered with [`ApprovalQueue::open_context`] may enqueue.
//! Closing a context and enqueueing for it take the same lock, so a request
//! still in flight when its page went away is refused instead of left
//! waiting on a decision nobody will deliver.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

use walletbridge_core::{BridgeError, Result};

const FIRST_APPROVAL_ID: u64 = 100;
const NOTICE_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("approval {0} not found")]
    NotFound(u64),
}

/// What the popup renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub id: u64,
    /// Provider request id this approval answers.
    pub request_id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<u64>,
    pub context_id: String,
}

/// Input to [`ApprovalQueue::enqueue`]; the queue assigns the id.
#[derive(Debug, Clone)]
pub struct NewApproval {
    pub request_id: u64,
    pub method: String,
    pub params: Option<Vec<Value>>,
    pub host: String,
    pub tab_id: Option<u64>,
    pub context_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Approved,
    Rejected,
    Purged,
}

impl Settlement {
    pub fn as_str(self) -> &'static str {
        match self {
            Settlement::Approved => "approved",
            Settlement::Rejected => "rejected",
            Settlement::Purged => "purged",
        }
    }
}

/// Broadcast to popup listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalNotice {
    Enqueued(PendingApproval),
    Settled { id: u64, settlement: Settlement },
}

/// Awaits the user's decision for one entry.
pub struct ApprovalTicket {
    pub id: u64,
    rx: oneshot::Receiver<Result<Value>>,
}

impl ApprovalTicket {
    pub async fn wait(self) -> Result<Value> {
        match self.rx.await {
            Ok(res) => res,
            Err(_) => Err(BridgeError::Disconnected(format!("approval {} abandoned", self.id))),
        }
    }
}

struct Entry {
    request: PendingApproval,
    tx: oneshot::Sender<Result<Value>>,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    open_contexts: HashSet<String>,
}

pub struct ApprovalQueue {
    next_id: AtomicU64,
    state: Mutex<QueueState>,
    notices: broadcast::Sender<ApprovalNotice>,
}

impl Default for ApprovalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalQueue {
    pub fn new() -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            next_id: AtomicU64::new(FIRST_APPROVAL_ID),
            state: Mutex::new(QueueState::default()),
            notices,
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("approval queue mutex poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Allow `context_id` to enqueue until it is purged.
    pub fn open_context(&self, context_id: &str) {
        self.state().open_contexts.insert(context_id.to_string());
    }

    pub fn is_context_open(&self, context_id: &str) -> bool {
        self.state().open_contexts.contains(context_id)
    }

    /// The ticket of a closed context is already settled with DISCONNECTED.
    pub fn enqueue(&self, req: NewApproval) -> ApprovalTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = PendingApproval {
            id,
            request_id: req.request_id,
            method: req.method,
            params: req.params,
            host: req.host,
            tab_id: req.tab_id,
            context_id: req.context_id,
        };
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.state();
            if !state.open_contexts.contains(&request.context_id) {
                drop(state);
                tracing::debug!(id, host = %request.host, method = %request.method, context = %request.context_id, "context closed; approval refused");
                let _ = tx.send(Err(BridgeError::Disconnected("requesting context closed".into())));
                return ApprovalTicket { id, rx };
            }
            state.entries.push_back(Entry {
                request: request.clone(),
                tx,
            });
        }
        tracing::info!(id, host = %request.host, method = %request.method, "approval enqueued");
        let _ = self.notices.send(ApprovalNotice::Enqueued(request));

        ApprovalTicket { id, rx }
    }

    pub fn resolve(&self, id: u64, value: Value) -> std::result::Result<(), ApprovalError> {
        self.settle(id, Ok(value), Settlement::Approved)
    }

    pub fn reject(&self, id: u64) -> std::result::Result<(), ApprovalError> {
        self.settle(id, Err(BridgeError::UserRejected), Settlement::Rejected)
    }

    fn settle(
        &self,
        id: u64,
        outcome: Result<Value>,
        settlement: Settlement,
    ) -> std::result::Result<(), ApprovalError> {
        let entry = {
            let mut state = self.state();
            let entries = &mut state.entries;
            let pos = entries
                .iter()
                .position(|e| e.request.id == id)
                .ok_or(ApprovalError::NotFound(id))?;
            entries.remove(pos)
        };
        let Some(entry) = entry else {
            return Err(ApprovalError::NotFound(id));
        };

        tracing::info!(id, host = %entry.request.host, settlement = settlement.as_str(), "approval settled");
        // The requester may have gone away; the entry is settled either way.
        let _ = entry.tx.send(outcome);
        let _ = self.notices.send(ApprovalNotice::Settled { id, settlement });
        Ok(())
    }

    /// Close `context_id` and settle its entries with DISCONNECTED.
    pub fn purge_context(&self, context_id: &str) -> usize {
        let purged = {
            let mut state = self.state();
            state.open_contexts.remove(context_id);
            Self::take_matching(&mut state, |r| r.context_id == context_id)
        };
        self.settle_purged(purged)
    }

    /// Settle every entry from `tab_id` with DISCONNECTED. The tab's
    /// contexts stay open; a reloaded tab may enqueue again.
    pub fn purge_tab(&self, tab_id: u64) -> usize {
        let purged = Self::take_matching(&mut self.state(), |r| r.tab_id == Some(tab_id));
        self.settle_purged(purged)
    }

    fn take_matching(state: &mut QueueState, matches: impl Fn(&PendingApproval) -> bool) -> Vec<Entry> {
        let (gone, keep): (VecDeque<Entry>, VecDeque<Entry>) =
            state.entries.drain(..).partition(|e| matches(&e.request));
        state.entries = keep;
        gone.into_iter().collect()
    }

    fn settle_purged(&self, purged: Vec<Entry>) -> usize {

        for e in &purged {
            tracing::info!(id = e.request.id, host = %e.request.host, "approval purged");
        }
        let n = purged.len();
        for e in purged {
            let id = e.request.id;
            let _ = e.tx.send(Err(BridgeError::Disconnected(
                "requesting context closed".into(),
            )));
            let _ = self.notices.send(ApprovalNotice::Settled {
                id,
                settlement: Settlement::Purged,
            });
        }
        n
    }

    /// Pending entries in FIFO order.
    pub fn list(&self) -> Vec<PendingApproval> {
        self.state().entries.iter().map(|e| e.request.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalNotice> {
        self.notices.subscribe()
    }
}
