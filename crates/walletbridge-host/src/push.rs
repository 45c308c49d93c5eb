//! Ordered per-host push delivery.
//!
//! Every host gets one worker task. The worker takes events in issuance
//! order, sends each to all page contexts of that host, and waits for their
//! acknowledgements (bounded by `ack_timeout`) before taking the next one.
//! Contexts that attach later only see later events.
//!
//! A host's worker exits once its last context detaches and its queue is
//! drained; the next push for that host starts a fresh one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::mpsc;

use walletbridge_core::protocol::push::PushEvent;
use walletbridge_transport::Messenger;

use crate::obs::metrics::HostMetrics;

#[derive(Clone)]
struct PushTarget {
    host: String,
    messenger: Arc<Messenger>,
}

struct PushInner {
    contexts: DashMap<String, PushTarget>,
    workers: DashMap<String, mpsc::UnboundedSender<PushEvent>>,
    ack_timeout: Duration,
    metrics: Arc<HostMetrics>,
}

#[derive(Clone)]
pub struct PushHub {
    inner: Arc<PushInner>,
}

impl PushHub {
    pub fn new(ack_timeout: Duration, metrics: Arc<HostMetrics>) -> Self {
        Self {
            inner: Arc::new(PushInner {
                contexts: DashMap::new(),
                workers: DashMap::new(),
                ack_timeout,
                metrics,
            }),
        }
    }

    pub fn attach(&self, context_id: &str, host: &str, messenger: Arc<Messenger>) {
        self.inner.contexts.insert(
            context_id.to_string(),
            PushTarget {
                host: host.to_string(),
                messenger,
            },
        );
    }

    /// Returns the host the context belonged to.
    pub fn detach(&self, context_id: &str) -> Option<String> {
        let (_, target) = self.inner.contexts.remove(context_id)?;
        if self.contexts_for(&target.host) == 0 && self.inner.workers.remove(&target.host).is_some() {
            tracing::debug!(host = %target.host, "last context gone; push worker released");
        }
        Some(target.host)
    }

    pub fn worker_count(&self) -> usize {
        self.inner.workers.len()
    }

    pub fn context_count(&self) -> usize {
        self.inner.contexts.len()
    }

    pub fn contexts_for(&self, host: &str) -> usize {
        self.inner.contexts.iter().filter(|e| e.host == host).count()
    }

    /// Queue `event` for every context of `host`.
    pub fn push(&self, host: &str, event: PushEvent) {
        tracing::debug!(%host, topic = %event.topic(host), "push queued");
        let tx = self
            .inner
            .workers
            .entry(host.to_string())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(worker(Arc::clone(&self.inner), host.to_string(), rx));
                tx
            })
            .clone();
        if tx.send(event).is_err() {
            tracing::warn!(%host, "push worker gone; event dropped");
        }
    }
}

async fn worker(inner: Arc<PushInner>, host: String, mut rx: mpsc::UnboundedReceiver<PushEvent>) {
    while let Some(event) = rx.recv().await {
        let targets: Vec<Arc<Messenger>> = inner
            .contexts
            .iter()
            .filter(|e| e.host == host)
            .map(|e| Arc::clone(&e.messenger))
            .collect();
        if targets.is_empty() {
            tracing::debug!(%host, kind = event.kind().as_str(), "no page context; push skipped");
            continue;
        }

        let topic = event.topic(&host);
        let payload = event.payload();
        let ack_timeout = inner.ack_timeout;
        let sends = targets.iter().map(|m| {
            let topic = topic.clone();
            let payload = payload.clone();
            async move {
                tokio::time::timeout(ack_timeout, m.send_value(&topic, payload, None)).await
            }
        });

        for res in join_all(sends).await {
            match res {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(%host, %topic, error = %e, "push not acknowledged"),
                Err(_) => {
                    inner
                        .metrics
                        .push_ack_timeouts
                        .inc(&[("kind", event.kind().as_str())]);
                    tracing::warn!(%host, %topic, "push ack timeout");
                }
            }
        }
    }
}
