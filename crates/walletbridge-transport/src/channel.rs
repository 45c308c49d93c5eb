//! Channel abstraction.
//!
//! A channel is one direction of a byte pipe (`post`) plus the receiving half
//! handed to the messenger at start. Real deployments back it with a
//! WebSocket; tests and single-process setups use [`memory::pair`].

use async_trait::async_trait;
use bytes::Bytes;

use walletbridge_core::Result;

/// Who posted an inbound frame, when the carrier knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderInfo {
    /// Page URL of the sending context.
    pub url: Option<String>,
    pub tab_id: Option<u64>,
    /// Unique per connected context.
    pub context_id: String,
}

/// One inbound frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Bytes,
    pub sender: Option<SenderInfo>,
}

/// Outbound half of a channel.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the other side currently exists.
    fn is_open(&self) -> bool;

    async fn post(&self, bytes: Bytes) -> Result<()>;
}

pub mod memory {
    //! In-process channel pair.

    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use walletbridge_core::{BridgeError, Result};

    use super::{Channel, Frame, SenderInfo};

    const CAPACITY: usize = 1024;

    /// Sends into the peer's inbound queue, stamping frames with this end's
    /// identity.
    pub struct MemoryChannel {
        name: String,
        tx: mpsc::Sender<Frame>,
        stamp: Option<SenderInfo>,
    }

    #[async_trait]
    impl Channel for MemoryChannel {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_open(&self) -> bool {
            !self.tx.is_closed()
        }

        async fn post(&self, bytes: Bytes) -> Result<()> {
            self.tx
                .send(Frame {
                    bytes,
                    sender: self.stamp.clone(),
                })
                .await
                .map_err(|_| BridgeError::Disconnected(format!("{}: peer gone", self.name)))
        }
    }

    /// One side of a pair: where to post, and where frames arrive.
    pub struct End {
        pub channel: Arc<MemoryChannel>,
        pub inbound: mpsc::Receiver<Frame>,
    }

    /// Connected pair. Frames posted by `left` arrive on `right.inbound`
    /// stamped with `left_info`, and vice versa.
    pub fn pair(left_info: Option<SenderInfo>, right_info: Option<SenderInfo>) -> (End, End) {
        let (to_right, right_rx) = mpsc::channel(CAPACITY);
        let (to_left, left_rx) = mpsc::channel(CAPACITY);
        let left = End {
            channel: Arc::new(MemoryChannel {
                name: "memory:left".into(),
                tx: to_right,
                stamp: left_info,
            }),
            inbound: left_rx,
        };
        let right = End {
            channel: Arc::new(MemoryChannel {
                name: "memory:right".into(),
                tx: to_left,
                stamp: right_info,
            }),
            inbound: right_rx,
        };
        (left, right)
    }
}
