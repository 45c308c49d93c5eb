//! A messenger bound to one topic and one payload/response type pair.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use walletbridge_core::protocol::envelope::CorrelationId;
use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse};
use walletbridge_core::Result;

use crate::messenger::{Messenger, ReplyMeta};

/// Provider requests (page -> background).
pub const PROVIDER_REQUEST_TOPIC: &str = "providerRequest";
/// Default-provider toggle (background -> page).
pub const SET_DEFAULT_PROVIDER_TOPIC: &str = "walletbridge_setDefaultProvider";

pub struct Transport<P, R> {
    messenger: Arc<Messenger>,
    topic: String,
    _types: PhantomData<fn(P) -> R>,
}

impl<P, R> Clone for Transport<P, R> {
    fn clone(&self) -> Self {
        Self {
            messenger: Arc::clone(&self.messenger),
            topic: self.topic.clone(),
            _types: PhantomData,
        }
    }
}

impl<P, R> Transport<P, R>
where
    P: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + 'static,
{
    pub fn new(messenger: Arc<Messenger>, topic: impl Into<String>) -> Self {
        Self {
            messenger,
            topic: topic.into(),
            _types: PhantomData,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn messenger(&self) -> &Arc<Messenger> {
        &self.messenger
    }

    pub async fn send(&self, payload: &P, id: Option<CorrelationId>) -> Result<R> {
        self.messenger.send(&self.topic, payload, id).await
    }

    pub fn reply<F, Fut>(&self, handler: F)
    where
        F: Fn(P, ReplyMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.messenger.reply(&self.topic, handler);
    }
}

pub type ProviderTransport = Transport<ProviderRequest, ProviderResponse>;

/// `true` makes the wallet's provider the page's `ethereum`.
pub type DefaultProviderTransport = Transport<bool, ()>;

pub fn provider_transport(messenger: Arc<Messenger>) -> ProviderTransport {
    Transport::new(messenger, PROVIDER_REQUEST_TOPIC)
}

pub fn default_provider_transport(messenger: Arc<Messenger>) -> DefaultProviderTransport {
    Transport::new(messenger, SET_DEFAULT_PROVIDER_TOPIC)
}
