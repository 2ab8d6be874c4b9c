//! Id to consumer lookup used as the scheduler's refresher.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::RefreshError;
use crate::scheduler::Refresher;

/// Something that can re-read its own state.
#[async_trait]
pub trait RefreshConsumer: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<()>;
}

/// Registered consumers by id.
///
/// Unknown ids report [`RefreshError::NotFound`], which makes the scheduler
/// drop them.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: RwLock<HashMap<String, Arc<dyn RefreshConsumer>>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a consumer.
    pub fn insert(&self, consumer_id: impl Into<String>, consumer: Arc<dyn RefreshConsumer>) {
        self.consumers.write().insert(consumer_id.into(), consumer);
    }

    pub fn remove(&self, consumer_id: &str) -> Option<Arc<dyn RefreshConsumer>> {
        self.consumers.write().remove(consumer_id)
    }

    pub fn get(&self, consumer_id: &str) -> Option<Arc<dyn RefreshConsumer>> {
        self.consumers.read().get(consumer_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.consumers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.consumers.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl Refresher for ConsumerRegistry {
    async fn refresh(&self, consumer_id: &str) -> Result<(), RefreshError> {
        let consumer = self
            .get(consumer_id)
            .ok_or_else(|| RefreshError::NotFound(consumer_id.to_string()))?;
        consumer.refresh().await.map_err(RefreshError::Other)
    }
}
