//! Entry point that opens the store and hands out the components built on it.

use crate::clock::{Clock, SystemClock};
use crate::composer::list_model::ContactsListModel;
use crate::config::DirectoryConfig;
use crate::search::pipeline::SearchPipeline;
use crate::service::contact_service::ContactService;
use crate::service::neighbor_service::NeighborService;
use crate::service::recency_service::RecencyService;
use crate::store::{ContactStore, StoreResult};
use std::path::Path;
use std::sync::Arc;

/// One contact directory: a store plus the services that share it.
#[derive(Clone)]
pub struct Directory {
    store: ContactStore,
    config: DirectoryConfig,
    clock: Arc<dyn Clock>,
}

impl Directory {
    pub fn new(store: ContactStore, config: DirectoryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Opens the database at `path` with wall-clock time.
    pub fn open(path: impl AsRef<Path>, config: DirectoryConfig) -> StoreResult<Self> {
        Ok(Self::new(
            ContactStore::open(path)?,
            config,
            Arc::new(SystemClock),
        ))
    }

    pub fn open_in_memory(config: DirectoryConfig) -> StoreResult<Self> {
        Ok(Self::new(
            ContactStore::open_in_memory()?,
            config,
            Arc::new(SystemClock),
        ))
    }

    pub fn store(&self) -> &ContactStore {
        &self.store
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn contacts(&self) -> ContactService {
        ContactService::new(self.store.clone())
    }

    pub fn neighbors(&self) -> NeighborService {
        NeighborService::new(self.store.clone())
    }

    pub fn recency(&self) -> RecencyService {
        RecencyService::new(
            self.store.clone(),
            Arc::clone(&self.clock),
            self.config.subscription_grace,
        )
    }

    pub fn search(&self) -> SearchPipeline {
        SearchPipeline::new(self.store.clone(), self.config.clone())
    }

    /// Builds the list screen model. Must be called within a tokio runtime.
    pub fn list_model(&self) -> ContactsListModel {
        ContactsListModel::new(self.store.clone(), self.recency(), self.config.clone())
    }
}
