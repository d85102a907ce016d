pub mod contracts;
pub mod error;
pub mod notify;
pub mod templates;

use std::sync::Arc;

use signet_db::ContractStore;

use crate::notify::NotificationSender;

pub use error::{Result, ServiceError};

/// The contract engine. Holds its collaborators behind trait objects so the
/// same service runs over Postgres in the binaries and over the in-memory
/// store in tests.
#[derive(Clone)]
pub struct ContractService {
    store: Arc<dyn ContractStore>,
    notifier: Arc<dyn NotificationSender>,
    base_url: String,
}

impl ContractService {
    pub fn new(
        store: Arc<dyn ContractStore>,
        notifier: Arc<dyn NotificationSender>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            base_url: base_url.into(),
        }
    }

    pub(crate) fn store(&self) -> &dyn ContractStore {
        self.store.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn NotificationSender {
        self.notifier.as_ref()
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }
}
