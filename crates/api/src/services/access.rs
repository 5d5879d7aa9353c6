//! A read-only, deterministically ordered directory of installed contracts.

use std::collections::HashMap;
use std::sync::Arc;

use super::BlockchainService;

/// Looks contracts up by their stable `id()`. Built once at node startup
/// and never mutated afterward, so lookups never race block execution.
#[derive(Clone, Default)]
pub struct ServiceDirectory {
    by_id: Arc<HashMap<String, Arc<dyn BlockchainService>>>,
}

impl std::fmt::Debug for ServiceDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDirectory")
            .field("service_count", &self.by_id.len())
            .finish()
    }
}

impl ServiceDirectory {
    pub fn new(services: Vec<Arc<dyn BlockchainService>>) -> Self {
        let by_id = services
            .into_iter()
            .map(|s| (s.id().to_string(), s))
            .collect();
        Self {
            by_id: Arc::new(by_id),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn BlockchainService>> {
        self.by_id.get(id).cloned()
    }
}
