use std::sync::Arc;

use crate::client::ResourceClient;
use crate::config::NavigatorConfig;

/// The remote connection shared by every node of a forest
pub struct Session {
    client: Arc<dyn ResourceClient>,
    config: NavigatorConfig,
}

impl Session {
    pub fn new(client: Arc<dyn ResourceClient>, config: NavigatorConfig) -> Arc<Self> {
        Arc::new(Self { client, config })
    }

    pub fn client(&self) -> &Arc<dyn ResourceClient> {
        &self.client
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
