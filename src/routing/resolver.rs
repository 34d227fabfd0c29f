//! Path-prefix mapping lookup.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{GatewayConfig, MappingConfig};

/// Resolves an inbound path to its `MappingConfig`.
///
/// Reads from the hot-reloadable config snapshot, so a reload takes
/// effect on the next request without restarting in-flight ones.
#[derive(Clone)]
pub struct MappingResolver {
    config: Arc<ArcSwap<GatewayConfig>>,
}

impl MappingResolver {
    pub fn new(config: Arc<ArcSwap<GatewayConfig>>) -> Self {
        Self { config }
    }

    /// Find the mapping whose `match_key` is the longest prefix of `path`.
    pub fn resolve(&self, path: &str) -> Option<MappingConfig> {
        let config = self.config.load();
        config
            .mappings
            .iter()
            .filter(|m| path.starts_with(&m.match_key))
            .max_by_key(|m| m.match_key.len())
            .cloned()
    }
}
