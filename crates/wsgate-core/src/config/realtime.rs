//! Real-time connection engine configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::id::{IdGenerator, RandomIds, SequentialIds};

/// Connection engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound frame queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// How connection and handler ids are generated.
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            id_strategy: IdStrategy::default(),
        }
    }
}

/// Id generation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random v4 UUIDs.
    #[default]
    Random,
    /// Process-local monotonic counter.
    Sequential,
}

impl IdStrategy {
    /// Builds the generator for this strategy.
    pub fn build(self) -> Arc<dyn IdGenerator> {
        match self {
            Self::Random => Arc::new(RandomIds),
            Self::Sequential => Arc::new(SequentialIds::new()),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}
