use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Notifications the engine emits. Fire-and-forget: nothing in the engine reads them back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderEvent {
    /// A provider left its queue: fully drained, evicted, canceled or done withdrawing.
    Fulfilled { provider_id: U256, canceled: bool, removal_completed: bool },
    /// A provider was moved to its queue's purge retry buffer.
    Purged { provider_id: U256, slot: u32 },
}

impl ProviderEvent {
    pub fn provider_id(&self) -> U256 {
        match self {
            ProviderEvent::Fulfilled { provider_id, .. } | ProviderEvent::Purged { provider_id, .. } => *provider_id,
        }
    }
}
