/// Orchestration Layer
///
/// `ProviderManager` composes the three queue lanes, answers "which provider serves the next
/// reservation" and persists the scan boundaries between invocations.
pub mod provider_manager;


pub use crate::queues::ProviderQueueConfigSection;
pub use provider_manager::{ProviderManager, QueueLane};
