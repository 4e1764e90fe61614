/// Queue Layer
///
/// The indexed provider queues and their side buffers:
///
/// - `ProviderQueue`: append-only slots with compaction and a resumable eligibility scan
/// - `PurgedProviderQueue`: round-robin retry buffer over a primary queue's slots
/// - `FulfilledProviderQueue`: FIFO of drained slots awaiting a batch reset
///
/// One implementation serves all three kinds; `QueueKind` carries the differences.
pub mod fulfilled_provider_queue;
pub mod kind;
pub mod provider_queue;
pub mod purged_provider_queue;
pub mod queue_config;

pub use fulfilled_provider_queue::FulfilledProviderQueue;
pub use kind::QueueKind;
pub use provider_queue::ProviderQueue;
pub use purged_provider_queue::PurgedProviderQueue;
pub use queue_config::ProviderQueueConfigSection;
