// Layered architecture
pub mod storage; // Storage Layer: persistent arrays, circular queues, ledger
pub mod provider; // Provider records and the per-invocation cache
pub mod host; // Host Layer: owed BTC, reserves, transfers, events
pub mod queues; // Queue Layer: primary queues, purge and fulfilled buffers
pub mod manager; // Orchestration Layer: lane selection and boundary persistence

// Common utilities and types
pub mod constants;
pub mod error;
pub mod invocation;
pub mod utils;

// Re-export key components from each layer
pub use constants::{
    BURN_ADDRESS, INDEX_NOT_SET_VALUE, INITIAL_LIQUIDITY_PROVIDER_INDEX, MAXIMUM_QUEUE_SLOTS,
    MINIMUM_PROVIDER_RESERVATION_AMOUNT, QUOTE_SCALE, STRICT_MINIMUM_PROVIDER_RESERVATION_AMOUNT,
};
pub use error::QueueError;
pub use host::{Effect, EffectJournal, EventSink, Host, LiquidityReserve, MemoryHost, OwedBtc, ProviderEvent, TokenTransfer};
pub use invocation::{Invocation, execute};
pub use manager::{ProviderManager, QueueLane};
pub use provider::{CacheStats, Provider, ProviderCache, provider_id};
pub use queues::{
    FulfilledProviderQueue, ProviderQueue, ProviderQueueConfigSection, PurgedProviderQueue,
    QueueKind,
};
pub use storage::{Changeset, Ledger, StoragePointer, StoredU256Array, StoredU32Queue};
pub use utils::{ConfigLoader, ConfigLoaderSync, ConfigSection, LiquidityThresholds, LoadConfigError, tokens_to_satoshis};
