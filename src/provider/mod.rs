pub mod cache;
#[allow(clippy::module_inception)]
pub mod provider;
pub mod provider_id;

pub use cache::{CacheStats, ProviderCache};
pub use provider::Provider;
pub use provider_id::provider_id;
