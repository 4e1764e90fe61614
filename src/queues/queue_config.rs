use super::QueueKind;
use crate::constants::{
    DefaultQueueCaps, MAXIMUM_QUEUE_SLOTS, MINIMUM_PROVIDER_RESERVATION_AMOUNT, QUOTE_SCALE,
    STRICT_MINIMUM_PROVIDER_RESERVATION_AMOUNT,
};
use crate::utils::amounts::LiquidityThresholds;
use crate::utils::config_loader::{ConfigSection, LoadConfigError};
use serde::{Deserialize, Serialize};

/// Tunables for one pool's provider queues, read from the `[provider_queue]` table.
/// Missing keys fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProviderQueueConfigSection {
    /// Slot cap of the normal queue. Purge and fulfilled buffers share it.
    pub max_normal_providers: u32,
    pub max_priority_providers: u32,
    pub max_removal_providers: u32,
    pub minimum_provider_reservation_amount: u64,
    pub strict_minimum_provider_reservation_amount: u64,
    pub quote_scale: u64,
    /// Check every candidate's stored index against the slot it was found in.
    pub verify_indexes: bool,
}

impl Default for ProviderQueueConfigSection {
    fn default() -> Self {
        Self {
            max_normal_providers: DefaultQueueCaps::NORMAL,
            max_priority_providers: DefaultQueueCaps::PRIORITY,
            max_removal_providers: DefaultQueueCaps::REMOVAL,
            minimum_provider_reservation_amount: MINIMUM_PROVIDER_RESERVATION_AMOUNT,
            strict_minimum_provider_reservation_amount: STRICT_MINIMUM_PROVIDER_RESERVATION_AMOUNT,
            quote_scale: QUOTE_SCALE,
            verify_indexes: true,
        }
    }
}

impl ProviderQueueConfigSection {
    pub fn with_caps(&self, normal: u32, priority: u32, removal: u32) -> Self {
        Self { max_normal_providers: normal, max_priority_providers: priority, max_removal_providers: removal, ..self.clone() }
    }

    pub fn cap_for(&self, kind: QueueKind) -> u32 {
        match kind {
            QueueKind::Normal => self.max_normal_providers,
            QueueKind::Priority => self.max_priority_providers,
            QueueKind::Removal => self.max_removal_providers,
        }
    }

    pub fn thresholds(&self) -> LiquidityThresholds {
        LiquidityThresholds {
            minimum_reservation_sats: self.minimum_provider_reservation_amount,
            strict_minimum_reservation_sats: self.strict_minimum_provider_reservation_amount,
            quote_scale: self.quote_scale,
        }
    }

    /// Load the defaults overridden by `PROVIDER_QUEUE_*` environment variables.
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("PROVIDER_QUEUE_MAX_NORMAL_PROVIDERS") {
            config.max_normal_providers =
                value.parse().map_err(|e| eyre::eyre!("Invalid PROVIDER_QUEUE_MAX_NORMAL_PROVIDERS: {}", e))?;
        }

        if let Ok(value) = std::env::var("PROVIDER_QUEUE_MAX_PRIORITY_PROVIDERS") {
            config.max_priority_providers =
                value.parse().map_err(|e| eyre::eyre!("Invalid PROVIDER_QUEUE_MAX_PRIORITY_PROVIDERS: {}", e))?;
        }

        if let Ok(value) = std::env::var("PROVIDER_QUEUE_MAX_REMOVAL_PROVIDERS") {
            config.max_removal_providers =
                value.parse().map_err(|e| eyre::eyre!("Invalid PROVIDER_QUEUE_MAX_REMOVAL_PROVIDERS: {}", e))?;
        }

        if let Ok(value) = std::env::var("PROVIDER_QUEUE_MINIMUM_RESERVATION") {
            config.minimum_provider_reservation_amount =
                value.parse().map_err(|e| eyre::eyre!("Invalid PROVIDER_QUEUE_MINIMUM_RESERVATION: {}", e))?;
        }

        if let Ok(value) = std::env::var("PROVIDER_QUEUE_VERIFY_INDEXES") {
            config.verify_indexes = value.parse().map_err(|e| eyre::eyre!("Invalid PROVIDER_QUEUE_VERIFY_INDEXES: {}", e))?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ConfigSection for ProviderQueueConfigSection {
    const SECTION: &'static str = "provider_queue";

    fn validate(&self) -> Result<(), LoadConfigError> {
        for (name, cap) in [
            ("max_normal_providers", self.max_normal_providers),
            ("max_priority_providers", self.max_priority_providers),
            ("max_removal_providers", self.max_removal_providers),
        ] {
            if cap == 0 || cap > MAXIMUM_QUEUE_SLOTS {
                return Err(LoadConfigError::ConfigError(format!("{name} must be in 1..={MAXIMUM_QUEUE_SLOTS}, got {cap}")));
            }
        }
        if self.quote_scale == 0 {
            return Err(LoadConfigError::ConfigError("quote_scale must be nonzero".to_string()));
        }
        Ok(())
    }
}
