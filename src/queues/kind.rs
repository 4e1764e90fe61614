use crate::error::QueueError;
use crate::provider::Provider;
use crate::storage::StoragePointer;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// The three primary queue behaviors.
///
/// Queues share one implementation and branch on the kind at the few places they differ:
/// which index field a provider uses, who may be inserted, what counts as live during
/// cleanup and which structural checks a candidate must pass.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueKind {
    Normal,
    Priority,
    Removal,
}

/// What a scan does with a structurally valid slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Accept,
    Skip,
    Evict,
}

impl QueueKind {
    pub fn storage_pointer(self) -> StoragePointer {
        match self {
            QueueKind::Normal => StoragePointer::NormalQueue,
            QueueKind::Priority => StoragePointer::PriorityQueue,
            QueueKind::Removal => StoragePointer::RemovalQueue,
        }
    }

    pub fn purged_pointer(self) -> StoragePointer {
        match self {
            QueueKind::Normal => StoragePointer::NormalPurgedQueue,
            QueueKind::Priority => StoragePointer::PriorityPurgedQueue,
            QueueKind::Removal => StoragePointer::RemovalPurgedQueue,
        }
    }

    /// The removal queue has no fulfilled queue: its providers leave once their owed BTC is paid.
    pub fn fulfilled_pointer(self) -> Option<StoragePointer> {
        match self {
            QueueKind::Normal => Some(StoragePointer::NormalFulfilledQueue),
            QueueKind::Priority => Some(StoragePointer::PriorityFulfilledQueue),
            QueueKind::Removal => None,
        }
    }

    /// Slot of `provider` in a queue of this kind.
    pub fn index_of(self, provider: &Provider) -> Option<u32> {
        match self {
            QueueKind::Removal => provider.get_removal_queue_index(),
            _ => provider.get_queue_index(),
        }
    }

    pub(crate) fn set_index(self, provider: &mut Provider, index: u32) {
        match self {
            QueueKind::Removal => provider.set_removal_queue_index(index),
            _ => provider.set_queue_index(index),
        }
    }

    pub(crate) fn clear_index(self, provider: &mut Provider) {
        match self {
            QueueKind::Removal => provider.clear_removal_queue_index(),
            _ => provider.clear_queue_index(),
        }
    }

    /// Normal holds only non-priority providers, priority only priority ones.
    pub(crate) fn check_priority_flag(self, provider: &Provider) -> Result<(), QueueError> {
        let wrong = match self {
            QueueKind::Normal => provider.is_priority(),
            QueueKind::Priority => !provider.is_priority(),
            QueueKind::Removal => false,
        };
        if wrong {
            return Err(QueueError::WrongQueue { kind: self, provider: provider.get_id() });
        }
        Ok(())
    }

    pub(crate) fn check_insert(self, provider: &Provider) -> Result<(), QueueError> {
        if provider.is_initial_liquidity_provider() {
            return Err(QueueError::InitialProviderForbidden("added to a queue"));
        }
        if self.index_of(provider).is_some() {
            return Err(QueueError::InvalidProviderState { provider: provider.get_id(), action: "queued twice" });
        }
        match self {
            QueueKind::Removal => {
                if !provider.is_pending_removal() || !provider.is_liquidity_provider() {
                    return Err(QueueError::InvalidProviderState {
                        provider: provider.get_id(),
                        action: "added to the removal queue without a pending removal",
                    });
                }
                Ok(())
            }
            _ => {
                if provider.is_pending_removal() {
                    return Err(QueueError::InvalidProviderState {
                        provider: provider.get_id(),
                        action: "listed while pending removal",
                    });
                }
                self.check_priority_flag(provider)
            }
        }
    }

    /// Whether cleanup must stop at this provider.
    ///
    /// Normal and priority queues drop inactive providers, except fulfilled ones whose slot the
    /// fulfilled queue still points at. Every provider the removal queue
    /// still holds must be pending removal, anything else is corruption.
    pub(crate) fn is_live_for_cleanup(self, provider: &Provider) -> Result<bool, QueueError> {
        match self {
            QueueKind::Removal => {
                if !provider.is_pending_removal() {
                    return Err(QueueError::ImpossibleState(format!(
                        "provider {} is in the removal queue but not pending removal",
                        provider.get_id()
                    )));
                }
                Ok(true)
            }
            _ => Ok(provider.is_active() || provider.is_to_reset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", QueueKind::Normal), "NORMAL");
        assert_eq!(format!("{}", QueueKind::Priority), "PRIORITY");
        assert_eq!(QueueKind::from_str("REMOVAL").unwrap(), QueueKind::Removal);
        assert_eq!(QueueKind::iter().count(), 3);
    }

    #[test]
    fn test_insert_guards() {
        let mut provider = Provider::new(U256::from(1));
        assert!(QueueKind::Normal.check_insert(&provider).is_ok());
        assert!(matches!(QueueKind::Priority.check_insert(&provider), Err(QueueError::WrongQueue { .. })));
        assert!(matches!(QueueKind::Removal.check_insert(&provider), Err(QueueError::InvalidProviderState { .. })));

        provider.mark_priority();
        assert!(QueueKind::Priority.check_insert(&provider).is_ok());
        assert!(matches!(QueueKind::Normal.check_insert(&provider), Err(QueueError::WrongQueue { .. })));

        provider.set_queue_index(0);
        assert!(matches!(QueueKind::Priority.check_insert(&provider), Err(QueueError::InvalidProviderState { .. })));

        let mut initial = Provider::new(U256::from(2));
        initial.mark_initial_liquidity_provider();
        assert!(matches!(QueueKind::Normal.check_insert(&initial), Err(QueueError::InitialProviderForbidden(_))));
    }

    #[test]
    fn test_removal_cleanup_liveness() {
        let mut provider = Provider::new(U256::from(1));
        assert!(QueueKind::Removal.is_live_for_cleanup(&provider).is_err());
        assert_eq!(QueueKind::Normal.is_live_for_cleanup(&provider), Ok(false));

        provider.mark_pending_removal();
        provider.activate();
        assert_eq!(QueueKind::Removal.is_live_for_cleanup(&provider), Ok(true));
        assert_eq!(QueueKind::Normal.is_live_for_cleanup(&provider), Ok(true));
    }

    #[test]
    fn test_fulfilled_provider_survives_cleanup() {
        let mut provider = Provider::new(U256::from(2));
        provider.mark_to_reset();
        assert_eq!(QueueKind::Normal.is_live_for_cleanup(&provider), Ok(true));
        assert_eq!(QueueKind::Priority.is_live_for_cleanup(&provider), Ok(true));
    }
}
