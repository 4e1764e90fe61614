use crate::queues::QueueKind;
use alloy_primitives::U256;

/// Every fatal condition the engine can hit. Any of these aborts the whole invocation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    // Structural corruption
    #[error("provider {provider} found in the {kind} queue with the wrong priority flag")]
    WrongQueue { kind: QueueKind, provider: U256 },
    #[error("provider {provider} has reserved {reserved} above its liquidity {liquidity}")]
    ReservedExceedsLiquidity { provider: U256, reserved: u128, liquidity: u128 },
    #[error("provider {provider} index mismatch: stored {stored:?}, found at slot {slot}")]
    IndexMismatch { provider: U256, stored: Option<u32>, slot: u32 },
    #[error("provider {provider} has {reserved} satoshis reserved above {owed} owed")]
    OwedUnderflow { provider: U256, owed: u64, reserved: u64 },
    #[error("impossible state: {0}")]
    ImpossibleState(String),

    // Forbidden operations
    #[error("initial liquidity provider cannot be {0}")]
    InitialProviderForbidden(&'static str),
    #[error("provider {provider} cannot be {action}")]
    InvalidProviderState { provider: U256, action: &'static str },
    #[error("provider {provider} has no {what} index")]
    IndexNotSet { provider: U256, what: &'static str },
    #[error("no provider stored at index {index} of the {kind} queue")]
    EmptySlot { kind: QueueKind, index: u32 },

    // Capacity and arithmetic
    #[error("{kind} queue is full ({cap} slots)")]
    QueueFull { kind: QueueKind, cap: u32 },
    #[error("circular queue is full ({0} entries)")]
    CircularQueueFull(u32),
    #[error("{0} queue cursor overflowed")]
    CursorOverflow(QueueKind),
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
    #[error("arithmetic underflow in {0}")]
    Underflow(&'static str),

    // Collaborators
    #[error("host rejected effect: {0}")]
    Host(String),
}

