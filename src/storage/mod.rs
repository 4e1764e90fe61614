/// Storage Layer
///
/// Working copies of the persistent primitives the queues are built on, plus the ledger that
/// carries them between invocations. Nothing here knows about providers' eligibility rules.
pub mod ledger;
pub mod stored_u256_array;
pub mod stored_u32_queue;

pub use ledger::{Changeset, Ledger};
pub use stored_u256_array::{ArraySnapshot, StoredU256Array};
pub use stored_u32_queue::{QueueEntry, QueueSnapshot, StoredU32Queue};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Address of each persisted structure inside a [`Ledger`].
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoragePointer {
    NormalQueue,
    PriorityQueue,
    RemovalQueue,
    NormalPurgedQueue,
    PriorityPurgedQueue,
    RemovalPurgedQueue,
    NormalFulfilledQueue,
    PriorityFulfilledQueue,
}
