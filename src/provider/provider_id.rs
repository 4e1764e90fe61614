use alloy_primitives::{Address, U256};
use sha2::digest::Update;
use sha2::{Digest, Sha256};

/// Hash the owner and token addresses to the 256-bit provider id.
/// Stable and reproducible so other tooling can derive the same id.
pub fn provider_id(owner: Address, token: Address) -> U256 {
    let mut hasher = Sha256::new();
    Update::update(&mut hasher, owner.as_slice());
    Update::update(&mut hasher, token.as_slice());

    let hash: [u8; 32] = hasher.finalize().into();
    U256::from_be_bytes(hash)
}
