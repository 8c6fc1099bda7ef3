//! Deterministic address derivation
//!
//! Contracts are deployed through a CREATE2 factory with a stable,
//! human-chosen salt string per logical token, so repeated runs and canonical
//! cross-chain registries resolve to the same address before deployment. The
//! factory's 32-byte salt is the raw bytes of the salt string, zero-padded on
//! the left, which keeps predicted addresses identical to deployments made by
//! other tooling that passes the salt string as a hex literal.

use crate::error::{BridgeError, BridgeResult};

use ethers::types::{Address, Bytes, H256};
use ethers::utils::get_create2_address;

/// Pack a human-chosen salt string into the factory's 32-byte salt
pub fn salt_bytes(salt: &str) -> BridgeResult<H256> {
    let raw = salt.as_bytes();
    if raw.is_empty() || raw.len() > 32 {
        return Err(BridgeError::InvalidDescriptor(format!(
            "salt must be between 1 and 32 bytes, got {} ({:?})",
            raw.len(),
            salt
        )));
    }
    let mut packed = [0u8; 32];
    packed[32 - raw.len()..].copy_from_slice(raw);
    Ok(H256::from(packed))
}

/// Predict the CREATE2 deployment address
pub fn derive_address(factory: Address, salt: H256, init_code: &[u8]) -> Address {
    get_create2_address(factory, salt.as_bytes(), init_code)
}

/// Calldata for the deterministic deployment factory: salt followed by the
/// creation bytecode
pub fn deploy_data(salt: H256, init_code: &[u8]) -> Bytes {
    let mut data = salt.as_bytes().to_vec();
    data.extend_from_slice(init_code);
    data.into()
}
