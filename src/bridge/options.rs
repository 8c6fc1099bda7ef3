//! Executor options for the cross-chain messaging layer
//!
//! Type-3 options container carrying a single executor `lzReceive` option:
//! worker id, option size, option type, then the gas (and optional native
//! value) as 16-byte big-endian words.

use ethers::types::Bytes;

const OPTIONS_TYPE_3: u16 = 3;
const WORKER_EXECUTOR: u8 = 1;
const OPTION_LZ_RECEIVE: u8 = 1;

/// Destination execution gas attached to every send
pub const DEFAULT_LZ_RECEIVE_GAS: u128 = 65_000;

/// Encode a type-3 options blob with one executor lzReceive option
pub fn lz_receive_option(gas: u128, value: u128) -> Bytes {
    let mut payload = gas.to_be_bytes().to_vec();
    if value > 0 {
        payload.extend_from_slice(&value.to_be_bytes());
    }

    // option type byte + payload
    let size = (payload.len() + 1) as u16;

    let mut out = OPTIONS_TYPE_3.to_be_bytes().to_vec();
    out.push(WORKER_EXECUTOR);
    out.extend_from_slice(&size.to_be_bytes());
    out.push(OPTION_LZ_RECEIVE);
    out.extend_from_slice(&payload);
    out.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz_receive_option_layout() {
        let options = lz_receive_option(DEFAULT_LZ_RECEIVE_GAS, 0);
        assert_eq!(
            hex::encode(&options),
            "0003010011010000000000000000000000000000fde8"
        );
    }

    #[test]
    fn test_nonzero_value_extends_payload() {
        let options = lz_receive_option(200_000, 1);
        // 2 (type) + 1 (worker) + 2 (size) + 1 (option) + 16 (gas) + 16 (value)
        assert_eq!(options.len(), 38);
        assert_eq!(&options[3..5], &33u16.to_be_bytes());
    }
}
