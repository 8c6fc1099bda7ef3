//! ABI encoding for the token, messaging and fee handler contracts
//!
//! Calls are built by hand from function selectors rather than generated
//! bindings; the handful of call shapes this tool needs does not justify
//! carrying contract artifacts for binding generation.

use crate::config::FeeHandlerConfig;
use crate::error::{BridgeError, BridgeResult};

use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::id;

/// Cross-chain send parameters, in the messaging layer's tuple shape
#[derive(Debug, Clone)]
pub struct SendParam {
    pub dst_eid: u32,
    pub to: [u8; 32],
    pub amount_ld: U256,
    pub min_amount_ld: U256,
    pub extra_options: Bytes,
    pub compose_msg: Bytes,
    pub oft_cmd: Bytes,
}

/// Fee quote returned by the token contract
#[derive(Debug, Clone, Copy)]
pub struct MessagingFee {
    pub native_fee: U256,
    pub lz_token_fee: U256,
}

const SEND_PARAM_TYPES: &str = "(uint32,bytes32,uint256,uint256,bytes,bytes,bytes)";

fn call_data(signature: &str, tokens: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(encode(tokens));
    data.into()
}

fn send_param_token(param: &SendParam) -> Token {
    Token::Tuple(vec![
        Token::Uint(U256::from(param.dst_eid)),
        Token::FixedBytes(param.to.to_vec()),
        Token::Uint(param.amount_ld),
        Token::Uint(param.min_amount_ld),
        Token::Bytes(param.extra_options.to_vec()),
        Token::Bytes(param.compose_msg.to_vec()),
        Token::Bytes(param.oft_cmd.to_vec()),
    ])
}

/// Left-pad an EVM address to the messaging layer's 32-byte address format
pub fn address_to_bytes32(address: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address.as_bytes());
    out
}

/// `quoteSend(sendParam, payInLzToken=false)` view call
pub fn quote_send(param: &SendParam) -> Bytes {
    call_data(
        &format!("quoteSend({SEND_PARAM_TYPES},bool)"),
        &[send_param_token(param), Token::Bool(false)],
    )
}

/// `send(sendParam, fee, refundAddress)` payable call
pub fn send(param: &SendParam, fee: &MessagingFee, refund: Address) -> Bytes {
    call_data(
        &format!("send({SEND_PARAM_TYPES},(uint256,uint256),address)"),
        &[
            send_param_token(param),
            Token::Tuple(vec![Token::Uint(fee.native_fee), Token::Uint(fee.lz_token_fee)]),
            Token::Address(refund),
        ],
    )
}

/// `setFeeHandler(address)` on a freshly deployed token contract
pub fn set_fee_handler(handler: Address) -> Bytes {
    call_data("setFeeHandler(address)", &[Token::Address(handler)])
}

/// ERC-20 `allowance(owner, spender)` view call
pub fn allowance(owner: Address, spender: Address) -> Bytes {
    call_data(
        "allowance(address,address)",
        &[Token::Address(owner), Token::Address(spender)],
    )
}

/// ERC-20 `approve(spender, amount)`
pub fn approve(spender: Address, amount: U256) -> Bytes {
    call_data(
        "approve(address,uint256)",
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

/// Initializer for the locking adapter variant: `initialize(owner)`
pub fn initialize_adapter(owner: Address) -> Bytes {
    call_data("initialize(address)", &[Token::Address(owner)])
}

/// Initializer for the native variant: `initialize(name, symbol, owner)`
pub fn initialize_native(name: &str, symbol: &str, owner: Address) -> Bytes {
    call_data(
        "initialize(string,string,address)",
        &[
            Token::String(name.to_string()),
            Token::String(symbol.to_string()),
            Token::Address(owner),
        ],
    )
}

/// Adapter constructor args: (underlying token, messaging endpoint)
pub fn adapter_constructor(underlying: Address, endpoint: Address) -> Vec<u8> {
    encode(&[Token::Address(underlying), Token::Address(endpoint)])
}

/// Native token constructor args: (messaging endpoint)
pub fn native_constructor(endpoint: Address) -> Vec<u8> {
    encode(&[Token::Address(endpoint)])
}

/// Fee handler constructor args from its per-network descriptor
pub fn fee_handler_constructor(config: &FeeHandlerConfig) -> Vec<u8> {
    encode(&[
        Token::Uint(U256::from(config.fixed_native_fee)),
        Token::Address(config.oracle),
        Token::Address(config.yields),
        Token::Uint(U256::from(config.quote_type)),
        Token::Address(config.ops),
    ])
}

/// Decode a `(nativeFee, lzTokenFee)` quote
pub fn decode_messaging_fee(output: &[u8]) -> BridgeResult<MessagingFee> {
    let tokens = decode(
        &[ParamType::Tuple(vec![
            ParamType::Uint(256),
            ParamType::Uint(256),
        ])],
        output,
    )
    .map_err(|e| BridgeError::Abi(format!("messaging fee: {}", e)))?;

    match tokens.first() {
        Some(Token::Tuple(parts)) => match (parts.first(), parts.get(1)) {
            (Some(Token::Uint(native_fee)), Some(Token::Uint(lz_token_fee))) => {
                Ok(MessagingFee {
                    native_fee: *native_fee,
                    lz_token_fee: *lz_token_fee,
                })
            }
            _ => Err(BridgeError::Abi("malformed messaging fee tuple".to_string())),
        },
        _ => Err(BridgeError::Abi("missing messaging fee tuple".to_string())),
    }
}

/// Decode a single uint256 return value
pub fn decode_uint(output: &[u8]) -> BridgeResult<U256> {
    let tokens = decode(&[ParamType::Uint(256)], output)
        .map_err(|e| BridgeError::Abi(format!("uint256: {}", e)))?;
    match tokens.first() {
        Some(Token::Uint(value)) => Ok(*value),
        _ => Err(BridgeError::Abi("missing uint256 value".to_string())),
    }
}
