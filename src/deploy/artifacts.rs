//! Contract artifact access
//!
//! The deployment framework produces creation bytecode artifacts out of
//! band; this module only assembles deployable init code from them. The
//! proxy artifact is a self-initializing wrapper whose constructor takes the
//! implementation creation code, the proxy owner, and the initializer
//! calldata, so deployment and initialization land in a single transaction.

use crate::error::{BridgeError, BridgeResult};

use ethers::abi::{encode, Token};
use ethers::types::Address;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;

/// Name of the self-initializing proxy artifact
pub const PROXY_CONTRACT: &str = "InitializableProxy";

/// Builds creation bytecode for deployments
#[cfg_attr(test, automock)]
pub trait ArtifactStore: Send + Sync {
    /// Creation code for a proxied contract: implementation constructor args
    /// baked in, initializer executed atomically at construction
    fn proxy_init_code(
        &self,
        contract: &str,
        constructor_args: &[u8],
        init_call: &[u8],
        owner: Address,
    ) -> BridgeResult<Vec<u8>>;

    /// Plain creation code with constructor args appended
    fn init_code(&self, contract: &str, constructor_args: &[u8]) -> BridgeResult<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct Artifact {
    bytecode: String,
}

/// Reads framework artifacts from `<root>/<contract>.json`
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bytecode(&self, contract: &str) -> BridgeResult<Vec<u8>> {
        let path = self.root.join(format!("{}.json", contract));
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| BridgeError::Artifact(format!("read {}: {}", path.display(), e)))?;
        let artifact: Artifact = serde_json::from_str(&raw)
            .map_err(|e| BridgeError::Artifact(format!("parse {}: {}", path.display(), e)))?;
        decode_hex(&artifact.bytecode, &path)
    }
}

fn decode_hex(value: &str, path: &Path) -> BridgeResult<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped)
        .map_err(|e| BridgeError::Artifact(format!("bytecode in {}: {}", path.display(), e)))
}

impl ArtifactStore for FileArtifactStore {
    fn proxy_init_code(
        &self,
        contract: &str,
        constructor_args: &[u8],
        init_call: &[u8],
        owner: Address,
    ) -> BridgeResult<Vec<u8>> {
        let mut implementation = self.bytecode(contract)?;
        implementation.extend_from_slice(constructor_args);

        let mut code = self.bytecode(PROXY_CONTRACT)?;
        code.extend(encode(&[
            Token::Bytes(implementation),
            Token::Address(owner),
            Token::Bytes(init_call.to_vec()),
        ]));
        Ok(code)
    }

    fn init_code(&self, contract: &str, constructor_args: &[u8]) -> BridgeResult<Vec<u8>> {
        let mut code = self.bytecode(contract)?;
        code.extend_from_slice(constructor_args);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_artifact(dir: &Path, name: &str, bytecode: &str) {
        let body = format!("{{\"bytecode\": \"{}\"}}", bytecode);
        std::fs::write(dir.join(format!("{}.json", name)), body).unwrap();
    }

    #[test]
    fn test_plain_init_code_appends_args() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "FeeHandler", "0x6080");
        let store = FileArtifactStore::new(dir.path());

        let code = store.init_code("FeeHandler", &[0xAA, 0xBB]).unwrap();
        assert_eq!(code, vec![0x60, 0x80, 0xAA, 0xBB]);
    }

    #[test]
    fn test_proxy_init_code_wraps_implementation() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "OFTUpgradeable", "0x6080");
        write_artifact(dir.path(), PROXY_CONTRACT, "0xfeed");
        let store = FileArtifactStore::new(dir.path());

        let code = store
            .proxy_init_code("OFTUpgradeable", &[0x01], &[0x02], Address::repeat_byte(0x0F))
            .unwrap();
        assert_eq!(&code[..2], &[0xFE, 0xED]);
        // constructor args follow the proxy bytecode
        assert!(code.len() > 2);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let err = store.init_code("FeeHandler", &[]).unwrap_err();
        assert!(matches!(err, BridgeError::Artifact(_)));
    }
}
