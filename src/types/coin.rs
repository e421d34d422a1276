//! Addresses, coins and confidential-transfer local state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// 32-byte contract address
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractAddress(pub [u8; 32]);

impl ContractAddress {
    /// Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractAddress({})", hex::encode(self.0))
    }
}

impl FromStr for ContractAddress {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| RuntimeError::type_mismatch(format!("invalid contract address: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            RuntimeError::type_mismatch(format!(
                "contract address must be 32 bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Public key of a coin owner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinPublicKey(pub [u8; 32]);

/// Description of a shielded coin
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInfo {
    /// Coin nonce
    pub nonce: [u8; 32],
    /// Token type
    pub color: [u8; 32],
    /// Amount
    pub value: u128,
}

/// A coin together with its position in the commitment tree
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedCoinInfo {
    /// Coin nonce
    pub nonce: [u8; 32],
    /// Token type
    pub color: [u8; 32],
    /// Amount
    pub value: u128,
    /// Merkle tree index
    pub mt_index: u64,
}

impl QualifiedCoinInfo {
    /// Qualify a coin with its tree index
    pub fn new(coin: CoinInfo, mt_index: u64) -> Self {
        Self {
            nonce: coin.nonce,
            color: coin.color,
            value: coin.value,
            mt_index,
        }
    }

    /// Drop the tree index
    pub fn to_coin_info(&self) -> CoinInfo {
        CoinInfo {
            nonce: self.nonce,
            color: self.color,
            value: self.value,
        }
    }
}

/// Receiver of a coin: a user key or a contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// A user identified by coin public key
    User(CoinPublicKey),
    /// A contract
    Contract(ContractAddress),
}

/// Output produced during a call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZswapOutput {
    /// Coin being created
    pub coin: CoinInfo,
    /// Who receives it
    pub recipient: Recipient,
}

/// Confidential-transfer local state of a call
///
/// Tracks the shielded inputs spent and outputs created while a circuit runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZswapLocalState {
    /// Key of the party running the transaction
    pub coin_public_key: CoinPublicKey,
    /// Next free commitment tree index
    pub current_index: u64,
    /// Coins spent
    pub inputs: Vec<QualifiedCoinInfo>,
    /// Coins created
    pub outputs: Vec<ZswapOutput>,
}

impl ZswapLocalState {
    /// Fresh state for the given key
    pub fn new(coin_public_key: CoinPublicKey) -> Self {
        Self {
            coin_public_key,
            ..Default::default()
        }
    }

    /// Record a created coin, returning the tree index it was assigned
    pub fn record_output(&mut self, coin: CoinInfo, recipient: Recipient) -> u64 {
        let index = self.current_index;
        self.outputs.push(ZswapOutput { coin, recipient });
        self.current_index += 1;
        index
    }
}
