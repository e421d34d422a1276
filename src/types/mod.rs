//! Shared runtime types
//!
//! This module is the single point of import for the data model shared by the
//! codec, the ledger layer and the circuit context: the field-aligned value
//! representation, contract addresses, the confidential-transfer records and
//! the runtime configuration.
//!
//! # Usage
//!
//! ```ignore
//! use zkir_contract_runtime::types::{AlignedValue, ContractAddress, RuntimeConfig};
//! ```

mod aligned;
mod coin;

pub use aligned::{AlignedValue, Alignment, AlignmentAtom, Value};
pub use coin::{
    CoinInfo, CoinPublicKey, ContractAddress, QualifiedCoinInfo, Recipient, ZswapLocalState,
    ZswapOutput,
};

use num_bigint::BigUint;
use once_cell::sync::Lazy;

use crate::ledger::CostModel;

// ============================================================================
// Field constants
// ============================================================================

/// Field elements handled by the runtime
///
/// Values are unbounded integers; every boundary that accepts one checks it
/// against the proof-system maximum.
pub type Field = BigUint;

/// Big-endian bytes of the largest element of the BLS12-381 scalar field
const MAX_FIELD_BE: [u8; 32] = [
    0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09, 0xa1, 0xd8, 0x05,
    0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
];

/// Largest field element of the default proof system (modulus minus one)
pub static MAX_FIELD: Lazy<Field> = Lazy::new(|| BigUint::from_bytes_be(&MAX_FIELD_BE));

/// Byte length of a field element in its fixed-width little-endian form
pub const FIELD_BYTES: usize = 32;

// ============================================================================
// Runtime configuration
// ============================================================================

/// Runtime configuration options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum nesting of inter-contract calls (default: 32)
    pub max_call_depth: usize,

    /// Cost model handed to every ledger query
    pub cost_model: CostModel,
}

impl RuntimeConfig {
    /// Default configuration
    pub const DEFAULT: Self = Self {
        max_call_depth: 32,
        cost_model: CostModel::DEFAULT,
    };

    /// Create a validated configuration
    pub fn new(max_call_depth: usize, cost_model: CostModel) -> Result<Self, ConfigError> {
        let config = Self {
            max_call_depth,
            cost_model,
        };
        config.validate()?;
        Ok(config)
    }

    /// Shallow call depth and no gas limit, for tests
    pub fn fast_test() -> Self {
        Self {
            max_call_depth: 8,
            cost_model: CostModel::unlimited(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::InvalidCallDepth(self.max_call_depth));
        }

        if self.cost_model.gas_limit == Some(0) {
            return Err(ConfigError::ZeroGasLimit);
        }

        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid call depth {0}, must be at least 1")]
    InvalidCallDepth(usize),

    #[error("Gas limit must be non-zero when set")]
    ZeroGasLimit,
}
