//! Ledger layer
//!
//! Public contract state, the query instruction set run against it and the
//! cost model bounding those queries.

mod ops;
mod query;
mod state;

pub use ops::{increment_field, read_field, write_field, Key, Op};
pub use query::{GatherEvent, LocalQueryContext, QueryContext, QueryResults};
pub use state::{field_key, StateValue};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::codec::CompactType;
use crate::error::{RuntimeError, RuntimeResult};

/// Gas charged by ledger queries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    /// Cost of every instruction
    pub op_cost: u64,
    /// Surcharge for uncached reads and writes
    pub read_cost: u64,
    /// Abort a query once it has spent more than this
    pub gas_limit: Option<u64>,
}

impl CostModel {
    /// Default cost model
    pub const DEFAULT: Self = Self {
        op_cost: 1,
        read_cost: 10,
        gas_limit: Some(1_000_000),
    };

    /// Default costs with no limit
    pub const fn unlimited() -> Self {
        Self {
            gas_limit: None,
            ..Self::DEFAULT
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Deployed state of a contract: its ledger data and the circuits it exports
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    pub data: StateValue,
    pub operations: BTreeSet<String>,
}

impl ContractState {
    pub fn new(data: StateValue, operations: impl IntoIterator<Item = String>) -> Self {
        Self {
            data,
            operations: operations.into_iter().collect(),
        }
    }
}

/// Decode contract field `position` of a ledger state with `codec`
pub fn decode_ledger_field<C: CompactType>(
    state: &StateValue,
    position: u8,
    codec: &C,
) -> RuntimeResult<C::Native> {
    let cell = state.cell_at(&[field_key(position)]).map_err(|e| {
        RuntimeError::MissingState(format!("ledger field {position}: {e}"))
    })?;
    codec.decode(cell)
}

/// Typed view over a contract's ledger state
pub trait LedgerView: Sized {
    /// Decode the view from raw ledger state
    fn from_ledger(state: &StateValue) -> RuntimeResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CompactBoolean, CompactUnsignedInteger};
    use crate::types::ContractAddress;
    use num_bigint::BigUint;

    #[test]
    fn test_decode_ledger_field() {
        let uint = CompactUnsignedInteger::for_bytes(8);
        let ctx = LocalQueryContext::from_state(StateValue::array(1), ContractAddress::default());
        let program = write_field(0, uint.encode(&BigUint::from(12u32)).unwrap());
        let state = ctx.query(&program, &CostModel::DEFAULT).unwrap().context;

        assert_eq!(decode_ledger_field(state.state(), 0, &uint).unwrap(), BigUint::from(12u32));
        assert!(decode_ledger_field(state.state(), 0, &CompactBoolean).is_err());
        let err = decode_ledger_field(state.state(), 3, &uint).unwrap_err();
        assert!(matches!(err, RuntimeError::MissingState(_)));
    }

    #[test]
    fn test_unlimited_cost_model() {
        assert_eq!(CostModel::unlimited().gas_limit, None);
        assert_eq!(CostModel::unlimited().op_cost, CostModel::DEFAULT.op_cost);
    }
}
