//! Stack frames

use super::proof_data::PartialProofData;
use crate::error::{RuntimeError, RuntimeResult};
use crate::ledger::QueryContext;
use crate::types::{ContractAddress, Field, ZswapLocalState};

/// Execution state of the circuit currently running
///
/// Holds the circuit's identity, the initial and current triple of ledger,
/// private and confidential-transfer state, and the proof data accumulated so
/// far. A finalized frame rejects further mutation.
#[derive(Clone, Debug)]
pub struct StackFrame<P, Q> {
    pub contract_id: String,
    pub circuit_id: String,
    pub address: ContractAddress,

    pub(crate) initial_ledger: Option<Q>,
    pub(crate) current_ledger: Option<Q>,
    pub(crate) initial_private_state: P,
    pub(crate) current_private_state: P,
    pub(crate) initial_zswap: ZswapLocalState,
    pub(crate) current_zswap: ZswapLocalState,

    pub(crate) proof_data: PartialProofData,
    pub(crate) finalized: bool,
}

impl<P: Clone, Q: QueryContext> StackFrame<P, Q> {
    pub(crate) fn new(
        contract_id: String,
        circuit_id: String,
        address: ContractAddress,
        ledger: Q,
        private_state: P,
        zswap: ZswapLocalState,
        commitment_rand: Field,
    ) -> Self {
        Self {
            contract_id,
            circuit_id,
            address,
            initial_ledger: Some(ledger.clone()),
            current_ledger: Some(ledger),
            initial_private_state: private_state.clone(),
            current_private_state: private_state,
            initial_zswap: zswap.clone(),
            current_zswap: zswap,
            proof_data: PartialProofData {
                communication_commitment_rand: commitment_rand,
                ..PartialProofData::default()
            },
            finalized: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn proof_data(&self) -> &PartialProofData {
        &self.proof_data
    }

    pub fn initial_ledger(&self) -> Option<&Q> {
        self.initial_ledger.as_ref()
    }

    pub fn current_ledger(&self) -> Option<&Q> {
        self.current_ledger.as_ref()
    }

    pub fn initial_private_state(&self) -> &P {
        &self.initial_private_state
    }

    pub fn current_private_state(&self) -> &P {
        &self.current_private_state
    }

    pub fn initial_zswap(&self) -> &ZswapLocalState {
        &self.initial_zswap
    }

    pub fn current_zswap(&self) -> &ZswapLocalState {
        &self.current_zswap
    }

    /// Fail unless the frame may still be mutated
    pub(crate) fn ensure_open(&self, action: &str) -> RuntimeResult<()> {
        if self.finalized {
            return Err(RuntimeError::usage(format!(
                "cannot {action}: frame for {}.{} at {} is already finalized",
                self.contract_id, self.circuit_id, self.address
            )));
        }
        Ok(())
    }

    pub(crate) fn describe(&self) -> String {
        format!("{}.{} at {}", self.contract_id, self.circuit_id, self.address)
    }
}
