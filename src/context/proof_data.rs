//! Proof data and the per-call trace

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ledger::{Op, StateValue};
use crate::types::{AlignedValue, ContractAddress, Field};

/// Proof data of a call still in progress
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialProofData {
    /// Encoded circuit arguments
    pub input: AlignedValue,

    /// Encoded result, set once the circuit returns
    pub output: Option<AlignedValue>,

    /// Ledger instructions in execution order, each `popeq` carrying its read
    pub public_transcript: Vec<Op<AlignedValue>>,

    /// Witness results in call order
    pub private_transcript_outputs: Vec<AlignedValue>,

    /// Randomness of the binding commitment
    pub communication_commitment_rand: Field,

    /// Ledger states adopted from nested calls, in transcript order
    pub ledger_adoptions: Vec<LedgerAdoption>,
}

/// Ledger state a frame adopted when a nested call returned
///
/// A callee that writes to the caller's address changes the caller's ledger
/// outside the caller's own transcript. The adopted state replaces the
/// replayed one before the instruction at `transcript_index`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAdoption {
    pub transcript_index: usize,
    pub ledger: StateValue,
}

/// Proof data of a completed call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofData {
    pub input: AlignedValue,
    pub output: AlignedValue,
    pub public_transcript: Vec<Op<AlignedValue>>,
    pub private_transcript_outputs: Vec<AlignedValue>,
    pub communication_commitment_rand: Field,
    pub ledger_adoptions: Vec<LedgerAdoption>,

    /// Transient commitment to `input ++ output` under the randomness above
    pub communication_commitment: Field,
}

/// Evidentiary record of one finalized call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFrame {
    pub contract_id: String,
    pub circuit_id: String,
    pub address: ContractAddress,

    /// Ledger state when the frame was entered
    pub initial_ledger: StateValue,

    /// Ledger state when the frame was finalized
    pub final_ledger: StateValue,

    /// Ledger sequence number at finalization
    pub sequence: u64,

    pub proof_data: ProofData,
}

impl ProofFrame {
    /// Whether this frame records `circuit_id` of `contract_id` at `address`
    pub fn matches(&self, contract_id: &str, circuit_id: &str, address: &ContractAddress) -> bool {
        self.contract_id == contract_id && self.circuit_id == circuit_id && self.address == *address
    }
}

/// Append-only list of proof frames, in completion order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofTrace {
    frames: Vec<ProofFrame>,
}

impl ProofTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, frame: ProofFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[ProofFrame] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProofFrame> {
        self.frames.iter()
    }

    pub fn last(&self) -> Option<&ProofFrame> {
        self.frames.last()
    }

    /// Frames recorded for one contract/circuit/address triple
    pub fn frames_for<'a>(
        &'a self,
        contract_id: &'a str,
        circuit_id: &'a str,
        address: &'a ContractAddress,
    ) -> impl Iterator<Item = &'a ProofFrame> + 'a {
        self.frames
            .iter()
            .filter(move |frame| frame.matches(contract_id, circuit_id, address))
    }

    /// Load a trace from a file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let trace: Self = bincode::deserialize(&data)?;
        Ok(trace)
    }

    /// Save the trace to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Size of the serialized trace in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

impl IntoIterator for ProofTrace {
    type Item = ProofFrame;
    type IntoIter = std::vec::IntoIter<ProofFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProofTrace {
    type Item = &'a ProofFrame;
    type IntoIter = std::slice::Iter<'a, ProofFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::field_key;
    use num_bigint::BigUint;

    fn frame(circuit_id: &str) -> ProofFrame {
        ProofFrame {
            contract_id: "counter".to_string(),
            circuit_id: circuit_id.to_string(),
            address: ContractAddress::new([1u8; 32]),
            initial_ledger: StateValue::array(1),
            final_ledger: StateValue::array(1),
            sequence: 3,
            proof_data: ProofData {
                input: field_key(1),
                output: AlignedValue::empty(),
                public_transcript: vec![Op::Pop],
                private_transcript_outputs: Vec::new(),
                communication_commitment_rand: BigUint::from(7u32),
                ledger_adoptions: Vec::new(),
                communication_commitment: BigUint::from(9u32),
            },
        }
    }

    #[test]
    fn test_frames_for_filters_by_triple() {
        let mut trace = ProofTrace::new();
        trace.push(frame("increment"));
        trace.push(frame("reset"));
        trace.push(frame("increment"));
        let address = ContractAddress::new([1u8; 32]);
        assert_eq!(trace.frames_for("counter", "increment", &address).count(), 2);
        assert_eq!(trace.frames_for("counter", "reset", &ContractAddress::default()).count(), 0);
    }

    #[test]
    fn test_trace_save_load() {
        let mut trace = ProofTrace::new();
        trace.push(frame("increment"));
        let path = std::env::temp_dir().join(format!("trace-{}.bin", std::process::id()));
        trace.save(&path).unwrap();
        let loaded = ProofTrace::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, trace);
        assert!(trace.size_bytes() > 0);
    }
}
