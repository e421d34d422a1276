//! Proof-data verification
//!
//! Checks that a recorded [`ProofFrame`] is internally consistent with the
//! shape of the circuit it claims to come from: input and output match the
//! circuit's alignments, the public transcript replays against the initial
//! ledger reproducing every recorded read and the final ledger, and the
//! binding commitment opens to `input ++ output`.
//!
//! Ledger states a frame adopted from nested calls are taken as recorded:
//! replay switches to the adopted state at the instruction it was adopted
//! before.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::backend::CryptoBackend;
use crate::context::{ProofFrame, ProofTrace};
use crate::ledger::{CostModel, LocalQueryContext, QueryContext};
use crate::types::{AlignedValue, Alignment, Field};

/// Proof-data verification errors
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("No shape registered for circuit {0}")]
    UnknownCircuit(String),

    #[error("Input alignment mismatch: expected {expected}, got {actual}")]
    InputAlignment { expected: String, actual: String },

    #[error("Output alignment mismatch: expected {expected}, got {actual}")]
    OutputAlignment { expected: String, actual: String },

    #[error("Value out of range: {0}")]
    Misaligned(String),

    #[error("Transcript does not replay: {0}")]
    Transcript(String),

    #[error("Replayed ledger differs from the recorded final ledger")]
    FinalLedger,

    #[error("Communication commitment does not open to the recorded input and output")]
    Commitment,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Input and output alignment of a circuit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitShape {
    pub input: Alignment,
    pub output: Alignment,
}

impl CircuitShape {
    pub fn new(input: Alignment, output: Alignment) -> Self {
        Self { input, output }
    }
}

/// Verify one proof frame against the shape of its circuit
pub fn check_proof_data<B>(backend: &B, shape: &CircuitShape, frame: &ProofFrame) -> Result<(), VerifyError>
where
    B: CryptoBackend + ?Sized,
{
    let data = &frame.proof_data;
    let max_field = backend.max_field();

    check_alignment(&data.input, &shape.input, &max_field).map_err(|e| match e {
        Mismatch::Alignment(actual) => VerifyError::InputAlignment {
            expected: shape.input.to_string(),
            actual,
        },
        Mismatch::Range(msg) => VerifyError::Misaligned(format!("input: {msg}")),
    })?;
    check_alignment(&data.output, &shape.output, &max_field).map_err(|e| match e {
        Mismatch::Alignment(actual) => VerifyError::OutputAlignment {
            expected: shape.output.to_string(),
            actual,
        },
        Mismatch::Range(msg) => VerifyError::Misaligned(format!("output: {msg}")),
    })?;

    // Queries are replayed back to back, so the per-query gas limit does not apply
    let cost_model = CostModel::unlimited();
    let transcript = &data.public_transcript;
    let mut ledger = LocalQueryContext::from_state(frame.initial_ledger.clone(), frame.address);
    let mut start = 0;
    for adoption in &data.ledger_adoptions {
        let end = adoption.transcript_index;
        if end < start || end > transcript.len() {
            return Err(VerifyError::Transcript(format!(
                "ledger adoption at instruction {end} is out of order"
            )));
        }
        ledger
            .replay(&transcript[start..end], &cost_model)
            .map_err(|e| VerifyError::Transcript(e.to_string()))?;
        ledger = LocalQueryContext::from_state(adoption.ledger.clone(), frame.address);
        start = end;
    }
    let replayed = ledger
        .replay(&transcript[start..], &cost_model)
        .map_err(|e| VerifyError::Transcript(e.to_string()))?;
    if replayed.state() != &frame.final_ledger {
        return Err(VerifyError::FinalLedger);
    }

    let communication = AlignedValue::concat([&data.input, &data.output]);
    let commitment = backend
        .transient_commit(&communication, &data.communication_commitment_rand)
        .map_err(|e| VerifyError::Backend(e.to_string()))?;
    if commitment != data.communication_commitment {
        return Err(VerifyError::Commitment);
    }

    debug!(
        contract_id = %frame.contract_id,
        circuit_id = %frame.circuit_id,
        ops = data.public_transcript.len(),
        "proof data verified"
    );
    Ok(())
}

/// Verify every frame of a trace, looking shapes up by contract and circuit id
pub fn check_trace<B>(
    backend: &B,
    shapes: &BTreeMap<(String, String), CircuitShape>,
    trace: &ProofTrace,
) -> Result<(), VerifyError>
where
    B: CryptoBackend + ?Sized,
{
    for frame in trace {
        let key = (frame.contract_id.clone(), frame.circuit_id.clone());
        let shape = shapes
            .get(&key)
            .ok_or_else(|| VerifyError::UnknownCircuit(format!("{}.{}", key.0, key.1)))?;
        check_proof_data(backend, shape, frame)?;
    }
    Ok(())
}

enum Mismatch {
    Alignment(String),
    Range(String),
}

fn check_alignment(value: &AlignedValue, expected: &Alignment, max_field: &Field) -> Result<(), Mismatch> {
    if &value.alignment != expected {
        return Err(Mismatch::Alignment(value.alignment.to_string()));
    }
    value.check_aligned(max_field).map_err(Mismatch::Range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReferenceBackend;
    use crate::codec::{CompactType, CompactUnsignedInteger};
    use crate::context::{CircuitContext, InitialStates};
    use crate::ledger::{read_field, write_field, Op, StateValue};
    use crate::types::{CoinPublicKey, ContractAddress, RuntimeConfig};
    use num_bigint::BigUint;
    use std::sync::Arc;

    fn uint8() -> CompactUnsignedInteger {
        CompactUnsignedInteger::for_bytes(1)
    }

    fn shape() -> CircuitShape {
        CircuitShape::new(uint8().alignment(), uint8().alignment())
    }

    fn recorded_frame() -> ProofFrame {
        let address = ContractAddress::new([3; 32]);
        let states = InitialStates::new(CoinPublicKey::default()).with_contract(address, StateValue::array(1), ());
        let mut ctx = CircuitContext::<()>::create(
            Arc::new(ReferenceBackend::new()),
            RuntimeConfig::fast_test(),
            states,
            "store",
            "set",
            address,
        )
        .unwrap();
        let value = uint8().encode(&BigUint::from(5u32)).unwrap();
        ctx.set_input(value.clone()).unwrap();
        ctx.query_ledger_state(&write_field(0, value.clone())).unwrap();
        let read = ctx.query_ledger_state(&read_field(0)).unwrap();
        ctx.set_output(read[0].clone()).unwrap();
        ctx.finalize().unwrap();
        ctx.into_trace().into_iter().next().unwrap()
    }

    #[test]
    fn test_recorded_frame_verifies() {
        check_proof_data(&ReferenceBackend::new(), &shape(), &recorded_frame()).unwrap();
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let shape = CircuitShape::new(Alignment::bytes(2), uint8().alignment());
        let err = check_proof_data(&ReferenceBackend::new(), &shape, &recorded_frame()).unwrap_err();
        assert!(matches!(err, VerifyError::InputAlignment { .. }));
    }

    #[test]
    fn test_tampered_read_rejected() {
        let mut frame = recorded_frame();
        let last = frame.proof_data.public_transcript.len() - 1;
        frame.proof_data.public_transcript[last] = Op::Popeq {
            cached: false,
            result: uint8().encode(&BigUint::from(6u32)).unwrap(),
        };
        let err = check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap_err();
        assert!(matches!(err, VerifyError::Transcript(_)));
    }

    #[test]
    fn test_tampered_final_ledger_rejected() {
        let mut frame = recorded_frame();
        frame.final_ledger = StateValue::array(1);
        let err = check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap_err();
        assert!(matches!(err, VerifyError::FinalLedger));
    }

    #[test]
    fn test_tampered_output_breaks_commitment() {
        let mut frame = recorded_frame();
        frame.proof_data.output = uint8().encode(&BigUint::from(7u32)).unwrap();
        let err = check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap_err();
        assert!(matches!(err, VerifyError::Commitment));
    }

    /// `store.set` writes 5, a nested `store.bump` on the same address
    /// writes 6, then `store.set` reads the 6 back
    fn adopting_frame() -> ProofFrame {
        let address = ContractAddress::new([4; 32]);
        let states = InitialStates::new(CoinPublicKey::default()).with_contract(address, StateValue::array(1), ());
        let mut ctx = CircuitContext::<()>::create(
            Arc::new(ReferenceBackend::new()),
            RuntimeConfig::fast_test(),
            states,
            "store",
            "set",
            address,
        )
        .unwrap();
        let five = uint8().encode(&BigUint::from(5u32)).unwrap();
        let six = uint8().encode(&BigUint::from(6u32)).unwrap();
        ctx.set_input(five.clone()).unwrap();
        ctx.query_ledger_state(&write_field(0, five)).unwrap();

        ctx.push_frame("store", "bump", address).unwrap();
        ctx.query_ledger_state(&write_field(0, six.clone())).unwrap();
        ctx.set_output(six).unwrap();
        ctx.finalize().unwrap();
        ctx.pop_frame().unwrap();

        let read = ctx.query_ledger_state(&read_field(0)).unwrap();
        ctx.set_output(read[0].clone()).unwrap();
        ctx.finalize().unwrap();
        ctx.into_trace().into_iter().last().unwrap()
    }

    #[test]
    fn test_adopted_ledger_replays() {
        let frame = adopting_frame();
        assert_eq!(frame.proof_data.ledger_adoptions.len(), 1);
        check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap();
    }

    #[test]
    fn test_dropped_adoption_rejected() {
        let mut frame = adopting_frame();
        frame.proof_data.ledger_adoptions.clear();
        let err = check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap_err();
        assert!(matches!(err, VerifyError::Transcript(_)));
    }

    #[test]
    fn test_tampered_adoption_rejected() {
        let mut frame = adopting_frame();
        frame.proof_data.ledger_adoptions[0].ledger = frame.initial_ledger.clone();
        let err = check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap_err();
        assert!(matches!(err, VerifyError::Transcript(_)));
    }

    #[test]
    fn test_adoption_past_transcript_end_rejected() {
        let mut frame = adopting_frame();
        frame.proof_data.ledger_adoptions[0].transcript_index = frame.proof_data.public_transcript.len() + 1;
        let err = check_proof_data(&ReferenceBackend::new(), &shape(), &frame).unwrap_err();
        assert!(matches!(err, VerifyError::Transcript(msg) if msg.contains("out of order")));
    }

    #[test]
    fn test_check_trace_unknown_circuit() {
        let mut trace = ProofTrace::new();
        trace.push(recorded_frame());
        let err = check_trace(&ReferenceBackend::new(), &BTreeMap::new(), &trace).unwrap_err();
        assert!(matches!(err, VerifyError::UnknownCircuit(name) if name == "store.set"));
    }
}
