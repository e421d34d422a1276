//! Circuit dispatch
//!
//! [`call_circuit`] runs a top-level call on a freshly created context.
//! [`inter_contract_call`] runs a circuit of another contract from inside a
//! running circuit: the caller's frame is suspended, the callee gets a fresh
//! frame on the same context, and once the callee is finalized the caller
//! resumes.
//!
//! ## State after a nested call
//!
//! The per-address state maps are canonical. Before the callee starts, the
//! caller's current states are written into them; when the callee returns,
//! the caller re-reads the states of its own address from them. A callee that
//! mutates the caller's address, directly or through a further nested call,
//! is therefore observed by the caller, and the adopted ledger is recorded in
//! the caller's proof data so its transcript still replays.
//!
//! Frames are appended to the trace in completion order, so a call tree
//! X -> Y -> Z yields the trace `[Z, Y, X]`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{CircuitContext, ProofData};
use crate::error::{RuntimeError, RuntimeResult};
use crate::ledger::{LocalQueryContext, QueryContext};
use crate::types::{AlignedValue, ContractAddress};
use crate::witness::WitnessSet;

/// Compiled circuit body
pub type CircuitFn<P, Q> = dyn Fn(&mut CircuitContext<P, Q>, &WitnessSet<P>, &[AlignedValue]) -> RuntimeResult<AlignedValue>
    + Send
    + Sync;

/// Circuit table of one contract
pub struct ContractExecutables<P, Q = LocalQueryContext> {
    contract_id: String,
    circuits: BTreeMap<String, Arc<CircuitFn<P, Q>>>,
}

impl<P, Q> Clone for ContractExecutables<P, Q> {
    fn clone(&self) -> Self {
        Self {
            contract_id: self.contract_id.clone(),
            circuits: self.circuits.clone(),
        }
    }
}

impl<P, Q> fmt::Debug for ContractExecutables<P, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractExecutables")
            .field("contract_id", &self.contract_id)
            .field("circuits", &self.circuits.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<P: Clone + 'static, Q: QueryContext + 'static> ContractExecutables<P, Q> {
    pub fn new(contract_id: &str) -> Self {
        Self {
            contract_id: contract_id.to_string(),
            circuits: BTreeMap::new(),
        }
    }

    /// Register a circuit
    pub fn with_circuit<F>(mut self, circuit_id: &str, f: F) -> Self
    where
        F: Fn(&mut CircuitContext<P, Q>, &WitnessSet<P>, &[AlignedValue]) -> RuntimeResult<AlignedValue>
            + Send
            + Sync
            + 'static,
    {
        self.circuits.insert(circuit_id.to_string(), Arc::new(f));
        self
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    /// Look up a circuit by name
    pub fn circuit(&self, circuit_id: &str) -> RuntimeResult<Arc<CircuitFn<P, Q>>> {
        self.circuits.get(circuit_id).cloned().ok_or_else(|| {
            RuntimeError::MissingCircuit(format!(
                "contract {} has no circuit {circuit_id}",
                self.contract_id
            ))
        })
    }

    /// Names of the exported circuits
    pub fn circuit_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.circuits.keys().map(String::as_str)
    }
}

/// Outcome of a top-level call
pub struct CircuitResults<P, Q = LocalQueryContext> {
    /// Encoded circuit result
    pub result: AlignedValue,
    /// Proof data of the top-level frame
    pub proof_data: ProofData,
    /// The context after the call, holding the full trace
    pub context: CircuitContext<P, Q>,
}

/// Run the body of the active frame to completion and finalize it
fn run_frame<P, Q>(
    context: &mut CircuitContext<P, Q>,
    circuit: &CircuitFn<P, Q>,
    witnesses: &WitnessSet<P>,
    args: &[AlignedValue],
) -> RuntimeResult<AlignedValue>
where
    P: Clone + 'static,
    Q: QueryContext + 'static,
{
    context.set_input(AlignedValue::concat(args))?;
    let result = circuit(&mut *context, witnesses, args)?;
    context.set_output(result.clone())?;
    context.finalize()?;
    Ok(result)
}

/// Run the circuit named by the context's active frame as a top-level call
pub fn call_circuit<P, Q>(
    mut context: CircuitContext<P, Q>,
    executables: &ContractExecutables<P, Q>,
    witnesses: &WitnessSet<P>,
    args: &[AlignedValue],
) -> RuntimeResult<CircuitResults<P, Q>>
where
    P: Clone + 'static,
    Q: QueryContext + 'static,
{
    if executables.contract_id() != context.contract_id() {
        return Err(RuntimeError::usage(format!(
            "context is set up for contract {}, not {}",
            context.contract_id(),
            executables.contract_id()
        )));
    }
    let circuit = executables.circuit(context.circuit_id())?;
    let result = run_frame(&mut context, circuit.as_ref(), witnesses, args)?;

    let proof_data = context
        .trace()
        .last()
        .map(|frame| frame.proof_data.clone())
        .ok_or_else(|| RuntimeError::usage("finalized call left no proof frame"))?;
    info!(
        contract_id = context.contract_id(),
        circuit_id = context.circuit_id(),
        frames = context.trace().len(),
        "circuit call complete"
    );
    Ok(CircuitResults {
        result,
        proof_data,
        context,
    })
}

/// Call `circuit_id` of the contract deployed at `address` from the running
/// circuit
///
/// The caller's frame is restored before returning, whether or not the
/// callee succeeded.
pub fn inter_contract_call<P, Q>(
    context: &mut CircuitContext<P, Q>,
    callee: &ContractExecutables<P, Q>,
    witnesses: &WitnessSet<P>,
    circuit_id: &str,
    address: ContractAddress,
    args: &[AlignedValue],
) -> RuntimeResult<AlignedValue>
where
    P: Clone + 'static,
    Q: QueryContext + 'static,
{
    let circuit = callee.circuit(circuit_id)?;
    context.push_frame(callee.contract_id(), circuit_id, address)?;
    let outcome = run_frame(context, circuit.as_ref(), witnesses, args);
    context.pop_frame()?;
    debug!(
        contract_id = callee.contract_id(),
        circuit_id,
        %address,
        ok = outcome.is_ok(),
        "inter-contract call returned"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReferenceBackend;
    use crate::context::InitialStates;
    use crate::ledger::StateValue;
    use crate::types::{CoinPublicKey, RuntimeConfig};

    const X: ContractAddress = ContractAddress::new([1; 32]);
    const Y: ContractAddress = ContractAddress::new([2; 32]);

    fn context(circuit_id: &str) -> CircuitContext<u32> {
        let states = InitialStates::new(CoinPublicKey::default())
            .with_contract(X, StateValue::array(1), 0)
            .with_contract(Y, StateValue::array(1), 0);
        CircuitContext::create(
            Arc::new(ReferenceBackend::new()),
            RuntimeConfig::fast_test(),
            states,
            "x",
            circuit_id,
            X,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_circuit() {
        let exec = ContractExecutables::<u32>::new("x");
        let err = call_circuit(context("nope"), &exec, &WitnessSet::new(), &[]).err().unwrap();
        assert!(matches!(err, RuntimeError::MissingCircuit(_)));
    }

    #[test]
    fn test_contract_mismatch_is_usage_error() {
        let exec = ContractExecutables::<u32>::new("y")
            .with_circuit("run", |_: &mut CircuitContext<u32>, _: &WitnessSet<u32>, _: &[AlignedValue]| {
                Ok(AlignedValue::empty())
            });
        let err = call_circuit(context("run"), &exec, &WitnessSet::new(), &[]).err().unwrap();
        assert!(matches!(err, RuntimeError::Usage(_)));
    }

    #[test]
    fn test_failed_callee_restores_caller() {
        let y = Arc::new(ContractExecutables::<u32>::new("y").with_circuit(
            "fail",
            |_: &mut CircuitContext<u32>, _: &WitnessSet<u32>, _: &[AlignedValue]| {
                Err(RuntimeError::assertion("nope"))
            },
        ));
        let x = ContractExecutables::<u32>::new("x").with_circuit(
            "run",
            move |ctx: &mut CircuitContext<u32>, w: &WitnessSet<u32>, _: &[AlignedValue]| {
                let err = inter_contract_call(ctx, &y, w, "fail", Y, &[]).unwrap_err();
                assert!(matches!(err, RuntimeError::Assertion(_)));
                assert_eq!(ctx.address(), X);
                assert_eq!(ctx.depth(), 0);
                Ok(AlignedValue::empty())
            },
        );
        let results = call_circuit(context("run"), &x, &WitnessSet::new(), &[]).ok().unwrap();
        assert_eq!(results.context.trace().len(), 1);
    }

    #[test]
    fn test_call_depth_limit() {
        fn recurse(ctx: &mut CircuitContext<u32>, w: &WitnessSet<u32>, _: &[AlignedValue]) -> RuntimeResult<AlignedValue> {
            let exec = ContractExecutables::<u32>::new("x").with_circuit("run", recurse);
            inter_contract_call(ctx, &exec, w, "run", X, &[])
        }
        let exec = ContractExecutables::<u32>::new("x").with_circuit("run", recurse);
        let err = call_circuit(context("run"), &exec, &WitnessSet::new(), &[]).err().unwrap();
        assert!(matches!(err, RuntimeError::Usage(msg) if msg.contains("depth")));
    }
}
