//! Witness protocol
//!
//! Witnesses are caller-supplied functions that read the projected ledger
//! view and the private state, and return an updated private state together
//! with a value the circuit could not derive publicly.
//!
//! A [`WitnessSet`] maps contract id to witness id to function. It is built
//! once and passed explicitly into every call that needs it. [`call_witness`]
//! overwrites the active frame's private state with the first component of the
//! result and records the second in the frame's private transcript, so the
//! call can be replayed without invoking the witness again.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::codec::CompactType;
use crate::context::CircuitContext;
use crate::error::{RuntimeError, RuntimeResult};
use crate::ledger::{QueryContext, StateValue};
use crate::types::{AlignedValue, ContractAddress};

/// View handed to a witness
#[derive(Debug)]
pub struct WitnessContext<'a, P> {
    /// Current ledger state of the calling contract
    pub ledger: &'a StateValue,
    /// Current private state
    pub private_state: &'a P,
    /// Address of the calling contract
    pub contract_address: ContractAddress,
}

/// Witness function: returns the new private state and the encoded result
pub type WitnessFn<P> =
    dyn Fn(WitnessContext<'_, P>, &[AlignedValue]) -> RuntimeResult<(P, AlignedValue)> + Send + Sync;

/// Witnesses of every contract reachable from a call
pub struct WitnessSet<P> {
    witnesses: BTreeMap<String, BTreeMap<String, Arc<WitnessFn<P>>>>,
}

impl<P> Default for WitnessSet<P> {
    fn default() -> Self {
        Self {
            witnesses: BTreeMap::new(),
        }
    }
}

impl<P> Clone for WitnessSet<P> {
    fn clone(&self) -> Self {
        Self {
            witnesses: self.witnesses.clone(),
        }
    }
}

impl<P> fmt::Debug for WitnessSet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (contract, witnesses) in &self.witnesses {
            map.entry(contract, &witnesses.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

impl<P: 'static> WitnessSet<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a witness working on encoded values
    pub fn insert<F>(&mut self, contract_id: &str, witness_id: &str, f: F)
    where
        F: Fn(WitnessContext<'_, P>, &[AlignedValue]) -> RuntimeResult<(P, AlignedValue)>
            + Send
            + Sync
            + 'static,
    {
        self.witnesses
            .entry(contract_id.to_string())
            .or_default()
            .insert(witness_id.to_string(), Arc::new(f));
    }

    /// Register a witness returning a native value, encoded with `codec`
    pub fn insert_typed<C, F>(&mut self, contract_id: &str, witness_id: &str, codec: C, f: F)
    where
        C: CompactType + Send + Sync + 'static,
        F: Fn(WitnessContext<'_, P>, &[AlignedValue]) -> RuntimeResult<(P, C::Native)>
            + Send
            + Sync
            + 'static,
    {
        self.insert(contract_id, witness_id, move |ctx, args| {
            let (state, result) = f(ctx, args)?;
            Ok((state, codec.encode(&result)?))
        });
    }

    /// Builder form of [`WitnessSet::insert`]
    pub fn with<F>(mut self, contract_id: &str, witness_id: &str, f: F) -> Self
    where
        F: Fn(WitnessContext<'_, P>, &[AlignedValue]) -> RuntimeResult<(P, AlignedValue)>
            + Send
            + Sync
            + 'static,
    {
        self.insert(contract_id, witness_id, f);
        self
    }

    /// Look up a witness
    pub fn read_witness(&self, contract_id: &str, witness_id: &str) -> RuntimeResult<Arc<WitnessFn<P>>> {
        let contract = self.witnesses.get(contract_id).ok_or_else(|| {
            RuntimeError::MissingWitness(format!("no witnesses registered for contract {contract_id}"))
        })?;
        contract.get(witness_id).cloned().ok_or_else(|| {
            RuntimeError::MissingWitness(format!("contract {contract_id} has no witness {witness_id}"))
        })
    }
}

/// Invoke a witness of the active contract
///
/// Overwrites the frame's private state and records the result in its
/// private transcript. Returns the encoded result.
pub fn call_witness<P, Q>(
    context: &mut CircuitContext<P, Q>,
    witnesses: &WitnessSet<P>,
    witness_id: &str,
    args: &[AlignedValue],
) -> RuntimeResult<AlignedValue>
where
    P: Clone + 'static,
    Q: QueryContext,
{
    let witness = witnesses.read_witness(context.contract_id(), witness_id)?;
    let (private_state, result) = {
        let view = WitnessContext {
            ledger: context.current_ledger()?.state(),
            private_state: context.current_private_state(),
            contract_address: context.address(),
        };
        (*witness)(view, args)?
    };
    trace!(
        contract_id = context.contract_id(),
        witness_id,
        segments = result.value.len(),
        "witness called"
    );
    context.set_private_state(private_state)?;
    context.record_private_output(result.clone())?;
    Ok(result)
}

/// Invoke a witness and decode its result with `codec`
pub fn call_witness_typed<P, Q, C>(
    context: &mut CircuitContext<P, Q>,
    witnesses: &WitnessSet<P>,
    witness_id: &str,
    args: &[AlignedValue],
    codec: &C,
) -> RuntimeResult<C::Native>
where
    P: Clone + 'static,
    Q: QueryContext,
    C: CompactType,
{
    let result = call_witness(context, witnesses, witness_id, args)?;
    codec.decode(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReferenceBackend;
    use crate::codec::OpaqueString;
    use crate::context::InitialStates;
    use crate::types::{CoinPublicKey, RuntimeConfig};

    fn context() -> CircuitContext<u32> {
        let states = InitialStates::new(CoinPublicKey::default()).with_contract(
            ContractAddress::default(),
            StateValue::array(1),
            0,
        );
        CircuitContext::create(
            Arc::new(ReferenceBackend::new()),
            RuntimeConfig::fast_test(),
            states,
            "A",
            "main",
            ContractAddress::default(),
        )
        .unwrap()
    }

    fn witnesses() -> WitnessSet<u32> {
        let mut set = WitnessSet::new();
        set.insert_typed("A", "1", OpaqueString, |ctx: WitnessContext<'_, u32>, _args: &[AlignedValue]| {
            Ok((*ctx.private_state + 1, "A1".to_string()))
        });
        set
    }

    #[test]
    fn test_read_witness_missing() {
        let set = witnesses();
        assert!(set.read_witness("A", "1").is_ok());
        assert!(matches!(set.read_witness("B", "1"), Err(RuntimeError::MissingWitness(_))));
        assert!(matches!(set.read_witness("A", "2"), Err(RuntimeError::MissingWitness(_))));
    }

    #[test]
    fn test_call_witness_threads_private_state() {
        let mut ctx = context();
        let set = witnesses();
        call_witness(&mut ctx, &set, "1", &[]).unwrap();
        let second = call_witness_typed(&mut ctx, &set, "1", &[], &OpaqueString).unwrap();
        assert_eq!(*ctx.current_private_state(), 2);
        assert_eq!(second, "A1");
        assert_eq!(ctx.frame().proof_data().private_transcript_outputs.len(), 2);
    }

    #[test]
    fn test_witness_sees_ledger_and_address() {
        let mut ctx = context();
        let set = WitnessSet::new().with("A", "peek", |ctx: WitnessContext<'_, u32>, _: &[AlignedValue]| {
            assert_eq!(ctx.ledger, &StateValue::array(1));
            assert_eq!(ctx.contract_address, ContractAddress::default());
            Ok((*ctx.private_state, AlignedValue::empty()))
        });
        call_witness(&mut ctx, &set, "peek", &[]).unwrap();
        assert_eq!(*ctx.current_private_state(), 0);
    }
}
