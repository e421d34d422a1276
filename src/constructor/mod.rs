//! Contract deployment
//!
//! [`construct`] picks a fresh address, seeds a context for it and runs the
//! contract's initialization logic on the frame `constructor`. The logic may
//! query the ledger, call witnesses and call contracts that are already
//! deployed. The genesis states are read back from the frame; the frame is
//! never finalized and no trace is returned.

use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{CircuitContext, InitialStates, SharedBackend};
use crate::dispatch::ContractExecutables;
use crate::error::{RuntimeError, RuntimeResult};
use crate::ledger::{ContractState, QueryContext, StateValue};
use crate::types::{AlignedValue, CoinPublicKey, ContractAddress, RuntimeConfig, ZswapLocalState};
use crate::witness::WitnessSet;

/// Circuit id of the initialization frame
pub const CONSTRUCTOR_CIRCUIT: &str = "constructor";

/// Initialization logic of a contract
pub type ConstructorFn<P, Q> = dyn Fn(&mut CircuitContext<P, Q>, &WitnessSet<P>, &[AlignedValue]) -> RuntimeResult<()>
    + Send
    + Sync;

/// Inputs of a deployment
#[derive(Clone, Debug)]
pub struct ConstructorContext<P> {
    /// Private state the initialization starts from; `P::default()` if unset
    pub initial_private_state: Option<P>,
    pub initial_zswap_local_state: ZswapLocalState,
    /// Contracts already deployed, callable from the initialization logic
    pub deployed: InitialStates<P>,
}

impl<P> ConstructorContext<P> {
    pub fn new(coin_public_key: CoinPublicKey) -> Self {
        Self {
            initial_private_state: None,
            initial_zswap_local_state: ZswapLocalState::new(coin_public_key),
            deployed: InitialStates::new(coin_public_key),
        }
    }

    pub fn with_private_state(mut self, state: P) -> Self {
        self.initial_private_state = Some(state);
        self
    }

    /// Make an already deployed contract reachable
    pub fn with_deployed(mut self, address: ContractAddress, ledger: StateValue, private: P) -> Self {
        self.deployed = self.deployed.with_contract(address, ledger, private);
        self
    }
}

/// Genesis states of a deployed contract
#[derive(Clone, Debug)]
pub struct ConstructorResult<P> {
    pub address: ContractAddress,
    pub current_contract_state: ContractState,
    pub current_private_state: P,
    pub current_zswap_local_state: ZswapLocalState,
}

/// A contract ready to be deployed: its circuits and initialization logic
pub struct Contract<P, Q = crate::ledger::LocalQueryContext> {
    pub executables: ContractExecutables<P, Q>,
    pub initial_ledger: StateValue,
    pub initialize: Arc<ConstructorFn<P, Q>>,
}

impl<P: Clone + 'static, Q: QueryContext + 'static> Contract<P, Q> {
    pub fn new<F>(executables: ContractExecutables<P, Q>, initial_ledger: StateValue, initialize: F) -> Self
    where
        F: Fn(&mut CircuitContext<P, Q>, &WitnessSet<P>, &[AlignedValue]) -> RuntimeResult<()>
            + Send
            + Sync
            + 'static,
    {
        Self {
            executables,
            initial_ledger,
            initialize: Arc::new(initialize),
        }
    }
}

/// Deploy `contract` at a freshly sampled address
pub fn construct<P, Q>(
    backend: SharedBackend,
    config: RuntimeConfig,
    constructor_context: ConstructorContext<P>,
    contract: &Contract<P, Q>,
    witnesses: &WitnessSet<P>,
    args: &[AlignedValue],
) -> RuntimeResult<ConstructorResult<P>>
where
    P: Clone + Default + 'static,
    Q: QueryContext + 'static,
{
    let address = backend.sample_contract_address();
    let ConstructorContext {
        initial_private_state,
        initial_zswap_local_state,
        deployed,
    } = constructor_context;
    if deployed.ledger.contains_key(&address) {
        return Err(RuntimeError::usage(format!("address {address} is already deployed")));
    }

    let contract_id = contract.executables.contract_id();
    debug!(contract_id, %address, "constructing contract");

    let states = deployed
        .with_contract(
            address,
            contract.initial_ledger.clone(),
            initial_private_state.unwrap_or_default(),
        )
        .with_zswap(address, initial_zswap_local_state);
    let mut context = CircuitContext::<P, Q>::create(
        backend,
        config,
        states,
        contract_id,
        CONSTRUCTOR_CIRCUIT,
        address,
    )?;
    context.set_input(AlignedValue::concat(args))?;
    (contract.initialize)(&mut context, witnesses, args)?;

    let data = context.current_ledger()?.state().clone();
    let operations = contract.executables.circuit_ids().map(str::to_string);
    let result = ConstructorResult {
        address,
        current_contract_state: ContractState::new(data, operations),
        current_private_state: context.current_private_state().clone(),
        current_zswap_local_state: context.current_zswap().clone(),
    };
    info!(
        contract_id,
        %address,
        operations = result.current_contract_state.operations.len(),
        "contract constructed"
    );
    Ok(result)
}
