//! Circuit context and stack-frame model
//!
//! A [`CircuitContext`] is the execution environment of one top-level call.
//! It owns the active [`StackFrame`], the frames of callers suspended by
//! inter-contract calls, per-address maps of ledger, private and
//! confidential-transfer state for every reachable contract, the append-only
//! [`ProofTrace`] and the ledger sequence counter.
//!
//! ## Lifecycle
//!
//! 1. `create` seeds one query context per address and installs the first frame
//! 2. the circuit body reads and mutates the active frame, issuing ledger
//!    queries through `query_ledger_state`
//! 3. `finalize` persists the frame's final states into the maps and appends a
//!    [`ProofFrame`] to the trace; the frame may not be mutated afterwards
//!
//! Reading state for an address the context was not seeded with is a
//! [`RuntimeError::MissingState`].

mod frame;
mod proof_data;

pub use frame::StackFrame;
pub use proof_data::{LedgerAdoption, PartialProofData, ProofData, ProofFrame, ProofTrace};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::backend::CryptoBackend;
use crate::error::{RuntimeError, RuntimeResult};
use crate::ledger::{GatherEvent, LocalQueryContext, Op, QueryContext, StateValue};
use crate::types::{AlignedValue, CoinPublicKey, ContractAddress, RuntimeConfig, ZswapLocalState};

/// Shared handle to the backend used by a context
pub type SharedBackend = Arc<dyn CryptoBackend + Send + Sync>;

/// States a context is seeded with
#[derive(Clone, Debug)]
pub struct InitialStates<P> {
    pub coin_public_key: CoinPublicKey,
    pub ledger: BTreeMap<ContractAddress, StateValue>,
    pub private: BTreeMap<ContractAddress, P>,
    pub zswap: BTreeMap<ContractAddress, ZswapLocalState>,
}

impl<P> InitialStates<P> {
    pub fn new(coin_public_key: CoinPublicKey) -> Self {
        Self {
            coin_public_key,
            ledger: BTreeMap::new(),
            private: BTreeMap::new(),
            zswap: BTreeMap::new(),
        }
    }

    /// Add a contract with its ledger and private state
    pub fn with_contract(mut self, address: ContractAddress, ledger: StateValue, private: P) -> Self {
        self.ledger.insert(address, ledger);
        self.private.insert(address, private);
        self
    }

    /// Override the confidential-transfer state of a contract
    pub fn with_zswap(mut self, address: ContractAddress, zswap: ZswapLocalState) -> Self {
        self.zswap.insert(address, zswap);
        self
    }
}

/// Execution environment of one top-level call
#[derive(Clone)]
pub struct CircuitContext<P, Q = LocalQueryContext> {
    frame: StackFrame<P, Q>,
    callers: Vec<StackFrame<P, Q>>,
    ledger_states: BTreeMap<ContractAddress, Q>,
    private_states: BTreeMap<ContractAddress, P>,
    zswap_states: BTreeMap<ContractAddress, ZswapLocalState>,
    trace: ProofTrace,
    sequence: u64,
    config: RuntimeConfig,
    backend: SharedBackend,
}

impl<P: Clone, Q: QueryContext> CircuitContext<P, Q> {
    /// Create a context and install the frame of `circuit_id` of `contract_id`
    /// at `address`
    pub fn create(
        backend: SharedBackend,
        config: RuntimeConfig,
        states: InitialStates<P>,
        contract_id: &str,
        circuit_id: &str,
        address: ContractAddress,
    ) -> RuntimeResult<Self> {
        config.validate()?;

        let ledger_states: BTreeMap<_, _> = states
            .ledger
            .into_iter()
            .map(|(addr, state)| (addr, Q::from_state(state, addr)))
            .collect();
        let mut zswap_states = states.zswap;
        for addr in ledger_states.keys() {
            zswap_states
                .entry(*addr)
                .or_insert_with(|| ZswapLocalState::new(states.coin_public_key));
        }

        let frame = Self::load_frame(
            &ledger_states,
            &states.private,
            &zswap_states,
            backend.as_ref(),
            contract_id,
            circuit_id,
            address,
        )?;

        debug!(
            contract_id,
            circuit_id,
            %address,
            contracts = ledger_states.len(),
            backend = backend.name(),
            "created circuit context"
        );

        Ok(Self {
            frame,
            callers: Vec::new(),
            ledger_states,
            private_states: states.private,
            zswap_states,
            trace: ProofTrace::new(),
            sequence: 0,
            config,
            backend,
        })
    }

    fn load_frame(
        ledger_states: &BTreeMap<ContractAddress, Q>,
        private_states: &BTreeMap<ContractAddress, P>,
        zswap_states: &BTreeMap<ContractAddress, ZswapLocalState>,
        backend: &(dyn CryptoBackend + Send + Sync),
        contract_id: &str,
        circuit_id: &str,
        address: ContractAddress,
    ) -> RuntimeResult<StackFrame<P, Q>> {
        let ledger = ledger_states
            .get(&address)
            .ok_or_else(|| RuntimeError::MissingState(format!("no ledger state for {address}")))?;
        let private = private_states
            .get(&address)
            .ok_or_else(|| RuntimeError::MissingState(format!("no private state for {address}")))?;
        let zswap = zswap_states.get(&address).ok_or_else(|| {
            RuntimeError::MissingState(format!("no confidential-transfer state for {address}"))
        })?;
        Ok(StackFrame::new(
            contract_id.to_string(),
            circuit_id.to_string(),
            address,
            ledger.clone(),
            private.clone(),
            zswap.clone(),
            backend.sample_field(),
        ))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The active frame
    pub fn frame(&self) -> &StackFrame<P, Q> {
        &self.frame
    }

    pub fn contract_id(&self) -> &str {
        &self.frame.contract_id
    }

    pub fn circuit_id(&self) -> &str {
        &self.frame.circuit_id
    }

    pub fn address(&self) -> ContractAddress {
        self.frame.address
    }

    /// Current ledger context of the active frame
    pub fn current_ledger(&self) -> RuntimeResult<&Q> {
        self.frame.current_ledger.as_ref().ok_or_else(|| {
            RuntimeError::MissingState(format!("no ledger context for {}", self.frame.describe()))
        })
    }

    /// Current private state of the active frame
    pub fn current_private_state(&self) -> &P {
        &self.frame.current_private_state
    }

    /// Replace the private state of the active frame
    pub fn set_private_state(&mut self, state: P) -> RuntimeResult<()> {
        self.frame.ensure_open("update private state")?;
        self.frame.current_private_state = state;
        Ok(())
    }

    /// Current confidential-transfer state of the active frame
    pub fn current_zswap(&self) -> &ZswapLocalState {
        &self.frame.current_zswap
    }

    /// Mutable confidential-transfer state of the active frame
    pub fn zswap_mut(&mut self) -> RuntimeResult<&mut ZswapLocalState> {
        self.frame.ensure_open("update confidential-transfer state")?;
        Ok(&mut self.frame.current_zswap)
    }

    /// Ledger context recorded for `address`
    pub fn ledger_state(&self, address: &ContractAddress) -> RuntimeResult<&Q> {
        self.ledger_states
            .get(address)
            .ok_or_else(|| RuntimeError::MissingState(format!("no ledger state for {address}")))
    }

    /// Private state recorded for `address`
    pub fn private_state(&self, address: &ContractAddress) -> RuntimeResult<&P> {
        self.private_states
            .get(address)
            .ok_or_else(|| RuntimeError::MissingState(format!("no private state for {address}")))
    }

    /// Confidential-transfer state recorded for `address`
    pub fn zswap_state(&self, address: &ContractAddress) -> RuntimeResult<&ZswapLocalState> {
        self.zswap_states.get(address).ok_or_else(|| {
            RuntimeError::MissingState(format!("no confidential-transfer state for {address}"))
        })
    }

    pub fn trace(&self) -> &ProofTrace {
        &self.trace
    }

    /// Consume the context, keeping only its trace
    pub fn into_trace(self) -> ProofTrace {
        self.trace
    }

    /// Ledger sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of suspended callers
    pub fn depth(&self) -> usize {
        self.callers.len()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn backend(&self) -> &(dyn CryptoBackend + Send + Sync) {
        self.backend.as_ref()
    }

    // ------------------------------------------------------------------------
    // Proof data
    // ------------------------------------------------------------------------

    /// Record the encoded arguments of the active frame
    pub fn set_input(&mut self, input: AlignedValue) -> RuntimeResult<()> {
        self.frame.ensure_open("set input")?;
        self.frame.proof_data.input = input;
        Ok(())
    }

    /// Record the encoded result of the active frame
    pub fn set_output(&mut self, output: AlignedValue) -> RuntimeResult<()> {
        self.frame.ensure_open("set output")?;
        self.frame.proof_data.output = Some(output);
        Ok(())
    }

    /// Append a witness result to the private transcript
    pub(crate) fn record_private_output(&mut self, output: AlignedValue) -> RuntimeResult<()> {
        self.frame.ensure_open("record witness output")?;
        self.frame.proof_data.private_transcript_outputs.push(output);
        Ok(())
    }

    /// Run a ledger query against the active frame
    ///
    /// The post-query context replaces the current one, every instruction is
    /// appended to the public transcript with `popeq` results filled in, and
    /// the sequence counter advances. Returns the values read, in order.
    pub fn query_ledger_state(&mut self, program: &[Op<()>]) -> RuntimeResult<Vec<AlignedValue>> {
        self.frame.ensure_open("query the ledger")?;
        let results = self
            .current_ledger()?
            .query(program, &self.config.cost_model)
            .map_err(|e| RuntimeError::Backend(e.to_string()))?;

        let mut reads = results
            .events
            .into_iter()
            .map(|GatherEvent::Read(value)| value);
        let mut values = Vec::new();
        let mut transcript = Vec::with_capacity(program.len());
        for op in program {
            let op = match op {
                Op::Popeq { cached, .. } => {
                    let read = reads.next().ok_or_else(|| {
                        RuntimeError::Backend("query produced fewer reads than popeq instructions".into())
                    })?;
                    values.push(read.clone());
                    Op::Popeq {
                        cached: *cached,
                        result: read,
                    }
                }
                other => other.clone().map_result(|()| AlignedValue::empty()),
            };
            transcript.push(op);
        }
        if reads.next().is_some() {
            return Err(RuntimeError::Backend(
                "query produced more reads than popeq instructions".into(),
            ));
        }

        trace!(
            frame = %self.frame.describe(),
            ops = program.len(),
            reads = values.len(),
            gas = results.gas_cost,
            sequence = self.sequence + 1,
            "ledger state queried"
        );
        self.frame.current_ledger = Some(results.context);
        self.frame.proof_data.public_transcript.extend(transcript);
        self.sequence += 1;
        Ok(values)
    }

    /// Finalize the active frame
    ///
    /// Requires both ledger contexts and the output to be set. Persists the
    /// frame's final states into the per-address maps and appends its
    /// [`ProofFrame`] to the trace.
    pub fn finalize(&mut self) -> RuntimeResult<()> {
        self.frame.ensure_open("finalize")?;
        let (Some(initial_ledger), Some(current_ledger)) =
            (&self.frame.initial_ledger, &self.frame.current_ledger)
        else {
            return Err(RuntimeError::usage(format!(
                "cannot finalize {} without initial and current ledger contexts",
                self.frame.describe()
            )));
        };
        let output = self.frame.proof_data.output.clone().ok_or_else(|| {
            RuntimeError::usage(format!("cannot finalize {} before its output is set", self.frame.describe()))
        })?;

        let partial = &self.frame.proof_data;
        let communication = AlignedValue::concat([&partial.input, &output]);
        let communication_commitment = self
            .backend
            .transient_commit(&communication, &partial.communication_commitment_rand)?;

        let proof_frame = ProofFrame {
            contract_id: self.frame.contract_id.clone(),
            circuit_id: self.frame.circuit_id.clone(),
            address: self.frame.address,
            initial_ledger: initial_ledger.state().clone(),
            final_ledger: current_ledger.state().clone(),
            sequence: self.sequence,
            proof_data: ProofData {
                input: partial.input.clone(),
                output,
                public_transcript: partial.public_transcript.clone(),
                private_transcript_outputs: partial.private_transcript_outputs.clone(),
                communication_commitment_rand: partial.communication_commitment_rand.clone(),
                ledger_adoptions: partial.ledger_adoptions.clone(),
                communication_commitment,
            },
        };

        self.flush_frame();
        self.trace.push(proof_frame);
        self.frame.finalized = true;

        debug!(frame = %self.frame.describe(), trace_len = self.trace.len(), "finalized frame");
        Ok(())
    }

    /// Write the active frame's current private and confidential-transfer
    /// state, and its ledger if present, into the per-address maps
    fn flush_frame(&mut self) {
        let address = self.frame.address;
        if let Some(ledger) = &self.frame.current_ledger {
            self.ledger_states.insert(address, ledger.clone());
        }
        self.private_states
            .insert(address, self.frame.current_private_state.clone());
        self.zswap_states
            .insert(address, self.frame.current_zswap.clone());
    }

    // ------------------------------------------------------------------------
    // Frame stack
    // ------------------------------------------------------------------------

    /// Install a fresh frame for a new top-level call on this context
    ///
    /// The active frame must be finalized and no caller may be suspended.
    pub fn enter(&mut self, contract_id: &str, circuit_id: &str, address: ContractAddress) -> RuntimeResult<()> {
        if !self.frame.finalized || !self.callers.is_empty() {
            return Err(RuntimeError::usage(format!(
                "cannot enter {contract_id}.{circuit_id} while {} is running",
                self.frame.describe()
            )));
        }
        self.frame = self.fresh_frame(contract_id, circuit_id, address)?;
        Ok(())
    }

    fn fresh_frame(
        &self,
        contract_id: &str,
        circuit_id: &str,
        address: ContractAddress,
    ) -> RuntimeResult<StackFrame<P, Q>> {
        Self::load_frame(
            &self.ledger_states,
            &self.private_states,
            &self.zswap_states,
            self.backend.as_ref(),
            contract_id,
            circuit_id,
            address,
        )
    }

    /// Suspend the active frame and install one for a callee
    ///
    /// The caller's current states are flushed into the maps first, so the
    /// callee observes them if it touches the caller's address.
    pub(crate) fn push_frame(
        &mut self,
        contract_id: &str,
        circuit_id: &str,
        address: ContractAddress,
    ) -> RuntimeResult<()> {
        self.frame.ensure_open("call another contract")?;
        if self.callers.len() >= self.config.max_call_depth {
            return Err(RuntimeError::usage(format!(
                "call depth limit {} exceeded calling {contract_id}.{circuit_id}",
                self.config.max_call_depth
            )));
        }
        self.flush_frame();
        let callee = self.fresh_frame(contract_id, circuit_id, address)?;
        let caller = std::mem::replace(&mut self.frame, callee);
        debug!(
            caller = %caller.describe(),
            callee = %self.frame.describe(),
            depth = self.callers.len() + 1,
            "entered inter-contract call"
        );
        self.callers.push(caller);
        Ok(())
    }

    /// Drop the callee frame and resume the most recent caller
    ///
    /// The per-address maps are authoritative afterwards: the caller's current
    /// states are re-read for its own address. A ledger that changed under the
    /// caller is recorded as a [`LedgerAdoption`] in its proof data.
    pub(crate) fn pop_frame(&mut self) -> RuntimeResult<()> {
        let caller = self
            .callers
            .pop()
            .ok_or_else(|| RuntimeError::usage("no suspended caller to return to"))?;
        let callee = std::mem::replace(&mut self.frame, caller);
        let address = self.frame.address;
        if let Some(ledger) = self.ledger_states.get(&address) {
            let changed = self
                .frame
                .current_ledger
                .as_ref()
                .map_or(true, |current| current.state() != ledger.state());
            if changed {
                let transcript_index = self.frame.proof_data.public_transcript.len();
                trace!(frame = %self.frame.describe(), transcript_index, "adopted ledger from nested call");
                self.frame.proof_data.ledger_adoptions.push(LedgerAdoption {
                    transcript_index,
                    ledger: ledger.state().clone(),
                });
            }
            self.frame.current_ledger = Some(ledger.clone());
        }
        if let Some(private) = self.private_states.get(&address) {
            self.frame.current_private_state = private.clone();
        }
        if let Some(zswap) = self.zswap_states.get(&address) {
            self.frame.current_zswap = zswap.clone();
        }
        debug!(
            callee = %callee.describe(),
            caller = %self.frame.describe(),
            depth = self.callers.len(),
            "returned from inter-contract call"
        );
        Ok(())
    }
}
