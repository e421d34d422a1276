//! ZK contract execution runtime
//!
//! Runs compiled contract circuits off-chain and records what a prover needs
//! to attest to each call.
//!
//! # Architecture
//!
//! - **Codec**: native values to and from the field-aligned binary form
//! - **Backend**: hashing, commitments and curve arithmetic behind [`CryptoBackend`]
//! - **Ledger**: public contract state and the query instruction set run on it
//! - **Context**: the active stack frame, per-address state maps and the proof trace
//! - **Witness**: caller-supplied private computations threaded through a call
//! - **Dispatch**: top-level and inter-contract circuit calls
//! - **Constructor**: deployment of a contract at a fresh address
//! - **Verify**: replay of recorded proof data against circuit shapes
//!
//! # Call flow
//!
//! A deployment runs [`constructor::construct`] and yields genesis states.
//! Those seed a [`CircuitContext`]; [`dispatch::call_circuit`] runs a circuit
//! on it, which may call witnesses, query the ledger and call other contracts
//! through [`dispatch::inter_contract_call`]. Every finished call appends a
//! [`ProofFrame`] to the trace, innermost first.

pub mod backend;
pub mod codec;
pub mod constructor;
pub mod context;
pub mod crypto;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod types;
pub mod verify;
pub mod witness;

// Re-export the types most callers need
pub use backend::{CryptoBackend, ReferenceBackend};
pub use codec::CompactType;
pub use constructor::{construct, Contract, ConstructorContext, ConstructorResult};
pub use context::{CircuitContext, InitialStates, ProofData, ProofFrame, ProofTrace};
pub use dispatch::{call_circuit, inter_contract_call, CircuitResults, ContractExecutables};
pub use error::{RuntimeError, RuntimeResult};
pub use ledger::{ContractState, CostModel, LedgerView, StateValue};
pub use types::{AlignedValue, Alignment, ContractAddress, Field, RuntimeConfig, MAX_FIELD};
pub use verify::{check_proof_data, CircuitShape, VerifyError};
pub use witness::{call_witness, WitnessContext, WitnessSet};
