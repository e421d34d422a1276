//! Cryptographic backend trait definition
//!
//! This module defines the `CryptoBackend` trait, the fixed capability the
//! runtime consumes for everything algebraic: the field modulus, address
//! sampling, transient and persistent hashing, curve arithmetic and coin
//! commitments. Implementations receive values already encoded into their
//! field-aligned form and return raw results; argument encoding, length checks
//! and result decoding live in [`crate::crypto`].
//!
//! ## Hash domains
//!
//! Two families of hash are exposed:
//! 1. Transient: fast, field-valued, not stable across upgrades. Used for
//!    in-circuit consistency checks.
//! 2. Persistent: 32-byte output, stable across upgrades. Used for anything
//!    stored on the ledger.

use super::BackendResult;
use crate::codec::CurvePoint;
use crate::types::{AlignedValue, ContractAddress, Field};

/// Cryptographic backend abstraction
///
/// # Example
///
/// ```ignore
/// use zkir_contract_runtime::backend::{CryptoBackend, ReferenceBackend};
///
/// let backend = ReferenceBackend::new();
/// let address = backend.sample_contract_address();
/// let digest = backend.persistent_hash(&value)?;
/// ```
pub trait CryptoBackend {
    /// Get the backend name for debugging/logging
    fn name(&self) -> &str;

    /// Largest element of the proof system's scalar field
    fn max_field(&self) -> Field;

    /// Fresh random contract address
    fn sample_contract_address(&self) -> ContractAddress;

    /// Uniformly random field element
    fn sample_field(&self) -> Field;

    /// Uniformly random 32 bytes
    fn sample_bytes32(&self) -> [u8; 32];

    /// Field-valued hash of an aligned value
    fn transient_hash(&self, value: &AlignedValue) -> BackendResult<Field>;

    /// Field-valued commitment to `value` under `opening`
    fn transient_commit(&self, value: &AlignedValue, opening: &Field) -> BackendResult<Field>;

    /// Upgrade-stable hash of an aligned value
    fn persistent_hash(&self, value: &AlignedValue) -> BackendResult<[u8; 32]>;

    /// Upgrade-stable commitment to `value` under a 32-byte `opening`
    fn persistent_commit(&self, value: &AlignedValue, opening: &[u8; 32]) -> BackendResult<[u8; 32]>;

    /// Map a persistent hash into the field
    fn degrade_to_transient(&self, persistent: &[u8; 32]) -> BackendResult<Field>;

    /// Map a field element to its persistent byte form
    ///
    /// # Errors
    ///
    /// Returns an error if `transient` is not a field element.
    fn upgrade_from_transient(&self, transient: &Field) -> BackendResult<[u8; 32]>;

    /// Deterministically map an aligned value to a curve point
    fn hash_to_curve(&self, value: &AlignedValue) -> BackendResult<CurvePoint>;

    /// Sum of two curve points
    ///
    /// # Errors
    ///
    /// Returns an error if either input is not on the curve.
    fn ec_add(&self, a: &CurvePoint, b: &CurvePoint) -> BackendResult<CurvePoint>;

    /// Scalar multiple of a curve point
    fn ec_mul(&self, a: &CurvePoint, scalar: &Field) -> BackendResult<CurvePoint>;

    /// Scalar multiple of the fixed generator
    fn ec_mul_generator(&self, scalar: &Field) -> BackendResult<CurvePoint>;

    /// Commitment to a coin for a recipient, both given in their encoded form
    fn runtime_coin_commitment(
        &self,
        coin: &AlignedValue,
        recipient: &AlignedValue,
    ) -> BackendResult<AlignedValue>;
}
