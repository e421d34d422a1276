//! Cryptographic primitive façade
//!
//! Stateless wrappers over a [`CryptoBackend`]: each function encodes its
//! arguments with the supplied codec, delegates to the backend and decodes the
//! result. Field arithmetic is done here directly under the backend's
//! modulus; inputs are assumed to be reduced already.

use num_bigint::BigUint;

use crate::backend::CryptoBackend;
use crate::codec::{CompactCoinInfo, CompactRecipient, CompactType, CurvePoint};
use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{AlignedValue, CoinInfo, Field, Recipient};

fn to_bytes32(bytes: &[u8], what: &str) -> RuntimeResult<[u8; 32]> {
    bytes.try_into().map_err(|_| {
        RuntimeError::out_of_range(format!(
            "{what}: expected 32 bytes, received {}",
            bytes.len()
        ))
    })
}

fn check_field(backend: &(impl CryptoBackend + ?Sized), x: &Field, what: &str) -> RuntimeResult<()> {
    if *x > backend.max_field() {
        return Err(RuntimeError::out_of_range(format!(
            "{what}: {x} is not a field element"
        )));
    }
    Ok(())
}

// ============================================================================
// Hashes and commitments
// ============================================================================

/// Field-valued hash of a typed value
pub fn transient_hash<B, C>(backend: &B, codec: &C, value: &C::Native) -> RuntimeResult<Field>
where
    B: CryptoBackend + ?Sized,
    C: CompactType,
{
    Ok(backend.transient_hash(&codec.encode(value)?)?)
}

/// Field-valued commitment to a typed value
pub fn transient_commit<B, C>(
    backend: &B,
    codec: &C,
    value: &C::Native,
    opening: &Field,
) -> RuntimeResult<Field>
where
    B: CryptoBackend + ?Sized,
    C: CompactType,
{
    check_field(backend, opening, "transientCommit opening")?;
    Ok(backend.transient_commit(&codec.encode(value)?, opening)?)
}

/// Upgrade-stable 32-byte hash of a typed value
pub fn persistent_hash<B, C>(backend: &B, codec: &C, value: &C::Native) -> RuntimeResult<[u8; 32]>
where
    B: CryptoBackend + ?Sized,
    C: CompactType,
{
    Ok(backend.persistent_hash(&codec.encode(value)?)?)
}

/// Upgrade-stable commitment to a typed value; the opening must be 32 bytes
pub fn persistent_commit<B, C>(
    backend: &B,
    codec: &C,
    value: &C::Native,
    opening: &[u8],
) -> RuntimeResult<[u8; 32]>
where
    B: CryptoBackend + ?Sized,
    C: CompactType,
{
    let opening = to_bytes32(opening, "persistentCommit opening")?;
    Ok(backend.persistent_commit(&codec.encode(value)?, &opening)?)
}

/// Convert a persistent hash into the transient domain
pub fn degrade_to_transient<B>(backend: &B, persistent: &[u8]) -> RuntimeResult<Field>
where
    B: CryptoBackend + ?Sized,
{
    let persistent = to_bytes32(persistent, "degradeToTransient")?;
    Ok(backend.degrade_to_transient(&persistent)?)
}

/// Convert a field element into the persistent domain
pub fn upgrade_from_transient<B>(backend: &B, transient: &Field) -> RuntimeResult<[u8; 32]>
where
    B: CryptoBackend + ?Sized,
{
    check_field(backend, transient, "upgradeFromTransient")?;
    Ok(backend.upgrade_from_transient(transient)?)
}

/// Commitment to a coin sent to `recipient`
pub fn coin_commitment<B>(backend: &B, coin: &CoinInfo, recipient: &Recipient) -> RuntimeResult<AlignedValue>
where
    B: CryptoBackend + ?Sized,
{
    let coin = CompactCoinInfo.encode(coin)?;
    let recipient = CompactRecipient.encode(recipient)?;
    Ok(backend.runtime_coin_commitment(&coin, &recipient)?)
}

// ============================================================================
// Curve operations
// ============================================================================

/// Map a typed value to a curve point
pub fn hash_to_curve<B, C>(backend: &B, codec: &C, value: &C::Native) -> RuntimeResult<CurvePoint>
where
    B: CryptoBackend + ?Sized,
    C: CompactType,
{
    Ok(backend.hash_to_curve(&codec.encode(value)?)?)
}

pub fn ec_add<B>(backend: &B, a: &CurvePoint, b: &CurvePoint) -> RuntimeResult<CurvePoint>
where
    B: CryptoBackend + ?Sized,
{
    Ok(backend.ec_add(a, b)?)
}

pub fn ec_mul<B>(backend: &B, a: &CurvePoint, scalar: &Field) -> RuntimeResult<CurvePoint>
where
    B: CryptoBackend + ?Sized,
{
    check_field(backend, scalar, "ecMul scalar")?;
    Ok(backend.ec_mul(a, scalar)?)
}

pub fn ec_mul_generator<B>(backend: &B, scalar: &Field) -> RuntimeResult<CurvePoint>
where
    B: CryptoBackend + ?Sized,
{
    check_field(backend, scalar, "ecMulGenerator scalar")?;
    Ok(backend.ec_mul_generator(scalar)?)
}

// ============================================================================
// Field arithmetic
// ============================================================================

fn modulus(backend: &(impl CryptoBackend + ?Sized)) -> BigUint {
    backend.max_field() + 1u32
}

/// `x + y` modulo the backend's field, with a single conditional subtraction
pub fn add_field<B>(backend: &B, x: &Field, y: &Field) -> Field
where
    B: CryptoBackend + ?Sized,
{
    let modulus = modulus(backend);
    let sum = x + y;
    if sum >= modulus {
        sum - modulus
    } else {
        sum
    }
}

/// `x - y` modulo the backend's field, with a single conditional addition
pub fn sub_field<B>(backend: &B, x: &Field, y: &Field) -> Field
where
    B: CryptoBackend + ?Sized,
{
    if y > x {
        x + modulus(backend) - y
    } else {
        x - y
    }
}

/// `x * y` modulo the backend's field
pub fn mul_field<B>(backend: &B, x: &Field, y: &Field) -> Field
where
    B: CryptoBackend + ?Sized,
{
    (x * y) % modulus(backend)
}

/// Fail with an assertion error unless `cond` holds
pub fn compact_assert(cond: bool, msg: &str) -> RuntimeResult<()> {
    if cond {
        Ok(())
    } else {
        Err(RuntimeError::assertion(msg))
    }
}
