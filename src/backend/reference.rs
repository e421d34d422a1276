//! In-process reference backend
//!
//! Scalar field of BLS12-381 with the Jubjub twisted Edwards curve embedded
//! over it (`-x^2 + y^2 = 1 + d x^2 y^2`, `d = -(10240/10241)`). Transient
//! hashes are BLAKE2s reduced into the field; persistent hashes are SHA-256 of
//! the canonical binary form of the aligned value.

use ark_bls12_381::Fr;
use ark_ff::{BigInteger, Field as ArkField, One, PrimeField, Zero};
use blake2::Blake2s256;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{BackendError, BackendResult, CryptoBackend};
use crate::codec::CurvePoint;
use crate::types::{AlignedValue, Alignment, AlignmentAtom, ContractAddress, Field, Value, MAX_FIELD};

const TRANSIENT_DOMAIN: &[u8] = b"zkir:transient";
const PERSISTENT_COMMIT_DOMAIN: &[u8] = b"zkir:persistent-commit";
const HASH_TO_CURVE_DOMAIN: &[u8] = b"zkir:hash-to-curve";
const COIN_COMMITMENT_DOMAIN: &[u8] = b"zkir:coin-commitment";
const GENERATOR_SEED: &[u8] = b"zkir:generator";

/// Try-and-increment attempts before hash-to-curve gives up
const MAX_CURVE_ATTEMPTS: u32 = 256;

static EDWARDS_D: Lazy<Fr> = Lazy::new(|| -(Fr::from(10240u64) / Fr::from(10241u64)));

static GENERATOR: Lazy<Option<Point>> = Lazy::new(|| {
    let seed = AlignedValue::new(
        Value::single(GENERATOR_SEED.to_vec()),
        Alignment::atom(AlignmentAtom::Compress),
    );
    hash_to_point(&seed).ok()
});

/// Reference implementation of [`CryptoBackend`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceBackend;

impl ReferenceBackend {
    pub fn new() -> Self {
        Self
    }
}

// ============================================================================
// Field conversions
// ============================================================================

fn to_fr(x: &Field) -> BackendResult<Fr> {
    if *x > *MAX_FIELD {
        return Err(BackendError::InvalidInput(format!("{x} is not a field element")));
    }
    Ok(Fr::from_le_bytes_mod_order(&x.to_bytes_le()))
}

fn from_fr(x: Fr) -> Field {
    BigUint::from_bytes_le(&x.into_bigint().to_bytes_le())
}

/// Canonical binary form: atom count, then each segment in its fixed width
fn canonical_bytes(value: &AlignedValue) -> BackendResult<Vec<u8>> {
    value
        .check_aligned(&MAX_FIELD)
        .map_err(BackendError::InvalidInput)?;
    let mut out = Vec::new();
    out.extend_from_slice(&(value.alignment.len() as u32).to_le_bytes());
    for (segment, atom) in value.value.segments().iter().zip(&value.alignment.0) {
        match atom {
            AlignmentAtom::Bytes { length } => {
                out.extend_from_slice(segment);
                out.resize(out.len() + (*length as usize - segment.len()), 0);
            }
            AlignmentAtom::Field => {
                let mut bytes = segment.clone();
                bytes.resize(32, 0);
                out.extend_from_slice(&bytes);
            }
            AlignmentAtom::Compress => {
                out.extend_from_slice(&(segment.len() as u32).to_le_bytes());
                out.extend_from_slice(segment);
            }
        }
    }
    Ok(out)
}

fn blake2s_to_field(parts: &[&[u8]]) -> Fr {
    let mut hasher = Blake2s256::new();
    for part in parts {
        hasher.update(part);
    }
    Fr::from_le_bytes_mod_order(&hasher.finalize())
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

// ============================================================================
// Curve arithmetic
// ============================================================================

/// Affine point on the embedded curve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Point {
    x: Fr,
    y: Fr,
}

impl Point {
    fn identity() -> Self {
        Self {
            x: Fr::zero(),
            y: Fr::one(),
        }
    }

    fn is_on_curve(&self) -> bool {
        let x2 = self.x.square();
        let y2 = self.y.square();
        y2 - x2 == Fr::one() + *EDWARDS_D * x2 * y2
    }

    fn add(&self, other: &Point) -> BackendResult<Point> {
        let t = *EDWARDS_D * self.x * other.x * self.y * other.y;
        let x_den = (Fr::one() + t)
            .inverse()
            .ok_or_else(|| BackendError::Curve("degenerate addition".to_string()))?;
        let y_den = (Fr::one() - t)
            .inverse()
            .ok_or_else(|| BackendError::Curve("degenerate addition".to_string()))?;
        Ok(Point {
            x: (self.x * other.y + self.y * other.x) * x_den,
            y: (self.y * other.y + self.x * other.x) * y_den,
        })
    }

    fn mul(&self, scalar: &Field) -> BackendResult<Point> {
        let mut acc = Point::identity();
        for i in (0..scalar.bits()).rev() {
            acc = acc.add(&acc)?;
            if scalar.bit(i) {
                acc = acc.add(self)?;
            }
        }
        Ok(acc)
    }

    fn from_native(point: &CurvePoint) -> BackendResult<Point> {
        let p = Point {
            x: to_fr(&point.x)?,
            y: to_fr(&point.y)?,
        };
        if !p.is_on_curve() {
            return Err(BackendError::Curve(format!(
                "({}, {}) is not on the curve",
                point.x, point.y
            )));
        }
        Ok(p)
    }

    fn to_native(self) -> CurvePoint {
        CurvePoint {
            x: from_fr(self.x),
            y: from_fr(self.y),
        }
    }
}

/// Try-and-increment: candidate `y` from the hash, solve for `x`, clear the
/// cofactor
fn hash_to_point(value: &AlignedValue) -> BackendResult<Point> {
    let data = canonical_bytes(value)?;
    for counter in 0..MAX_CURVE_ATTEMPTS {
        let y = blake2s_to_field(&[HASH_TO_CURVE_DOMAIN, data.as_slice(), &counter.to_le_bytes()[..]]);
        let y2 = y.square();
        let Some(den) = (*EDWARDS_D * y2 + Fr::one()).inverse() else {
            continue;
        };
        let Some(x) = ((y2 - Fr::one()) * den).sqrt() else {
            continue;
        };
        let mut point = Point { x, y };
        for _ in 0..3 {
            point = point.add(&point)?;
        }
        if point != Point::identity() {
            return Ok(point);
        }
    }
    Err(BackendError::Curve(format!(
        "no curve point found after {MAX_CURVE_ATTEMPTS} attempts"
    )))
}

// ============================================================================
// Backend implementation
// ============================================================================

impl CryptoBackend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn max_field(&self) -> Field {
        MAX_FIELD.clone()
    }

    fn sample_contract_address(&self) -> ContractAddress {
        let address = ContractAddress::new(self.sample_bytes32());
        debug!(%address, "sampled contract address");
        address
    }

    fn sample_field(&self) -> Field {
        let mut bytes = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        from_fr(Fr::from_le_bytes_mod_order(&bytes))
    }

    fn sample_bytes32(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    fn transient_hash(&self, value: &AlignedValue) -> BackendResult<Field> {
        let data = canonical_bytes(value)?;
        Ok(from_fr(blake2s_to_field(&[TRANSIENT_DOMAIN, data.as_slice()])))
    }

    fn transient_commit(&self, value: &AlignedValue, opening: &Field) -> BackendResult<Field> {
        let data = canonical_bytes(value)?;
        let opening = to_fr(opening)?.into_bigint().to_bytes_le();
        Ok(from_fr(blake2s_to_field(&[TRANSIENT_DOMAIN, opening.as_slice(), data.as_slice()])))
    }

    fn persistent_hash(&self, value: &AlignedValue) -> BackendResult<[u8; 32]> {
        Ok(sha256(&[canonical_bytes(value)?.as_slice()]))
    }

    fn persistent_commit(&self, value: &AlignedValue, opening: &[u8; 32]) -> BackendResult<[u8; 32]> {
        let data = canonical_bytes(value)?;
        Ok(sha256(&[PERSISTENT_COMMIT_DOMAIN, opening.as_slice(), data.as_slice()]))
    }

    fn degrade_to_transient(&self, persistent: &[u8; 32]) -> BackendResult<Field> {
        Ok(from_fr(Fr::from_le_bytes_mod_order(persistent)))
    }

    fn upgrade_from_transient(&self, transient: &Field) -> BackendResult<[u8; 32]> {
        let bytes = to_fr(transient)?.into_bigint().to_bytes_le();
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes[..32]);
        Ok(out)
    }

    fn hash_to_curve(&self, value: &AlignedValue) -> BackendResult<CurvePoint> {
        Ok(hash_to_point(value)?.to_native())
    }

    fn ec_add(&self, a: &CurvePoint, b: &CurvePoint) -> BackendResult<CurvePoint> {
        Ok(Point::from_native(a)?.add(&Point::from_native(b)?)?.to_native())
    }

    fn ec_mul(&self, a: &CurvePoint, scalar: &Field) -> BackendResult<CurvePoint> {
        Ok(Point::from_native(a)?.mul(scalar)?.to_native())
    }

    fn ec_mul_generator(&self, scalar: &Field) -> BackendResult<CurvePoint> {
        let generator = GENERATOR
            .as_ref()
            .ok_or_else(|| BackendError::Curve("generator unavailable".to_string()))?;
        Ok(generator.mul(scalar)?.to_native())
    }

    fn runtime_coin_commitment(
        &self,
        coin: &AlignedValue,
        recipient: &AlignedValue,
    ) -> BackendResult<AlignedValue> {
        let coin = canonical_bytes(coin)?;
        let recipient = canonical_bytes(recipient)?;
        let digest = sha256(&[COIN_COMMITMENT_DOMAIN, coin.as_slice(), recipient.as_slice()]);
        Ok(AlignedValue::new(Value::single(digest.to_vec()), Alignment::bytes(32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_value(bytes: &[u8]) -> AlignedValue {
        AlignedValue::new(Value::single(bytes.to_vec()), Alignment::bytes(bytes.len() as u32))
    }

    #[test]
    fn test_field_conversion_roundtrip() {
        let x = BigUint::from(123456789u64);
        assert_eq!(from_fr(to_fr(&x).unwrap()), x);
        assert_eq!(from_fr(to_fr(&MAX_FIELD).unwrap()), *MAX_FIELD);
        assert!(to_fr(&(&*MAX_FIELD + 1u32)).is_err());
    }

    #[test]
    fn test_canonical_bytes_pads_segments() {
        let value = AlignedValue::new(
            Value(vec![vec![1], vec![2], vec![3, 4]]),
            Alignment(vec![
                AlignmentAtom::Bytes { length: 4 },
                AlignmentAtom::Field,
                AlignmentAtom::Compress,
            ]),
        );
        let bytes = canonical_bytes(&value).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 32 + 4 + 2);
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_hash_ignores_trailing_zero_trimming() {
        let backend = ReferenceBackend::new();
        let trimmed = AlignedValue::new(Value::single(vec![7]), Alignment::bytes(2));
        let padded = AlignedValue::new(Value::single(vec![7, 0]), Alignment::bytes(2));
        assert_eq!(
            backend.persistent_hash(&trimmed).unwrap(),
            backend.persistent_hash(&padded).unwrap()
        );
    }

    #[test]
    fn test_generator_on_curve() {
        let generator = GENERATOR.as_ref().unwrap();
        assert!(generator.is_on_curve());
        assert_ne!(*generator, Point::identity());
    }

    #[test]
    fn test_curve_group_laws() {
        let backend = ReferenceBackend::new();
        let p = backend.hash_to_curve(&bytes_value(b"p")).unwrap();
        let q = backend.hash_to_curve(&bytes_value(b"q")).unwrap();
        assert_eq!(backend.ec_add(&p, &q).unwrap(), backend.ec_add(&q, &p).unwrap());

        let two_p = backend.ec_mul(&p, &BigUint::from(2u32)).unwrap();
        assert_eq!(backend.ec_add(&p, &p).unwrap(), two_p);

        let identity = Point::identity().to_native();
        assert_eq!(backend.ec_add(&p, &identity).unwrap(), p);
        assert_eq!(backend.ec_mul(&p, &BigUint::from(0u32)).unwrap(), identity);
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let backend = ReferenceBackend::new();
        let bogus = CurvePoint {
            x: BigUint::from(1u32),
            y: BigUint::from(1u32),
        };
        assert!(matches!(
            backend.ec_add(&bogus, &bogus),
            Err(BackendError::Curve(_))
        ));
    }

    #[test]
    fn test_generator_multiples_agree() {
        let backend = ReferenceBackend::new();
        let g = backend.ec_mul_generator(&BigUint::from(1u32)).unwrap();
        let three_g = backend.ec_mul_generator(&BigUint::from(3u32)).unwrap();
        let sum = backend.ec_add(&backend.ec_add(&g, &g).unwrap(), &g).unwrap();
        assert_eq!(three_g, sum);
    }

    #[test]
    fn test_upgrade_degrade_roundtrip() {
        let backend = ReferenceBackend::new();
        let x = backend.sample_field();
        let bytes = backend.upgrade_from_transient(&x).unwrap();
        assert_eq!(backend.degrade_to_transient(&bytes).unwrap(), x);
    }
}
