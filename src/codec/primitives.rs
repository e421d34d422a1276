//! Primitive codecs: booleans, integers, enums, bytes, vectors, opaque data

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};

use super::convert::{bigint_to_value, pad_to, trim_trailing_zeros, value_to_bigint};
use super::{CompactType, ValueReader};
use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{Alignment, AlignmentAtom, Field, Value, MAX_FIELD};

// ============================================================================
// Boolean
// ============================================================================

/// `Boolean`: one byte; `false` is the empty segment, `true` is `[0x01]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactBoolean;

impl CompactType for CompactBoolean {
    type Native = bool;

    fn alignment(&self) -> Alignment {
        Alignment::bytes(1)
    }

    fn to_value(&self, native: &bool) -> RuntimeResult<Value> {
        Ok(Value::single(if *native { vec![1] } else { Vec::new() }))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<bool> {
        match reader.shift("Boolean")? {
            [] => Ok(false),
            [1] => Ok(true),
            other => Err(RuntimeError::type_mismatch(format!(
                "expected Boolean, received segment {other:?}"
            ))),
        }
    }
}

// ============================================================================
// Field
// ============================================================================

/// `Field`: a single field element no larger than `max`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactField {
    max: Field,
}

impl CompactField {
    /// Field codec for a proof system whose largest element is `max`
    pub fn new(max: Field) -> Self {
        Self { max }
    }

    /// Largest accepted element
    pub fn max(&self) -> &Field {
        &self.max
    }
}

impl Default for CompactField {
    fn default() -> Self {
        Self::new(MAX_FIELD.clone())
    }
}

impl CompactType for CompactField {
    type Native = Field;

    fn alignment(&self) -> Alignment {
        Alignment::atom(AlignmentAtom::Field)
    }

    fn to_value(&self, native: &Field) -> RuntimeResult<Value> {
        if *native > self.max {
            return Err(RuntimeError::out_of_range(format!(
                "{native} exceeds the field maximum"
            )));
        }
        Ok(Value::single(bigint_to_value(native)))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Field> {
        let x = value_to_bigint(reader.shift("Field")?);
        if x > self.max {
            return Err(RuntimeError::out_of_range(format!(
                "expected Field, received {x} above the field maximum"
            )));
        }
        Ok(x)
    }
}

// ============================================================================
// Unsigned integers and enums
// ============================================================================

/// `Uint`: little-endian integer bounded by `max`
///
/// The alignment is fixed-width, `Bytes{length}`, while the value segment is
/// the minimal little-endian form with trailing zero bytes trimmed. Zero
/// encodes as the empty segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactUnsignedInteger {
    max: BigUint,
    length: u32,
}

impl CompactUnsignedInteger {
    /// Integer codec with an explicit maximum
    ///
    /// Fails when `max` does not fit in `length` bytes.
    pub fn new(max: BigUint, length: u32) -> RuntimeResult<Self> {
        if max.bits() > u64::from(length) * 8 {
            return Err(RuntimeError::out_of_range(format!(
                "maximum {max} does not fit in {length} bytes"
            )));
        }
        Ok(Self { max, length })
    }

    /// Integer codec spanning the full range of `length` bytes
    pub fn for_bytes(length: u32) -> Self {
        let max = (BigUint::one() << (8 * length as usize)) - BigUint::one();
        Self { max, length }
    }

    /// Largest accepted value
    pub fn max(&self) -> &BigUint {
        &self.max
    }

    fn check(&self, x: &BigUint) -> RuntimeResult<()> {
        if *x > self.max {
            return Err(RuntimeError::out_of_range(format!(
                "expected UnsignedInteger[<={}], received {x}",
                self.max
            )));
        }
        Ok(())
    }
}

impl CompactType for CompactUnsignedInteger {
    type Native = BigUint;

    fn alignment(&self) -> Alignment {
        Alignment::bytes(self.length)
    }

    fn to_value(&self, native: &BigUint) -> RuntimeResult<Value> {
        self.check(native)?;
        Ok(Value::single(bigint_to_value(native)))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<BigUint> {
        let segment = reader.shift("UnsignedInteger")?;
        if segment.len() > self.length as usize {
            return Err(RuntimeError::out_of_range(format!(
                "UnsignedInteger segment of {} bytes exceeds {} bytes",
                segment.len(),
                self.length
            )));
        }
        let x = value_to_bigint(segment);
        self.check(&x)?;
        Ok(x)
    }
}

/// `Enum`: variant index encoded like an unsigned integer bounded by `max_value`
///
/// Same layout as [`CompactUnsignedInteger`]: fixed-width alignment, trimmed
/// segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactEnum {
    max_value: u32,
    length: u32,
}

impl CompactEnum {
    /// Enum codec with variant indices `0..=max_value`
    pub fn new(max_value: u32, length: u32) -> RuntimeResult<Self> {
        let bits = 32 - max_value.leading_zeros();
        if bits > length * 8 {
            return Err(RuntimeError::out_of_range(format!(
                "enum maximum {max_value} does not fit in {length} bytes"
            )));
        }
        Ok(Self { max_value, length })
    }

    /// Largest variant index
    pub fn max_value(&self) -> u32 {
        self.max_value
    }
}

impl CompactType for CompactEnum {
    type Native = u32;

    fn alignment(&self) -> Alignment {
        Alignment::bytes(self.length)
    }

    fn to_value(&self, native: &u32) -> RuntimeResult<Value> {
        if *native > self.max_value {
            return Err(RuntimeError::out_of_range(format!(
                "expected Enum[<={}], received {native}",
                self.max_value
            )));
        }
        Ok(Value::single(trim_trailing_zeros(&native.to_le_bytes())))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<u32> {
        let segment = reader.shift("Enum")?;
        let x = value_to_bigint(segment);
        if segment.len() > self.length as usize || x > BigUint::from(self.max_value) {
            return Err(RuntimeError::out_of_range(format!(
                "expected Enum[<={}], received {x}",
                self.max_value
            )));
        }
        x.to_u32()
            .ok_or_else(|| RuntimeError::out_of_range(format!("enum index {x} exceeds u32")))
    }
}

// ============================================================================
// Bytes and vectors
// ============================================================================

/// `Bytes<N>`: fixed-length bytes, trailing zeros trimmed on the wire
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactBytes<const N: usize>;

impl<const N: usize> CompactType for CompactBytes<N> {
    type Native = [u8; N];

    fn alignment(&self) -> Alignment {
        Alignment::bytes(N as u32)
    }

    fn to_value(&self, native: &[u8; N]) -> RuntimeResult<Value> {
        Ok(Value::single(trim_trailing_zeros(native)))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<[u8; N]> {
        let padded = pad_to(N, reader.shift("Bytes")?, &format!("Bytes<{N}>"))?;
        let mut out = [0u8; N];
        out.copy_from_slice(&padded);
        Ok(out)
    }
}

impl<const N: usize> CompactBytes<N> {
    /// Zero-pad a shorter byte string to `N` bytes
    pub fn pad(bytes: &[u8]) -> RuntimeResult<[u8; N]> {
        let padded = pad_to(N, bytes, &format!("Bytes<{N}>"))?;
        let mut out = [0u8; N];
        out.copy_from_slice(&padded);
        Ok(out)
    }
}

/// `Vector<N, T>`: exactly `length` elements of `T`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactVector<T> {
    length: usize,
    element: T,
}

impl<T: CompactType> CompactVector<T> {
    /// Vector codec of `length` elements
    pub fn new(length: usize, element: T) -> Self {
        Self { length, element }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the vector type has no elements
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<T: CompactType> CompactType for CompactVector<T> {
    type Native = Vec<T::Native>;

    fn alignment(&self) -> Alignment {
        let element = self.element.alignment();
        Alignment::concat(std::iter::repeat(&element).take(self.length))
    }

    fn to_value(&self, native: &Vec<T::Native>) -> RuntimeResult<Value> {
        if native.len() != self.length {
            return Err(RuntimeError::type_mismatch(format!(
                "expected {}-element array, received {} elements",
                self.length,
                native.len()
            )));
        }
        let mut value = Value::default();
        for item in native {
            value.extend(self.element.to_value(item)?);
        }
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Vec<T::Native>> {
        (0..self.length)
            .map(|_| self.element.from_value(reader))
            .collect()
    }
}

// ============================================================================
// Opaque data
// ============================================================================

/// `Opaque<"string">`: UTF-8 text carried as compressed data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpaqueString;

impl CompactType for OpaqueString {
    type Native = String;

    fn alignment(&self) -> Alignment {
        Alignment::atom(AlignmentAtom::Compress)
    }

    fn to_value(&self, native: &String) -> RuntimeResult<Value> {
        Ok(Value::single(native.as_bytes().to_vec()))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<String> {
        String::from_utf8(reader.shift("Opaque<string>")?.to_vec())
            .map_err(|e| RuntimeError::type_mismatch(format!("expected UTF-8 string: {e}")))
    }
}

/// `Opaque<"Uint8Array">`: raw bytes carried as compressed data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpaqueBytes;

impl CompactType for OpaqueBytes {
    type Native = Vec<u8>;

    fn alignment(&self) -> Alignment {
        Alignment::atom(AlignmentAtom::Compress)
    }

    fn to_value(&self, native: &Vec<u8>) -> RuntimeResult<Value> {
        Ok(Value::single(native.clone()))
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Vec<u8>> {
        Ok(reader.shift("Opaque<Uint8Array>")?.to_vec())
    }
}
