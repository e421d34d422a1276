//! Binary type codec
//!
//! Converts native values to and from the flat field-aligned form consumed by
//! the proof system. Each logical type is described by a codec implementing
//! [`CompactType`]: its alignment depends only on static parameters, encoding
//! produces one segment per alignment atom, and decoding shifts those segments
//! off a shared [`ValueReader`] so composite codecs can chain their members.
//!
//! Composite codecs visit their members in a fixed order; their alignment is
//! the ordered concatenation of the member alignments. There is no tagged or
//! dynamically shaped codec at this layer.
//!
//! # Example
//!
//! ```ignore
//! use zkir_contract_runtime::codec::{CompactType, CompactUnsignedInteger};
//!
//! let uint8 = CompactUnsignedInteger::for_bytes(1);
//! let aligned = uint8.encode(&5u32.into())?;
//! assert_eq!(uint8.decode(&aligned)?, 5u32.into());
//! ```

pub mod convert;
mod cursor;
mod library;
mod primitives;
mod structures;

pub use cursor::ValueReader;
pub use library::{
    CompactCoinInfo, CompactCoinPublicKey, CompactContractAddress, CompactEither, CompactMaybe,
    CompactQualifiedCoinInfo, CompactRecipient, Either,
};
pub use primitives::{
    CompactBoolean, CompactBytes, CompactEnum, CompactField, CompactUnsignedInteger,
    CompactVector, OpaqueBytes, OpaqueString,
};
pub use structures::{
    CompactCurvePoint, CompactMerkleTreeDigest, CompactMerkleTreePath,
    CompactMerkleTreePathEntry, CurvePoint, MerkleTreeDigest, MerkleTreePath,
    MerkleTreePathEntry,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{AlignedValue, Alignment, Value};

/// Codec bound to one logical type
pub trait CompactType {
    /// Native representation of the type
    type Native;

    /// Alignment of every encoded value of this type
    fn alignment(&self) -> Alignment;

    /// Encode a native value into its segments
    fn to_value(&self, native: &Self::Native) -> RuntimeResult<Value>;

    /// Decode a native value, consuming its segments from the reader
    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Self::Native>;

    /// Encode together with the alignment
    fn encode(&self, native: &Self::Native) -> RuntimeResult<AlignedValue> {
        Ok(AlignedValue::new(self.to_value(native)?, self.alignment()))
    }

    /// Decode an aligned value that must hold exactly one value of this type
    fn decode(&self, aligned: &AlignedValue) -> RuntimeResult<Self::Native> {
        let expected = self.alignment();
        if aligned.alignment != expected {
            return Err(RuntimeError::type_mismatch(format!(
                "expected alignment {expected}, received {}",
                aligned.alignment
            )));
        }
        let mut reader = ValueReader::new(&aligned.value);
        let native = self.from_value(&mut reader)?;
        reader.ensure_consumed()?;
        Ok(native)
    }
}

impl<T: CompactType + ?Sized> CompactType for &T {
    type Native = T::Native;

    fn alignment(&self) -> Alignment {
        (**self).alignment()
    }

    fn to_value(&self, native: &Self::Native) -> RuntimeResult<Value> {
        (**self).to_value(native)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Self::Native> {
        (**self).from_value(reader)
    }
}

/// Decode the leading value of `value`, leaving the reader positioned after it
pub fn decode_prefix<C: CompactType>(
    codec: &C,
    reader: &mut ValueReader<'_>,
) -> RuntimeResult<C::Native> {
    codec.from_value(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_decode_rejects_alignment_mismatch() {
        let uint8 = CompactUnsignedInteger::for_bytes(1);
        let aligned = CompactBoolean.encode(&true).unwrap();
        assert!(uint8.decode(&aligned).is_err());
    }

    #[test]
    fn test_chained_decode_over_shared_reader() {
        let uint8 = CompactUnsignedInteger::for_bytes(1);
        let mut value = CompactBoolean.to_value(&true).unwrap();
        value.extend(uint8.to_value(&BigUint::from(7u32)).unwrap());
        value.extend(CompactBoolean.to_value(&false).unwrap());

        let mut reader = ValueReader::new(&value);
        assert!(decode_prefix(&CompactBoolean, &mut reader).unwrap());
        assert_eq!(decode_prefix(&uint8, &mut reader).unwrap(), BigUint::from(7u32));
        assert!(!decode_prefix(&CompactBoolean, &mut reader).unwrap());
        assert!(reader.ensure_consumed().is_ok());
    }

    #[test]
    fn test_decode_rejects_trailing_segments() {
        let mut aligned = CompactBoolean.encode(&true).unwrap();
        aligned.value.0.push(vec![]);
        assert!(CompactBoolean.decode(&aligned).is_err());
    }
}
