//! Field-aligned value representation
//!
//! A value crossing the proof-system boundary is a flat list of byte-string
//! segments paired with an alignment describing the primitive kind of each
//! segment. Codecs produce and consume this form; the ledger stores it in
//! cells; proof data records it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Field;

/// Primitive kind of a single value segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlignmentAtom {
    /// Opaque data, hashed into the proof as a compressed digest
    Compress,
    /// A single field element
    Field,
    /// Fixed-length bytes (trailing zeros are trimmed in the segment)
    Bytes {
        /// Declared byte length
        length: u32,
    },
}

impl fmt::Display for AlignmentAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentAtom::Compress => write!(f, "compress"),
            AlignmentAtom::Field => write!(f, "field"),
            AlignmentAtom::Bytes { length } => write!(f, "bytes[{length}]"),
        }
    }
}

/// Ordered description of the segments of a value
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Alignment(pub Vec<AlignmentAtom>);

impl Alignment {
    /// Alignment with a single atom
    pub fn atom(atom: AlignmentAtom) -> Self {
        Self(vec![atom])
    }

    /// Alignment of a fixed-length byte segment
    pub fn bytes(length: u32) -> Self {
        Self::atom(AlignmentAtom::Bytes { length })
    }

    /// Number of segments described
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the alignment describes no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ordered concatenation of alignments
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Alignment>) -> Self {
        Self(parts.into_iter().flat_map(|a| a.0.iter().copied()).collect())
    }

    /// Append another alignment in place
    pub fn extend(&mut self, other: &Alignment) {
        self.0.extend_from_slice(&other.0);
    }

    /// All-zero value of this alignment: one empty segment per atom
    pub fn zero_value(&self) -> Value {
        Value(vec![Vec::new(); self.0.len()])
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, atom) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{atom}")?;
        }
        write!(f, "]")
    }
}

/// Ordered list of opaque byte-string segments
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Value(pub Vec<Vec<u8>>);

impl Value {
    /// Value made of a single segment
    pub fn single(segment: Vec<u8>) -> Self {
        Self(vec![segment])
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the value has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments in order
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.0
    }

    /// Append the segments of another value
    pub fn extend(&mut self, other: Value) {
        self.0.extend(other.0);
    }
}

/// A value together with its alignment
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlignedValue {
    /// Segments
    pub value: Value,
    /// Kind of each segment
    pub alignment: Alignment,
}

impl AlignedValue {
    /// Pair a value with its alignment
    pub fn new(value: Value, alignment: Alignment) -> Self {
        Self { value, alignment }
    }

    /// The empty aligned value (unit)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ordered concatenation of aligned values
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a AlignedValue>) -> Self {
        let mut out = AlignedValue::empty();
        for part in parts {
            out.value.0.extend(part.value.0.iter().cloned());
            out.alignment.extend(&part.alignment);
        }
        out
    }

    /// Check that every segment fits the atom describing it
    ///
    /// Segment and atom counts must match, a bytes segment may not exceed its
    /// declared length and a field segment may not exceed `max_field`.
    pub fn check_aligned(&self, max_field: &Field) -> Result<(), String> {
        if self.value.len() != self.alignment.len() {
            return Err(format!(
                "value has {} segments but alignment describes {}",
                self.value.len(),
                self.alignment.len()
            ));
        }

        for (i, (segment, atom)) in self.value.0.iter().zip(&self.alignment.0).enumerate() {
            match atom {
                AlignmentAtom::Bytes { length } => {
                    if segment.len() > *length as usize {
                        return Err(format!(
                            "segment {i} has {} bytes, exceeding {atom}",
                            segment.len()
                        ));
                    }
                }
                AlignmentAtom::Field => {
                    if Field::from_bytes_le(segment) > *max_field {
                        return Err(format!("segment {i} exceeds the field maximum"));
                    }
                }
                AlignmentAtom::Compress => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_FIELD;

    #[test]
    fn test_alignment_concat_preserves_order() {
        let a = Alignment::bytes(1);
        let b = Alignment::atom(AlignmentAtom::Field);
        let c = Alignment::atom(AlignmentAtom::Compress);
        let joined = Alignment::concat([&a, &b, &c]);
        assert_eq!(
            joined.0,
            vec![
                AlignmentAtom::Bytes { length: 1 },
                AlignmentAtom::Field,
                AlignmentAtom::Compress
            ]
        );
        assert_eq!(joined.to_string(), "[bytes[1], field, compress]");
    }

    #[test]
    fn test_aligned_value_concat() {
        let a = AlignedValue::new(Value::single(vec![1]), Alignment::bytes(1));
        let b = AlignedValue::new(Value::single(vec![]), Alignment::atom(AlignmentAtom::Field));
        let joined = AlignedValue::concat([&a, &b]);
        assert_eq!(joined.value.0, vec![vec![1], vec![]]);
        assert_eq!(joined.alignment.len(), 2);
    }

    #[test]
    fn test_check_aligned() {
        let ok = AlignedValue::new(Value::single(vec![1, 2]), Alignment::bytes(2));
        assert!(ok.check_aligned(&MAX_FIELD).is_ok());

        let too_long = AlignedValue::new(Value::single(vec![1, 2, 3]), Alignment::bytes(2));
        assert!(too_long.check_aligned(&MAX_FIELD).is_err());

        let count_mismatch = AlignedValue::new(Value(vec![vec![], vec![]]), Alignment::bytes(2));
        assert!(count_mismatch.check_aligned(&MAX_FIELD).is_err());

        let big_field = AlignedValue::new(
            Value::single(vec![0xff; 32]),
            Alignment::atom(AlignmentAtom::Field),
        );
        assert!(big_field.check_aligned(&MAX_FIELD).is_err());
    }

    #[test]
    fn test_zero_value_has_one_empty_segment_per_atom() {
        let alignment = Alignment(vec![AlignmentAtom::Field, AlignmentAtom::Bytes { length: 32 }]);
        assert_eq!(alignment.zero_value(), Value(vec![vec![], vec![]]));
    }
}
