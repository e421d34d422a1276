//! Curve points and Merkle path structures

use serde::{Deserialize, Serialize};

use super::primitives::{CompactBoolean, CompactField, CompactVector};
use super::{CompactType, ValueReader};
use crate::error::RuntimeResult;
use crate::types::{Alignment, Field, Value};

/// Point on the embedded curve in affine coordinates
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: Field,
    pub y: Field,
}

/// Root or node digest of a Merkle tree
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerkleTreeDigest {
    pub field: Field,
}

/// One step of a Merkle authentication path
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTreePathEntry {
    pub sibling: MerkleTreeDigest,
    pub goes_left: bool,
}

/// Leaf together with its authentication path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTreePath<L> {
    pub leaf: L,
    pub path: Vec<MerkleTreePathEntry>,
}

/// `CurvePoint`: two field elements, `x` then `y`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactCurvePoint {
    field: CompactField,
}

impl CompactCurvePoint {
    pub fn new(field: CompactField) -> Self {
        Self { field }
    }
}

impl CompactType for CompactCurvePoint {
    type Native = CurvePoint;

    fn alignment(&self) -> Alignment {
        let field = self.field.alignment();
        Alignment::concat([&field, &field])
    }

    fn to_value(&self, native: &CurvePoint) -> RuntimeResult<Value> {
        let mut value = self.field.to_value(&native.x)?;
        value.extend(self.field.to_value(&native.y)?);
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<CurvePoint> {
        let x = self.field.from_value(reader)?;
        let y = self.field.from_value(reader)?;
        Ok(CurvePoint { x, y })
    }
}

/// `MerkleTreeDigest`: a single field element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactMerkleTreeDigest {
    field: CompactField,
}

impl CompactMerkleTreeDigest {
    pub fn new(field: CompactField) -> Self {
        Self { field }
    }
}

impl CompactType for CompactMerkleTreeDigest {
    type Native = MerkleTreeDigest;

    fn alignment(&self) -> Alignment {
        self.field.alignment()
    }

    fn to_value(&self, native: &MerkleTreeDigest) -> RuntimeResult<Value> {
        self.field.to_value(&native.field)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<MerkleTreeDigest> {
        Ok(MerkleTreeDigest {
            field: self.field.from_value(reader)?,
        })
    }
}

/// `MerkleTreePathEntry`: sibling digest then direction flag
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactMerkleTreePathEntry {
    digest: CompactMerkleTreeDigest,
}

impl CompactMerkleTreePathEntry {
    pub fn new(field: CompactField) -> Self {
        Self {
            digest: CompactMerkleTreeDigest::new(field),
        }
    }
}

impl CompactType for CompactMerkleTreePathEntry {
    type Native = MerkleTreePathEntry;

    fn alignment(&self) -> Alignment {
        Alignment::concat([&self.digest.alignment(), &CompactBoolean.alignment()])
    }

    fn to_value(&self, native: &MerkleTreePathEntry) -> RuntimeResult<Value> {
        let mut value = self.digest.to_value(&native.sibling)?;
        value.extend(CompactBoolean.to_value(&native.goes_left)?);
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<MerkleTreePathEntry> {
        let sibling = self.digest.from_value(reader)?;
        let goes_left = CompactBoolean.from_value(reader)?;
        Ok(MerkleTreePathEntry { sibling, goes_left })
    }
}

/// `MerkleTreePath<depth, L>`: the leaf followed by exactly `depth` entries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactMerkleTreePath<L> {
    leaf: L,
    entries: CompactVector<CompactMerkleTreePathEntry>,
}

impl<L: CompactType> CompactMerkleTreePath<L> {
    pub fn new(depth: usize, leaf: L, field: CompactField) -> Self {
        Self {
            leaf,
            entries: CompactVector::new(depth, CompactMerkleTreePathEntry::new(field)),
        }
    }

    /// Number of path entries
    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

impl<L: CompactType> CompactType for CompactMerkleTreePath<L> {
    type Native = MerkleTreePath<L::Native>;

    fn alignment(&self) -> Alignment {
        Alignment::concat([&self.leaf.alignment(), &self.entries.alignment()])
    }

    fn to_value(&self, native: &Self::Native) -> RuntimeResult<Value> {
        let mut value = self.leaf.to_value(&native.leaf)?;
        value.extend(self.entries.to_value(&native.path)?);
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Self::Native> {
        let leaf = self.leaf.from_value(reader)?;
        let path = self.entries.from_value(reader)?;
        Ok(MerkleTreePath { leaf, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompactBytes;
    use crate::types::AlignmentAtom;
    use num_bigint::BigUint;

    fn entry(sibling: u32, goes_left: bool) -> MerkleTreePathEntry {
        MerkleTreePathEntry {
            sibling: MerkleTreeDigest {
                field: BigUint::from(sibling),
            },
            goes_left,
        }
    }

    #[test]
    fn test_curve_point_alignment() {
        let codec = CompactCurvePoint::default();
        assert_eq!(codec.alignment().0, vec![AlignmentAtom::Field, AlignmentAtom::Field]);
        let point = CurvePoint {
            x: BigUint::from(3u32),
            y: BigUint::from(4u32),
        };
        assert_eq!(codec.decode(&codec.encode(&point).unwrap()).unwrap(), point);
    }

    #[test]
    fn test_merkle_path_layout() {
        let codec = CompactMerkleTreePath::new(2, CompactBytes::<32>, CompactField::default());
        assert_eq!(codec.depth(), 2);
        assert_eq!(
            codec.alignment().0,
            vec![
                AlignmentAtom::Bytes { length: 32 },
                AlignmentAtom::Field,
                AlignmentAtom::Bytes { length: 1 },
                AlignmentAtom::Field,
                AlignmentAtom::Bytes { length: 1 },
            ]
        );

        let path = MerkleTreePath {
            leaf: [9u8; 32],
            path: vec![entry(1, true), entry(2, false)],
        };
        let aligned = codec.encode(&path).unwrap();
        assert_eq!(codec.decode(&aligned).unwrap(), path);
    }

    #[test]
    fn test_merkle_path_wrong_depth() {
        let codec = CompactMerkleTreePath::new(3, CompactBytes::<32>, CompactField::default());
        let path = MerkleTreePath {
            leaf: [0u8; 32],
            path: vec![entry(1, true)],
        };
        assert!(codec.to_value(&path).is_err());
    }
}
