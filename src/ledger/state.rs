//! Ledger state values
//!
//! A contract's public state is a tree of cells. Contract fields live in an
//! [`StateValue::Array`] indexed by field position; maps are keyed by aligned
//! values.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::codec::convert::bigint_to_value;
use crate::codec::{CompactType, CompactUnsignedInteger};
use crate::types::{AlignedValue, Value};

/// Node of a contract's ledger state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    /// Empty slot
    #[default]
    Null,
    /// Leaf holding one aligned value
    Cell(AlignedValue),
    /// Map keyed by aligned values
    Map(BTreeMap<AlignedValue, StateValue>),
    /// Fixed-size array indexed by position
    Array(Vec<StateValue>),
}

impl StateValue {
    /// Array of `n` empty slots
    pub fn array(n: usize) -> Self {
        StateValue::Array(vec![StateValue::Null; n])
    }

    /// Empty map
    pub fn map() -> Self {
        StateValue::Map(BTreeMap::new())
    }

    /// Short name of the node kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            StateValue::Null => "null",
            StateValue::Cell(_) => "cell",
            StateValue::Map(_) => "map",
            StateValue::Array(_) => "array",
        }
    }

    /// Child at `key`
    pub fn index(&self, key: &AlignedValue) -> Result<&StateValue, String> {
        match self {
            StateValue::Map(map) => map
                .get(key)
                .ok_or_else(|| format!("key {:?} not present in map", key.value)),
            StateValue::Array(items) => {
                let position = array_position(key)?;
                items
                    .get(position)
                    .ok_or_else(|| format!("index {position} out of bounds for array of {}", items.len()))
            }
            other => Err(format!("cannot index into {}", other.kind())),
        }
    }

    /// Replace the child at `key`
    ///
    /// Map entries are created on demand; array positions must already exist.
    pub fn insert(&mut self, key: AlignedValue, value: StateValue) -> Result<(), String> {
        match self {
            StateValue::Map(map) => {
                map.insert(key, value);
                Ok(())
            }
            StateValue::Array(items) => {
                let position = array_position(&key)?;
                let len = items.len();
                let slot = items
                    .get_mut(position)
                    .ok_or_else(|| format!("index {position} out of bounds for array of {len}"))?;
                *slot = value;
                Ok(())
            }
            other => Err(format!("cannot insert into {}", other.kind())),
        }
    }

    /// Follow a path of keys down the tree
    pub fn cell_at(&self, path: &[AlignedValue]) -> Result<&AlignedValue, String> {
        let mut node = self;
        for key in path {
            node = node.index(key)?;
        }
        match node {
            StateValue::Cell(value) => Ok(value),
            other => Err(format!("expected cell at end of path, found {}", other.kind())),
        }
    }

    /// Number of entries of a container
    pub fn size(&self) -> Result<usize, String> {
        match self {
            StateValue::Map(map) => Ok(map.len()),
            StateValue::Array(items) => Ok(items.len()),
            other => Err(format!("{} has no size", other.kind())),
        }
    }
}

/// Key addressing contract field `position`: a one-byte unsigned integer
pub fn field_key(position: u8) -> AlignedValue {
    AlignedValue::new(
        Value::single(bigint_to_value(&BigUint::from(position))),
        CompactUnsignedInteger::for_bytes(1).alignment(),
    )
}

fn array_position(key: &AlignedValue) -> Result<usize, String> {
    match key.value.segments() {
        [segment] if segment.len() <= 1 => Ok(segment.first().copied().unwrap_or(0) as usize),
        _ => Err(format!("array index must be a single byte, received {:?}", key.value)),
    }
}
