//! Ledger query instructions

use serde::{Deserialize, Serialize};

use super::state::{field_key, StateValue};
use crate::types::AlignedValue;

/// One step of an `idx` path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Fixed key embedded in the instruction
    Value(AlignedValue),
    /// Key popped from the stack at execution time
    Stack,
}

/// Ledger query instruction
///
/// Programs are `Op<()>`. Once executed, every `Popeq` carries the value it
/// read, turning the program into a self-describing transcript
/// (`Op<AlignedValue>`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op<R> {
    /// Do nothing for `n` steps
    Noop { n: u32 },
    /// Push a copy of the item `n` places below the top
    Dup { n: u8 },
    /// Swap the top with the item `n + 1` places below it
    Swap { n: u8 },
    /// Discard the top
    Pop,
    /// Pop a container and follow `path` into it
    ///
    /// Without `push_path` the value at the end of the path is pushed. With
    /// `push_path` every container along the way is pushed followed by its
    /// key, ready for `Ins`.
    Idx {
        cached: bool,
        push_path: bool,
        path: Vec<Key>,
    },
    /// Push a constant state value
    Push { storage: bool, value: StateValue },
    /// Pop a value, then `n` key/container pairs, writing each value into its
    /// container; push the outermost container
    Ins { cached: bool, n: u8 },
    /// Pop a cell and publish it as a read
    Popeq { cached: bool, result: R },
    /// Add an immediate to the integer cell on top
    Addi { immediate: u32 },
    /// Subtract an immediate from the integer cell on top
    Subi { immediate: u32 },
    /// Replace the container on top by its size
    Size,
    /// Pop a key then a map; push whether the key is present
    Member,
}

impl<R> Op<R> {
    /// Short instruction name
    pub fn name(&self) -> &'static str {
        match self {
            Op::Noop { .. } => "noop",
            Op::Dup { .. } => "dup",
            Op::Swap { .. } => "swap",
            Op::Pop => "pop",
            Op::Idx { .. } => "idx",
            Op::Push { .. } => "push",
            Op::Ins { .. } => "ins",
            Op::Popeq { .. } => "popeq",
            Op::Addi { .. } => "addi",
            Op::Subi { .. } => "subi",
            Op::Size => "size",
            Op::Member => "member",
        }
    }

    /// Rewrite the `Popeq` payload
    pub fn map_result<S>(self, f: impl FnOnce(R) -> S) -> Op<S> {
        match self {
            Op::Noop { n } => Op::Noop { n },
            Op::Dup { n } => Op::Dup { n },
            Op::Swap { n } => Op::Swap { n },
            Op::Pop => Op::Pop,
            Op::Idx {
                cached,
                push_path,
                path,
            } => Op::Idx {
                cached,
                push_path,
                path,
            },
            Op::Push { storage, value } => Op::Push { storage, value },
            Op::Ins { cached, n } => Op::Ins { cached, n },
            Op::Popeq { cached, result } => Op::Popeq {
                cached,
                result: f(result),
            },
            Op::Addi { immediate } => Op::Addi { immediate },
            Op::Subi { immediate } => Op::Subi { immediate },
            Op::Size => Op::Size,
            Op::Member => Op::Member,
        }
    }
}

// ============================================================================
// Program builders
// ============================================================================

/// Read contract field `position`
pub fn read_field(position: u8) -> Vec<Op<()>> {
    vec![
        Op::Dup { n: 0 },
        Op::Idx {
            cached: false,
            push_path: false,
            path: vec![Key::Value(field_key(position))],
        },
        Op::Popeq {
            cached: false,
            result: (),
        },
    ]
}

/// Overwrite contract field `position` with `value`
pub fn write_field(position: u8, value: AlignedValue) -> Vec<Op<()>> {
    vec![
        Op::Push {
            storage: false,
            value: StateValue::Cell(field_key(position)),
        },
        Op::Push {
            storage: true,
            value: StateValue::Cell(value),
        },
        Op::Ins { cached: false, n: 1 },
    ]
}

/// Add `amount` to the counter stored in contract field `position`
pub fn increment_field(position: u8, amount: u32) -> Vec<Op<()>> {
    vec![
        Op::Idx {
            cached: false,
            push_path: true,
            path: vec![Key::Value(field_key(position))],
        },
        Op::Dup { n: 0 },
        Op::Dup { n: 2 },
        Op::Idx {
            cached: false,
            push_path: false,
            path: vec![Key::Stack],
        },
        Op::Addi { immediate: amount },
        Op::Ins { cached: true, n: 1 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_result_only_touches_popeq() {
        let program = read_field(0);
        let transcript: Vec<Op<u32>> = program
            .into_iter()
            .map(|op| op.map_result(|()| 7))
            .collect();
        assert_eq!(
            transcript[2],
            Op::Popeq {
                cached: false,
                result: 7
            }
        );
        assert_eq!(transcript[0], Op::Dup { n: 0 });
    }

    #[test]
    fn test_op_names() {
        let names: Vec<_> = write_field(1, AlignedValue::empty())
            .iter()
            .map(Op::name)
            .collect();
        assert_eq!(names, vec!["push", "push", "ins"]);
    }
}
