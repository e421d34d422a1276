//! Ledger query contexts and the query stack machine

use std::fmt::Debug;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::ops::{Key, Op};
use super::state::StateValue;
use super::CostModel;
use crate::backend::{BackendError, BackendResult};
use crate::codec::convert::{bigint_to_value, value_to_bigint};
use crate::types::{AlignedValue, Alignment, AlignmentAtom, ContractAddress, Value, MAX_FIELD};

/// Observable effect of a query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatherEvent {
    /// Value published by a `popeq`
    Read(AlignedValue),
}

/// Outcome of running a program against a query context
#[derive(Clone, Debug)]
pub struct QueryResults<Q> {
    /// Context holding the post-query state
    pub context: Q,
    /// Events in execution order
    pub events: Vec<GatherEvent>,
    /// Gas spent
    pub gas_cost: u64,
}

/// A contract's ledger state together with the means to query it
pub trait QueryContext: Clone + Debug {
    /// Context over `state` for the contract at `address`
    fn from_state(state: StateValue, address: ContractAddress) -> Self;

    /// Current ledger state
    fn state(&self) -> &StateValue;

    /// Address of the contract this state belongs to
    fn address(&self) -> ContractAddress;

    /// Run `program`, producing the post-query context and its events
    fn query(&self, program: &[Op<()>], cost_model: &CostModel) -> BackendResult<QueryResults<Self>>;
}

/// In-process query context backed by a [`StateValue`] tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalQueryContext {
    state: StateValue,
    address: ContractAddress,
}

impl QueryContext for LocalQueryContext {
    fn from_state(state: StateValue, address: ContractAddress) -> Self {
        Self { state, address }
    }

    fn state(&self) -> &StateValue {
        &self.state
    }

    fn address(&self) -> ContractAddress {
        self.address
    }

    fn query(&self, program: &[Op<()>], cost_model: &CostModel) -> BackendResult<QueryResults<Self>> {
        let mut events = Vec::new();
        let (state, gas_cost) = execute(self.state.clone(), program, cost_model, |_, read| {
            events.push(GatherEvent::Read(read));
            Ok(())
        })?;
        trace!(
            address = %self.address,
            ops = program.len(),
            reads = events.len(),
            gas_cost,
            "ledger query"
        );
        Ok(QueryResults {
            context: Self::from_state(state, self.address),
            events,
            gas_cost,
        })
    }
}

impl LocalQueryContext {
    /// Re-run a recorded transcript, checking every `popeq` against the value
    /// it recorded
    pub fn replay(&self, transcript: &[Op<AlignedValue>], cost_model: &CostModel) -> BackendResult<Self> {
        let mut index = 0usize;
        let (state, _) = execute(self.state.clone(), transcript, cost_model, |expected, read| {
            index += 1;
            if *expected != read {
                return Err(BackendError::Query(format!(
                    "read {index} of the transcript does not match the ledger"
                )));
            }
            Ok(())
        })?;
        Ok(Self::from_state(state, self.address))
    }
}

// ============================================================================
// Stack machine
// ============================================================================

fn query_error(op: &str, msg: impl std::fmt::Display) -> BackendError {
    BackendError::Query(format!("{op}: {msg}"))
}

struct Machine<'c> {
    stack: Vec<StateValue>,
    cost_model: &'c CostModel,
    gas: u64,
}

impl<'c> Machine<'c> {
    fn charge(&mut self, amount: u64) -> BackendResult<()> {
        self.gas = self.gas.saturating_add(amount);
        match self.cost_model.gas_limit {
            Some(limit) if self.gas > limit => Err(BackendError::Query(format!(
                "out of gas: {} exceeds limit {limit}",
                self.gas
            ))),
            _ => Ok(()),
        }
    }

    fn pop(&mut self, op: &str) -> BackendResult<StateValue> {
        self.stack
            .pop()
            .ok_or_else(|| query_error(op, "stack underflow"))
    }

    fn pop_cell(&mut self, op: &str) -> BackendResult<AlignedValue> {
        match self.pop(op)? {
            StateValue::Cell(value) => Ok(value),
            other => Err(query_error(op, format!("expected cell, found {}", other.kind()))),
        }
    }

    fn peek(&self, op: &str, depth: usize) -> BackendResult<&StateValue> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or_else(|| query_error(op, format!("no item {depth} below the top")))
    }

    fn step<R>(
        &mut self,
        op: &Op<R>,
        on_read: &mut impl FnMut(&R, AlignedValue) -> BackendResult<()>,
    ) -> BackendResult<()> {
        let name = op.name();
        match op {
            Op::Noop { n } => self.charge(self.cost_model.op_cost.saturating_mul(u64::from(*n)))?,
            Op::Dup { n } => {
                self.charge(self.cost_model.op_cost)?;
                let item = self.peek(name, usize::from(*n))?.clone();
                self.stack.push(item);
            }
            Op::Swap { n } => {
                self.charge(self.cost_model.op_cost)?;
                let len = self.stack.len();
                let other = len
                    .checked_sub(usize::from(*n) + 2)
                    .ok_or_else(|| query_error(name, "stack underflow"))?;
                self.stack.swap(other, len - 1);
            }
            Op::Pop => {
                self.charge(self.cost_model.op_cost)?;
                self.pop(name)?;
            }
            Op::Idx {
                cached,
                push_path,
                path,
            } => {
                self.charge(self.read_cost(*cached).saturating_mul(path.len().max(1) as u64))?;
                let mut container = self.pop(name)?;
                let mut keys = Vec::with_capacity(path.len());
                for key in path {
                    keys.push(match key {
                        Key::Value(value) => value.clone(),
                        Key::Stack => self.pop_cell(name)?,
                    });
                }
                let last = keys.len().saturating_sub(1);
                for (i, key) in keys.into_iter().enumerate() {
                    if *push_path {
                        let next = if i == last {
                            None
                        } else {
                            Some(container.index(&key).map_err(|e| query_error(name, e))?.clone())
                        };
                        self.stack.push(container);
                        self.stack.push(StateValue::Cell(key));
                        match next {
                            Some(next) => container = next,
                            None => return Ok(()),
                        }
                    } else {
                        container = container.index(&key).map_err(|e| query_error(name, e))?.clone();
                    }
                }
                if !*push_path {
                    self.stack.push(container);
                }
            }
            Op::Push { storage, value } => {
                let cost = if *storage {
                    self.cost_model.op_cost.saturating_add(self.cost_model.read_cost)
                } else {
                    self.cost_model.op_cost
                };
                self.charge(cost)?;
                self.stack.push(value.clone());
            }
            Op::Ins { cached, n } => {
                self.charge(self.read_cost(*cached).saturating_mul(u64::from(*n).max(1)))?;
                let mut value = self.pop(name)?;
                for _ in 0..*n {
                    let key = self.pop_cell(name)?;
                    let mut container = self.pop(name)?;
                    container.insert(key, value).map_err(|e| query_error(name, e))?;
                    value = container;
                }
                self.stack.push(value);
            }
            Op::Popeq { cached, result } => {
                self.charge(self.read_cost(*cached))?;
                let read = self.pop_cell(name)?;
                on_read(result, read)?;
            }
            Op::Addi { immediate } | Op::Subi { immediate } => {
                self.charge(self.cost_model.op_cost)?;
                let cell = self.pop_cell(name)?;
                let x = integer_cell(name, &cell)?;
                let y = if matches!(op, Op::Addi { .. }) {
                    x + *immediate
                } else if x >= BigUint::from(*immediate) {
                    x - *immediate
                } else {
                    return Err(query_error(name, format!("{x} - {immediate} underflows")));
                };
                let updated = AlignedValue::new(Value::single(bigint_to_value(&y)), cell.alignment);
                updated.check_aligned(&MAX_FIELD).map_err(|e| query_error(name, e))?;
                self.stack.push(StateValue::Cell(updated));
            }
            Op::Size => {
                self.charge(self.cost_model.op_cost)?;
                let size = self.pop(name)?.size().map_err(|e| query_error(name, e))?;
                self.stack.push(StateValue::Cell(AlignedValue::new(
                    Value::single(bigint_to_value(&BigUint::from(size as u64))),
                    Alignment::bytes(8),
                )));
            }
            Op::Member => {
                self.charge(self.cost_model.read_cost)?;
                let key = self.pop_cell(name)?;
                let present = match self.pop(name)? {
                    StateValue::Map(map) => map.contains_key(&key),
                    other => return Err(query_error(name, format!("expected map, found {}", other.kind()))),
                };
                self.stack.push(StateValue::Cell(AlignedValue::new(
                    Value::single(if present { vec![1] } else { Vec::new() }),
                    Alignment::bytes(1),
                )));
            }
        }
        Ok(())
    }

    fn read_cost(&self, cached: bool) -> u64 {
        if cached {
            self.cost_model.op_cost
        } else {
            self.cost_model.op_cost.saturating_add(self.cost_model.read_cost)
        }
    }
}

fn integer_cell(op: &str, cell: &AlignedValue) -> BackendResult<BigUint> {
    match (cell.value.segments(), cell.alignment.0.as_slice()) {
        ([segment], [AlignmentAtom::Bytes { .. } | AlignmentAtom::Field]) => Ok(value_to_bigint(segment)),
        _ => Err(query_error(op, format!("expected integer cell, found alignment {}", cell.alignment))),
    }
}

/// Run `ops` over a stack seeded with `state`
///
/// The program must leave exactly one item, the new state.
fn execute<R>(
    state: StateValue,
    ops: &[Op<R>],
    cost_model: &CostModel,
    mut on_read: impl FnMut(&R, AlignedValue) -> BackendResult<()>,
) -> BackendResult<(StateValue, u64)> {
    let mut machine = Machine {
        stack: vec![state],
        cost_model,
        gas: 0,
    };
    for op in ops {
        machine.step(op, &mut on_read)?;
    }
    match machine.stack.len() {
        1 => {
            let state = machine.pop("end")?;
            Ok((state, machine.gas))
        }
        n => Err(BackendError::Query(format!(
            "program left {n} items on the stack, expected exactly 1"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CompactType, CompactUnsignedInteger};
    use crate::ledger::ops::{increment_field, read_field, write_field};
    use crate::ledger::state::field_key;

    fn uint64(x: u32) -> AlignedValue {
        CompactUnsignedInteger::for_bytes(8).encode(&BigUint::from(x)).unwrap()
    }

    fn context() -> LocalQueryContext {
        LocalQueryContext::from_state(StateValue::array(2), ContractAddress::default())
    }

    #[test]
    fn test_write_then_read_field() {
        let ctx = context();
        let written = ctx.query(&write_field(1, uint64(5)), &CostModel::DEFAULT).unwrap();
        assert!(written.events.is_empty());
        assert_eq!(written.context.state().cell_at(&[field_key(1)]).unwrap(), &uint64(5));

        let read = written.context.query(&read_field(1), &CostModel::DEFAULT).unwrap();
        assert_eq!(read.events, vec![GatherEvent::Read(uint64(5))]);
        assert_eq!(read.context.state(), written.context.state());
    }

    #[test]
    fn test_increment_field() {
        let ctx = context()
            .query(&write_field(0, uint64(41)), &CostModel::unlimited())
            .unwrap()
            .context;
        let bumped = ctx.query(&increment_field(0, 1), &CostModel::unlimited()).unwrap();
        assert_eq!(bumped.context.state().cell_at(&[field_key(0)]).unwrap(), &uint64(42));
    }

    #[test]
    fn test_subi_underflow_is_query_error() {
        let ctx = context()
            .query(&write_field(0, uint64(0)), &CostModel::unlimited())
            .unwrap()
            .context;
        let program = vec![
            Op::Dup { n: 0 },
            Op::Idx {
                cached: false,
                push_path: false,
                path: vec![Key::Value(field_key(0))],
            },
            Op::Subi { immediate: 1 },
            Op::Pop,
        ];
        let err = ctx.query(&program, &CostModel::unlimited()).unwrap_err();
        assert!(matches!(err, BackendError::Query(msg) if msg.contains("underflows")));
    }

    #[test]
    fn test_unbalanced_program_rejected() {
        let program = vec![Op::Dup { n: 0 }];
        assert!(context().query(&program, &CostModel::unlimited()).is_err());
    }

    #[test]
    fn test_gas_limit_enforced() {
        let cost = CostModel {
            op_cost: 1,
            read_cost: 10,
            gas_limit: Some(5),
        };
        assert!(context().query(&read_field(0), &cost).is_err());
        assert!(context().query(&[Op::Noop { n: 5 }], &cost).is_ok());
    }

    #[test]
    fn test_huge_costs_run_out_of_gas() {
        let cost = CostModel {
            op_cost: u64::MAX / 2,
            read_cost: u64::MAX,
            gas_limit: Some(1_000_000),
        };
        for program in [vec![Op::Noop { n: 3 }], read_field(0)] {
            let err = context().query(&program, &cost).unwrap_err();
            assert!(err.to_string().contains("out of gas"));
        }
    }

    #[test]
    fn test_replay_checks_reads() {
        let ctx = context()
            .query(&write_field(1, uint64(3)), &CostModel::unlimited())
            .unwrap()
            .context;
        let transcript: Vec<Op<AlignedValue>> = read_field(1)
            .into_iter()
            .map(|op| op.map_result(|()| uint64(3)))
            .collect();
        assert_eq!(ctx.replay(&transcript, &CostModel::unlimited()).unwrap(), ctx);

        let forged: Vec<Op<AlignedValue>> = read_field(1)
            .into_iter()
            .map(|op| op.map_result(|()| uint64(4)))
            .collect();
        assert!(ctx.replay(&forged, &CostModel::unlimited()).is_err());
    }

    #[test]
    fn test_member_and_size() {
        let key = uint64(9);
        let program = vec![
            Op::Push {
                storage: false,
                value: StateValue::map(),
            },
            Op::Push {
                storage: false,
                value: StateValue::Cell(key.clone()),
            },
            Op::Push {
                storage: false,
                value: StateValue::Cell(uint64(1)),
            },
            Op::Ins { cached: false, n: 1 },
            Op::Dup { n: 0 },
            Op::Push {
                storage: false,
                value: StateValue::Cell(key),
            },
            Op::Member,
            Op::Popeq {
                cached: true,
                result: (),
            },
            Op::Size,
            Op::Popeq {
                cached: true,
                result: (),
            },
        ];
        let results = context().query(&program, &CostModel::unlimited()).unwrap();
        assert_eq!(results.events.len(), 2);
        assert_eq!(
            results.events[0],
            GatherEvent::Read(AlignedValue::new(Value::single(vec![1]), Alignment::bytes(1)))
        );
        assert_eq!(results.events[1], GatherEvent::Read(uint64(1)));
    }
}
