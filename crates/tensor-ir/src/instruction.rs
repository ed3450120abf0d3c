// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compiled instructions and the state they run against.
//!
//! Compilation turns every node into one [`Instruction`]: a plain function
//! pointer plus a 64-bit parameter. The parameter is either a small scalar
//! (an input slot) or a handle into the [`ParamStash`], which owns the
//! richer per-node data (plans, constants, result types) for as long as the
//! compiled function lives.
//!
//! At run time the instructions execute in post-order against a [`State`]:
//! each pops its operands, computes, and pushes exactly one result.

use crate::IrError;
use eval_arena::{EvalArena, ScratchGuard};
use std::any::Any;
use std::fmt;
use tensor_core::{Value, ValueType, ValueView};

/// Signature shared by every compiled kernel.
pub type OpFunction = for<'a> fn(&mut State<'a>, u64);

/// One step of a compiled program.
#[derive(Clone, Copy)]
pub struct Instruction {
    pub function: OpFunction,
    pub param: u64,
}

impl Instruction {
    pub fn new(function: OpFunction, param: u64) -> Self {
        Self { function, param }
    }

    /// Runs the instruction against `state`.
    #[inline]
    pub fn execute(&self, state: &mut State<'_>) {
        (self.function)(state, self.param)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("function", &(self.function as *const ()))
            .field("param", &self.param)
            .finish()
    }
}

// ── ParamStash ─────────────────────────────────────────────────────

/// Compile-time arena for instruction parameters.
///
/// Lives exactly as long as the compiled function; never touched by
/// evaluation except through shared references.
#[derive(Default)]
pub struct ParamStash {
    params: Vec<Box<dyn Any + Send + Sync>>,
}

impl ParamStash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and returns its handle.
    pub fn create<T: Any + Send + Sync>(&mut self, value: T) -> u64 {
        self.params.push(Box::new(value));
        (self.params.len() - 1) as u64
    }

    /// Borrows the parameter behind `handle`.
    ///
    /// # Panics
    /// Panics if the handle is unknown or holds another type. Handles are
    /// only produced by [`create`](Self::create) during compilation and
    /// consumed by the matching kernel, so this is a compiler bug.
    pub fn get<T: Any>(&self, handle: u64) -> &T {
        self.params
            .get(handle as usize)
            .and_then(|p| p.downcast_ref::<T>())
            .unwrap_or_else(|| {
                panic!(
                    "parameter {handle} is not a {}",
                    std::any::type_name::<T>()
                )
            })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Debug for ParamStash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStash")
            .field("params", &self.params.len())
            .finish()
    }
}

// ── Operands ───────────────────────────────────────────────────────

/// An entry on the operand stack.
#[derive(Debug)]
pub enum Operand<'a> {
    /// An input, a constant, or either of them seen through another type.
    Borrowed(ValueView<'a>),
    /// A value computed during this evaluation.
    Owned(Value),
}

impl<'a> Operand<'a> {
    pub fn view(&self) -> ValueView<'_> {
        match self {
            Operand::Borrowed(view) => *view,
            Operand::Owned(value) => value.view(),
        }
    }

    pub fn value_type(&self) -> &ValueType {
        match self {
            Operand::Borrowed(view) => view.value_type(),
            Operand::Owned(value) => value.value_type(),
        }
    }

    /// Reinterprets the operand under a layout-compatible type without
    /// touching its cells.
    pub fn retype(self, value_type: &'a ValueType) -> Operand<'a> {
        match self {
            Operand::Borrowed(view) => Operand::Borrowed(view.with_type(value_type)),
            Operand::Owned(value) => Operand::Owned(value.retype(value_type.clone())),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Operand::Borrowed(view) => view.to_value(),
            Operand::Owned(value) => value,
        }
    }
}

// ── State ──────────────────────────────────────────────────────────

/// Per-evaluation execution state.
pub struct State<'a> {
    params: &'a ParamStash,
    inputs: &'a [&'a Value],
    stack: Vec<Operand<'a>>,
    arena: &'a EvalArena,
}

impl<'a> State<'a> {
    pub fn new(params: &'a ParamStash, inputs: &'a [&'a Value], arena: &'a EvalArena) -> Self {
        Self::with_stack_capacity(params, inputs, arena, 0)
    }

    pub fn with_stack_capacity(
        params: &'a ParamStash,
        inputs: &'a [&'a Value],
        arena: &'a EvalArena,
        capacity: usize,
    ) -> Self {
        Self {
            params,
            inputs,
            stack: Vec::with_capacity(capacity),
            arena,
        }
    }

    /// Parameter lookup for kernels; see [`ParamStash::get`].
    #[inline]
    pub fn param<T: Any>(&self, handle: u64) -> &'a T {
        self.params.get(handle)
    }

    /// The evaluation input in `slot`. Slots are checked against the
    /// compiled function before evaluation starts.
    pub fn input(&self, slot: usize) -> &'a Value {
        self.inputs[slot]
    }

    pub fn push(&mut self, operand: Operand<'a>) {
        self.stack.push(operand);
    }

    pub fn push_value(&mut self, value: Value) {
        self.stack.push(Operand::Owned(value));
    }

    /// Pops the top operand.
    ///
    /// # Panics
    /// Panics on an empty stack; a post-order program never underflows.
    pub fn pop(&mut self) -> Operand<'a> {
        match self.stack.pop() {
            Some(operand) => operand,
            None => panic!("operand stack underflow"),
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// A zero-filled scratch buffer from the evaluation arena.
    ///
    /// A request over budget is served by a detached heap buffer instead.
    /// The arena counts and logs the refusal; the result is unaffected.
    pub fn scratch(&mut self, len: usize) -> ScratchGuard {
        if len == 0 {
            return ScratchGuard::detached(0);
        }
        self.arena
            .alloc_f64(len)
            .unwrap_or_else(|_| ScratchGuard::detached(len))
    }

    /// Ends the evaluation, returning the single remaining value.
    pub fn finish(mut self) -> Result<Value, IrError> {
        if self.stack.len() != 1 {
            return Err(IrError::StackImbalance {
                depth: self.stack.len(),
            });
        }
        Ok(self.pop().into_value())
    }
}

impl fmt::Debug for State<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("inputs", &self.inputs.len())
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_arena::MemoryBudget;

    fn push_constant(state: &mut State<'_>, param: u64) {
        let value: &Value = state.param(param);
        state.push(Operand::Borrowed(value.view()));
    }

    fn add_top_two(state: &mut State<'_>, _param: u64) {
        let b = state.pop().view().as_double();
        let a = state.pop().view().as_double();
        state.push_value(Value::double(a + b));
    }

    #[test]
    fn test_stash_handles() {
        let mut stash = ParamStash::new();
        let a = stash.create(7u32);
        let b = stash.create(String::from("plan"));
        assert_eq!(*stash.get::<u32>(a), 7);
        assert_eq!(stash.get::<String>(b), "plan");
        assert_eq!(stash.len(), 2);
    }

    #[test]
    #[should_panic(expected = "is not a")]
    fn test_stash_type_mismatch_panics() {
        let mut stash = ParamStash::new();
        let a = stash.create(7u32);
        let _ = stash.get::<String>(a);
    }

    #[test]
    fn test_program_runs_in_order() {
        let mut stash = ParamStash::new();
        let one = stash.create(Value::double(1.0));
        let two = stash.create(Value::double(2.5));
        let program = [
            Instruction::new(push_constant, one),
            Instruction::new(push_constant, two),
            Instruction::new(add_top_two, 0),
        ];

        let arena = EvalArena::default();
        let mut state = State::new(&stash, &[], &arena);
        for instruction in &program {
            instruction.execute(&mut state);
        }
        assert_eq!(state.finish().unwrap().as_double(), 3.5);
    }

    #[test]
    fn test_unbalanced_stack() {
        let stash = ParamStash::new();
        let arena = EvalArena::default();
        let state = State::new(&stash, &[], &arena);
        assert!(matches!(
            state.finish(),
            Err(IrError::StackImbalance { depth: 0 })
        ));
    }

    #[test]
    fn test_scratch_over_budget_falls_back() {
        let mut stash = ParamStash::new();
        let one = stash.create(Value::double(1.0));
        let arena = EvalArena::new(MemoryBudget::from_bytes(64));
        let mut state = State::new(&stash, &[], &arena);

        let buffer = state.scratch(100);
        assert!(buffer.is_detached());
        assert_eq!(buffer.len(), 100);
        assert!(buffer.iter().all(|&x| x == 0.0));
        drop(buffer);

        Instruction::new(push_constant, one).execute(&mut state);
        assert_eq!(state.finish().unwrap().as_double(), 1.0);
        assert_eq!(arena.stats().budget_failures, 1);
    }

    #[test]
    fn test_retype_borrowed_operand() {
        let value = Value::dense(ValueType::from_spec("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let renamed = ValueType::from_spec("tensor(y[2])");
        let operand = Operand::Borrowed(value.view()).retype(&renamed);
        assert_eq!(operand.value_type(), &renamed);
        assert_eq!(operand.into_value().cells().to_f64_vec(), vec![1.0, 2.0]);
    }
}
