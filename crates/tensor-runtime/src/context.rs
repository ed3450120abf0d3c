// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-thread evaluation of a compiled function.

use crate::{EngineConfig, EvalMetrics, InterpretedFunction, RuntimeError};
use eval_arena::{AllocationStats, EvalArena};
use std::time::Instant;
use tensor_codec::{decode, encode};
use tensor_core::Value;
use tensor_ir::State;

/// Operand stack and scratch arena for evaluating one function.
///
/// A context borrows its function and is not `Send`: every thread that
/// evaluates a shared [`InterpretedFunction`] creates its own.
///
/// # Example
/// ```
/// use tensor_core::{Aggr, BinaryOp, Value, ValueType};
/// use tensor_ir::Tree;
/// use tensor_runtime::{prepare, EngineConfig, EvalContext};
///
/// let ty = ValueType::from_spec("tensor(x[3])");
/// let mut tree = Tree::new();
/// let a = tree.inject(ty.clone(), 0);
/// let b = tree.inject(ty.clone(), 1);
/// let product = tree.join(a, b, BinaryOp::Mul);
/// let root = tree.reduce(product, Aggr::Sum, &[]);
///
/// let config = EngineConfig::default();
/// let function = prepare(tree, root, &config)?;
/// let mut ctx = EvalContext::new(&function, &config)?;
///
/// let a = Value::dense(ty.clone(), vec![1.0, 2.0, 3.0])?;
/// let b = Value::dense(ty, vec![4.0, 5.0, 6.0])?;
/// assert_eq!(ctx.eval(&[&a, &b])?.as_double(), 32.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct EvalContext<'f> {
    function: &'f InterpretedFunction,
    arena: EvalArena,
    metrics: Option<EvalMetrics>,
}

impl<'f> EvalContext<'f> {
    pub fn new(function: &'f InterpretedFunction, config: &EngineConfig) -> Result<Self, RuntimeError> {
        let budget = config.parse_budget()?;
        let metrics = config
            .enable_profiling
            .then(|| EvalMetrics::new(function.num_instructions()));
        Ok(Self {
            function,
            arena: EvalArena::new(budget),
            metrics,
        })
    }

    pub fn function(&self) -> &'f InterpretedFunction {
        self.function
    }

    /// Evaluates the function on `inputs`, one value per input slot.
    ///
    /// Inputs are checked against the compiled slot types before any
    /// instruction runs. The arena is reset afterwards whether or not the
    /// evaluation succeeded.
    pub fn eval(&mut self, inputs: &[&Value]) -> Result<Value, RuntimeError> {
        self.check_inputs(inputs)?;
        let start = Instant::now();

        let function = self.function;
        let mut state = State::with_stack_capacity(
            function.stash(),
            inputs,
            &self.arena,
            function.max_stack_depth(),
        );
        for instruction in function.program() {
            instruction.execute(&mut state);
        }
        let result = state.finish().map_err(RuntimeError::from);
        self.arena.reset();

        if let Some(metrics) = &mut self.metrics {
            metrics.record(start.elapsed(), result.is_err(), &self.arena.stats());
        }
        if let Err(err) = &result {
            tracing::warn!(error = %err, "evaluation failed");
        }
        result
    }

    /// Evaluates encoded inputs and returns the encoded result.
    pub fn eval_encoded(&mut self, inputs: &[&[u8]]) -> Result<Vec<u8>, RuntimeError> {
        let values = inputs
            .iter()
            .map(|bytes| decode(bytes))
            .collect::<Result<Vec<Value>, _>>()?;
        let refs: Vec<&Value> = values.iter().collect();
        let result = self.eval(&refs)?;
        Ok(encode(&result)?)
    }

    /// Metrics collected so far, if profiling is enabled.
    pub fn metrics(&self) -> Option<&EvalMetrics> {
        self.metrics.as_ref()
    }

    pub fn arena_stats(&self) -> AllocationStats {
        self.arena.stats()
    }

    fn check_inputs(&self, inputs: &[&Value]) -> Result<(), RuntimeError> {
        let expected = self.function.num_inputs();
        if inputs.len() != expected {
            return Err(RuntimeError::InputCount {
                expected,
                actual: inputs.len(),
            });
        }
        for (slot, value) in inputs.iter().enumerate() {
            if let Some(ty) = self.function.input_type(slot) {
                if value.value_type() != ty {
                    return Err(RuntimeError::InputType {
                        slot,
                        expected: ty.to_string(),
                        actual: value.value_type().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("function", self.function)
            .field("arena", &self.arena)
            .field("profiling", &self.metrics.is_some())
            .finish()
    }
}
