// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Preparing and compiling tensor functions.
//!
//! ```text
//! Tree<Building>
//!     │  Optimizer::optimize   (optional)
//!     ▼
//! Tree<Building>
//!     │  .freeze(root)
//!     ▼
//! Tree<Frozen>
//!     │  InterpretedFunction::compile
//!     ▼
//! InterpretedFunction ──shared──▶ EvalContext (one per thread)
//! ```
//!
//! [`prepare`] runs the whole pipeline. The compiled function is immutable
//! and `Send + Sync`; every evaluation happens in an
//! [`EvalContext`](crate::EvalContext) owned by the calling thread.

use crate::{EngineConfig, RuntimeError};
use tensor_core::ValueType;
use tensor_ir::nodes::Inject;
use tensor_ir::{compile_tree, Building, Frozen, Instruction, NodeId, ParamStash, Tree};

/// A frozen tree together with its instruction sequence.
pub struct InterpretedFunction {
    tree: Tree<Frozen>,
    program: Vec<Instruction>,
    stash: ParamStash,
    /// Type injected at each input slot; `None` for slots the tree never reads.
    inputs: Vec<Option<ValueType>>,
    max_stack_depth: usize,
}

impl InterpretedFunction {
    /// Compiles every node reachable from the root, children first.
    pub fn compile(tree: Tree<Frozen>) -> Result<Self, RuntimeError> {
        let order = tree.post_order();
        let nodes = tree.nodes();

        let mut inputs: Vec<Option<ValueType>> = Vec::new();
        let mut depth = 0usize;
        let mut max_stack_depth = 0usize;
        for &id in &order {
            if let Some(inject) = nodes.downcast::<Inject>(id) {
                let slot = inject.slot();
                if inputs.len() <= slot {
                    inputs.resize(slot + 1, None);
                }
                let ty = nodes.result_type(id);
                match &inputs[slot] {
                    Some(first) if first != ty => {
                        return Err(RuntimeError::ConflictingInput {
                            slot,
                            first: first.to_string(),
                            second: ty.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => inputs[slot] = Some(ty.clone()),
                }
            }
            depth = depth + 1 - nodes.children(id).len();
            max_stack_depth = max_stack_depth.max(depth);
        }

        let mut stash = ParamStash::new();
        let program = compile_tree(&tree, &mut stash);
        tracing::debug!(
            instructions = program.len(),
            params = stash.len(),
            inputs = inputs.len(),
            max_stack_depth,
            "function compiled"
        );
        Ok(Self {
            tree,
            program,
            stash,
            inputs,
            max_stack_depth,
        })
    }

    pub fn result_type(&self) -> &ValueType {
        self.tree.result_type(self.tree.root())
    }

    /// Number of input values an evaluation expects.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// The type compiled for input `slot`, if the tree reads it.
    pub fn input_type(&self, slot: usize) -> Option<&ValueType> {
        self.inputs.get(slot).and_then(Option::as_ref)
    }

    pub fn num_instructions(&self) -> usize {
        self.program.len()
    }

    pub fn tree(&self) -> &Tree<Frozen> {
        &self.tree
    }

    /// Indented rendering of the compiled tree.
    pub fn dump(&self) -> String {
        self.tree.dump_root()
    }

    pub(crate) fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub(crate) fn stash(&self) -> &ParamStash {
        &self.stash
    }

    pub(crate) fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }
}

impl std::fmt::Debug for InterpretedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpretedFunction")
            .field("result_type", &self.result_type().to_string())
            .field("instructions", &self.program.len())
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

/// Optimizes (when enabled), freezes and compiles the expression under
/// `root`.
pub fn prepare(
    mut tree: Tree<Building>,
    root: NodeId,
    config: &EngineConfig,
) -> Result<InterpretedFunction, RuntimeError> {
    let root = if config.optimize {
        let optimizer = config.create_optimizer()?;
        tracing::debug!("before optimization:\n{}", tree.dump(root));
        let (root, report) = optimizer.optimize_with_report(&mut tree, root);
        tracing::info!("{}", report.summary().trim_end());
        root
    } else {
        root
    };
    let frozen = tree.freeze(root)?;
    tracing::debug!("prepared tree:\n{}", frozen.dump_root());
    InterpretedFunction::compile(frozen)
}
