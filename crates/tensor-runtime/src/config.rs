// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! optimize = true
//! passes = ["vector-matrix-product", "generic-rename"]
//! arena_budget = "64M"
//! enable_profiling = false
//! ```

use crate::RuntimeError;
use eval_arena::MemoryBudget;
use std::path::Path;
use tensor_optimizer::Optimizer;

/// Configuration for preparing and evaluating tensor functions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether [`prepare`](crate::prepare) runs the optimizer.
    pub optimize: bool,
    /// Pass names in the order they are offered; empty selects every pass.
    pub passes: Vec<String>,
    /// Scratch budget per evaluation (human-readable, e.g. `"64M"`).
    pub arena_budget: String,
    /// Whether evaluation contexts collect [`EvalMetrics`](crate::EvalMetrics).
    pub enable_profiling: bool,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Parses the arena budget string into a [`MemoryBudget`].
    pub fn parse_budget(&self) -> Result<MemoryBudget, RuntimeError> {
        MemoryBudget::parse(&self.arena_budget)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid budget: {e}")))
    }

    /// Creates the optimizer for the configured pass list.
    pub fn create_optimizer(&self) -> Result<Optimizer, RuntimeError> {
        Ok(Optimizer::from_names(&self.passes)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            passes: Vec::new(),
            arena_budget: "64M".to_string(),
            enable_profiling: false,
        }
    }
}
