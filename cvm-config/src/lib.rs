// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Enclave bootstrap configuration and workload scaffolding.
//!
//! Materializes the three enclave bootstrap artifacts (image build spec,
//! init script, process supervisor spec) from built-in defaults or caller
//! overrides, and scaffolds a runnable agent application from a template
//! tree.

mod generate;
mod scaffold;
pub mod templates;

pub use generate::{generate_config, ConfigOverrides};
pub use scaffold::{generate_agent_app, ScaffoldOptions};
