// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Deployment manager for Oyster CVM enclaves.
//!
//! Drives the external `oyster-cvm` CLI lifecycle: install probe, compose
//! manifest generation, funded deploy transactions against the
//! marketplace, and list/stop of running instances. The CLI and the
//! marketplace behind it are treated as an opaque service; everything we
//! know about a deployment comes from the CLI's captured output.

mod deploy;
mod manifest;

pub use deploy::{OysterCli, StopOutcome, OYSTER_CVM_PROGRAM};
pub use manifest::write_manifest;
