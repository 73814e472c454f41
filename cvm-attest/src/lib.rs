// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Remote attestation verification for Oyster CVM enclaves.
//!
//! Establishes cryptographic trust in a specific running enclave instance
//! before any sensitive data flows to it. Two verification paths exist:
//! the external `oyster-cvm` CLI applies a named PCR preset (a versioned
//! policy bundle), while the standalone verifier binary checks exactly
//! three caller-supplied PCR values, bounds attestation age, and extracts
//! the enclave's ephemeral public key.

mod doc;
mod trust_anchor;
mod verify;

pub use doc::fetch_attestation_doc;
pub use trust_anchor::{install_root_ca, AWS_NITRO_ENCLAVES_ROOT_G1};
pub use verify::{verify_with_binary, verify_with_cli, BinaryVerifyArgs, CLI_SUCCESS_MARKER};
