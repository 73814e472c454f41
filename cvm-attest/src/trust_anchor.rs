// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use fs_err as fs;

/// AWS Nitro Enclaves Root-G1 certificate, the trust anchor of the
/// hardware attestation signing chain. Treated as versioned data: callers
/// needing a different anchor (future platform generations) install their
/// own PEM instead of this one.
pub const AWS_NITRO_ENCLAVES_ROOT_G1: &str =
    include_str!("../certs/AWS_NitroEnclaves_Root-G1.pem");

/// Writes the embedded trust anchor to `dest_path` for use by external
/// tooling. Idempotent; overwrites any existing file.
pub fn install_root_ca(dest_path: impl AsRef<Path>) -> Result<()> {
    let dest_path = dest_path.as_ref();
    if let Some(parent) = dest_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(dest_path, AWS_NITRO_ENCLAVES_ROOT_G1)
        .with_context(|| format!("failed to write root CA to {}", dest_path.display()))?;
    Ok(())
}
