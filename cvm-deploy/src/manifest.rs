// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use cvm_types::ServiceMap;
use fs_err as fs;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ComposeFile<'a> {
    services: &'a ServiceMap,
}

/// Writes a docker-compose style manifest describing the enclave workload,
/// in the format the `oyster-cvm` CLI consumes for deploys.
pub fn write_manifest(services: &ServiceMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let doc = ComposeFile { services };
    let yaml = serde_yaml2::to_string(&doc).context("failed to serialize compose manifest")?;
    fs::write(path, yaml)
        .with_context(|| format!("failed to write compose manifest to {}", path.display()))?;
    Ok(())
}
