// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cvm_types::{artifact_filenames, Error};
use fs_err as fs;
use safe_write::safe_write;
use tracing::info;

use crate::templates::{DEFAULT_DOCKERFILE, DEFAULT_SETUP_SCRIPT, DEFAULT_SUPERVISOR_CONF};

/// Per-artifact template overrides. Each artifact independently falls back
/// to its built-in default when no override is supplied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dockerfile: Option<String>,
    pub setup_script: Option<String>,
    pub supervisor_conf: Option<String>,
}

/// Writes the enclave bootstrap bundle (`Dockerfile`, `setup.sh`,
/// `supervisord.conf`) into `output_dir` and returns the written paths in
/// that order.
///
/// The output directory is a required parameter, checked before any
/// filesystem mutation. Content is written byte-identically to the
/// override or default template; a partial write surfaces as an error
/// rather than leaving a silently incomplete bundle.
pub fn generate_config(
    overrides: &ConfigOverrides,
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let output_dir = output_dir.ok_or(Error::MissingOutputDirectory)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let artifacts: [(&str, &str); 3] = [
        (
            artifact_filenames::DOCKERFILE,
            overrides.dockerfile.as_deref().unwrap_or(DEFAULT_DOCKERFILE),
        ),
        (
            artifact_filenames::SETUP_SCRIPT,
            overrides
                .setup_script
                .as_deref()
                .unwrap_or(DEFAULT_SETUP_SCRIPT),
        ),
        (
            artifact_filenames::SUPERVISOR_CONF,
            overrides
                .supervisor_conf
                .as_deref()
                .unwrap_or(DEFAULT_SUPERVISOR_CONF),
        ),
    ];

    let mut written = Vec::with_capacity(artifacts.len());
    for (filename, content) in artifacts {
        let path = output_dir.join(filename);
        safe_write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    // The init script must be executable inside the image build context
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let script = output_dir.join(artifact_filenames::SETUP_SCRIPT);
        fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to set permissions on {}", script.display()))?;
    }

    info!("wrote enclave config bundle to {}", output_dir.display());
    Ok(written)
}
