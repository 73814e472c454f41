// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cvm_types::utils::copy_dir_all;
use cvm_types::{Error, DEFAULT_APP_PORT};
use fs_err as fs;
use safe_write::safe_write;
use tracing::info;

use crate::templates::{AGENT_APP_DEFAULT_NAME, AGENT_APP_MANIFEST, AGENT_APP_SERVER};

/// Textual substitutions applied to the scaffolded application.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldOptions {
    /// Rewrites the server's default port literal.
    pub port: Option<u16>,
    /// Rewrites the package manifest's name field.
    pub package_name: Option<String>,
    /// Copy this template tree instead of the embedded skeleton.
    pub template_dir: Option<PathBuf>,
}

/// Scaffolds a runnable agent application into `output_dir` and returns
/// that directory. The skeleton is the embedded template (server + package
/// manifest) unless `template_dir` points at a custom tree, which is
/// copied recursively before the substitutions are applied.
pub fn generate_agent_app(
    output_dir: Option<&Path>,
    options: &ScaffoldOptions,
) -> Result<PathBuf> {
    let output_dir = output_dir.ok_or(Error::MissingOutputDirectory)?;

    match &options.template_dir {
        Some(template_dir) => {
            copy_dir_all(template_dir, output_dir).with_context(|| {
                format!("failed to copy template tree {}", template_dir.display())
            })?;
        }
        None => {
            fs::create_dir_all(output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            safe_write(output_dir.join("index.js"), AGENT_APP_SERVER)
                .context("failed to write server skeleton")?;
            safe_write(output_dir.join("package.json"), AGENT_APP_MANIFEST)
                .context("failed to write package manifest")?;
        }
    }

    if let Some(port) = options.port {
        rewrite(
            &output_dir.join("index.js"),
            &DEFAULT_APP_PORT.to_string(),
            &port.to_string(),
        )?;
    }
    if let Some(name) = &options.package_name {
        rewrite(
            &output_dir.join("package.json"),
            AGENT_APP_DEFAULT_NAME,
            name,
        )?;
    }

    info!("scaffolded agent app at {}", output_dir.display());
    Ok(output_dir.to_path_buf())
}

fn rewrite(path: &Path, from: &str, to: &str) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    safe_write(path, content.replace(from, to))
        .with_context(|| format!("failed to rewrite {}", path.display()))?;
    Ok(())
}
