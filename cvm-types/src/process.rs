// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! External tool invocation.
//!
//! Every subprocess the toolkit runs (the `oyster-cvm` CLI, the standalone
//! attestation verifier binary) goes through the [`ToolRunner`] trait so
//! tests can inject a fake implementation instead of spawning processes.
//! The real implementation bounds each invocation with a deadline; a hung
//! external binary fails the call instead of blocking the caller forever.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::Error;

/// Captured result of one subprocess invocation. stdout and stderr are
/// always preserved; they are frequently the only diagnostic available for
/// a failed enclave operation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout and stderr concatenated, for surfacing to operators verbatim.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Capability interface for running external binaries.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs `program` with `args` to completion and captures its output.
    /// Returns `Err` only for spawn failures and deadline expiry; a
    /// non-zero exit is reported through [`ToolOutput::status`].
    async fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput>;
}

/// Default timeout for external tool invocations. Deploy transactions can
/// legitimately take minutes to confirm on the marketplace.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// [`ToolRunner`] backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput> {
        debug!("running {} {}", program.display(), args.join(" "));
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();
        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| Error::ToolTimeout(self.timeout))?
            .with_context(|| format!("failed to run {}", program.display()))?;
        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
