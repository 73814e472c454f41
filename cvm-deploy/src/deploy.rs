// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Result;
use cvm_types::process::ToolRunner;
use cvm_types::utils::format_duration;
use cvm_types::{DeployOutcome, DeployRequest, Error, JobRecord};
use serde::Serialize;
use tracing::{info, warn};

/// Name of the external CVM CLI the manager drives.
pub const OYSTER_CVM_PROGRAM: &str = "oyster-cvm";

/// Outcome of a stop call. Raw CLI output is kept for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StopOutcome {
    pub success: bool,
    pub raw_output: String,
    pub error: Option<String>,
}

/// Handle to the external `oyster-cvm` CLI. Constructed once by the
/// top-level process and passed by reference into each operation; it holds
/// no mutable state of its own.
pub struct OysterCli<'a> {
    runner: &'a dyn ToolRunner,
    program: PathBuf,
}

impl<'a> OysterCli<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self {
            runner,
            program: PathBuf::from(OYSTER_CVM_PROGRAM),
        }
    }

    pub fn with_program(runner: &'a dyn ToolRunner, program: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Version-probes the CLI. Any spawn error or non-zero exit means
    /// "not installed"; this never errors.
    pub async fn is_installed(&self) -> bool {
        match self.runner.run(&self.program, &["--version".to_string()]).await {
            Ok(output) => output.success(),
            Err(_) => false,
        }
    }

    /// Submits a funded deployment transaction: the wallet key pays for
    /// `duration_minutes` of enclave runtime running the manifest's
    /// workload. The digest in the outcome is the cryptographic identity
    /// of the deployed build and must be used as the expected user-data
    /// for every later attestation of this enclave.
    ///
    /// Marketplace and network failures are retryable and come back as
    /// `success: false`; a missing CLI is a precondition error (`Err`).
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        if request.duration_minutes == 0 {
            return Err(Error::InvalidDuration.into());
        }
        info!(
            "deploying {} for {} on {}",
            request.compose_path.display(),
            format_duration(request.duration_minutes),
            request.arch,
        );

        let args = vec![
            "deploy".to_string(),
            "--wallet-private-key".to_string(),
            request.wallet_private_key.clone(),
            "--duration-in-minutes".to_string(),
            request.duration_minutes.to_string(),
            "--docker-compose".to_string(),
            request.compose_path.display().to_string(),
            "--arch".to_string(),
            request.arch.to_string(),
        ];

        let output = match self.runner.run(&self.program, &args).await {
            Ok(output) => output,
            Err(e) => {
                if is_not_found(&e) {
                    return Err(Error::CliNotInstalled.into());
                }
                return Ok(DeployOutcome::failed(
                    String::new(),
                    format!("failed to run deploy command: {e:#}"),
                ));
            }
        };

        if !output.success() {
            warn!("deploy command exited with status {:?}", output.status);
            return Ok(DeployOutcome::failed(
                output.combined(),
                format!("deploy command exited with status {:?}", output.status),
            ));
        }

        let digest = parse_digest(&output.stdout);
        let ip = parse_ip(&output.stdout);
        match (digest, ip) {
            (Some(digest), Some(ip)) => {
                info!("deployed digest {digest} at {ip}");
                Ok(DeployOutcome {
                    success: true,
                    digest: Some(digest),
                    ip: Some(ip),
                    raw_output: output.combined(),
                    error: None,
                })
            }
            (digest, ip) => {
                let missing = match (&digest, &ip) {
                    (None, None) => "digest and enclave IP",
                    (None, _) => "digest",
                    _ => "enclave IP",
                };
                Ok(DeployOutcome::failed(
                    output.combined(),
                    format!("deploy output did not contain the {missing}"),
                ))
            }
        }
    }

    /// Queries the marketplace for all active jobs owned by
    /// `wallet_address`. Read-only; the CLI emits a JSON array here, so no
    /// string scraping is involved.
    pub async fn list_jobs(&self, wallet_address: &str) -> Result<Vec<JobRecord>> {
        let args = vec![
            "list".to_string(),
            "--address".to_string(),
            wallet_address.to_string(),
        ];
        let output = self.runner.run(&self.program, &args).await?;
        if !output.success() {
            return Err(Error::Network(format!(
                "list command exited with status {:?}: {}",
                output.status,
                output.combined(),
            ))
            .into());
        }
        let jobs: Vec<JobRecord> = serde_json::from_str(output.stdout.trim()).map_err(|e| {
            Error::Protocol(format!(
                "unexpected list output ({e}): {}",
                output.stdout.trim()
            ))
        })?;
        Ok(jobs)
    }

    /// Stops a running instance, terminating billing and releasing the
    /// enclave.
    pub async fn stop_job(&self, job_id: &str) -> Result<StopOutcome> {
        let args = vec![
            "stop".to_string(),
            "--job-id".to_string(),
            job_id.to_string(),
        ];
        let output = match self.runner.run(&self.program, &args).await {
            Ok(output) => output,
            Err(e) => {
                return Ok(StopOutcome {
                    success: false,
                    raw_output: String::new(),
                    error: Some(format!("failed to run stop command: {e:#}")),
                });
            }
        };
        if output.success() {
            info!("stopped job {job_id}");
        }
        Ok(StopOutcome {
            success: output.success(),
            error: if output.success() {
                None
            } else {
                Some(format!("stop command exited with status {:?}", output.status))
            },
            raw_output: output.combined(),
        })
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .map(|io| io.kind() == std::io::ErrorKind::NotFound)
            .unwrap_or(false)
    })
}

/// Extracts the 64-hex content digest from deploy output. The CLI prints a
/// line like `Digest: 9f86d0…`.
fn parse_digest(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().to_lowercase().ends_with("digest") {
            continue;
        }
        let value = value.trim();
        if value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(value.to_lowercase());
        }
    }
    None
}

/// Extracts the enclave IPv4 address from deploy output (`IP: 203.0.113.5`).
fn parse_ip(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        if !(key == "ip" || key.ends_with(" ip") || key.ends_with("enclave ip")) {
            continue;
        }
        let value = value.trim();
        if value.parse::<Ipv4Addr>().is_ok() {
            return Some(value.to_string());
        }
    }
    None
}
