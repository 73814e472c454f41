// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::Result;
use cvm_types::process::ToolRunner;
use cvm_types::{
    is_valid_pcr, Error, VerificationOutcome, ATTESTATION_DOC_PATH, DEFAULT_ATTESTATION_PORT,
};
use fs_err as fs;
use tracing::{info, warn};

/// Marker phrase the external CLI prints on a passed verification.
///
/// String matching against tool output is brittle; it is kept here, in one
/// place, so the rest of the system is insulated from the phrasing.
pub const CLI_SUCCESS_MARKER: &str = "Verification successful";

/// Number of boot-chain PCRs checked by the standalone verifier.
const PCR_COUNT: u32 = 3;

/// Coarse-grained verification through the external `oyster-cvm` CLI.
///
/// The CLI applies its embedded trust anchor and the named PCR preset; we
/// only scan its output for the success marker. A failed verification (or
/// a failed tool invocation) is an expected outcome and comes back as
/// `success: false` with the tool's raw output preserved, never as `Err`.
pub async fn verify_with_cli(
    runner: &dyn ToolRunner,
    cli_program: &Path,
    enclave_ip: &str,
    expected_user_data: &str,
    pcr_preset: &str,
) -> Result<VerificationOutcome> {
    let args = vec![
        "verify".to_string(),
        "--enclave-ip".to_string(),
        enclave_ip.to_string(),
        "--user-data".to_string(),
        expected_user_data.to_string(),
        "--pcr-preset".to_string(),
        pcr_preset.to_string(),
    ];

    let output = match runner.run(cli_program, &args).await {
        Ok(output) => output,
        Err(e) => {
            warn!("verification command failed to run: {e:#}");
            return Ok(VerificationOutcome::failed(
                String::new(),
                format!("failed to run verification command: {e:#}"),
            ));
        }
    };

    let marker_found = output.stdout.contains(CLI_SUCCESS_MARKER);
    if output.success() && marker_found {
        info!("attestation verified for enclave {enclave_ip}");
        return Ok(VerificationOutcome {
            success: true,
            raw_output: output.combined(),
            ..Default::default()
        });
    }

    let error = if !output.success() {
        format!(
            "verification command exited with status {:?}",
            output.status
        )
    } else {
        "verification output did not contain the success marker".to_string()
    };
    Ok(VerificationOutcome::failed(output.combined(), error))
}

/// Parameters for the standalone-binary verification path.
///
/// The required fields are optional here so the presence check happens in
/// one place, before any subprocess is spawned.
#[derive(Debug, Clone)]
pub struct BinaryVerifyArgs {
    pub enclave_ip: Option<String>,
    pub pcr0: Option<String>,
    pub pcr1: Option<String>,
    pub pcr2: Option<String>,
    /// Path to the standalone verifier binary.
    pub verifier_path: Option<PathBuf>,
    /// Where the verifier writes the extracted enclave public key.
    pub output_key_path: PathBuf,
    /// Attestations older than this are rejected to bound replay risk.
    pub max_age_secs: u64,
}

impl Default for BinaryVerifyArgs {
    fn default() -> Self {
        Self {
            enclave_ip: None,
            pcr0: None,
            pcr1: None,
            pcr2: None,
            verifier_path: None,
            output_key_path: PathBuf::from("enclave_key.pub"),
            max_age_secs: 300,
        }
    }
}

fn require<'a, T>(value: &'a Option<T>, name: &'static str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| Error::MissingParameter(name).into())
}

fn require_pcr<'a>(value: &'a Option<String>, index: u8, name: &'static str) -> Result<&'a str> {
    let value = require(value, name)?;
    if !is_valid_pcr(value) {
        return Err(Error::InvalidPcr {
            index,
            value: value.clone(),
        }
        .into());
    }
    Ok(value)
}

/// Counts how many of the three PCR checks the verifier reported as passed.
/// The verifier prints one `pcrN verified` line per matching register.
fn count_verified_pcrs(stdout: &str) -> u32 {
    let lower = stdout.to_lowercase();
    (0..PCR_COUNT)
        .filter(|i| lower.contains(&format!("pcr{i} verified")))
        .count() as u32
}

/// Fine-grained verification through the standalone verifier binary.
///
/// The verifier fetches the attestation document itself, rejects documents
/// older than `max_age_secs`, validates the certificate chain up to the
/// hardware trust anchor, compares the three PCR values, and on full
/// success writes the enclave's ephemeral public key to
/// `output_key_path`, which is read back into the outcome.
///
/// Missing parameters and malformed PCR values fail fast with `Err` before
/// any subprocess is spawned. Everything else is reported as an outcome
/// with `success: false`.
pub async fn verify_with_binary(
    runner: &dyn ToolRunner,
    args: &BinaryVerifyArgs,
) -> Result<VerificationOutcome> {
    let enclave_ip = require(&args.enclave_ip, "enclave_ip")?;
    let pcr0 = require_pcr(&args.pcr0, 0, "pcr0")?;
    let pcr1 = require_pcr(&args.pcr1, 1, "pcr1")?;
    let pcr2 = require_pcr(&args.pcr2, 2, "pcr2")?;
    let verifier_path = require(&args.verifier_path, "verifier_path")?;

    let endpoint = format!(
        "http://{enclave_ip}:{DEFAULT_ATTESTATION_PORT}{ATTESTATION_DOC_PATH}"
    );
    let tool_args = vec![
        "--endpoint".to_string(),
        endpoint,
        "--public".to_string(),
        args.output_key_path.display().to_string(),
        "--pcr0".to_string(),
        pcr0.to_string(),
        "--pcr1".to_string(),
        pcr1.to_string(),
        "--pcr2".to_string(),
        pcr2.to_string(),
        "--max-age".to_string(),
        args.max_age_secs.to_string(),
    ];

    let output = match runner.run(verifier_path, &tool_args).await {
        Ok(output) => output,
        Err(e) => {
            warn!("verifier binary failed to run: {e:#}");
            return Ok(VerificationOutcome::failed(
                String::new(),
                format!("failed to run verifier binary: {e:#}"),
            ));
        }
    };

    let pcrs_verified = count_verified_pcrs(&output.stdout);
    if !output.success() || pcrs_verified < PCR_COUNT {
        let error = if output.success() {
            format!("only {pcrs_verified} of {PCR_COUNT} PCRs verified")
        } else {
            format!("verifier exited with status {:?}", output.status)
        };
        return Ok(VerificationOutcome {
            pcrs_verified,
            pcrs_total: PCR_COUNT,
            ..VerificationOutcome::failed(output.combined(), error)
        });
    }

    let public_key = match fs::read_to_string(&args.output_key_path) {
        Ok(key) => key.trim().to_string(),
        Err(e) => {
            return Ok(VerificationOutcome {
                pcrs_verified,
                pcrs_total: PCR_COUNT,
                ..VerificationOutcome::failed(
                    output.combined(),
                    format!("verifier passed but the extracted key could not be read: {e}"),
                )
            });
        }
    };

    info!("attestation verified for enclave {enclave_ip}, public key extracted");
    Ok(VerificationOutcome {
        success: true,
        public_key: Some(public_key),
        pcrs_verified,
        pcrs_total: PCR_COUNT,
        raw_output: output.combined(),
        error: None,
    })
}
