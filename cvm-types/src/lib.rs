// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the Oyster CVM deployment and attestation toolkit.
//!
//! The data model here ties a deployment to its attestation: the digest
//! returned by a successful deploy is the expected user-data value for
//! every subsequent attestation check against that enclave instance.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

mod error;
pub mod process;
pub mod utils;

pub use error::Error;

/// Default port the enclave attestation server is proxied out on.
pub const DEFAULT_ATTESTATION_PORT: u16 = 1300;

/// Default port the enclave workload API is proxied out on.
pub const DEFAULT_APP_PORT: u16 = 3000;

/// HTTP path serving the raw attestation document.
pub const ATTESTATION_DOC_PATH: &str = "/attestation/raw";

/// Fixed filenames of the generated enclave bootstrap artifacts.
pub mod artifact_filenames {
    pub const DOCKERFILE: &str = "Dockerfile";
    pub const SETUP_SCRIPT: &str = "setup.sh";
    pub const SUPERVISOR_CONF: &str = "supervisord.conf";
}

/// Target CPU architecture of an enclave image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    Arm64,
    Amd64,
}

impl Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Amd64 => write!(f, "amd64"),
        }
    }
}

impl FromStr for Architecture {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" => Ok(Architecture::Arm64),
            "amd64" => Ok(Architecture::Amd64),
            _ => bail!("invalid architecture: {s}, supported architectures: arm64, amd64"),
        }
    }
}

/// Returns true if `value` is a well-formed PCR measurement: exactly 96
/// hex characters (a SHA-384-class digest). Anything else must be rejected
/// before it reaches a verifier.
pub fn is_valid_pcr(value: &str) -> bool {
    value.len() == 96 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The three boot-chain PCR measurements expected from an enclave image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pcrs {
    pub pcr0: String,
    pub pcr1: String,
    pub pcr2: String,
}

impl Pcrs {
    /// Validates each value up front; malformed PCRs never leave this
    /// constructor.
    pub fn new(
        pcr0: impl Into<String>,
        pcr1: impl Into<String>,
        pcr2: impl Into<String>,
    ) -> Result<Self> {
        let pcrs = Self {
            pcr0: pcr0.into(),
            pcr1: pcr1.into(),
            pcr2: pcr2.into(),
        };
        pcrs.validate()?;
        Ok(pcrs)
    }

    pub fn validate(&self) -> Result<()> {
        for (index, value) in [(0u8, &self.pcr0), (1, &self.pcr1), (2, &self.pcr2)] {
            if !is_valid_pcr(value) {
                return Err(Error::InvalidPcr {
                    index,
                    value: value.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// One named service in the enclave compose manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub image: String,
    pub network_mode: String,
    pub restart: String,
    pub init: bool,
}

impl Default for ServiceDefinition {
    fn default() -> Self {
        Self {
            image: String::new(),
            network_mode: "host".to_string(),
            restart: "unless-stopped".to_string(),
            init: true,
        }
    }
}

/// Service name to definition map, serialized as the `services` section of
/// the compose manifest.
pub type ServiceMap = BTreeMap<String, ServiceDefinition>;

/// Outcome of a deploy call. A failed deploy is a normal, retryable result,
/// not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployOutcome {
    pub success: bool,
    /// Content digest of the deployed build. This is the expected
    /// user-data for all future attestations of this deployment.
    pub digest: Option<String>,
    /// IP address the enclave is reachable at.
    pub ip: Option<String>,
    /// Raw CLI output, preserved verbatim for diagnostics.
    pub raw_output: String,
    pub error: Option<String>,
}

impl DeployOutcome {
    pub fn failed(raw_output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            digest: None,
            ip: None,
            raw_output: raw_output.into(),
            error: Some(error.into()),
        }
    }
}

/// Outcome of an attestation verification. "Attestation did not pass" is an
/// expected branch of the workflow and is reported here, never thrown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationOutcome {
    pub success: bool,
    /// Enclave-bound public key extracted on full success, for subsequent
    /// secure channel setup.
    pub public_key: Option<String>,
    pub pcrs_verified: u32,
    pub pcrs_total: u32,
    /// Raw verifier output, preserved verbatim for diagnostics.
    pub raw_output: String,
    pub error: Option<String>,
}

impl VerificationOutcome {
    pub fn failed(raw_output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            raw_output: raw_output.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// A running deployment owned by a wallet address, as reported by the
/// marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub duration_minutes: u64,
}

/// Blueprint for a single enclave launch. Constructed immediately before a
/// deploy call and discarded after it returns; the wallet credential is
/// never persisted.
#[derive(Clone)]
pub struct DeployRequest {
    pub wallet_private_key: String,
    pub duration_minutes: u64,
    pub compose_path: PathBuf,
    pub arch: Architecture,
}

impl fmt::Debug for DeployRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployRequest")
            .field("wallet_private_key", &"<redacted>")
            .field("duration_minutes", &self.duration_minutes)
            .field("compose_path", &self.compose_path)
            .field("arch", &self.arch)
            .finish()
    }
}
