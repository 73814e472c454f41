// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use anyhow::{Context, Result};
use cvm_types::{Error, ATTESTATION_DOC_PATH, DEFAULT_ATTESTATION_PORT};
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the raw attestation document from a running enclave.
///
/// The document is regenerated continuously by the enclave's attestation
/// service; callers should fetch a fresh one per verification and never
/// cache it. An unreachable endpoint or non-success status is a
/// recoverable [`Error::Network`] (the enclave may still be booting); a
/// truncated body is [`Error::Protocol`].
pub async fn fetch_attestation_doc(enclave_ip: &str, port: Option<u16>) -> Result<Vec<u8>> {
    let port = port.unwrap_or(DEFAULT_ATTESTATION_PORT);
    let url = format!("http://{enclave_ip}:{port}{ATTESTATION_DOC_PATH}");
    debug!("fetching attestation document from {url}");

    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Network(format!("failed to reach {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Network(format!(
            "attestation endpoint {url} returned status {status}"
        ))
        .into());
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Protocol(format!("failed to read attestation document: {e}")))?;
    if body.is_empty() {
        return Err(Error::Protocol("empty attestation document".to_string()).into());
    }
    Ok(body.to_vec())
}
