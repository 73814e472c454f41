// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use thiserror::Error;

/// Named error categories of the toolkit's API contract.
///
/// Precondition errors (`MissingParameter`, `MissingOutputDirectory`,
/// `InvalidPcr`, `InvalidDuration`, `CliNotInstalled`) are raised before any
/// I/O side effect takes place. Transport-level problems are `Network` or
/// `Protocol`. Expected failures such as "attestation did not pass" are not
/// errors at all; they come back as outcome values with `success: false`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("no output directory provided")]
    MissingOutputDirectory,

    #[error("invalid PCR{index} value {value:?}: expected 96 hex characters")]
    InvalidPcr { index: u8, value: String },

    #[error("duration must be a positive number of minutes")]
    InvalidDuration,

    #[error("oyster-cvm CLI is not installed")]
    CliNotInstalled,

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("external tool did not finish within {0:?}")]
    ToolTimeout(Duration),
}
