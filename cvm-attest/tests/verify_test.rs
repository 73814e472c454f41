// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cvm_attest::{verify_with_binary, verify_with_cli, BinaryVerifyArgs, CLI_SUCCESS_MARKER};
use cvm_types::process::{ToolOutput, ToolRunner};
use cvm_types::Error;

/// Fake tool runner that records every would-be subprocess spawn.
struct FakeRunner {
    invocations: Mutex<Vec<(PathBuf, Vec<String>)>>,
    status: Option<i32>,
    stdout: String,
    stderr: String,
    /// Simulate a spawn failure (e.g. binary not found).
    spawn_error: bool,
    /// File the fake "verifier" writes on invocation, like the real one.
    write_key: Option<(PathBuf, String)>,
}

impl FakeRunner {
    fn new(status: Option<i32>, stdout: &str, stderr: &str) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            spawn_error: false,
            write_key: None,
        }
    }

    fn spawn_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput> {
        self.invocations
            .lock()
            .unwrap()
            .push((program.to_path_buf(), args.to_vec()));
        if self.spawn_error {
            return Err(anyhow!("No such file or directory"));
        }
        if let Some((path, contents)) = &self.write_key {
            std::fs::write(path, contents).unwrap();
        }
        Ok(ToolOutput {
            status: self.status,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        })
    }
}

const CLI: &str = "oyster-cvm";

fn valid_pcr(ch: char) -> String {
    ch.to_string().repeat(96)
}

fn binary_args(key_path: &Path) -> BinaryVerifyArgs {
    BinaryVerifyArgs {
        enclave_ip: Some("192.0.2.7".to_string()),
        pcr0: Some(valid_pcr('a')),
        pcr1: Some(valid_pcr('b')),
        pcr2: Some(valid_pcr('c')),
        verifier_path: Some(PathBuf::from("/opt/oyster/verifier")),
        output_key_path: key_path.to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
async fn cli_verify_succeeds_on_marker() {
    let runner = FakeRunner::new(Some(0), &format!("...\n{CLI_SUCCESS_MARKER}\n"), "");
    let outcome = verify_with_cli(&runner, Path::new(CLI), "192.0.2.7", "ab12", "base/blue/v1.0.0/arm64")
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(runner.spawn_count(), 1);

    // The CLI grammar must be preserved exactly
    let invocations = runner.invocations.lock().unwrap();
    let (program, args) = &invocations[0];
    assert_eq!(program, Path::new(CLI));
    assert_eq!(
        args,
        &[
            "verify",
            "--enclave-ip",
            "192.0.2.7",
            "--user-data",
            "ab12",
            "--pcr-preset",
            "base/blue/v1.0.0/arm64",
        ]
    );
}

#[tokio::test]
async fn cli_verify_fails_without_marker_and_keeps_raw_output() {
    let runner = FakeRunner::new(Some(0), "PCR mismatch on pcr1\n", "");
    let outcome = verify_with_cli(&runner, Path::new(CLI), "192.0.2.7", "ab12", "preset")
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.raw_output.contains("PCR mismatch on pcr1"));
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn cli_verify_fails_on_nonzero_exit_and_keeps_stderr() {
    let runner = FakeRunner::new(Some(2), "", "connection refused\n");
    let outcome = verify_with_cli(&runner, Path::new(CLI), "192.0.2.7", "ab12", "preset")
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.raw_output.contains("connection refused"));
}

#[tokio::test]
async fn cli_verify_reports_spawn_failure_as_outcome() {
    let mut runner = FakeRunner::new(Some(0), "", "");
    runner.spawn_error = true;
    let outcome = verify_with_cli(&runner, Path::new(CLI), "192.0.2.7", "ab12", "preset")
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("No such file"));
}

#[tokio::test]
async fn binary_verify_rejects_missing_parameters_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let base = binary_args(&dir.path().join("key.pub"));
    let cases: Vec<(&str, BinaryVerifyArgs)> = vec![
        ("enclave_ip", BinaryVerifyArgs { enclave_ip: None, ..base.clone() }),
        ("pcr0", BinaryVerifyArgs { pcr0: None, ..base.clone() }),
        ("pcr1", BinaryVerifyArgs { pcr1: None, ..base.clone() }),
        ("pcr2", BinaryVerifyArgs { pcr2: None, ..base.clone() }),
        ("verifier_path", BinaryVerifyArgs { verifier_path: None, ..base.clone() }),
    ];

    for (name, args) in cases {
        let runner = FakeRunner::new(Some(0), "", "");
        let err = verify_with_binary(&runner, &args).await.unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::MissingParameter(param)) => assert_eq!(*param, name),
            other => panic!("expected MissingParameter for {name}, got {other:?}"),
        }
        assert_eq!(runner.spawn_count(), 0, "spawned a process for missing {name}");
    }
}

#[tokio::test]
async fn binary_verify_rejects_malformed_pcr_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let mut args = binary_args(&dir.path().join("key.pub"));
    args.pcr1 = Some("g".repeat(96));

    let runner = FakeRunner::new(Some(0), "", "");
    let err = verify_with_binary(&runner, &args).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidPcr { index: 1, .. })
    ));
    assert_eq!(runner.spawn_count(), 0);
}

#[tokio::test]
async fn binary_verify_extracts_public_key_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("key.pub");
    let args = binary_args(&key_path);

    let mut runner = FakeRunner::new(
        Some(0),
        "pcr0 verified\npcr1 verified\npcr2 verified\n",
        "",
    );
    runner.write_key = Some((key_path.clone(), "04deadbeef\n".to_string()));

    let outcome = verify_with_binary(&runner, &args).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.public_key.as_deref(), Some("04deadbeef"));
    assert_eq!(outcome.pcrs_verified, 3);
    assert_eq!(outcome.pcrs_total, 3);

    // Endpoint and flag grammar of the standalone verifier
    let invocations = runner.invocations.lock().unwrap();
    let (program, tool_args) = &invocations[0];
    assert_eq!(program, Path::new("/opt/oyster/verifier"));
    assert_eq!(tool_args[0], "--endpoint");
    assert_eq!(tool_args[1], "http://192.0.2.7:1300/attestation/raw");
    assert!(tool_args.contains(&"--max-age".to_string()));
    assert!(tool_args.contains(&"300".to_string()));
}

#[tokio::test]
async fn binary_verify_reports_pcr_mismatch_as_failed_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let args = binary_args(&dir.path().join("key.pub"));

    let runner = FakeRunner::new(
        Some(1),
        "pcr0 verified\npcr1 verified\npcr2 mismatch\n",
        "attestation verification failed\n",
    );
    let outcome = verify_with_binary(&runner, &args).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.pcrs_verified, 2);
    assert_eq!(outcome.pcrs_total, 3);
    assert!(outcome.raw_output.contains("attestation verification failed"));
    assert!(outcome.public_key.is_none());
}
