// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cvm_attest::{
    fetch_attestation_doc, install_root_ca, verify_with_binary, verify_with_cli, BinaryVerifyArgs,
};
use cvm_config::{generate_agent_app, generate_config, ConfigOverrides, ScaffoldOptions};
use cvm_deploy::{write_manifest, OysterCli, OYSTER_CVM_PROGRAM};
use cvm_types::process::SystemRunner;
use cvm_types::{
    Architecture, DeployRequest, ServiceDefinition, ServiceMap, DEFAULT_ATTESTATION_PORT,
};
use fs_err as fs;

/// Oyster CVM deployment and attestation utility
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the external oyster-cvm CLI
    #[arg(long, default_value = OYSTER_CVM_PROGRAM, global = true)]
    cli_path: PathBuf,

    /// Timeout in seconds for external tool invocations
    #[arg(long, default_value_t = 600, global = true)]
    tool_timeout: u64,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the external oyster-cvm CLI is installed
    Doctor,
    /// Generate the enclave config bundle (Dockerfile, setup.sh, supervisord.conf)
    InitConfig(InitConfigArgs),
    /// Generate a compose manifest for a single workload service
    Manifest(ManifestArgs),
    /// Deploy an enclave to the marketplace
    Deploy(DeployArgs),
    /// List running deployments owned by a wallet address
    List(ListArgs),
    /// Stop a running deployment
    Stop(StopArgs),
    /// Fetch the raw attestation document from an enclave
    Attestation(AttestationArgs),
    /// Verify an enclave via the external CLI and a named PCR preset
    Verify(VerifyArgs),
    /// Verify an enclave via the standalone verifier binary and explicit PCRs
    VerifyRaw(VerifyRawArgs),
    /// Write the AWS Nitro Enclaves root certificate to disk
    InstallRootCa(InstallRootCaArgs),
    /// Scaffold a runnable agent application
    Scaffold(ScaffoldArgs),
}

#[derive(Parser)]
struct InitConfigArgs {
    /// directory to write the bundle to
    #[arg(short, long)]
    output: PathBuf,
    /// file overriding the default Dockerfile
    #[arg(long)]
    dockerfile: Option<PathBuf>,
    /// file overriding the default init script
    #[arg(long)]
    setup_script: Option<PathBuf>,
    /// file overriding the default supervisor spec
    #[arg(long)]
    supervisord: Option<PathBuf>,
}

#[derive(Parser)]
struct ManifestArgs {
    /// service name
    #[arg(long, default_value = "agent")]
    name: String,
    /// image reference to deploy
    #[arg(long)]
    image: String,
    /// path to write the manifest to
    #[arg(short, long, default_value = "docker-compose.yml")]
    output: PathBuf,
}

#[derive(Parser)]
struct DeployArgs {
    /// wallet private key paying for enclave runtime (never persisted)
    #[arg(long)]
    wallet_private_key: String,
    /// how long to fund the enclave for
    #[arg(long)]
    duration_in_minutes: u64,
    /// compose manifest describing the workload
    #[arg(long, default_value = "docker-compose.yml")]
    docker_compose: PathBuf,
    /// target architecture
    #[arg(long, default_value_t = Architecture::Arm64)]
    arch: Architecture,
}

#[derive(Parser)]
struct ListArgs {
    /// wallet address owning the deployments
    #[arg(long)]
    address: String,
}

#[derive(Parser)]
struct StopArgs {
    /// marketplace job id
    #[arg(long)]
    job_id: String,
}

#[derive(Parser)]
struct AttestationArgs {
    /// enclave IP address
    #[arg(long)]
    enclave_ip: String,
    /// attestation server port
    #[arg(long, default_value_t = DEFAULT_ATTESTATION_PORT)]
    port: u16,
    /// write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct VerifyArgs {
    /// enclave IP address
    #[arg(long)]
    enclave_ip: String,
    /// expected user-data digest from the deploy
    #[arg(long)]
    user_data: String,
    /// named PCR preset identifying the expected image build
    #[arg(long)]
    pcr_preset: String,
}

#[derive(Parser)]
struct VerifyRawArgs {
    /// enclave IP address
    #[arg(long)]
    enclave_ip: String,
    /// expected PCR0 (96 hex chars)
    #[arg(long)]
    pcr0: String,
    /// expected PCR1 (96 hex chars)
    #[arg(long)]
    pcr1: String,
    /// expected PCR2 (96 hex chars)
    #[arg(long)]
    pcr2: String,
    /// path to the standalone verifier binary
    #[arg(long)]
    verifier_path: PathBuf,
    /// where to write the extracted enclave public key
    #[arg(long, default_value = "enclave_key.pub")]
    public: PathBuf,
    /// maximum acceptable attestation age in seconds
    #[arg(long, default_value_t = 300)]
    max_age: u64,
}

#[derive(Parser)]
struct InstallRootCaArgs {
    /// path to write the certificate to
    #[arg(short, long)]
    output: PathBuf,
    /// install this PEM instead of the embedded anchor
    #[arg(long)]
    pem: Option<PathBuf>,
}

#[derive(Parser)]
struct ScaffoldArgs {
    /// directory to scaffold into
    #[arg(short, long)]
    output: PathBuf,
    /// port the generated server listens on
    #[arg(long)]
    port: Option<u16>,
    /// package name of the generated app
    #[arg(long)]
    package_name: Option<String>,
    /// custom template tree to copy instead of the embedded one
    #[arg(long)]
    template_dir: Option<PathBuf>,
}

fn read_override(path: &Option<PathBuf>) -> Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read override {}", path.display()))?,
        )),
        None => Ok(None),
    }
}

fn cmd_init_config(args: InitConfigArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        dockerfile: read_override(&args.dockerfile)?,
        setup_script: read_override(&args.setup_script)?,
        supervisor_conf: read_override(&args.supervisord)?,
    };
    let written = generate_config(&overrides, Some(&args.output))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_manifest(args: ManifestArgs) -> Result<()> {
    let mut services = ServiceMap::new();
    services.insert(
        args.name,
        ServiceDefinition {
            image: args.image,
            ..Default::default()
        },
    );
    write_manifest(&services, &args.output)?;
    println!("{}", args.output.display());
    Ok(())
}

async fn cmd_deploy(args: DeployArgs, cli_path: &Path, runner: &SystemRunner) -> Result<()> {
    let oyster = OysterCli::with_program(runner, cli_path);
    if !oyster.is_installed().await {
        bail!(
            "{} is not installed; install it before deploying",
            cli_path.display()
        );
    }
    let request = DeployRequest {
        wallet_private_key: args.wallet_private_key,
        duration_minutes: args.duration_in_minutes,
        compose_path: args.docker_compose,
        arch: args.arch,
    };
    let outcome = oyster.deploy(&request).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.success {
        bail!("deploy failed");
    }
    Ok(())
}

async fn cmd_attestation(args: AttestationArgs) -> Result<()> {
    let doc = fetch_attestation_doc(&args.enclave_ip, Some(args.port)).await?;
    match args.output {
        Some(path) => {
            fs::write(&path, &doc)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {} bytes to {}", doc.len(), path.display());
        }
        None => {
            std::io::stdout()
                .write_all(&doc)
                .context("failed to write attestation document")?;
        }
    }
    Ok(())
}

async fn cmd_verify(args: VerifyArgs, cli_path: &Path, runner: &SystemRunner) -> Result<()> {
    let outcome = verify_with_cli(
        runner,
        cli_path,
        &args.enclave_ip,
        &args.user_data,
        &args.pcr_preset,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.success {
        bail!("attestation verification failed");
    }
    Ok(())
}

async fn cmd_verify_raw(args: VerifyRawArgs, runner: &SystemRunner) -> Result<()> {
    let verify_args = BinaryVerifyArgs {
        enclave_ip: Some(args.enclave_ip),
        pcr0: Some(args.pcr0),
        pcr1: Some(args.pcr1),
        pcr2: Some(args.pcr2),
        verifier_path: Some(args.verifier_path),
        output_key_path: args.public,
        max_age_secs: args.max_age,
    };
    let outcome = verify_with_binary(runner, &verify_args).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.success {
        bail!("attestation verification failed");
    }
    Ok(())
}

fn cmd_install_root_ca(args: InstallRootCaArgs) -> Result<()> {
    match &args.pem {
        Some(pem_path) => {
            // Anchor rotation: install a caller-supplied certificate
            let pem = fs::read_to_string(pem_path)
                .with_context(|| format!("failed to read {}", pem_path.display()))?;
            fs::write(&args.output, pem)
                .with_context(|| format!("failed to write {}", args.output.display()))?;
        }
        None => install_root_ca(&args.output)?,
    }
    println!("{}", args.output.display());
    Ok(())
}

fn cmd_scaffold(args: ScaffoldArgs) -> Result<()> {
    let options = ScaffoldOptions {
        port: args.port,
        package_name: args.package_name,
        template_dir: args.template_dir,
    };
    let out = generate_agent_app(Some(&args.output), &options)?;
    println!("{}", out.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    {
        use tracing_subscriber::{fmt, EnvFilter};
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();
    let cli_path = cli.cli_path.clone();
    let runner = SystemRunner::new(Duration::from_secs(cli.tool_timeout));

    match cli.command {
        Commands::Doctor => {
            let oyster = OysterCli::with_program(&runner, &cli_path);
            if oyster.is_installed().await {
                println!("{} is installed", cli_path.display());
            } else {
                bail!("{} is not installed", cli_path.display());
            }
        }
        Commands::InitConfig(args) => cmd_init_config(args)?,
        Commands::Manifest(args) => cmd_manifest(args)?,
        Commands::Deploy(args) => cmd_deploy(args, &cli_path, &runner).await?,
        Commands::List(args) => {
            let oyster = OysterCli::with_program(&runner, &cli_path);
            let jobs = oyster.list_jobs(&args.address).await?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
        Commands::Stop(args) => {
            let oyster = OysterCli::with_program(&runner, &cli_path);
            let outcome = oyster.stop_job(&args.job_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                bail!("stop failed");
            }
        }
        Commands::Attestation(args) => cmd_attestation(args).await?,
        Commands::Verify(args) => cmd_verify(args, &cli_path, &runner).await?,
        Commands::VerifyRaw(args) => cmd_verify_raw(args, &runner).await?,
        Commands::InstallRootCa(args) => cmd_install_root_ca(args)?,
        Commands::Scaffold(args) => cmd_scaffold(args)?,
    }

    Ok(())
}
