// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Built-in default templates, embedded verbatim from `templates/`.

/// Default enclave image build spec.
pub const DEFAULT_DOCKERFILE: &str = include_str!("../templates/Dockerfile");

/// Default init script. Responsibilities: bring up loopback networking,
/// install the NAT redirect funneling outbound traffic through the
/// enclave's transparent proxy, generate a fresh identity keypair for this
/// enclave instance, then hand off to the process supervisor.
pub const DEFAULT_SETUP_SCRIPT: &str = include_str!("../templates/setup.sh");

/// Default process supervisor spec: attestation server and its outward
/// proxy, transparent outbound proxy, DoH resolver, the workload, and the
/// workload's outward proxy, all auto-restarting.
pub const DEFAULT_SUPERVISOR_CONF: &str = include_str!("../templates/supervisord.conf");

/// Agent application skeleton.
pub const AGENT_APP_SERVER: &str = include_str!("../templates/agent-app/index.js");
pub const AGENT_APP_MANIFEST: &str = include_str!("../templates/agent-app/package.json");

/// Package name baked into the skeleton manifest, rewritten on scaffold.
pub const AGENT_APP_DEFAULT_NAME: &str = "agent-app";
