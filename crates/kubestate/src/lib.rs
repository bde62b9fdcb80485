// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Observe and converge cluster resource state.
//!
//! This crate provides:
//! - A response decoder turning list and watch bodies into resource
//!   documents, with template filtering, view projection and API failure
//!   detection
//! - A trait-based resource accessor with a REST implementation and an
//!   in-memory mock for testing
//! - A bounded condition poller ([`when`])
//! - A convergence orchestrator ([`change_state`]) that races a poller
//!   against the mutation expected to reach the desired state
//!
//! ```no_run
//! use kubestate::{change_state, Action, ChangeState, KubeClient};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> kubestate::KubeResult<()> {
//! let client = KubeClient::from_env()?;
//! let request = ChangeState::builder()
//! 	.state(json!({"kind": "Namespace", "metadata": {"name": "demo"}}))
//! 	.delta(json!({"status": {"phase": "Active"}}))
//! 	.action(Action::create())
//! 	.build()?;
//! let namespace = change_state(Arc::new(client.namespaces()), request).await?;
//! # let _ = namespace;
//! # Ok(())
//! # }
//! ```

mod accessor;
mod condition;
mod converge;
pub mod decoder;
mod error;
pub mod events;
mod http;
pub mod matching;
mod mock;
mod poller;
mod types;

pub use accessor::ResourceAccessor;
pub use condition::{is_truthy, Condition};
pub use converge::{change_state, Action, ChangeState, ChangeStateBuilder, Target};
pub use decoder::{failure_status, is_failure_status, DecodeMode, DecodeOptions, ResourceStream};
pub use error::{KubeError, KubeResult};
pub use http::{HttpResourceClient, KubeClient};
pub use kubestate_config::{BearerToken, ConfigError, KubeConfig};
pub use mock::{ActionCall, MockAccessor};
pub use poller::{
	when, when_cancellable, PollConfig, WhenOptions, DEFAULT_INTERVAL, DEFAULT_TIMES,
};
pub use types::{
	CreateOptions, DeleteOptions, GetOptions, PatchOptions, PatchType, ResourceEventStream,
	ResourceKind,
};
