// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cluster configuration for kubestate.
//!
//! This crate provides:
//!
//! - [`KubeConfig`]: the immutable connection settings every client is built
//!   from (base URL, credential, timeout)
//! - [`BearerToken`]: a credential wrapper with redacted formatting
//! - Environment and kubeconfig loading that fails fast when no credential
//!   can be found

mod config;
pub mod env;
mod error;
pub mod kubeconfig;
mod token;

pub use config::{
	KubeConfig, API_VERSION_VAR, BASE_URL_VAR, HOST_VAR, PORT_VAR, PROTOCOL_VAR, TIMEOUT_VAR,
	TOKEN_VAR,
};
pub use env::{ProcessEnv, VarSource};
pub use error::{ConfigError, ConfigResult};
pub use token::{BearerToken, REDACTED};
