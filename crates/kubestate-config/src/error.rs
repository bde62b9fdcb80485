// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a [`crate::KubeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("no cluster credential found: set {var}, {file_var}, or a user token in the kubeconfig")]
	MissingToken { var: String, file_var: String },

	#[error("cluster credential is empty")]
	EmptyToken,

	#[error("token file path in {var} is empty")]
	EmptyPath { var: String },

	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse kubeconfig at {path}: {source}")]
	Kubeconfig {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("invalid base URL {url:?}: {message}")]
	InvalidBaseUrl { url: String, message: String },

	#[error("invalid value for {var}: {message}")]
	InvalidVar { var: String, message: String },
}
