// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use kubestate_common_http::HttpClientError;
use kubestate_config::ConfigError;
use thiserror::Error;

/// Result type alias for resource operations.
pub type KubeResult<T> = Result<T, KubeError>;

/// Errors that can occur while reading, mutating or converging resources.
#[derive(Error, Debug)]
pub enum KubeError {
	/// A response record was not valid JSON. Ends the current sequence.
	#[error("failed to decode response record: {message}")]
	Decode { message: String },

	/// The API answered with a `kind: Status, status: Failure` document.
	#[error("API failure: {message}")]
	ApiFailure {
		message: String,
		reason: Option<String>,
		code: Option<i32>,
	},

	/// The poller ran out of attempts before the condition held.
	#[error("condition not met after {attempts} attempts")]
	ConditionTimeout { attempts: u32 },

	/// The request never produced a response, or the body stream broke.
	#[error("transport error: {message}")]
	Transport { message: String },

	/// Non-success status whose body is not a Status document.
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },

	/// Missing or conflicting arguments, detected before any I/O.
	#[error("invalid arguments: {message}")]
	Contract { message: String },

	#[error("invalid resource template: {message}")]
	InvalidTemplate { message: String },

	#[error("resource already exists: {name}")]
	AlreadyExists { name: String },

	#[error("resource does not exist: {name}")]
	NotFound { name: String },

	#[error("operation cancelled")]
	Cancelled,

	/// A spawned race participant panicked or was aborted unexpectedly.
	#[error("background task failed: {message}")]
	TaskFailed { message: String },

	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Client(#[from] HttpClientError),
}

impl KubeError {
	pub(crate) fn contract(message: impl Into<String>) -> Self {
		KubeError::Contract {
			message: message.into(),
		}
	}

	pub(crate) fn invalid_template(message: impl Into<String>) -> Self {
		KubeError::InvalidTemplate {
			message: message.into(),
		}
	}
}

impl From<reqwest::Error> for KubeError {
	fn from(err: reqwest::Error) -> Self {
		KubeError::Transport {
			message: err.to_string(),
		}
	}
}

impl From<serde_json::Error> for KubeError {
	fn from(err: serde_json::Error) -> Self {
		KubeError::Decode {
			message: err.to_string(),
		}
	}
}
