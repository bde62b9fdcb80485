// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent and credential headers.

use kubestate_config::KubeConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder};
use thiserror::Error;
use tracing::debug;

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum HttpClientError {
	#[error("credential cannot be used as an HTTP header value")]
	InvalidCredential,

	#[error("failed to build HTTP client: {0}")]
	Build(#[from] reqwest::Error),
}

/// Creates a client builder with the standard kubestate User-Agent.
///
/// No request timeout is set here: watch connections are unbounded, so
/// timeouts are applied per request by the caller.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a client that sends the configured bearer token and asks for
/// JSON on every request.
pub fn new_client(config: &KubeConfig) -> Result<Client, HttpClientError> {
	let mut auth = HeaderValue::from_str(&config.token().header_value())
		.map_err(|_| HttpClientError::InvalidCredential)?;
	auth.set_sensitive(true);

	let mut headers = HeaderMap::new();
	headers.insert(AUTHORIZATION, auth);
	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

	let client = builder().default_headers(headers).build()?;
	debug!(base_url = %config.base_url(), "HTTP client initialized");
	Ok(client)
}

/// Returns the standard User-Agent string.
///
/// Format: `kubestate/{version}`
pub fn user_agent() -> String {
	format!("kubestate/{}", env!("CARGO_PKG_VERSION"))
}
