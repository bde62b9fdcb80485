// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use crate::env::{load_token_var, var_or, ProcessEnv, VarSource};
use crate::error::{ConfigError, ConfigResult};
use crate::kubeconfig;
use crate::token::BearerToken;

pub const BASE_URL_VAR: &str = "KUBESTATE_BASE_URL";
pub const TOKEN_VAR: &str = "KUBESTATE_TOKEN";
pub const PROTOCOL_VAR: &str = "KUBESTATE_PROTOCOL";
pub const HOST_VAR: &str = "KUBESTATE_HOST";
pub const PORT_VAR: &str = "KUBESTATE_PORT";
pub const API_VERSION_VAR: &str = "KUBESTATE_API_VERSION";
pub const TIMEOUT_VAR: &str = "KUBESTATE_REQUEST_TIMEOUT_SECS";

const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_API_VERSION: &str = "v1";

/// Connection settings for one cluster API.
///
/// Built once and handed to every client constructor; nothing downstream
/// reads the environment.
#[derive(Debug, Clone)]
pub struct KubeConfig {
	base_url: Url,
	token: BearerToken,
	request_timeout: Option<Duration>,
}

impl KubeConfig {
	/// Build a config from an explicit base URL and credential.
	///
	/// The URL must be absolute http(s); a trailing `/` is added so that
	/// relative joins append path segments instead of replacing the last one.
	pub fn new(base_url: &str, token: impl Into<BearerToken>) -> ConfigResult<Self> {
		let token = token.into();
		if token.is_empty() {
			return Err(ConfigError::EmptyToken);
		}
		Ok(Self {
			base_url: parse_base_url(base_url)?,
			token,
			request_timeout: None,
		})
	}

	/// Load from the process environment, falling back to the kubeconfig
	/// for the credential.
	pub fn from_env() -> ConfigResult<Self> {
		Self::from_source(&ProcessEnv, kubeconfig::default_path(&ProcessEnv))
	}

	/// Load from an arbitrary variable source.
	///
	/// Credential precedence: `KUBESTATE_TOKEN_FILE`, `KUBESTATE_TOKEN`, then
	/// the first user token in `kubeconfig_path`. A missing credential is an
	/// error.
	pub fn from_source(
		source: &impl VarSource,
		kubeconfig_path: Option<PathBuf>,
	) -> ConfigResult<Self> {
		let base_url = match source.var(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
			Some(url) => url,
			None => default_base_url(source),
		};

		let token = match load_token_var(source, TOKEN_VAR)? {
			Some(token) => token,
			None => {
				let from_file = match &kubeconfig_path {
					Some(path) => kubeconfig::first_user_token(path)?,
					None => None,
				};
				from_file.ok_or_else(|| ConfigError::MissingToken {
					var: TOKEN_VAR.to_string(),
					file_var: format!("{TOKEN_VAR}_FILE"),
				})?
			}
		};

		let mut config = Self::new(&base_url, token)?;
		if let Some(raw) = source.var(TIMEOUT_VAR) {
			let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
				var: TIMEOUT_VAR.to_string(),
				message: format!("expected whole seconds, got {raw:?}"),
			})?;
			config = config.with_request_timeout(Duration::from_secs(secs));
		}

		debug!(base_url = %config.base_url, token = %config.token, "loaded cluster config");
		Ok(config)
	}

	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);
		self
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub fn token(&self) -> &BearerToken {
		&self.token
	}

	pub fn request_timeout(&self) -> Option<Duration> {
		self.request_timeout
	}
}

fn default_base_url(source: &impl VarSource) -> String {
	format!(
		"{}://{}:{}/api/{}/",
		var_or(source, PROTOCOL_VAR, DEFAULT_PROTOCOL),
		var_or(source, HOST_VAR, DEFAULT_HOST),
		var_or(source, PORT_VAR, DEFAULT_PORT),
		var_or(source, API_VERSION_VAR, DEFAULT_API_VERSION),
	)
}

fn parse_base_url(raw: &str) -> ConfigResult<Url> {
	let invalid = |message: String| ConfigError::InvalidBaseUrl {
		url: raw.to_string(),
		message,
	};

	let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(invalid(format!("unsupported scheme {}", url.scheme())));
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());
		url.set_path(&path);
	}
	Ok(url)
}
