// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment lookups for cluster configuration.
//!
//! Lookups go through a [`VarSource`] so that loading can be exercised
//! without mutating the process environment. [`ProcessEnv`] is the
//! production source.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::token::BearerToken;

/// A source of configuration variables.
pub trait VarSource {
	fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
	fn var(&self, name: &str) -> Option<String> {
		std::env::var(name).ok()
	}
}

impl VarSource for HashMap<String, String> {
	fn var(&self, name: &str) -> Option<String> {
		self.get(name).cloned()
	}
}

/// Load a token using the `VAR` / `VAR_FILE` convention.
///
/// `{var}_FILE` wins over `{var}`. When read from a file a single trailing
/// newline is stripped. Returns `Ok(None)` when neither is set.
pub fn load_token_var(source: &impl VarSource, var: &str) -> ConfigResult<Option<BearerToken>> {
	let file_var = format!("{var}_FILE");

	if let Some(path_str) = source.var(&file_var) {
		if path_str.is_empty() {
			return Err(ConfigError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
			path: path.clone(),
			source: e,
		})?;

		let token = content.strip_suffix('\n').unwrap_or(&content);
		return Ok(Some(BearerToken::new(token)));
	}

	Ok(source.var(var).map(BearerToken::new))
}

/// Read `var`, falling back to `default` when unset or blank.
pub fn var_or(source: &impl VarSource, var: &str, default: &str) -> String {
	source
		.var(var)
		.filter(|v| !v.trim().is_empty())
		.unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn returns_none_when_not_set() {
		let source = vars(&[]);
		assert!(load_token_var(&source, "KUBESTATE_TOKEN").unwrap().is_none());
	}

	#[test]
	fn reads_direct_value() {
		let source = vars(&[("KUBESTATE_TOKEN", "direct-token")]);
		let token = load_token_var(&source, "KUBESTATE_TOKEN").unwrap().unwrap();
		assert_eq!(token.expose(), "direct-token");
	}

	#[test]
	fn file_var_takes_precedence_and_strips_newline() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "file-token").unwrap();
		let path = file.path().to_str().unwrap().to_string();

		let source = vars(&[
			("KUBESTATE_TOKEN", "direct-token"),
			("KUBESTATE_TOKEN_FILE", path.as_str()),
		]);
		let token = load_token_var(&source, "KUBESTATE_TOKEN").unwrap().unwrap();
		assert_eq!(token.expose(), "file-token");
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let source = vars(&[("KUBESTATE_TOKEN_FILE", "")]);
		let err = load_token_var(&source, "KUBESTATE_TOKEN").unwrap_err();
		assert!(matches!(err, ConfigError::EmptyPath { .. }));
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let source = vars(&[("KUBESTATE_TOKEN_FILE", "/nonexistent/kubestate/token")]);
		let err = load_token_var(&source, "KUBESTATE_TOKEN").unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}

	#[test]
	fn var_or_ignores_blank_values() {
		let source = vars(&[("KUBESTATE_HOST", "  ")]);
		assert_eq!(var_or(&source, "KUBESTATE_HOST", "localhost"), "localhost");
		let source = vars(&[("KUBESTATE_HOST", "10.0.0.1")]);
		assert_eq!(var_or(&source, "KUBESTATE_HOST", "localhost"), "10.0.0.1");
	}
}
