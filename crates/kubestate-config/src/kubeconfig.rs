// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Minimal kubeconfig reader.
//!
//! Only the user credentials are read; clusters and contexts are ignored.
//! The token of the first listed user is used, either inline (`token`) or
//! from `tokenFile`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::env::VarSource;
use crate::error::{ConfigError, ConfigResult};
use crate::token::BearerToken;

#[derive(Debug, Default, Deserialize)]
struct Kubeconfig {
	#[serde(default)]
	users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
	#[serde(default)]
	user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserEntry {
	token: Option<String>,
	token_file: Option<PathBuf>,
}

/// Resolve the kubeconfig path: first entry of `$KUBECONFIG`, else
/// `~/.kube/config`.
pub fn default_path(source: &impl VarSource) -> Option<PathBuf> {
	if let Some(list) = source.var("KUBECONFIG") {
		let sep = if cfg!(windows) { ';' } else { ':' };
		if let Some(first) = list.split(sep).find(|p| !p.is_empty()) {
			return Some(PathBuf::from(first));
		}
	}
	dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

/// Read the first user's token from the kubeconfig at `path`.
///
/// A missing file is not an error; an unparsable one is.
pub fn first_user_token(path: &Path) -> ConfigResult<Option<BearerToken>> {
	let doc = match fs::read_to_string(path) {
		Ok(doc) => doc,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			debug!(path = %path.display(), "kubeconfig not found");
			return Ok(None);
		}
		Err(e) => {
			return Err(ConfigError::Io {
				path: path.to_path_buf(),
				source: e,
			})
		}
	};

	let config: Kubeconfig = serde_yaml::from_str(&doc).map_err(|e| ConfigError::Kubeconfig {
		path: path.to_path_buf(),
		source: e,
	})?;

	let Some(user) = config.users.into_iter().next().map(|u| u.user) else {
		return Ok(None);
	};

	if let Some(token) = user.token.filter(|t| !t.trim().is_empty()) {
		return Ok(Some(BearerToken::new(token)));
	}

	if let Some(token_file) = user.token_file {
		let content = fs::read_to_string(&token_file).map_err(|e| ConfigError::Io {
			path: token_file.clone(),
			source: e,
		})?;
		return Ok(Some(BearerToken::new(content.trim_end())));
	}

	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn write_config(contents: &str) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn reads_inline_token_of_first_user() {
		let file = write_config(
			r#"
apiVersion: v1
kind: Config
users:
  - name: admin
    user:
      token: first-token
  - name: other
    user:
      token: second-token
"#,
		);
		let token = first_user_token(file.path()).unwrap().unwrap();
		assert_eq!(token.expose(), "first-token");
	}

	#[test]
	fn reads_token_file_reference() {
		let mut token_file = NamedTempFile::new().unwrap();
		writeln!(token_file, "from-file").unwrap();
		let file = write_config(&format!(
			"users:\n  - name: sa\n    user:\n      tokenFile: {}\n",
			token_file.path().display()
		));
		let token = first_user_token(file.path()).unwrap().unwrap();
		assert_eq!(token.expose(), "from-file");
	}

	#[test]
	fn user_without_token_yields_none() {
		let file = write_config("users:\n  - name: cert\n    user:\n      client-certificate: /x\n");
		assert!(first_user_token(file.path()).unwrap().is_none());
	}

	#[test]
	fn missing_file_yields_none() {
		let path = Path::new("/nonexistent/kubestate/kubeconfig");
		assert!(first_user_token(path).unwrap().is_none());
	}

	#[test]
	fn malformed_yaml_is_an_error() {
		let file = write_config("users: [: not yaml");
		let err = first_user_token(file.path()).unwrap_err();
		assert!(matches!(err, ConfigError::Kubeconfig { .. }));
	}

	#[test]
	fn kubeconfig_env_var_wins_over_home() {
		let mut vars = HashMap::new();
		vars.insert("KUBECONFIG".to_string(), "/etc/kube/a:/etc/kube/b".to_string());
		assert_eq!(default_path(&vars), Some(PathBuf::from("/etc/kube/a")));
	}
}
