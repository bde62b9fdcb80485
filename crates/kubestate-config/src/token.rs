// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bearer credential for the cluster API.
//!
//! [`BearerToken`] never prints its value: `Debug` and `Display` are redacted
//! so a token can sit inside a logged [`crate::KubeConfig`] without leaking.
//! The backing memory is zeroized on drop. Call sites that need the raw value
//! (building the `Authorization` header) must call [`BearerToken::expose`].

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder printed instead of the token value.
pub const REDACTED: &str = "[REDACTED]";

/// A service-account or user token presented as `Authorization: Bearer`.
#[derive(Zeroize, ZeroizeOnDrop, Clone, PartialEq, Eq)]
pub struct BearerToken {
	inner: String,
}

impl BearerToken {
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			inner: token.into(),
		}
	}

	/// Access the raw token.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.trim().is_empty()
	}

	/// Render the `Authorization` header value.
	pub fn header_value(&self) -> String {
		format!("Bearer {}", self.inner)
	}
}

impl fmt::Debug for BearerToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("BearerToken").field(&REDACTED).finish()
	}
}

impl fmt::Display for BearerToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for BearerToken {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for BearerToken {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
