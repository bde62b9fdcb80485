// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for kubestate.
//!
//! This crate provides a pre-configured HTTP client carrying a consistent
//! User-Agent and the cluster credential.

mod client;

pub use client::{builder, new_client, user_agent, HttpClientError};
