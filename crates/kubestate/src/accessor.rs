// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use serde_json::Value;

use crate::error::KubeError;
use crate::matching::assign;
use crate::types::{
	CreateOptions, DeleteOptions, GetOptions, PatchOptions, ResourceEventStream,
};

/// Operations over one resource collection.
///
/// The poller and the convergence orchestrator only depend on this trait,
/// so tests can drive them with [`crate::MockAccessor`] instead of a cluster.
#[async_trait]
pub trait ResourceAccessor: Send + Sync {
	/// Fetch the current collection, filtered and projected per `opts`.
	async fn get(&self, opts: &GetOptions) -> Result<Vec<Value>, KubeError>;

	/// Create a resource from a template.
	async fn create(&self, opts: &CreateOptions) -> Result<Value, KubeError>;

	/// Delete the resource named by the template (or `opts.name`).
	async fn delete(&self, opts: &DeleteOptions) -> Result<Value, KubeError>;

	/// Patch an existing resource.
	async fn patch(&self, opts: &PatchOptions) -> Result<Value, KubeError>;

	/// Open an unbounded stream of change events.
	async fn watch(&self, opts: &GetOptions) -> Result<ResourceEventStream, KubeError>;

	/// Replace `old` with `old` shallowly overlaid by `delta`: delete, then
	/// create.
	async fn update(&self, old: &Value, delta: &Value) -> Result<Value, KubeError> {
		self.delete(&DeleteOptions::new(old.clone())).await?;
		self.create(&CreateOptions::new(assign(old, delta))).await
	}
}
