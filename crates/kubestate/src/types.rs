// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::pin::Pin;

use futures::Stream;
use k8s_openapi::NamespaceResourceScope;
use serde_json::Value;

use crate::decoder::DecodeOptions;
use crate::error::KubeResult;

/// A pinned, possibly unbounded stream of decoded resource documents.
pub type ResourceEventStream = Pin<Box<dyn Stream<Item = KubeResult<Value>> + Send>>;

/// The REST collection an accessor talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKind {
	plural: Cow<'static, str>,
	kind: Cow<'static, str>,
	namespaced: bool,
}

impl ResourceKind {
	pub fn new(
		plural: impl Into<Cow<'static, str>>,
		kind: impl Into<Cow<'static, str>>,
		namespaced: bool,
	) -> Self {
		Self {
			plural: plural.into(),
			kind: kind.into(),
			namespaced,
		}
	}

	/// Derive the collection from a typed resource, e.g.
	/// `ResourceKind::of::<k8s_openapi::api::core::v1::Pod>()`.
	pub fn of<K>() -> Self
	where
		K: k8s_openapi::Resource,
		K::Scope: 'static,
	{
		Self::new(
			K::URL_PATH_SEGMENT,
			K::KIND,
			TypeId::of::<K::Scope>() == TypeId::of::<NamespaceResourceScope>(),
		)
	}

	pub fn pods() -> Self {
		Self::new("pods", "Pod", true)
	}

	pub fn services() -> Self {
		Self::new("services", "Service", true)
	}

	pub fn replication_controllers() -> Self {
		Self::new("replicationcontrollers", "ReplicationController", true)
	}

	pub fn events() -> Self {
		Self::new("events", "Event", true)
	}

	pub fn namespaces() -> Self {
		Self::new("namespaces", "Namespace", false)
	}

	pub fn nodes() -> Self {
		Self::new("nodes", "Node", false)
	}

	/// URL path segment, e.g. `pods`.
	pub fn plural(&self) -> &str {
		&self.plural
	}

	/// Object kind, e.g. `Pod`.
	pub fn kind(&self) -> &str {
		&self.kind
	}

	pub fn is_namespaced(&self) -> bool {
		self.namespaced
	}
}

/// Parameters for a list fetch or a watch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
	/// Scope and filter: its `metadata.namespace` selects the namespace and
	/// the whole template filters returned items.
	pub template: Option<Value>,
	/// Dotted field path projected out of each surviving item.
	pub view: Option<String>,
	/// Label equality selectors sent to the server.
	pub labels: BTreeMap<String, String>,
}

impl GetOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn template(mut self, template: Value) -> Self {
		self.template = Some(template);
		self
	}

	pub fn view(mut self, view: impl Into<String>) -> Self {
		self.view = Some(view.into());
		self
	}

	pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.labels.insert(key.into(), value.into());
		self
	}

	/// `k1=v1,k2=v2`, or `None` when no labels are set.
	pub fn label_selector(&self) -> Option<String> {
		if self.labels.is_empty() {
			return None;
		}
		let parts: Vec<String> = self.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
		Some(parts.join(","))
	}

	pub fn decode_options(&self) -> DecodeOptions {
		DecodeOptions {
			template: self.template.clone(),
			view: self.view.clone(),
		}
	}
}

/// Parameters for creating a resource from a template.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOptions {
	pub template: Value,
	/// Skip the "already exists" precondition.
	pub force: bool,
}

impl CreateOptions {
	pub fn new(template: Value) -> Self {
		Self {
			template,
			force: false,
		}
	}

	pub fn force(mut self, force: bool) -> Self {
		self.force = force;
		self
	}
}

/// Parameters for deleting a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOptions {
	pub template: Value,
	/// Overrides `metadata.name` of the template.
	pub name: Option<String>,
	/// Skip the "must exist" precondition.
	pub force: bool,
}

impl DeleteOptions {
	pub fn new(template: Value) -> Self {
		Self {
			template,
			name: None,
			force: false,
		}
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn force(mut self, force: bool) -> Self {
		self.force = force;
		self
	}
}

/// How a patch document is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
	/// RFC 6902 `add`.
	Add,
	/// RFC 6902 `replace`.
	Replace,
	/// RFC 6902 `remove`.
	Remove,
	/// Strategic merge patch.
	Merge,
}

impl PatchType {
	pub fn content_type(&self) -> &'static str {
		match self {
			PatchType::Merge => "application/strategic-merge-patch+json",
			_ => "application/json-patch+json",
		}
	}

	/// JSON Patch operation name; `None` for merge patches.
	pub fn op(&self) -> Option<&'static str> {
		match self {
			PatchType::Add => Some("add"),
			PatchType::Replace => Some("replace"),
			PatchType::Remove => Some("remove"),
			PatchType::Merge => None,
		}
	}
}

/// Parameters for patching an existing resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOptions {
	pub template: Value,
	pub name: Option<String>,
	/// For JSON Patch types this document must hold exactly one leaf path.
	pub patch: Value,
	pub patch_type: PatchType,
}

impl PatchOptions {
	pub fn new(template: Value, patch: Value, patch_type: PatchType) -> Self {
		Self {
			template,
			name: None,
			patch,
			patch_type,
		}
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
}
