// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! REST implementation of [`ResourceAccessor`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use kubestate_common_http::new_client;
use kubestate_config::KubeConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::accessor::ResourceAccessor;
use crate::decoder::{failure_status, DecodeOptions, ResourceStream};
use crate::error::{KubeError, KubeResult};
use crate::matching::{leaf_paths, str_at};
use crate::types::{
	CreateOptions, DeleteOptions, GetOptions, PatchOptions, PatchType, ResourceEventStream,
	ResourceKind,
};

/// Entry point: one configured HTTP client shared by per-kind accessors.
#[derive(Debug, Clone)]
pub struct KubeClient {
	http: reqwest::Client,
	config: Arc<KubeConfig>,
}

impl KubeClient {
	pub fn new(config: KubeConfig) -> KubeResult<Self> {
		let http = new_client(&config)?;
		Ok(Self {
			http,
			config: Arc::new(config),
		})
	}

	/// Build from [`KubeConfig::from_env`]. Fails when no credential is
	/// configured.
	pub fn from_env() -> KubeResult<Self> {
		Self::new(KubeConfig::from_env()?)
	}

	pub fn config(&self) -> &KubeConfig {
		&self.config
	}

	pub fn resource(&self, kind: ResourceKind) -> HttpResourceClient {
		HttpResourceClient {
			http: self.http.clone(),
			config: Arc::clone(&self.config),
			kind,
		}
	}

	pub fn pods(&self) -> HttpResourceClient {
		self.resource(ResourceKind::pods())
	}

	pub fn services(&self) -> HttpResourceClient {
		self.resource(ResourceKind::services())
	}

	pub fn replication_controllers(&self) -> HttpResourceClient {
		self.resource(ResourceKind::replication_controllers())
	}

	pub fn events(&self) -> HttpResourceClient {
		self.resource(ResourceKind::events())
	}

	pub fn namespaces(&self) -> HttpResourceClient {
		self.resource(ResourceKind::namespaces())
	}

	pub fn nodes(&self) -> HttpResourceClient {
		self.resource(ResourceKind::nodes())
	}
}

/// Accessor for one resource collection.
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
	http: reqwest::Client,
	config: Arc<KubeConfig>,
	kind: ResourceKind,
}

impl HttpResourceClient {
	pub fn kind(&self) -> &ResourceKind {
		&self.kind
	}

	/// `{base}[/watch][/namespaces/{ns}]/{plural}[/{name}]`. The namespace
	/// segment is only emitted for namespaced kinds.
	fn url(&self, watch: bool, namespace: Option<&str>, name: Option<&str>) -> KubeResult<Url> {
		let mut url = self.config.base_url().clone();
		{
			let mut segments = url
				.path_segments_mut()
				.map_err(|()| KubeError::contract("base URL cannot carry a path"))?;
			segments.pop_if_empty();
			if watch {
				segments.push("watch");
			}
			if self.kind.is_namespaced() {
				if let Some(ns) = namespace {
					segments.extend(["namespaces", ns]);
				}
			}
			segments.push(self.kind.plural());
			if let Some(name) = name {
				segments.push(name);
			}
		}
		Ok(url)
	}

	fn collection_url(&self, watch: bool, opts: &GetOptions) -> KubeResult<Url> {
		let namespace = opts
			.template
			.as_ref()
			.and_then(|t| str_at(t, "metadata.namespace"));
		let mut url = self.url(watch, namespace, None)?;
		if let Some(selector) = opts.label_selector() {
			url.query_pairs_mut().append_pair("labelSelector", &selector);
		}
		Ok(url)
	}

	/// Namespace for a single-item operation; required for namespaced kinds.
	fn item_namespace<'a>(&self, template: &'a Value) -> KubeResult<Option<&'a str>> {
		match str_at(template, "metadata.namespace") {
			Some(ns) => Ok(Some(ns)),
			None if self.kind.is_namespaced() => Err(KubeError::invalid_template(format!(
				"{} template must specify metadata.namespace",
				self.kind.kind()
			))),
			None => Ok(None),
		}
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		let builder = self.http.request(method, url);
		match self.config.request_timeout() {
			Some(timeout) => builder.timeout(timeout),
			None => builder,
		}
	}

	async fn exists(&self, template: Value) -> KubeResult<bool> {
		let found = self.get(&GetOptions::new().template(template)).await?;
		Ok(!found.is_empty())
	}
}

/// Scope template selecting a single item by name (and namespace).
fn item_template(name: &str, namespace: Option<&str>) -> Value {
	let mut metadata = Map::new();
	metadata.insert("name".to_string(), Value::String(name.to_string()));
	if let Some(ns) = namespace {
		metadata.insert("namespace".to_string(), Value::String(ns.to_string()));
	}
	json!({ "metadata": metadata })
}

fn item_name(explicit: Option<&str>, template: &Value, operation: &str) -> KubeResult<String> {
	explicit
		.or_else(|| str_at(template, "metadata.name"))
		.map(str::to_string)
		.ok_or_else(|| {
			KubeError::contract(format!("must specify the name of the resource to {operation}"))
		})
}

/// Send, mapping non-success responses to [`KubeError::ApiFailure`] when
/// the body is a failed `Status`, or [`KubeError::Http`] otherwise.
async fn send(request: RequestBuilder) -> KubeResult<Response> {
	let response = request.send().await?;
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let body = response.text().await?;
	debug!(status = status.as_u16(), "request rejected");
	if let Some(err) = serde_json::from_str::<Value>(&body)
		.ok()
		.and_then(|doc| failure_status(&doc))
	{
		return Err(err);
	}
	Err(KubeError::Http {
		status: status.as_u16(),
		body,
	})
}

/// First document of a list-mode body.
async fn first_document(response: Response) -> KubeResult<Value> {
	let mut docs = std::pin::pin!(ResourceStream::list(
		response.bytes_stream(),
		DecodeOptions::default()
	));
	docs.try_next().await?.ok_or_else(|| KubeError::Decode {
		message: "response body held no document".to_string(),
	})
}

/// RFC 6902 body for a single-leaf patch document.
fn json_patch(patch: &Value, patch_type: PatchType) -> KubeResult<Value> {
	let Some(op) = patch_type.op() else {
		return Ok(patch.clone());
	};

	let mut paths = leaf_paths(patch);
	let path = match (paths.pop(), paths.is_empty()) {
		(Some(path), true) => path,
		_ => {
			return Err(KubeError::invalid_template(
				"JSON patch document must contain exactly one leaf path",
			))
		}
	};

	let mut operation = Map::new();
	operation.insert("op".to_string(), json!(op));
	if patch_type != PatchType::Remove {
		let value = patch.pointer(&path).cloned().unwrap_or(Value::Null);
		operation.insert("value".to_string(), value);
	}
	operation.insert("path".to_string(), Value::String(path));
	Ok(Value::Array(vec![Value::Object(operation)]))
}

#[async_trait]
impl ResourceAccessor for HttpResourceClient {
	#[instrument(skip_all, fields(kind = %self.kind.kind()))]
	async fn get(&self, opts: &GetOptions) -> KubeResult<Vec<Value>> {
		let url = self.collection_url(false, opts)?;
		debug!(%url, "listing resources");
		let response = send(self.request(Method::GET, url)).await?;
		ResourceStream::list(response.bytes_stream(), opts.decode_options())
			.try_collect()
			.await
	}

	#[instrument(skip_all, fields(kind = %self.kind.kind(), force = opts.force))]
	async fn create(&self, opts: &CreateOptions) -> KubeResult<Value> {
		let template = &opts.template;
		match str_at(template, "kind") {
			None => {
				return Err(KubeError::invalid_template(
					"template must specify a kind to create",
				))
			}
			Some(kind) if kind != self.kind.kind() => {
				return Err(KubeError::invalid_template(format!(
					"cannot create a {kind} through the {} collection",
					self.kind.plural()
				)))
			}
			Some(_) => {}
		}
		let namespace = self.item_namespace(template)?;

		if !opts.force && self.exists(template.clone()).await? {
			return Err(KubeError::AlreadyExists {
				name: str_at(template, "metadata.name").unwrap_or_default().to_string(),
			});
		}

		let url = self.url(false, namespace, None)?;
		debug!(%url, "creating resource");
		let response = send(self.request(Method::POST, url).json(template)).await?;
		first_document(response).await
	}

	#[instrument(skip_all, fields(kind = %self.kind.kind(), force = opts.force))]
	async fn delete(&self, opts: &DeleteOptions) -> KubeResult<Value> {
		let name = item_name(opts.name.as_deref(), &opts.template, "delete")?;
		let namespace = self.item_namespace(&opts.template)?;

		if !opts.force && !self.exists(item_template(&name, namespace)).await? {
			return Err(KubeError::NotFound { name });
		}

		let url = self.url(false, namespace, Some(&name))?;
		debug!(%url, "deleting resource");
		let response = send(self.request(Method::DELETE, url)).await?;
		first_document(response).await
	}

	#[instrument(skip_all, fields(kind = %self.kind.kind(), patch_type = ?opts.patch_type))]
	async fn patch(&self, opts: &PatchOptions) -> KubeResult<Value> {
		let name = item_name(opts.name.as_deref(), &opts.template, "patch")?;
		let namespace = self.item_namespace(&opts.template)?;
		let body = json_patch(&opts.patch, opts.patch_type)?;

		if !self.exists(item_template(&name, namespace)).await? {
			return Err(KubeError::NotFound { name });
		}

		let url = self.url(false, namespace, Some(&name))?;
		debug!(%url, "patching resource");
		let request = self
			.request(Method::PATCH, url)
			.header(CONTENT_TYPE, opts.patch_type.content_type())
			.body(body.to_string());
		let response = send(request).await?;
		first_document(response).await
	}

	#[instrument(skip_all, fields(kind = %self.kind.kind()))]
	async fn watch(&self, opts: &GetOptions) -> KubeResult<ResourceEventStream> {
		let url = self.collection_url(true, opts)?;
		debug!(%url, "opening watch");
		// No per-request timeout: the connection stays open indefinitely.
		let response = send(self.http.get(url)).await?;
		Ok(Box::pin(ResourceStream::watch(
			response.bytes_stream(),
			opts.decode_options(),
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client(base: &str) -> KubeClient {
		KubeClient::new(KubeConfig::new(base, "token").unwrap()).unwrap()
	}

	#[test]
	fn namespaced_urls() {
		let pods = client("http://localhost:8080/api/v1").pods();
		assert_eq!(
			pods.url(false, Some("ns"), Some("p1")).unwrap().as_str(),
			"http://localhost:8080/api/v1/namespaces/ns/pods/p1"
		);
		assert_eq!(
			pods.url(false, None, None).unwrap().as_str(),
			"http://localhost:8080/api/v1/pods"
		);
		assert_eq!(
			pods.url(true, Some("ns"), None).unwrap().as_str(),
			"http://localhost:8080/api/v1/watch/namespaces/ns/pods"
		);
	}

	#[test]
	fn cluster_scoped_urls_ignore_namespace() {
		let namespaces = client("http://localhost:8080/api/v1/").namespaces();
		assert_eq!(
			namespaces.url(false, Some("ns"), Some("ns")).unwrap().as_str(),
			"http://localhost:8080/api/v1/namespaces/ns"
		);
		assert_eq!(
			namespaces.url(false, None, None).unwrap().as_str(),
			"http://localhost:8080/api/v1/namespaces"
		);
	}

	#[test]
	fn label_selector_is_a_query_parameter() {
		let pods = client("http://localhost:8080/api/v1").pods();
		let opts = GetOptions::new()
			.template(json!({"metadata": {"namespace": "ns"}}))
			.label("app", "web")
			.label("tier", "front");
		assert_eq!(
			pods.collection_url(false, &opts).unwrap().as_str(),
			"http://localhost:8080/api/v1/namespaces/ns/pods?labelSelector=app%3Dweb%2Ctier%3Dfront"
		);
	}

	#[test]
	fn namespaced_items_require_a_namespace() {
		let pods = client("http://localhost:8080/api/v1").pods();
		let err = pods
			.item_namespace(&json!({"metadata": {"name": "p"}}))
			.unwrap_err();
		assert!(matches!(err, KubeError::InvalidTemplate { .. }));

		let namespaces = client("http://localhost:8080/api/v1").namespaces();
		assert_eq!(
			namespaces
				.item_namespace(&json!({"metadata": {"name": "n"}}))
				.unwrap(),
			None
		);
	}

	#[test]
	fn json_patch_from_single_leaf() {
		let body = json_patch(
			&json!({"metadata": {"labels": {"app": "web"}}}),
			PatchType::Replace,
		)
		.unwrap();
		assert_eq!(
			body,
			json!([{"op": "replace", "path": "/metadata/labels/app", "value": "web"}])
		);

		let body = json_patch(&json!({"spec": {"replicas": 3}}), PatchType::Remove).unwrap();
		assert_eq!(body, json!([{"op": "remove", "path": "/spec/replicas"}]));
	}

	#[test]
	fn json_patch_rejects_multiple_or_missing_leaves() {
		let err = json_patch(&json!({"a": 1, "b": 2}), PatchType::Add).unwrap_err();
		assert!(matches!(err, KubeError::InvalidTemplate { .. }));
		let err = json_patch(&json!({}), PatchType::Add).unwrap_err();
		assert!(matches!(err, KubeError::InvalidTemplate { .. }));
	}

	#[test]
	fn merge_patch_is_sent_verbatim() {
		let patch = json!({"metadata": {"labels": {"a": "1", "b": "2"}}});
		assert_eq!(json_patch(&patch, PatchType::Merge).unwrap(), patch);
	}

	#[test]
	fn missing_name_is_a_contract_error() {
		let err = item_name(None, &json!({"metadata": {}}), "delete").unwrap_err();
		assert!(matches!(err, KubeError::Contract { .. }));
		assert_eq!(
			item_name(Some("x"), &json!({"metadata": {"name": "y"}}), "delete").unwrap(),
			"x"
		);
	}
}
