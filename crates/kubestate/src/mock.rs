// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory accessor for exercising polling and convergence without a
//! cluster.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::accessor::ResourceAccessor;
use crate::error::KubeError;
use crate::matching::{matches_template, pluck};
use crate::types::{
	CreateOptions, DeleteOptions, GetOptions, PatchOptions, ResourceEventStream,
};

/// A mutating call recorded by [`MockAccessor`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCall {
	Create(CreateOptions),
	Delete(DeleteOptions),
	Patch(PatchOptions),
}

impl ActionCall {
	pub fn template(&self) -> &Value {
		match self {
			ActionCall::Create(opts) => &opts.template,
			ActionCall::Delete(opts) => &opts.template,
			ActionCall::Patch(opts) => &opts.template,
		}
	}
}

#[derive(Debug, Default)]
struct MockState {
	resources: Vec<Value>,
	get_responses: VecDeque<Result<Vec<Value>, KubeError>>,
	resources_after_action: Option<Vec<Value>>,
	action_error: Option<String>,
	action_delay: Option<Duration>,
	hold_actions: bool,
	get_calls: usize,
	action_calls: Vec<ActionCall>,
}

/// Scriptable [`ResourceAccessor`].
///
/// `get` first drains responses queued with
/// [`push_get_response`](Self::push_get_response) in FIFO order, then serves
/// the simulated cluster contents filtered by the request template. Mutating
/// calls are recorded and can swap the cluster contents, fail, or never
/// complete.
#[derive(Debug, Clone, Default)]
pub struct MockAccessor {
	state: Arc<Mutex<MockState>>,
}

impl MockAccessor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start with the given cluster contents.
	pub fn with_resources(resources: Vec<Value>) -> Self {
		Self {
			state: Arc::new(Mutex::new(MockState {
				resources,
				..Default::default()
			})),
		}
	}

	pub async fn set_resources(&self, resources: Vec<Value>) {
		self.state.lock().await.resources = resources;
	}

	/// Queue a response for a future `get`.
	pub async fn push_get_response(&self, response: Result<Vec<Value>, KubeError>) {
		self.state.lock().await.get_responses.push_back(response);
	}

	/// Replace the cluster contents when the next mutating call runs.
	pub async fn on_action_set_resources(&self, resources: Vec<Value>) {
		self.state.lock().await.resources_after_action = Some(resources);
	}

	/// Make every mutating call fail with an API failure.
	pub async fn fail_actions(&self, message: impl Into<String>) {
		self.state.lock().await.action_error = Some(message.into());
	}

	/// Wait this long before a mutating call takes effect.
	pub async fn delay_actions(&self, delay: Duration) {
		self.state.lock().await.action_delay = Some(delay);
	}

	/// Mutating calls take effect but never return.
	pub async fn hold_actions(&self) {
		self.state.lock().await.hold_actions = true;
	}

	pub async fn get_calls(&self) -> usize {
		self.state.lock().await.get_calls
	}

	pub async fn action_calls(&self) -> Vec<ActionCall> {
		self.state.lock().await.action_calls.clone()
	}

	async fn act(&self, call: ActionCall) -> Result<Value, KubeError> {
		let delay = {
			let mut state = self.state.lock().await;
			state.action_calls.push(call.clone());
			state.action_delay
		};

		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let (hold, result) = {
			let mut state = self.state.lock().await;
			match &state.action_error {
				Some(message) => (
					false,
					Err(KubeError::ApiFailure {
						message: message.clone(),
						reason: None,
						code: None,
					}),
				),
				None => {
					if let Some(next) = state.resources_after_action.take() {
						state.resources = next;
					}
					(state.hold_actions, Ok(call.template().clone()))
				}
			}
		};

		if hold {
			futures::future::pending::<()>().await;
		}
		result
	}

	async fn current(&self, opts: &GetOptions) -> Vec<Value> {
		let state = self.state.lock().await;
		state
			.resources
			.iter()
			.filter(|r| {
				opts
					.template
					.as_ref()
					.map_or(true, |t| matches_template(r, t))
			})
			.map(|r| match &opts.view {
				Some(view) => pluck(r, view),
				None => r.clone(),
			})
			.collect()
	}
}

#[async_trait]
impl ResourceAccessor for MockAccessor {
	async fn get(&self, opts: &GetOptions) -> Result<Vec<Value>, KubeError> {
		let scripted = {
			let mut state = self.state.lock().await;
			state.get_calls += 1;
			state.get_responses.pop_front()
		};
		match scripted {
			Some(response) => response,
			None => Ok(self.current(opts).await),
		}
	}

	async fn create(&self, opts: &CreateOptions) -> Result<Value, KubeError> {
		self.act(ActionCall::Create(opts.clone())).await
	}

	async fn delete(&self, opts: &DeleteOptions) -> Result<Value, KubeError> {
		self.act(ActionCall::Delete(opts.clone())).await
	}

	async fn patch(&self, opts: &PatchOptions) -> Result<Value, KubeError> {
		self.act(ActionCall::Patch(opts.clone())).await
	}

	async fn watch(&self, opts: &GetOptions) -> Result<ResourceEventStream, KubeError> {
		let items = self.current(opts).await;
		Ok(futures::stream::iter(items.into_iter().map(Ok)).boxed())
	}
}
