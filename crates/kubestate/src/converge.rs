// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! State convergence ("change state").
//!
//! Given a resource anchor, a desired outcome and the mutation expected to
//! produce it, [`change_state`] resolves with the first observed resource
//! state that satisfies the outcome:
//!
//! 1. fetch resources matching the anchor; if the outcome already holds,
//!    return it without running the mutation
//! 2. otherwise spawn a poller and the mutation side by side and settle on
//!    whichever concludes first: a poll success, a poll failure (including
//!    timeout), or a mutation failure. A successful mutation alone does not
//!    settle the call; the poller remains authoritative.
//!
//! The losing task is cancelled through a shared token and aborted.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::accessor::ResourceAccessor;
use crate::condition::Condition;
use crate::error::{KubeError, KubeResult};
use crate::matching::merge;
use crate::poller::{when_cancellable, PollConfig, WhenOptions};
use crate::types::{CreateOptions, DeleteOptions, GetOptions, PatchOptions, PatchType};

/// The mutation expected to move the cluster toward the desired state.
///
/// Each variant is invoked with a template equal to the anchor state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
	Create {
		force: bool,
	},
	Delete {
		force: bool,
		name: Option<String>,
	},
	Patch {
		patch: Value,
		patch_type: PatchType,
		name: Option<String>,
	},
}

impl Action {
	pub fn create() -> Self {
		Action::Create { force: false }
	}

	pub fn delete() -> Self {
		Action::Delete {
			force: false,
			name: None,
		}
	}

	pub fn patch(patch: Value, patch_type: PatchType) -> Self {
		Action::Patch {
			patch,
			patch_type,
			name: None,
		}
	}

	/// Target a resource by name instead of the anchor's `metadata.name`.
	/// Creation always uses the anchor as-is, so this has no effect there.
	pub fn with_name(mut self, resource: impl Into<String>) -> Self {
		match &mut self {
			Action::Delete { name, .. } | Action::Patch { name, .. } => {
				*name = Some(resource.into());
			}
			Action::Create { .. } => {}
		}
		self
	}

	fn verb(&self) -> &'static str {
		match self {
			Action::Create { .. } => "create",
			Action::Delete { .. } => "delete",
			Action::Patch { .. } => "patch",
		}
	}

	/// Run the mutation against `accessor` with the given template.
	pub async fn invoke<A>(&self, accessor: &A, template: Value) -> KubeResult<Value>
	where
		A: ResourceAccessor + ?Sized,
	{
		match self {
			Action::Create { force } => {
				accessor
					.create(&CreateOptions::new(template).force(*force))
					.await
			}
			Action::Delete { force, name } => {
				let opts = DeleteOptions {
					template,
					name: name.clone(),
					force: *force,
				};
				accessor.delete(&opts).await
			}
			Action::Patch {
				patch,
				patch_type,
				name,
			} => {
				let opts = PatchOptions {
					template,
					name: name.clone(),
					patch: patch.clone(),
					patch_type: *patch_type,
				};
				accessor.patch(&opts).await
			}
		}
	}
}

/// The desired outcome.
#[derive(Debug, Clone)]
pub enum Target {
	/// Deep-merged into the anchor; satisfied when a fetched resource
	/// structurally matches the result, `kind` ignored.
	Delta(Value),
	/// Caller predicate, used verbatim.
	Condition(Condition),
}

/// A validated convergence request. Build with [`ChangeState::builder`].
#[derive(Debug, Clone)]
pub struct ChangeState {
	state: Value,
	target: Target,
	action: Action,
	poll: PollConfig,
}

impl ChangeState {
	pub fn builder() -> ChangeStateBuilder {
		ChangeStateBuilder::default()
	}

	pub fn state(&self) -> &Value {
		&self.state
	}

	pub fn target(&self) -> &Target {
		&self.target
	}

	pub fn action(&self) -> &Action {
		&self.action
	}

	pub fn poll(&self) -> PollConfig {
		self.poll
	}

	/// Fetch scope: everything matching the anchor state.
	pub fn scope(&self) -> GetOptions {
		GetOptions::new().template(self.state.clone())
	}

	/// The condition the poller and the initial check evaluate.
	pub fn effective_condition(&self) -> Condition {
		match &self.target {
			Target::Delta(delta) => Condition::matching(merge(&self.state, delta)),
			Target::Condition(condition) => condition.clone(),
		}
	}
}

/// Collects [`ChangeState`] arguments; validation happens in
/// [`build`](Self::build), before any I/O.
#[derive(Debug, Clone, Default)]
pub struct ChangeStateBuilder {
	state: Option<Value>,
	delta: Option<Value>,
	condition: Option<Condition>,
	action: Option<Action>,
	times: Option<u32>,
	interval: Option<Duration>,
}

impl ChangeStateBuilder {
	pub fn state(mut self, state: Value) -> Self {
		self.state = Some(state);
		self
	}

	pub fn delta(mut self, delta: Value) -> Self {
		self.delta = Some(delta);
		self
	}

	pub fn condition(mut self, condition: Condition) -> Self {
		self.condition = Some(condition);
		self
	}

	pub fn action(mut self, action: Action) -> Self {
		self.action = Some(action);
		self
	}

	pub fn times(mut self, times: u32) -> Self {
		self.times = Some(times);
		self
	}

	pub fn interval(mut self, interval: Duration) -> Self {
		self.interval = Some(interval);
		self
	}

	pub fn build(self) -> KubeResult<ChangeState> {
		let (Some(state), Some(action)) = (self.state, self.action) else {
			return Err(KubeError::contract("state and action must be specified"));
		};

		let target = match (self.delta, self.condition) {
			(Some(delta), None) => Target::Delta(delta),
			(None, Some(condition)) => Target::Condition(condition),
			(None, None) => {
				return Err(KubeError::contract(
					"did not specify either a condition or a delta",
				))
			}
			(Some(_), Some(_)) => {
				return Err(KubeError::contract(
					"cannot specify both a condition and a delta",
				))
			}
		};

		let defaults = PollConfig::default();
		let poll = PollConfig {
			times: self.times.unwrap_or(defaults.times),
			interval: self.interval.unwrap_or(defaults.interval),
		};
		if poll.times == 0 {
			return Err(KubeError::contract("poll attempts must be at least 1"));
		}

		Ok(ChangeState {
			state,
			target,
			action,
			poll,
		})
	}
}

enum Settled {
	Poll(KubeResult<Value>),
	Action(KubeResult<Value>),
}

/// Drive the cluster toward `request` and wait until it gets there.
///
/// Resolves exactly once: immediately if the outcome already holds (the
/// action is never invoked), otherwise with the first of poll success, poll
/// failure, or action failure. When both participants finish at the same
/// moment, whichever the runtime reports first wins.
#[instrument(skip_all, fields(action = request.action.verb()))]
pub async fn change_state<A>(accessor: Arc<A>, request: ChangeState) -> KubeResult<Value>
where
	A: ResourceAccessor + ?Sized + 'static,
{
	let condition = request.effective_condition();
	let scope = request.scope();

	let current = accessor.get(&scope).await?;
	if let Some(matched) = condition.evaluate(&current) {
		debug!("cluster already in desired state; skipping action");
		return Ok(matched);
	}

	let cancel = CancellationToken::new();
	let _cancel_on_exit = cancel.clone().drop_guard();
	let mut race = JoinSet::new();

	let poll_accessor = Arc::clone(&accessor);
	let poll_cancel = cancel.child_token();
	let when_opts = WhenOptions {
		scope,
		condition,
		poll: request.poll,
	};
	race.spawn(async move {
		Settled::Poll(when_cancellable(poll_accessor.as_ref(), &when_opts, &poll_cancel).await)
	});

	let action_cancel = cancel.child_token();
	let action = request.action;
	let template = request.state;
	race.spawn(async move {
		let result = tokio::select! {
			biased;
			_ = action_cancel.cancelled() => Err(KubeError::Cancelled),
			result = action.invoke(accessor.as_ref(), template) => result,
		};
		Settled::Action(result)
	});

	while let Some(joined) = race.join_next().await {
		let settled = joined.map_err(|e| KubeError::TaskFailed {
			message: e.to_string(),
		})?;

		match settled {
			Settled::Poll(Ok(matched)) => {
				debug!("desired state observed");
				return Ok(matched);
			}
			Settled::Poll(Err(e)) => {
				warn!(error = %e, "poll ended without reaching desired state");
				return Err(e);
			}
			Settled::Action(Err(e)) => {
				warn!(error = %e, "action failed; abandoning poll");
				return Err(e);
			}
			Settled::Action(Ok(_)) => {
				debug!("action completed; waiting for desired state");
			}
		}
	}

	Err(KubeError::TaskFailed {
		message: "convergence race ended without an outcome".to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn namespace() -> Value {
		json!({"kind": "Namespace", "metadata": {"name": "ns1"}})
	}

	#[test]
	fn missing_state_or_action_is_a_contract_error() {
		let err = ChangeState::builder()
			.delta(json!({}))
			.action(Action::create())
			.build()
			.unwrap_err();
		assert!(matches!(err, KubeError::Contract { .. }));

		let err = ChangeState::builder()
			.state(namespace())
			.delta(json!({}))
			.build()
			.unwrap_err();
		assert!(matches!(err, KubeError::Contract { .. }));
	}

	#[test]
	fn delta_and_condition_are_mutually_exclusive() {
		let neither = ChangeState::builder()
			.state(namespace())
			.action(Action::create())
			.build();
		assert!(matches!(neither, Err(KubeError::Contract { .. })));

		let both = ChangeState::builder()
			.state(namespace())
			.delta(json!({"status": {"phase": "Active"}}))
			.condition(Condition::absent())
			.action(Action::create())
			.build();
		assert!(matches!(both, Err(KubeError::Contract { .. })));
	}

	#[test]
	fn zero_poll_attempts_is_a_contract_error() {
		let err = ChangeState::builder()
			.state(namespace())
			.delta(json!({"status": {"phase": "Active"}}))
			.action(Action::create())
			.times(0)
			.build()
			.unwrap_err();
		assert!(matches!(err, KubeError::Contract { .. }));
	}

	#[test]
	fn with_name_targets_delete_and_patch_only() {
		assert_eq!(
			Action::delete().with_name("old"),
			Action::Delete {
				force: false,
				name: Some("old".to_string()),
			}
		);
		assert_eq!(
			Action::patch(json!({"a": 1}), PatchType::Merge).with_name("old"),
			Action::Patch {
				patch: json!({"a": 1}),
				patch_type: PatchType::Merge,
				name: Some("old".to_string()),
			}
		);
		assert_eq!(Action::create().with_name("old"), Action::create());
	}

	#[test]
	fn poll_budget_defaults_and_overrides() {
		let request = ChangeState::builder()
			.state(namespace())
			.delta(json!({}))
			.action(Action::create())
			.build()
			.unwrap();
		assert_eq!(request.poll(), PollConfig::default());

		let request = ChangeState::builder()
			.state(namespace())
			.delta(json!({}))
			.action(Action::create())
			.times(3)
			.interval(Duration::from_millis(5))
			.build()
			.unwrap();
		assert_eq!(request.poll().times, 3);
		assert_eq!(request.poll().interval, Duration::from_millis(5));
	}

	#[test]
	fn delta_condition_merges_into_state_and_ignores_kind() {
		let request = ChangeState::builder()
			.state(namespace())
			.delta(json!({"status": {"phase": "Active"}}))
			.action(Action::create())
			.build()
			.unwrap();
		let condition = request.effective_condition();

		let active = json!({"metadata": {"name": "ns1"}, "status": {"phase": "Active"}});
		let pending = json!({"metadata": {"name": "ns1"}, "status": {"phase": "Pending"}});
		assert_eq!(condition.evaluate(&[pending.clone(), active.clone()]), Some(active));
		assert!(condition.evaluate(&[pending]).is_none());
	}
}
