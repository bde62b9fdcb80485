// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded condition polling ("when").

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::accessor::ResourceAccessor;
use crate::condition::Condition;
use crate::error::{KubeError, KubeResult};
use crate::types::GetOptions;

pub const DEFAULT_TIMES: u32 = 60;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Attempt budget for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
	/// Maximum number of fetch-and-test cycles.
	pub times: u32,
	/// Wait between consecutive cycles.
	pub interval: Duration,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			times: DEFAULT_TIMES,
			interval: DEFAULT_INTERVAL,
		}
	}
}

/// What to fetch and what to wait for.
#[derive(Debug, Clone)]
pub struct WhenOptions {
	pub scope: GetOptions,
	pub condition: Condition,
	pub poll: PollConfig,
}

impl WhenOptions {
	pub fn new(scope: GetOptions, condition: Condition) -> Self {
		Self {
			scope,
			condition,
			poll: PollConfig::default(),
		}
	}

	pub fn times(mut self, times: u32) -> Self {
		self.poll.times = times;
		self
	}

	pub fn interval(mut self, interval: Duration) -> Self {
		self.poll.interval = interval;
		self
	}
}

/// Poll until `opts.condition` holds for the fetched collection.
///
/// Performs at most `times` fetches, waiting `interval` between them. A
/// fetch error ends the poll immediately; running out of attempts yields
/// [`KubeError::ConditionTimeout`].
pub async fn when<A>(accessor: &A, opts: &WhenOptions) -> KubeResult<Value>
where
	A: ResourceAccessor + ?Sized,
{
	when_cancellable(accessor, opts, &CancellationToken::new()).await
}

/// [`when`] that also stops with [`KubeError::Cancelled`] once `cancel`
/// fires, whether mid-fetch or mid-wait.
#[instrument(
	skip_all,
	fields(condition = %opts.condition.label(), times = opts.poll.times, interval = ?opts.poll.interval)
)]
pub async fn when_cancellable<A>(
	accessor: &A,
	opts: &WhenOptions,
	cancel: &CancellationToken,
) -> KubeResult<Value>
where
	A: ResourceAccessor + ?Sized,
{
	let PollConfig { times, interval } = opts.poll;
	if times == 0 {
		return Err(KubeError::contract("poll attempts must be at least 1"));
	}

	let mut attempt = 0;

	loop {
		attempt += 1;

		let resources = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(KubeError::Cancelled),
			fetched = accessor.get(&opts.scope) => fetched.inspect_err(|e| {
				warn!(error = %e, attempt, "fetch failed; abandoning poll");
			})?,
		};

		if let Some(matched) = opts.condition.evaluate(&resources) {
			debug!(attempt, "condition satisfied");
			return Ok(matched);
		}

		if attempt >= times {
			warn!(attempt, "condition not met; attempts exhausted");
			return Err(KubeError::ConditionTimeout { attempts: attempt });
		}

		trace!(attempt, count = resources.len(), "condition not met; waiting");

		tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(KubeError::Cancelled),
			_ = tokio::time::sleep(interval) => {}
		}
	}
}
