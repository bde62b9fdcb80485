// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Filters over decoded watch streams.
//!
//! Watch records are `{type, object}` envelopes. Errors pass through
//! unchanged so the consumer still sees the end of the stream.

use futures::future::ready;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::KubeResult;
use crate::matching::{is_match, str_at, unwrap_envelope};

pub const PHASE_RUNNING: &str = "Running";
pub const PHASE_STOPPED: &str = "Stopped";

/// Keep events whose `object.status.phase` equals `phase`, yielding the
/// inner object.
pub fn with_phase<S>(stream: S, phase: impl Into<String>) -> impl Stream<Item = KubeResult<Value>>
where
	S: Stream<Item = KubeResult<Value>>,
{
	let phase = phase.into();
	stream.filter_map(move |event| {
		let kept = match event {
			Ok(event) => {
				let object = unwrap_envelope(&event);
				(str_at(object, "status.phase") == Some(phase.as_str())).then(|| Ok(object.clone()))
			}
			Err(e) => Some(Err(e)),
		};
		ready(kept)
	})
}

pub fn running<S>(stream: S) -> impl Stream<Item = KubeResult<Value>>
where
	S: Stream<Item = KubeResult<Value>>,
{
	with_phase(stream, PHASE_RUNNING)
}

pub fn stopped<S>(stream: S) -> impl Stream<Item = KubeResult<Value>>
where
	S: Stream<Item = KubeResult<Value>>,
{
	with_phase(stream, PHASE_STOPPED)
}

/// Keep whole events that structurally match `state`.
pub fn with_state<S>(stream: S, state: Value) -> impl Stream<Item = KubeResult<Value>>
where
	S: Stream<Item = KubeResult<Value>>,
{
	stream.filter_map(move |event| {
		let kept = match event {
			Ok(event) => is_match(&event, &state).then_some(Ok(event)),
			Err(e) => Some(Err(e)),
		};
		ready(kept)
	})
}
