// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Response decoding: raw body bytes to resource documents.
//!
//! [`ResourceStream`] wraps a byte stream and yields one document per
//! resource, in arrival order. Each parsed record goes through:
//!
//! 1. flatten: a record with an `items` array yields each item in order
//! 2. failure detection: `kind: Status, status: Failure` becomes an error
//!    and ends the stream
//! 3. template filter: non-matching items are dropped silently
//! 4. view projection: a dotted field path is extracted from each item
//!
//! Failure detection runs before filtering so that an API failure surfaces
//! no matter which template or view the caller supplied.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use pin_project_lite::pin_project;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{KubeError, KubeResult};
use crate::matching::{matches_template, pluck, str_at, unwrap_envelope};

/// How records are delimited in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
	/// One JSON document (optionally a list wrapper) for the whole body.
	/// Items are released once the body has been read to the end.
	List,
	/// Newline-delimited records over a long-lived connection. Each complete
	/// line is released as soon as it arrives.
	Watch,
}

/// Per-stream template filter and projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
	pub template: Option<Value>,
	pub view: Option<String>,
}

pin_project! {
	/// Stream adapter that decodes a response body into resource documents.
	///
	/// Restartable only by reopening the underlying source. After the first
	/// error the stream yields `None`.
	pub struct ResourceStream<S> {
		#[pin]
		inner: S,
		mode: DecodeMode,
		options: DecodeOptions,
		buffer: Vec<u8>,
		pending: VecDeque<Value>,
		finished: bool,
	}
}

impl<S> ResourceStream<S> {
	pub fn new(inner: S, mode: DecodeMode, options: DecodeOptions) -> Self {
		Self {
			inner,
			mode,
			options,
			buffer: Vec::new(),
			pending: VecDeque::new(),
			finished: false,
		}
	}

	pub fn list(inner: S, options: DecodeOptions) -> Self {
		Self::new(inner, DecodeMode::List, options)
	}

	pub fn watch(inner: S, options: DecodeOptions) -> Self {
		Self::new(inner, DecodeMode::Watch, options)
	}
}

impl<S, E> Stream for ResourceStream<S>
where
	S: Stream<Item = Result<Bytes, E>>,
	E: std::fmt::Display,
{
	type Item = KubeResult<Value>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let mut this = self.project();

		loop {
			while let Some(item) = this.pending.pop_front() {
				match process_item(item, this.options) {
					Ok(Some(value)) => return Poll::Ready(Some(Ok(value))),
					Ok(None) => continue,
					Err(e) => {
						*this.finished = true;
						this.pending.clear();
						return Poll::Ready(Some(Err(e)));
					}
				}
			}

			if *this.finished {
				return Poll::Ready(None);
			}

			if *this.mode == DecodeMode::Watch {
				match next_line_record(this.buffer) {
					Ok(Some(record)) => {
						flatten_into(record, this.pending);
						continue;
					}
					Ok(None) => {}
					Err(e) => {
						*this.finished = true;
						return Poll::Ready(Some(Err(e)));
					}
				}
			}

			match this.inner.as_mut().poll_next(cx) {
				Poll::Ready(Some(Ok(bytes))) => {
					trace!(bytes_len = bytes.len(), "received response chunk");
					this.buffer.extend_from_slice(&bytes);
				}
				Poll::Ready(Some(Err(e))) => {
					warn!(error = %e, "response body stream failed");
					*this.finished = true;
					return Poll::Ready(Some(Err(KubeError::Transport {
						message: e.to_string(),
					})));
				}
				Poll::Ready(None) => {
					*this.finished = true;
					match drain_remaining(this.buffer) {
						Ok(records) => {
							for record in records {
								flatten_into(record, this.pending);
							}
						}
						Err(e) => return Poll::Ready(Some(Err(e))),
					}
				}
				Poll::Pending => return Poll::Pending,
			}
		}
	}
}

/// Pop one complete line from the buffer and parse it. Blank lines are
/// skipped; an incomplete trailing line stays buffered.
fn next_line_record(buffer: &mut Vec<u8>) -> KubeResult<Option<Value>> {
	while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
		let line: Vec<u8> = buffer.drain(..=line_end).collect();
		let line = line.trim_ascii();
		if line.is_empty() {
			continue;
		}
		return parse_record(line).map(Some);
	}
	Ok(None)
}

/// Parse whatever is left once the source has ended: zero or more
/// whitespace-separated documents.
fn drain_remaining(buffer: &mut Vec<u8>) -> KubeResult<Vec<Value>> {
	let bytes = std::mem::take(buffer);
	let mut records = Vec::new();
	for record in serde_json::Deserializer::from_slice(&bytes).into_iter::<Value>() {
		records.push(record.map_err(|e| {
			warn!(error = %e, "malformed response record");
			KubeError::Decode {
				message: e.to_string(),
			}
		})?);
	}
	Ok(records)
}

fn parse_record(line: &[u8]) -> KubeResult<Value> {
	serde_json::from_slice(line).map_err(|e| {
		warn!(error = %e, line_len = line.len(), "malformed watch record");
		KubeError::Decode {
			message: e.to_string(),
		}
	})
}

fn flatten_into(record: Value, pending: &mut VecDeque<Value>) {
	match record {
		Value::Object(mut map) if map.contains_key("items") => {
			match map.remove("items") {
				Some(Value::Array(items)) => {
					debug!(count = items.len(), "flattening list record");
					pending.extend(items);
				}
				Some(Value::Null) | None => {}
				Some(other) => pending.push_back(other),
			}
		}
		other => pending.push_back(other),
	}
}

fn process_item(item: Value, options: &DecodeOptions) -> KubeResult<Option<Value>> {
	if let Some(err) = failure_status(&item) {
		return Err(err);
	}

	if let Some(template) = &options.template {
		if !matches_template(&item, template) {
			trace!("item dropped by template filter");
			return Ok(None);
		}
	}

	Ok(Some(match &options.view {
		Some(view) => pluck(&item, view),
		None => item,
	}))
}

/// True when the document (or the object of a watch envelope) is a failed
/// API `Status`.
pub fn is_failure_status(value: &Value) -> bool {
	let doc = unwrap_envelope(value);
	doc.get("kind").and_then(Value::as_str) == Some("Status")
		&& doc.get("status").and_then(Value::as_str) == Some("Failure")
}

/// Convert a failed `Status` document into [`KubeError::ApiFailure`].
pub fn failure_status(value: &Value) -> Option<KubeError> {
	if !is_failure_status(value) {
		return None;
	}
	let doc = unwrap_envelope(value);
	// Status documents inside watch ERROR events may carry an unexpected
	// apiVersion, which the typed deserializer rejects.
	let status: Status = serde_json::from_value(doc.clone()).unwrap_or_else(|_| Status {
		message: str_at(doc, "message").map(str::to_string),
		reason: str_at(doc, "reason").map(str::to_string),
		code: doc
			.get("code")
			.and_then(Value::as_i64)
			.and_then(|c| i32::try_from(c).ok()),
		..Default::default()
	});
	debug!(reason = ?status.reason, code = ?status.code, "API returned failure status");
	Some(KubeError::ApiFailure {
		message: status
			.message
			.unwrap_or_else(|| "request failed without a message".to_string()),
		reason: status.reason,
		code: status.code,
	})
}
