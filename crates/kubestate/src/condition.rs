// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Predicates over a fetched resource collection.
//!
//! A condition returns `Some(match)` when satisfied. `None`, `null`, `false`
//! and an empty array all mean "not yet". Conditions that succeed on absence
//! must therefore return a non-empty sentinel; [`Condition::absent`] returns
//! `true`.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::matching::{matches_template, without_kind};

type Predicate = dyn Fn(&[Value]) -> Option<Value> + Send + Sync;

#[derive(Clone)]
pub struct Condition {
	predicate: Arc<Predicate>,
	label: String,
}

impl Condition {
	pub fn new<F>(predicate: F) -> Self
	where
		F: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
	{
		Self {
			predicate: Arc::new(predicate),
			label: "custom".to_string(),
		}
	}

	/// Satisfied by the first resource structurally matching `target`,
	/// ignoring `kind`.
	pub fn matching(target: Value) -> Self {
		let target = without_kind(&target).into_owned();
		Self {
			label: format!("matching {target}"),
			predicate: Arc::new(move |resources: &[Value]| {
				resources
					.iter()
					.find(|r| matches_template(r, &target))
					.cloned()
			}),
		}
	}

	/// Satisfied by any non-empty collection, yielding the whole collection.
	pub fn any() -> Self {
		Self {
			label: "any".to_string(),
			predicate: Arc::new(|resources: &[Value]| Some(Value::Array(resources.to_vec()))),
		}
	}

	/// Satisfied by an empty collection, yielding `true`.
	pub fn absent() -> Self {
		Self {
			label: "absent".to_string(),
			predicate: Arc::new(|resources: &[Value]| resources.is_empty().then_some(Value::Bool(true))),
		}
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = label.into();
		self
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	/// Evaluate against a collection, normalising falsy results to `None`.
	pub fn evaluate(&self, resources: &[Value]) -> Option<Value> {
		(self.predicate)(resources).filter(is_truthy)
	}
}

impl fmt::Debug for Condition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Condition").field("label", &self.label).finish()
	}
}

/// `null`, `false` and `[]` are not matches.
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null | Value::Bool(false) => false,
		Value::Array(items) => !items.is_empty(),
		_ => true,
	}
}
