// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Structural operations over untyped resource documents.
//!
//! Templates are partial documents. A candidate matches a template when
//! every key of the template is present in the candidate and recursively
//! matches:
//!
//! - objects: every template key must exist in the candidate and match;
//!   extra candidate keys are ignored
//! - arrays: element `i` of the template must match element `i` of the
//!   candidate; the candidate may be longer
//! - scalars: plain equality
//!
//! Resource-level matching additionally unwraps watch envelopes and ignores
//! the top-level `kind` on both sides, since list responses do not reliably
//! carry it per item.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// Partial structural match of `candidate` against `template`.
pub fn is_match(candidate: &Value, template: &Value) -> bool {
	match (candidate, template) {
		(Value::Object(have), Value::Object(want)) => want
			.iter()
			.all(|(key, w)| have.get(key).is_some_and(|h| is_match(h, w))),
		(Value::Array(have), Value::Array(want)) => {
			have.len() >= want.len() && want.iter().zip(have).all(|(w, h)| is_match(h, w))
		}
		_ => candidate == template,
	}
}

/// Returns the wrapped object for a `{type, object}` watch envelope, or the
/// value itself.
pub fn unwrap_envelope(value: &Value) -> &Value {
	match value {
		Value::Object(map) if map.get("type").is_some_and(Value::is_string) => {
			map.get("object").filter(|o| o.is_object()).unwrap_or(value)
		}
		_ => value,
	}
}

/// Drops the top-level `kind` key, borrowing when there is nothing to drop.
pub fn without_kind(value: &Value) -> Cow<'_, Value> {
	match value {
		Value::Object(map) if map.contains_key("kind") => {
			let mut map = map.clone();
			map.remove("kind");
			Cow::Owned(Value::Object(map))
		}
		_ => Cow::Borrowed(value),
	}
}

/// Resource-level match: unwrap envelopes, ignore `kind`, then [`is_match`].
pub fn matches_template(item: &Value, template: &Value) -> bool {
	let candidate = without_kind(unwrap_envelope(item));
	let template = without_kind(template);
	is_match(&candidate, &template)
}

/// Deep merge of `overlay` onto `base`, producing a new document.
///
/// Objects merge key by key, arrays merge index by index, anything else in
/// `overlay` replaces what is in `base`.
pub fn merge(base: &Value, overlay: &Value) -> Value {
	match (base, overlay) {
		(Value::Object(b), Value::Object(o)) => {
			let mut out = b.clone();
			for (key, value) in o {
				let merged = match out.get(key) {
					Some(existing) => merge(existing, value),
					None => value.clone(),
				};
				out.insert(key.clone(), merged);
			}
			Value::Object(out)
		}
		(Value::Array(b), Value::Array(o)) => {
			let len = b.len().max(o.len());
			let out = (0..len)
				.map(|i| match (b.get(i), o.get(i)) {
					(Some(bv), Some(ov)) => merge(bv, ov),
					(Some(bv), None) => bv.clone(),
					(None, Some(ov)) => ov.clone(),
					(None, None) => Value::Null,
				})
				.collect();
			Value::Array(out)
		}
		_ => overlay.clone(),
	}
}

/// Shallow assign: top-level keys of `overlay` replace those of `base`.
pub fn assign(base: &Value, overlay: &Value) -> Value {
	match (base, overlay) {
		(Value::Object(b), Value::Object(o)) => {
			let mut out = b.clone();
			out.extend(o.iter().map(|(k, v)| (k.clone(), v.clone())));
			Value::Object(out)
		}
		_ => overlay.clone(),
	}
}

/// Extract a dotted field path (`metadata.name`, `spec.containers.0.image`).
/// Missing segments yield `null`.
pub fn pluck(value: &Value, path: &str) -> Value {
	path
		.split('.')
		.filter(|segment| !segment.is_empty())
		.try_fold(value, |node, segment| match node {
			Value::Object(map) => map.get(segment),
			Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
			_ => None,
		})
		.cloned()
		.unwrap_or(Value::Null)
}

/// Look up a string at a dotted path.
pub fn str_at<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
	path
		.split('.')
		.try_fold(value, |node, segment| node.get(segment))
		.and_then(Value::as_str)
}

/// Enumerate JSON Pointer paths (RFC 6901) to every non-null leaf.
pub fn leaf_paths(value: &Value) -> Vec<String> {
	fn walk(prefix: String, node: &Value, out: &mut Vec<String>) {
		match node {
			Value::Null => {}
			Value::Object(map) => {
				for (key, child) in map {
					walk(format!("{prefix}/{}", escape_pointer(key)), child, out);
				}
			}
			Value::Array(items) => {
				for (i, child) in items.iter().enumerate() {
					walk(format!("{prefix}/{i}"), child, out);
				}
			}
			_ => out.push(prefix),
		}
	}

	let mut out = Vec::new();
	walk(String::new(), value, &mut out);
	out
}

fn escape_pointer(key: &str) -> String {
	key.replace('~', "~0").replace('/', "~1")
}

/// Build `{"metadata": {"name": name}}`.
pub fn name_template(name: &str) -> Value {
	let mut metadata = Map::new();
	metadata.insert("name".to_string(), Value::String(name.to_string()));
	let mut root = Map::new();
	root.insert("metadata".to_string(), Value::Object(metadata));
	Value::Object(root)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn arb_json() -> impl Strategy<Value = Value> {
		let leaf = prop_oneof![
			Just(Value::Null),
			any::<bool>().prop_map(Value::Bool),
			any::<i64>().prop_map(|n| json!(n)),
			"[a-z]{0,6}".prop_map(Value::String),
		];
		leaf.prop_recursive(3, 24, 4, |inner| {
			prop_oneof![
				prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
				prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
					.prop_map(|m| Value::Object(m.into_iter().collect())),
			]
		})
	}

	#[test]
	fn extra_candidate_keys_are_ignored() {
		let candidate = json!({"metadata": {"name": "p1", "namespace": "ns"}, "spec": {}});
		assert!(is_match(&candidate, &json!({"metadata": {"name": "p1"}})));
		assert!(!is_match(&candidate, &json!({"metadata": {"name": "p2"}})));
		assert!(!is_match(&candidate, &json!({"status": {}})));
	}

	#[test]
	fn arrays_match_element_wise_in_order() {
		let candidate = json!({"ports": [{"port": 80, "protocol": "TCP"}, {"port": 443}]});
		assert!(is_match(&candidate, &json!({"ports": [{"port": 80}]})));
		assert!(is_match(&candidate, &json!({"ports": [{"port": 80}, {"port": 443}]})));
		assert!(!is_match(&candidate, &json!({"ports": [{"port": 443}]})));
		assert!(!is_match(&candidate, &json!({"ports": [{}, {}, {}]})));
	}

	#[test]
	fn type_mismatch_does_not_match() {
		assert!(!is_match(&json!({"a": "1"}), &json!({"a": 1})));
		assert!(!is_match(&json!({"a": [1]}), &json!({"a": {"0": 1}})));
	}

	#[test]
	fn template_match_ignores_kind_on_both_sides() {
		let item = json!({"kind": "Pod", "metadata": {"name": "p1"}});
		assert!(matches_template(&item, &json!({"kind": "Service", "metadata": {"name": "p1"}})));
		let item = json!({"metadata": {"name": "p1"}});
		assert!(matches_template(&item, &json!({"kind": "Pod", "metadata": {"name": "p1"}})));
	}

	#[test]
	fn template_match_unwraps_watch_envelopes() {
		let event = json!({"type": "ADDED", "object": {"kind": "Namespace", "metadata": {"name": "ns1"}}});
		assert!(matches_template(&event, &json!({"metadata": {"name": "ns1"}})));
		assert!(!matches_template(&event, &json!({"type": "ADDED"})));
	}

	#[test]
	fn top_level_type_without_object_is_not_an_envelope() {
		let secret = json!({"kind": "Secret", "type": "Opaque", "metadata": {"name": "s"}});
		assert_eq!(unwrap_envelope(&secret), &secret);
	}

	#[test]
	fn merge_recurses_into_objects() {
		let base = json!({"metadata": {"name": "ns1"}, "status": {"phase": "Pending", "x": 1}});
		let merged = merge(&base, &json!({"status": {"phase": "Active"}}));
		assert_eq!(
			merged,
			json!({"metadata": {"name": "ns1"}, "status": {"phase": "Active", "x": 1}})
		);
	}

	#[test]
	fn assign_replaces_top_level_keys() {
		let base = json!({"metadata": {"name": "a", "labels": {"x": "1"}}, "spec": {}});
		let out = assign(&base, &json!({"metadata": {"name": "b"}}));
		assert_eq!(out, json!({"metadata": {"name": "b"}, "spec": {}}));
	}

	#[test]
	fn pluck_follows_objects_and_indexes() {
		let pod = json!({"metadata": {"name": "p1"}, "spec": {"containers": [{"image": "ubuntu"}]}});
		assert_eq!(pluck(&pod, "metadata.name"), json!("p1"));
		assert_eq!(pluck(&pod, "spec.containers.0.image"), json!("ubuntu"));
		assert_eq!(pluck(&pod, "status.phase"), Value::Null);
	}

	#[test]
	fn leaf_paths_escape_pointer_tokens() {
		let patch = json!({"metadata": {"labels": {"app/name": "x", "a~b": "y"}}});
		let mut paths = leaf_paths(&patch);
		paths.sort();
		assert_eq!(
			paths,
			vec!["/metadata/labels/app~1name".to_string(), "/metadata/labels/a~0b".to_string()]
		);
	}

	#[test]
	fn leaf_paths_skip_nulls() {
		assert!(leaf_paths(&json!({"a": null, "b": {}})).is_empty());
		assert_eq!(leaf_paths(&json!({"a": [false]})), vec!["/a/0".to_string()]);
	}

	proptest! {
		#[test]
		fn every_value_matches_itself(v in arb_json()) {
			prop_assert!(is_match(&v, &v));
		}

		#[test]
		fn merged_document_matches_overlay(base in arb_json(), overlay in arb_json()) {
			prop_assert!(is_match(&merge(&base, &overlay), &overlay));
		}

		#[test]
		fn empty_template_matches_any_object(v in prop::collection::btree_map("[a-z]{1,4}", arb_json(), 0..4)) {
			let candidate = Value::Object(v.into_iter().collect());
			let template = json!({});
			prop_assert!(is_match(&candidate, &template));
		}
	}
}
