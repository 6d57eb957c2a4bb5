//! Aggregate model builders
//!
//! The model is derived, never stored: both builders walk the registration
//! table front to back on every call, so they can never serve a stale
//! snapshot and duplicate-name resolution is deterministic (last registrant
//! wins).

use crate::table::FieldTable;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Flat name → value mapping across all registered fields.
pub type FlatModel = HashMap<String, Value>;

/// Build the flat model.
///
/// One entry per distinct name. Walking registration order, a record with a
/// value inserts or overwrites its name and a record without one removes it,
/// so the entry always reflects the most-recently-registered field.
pub fn build_flat(table: &FieldTable) -> FlatModel {
	let mut flat = FlatModel::new();
	for record in table.iter() {
		match record.value() {
			Some(value) => {
				flat.insert(record.name().to_string(), value.clone());
			}
			None => {
				flat.remove(record.name());
			}
		}
	}
	flat
}

/// Build the nested model: dot-separated name segments become nested objects.
///
/// `a.b` → `1` and `a.c` → `2` yield `{"a": {"b": 1, "c": 2}}`. When a
/// terminal segment collides with an existing object, compatible objects
/// deep-merge; otherwise the most recent write wins.
///
/// # Examples
///
/// ```
/// use formstate::{FieldSpec, Form};
/// use serde_json::json;
///
/// let mut form = Form::new();
/// form.register(FieldSpec::new("a.b").with_value(json!(1))).unwrap();
/// form.register(FieldSpec::new("a.c").with_value(json!(2))).unwrap();
/// assert_eq!(form.nested_model(), json!({"a": {"b": 1, "c": 2}}));
/// ```
pub fn build_nested(table: &FieldTable) -> Value {
	let mut root = Map::new();
	for record in table.iter() {
		if let Some(value) = record.value() {
			assign_path(&mut root, record.name(), value.clone());
		}
	}
	Value::Object(root)
}

fn assign_path(root: &mut Map<String, Value>, path: &str, value: Value) {
	let mut segments = path.split('.').peekable();
	let mut node = root;
	while let Some(segment) = segments.next() {
		if segments.peek().is_none() {
			match (node.get_mut(segment), value.is_object()) {
				(Some(existing @ Value::Object(_)), true) => deep_merge(existing, value),
				_ => {
					node.insert(segment.to_string(), value);
				}
			}
			return;
		}
		// Traversing through a non-object replaces it: most recent write wins.
		let entry = node
			.entry(segment.to_string())
			.or_insert_with(|| Value::Object(Map::new()));
		if !entry.is_object() {
			*entry = Value::Object(Map::new());
		}
		let Value::Object(map) = entry else { return };
		node = map;
	}
}

fn deep_merge(dst: &mut Value, src: Value) {
	match (dst, src) {
		(Value::Object(dst_map), Value::Object(src_map)) => {
			for (key, src_value) in src_map {
				match dst_map.get_mut(&key) {
					Some(dst_value) if dst_value.is_object() && src_value.is_object() => {
						deep_merge(dst_value, src_value);
					}
					_ => {
						dst_map.insert(key, src_value);
					}
				}
			}
		}
		(dst, src) => *dst = src,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::field::{FieldId, FieldRecord, FieldSpec};
	use rstest::rstest;
	use serde_json::json;

	fn table(entries: Vec<(&str, Option<Value>)>) -> FieldTable {
		let mut table = FieldTable::new();
		for (i, (name, value)) in entries.into_iter().enumerate() {
			let mut spec = FieldSpec::new(name);
			if let Some(value) = value {
				spec = spec.with_value(value);
			}
			table.register(FieldRecord::from_spec(FieldId(i as u64), spec));
		}
		table
	}

	#[rstest]
	fn test_flat_one_entry_per_name_last_registrant_wins() {
		let table = table(vec![
			("a", Some(json!(1))),
			("b", Some(json!(2))),
			("a", Some(json!(3))),
		]);

		let flat = build_flat(&table);
		assert_eq!(flat.len(), 2);
		assert_eq!(flat.get("a"), Some(&json!(3)));
		assert_eq!(flat.get("b"), Some(&json!(2)));
	}

	#[rstest]
	fn test_flat_later_valueless_registrant_removes_entry() {
		let table = table(vec![("a", Some(json!(1))), ("a", None)]);
		let flat = build_flat(&table);
		assert!(!flat.contains_key("a"));
	}

	#[rstest]
	fn test_flat_null_is_a_value_not_undefined() {
		let table = table(vec![("a", Some(json!(null)))]);
		let flat = build_flat(&table);
		assert_eq!(flat.get("a"), Some(&json!(null)));
	}

	#[rstest]
	fn test_nested_dot_notation() {
		let table = table(vec![
			("a.b", Some(json!(1))),
			("a.c", Some(json!(2))),
			("top", Some(json!("t"))),
		]);

		let nested = build_nested(&table);
		assert_eq!(nested, json!({"a": {"b": 1, "c": 2}, "top": "t"}));
	}

	#[rstest]
	fn test_nested_deep_paths() {
		let table = table(vec![
			("a.b.c", Some(json!(1))),
			("a.b.d", Some(json!(2))),
		]);

		let nested = build_nested(&table);
		assert_eq!(nested, json!({"a": {"b": {"c": 1, "d": 2}}}));
	}

	#[rstest]
	fn test_nested_terminal_object_collision_merges() {
		let table = table(vec![
			("a.b", Some(json!(1))),
			("a", Some(json!({"c": 2}))),
		]);

		// "a" already holds nested children; the object value merges in.
		let nested = build_nested(&table);
		assert_eq!(nested, json!({"a": {"b": 1, "c": 2}}));
	}

	#[rstest]
	fn test_nested_scalar_collision_most_recent_wins() {
		let dotted_last = table(vec![("a", Some(json!(1))), ("a.b", Some(json!(2)))]);
		assert_eq!(build_nested(&dotted_last), json!({"a": {"b": 2}}));

		let scalar_last = table(vec![("a.b", Some(json!(2))), ("a", Some(json!(1)))]);
		assert_eq!(build_nested(&scalar_last), json!({"a": 1}));
	}

	#[rstest]
	fn test_builders_are_fresh_not_cached() {
		let mut table = table(vec![("a", Some(json!(1)))]);
		assert_eq!(build_flat(&table).get("a"), Some(&json!(1)));

		table.get_mut(FieldId(0)).unwrap().value = Some(json!(9));
		assert_eq!(build_flat(&table).get("a"), Some(&json!(9)));
	}
}
