//! Form lifecycle tests
//!
//! End-to-end coverage of the coordinator: registration cascades, change and
//! validity notifications, submit/reset, external error injection, and
//! cross-field revalidation.

use formstate::{
	FieldSpec, FlatModel, Form, FormError, FormOptions, RuleRegistry, ValidationSpec,
};
use rstest::rstest;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn isolated_form() -> Form {
	Form::with_registry(Arc::new(RuleRegistry::with_builtins()))
}

fn values(entries: &[(&str, Value)]) -> HashMap<String, Value> {
	entries
		.iter()
		.map(|(name, value)| (name.to_string(), value.clone()))
		.collect()
}

fn errors(entries: &[(&str, &str)]) -> HashMap<String, String> {
	entries
		.iter()
		.map(|(name, message)| (name.to_string(), message.to_string()))
		.collect()
}

#[rstest]
fn test_email_validity_flip_fires_on_invalid_exactly_once() {
	let mut form = isolated_form();
	let invalid_count = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&invalid_count);
	form.on_invalid(move || {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	let foo = form
		.register(
			FieldSpec::new("foo")
				.with_value(json!("foo@bar.com"))
				.with_validations("isEmail"),
		)
		.unwrap();
	assert!(form.is_valid());
	assert_eq!(invalid_count.load(Ordering::SeqCst), 0);

	form.set_value(foo, json!("foo@bar")).unwrap();
	assert!(!form.is_valid());
	assert_eq!(invalid_count.load(Ordering::SeqCst), 1);

	// Another invalid value: validity did not flip, so no second firing.
	form.set_value(foo, json!("still@bad")).unwrap();
	assert!(!form.is_valid());
	assert_eq!(invalid_count.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_cross_field_rule_revalidates_on_other_fields_change() {
	let mut form = isolated_form();
	let password = form
		.register(FieldSpec::new("password").with_value(json!("hunter2")))
		.unwrap();
	let confirm = form
		.register(
			FieldSpec::new("confirm")
				.with_value(json!("hunter2"))
				.with_validations(ValidationSpec::rule_with_arg("equalsField", "password")),
		)
		.unwrap();
	assert!(form.is_valid());

	// Changing the password, not the confirmation, re-runs the
	// confirmation's validator against the new model.
	form.set_value(password, json!("different")).unwrap();
	assert!(!form.is_valid());
	assert!(!form.field_state(confirm).unwrap().is_valid);

	form.set_value(confirm, json!("different")).unwrap();
	assert!(form.is_valid());
}

#[rstest]
fn test_duplicate_names_last_registered_wins_in_model() {
	let mut form = isolated_form();
	form.register(FieldSpec::new("color").with_value(json!("red")))
		.unwrap();
	let green = form
		.register(FieldSpec::new("color").with_value(json!("green")))
		.unwrap();

	let model = form.model();
	assert_eq!(model.len(), 1);
	assert_eq!(model.get("color"), Some(&json!("green")));

	// Unmounting the winner exposes the earlier registrant again.
	form.unregister(green).unwrap();
	assert_eq!(form.model().get("color"), Some(&json!("red")));
}

#[rstest]
fn test_mount_unmount_sequences_keep_model_consistent() {
	let mut form = isolated_form();
	let a = form
		.register(FieldSpec::new("a").with_value(json!(1)))
		.unwrap();
	let b = form
		.register(FieldSpec::new("b").with_value(json!(2)))
		.unwrap();
	form.unregister(a).unwrap();
	let c = form
		.register(FieldSpec::new("c").with_value(json!(3)))
		.unwrap();

	let model = form.model();
	assert_eq!(model.len(), 2);
	assert!(!model.contains_key("a"));
	assert_eq!(model.get("b"), Some(&json!(2)));
	assert_eq!(model.get("c"), Some(&json!(3)));

	form.unregister(b).unwrap();
	form.unregister(c).unwrap();
	assert!(form.model().is_empty());
}

#[rstest]
fn test_dot_notation_names_nest() {
	let mut form = isolated_form();
	form.register(FieldSpec::new("a.b").with_value(json!(1)))
		.unwrap();
	form.register(FieldSpec::new("a.c").with_value(json!(2)))
		.unwrap();

	assert_eq!(form.nested_model(), json!({"a": {"b": 1, "c": 2}}));
	// The flat model keeps the dotted keys as-is.
	assert_eq!(form.model().get("a.b"), Some(&json!(1)));
}

#[rstest]
fn test_reset_restores_pristine_values() {
	let mut form = isolated_form();
	let name = form
		.register(FieldSpec::new("name").with_value(json!("John")))
		.unwrap();
	let age = form
		.register(FieldSpec::new("age").with_value(json!(30)))
		.unwrap();

	form.set_value(name, json!("Jane")).unwrap();
	form.set_value(age, json!(31)).unwrap();
	assert!(form.is_changed());
	assert!(!form.is_pristine());

	form.reset(None).unwrap();
	assert_eq!(form.model().get("name"), Some(&json!("John")));
	assert_eq!(form.model().get("age"), Some(&json!(30)));
	assert!(form.is_pristine());
	assert!(!form.is_changed());
}

#[rstest]
fn test_seeded_reset_prefers_seed_entries() {
	let mut form = isolated_form();
	let name = form
		.register(FieldSpec::new("name").with_value(json!("John")))
		.unwrap();
	form.register(FieldSpec::new("age").with_value(json!(30)))
		.unwrap();
	form.set_value(name, json!("Jane")).unwrap();

	form.reset(Some(values(&[("name", json!("Seeded"))]))).unwrap();

	// Seeded name, pristine age.
	assert_eq!(form.model().get("name"), Some(&json!("Seeded")));
	assert_eq!(form.model().get("age"), Some(&json!(30)));
	// The seed differs from pristine, so the form counts as changed.
	assert!(form.is_changed());
}

#[rstest]
fn test_reverting_value_to_pristine_clears_changed() {
	let mut form = isolated_form();
	let id = form
		.register(FieldSpec::new("name").with_value(json!("John")))
		.unwrap();

	form.set_value(id, json!("Jane")).unwrap();
	assert!(form.is_changed());

	form.set_value(id, json!("John")).unwrap();
	assert!(!form.is_changed());
	assert!(form.is_pristine());
}

#[rstest]
fn test_cascade_is_idempotent() {
	let mut form = isolated_form();
	let change_count = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&change_count);
	form.on_change(move |_, _| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	let id = form
		.register(
			FieldSpec::new("email")
				.with_value(json!("a@b.co"))
				.with_validations("isEmail"),
		)
		.unwrap();
	let state_before = form.field_state(id).unwrap();
	let fired_before = change_count.load(Ordering::SeqCst);

	// Re-running the cascade with no effective mutation: same states, no
	// further notifications.
	form.set_value(id, json!("a@b.co")).unwrap();
	assert_eq!(form.field_state(id).unwrap(), state_before);
	assert_eq!(change_count.load(Ordering::SeqCst), fired_before);
}

#[rstest]
fn test_on_change_reports_model_and_changed_flag() {
	let mut form = isolated_form();
	let seen: Arc<parking_lot::Mutex<Vec<(FlatModel, bool)>>> =
		Arc::new(parking_lot::Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	form.on_change(move |model, changed| {
		sink.lock().push((model.clone(), changed));
	});

	let id = form
		.register(FieldSpec::new("a").with_value(json!(1)))
		.unwrap();
	form.set_value(id, json!(2)).unwrap();

	let seen = seen.lock();
	assert_eq!(seen.len(), 2);
	// Mount: model reflects the pristine value, nothing changed yet.
	assert_eq!(seen[0].0.get("a"), Some(&json!(1)));
	assert!(!seen[0].1);
	// Value change: updated model, changed flag set.
	assert_eq!(seen[1].0.get("a"), Some(&json!(2)));
	assert!(seen[1].1);
}

#[rstest]
fn test_on_change_fires_for_mount_and_unmount() {
	let mut form = isolated_form();
	let change_count = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&change_count);
	form.on_change(move |_, _| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	// A field with no value leaves the flat model empty, but the set of
	// fields changed, so the notification still fires.
	let id = form.register(FieldSpec::new("a")).unwrap();
	assert_eq!(change_count.load(Ordering::SeqCst), 1);

	form.unregister(id).unwrap();
	assert_eq!(change_count.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_required_shorthand_invalidates_missing_value() {
	let mut form = isolated_form();
	let id = form.register(FieldSpec::new("name").required()).unwrap();

	// No value on an unconditionally required field: required and invalid.
	let state = form.field_state(id).unwrap();
	assert!(state.is_required);
	assert!(!state.is_valid);
	assert!(!form.is_valid());

	form.set_value(id, json!("Ada")).unwrap();
	let state = form.field_state(id).unwrap();
	assert!(state.is_required);
	assert!(state.is_valid);
	assert!(form.is_valid());
}

#[rstest]
fn test_external_error_invalidates_and_recovers() {
	let mut form = isolated_form();
	let id = form
		.register(
			FieldSpec::new("name")
				.with_value(json!("taken-name"))
				.with_validations(ValidationSpec::rule_with_arg("minLength", 3)),
		)
		.unwrap();
	assert!(form.is_valid());

	form.update_inputs_with_error(errors(&[("name", "already taken")]), true)
		.unwrap();
	assert!(!form.is_valid());
	assert_eq!(
		form.field_state(id).unwrap().error.as_deref(),
		Some("already taken")
	);

	// Clearing the external error by writing a value recovers validity
	// because the underlying validation still passes.
	form.update_inputs_with_value(values(&[("name", json!("other-name"))]), true)
		.unwrap();
	assert!(form.is_valid());
	assert_eq!(form.field_state(id).unwrap().error, None);
}

#[rstest]
fn test_update_inputs_with_error_addressing_error() {
	let mut form = isolated_form();
	form.register(FieldSpec::new("a").with_value(json!(1)))
		.unwrap();

	let err = form
		.update_inputs_with_error(errors(&[("ghost", "boo")]), true)
		.unwrap_err();
	assert_eq!(
		err,
		FormError::UnknownFields {
			names: vec!["ghost".to_string()]
		}
	);
	// Validity is untouched by the failed addressing.
	assert!(form.is_valid());
}

#[rstest]
fn test_update_inputs_with_value_unknown_name_is_not_silent() {
	let mut form = isolated_form();
	let result = form.update_inputs_with_value(values(&[("missingField", json!(1))]), true);
	assert!(matches!(result, Err(FormError::UnknownFields { .. })));
}

#[rstest]
fn test_valid_submit_receives_model_and_reset_capability() {
	let mut form = isolated_form();
	let submitted: Arc<parking_lot::Mutex<Option<FlatModel>>> =
		Arc::new(parking_lot::Mutex::new(None));
	let sink = Arc::clone(&submitted);
	form.on_valid_submit(move |model, form| {
		*sink.lock() = Some(model.clone());
		// Use the reset capability handed to the callback.
		form.reset(None).expect("reset in submit callback");
	});

	let id = form
		.register(FieldSpec::new("name").with_value(json!("John")))
		.unwrap();
	form.set_value(id, json!("Jane")).unwrap();
	form.submit();

	let submitted = submitted.lock();
	assert_eq!(
		submitted.as_ref().and_then(|m| m.get("name")),
		Some(&json!("Jane"))
	);
	// The callback's reset took effect.
	assert_eq!(form.model().get("name"), Some(&json!("John")));
	assert!(form.is_pristine());
}

#[rstest]
fn test_invalid_submit_can_inject_errors() {
	let mut form = isolated_form();
	form.on_invalid_submit(move |_model, form| {
		form.update_inputs_with_error(
			[("email".to_string(), "fix this first".to_string())].into(),
			true,
		)
		.expect("email is registered");
	});

	let id = form
		.register(
			FieldSpec::new("email")
				.with_value(json!("broken"))
				.with_validations("isEmail"),
		)
		.unwrap();
	assert!(!form.is_valid());

	form.submit();
	assert_eq!(
		form.field_state(id).unwrap().error.as_deref(),
		Some("fix this first")
	);
}

#[rstest]
fn test_prevent_external_invalidation_with_config_map() {
	let mut form = Form::with_registry_and_options(
		Arc::new(RuleRegistry::with_builtins()),
		FormOptions::new()
			.with_validation_errors(errors(&[("email", "server-side complaint")]))
			.prevent_external_invalidation(),
	);
	let id = form
		.register(FieldSpec::new("email").with_value(json!("a@b.co")))
		.unwrap();

	// The configured message displays on the named field without costing
	// validity.
	assert!(form.is_valid());
	let state = form.field_state(id).unwrap();
	assert!(state.is_valid);
	assert_eq!(state.error.as_deref(), Some("server-side complaint"));
}

#[rstest]
fn test_rule_registry_overwrite_affects_running_form() {
	let registry = Arc::new(RuleRegistry::with_builtins());
	let mut form = Form::with_registry(Arc::clone(&registry));
	let id = form
		.register(
			FieldSpec::new("code")
				.with_value(json!("xyz"))
				.with_validations("isAlpha"),
		)
		.unwrap();
	assert!(form.is_valid());

	// Rules resolve fresh each cascade, so an overwrite takes effect on the
	// next mutation.
	registry.add_rule("isAlpha", |_, _, _| "nothing passes anymore".into());
	form.set_value(id, json!("abc")).unwrap();
	assert!(!form.is_valid());
	assert_eq!(
		form.field_state(id).unwrap().error.as_deref(),
		Some("nothing passes anymore")
	);
}
