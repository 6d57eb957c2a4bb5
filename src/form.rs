//! Form coordinator
//!
//! Owns the registration table, drives the validation cascade on every
//! relevant mutation, tracks aggregate validity and pristine/changed state,
//! and exposes the imperative operations a host calls: submit, reset,
//! update-by-value, update-by-error.
//!
//! Every mutation runs one atomic cascade to completion before returning:
//! rebuild the flat model, re-run every field's validator against it (one
//! field's value can appear in another's rule), recompute aggregate state,
//! then notify. No partial state is observable between those steps.

use crate::field::{FieldId, FieldRecord, FieldSpec, FieldState};
use crate::model::{self, FlatModel};
use crate::rules::{RuleError, RuleRegistry, default_registry};
use crate::table::FieldTable;
use crate::validator::{self, DEFAULT_REQUIRED_ERROR, ValidDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Coordinator-level caller errors.
///
/// Validation failures are field state and submission failures are callback
/// outcomes; neither is ever an `Err`. These variants cover configuration
/// errors (unknown rule names) and addressing errors (names or ids with no
/// matching registered field).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
	#[error(transparent)]
	Rule(#[from] RuleError),
	#[error("no registered fields named: {}", .names.join(", "))]
	UnknownFields { names: Vec<String> },
	#[error("no registered field with id {id}")]
	UnknownFieldId { id: FieldId },
}

pub type FormResult<T> = Result<T, FormError>;

type ChangeCallback = Box<dyn FnMut(&FlatModel, bool) + Send>;
type ValidityCallback = Box<dyn FnMut() + Send>;
type SubmitCallback = Box<dyn FnMut(&FlatModel, &mut Form) + Send>;
type ModelMapper = Box<dyn Fn(FlatModel) -> FlatModel + Send + Sync>;

/// Form configuration recognized by the coordinator.
pub struct FormOptions {
	/// Externally supplied per-name error map. Entries surface as the display
	/// error on fields with the matching name, and while the map is non-empty
	/// the form is invalid unless `prevent_external_invalidation` is set.
	pub validation_errors: HashMap<String, String>,
	/// When set, externally injected errors are display-only annotations and
	/// never flip aggregate validity.
	pub prevent_external_invalidation: bool,
	/// Reported back to fields through [`FieldState::is_disabled`].
	pub disabled: bool,
	mapping: Option<ModelMapper>,
}

impl FormOptions {
	pub fn new() -> Self {
		Self {
			validation_errors: HashMap::new(),
			prevent_external_invalidation: false,
			disabled: false,
			mapping: None,
		}
	}

	pub fn with_validation_errors(mut self, errors: HashMap<String, String>) -> Self {
		self.validation_errors = errors;
		self
	}

	pub fn prevent_external_invalidation(mut self) -> Self {
		self.prevent_external_invalidation = true;
		self
	}

	pub fn disabled(mut self) -> Self {
		self.disabled = true;
		self
	}

	/// Pure transform applied to the flat model once per cascade, before it
	/// is handed to `on_change` and the submit callbacks.
	pub fn with_mapping<F>(mut self, mapping: F) -> Self
	where
		F: Fn(FlatModel) -> FlatModel + Send + Sync + 'static,
	{
		self.mapping = Some(Box::new(mapping));
		self
	}
}

impl Default for FormOptions {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for FormOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormOptions")
			.field("validation_errors", &self.validation_errors)
			.field(
				"prevent_external_invalidation",
				&self.prevent_external_invalidation,
			)
			.field("disabled", &self.disabled)
			.field("mapping", &self.mapping.is_some())
			.finish()
	}
}

/// The form coordinator and validation engine.
///
/// # Examples
///
/// ```
/// use formstate::{FieldSpec, Form};
/// use serde_json::json;
///
/// let mut form = Form::new();
/// let email = form
///     .register(FieldSpec::new("email").with_value(json!("a@b.co")).with_validations("isEmail"))
///     .unwrap();
/// assert!(form.is_valid());
///
/// form.set_value(email, json!("not-an-email")).unwrap();
/// assert!(!form.is_valid());
/// ```
pub struct Form {
	registry: Arc<RuleRegistry>,
	table: FieldTable,
	options: FormOptions,
	next_field_id: u64,
	is_valid: bool,
	is_submitting: bool,
	submitted: bool,
	// Snapshot from the previous cascade, for change notification.
	last_model: FlatModel,
	last_ids: Vec<FieldId>,
	change_cb: Option<ChangeCallback>,
	valid_cb: Option<ValidityCallback>,
	invalid_cb: Option<ValidityCallback>,
	valid_submit_cb: Option<SubmitCallback>,
	invalid_submit_cb: Option<SubmitCallback>,
}

impl Form {
	/// Create a form backed by the process-wide default rule registry.
	pub fn new() -> Self {
		Self::with_registry_and_options(default_registry(), FormOptions::default())
	}

	pub fn with_options(options: FormOptions) -> Self {
		Self::with_registry_and_options(default_registry(), options)
	}

	/// Create a form with an injected registry, keeping independent form
	/// instances from interfering through process-wide rule state.
	pub fn with_registry(registry: Arc<RuleRegistry>) -> Self {
		Self::with_registry_and_options(registry, FormOptions::default())
	}

	pub fn with_registry_and_options(registry: Arc<RuleRegistry>, options: FormOptions) -> Self {
		let is_valid =
			options.validation_errors.is_empty() || options.prevent_external_invalidation;
		Self {
			registry,
			table: FieldTable::new(),
			options,
			next_field_id: 1,
			is_valid,
			is_submitting: false,
			submitted: false,
			last_model: FlatModel::new(),
			last_ids: Vec::new(),
			change_cb: None,
			valid_cb: None,
			invalid_cb: None,
			valid_submit_cb: None,
			invalid_submit_cb: None,
		}
	}

	// ---- callbacks -------------------------------------------------------

	/// Fired after every settled cascade where the mapped flat model or the
	/// set of registered fields differs from the previous cascade. The second
	/// argument reports whether any field differs from its pristine value.
	pub fn on_change<F>(&mut self, callback: F)
	where
		F: FnMut(&FlatModel, bool) + Send + 'static,
	{
		self.change_cb = Some(Box::new(callback));
	}

	/// Fired when aggregate validity flips to valid.
	pub fn on_valid<F>(&mut self, callback: F)
	where
		F: FnMut() + Send + 'static,
	{
		self.valid_cb = Some(Box::new(callback));
	}

	/// Fired when aggregate validity flips to invalid.
	pub fn on_invalid<F>(&mut self, callback: F)
	where
		F: FnMut() + Send + 'static,
	{
		self.invalid_cb = Some(Box::new(callback));
	}

	/// Fired by [`submit`](Self::submit) when the form is valid. The `&mut
	/// Form` argument is the reset/update-errors capability: the callback may
	/// call [`reset`](Self::reset) or
	/// [`update_inputs_with_error`](Self::update_inputs_with_error) on it.
	pub fn on_valid_submit<F>(&mut self, callback: F)
	where
		F: FnMut(&FlatModel, &mut Form) + Send + 'static,
	{
		self.valid_submit_cb = Some(Box::new(callback));
	}

	/// Fired by [`submit`](Self::submit) when the form is invalid.
	pub fn on_invalid_submit<F>(&mut self, callback: F)
	where
		F: FnMut(&FlatModel, &mut Form) + Send + 'static,
	{
		self.invalid_submit_cb = Some(Box::new(callback));
	}

	// ---- registration ----------------------------------------------------

	/// Register a field and run a full cascade.
	///
	/// Every rule name in the field's validation specs is resolved against
	/// the registry up front, so an unresolvable name fails here, at
	/// validation-setup time, rather than being silently treated as valid or
	/// invalid later.
	pub fn register(&mut self, spec: FieldSpec) -> FormResult<FieldId> {
		let rule_names = spec
			.validations
			.iter()
			.chain(spec.required_validations.iter())
			.flat_map(|s| s.rule_names());
		for name in rule_names {
			self.registry.resolve(name)?;
		}

		let id = FieldId(self.next_field_id);
		self.next_field_id += 1;
		self.table.register(FieldRecord::from_spec(id, spec));
		self.run_cascade()?;
		Ok(id)
	}

	/// Remove a field permanently and run a full cascade.
	pub fn unregister(&mut self, id: FieldId) -> FormResult<()> {
		self.table
			.unregister(id)
			.ok_or(FormError::UnknownFieldId { id })?;
		self.run_cascade()
	}

	// ---- value mutation --------------------------------------------------

	/// Set one field's value by identity. Clears any injected external error
	/// on that field and runs a full cascade.
	pub fn set_value(&mut self, id: FieldId, value: impl Into<Value>) -> FormResult<()> {
		let record = self
			.table
			.get_mut(id)
			.ok_or(FormError::UnknownFieldId { id })?;
		record.value = Some(value.into());
		record.external_error = None;
		self.run_cascade()
	}

	/// Clear one field's value (back to "no value supplied").
	pub fn clear_value(&mut self, id: FieldId) -> FormResult<()> {
		let record = self
			.table
			.get_mut(id)
			.ok_or(FormError::UnknownFieldId { id })?;
		record.value = None;
		record.external_error = None;
		self.run_cascade()
	}

	/// Overwrite values by field name. Every record sharing a name is
	/// addressed; a name matching no registered field is an addressing error.
	///
	/// Matched entries are applied (and validated, when `validate` is set)
	/// even when some names fail to match, so the returned error reports a
	/// partial update rather than a rolled-back one.
	pub fn update_inputs_with_value(
		&mut self,
		values: HashMap<String, Value>,
		validate: bool,
	) -> FormResult<()> {
		let mut unknown = Vec::new();
		for (name, value) in values {
			let ids = self.table.ids_by_name(&name);
			if ids.is_empty() {
				unknown.push(name);
				continue;
			}
			for id in ids {
				if let Some(record) = self.table.get_mut(id) {
					record.value = Some(value.clone());
					record.external_error = None;
				}
			}
		}
		if validate {
			self.run_cascade()?;
		}
		if unknown.is_empty() {
			Ok(())
		} else {
			unknown.sort();
			Err(FormError::UnknownFields { names: unknown })
		}
	}

	// ---- external errors -------------------------------------------------

	/// Inject external errors by field name.
	///
	/// While present, an external error takes display precedence over the
	/// internally computed one. With `invalidate` set and
	/// `prevent_external_invalidation` unconfigured, aggregate validity drops
	/// immediately, without waiting for a field-level revalidation pass.
	/// Unmatched names are the same addressing-error class as
	/// [`update_inputs_with_value`](Self::update_inputs_with_value).
	pub fn update_inputs_with_error(
		&mut self,
		errors: HashMap<String, String>,
		invalidate: bool,
	) -> FormResult<()> {
		let prevent = self.options.prevent_external_invalidation;
		let mut unknown = Vec::new();
		for (name, message) in errors {
			let ids = self.table.ids_by_name(&name);
			if ids.is_empty() {
				unknown.push(name);
				continue;
			}
			for id in ids {
				if let Some(record) = self.table.get_mut(id) {
					record.external_error = Some(message.clone());
					record.error = Some(message.clone());
					if invalidate && !prevent {
						record.is_valid = false;
					}
				}
			}
		}
		let aggregate = self.compute_aggregate();
		self.apply_validity(aggregate);
		if unknown.is_empty() {
			Ok(())
		} else {
			unknown.sort();
			Err(FormError::UnknownFields { names: unknown })
		}
	}

	/// Replace the externally supplied validation-errors map and run a full
	/// cascade so the new messages surface on matching fields.
	pub fn set_validation_errors(&mut self, errors: HashMap<String, String>) -> FormResult<()> {
		self.options.validation_errors = errors;
		self.run_cascade()
	}

	// ---- submit / reset --------------------------------------------------

	/// Submit synchronously: snapshot the mapped model and invoke the valid
	/// or invalid submit callback with it. Submission marks the form no
	/// longer pristine.
	pub fn submit(&mut self) {
		self.is_submitting = true;
		self.submitted = true;
		let model = self.map_model(model::build_flat(&self.table));
		let valid = self.is_valid;
		tracing::debug!(valid, fields = self.table.len(), "form submitted");

		// Taken out of self so the callback can mutate the form (reset,
		// inject errors) without aliasing it.
		if valid {
			if let Some(mut callback) = self.valid_submit_cb.take() {
				callback(&model, self);
				self.valid_submit_cb.get_or_insert(callback);
			}
		} else if let Some(mut callback) = self.invalid_submit_cb.take() {
			callback(&model, self);
			self.invalid_submit_cb.get_or_insert(callback);
		}
		self.is_submitting = false;
	}

	/// Reset every field toward its pristine value.
	///
	/// With a seed, a field whose name appears in it takes the seed value
	/// instead. External errors, the injected validation-errors map, and the
	/// submitted flag all clear; then a full cascade runs.
	pub fn reset(&mut self, seed: Option<HashMap<String, Value>>) -> FormResult<()> {
		tracing::debug!(seeded = seed.is_some(), "form reset");
		for record in self.table.iter_mut() {
			let seed_value = seed.as_ref().and_then(|s| s.get(record.name()));
			record.reset(seed_value);
		}
		self.options.validation_errors.clear();
		self.submitted = false;
		self.run_cascade()
	}

	// ---- state queries ---------------------------------------------------

	pub fn is_valid(&self) -> bool {
		self.is_valid
	}

	pub fn is_submitting(&self) -> bool {
		self.is_submitting
	}

	pub fn is_disabled(&self) -> bool {
		self.options.disabled
	}

	/// Whether any field's value differs from its pristine value.
	pub fn is_changed(&self) -> bool {
		self.table.iter().any(|r| !r.is_pristine())
	}

	/// True iff no field differs from its pristine value and no submit has
	/// occurred since the last reset.
	pub fn is_pristine(&self) -> bool {
		!self.submitted && !self.is_changed()
	}

	/// The mapped flat model, built fresh.
	pub fn model(&self) -> FlatModel {
		self.map_model(model::build_flat(&self.table))
	}

	/// The nested model (dot-notation names expanded), built fresh.
	pub fn nested_model(&self) -> Value {
		model::build_nested(&self.table)
	}

	/// The `(is_valid, error, is_required)` state computed for one field on
	/// the most recent cascade, plus pristine and disabled reporting.
	pub fn field_state(&self, id: FieldId) -> Option<FieldState> {
		self.table.get(id).map(|record| FieldState {
			is_valid: record.is_valid,
			error: record.error.clone(),
			is_required: record.is_required,
			is_pristine: record.is_pristine(),
			is_disabled: self.options.disabled,
		})
	}

	/// Last-registered record with the given name.
	pub fn find_field(&self, name: &str) -> Option<&FieldRecord> {
		self.table.find_by_name(name)
	}

	pub fn field_count(&self) -> usize {
		self.table.len()
	}

	// ---- cascade ---------------------------------------------------------

	fn run_cascade(&mut self) -> FormResult<()> {
		let model = model::build_flat(&self.table);
		let prevent = self.options.prevent_external_invalidation;
		let configured_errors = self.options.validation_errors.clone();
		let registry = Arc::clone(&self.registry);

		for record in self.table.iter_mut() {
			let is_required = validator::evaluate_required(
				&registry,
				&model,
				record.value(),
				record.required_validations.as_ref(),
			)?;

			// Required-ness gates emptiness: a missing value is invalid iff
			// required, and content rules never run on it.
			let internal = if record.value().is_none() {
				if is_required {
					ValidDescriptor::invalid(DEFAULT_REQUIRED_ERROR)
				} else {
					ValidDescriptor::valid()
				}
			} else {
				match &record.validations {
					Some(spec) => validator::evaluate(&registry, &model, record.value(), spec)?,
					None => ValidDescriptor::valid(),
				}
			};

			record.is_required = is_required;
			// An injected per-field error takes precedence over a configured
			// validation-errors entry for the same name.
			let external = record
				.external_error
				.clone()
				.or_else(|| configured_errors.get(record.name()).cloned());
			match (external, prevent) {
				(Some(external), false) => {
					record.is_valid = false;
					record.error = Some(external);
				}
				(Some(external), true) => {
					// Display-only annotation.
					record.is_valid = internal.is_valid;
					record.error = Some(external);
				}
				(None, _) => {
					record.is_valid = internal.is_valid;
					record.error = internal.error;
				}
			}
		}

		let aggregate = self.compute_aggregate();
		self.apply_validity(aggregate);
		self.notify_change(model);
		Ok(())
	}

	fn compute_aggregate(&self) -> bool {
		let fields_valid = self.table.iter().all(|r| r.is_valid);
		let external_ok = self.options.validation_errors.is_empty()
			|| self.options.prevent_external_invalidation;
		fields_valid && external_ok
	}

	fn apply_validity(&mut self, aggregate: bool) {
		if aggregate == self.is_valid {
			return;
		}
		self.is_valid = aggregate;
		tracing::debug!(is_valid = aggregate, "aggregate validity flipped");
		let callback = if aggregate {
			self.valid_cb.as_mut()
		} else {
			self.invalid_cb.as_mut()
		};
		if let Some(callback) = callback {
			callback();
		}
	}

	fn notify_change(&mut self, model: FlatModel) {
		let mapped = self.map_model(model);
		let ids: Vec<FieldId> = self.table.iter().map(|r| r.id()).collect();
		if mapped == self.last_model && ids == self.last_ids {
			return;
		}
		let changed = self.is_changed();
		tracing::trace!(fields = ids.len(), changed, "model changed");
		if let Some(callback) = self.change_cb.as_mut() {
			callback(&mapped, changed);
		}
		self.last_model = mapped;
		self.last_ids = ids;
	}

	fn map_model(&self, flat: FlatModel) -> FlatModel {
		match &self.options.mapping {
			Some(mapping) => mapping(flat),
			None => flat,
		}
	}
}

impl Default for Form {
	fn default() -> Self {
		Self::new()
	}
}
