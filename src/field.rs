//! Field records and registration specs

use crate::rules::RuleOutcome;
use crate::validator::ValidationSpec;
use serde_json::Value;
use std::fmt;

/// Stable field identity, unique for the life of the owning form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) u64);

impl fmt::Display for FieldId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Registration input for one field.
///
/// The name doubles as the model attribute path; dots create nested levels in
/// the nested model (`"address.city"` → `{"address": {"city": …}}`). Names
/// need not be unique (radio groups share one).
///
/// # Examples
///
/// ```
/// use formstate::FieldSpec;
/// use serde_json::json;
///
/// let spec = FieldSpec::new("email")
///     .with_value(json!("a@b.co"))
///     .with_validations("isEmail")
///     .required();
/// assert_eq!(spec.name(), "email");
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
	pub(crate) name: String,
	pub(crate) value: Option<Value>,
	pub(crate) validations: Option<ValidationSpec>,
	pub(crate) required_validations: Option<ValidationSpec>,
}

impl FieldSpec {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: None,
			validations: None,
			required_validations: None,
		}
	}

	/// Set the initial value. It becomes the pristine value at registration.
	pub fn with_value(mut self, value: impl Into<Value>) -> Self {
		self.value = Some(value.into());
		self
	}

	pub fn with_validations(mut self, spec: impl Into<ValidationSpec>) -> Self {
		self.validations = Some(spec.into());
		self
	}

	/// Set the required-validations spec. The field counts as required when
	/// the spec evaluates valid against the current model.
	pub fn with_required(mut self, spec: impl Into<ValidationSpec>) -> Self {
		self.required_validations = Some(spec.into());
		self
	}

	/// Mark the field unconditionally required.
	///
	/// Installs an always-valid required-spec: required-ness must not depend
	/// on the field's own value, or an empty field could talk itself out of
	/// being required.
	pub fn required(self) -> Self {
		self.with_required(ValidationSpec::predicate(|_, _, _| RuleOutcome::Pass))
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

/// One registered field: identity, value, pristine baseline, validation
/// config, injected external error, and the state computed each cascade.
///
/// A record exists iff its field is currently mounted; unregistration removes
/// it permanently.
#[derive(Debug, Clone)]
pub struct FieldRecord {
	pub(crate) id: FieldId,
	pub(crate) name: String,
	pub(crate) value: Option<Value>,
	pub(crate) pristine_value: Option<Value>,
	pub(crate) validations: Option<ValidationSpec>,
	pub(crate) required_validations: Option<ValidationSpec>,
	pub(crate) external_error: Option<String>,
	// Computed each cascade.
	pub(crate) is_valid: bool,
	pub(crate) error: Option<String>,
	pub(crate) is_required: bool,
}

impl FieldRecord {
	pub(crate) fn from_spec(id: FieldId, spec: FieldSpec) -> Self {
		Self {
			id,
			name: spec.name,
			pristine_value: spec.value.clone(),
			value: spec.value,
			validations: spec.validations,
			required_validations: spec.required_validations,
			external_error: None,
			is_valid: true,
			error: None,
			is_required: false,
		}
	}

	pub fn id(&self) -> FieldId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> Option<&Value> {
		self.value.as_ref()
	}

	pub fn pristine_value(&self) -> Option<&Value> {
		self.pristine_value.as_ref()
	}

	pub fn external_error(&self) -> Option<&str> {
		self.external_error.as_deref()
	}

	/// Whether the value equals the pristine baseline, by deep value equality.
	pub fn is_pristine(&self) -> bool {
		self.value == self.pristine_value
	}

	/// Reset toward pristine: take the seed value when provided, else the
	/// pristine value, and drop any injected external error.
	pub(crate) fn reset(&mut self, seed: Option<&Value>) {
		self.value = match seed {
			Some(value) => Some(value.clone()),
			None => self.pristine_value.clone(),
		};
		self.external_error = None;
	}
}

/// Per-field state snapshot handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldState {
	pub is_valid: bool,
	pub error: Option<String>,
	pub is_required: bool,
	pub is_pristine: bool,
	pub is_disabled: bool,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_spec_builder() {
		let spec = FieldSpec::new("age")
			.with_value(json!(30))
			.with_validations("isInt")
			.required();

		assert_eq!(spec.name(), "age");
		assert_eq!(spec.value, Some(json!(30)));
		assert!(spec.validations.is_some());
		assert!(spec.required_validations.is_some());
	}

	#[rstest]
	fn test_record_pristine_tracking() {
		let spec = FieldSpec::new("name").with_value(json!("John"));
		let mut record = FieldRecord::from_spec(FieldId(1), spec);
		assert!(record.is_pristine());

		record.value = Some(json!("Jane"));
		assert!(!record.is_pristine());

		// Manually reverting the value also clears changed-ness.
		record.value = Some(json!("John"));
		assert!(record.is_pristine());
	}

	#[rstest]
	fn test_record_reset_prefers_seed_over_pristine() {
		let spec = FieldSpec::new("name").with_value(json!("John"));
		let mut record = FieldRecord::from_spec(FieldId(1), spec);
		record.value = Some(json!("Jane"));
		record.external_error = Some("server said no".to_string());

		record.reset(Some(&json!("Seeded")));
		assert_eq!(record.value, Some(json!("Seeded")));
		assert_eq!(record.external_error, None);

		record.reset(None);
		assert_eq!(record.value, Some(json!("John")));
	}
}
