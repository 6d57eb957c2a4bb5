//! Per-field validation spec and evaluator
//!
//! A [`ValidationSpec`] names the rules a field runs each cascade; the
//! evaluator resolves each rule against a [`RuleRegistry`] and folds the
//! outcomes into a single [`ValidDescriptor`].

use crate::model::FlatModel;
use crate::rules::{RuleError, RuleOutcome, RulePredicate, RuleRegistry};
use serde_json::Value;
use std::fmt;

/// Default message for a failing rule that produced no message of its own.
pub const DEFAULT_VALIDATION_ERROR: &str = "This value is not valid";

/// Default message for a required field with no value.
pub const DEFAULT_REQUIRED_ERROR: &str = "This field is required";

/// What a field runs each validation pass.
///
/// All multi-rule shapes have AND semantics: every rule must pass. Evaluation
/// runs in spec order and stops at the first failure, so the reported message
/// is the first one produced.
#[derive(Clone)]
pub enum ValidationSpec {
	/// A single named rule.
	SingleRule(String),
	/// Several named rules, all of which must pass.
	RuleList(Vec<String>),
	/// Named rules with a per-rule argument, e.g. `minLength` → `4`.
	RuleArgMap(Vec<(String, Value)>),
	/// An inline predicate, bypassing the registry.
	Predicate(RulePredicate),
}

impl ValidationSpec {
	/// Parse a comma-separated rule-name spec.
	///
	/// A spec with no rule names (`""` or bare commas) parses to an empty
	/// rule list, which passes every value. Misspelled rule names are caught
	/// at field registration, not here.
	///
	/// # Examples
	///
	/// ```
	/// use formstate::ValidationSpec;
	///
	/// let spec = ValidationSpec::parse("isEmail");
	/// assert_eq!(spec.rule_names(), vec!["isEmail"]);
	///
	/// let spec = ValidationSpec::parse("isAlpha,minLength");
	/// assert_eq!(spec.rule_names(), vec!["isAlpha", "minLength"]);
	/// ```
	pub fn parse(spec: &str) -> Self {
		let names: Vec<String> = spec
			.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect();
		match names.len() {
			1 => ValidationSpec::SingleRule(names.into_iter().next().unwrap_or_default()),
			_ => ValidationSpec::RuleList(names),
		}
	}

	/// A single rule with an argument.
	pub fn rule_with_arg(name: impl Into<String>, arg: impl Into<Value>) -> Self {
		ValidationSpec::RuleArgMap(vec![(name.into(), arg.into())])
	}

	/// Several rules with arguments, evaluated in the given order.
	pub fn rules_with_args(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
		ValidationSpec::RuleArgMap(pairs.into_iter().collect())
	}

	/// An inline predicate: `(model, field value, arg) -> outcome`.
	pub fn predicate<F>(f: F) -> Self
	where
		F: Fn(&FlatModel, Option<&Value>, Option<&Value>) -> RuleOutcome + Send + Sync + 'static,
	{
		ValidationSpec::Predicate(std::sync::Arc::new(f))
	}

	/// Rule names referenced by this spec, in evaluation order.
	///
	/// Used for configuration checking at field registration time; an inline
	/// predicate references no names.
	pub fn rule_names(&self) -> Vec<&str> {
		match self {
			ValidationSpec::SingleRule(name) => vec![name.as_str()],
			ValidationSpec::RuleList(names) => names.iter().map(String::as_str).collect(),
			ValidationSpec::RuleArgMap(pairs) => {
				pairs.iter().map(|(name, _)| name.as_str()).collect()
			}
			ValidationSpec::Predicate(_) => vec![],
		}
	}
}

impl fmt::Debug for ValidationSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationSpec::SingleRule(name) => f.debug_tuple("SingleRule").field(name).finish(),
			ValidationSpec::RuleList(names) => f.debug_tuple("RuleList").field(names).finish(),
			ValidationSpec::RuleArgMap(pairs) => f.debug_tuple("RuleArgMap").field(pairs).finish(),
			ValidationSpec::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

impl From<&str> for ValidationSpec {
	fn from(spec: &str) -> Self {
		ValidationSpec::parse(spec)
	}
}

impl From<String> for ValidationSpec {
	fn from(spec: String) -> Self {
		ValidationSpec::parse(&spec)
	}
}

/// Result of validating one field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidDescriptor {
	pub is_valid: bool,
	pub error: Option<String>,
}

impl ValidDescriptor {
	pub fn valid() -> Self {
		Self {
			is_valid: true,
			error: None,
		}
	}

	pub fn invalid(error: impl Into<String>) -> Self {
		Self {
			is_valid: false,
			error: Some(error.into()),
		}
	}
}

/// Evaluate `spec` for a field with `value` against the current `model`.
///
/// Rules are resolved fresh on every evaluation so registry overwrites take
/// effect immediately. An unknown rule name is a configuration error, never a
/// silent pass or fail.
pub fn evaluate(
	registry: &RuleRegistry,
	model: &FlatModel,
	value: Option<&Value>,
	spec: &ValidationSpec,
) -> Result<ValidDescriptor, RuleError> {
	match spec {
		ValidationSpec::SingleRule(name) => {
			run_named(registry, model, value, std::slice::from_ref(name))
		}
		ValidationSpec::RuleList(names) => run_named(registry, model, value, names),
		ValidationSpec::RuleArgMap(pairs) => {
			for (name, arg) in pairs {
				let rule = registry.resolve(name)?;
				match rule(model, value, Some(arg)) {
					RuleOutcome::Pass => {}
					outcome => return Ok(descriptor_for(outcome)),
				}
			}
			Ok(ValidDescriptor::valid())
		}
		ValidationSpec::Predicate(rule) => Ok(descriptor_for(rule(model, value, None))),
	}
}

/// Decide required-ness: the field is required iff a spec is present and it
/// evaluates valid against the current model.
pub fn evaluate_required(
	registry: &RuleRegistry,
	model: &FlatModel,
	value: Option<&Value>,
	spec: Option<&ValidationSpec>,
) -> Result<bool, RuleError> {
	match spec {
		Some(spec) => Ok(evaluate(registry, model, value, spec)?.is_valid),
		None => Ok(false),
	}
}

fn run_named(
	registry: &RuleRegistry,
	model: &FlatModel,
	value: Option<&Value>,
	names: &[String],
) -> Result<ValidDescriptor, RuleError> {
	for name in names {
		let rule = registry.resolve(name)?;
		match rule(model, value, None) {
			RuleOutcome::Pass => {}
			outcome => return Ok(descriptor_for(outcome)),
		}
	}
	Ok(ValidDescriptor::valid())
}

fn descriptor_for(outcome: RuleOutcome) -> ValidDescriptor {
	match outcome {
		RuleOutcome::Pass => ValidDescriptor::valid(),
		RuleOutcome::Fail => ValidDescriptor::invalid(DEFAULT_VALIDATION_ERROR),
		RuleOutcome::Message(message) => ValidDescriptor::invalid(message),
	}
}
