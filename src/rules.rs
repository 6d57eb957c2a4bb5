//! Named validation rule registry
//!
//! Rules are predicates looked up by name when a field's validation spec is
//! evaluated. A registry is shared between form instances via [`Arc`]; the
//! process-wide [`default_registry`] comes preloaded with the built-in rules.

pub mod builtin;

use crate::model::FlatModel;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Rule resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
	#[error("unknown validation rule `{name}`")]
	UnknownRule { name: String },
}

/// Result of running a single rule predicate.
///
/// Mirrors the three outcomes a rule can produce: valid, invalid with the
/// default message, or invalid with a rule-supplied message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
	Pass,
	Fail,
	Message(String),
}

impl RuleOutcome {
	pub fn is_pass(&self) -> bool {
		matches!(self, RuleOutcome::Pass)
	}
}

impl From<bool> for RuleOutcome {
	fn from(valid: bool) -> Self {
		if valid { RuleOutcome::Pass } else { RuleOutcome::Fail }
	}
}

impl From<String> for RuleOutcome {
	fn from(message: String) -> Self {
		RuleOutcome::Message(message)
	}
}

impl From<&str> for RuleOutcome {
	fn from(message: &str) -> Self {
		RuleOutcome::Message(message.to_string())
	}
}

/// A rule predicate: `(model, field value, rule argument) -> outcome`.
///
/// The model argument carries every registered field's current value, so a
/// rule may read other fields (cross-field validation). `None` for the value
/// means the field has no value supplied.
pub type RulePredicate =
	Arc<dyn Fn(&FlatModel, Option<&Value>, Option<&Value>) -> RuleOutcome + Send + Sync>;

/// Named rule table shared between forms.
///
/// Registration overwrites silently (last registration wins) so hosts can
/// replace built-ins. Lookups of unknown names are a caller-visible error,
/// never a silent pass.
///
/// # Examples
///
/// ```
/// use formstate::rules::{RuleRegistry, RuleOutcome};
///
/// let registry = RuleRegistry::new();
/// registry.add_rule("isAnswer", |_model, value, _arg| {
///     RuleOutcome::from(value.and_then(|v| v.as_i64()) == Some(42))
/// });
///
/// assert!(registry.resolve("isAnswer").is_ok());
/// assert!(registry.resolve("missing").is_err());
/// ```
pub struct RuleRegistry {
	rules: RwLock<HashMap<String, RulePredicate>>,
}

impl RuleRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self {
			rules: RwLock::new(HashMap::new()),
		}
	}

	/// Create a registry preloaded with the built-in rule set.
	///
	/// # Examples
	///
	/// ```
	/// use formstate::rules::RuleRegistry;
	///
	/// let registry = RuleRegistry::with_builtins();
	/// assert!(registry.contains("isEmail"));
	/// ```
	pub fn with_builtins() -> Self {
		let registry = Self::new();
		builtin::install(&registry);
		registry
	}

	/// Register or overwrite a named rule. Last registration wins.
	pub fn add_rule<F>(&self, name: impl Into<String>, rule: F)
	where
		F: Fn(&FlatModel, Option<&Value>, Option<&Value>) -> RuleOutcome + Send + Sync + 'static,
	{
		let name = name.into();
		tracing::debug!(rule = %name, "registering validation rule");
		self.rules.write().insert(name, Arc::new(rule));
	}

	/// Look up a rule by name.
	pub fn resolve(&self, name: &str) -> Result<RulePredicate, RuleError> {
		self.rules
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| RuleError::UnknownRule {
				name: name.to_string(),
			})
	}

	pub fn contains(&self, name: &str) -> bool {
		self.rules.read().contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.rules.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.read().is_empty()
	}
}

impl Default for RuleRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

// Process-wide registry instance. Lives for the process; there is no teardown.
static DEFAULT_REGISTRY: once_cell::sync::Lazy<Arc<RuleRegistry>> =
	once_cell::sync::Lazy::new(|| Arc::new(RuleRegistry::with_builtins()));

/// The process-wide default registry, preloaded with the built-in rules.
///
/// Forms created with [`crate::Form::new`] share this instance. Tests that
/// must not interfere with each other should construct their own
/// [`RuleRegistry`] and inject it via [`crate::Form::with_registry`].
pub fn default_registry() -> Arc<RuleRegistry> {
	DEFAULT_REGISTRY.clone()
}
