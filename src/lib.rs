//! Form state tracking and validation
//!
//! This crate provides a form coordinator and validation engine:
//! - Dynamic field registration and deregistration at runtime
//! - Aggregate model building, flat and nested (dot-notation paths)
//! - Named validation rules resolved through an injectable registry,
//!   plus comma-separated rule lists, per-rule arguments, and inline
//!   predicates
//! - Cross-field validation: every rule sees the whole model
//! - Pristine/changed tracking against per-field reset baselines
//! - External error injection from the host, with optional suppression of
//!   its effect on aggregate validity
//!
//! Rendering and input capture are deliberately out of scope; a host drives
//! the form through [`Form`]'s imperative operations and observes it through
//! callbacks and [`FieldState`] queries.

pub mod field;
pub mod form;
pub mod model;
pub mod rules;
pub mod table;
pub mod validator;

pub use field::{FieldId, FieldRecord, FieldSpec, FieldState};
pub use form::{Form, FormError, FormOptions, FormResult};
pub use model::FlatModel;
pub use rules::{RuleError, RuleOutcome, RulePredicate, RuleRegistry, default_registry};
pub use validator::{
	DEFAULT_REQUIRED_ERROR, DEFAULT_VALIDATION_ERROR, ValidDescriptor, ValidationSpec,
};
