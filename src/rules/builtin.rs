//! Built-in validation rules
//!
//! The standard rule set preloaded into [`RuleRegistry::with_builtins`]. Hosts
//! may overwrite any of these by name via [`RuleRegistry::add_rule`].
//!
//! Content rules (email, url, length, regexp and friends) pass on a missing or
//! empty-string value: emptiness is the business of required-ness, not of
//! content rules.

use super::{RuleOutcome, RuleRegistry};
use crate::model::FlatModel;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("EMAIL_REGEX: invalid regex pattern")
});

// HTTP/HTTPS URL pattern: valid domain labels (no leading/trailing hyphens),
// optional port, path, query string, and fragment.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^https?://[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]*[a-zA-Z0-9])?)*(:[0-9]{1,5})?(/[^\s?#]*)?(\?[^\s#]*)?(#[^\s]*)?$",
	)
	.expect("URL_REGEX: invalid regex pattern")
});

static ALPHA_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").expect("ALPHA_REGEX: invalid regex pattern"));

static ALPHANUMERIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[0-9A-Za-z]+$").expect("ALPHANUMERIC_REGEX: invalid regex pattern")
});

static WORDS_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("WORDS_REGEX: invalid regex pattern"));

static NUMERIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[-+]?(?:\d*\.)?\d+$").expect("NUMERIC_REGEX: invalid regex pattern")
});

static INT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[-+]?(?:0|[1-9]\d*)$").expect("INT_REGEX: invalid regex pattern")
});

static FLOAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?$")
		.expect("FLOAT_REGEX: invalid regex pattern")
});

fn is_existy(value: Option<&Value>) -> bool {
	matches!(value, Some(v) if !v.is_null())
}

fn is_empty_string(value: Option<&Value>) -> bool {
	matches!(value, Some(Value::String(s)) if s.is_empty())
}

// Content rule over string values: missing, null, and empty-string pass;
// non-string values fail.
fn text_rule(value: Option<&Value>, test: impl Fn(&str) -> bool) -> RuleOutcome {
	match value {
		None | Some(Value::Null) => RuleOutcome::Pass,
		Some(Value::String(s)) if s.is_empty() => RuleOutcome::Pass,
		Some(Value::String(s)) => test(s).into(),
		Some(_) => RuleOutcome::Fail,
	}
}

fn length_rule(
	value: Option<&Value>,
	arg: Option<&Value>,
	cmp: impl Fn(usize, usize) -> bool,
) -> RuleOutcome {
	let Some(expected) = arg.and_then(Value::as_u64) else {
		return RuleOutcome::Message("length rule requires a numeric argument".to_string());
	};
	match value {
		None | Some(Value::Null) => RuleOutcome::Pass,
		Some(Value::String(s)) if s.is_empty() => RuleOutcome::Pass,
		Some(Value::String(s)) => cmp(s.chars().count(), expected as usize).into(),
		Some(_) => RuleOutcome::Fail,
	}
}

fn is_numeric(value: Option<&Value>) -> RuleOutcome {
	match value {
		None | Some(Value::Null) | Some(Value::Number(_)) => RuleOutcome::Pass,
		Some(Value::String(s)) if s.is_empty() => RuleOutcome::Pass,
		Some(Value::String(s)) => NUMERIC_REGEX.is_match(s).into(),
		Some(_) => RuleOutcome::Fail,
	}
}

fn is_int(value: Option<&Value>) -> RuleOutcome {
	match value {
		None | Some(Value::Null) => RuleOutcome::Pass,
		Some(Value::Number(n)) => (n.is_i64() || n.is_u64()).into(),
		Some(Value::String(s)) if s.is_empty() => RuleOutcome::Pass,
		Some(Value::String(s)) => INT_REGEX.is_match(s).into(),
		Some(_) => RuleOutcome::Fail,
	}
}

fn is_float(value: Option<&Value>) -> RuleOutcome {
	match value {
		None | Some(Value::Null) | Some(Value::Number(_)) => RuleOutcome::Pass,
		Some(Value::String(s)) if s.is_empty() => RuleOutcome::Pass,
		Some(Value::String(s)) => FLOAT_REGEX.is_match(s).into(),
		Some(_) => RuleOutcome::Fail,
	}
}

fn equals(value: Option<&Value>, arg: Option<&Value>) -> RuleOutcome {
	if !is_existy(value) || is_empty_string(value) {
		return RuleOutcome::Pass;
	}
	(value == arg).into()
}

fn equals_field(model: &FlatModel, value: Option<&Value>, arg: Option<&Value>) -> RuleOutcome {
	let Some(other) = arg.and_then(Value::as_str) else {
		return RuleOutcome::Message("equalsField requires a field name argument".to_string());
	};
	(value == model.get(other)).into()
}

fn match_regexp(value: Option<&Value>, arg: Option<&Value>) -> RuleOutcome {
	let Some(pattern) = arg.and_then(Value::as_str) else {
		return RuleOutcome::Message("matchRegexp requires a pattern argument".to_string());
	};
	let regexp = match Regex::new(pattern) {
		Ok(r) => r,
		Err(_) => {
			return RuleOutcome::Message(format!("matchRegexp: invalid pattern `{pattern}`"));
		}
	};
	text_rule(value, |s| regexp.is_match(s))
}

/// Install the built-in rule set into `registry`.
pub fn install(registry: &RuleRegistry) {
	registry.add_rule("isDefined", |_, value, _| value.is_some().into());
	registry.add_rule("isUndefined", |_, value, _| value.is_none().into());
	registry.add_rule("isExisty", |_, value, _| is_existy(value).into());
	registry.add_rule("isEmptyString", |_, value, _| {
		is_empty_string(value).into()
	});
	registry.add_rule("isEmail", |_, value, _| {
		text_rule(value, |s| EMAIL_REGEX.is_match(s))
	});
	registry.add_rule("isUrl", |_, value, _| {
		text_rule(value, |s| URL_REGEX.is_match(s))
	});
	registry.add_rule("isTrue", |_, value, _| {
		(value == Some(&Value::Bool(true))).into()
	});
	registry.add_rule("isFalse", |_, value, _| {
		(value == Some(&Value::Bool(false))).into()
	});
	registry.add_rule("isNumeric", |_, value, _| is_numeric(value));
	registry.add_rule("isInt", |_, value, _| is_int(value));
	registry.add_rule("isFloat", |_, value, _| is_float(value));
	registry.add_rule("isAlpha", |_, value, _| {
		text_rule(value, |s| ALPHA_REGEX.is_match(s))
	});
	registry.add_rule("isAlphanumeric", |_, value, _| {
		text_rule(value, |s| ALPHANUMERIC_REGEX.is_match(s))
	});
	registry.add_rule("isWords", |_, value, _| {
		text_rule(value, |s| WORDS_REGEX.is_match(s))
	});
	registry.add_rule("matchRegexp", |_, value, arg| match_regexp(value, arg));
	registry.add_rule("equals", |_, value, arg| equals(value, arg));
	registry.add_rule("equalsField", equals_field);
	registry.add_rule("isLength", |_, value, arg| {
		length_rule(value, arg, |actual, expected| actual == expected)
	});
	registry.add_rule("minLength", |_, value, arg| {
		length_rule(value, arg, |actual, expected| actual >= expected)
	});
	registry.add_rule("maxLength", |_, value, arg| {
		length_rule(value, arg, |actual, expected| actual <= expected)
	});
}
