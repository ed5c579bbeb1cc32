//! Per-param matchers and casters.
//!
//! A [`ParamMatcher`] pairs an optional regular expression, tested against a param value when the
//! segment is present, with an optional caster that turns the matched string into a
//! [`serde_json::Value`].
//!
//! ```
//! use micro_router::router::matcher::{self, ParamMatcher};
//!
//! let by_id = matcher::number();
//! let by_code = ParamMatcher::regex("^[A-Z]{3}$");
//! ```

use crate::error::RegistrationError;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns a matched param value into an arbitrary value.
pub type Caster = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Matchers keyed by param name.
pub type Matchers = HashMap<String, ParamMatcher>;

#[derive(Clone, Default)]
pub struct ParamMatcher {
    pattern: Option<MatcherPattern>,
    cast: Option<Caster>,
}

#[derive(Clone)]
enum MatcherPattern {
    // compiled at commit so that a malformed expression fails before any request is served
    Source(String),
    Compiled(Regex),
}

impl ParamMatcher {
    /// A matcher that tests values against the given regular expression source.
    pub fn regex(source: impl Into<String>) -> Self {
        Self { pattern: Some(MatcherPattern::Source(source.into())), cast: None }
    }

    /// A matcher that only casts values.
    pub fn cast<F>(f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        Self { pattern: None, cast: Some(Arc::new(f)) }
    }

    /// Attaches a caster to this matcher.
    #[must_use]
    pub fn with_cast<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.cast = Some(Arc::new(f));
        self
    }

    pub(crate) fn compile(&self, param: &str) -> Result<CompiledMatcher, RegistrationError> {
        let regex = match &self.pattern {
            None => None,
            Some(MatcherPattern::Compiled(regex)) => Some(regex.clone()),
            Some(MatcherPattern::Source(source)) => {
                Some(Regex::new(source).map_err(|e| RegistrationError::invalid_matcher(param, e))?)
            }
        };
        Ok(CompiledMatcher { regex, cast: self.cast.clone() })
    }
}

impl From<&str> for ParamMatcher {
    fn from(source: &str) -> Self {
        Self::regex(source)
    }
}

impl From<String> for ParamMatcher {
    fn from(source: String) -> Self {
        Self::regex(source)
    }
}

impl From<Regex> for ParamMatcher {
    fn from(regex: Regex) -> Self {
        Self { pattern: Some(MatcherPattern::Compiled(regex)), cast: None }
    }
}

impl fmt::Debug for ParamMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pattern = match &self.pattern {
            None => None,
            Some(MatcherPattern::Source(source)) => Some(source.as_str()),
            Some(MatcherPattern::Compiled(regex)) => Some(regex.as_str()),
        };
        f.debug_struct("ParamMatcher").field("pattern", &pattern).field("cast", &self.cast.is_some()).finish()
    }
}

/// A matcher ready to be used by the match engine.
#[derive(Clone, Default)]
pub struct CompiledMatcher {
    regex: Option<Regex>,
    cast: Option<Caster>,
}

impl CompiledMatcher {
    #[inline]
    pub fn accepts(&self, value: &str) -> bool {
        self.regex.as_ref().is_none_or(|regex| regex.is_match(value))
    }

    #[inline]
    pub fn apply(&self, value: &str) -> Value {
        match &self.cast {
            Some(cast) => cast(value),
            None => Value::String(value.to_owned()),
        }
    }

    pub fn has_regex(&self) -> bool {
        self.regex.is_some()
    }
}

impl fmt::Debug for CompiledMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMatcher")
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .field("cast", &self.cast.is_some())
            .finish()
    }
}

/// Matches unsigned integers and casts them to numbers.
pub fn number() -> ParamMatcher {
    ParamMatcher::regex("^[0-9]+$").with_cast(|value| {
        if let Ok(number) = value.parse::<u64>() {
            return Value::from(number);
        }
        value
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(value.to_owned()), Value::Number)
    })
}

/// Matches uuids (any version) and casts them to lower case.
pub fn uuid() -> ParamMatcher {
    ParamMatcher::regex("^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .with_cast(|value| Value::String(value.to_lowercase()))
}

/// Matches url slugs such as `hello-world`.
pub fn slug() -> ParamMatcher {
    ParamMatcher::regex("^[a-z0-9]+(?:[-_][a-z0-9]+)*$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_matcher() {
        let matcher = number().compile("id").unwrap();
        assert!(matcher.accepts("42"));
        assert!(!matcher.accepts("4a"));
        assert_eq!(matcher.apply("42"), Value::from(42_u64));
    }

    #[test]
    fn test_uuid_matcher_casts_to_lower_case() {
        let matcher = uuid().compile("id").unwrap();
        let value = "8C0F1D4E-3E8B-4C51-9B4A-2B1E0F6A7C3D";
        assert!(matcher.accepts(value));
        assert_eq!(matcher.apply(value), Value::String(value.to_lowercase()));
        assert!(!matcher.accepts("not-a-uuid"));
    }

    #[test]
    fn test_slug_matcher() {
        let matcher = slug().compile("slug").unwrap();
        assert!(matcher.accepts("hello-world"));
        assert!(!matcher.accepts("-hello"));
        assert!(!matcher.accepts("hello--world"));
    }

    #[test]
    fn test_malformed_regex_fails_at_compile() {
        let error = ParamMatcher::regex("([0-9]+").compile("id").unwrap_err();
        assert!(matches!(error, RegistrationError::InvalidMatcher { ref param, .. } if param == "id"));
    }

    #[test]
    fn test_matcher_without_regex_accepts_everything() {
        let matcher = ParamMatcher::cast(|value| Value::from(value.len())).compile("name").unwrap();
        assert!(matcher.accepts("anything"));
        assert!(!matcher.has_regex());
        assert_eq!(matcher.apply("four"), Value::from(4));
    }
}
