//! Route pattern tokenizer and segment matcher.
//!
//! A pattern such as `/posts/:id/:slug?/*` is split on `/` into typed tokens:
//!
//! | segment | token |
//! |---|---|
//! | `posts` | static |
//! | `:id` | required param `id` |
//! | `:slug?` | optional param `slug` |
//! | `*` | wildcard, must be the last segment |
//!
//! A param may carry a static suffix after its name: `:id.json` matches `1.json` with `id = "1"`,
//! and the domain pattern `:tenant.example.com` matches `acme.example.com` with `tenant = "acme"`.
//!
//! Leading and trailing slashes are not significant, `/` compiles to zero tokens.
//!
//! Param values are percent-decoded before matchers see them, so `/posts/a%2Fb` gives `a/b`.

use crate::error::RegistrationError;
use crate::request::RouteParams;
use crate::router::matcher::{CompiledMatcher, Matchers};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde_json::Value;
use std::borrow::Cow;

/// Bytes escaped when a value is written into a single path segment.
const SEGMENT: &AsciiSet =
    &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'%').add(b'/').add(b'<').add(b'>').add(b'?').add(b'`').add(b'{').add(b'}');

/// Key under which wildcard segments are exposed.
pub const WILDCARD_PARAM: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Static,
    Param,
    OptionalParam,
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct Token {
    kind: TokenKind,
    value: String,
    suffix: String,
    matcher: CompiledMatcher,
}

impl Token {
    fn literal(value: &str) -> Self {
        Self { kind: TokenKind::Static, value: value.to_owned(), suffix: String::new(), matcher: CompiledMatcher::default() }
    }

    fn wildcard() -> Self {
        Self {
            kind: TokenKind::Wildcard,
            value: WILDCARD_PARAM.to_owned(),
            suffix: String::new(),
            matcher: CompiledMatcher::default(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The literal for static tokens, the param name for param tokens and `*` for the wildcard.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn matcher(&self) -> &CompiledMatcher {
        &self.matcher
    }

    #[inline]
    pub fn is_param(&self) -> bool {
        matches!(self.kind, TokenKind::Param | TokenKind::OptionalParam)
    }

    /// The decoded param value carried by `segment`, if the segment satisfies this param token.
    #[inline]
    fn param_value<'s>(&self, segment: &'s str) -> Option<Cow<'s, str>> {
        let value = decode_segment(segment.strip_suffix(self.suffix.as_str())?);
        if value.is_empty() || !self.matcher.accepts(&value) {
            return None;
        }
        Some(value)
    }
}

/// Percent-encodes `value` so that it fills exactly one path segment.
pub fn encode_segment(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, SEGMENT).into()
}

#[inline]
fn decode_segment(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment).decode_utf8_lossy()
}

/// Splits a pattern, url path or hostname into segments.
#[inline]
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() { Vec::new() } else { trimmed.split('/').collect() }
}

/// Compiles `pattern` into tokens, attaching the matchers of its params.
///
/// # Errors
///
/// Fails when a param name is used twice, when the wildcard is not the last segment or when a
/// matcher's regular expression cannot be compiled.
pub fn compile(pattern: &str, matchers: &Matchers) -> Result<Vec<Token>, RegistrationError> {
    let segments = split_path(pattern);
    let mut tokens = Vec::with_capacity(segments.len());

    for (index, segment) in segments.iter().enumerate() {
        if *segment == WILDCARD_PARAM {
            if index + 1 != segments.len() {
                return Err(RegistrationError::wildcard_not_last(pattern));
            }
            tokens.push(Token::wildcard());
            continue;
        }

        let Some(rest) = segment.strip_prefix(':') else {
            tokens.push(Token::literal(segment));
            continue;
        };

        let (head, suffix) = rest.find('.').map_or((rest, ""), |dot| rest.split_at(dot));
        let (name, kind) = match head.strip_suffix('?') {
            Some(name) => (name, TokenKind::OptionalParam),
            None => (head, TokenKind::Param),
        };

        if tokens.iter().any(|token: &Token| token.is_param() && token.value == name) {
            return Err(RegistrationError::duplicate_param(name, pattern));
        }

        let matcher = match matchers.get(name) {
            Some(matcher) => matcher.compile(name)?,
            None => CompiledMatcher::default(),
        };

        tokens.push(Token { kind, value: name.to_owned(), suffix: suffix.to_owned(), matcher });
    }

    Ok(tokens)
}

/// Compiles `pattern` without any matcher.
pub fn parse(pattern: &str) -> Result<Vec<Token>, RegistrationError> {
    compile(pattern, &Matchers::new())
}

/// Returns true when every segment satisfies the tokens.
pub fn matches(segments: &[&str], tokens: &[Token]) -> bool {
    for (index, token) in tokens.iter().enumerate() {
        let segment = segments.get(index);
        let satisfied = match (token.kind, segment) {
            // consumes every remaining segment, at least one
            (TokenKind::Wildcard, segment) => return segment.is_some(),
            (TokenKind::Static, Some(segment)) => token.value == *segment,
            (TokenKind::Param | TokenKind::OptionalParam, Some(segment)) => token.param_value(segment).is_some(),
            (TokenKind::OptionalParam, None) => true,
            (TokenKind::Static | TokenKind::Param, None) => false,
        };

        if !satisfied {
            return false;
        }
    }

    segments.len() <= tokens.len()
}

/// Extracts the param values of segments already accepted by [`matches`].
pub fn extract(segments: &[&str], tokens: &[Token]) -> RouteParams {
    let mut params = RouteParams::empty();

    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Static => {}
            TokenKind::Wildcard => {
                let rest = segments.get(index..).unwrap_or_default();
                let values = rest.iter().map(|segment| Value::String(decode_segment(segment).into_owned())).collect();
                params.insert(WILDCARD_PARAM, Value::Array(values));
                break;
            }
            TokenKind::Param | TokenKind::OptionalParam => {
                if let Some(value) = segments.get(index).and_then(|segment| token.param_value(segment)) {
                    params.insert(token.value.clone(), token.matcher.apply(&value));
                }
            }
        }
    }

    params
}
