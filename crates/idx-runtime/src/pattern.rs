//! Recognizing "property access on null/undefined" errors.
//!
//! The message a JavaScript engine produces when a property is read from
//! `null` or `undefined` differs between engines. Instead of hard-coding one
//! wording, the message is taken from a failed read of
//! `$object$.$property$` with `$object$` set to the sentinel; the result is
//! escaped and both placeholders are widened to `.+`, giving a pattern that
//! matches the same failure on any object and property.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::fmt;

const OBJECT_PLACEHOLDER: &str = "$object$";
const PROPERTY_PLACEHOLDER: &str = "$property$";

/// The two absent values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    Null,
    Undefined,
}

impl Sentinel {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentinel::Null => "null",
            Sentinel::Undefined => "undefined",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engines whose access-failure wording is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// `Cannot read properties of null (reading 'b')`
    #[default]
    V8,
    /// `null is not an object (evaluating 'a.b')`
    JavaScriptCore,
    /// `a is null`
    SpiderMonkey,
}

impl Engine {
    /// The message this engine gives for `$object$.$property$` when
    /// `$object$` holds `sentinel`.
    pub fn access_failure(self, sentinel: Sentinel) -> String {
        match self {
            Engine::V8 => format!(
                "Cannot read properties of {} (reading '{}')",
                sentinel, PROPERTY_PLACEHOLDER
            ),
            Engine::JavaScriptCore => format!(
                "{} is not an object (evaluating '{}.{}')",
                sentinel, OBJECT_PLACEHOLDER, PROPERTY_PLACEHOLDER
            ),
            Engine::SpiderMonkey => format!("{} is {}", OBJECT_PLACEHOLDER, sentinel),
        }
    }
}

/// A compiled pattern for one sentinel.
#[derive(Debug, Clone)]
pub struct AccessPattern {
    sentinel: Sentinel,
    regex: Regex,
}

impl AccessPattern {
    /// Derive the pattern for `sentinel` from the message `fail` returns.
    pub fn derive(
        sentinel: Sentinel,
        fail: impl FnOnce(Sentinel) -> String,
    ) -> Result<Self, regex::Error> {
        let message = fail(sentinel);
        let escaped = regex::escape(&message)
            .replace(&regex::escape(OBJECT_PLACEHOLDER), ".+")
            .replace(&regex::escape(PROPERTY_PLACEHOLDER), ".+");
        Ok(Self {
            sentinel,
            regex: Regex::new(&escaped)?,
        })
    }

    /// Case-insensitive wording-agnostic fallback, e.g. `b is NULL` or
    /// `null has no properties`.
    pub fn loose(sentinel: Sentinel) -> Result<Self, regex::Error> {
        let word = sentinel.as_str();
        let regex = RegexBuilder::new(&format!("^{word} | {word}$|^[^(]* {word} "))
            .case_insensitive(true)
            .build()?;
        Ok(Self { sentinel, regex })
    }

    pub fn sentinel(&self) -> Sentinel {
        self.sentinel
    }

    pub fn is_match(&self, message: &str) -> bool {
        self.regex.is_match(message)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Decides which sentinel, if any, a `TypeError` message is about.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Checked in order; null before undefined.
    patterns: Vec<AccessPattern>,
}

impl Classifier {
    pub fn for_engine(engine: Engine) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                AccessPattern::derive(Sentinel::Null, |s| engine.access_failure(s))?,
                AccessPattern::loose(Sentinel::Null)?,
                AccessPattern::derive(Sentinel::Undefined, |s| engine.access_failure(s))?,
                AccessPattern::loose(Sentinel::Undefined)?,
            ],
        })
    }

    /// The process-wide classifier for the default engine, built on first
    /// use.
    pub fn global() -> &'static Classifier {
        static GLOBAL: Lazy<Classifier> = Lazy::new(|| {
            Classifier::for_engine(Engine::default()).expect("valid access patterns")
        });
        &GLOBAL
    }

    pub fn classify(&self, message: &str) -> Option<Sentinel> {
        self.patterns
            .iter()
            .find(|p| p.is_match(message))
            .map(AccessPattern::sentinel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_v8_pattern() {
        let pattern = AccessPattern::derive(Sentinel::Null, |s| Engine::V8.access_failure(s)).unwrap();
        assert_eq!(pattern.as_str(), r"Cannot read properties of null \(reading '.+'\)");
        assert!(pattern.is_match("Cannot read properties of null (reading 'c')"));
        assert!(!pattern.is_match("Cannot read properties of undefined (reading 'c')"));
    }

    #[test]
    fn test_derived_javascriptcore_pattern_widens_both_placeholders() {
        let pattern = AccessPattern::derive(Sentinel::Undefined, |s| {
            Engine::JavaScriptCore.access_failure(s)
        })
        .unwrap();
        assert!(pattern.is_match("undefined is not an object (evaluating '_.b.c')"));
        assert!(!pattern.is_match("null is not an object (evaluating '_.b.c')"));
    }

    #[test]
    fn test_custom_failure_message() {
        let pattern =
            AccessPattern::derive(Sentinel::Null, |s| format!("{} has no property '$property$'", s))
                .unwrap();
        assert!(pattern.is_match("null has no property 'x'"));
    }

    #[test]
    fn test_loose_patterns_are_case_insensitive() {
        let null = AccessPattern::loose(Sentinel::Null).unwrap();
        assert!(null.is_match("b is NULL"));
        assert!(null.is_match("null has no properties"));
        assert!(null.is_match("Cannot convert null value to object"));
        assert!(!null.is_match("nullable is not a function"));
    }

    #[test]
    fn test_classifier_order_and_engines() {
        let classifier = Classifier::global();
        assert_eq!(
            classifier.classify("Cannot read properties of null (reading 'b')"),
            Some(Sentinel::Null)
        );
        assert_eq!(
            classifier.classify("Cannot read properties of undefined (reading 'b')"),
            Some(Sentinel::Undefined)
        );
        assert_eq!(classifier.classify("_.b is not a function"), None);

        let firefox = Classifier::for_engine(Engine::SpiderMonkey).unwrap();
        assert_eq!(firefox.classify("_.b is undefined"), Some(Sentinel::Undefined));
    }
}
