//! Runtime contract of the `idx` safe-access helper.
//!
//! `idx(input, _ => _.a.b.c)` evaluates the accessor and, when the accessor
//! fails because some intermediate value was `null` or `undefined`, returns
//! that absent value instead of throwing. Every other failure propagates
//! unchanged. The source rewriter produces code with exactly this behavior;
//! this crate models it so both can be checked against each other.
//!
//! ```
//! use idx_runtime::{safe_access, Nullish, Thrown};
//!
//! let result = safe_access(None::<u32>, |input| match input {
//!     Some(v) => Ok(v + 1),
//!     None => Err(Thrown::type_error("Cannot read properties of null (reading 'b')")),
//! });
//! assert_eq!(result, Ok(Nullish::Null));
//! ```

pub mod pattern;

pub use pattern::{AccessPattern, Classifier, Engine, Sentinel};

use thiserror::Error;

/// A value thrown by an accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Thrown {
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Any other error, by constructor name
    #[error("{name}: {message}")]
    Error { name: String, message: String },
}

impl Thrown {
    pub fn type_error(message: impl Into<String>) -> Self {
        Thrown::TypeError(message.into())
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Thrown::Error {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// The result of a safe access: a value, or the absent value met on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullish<T> {
    Value(T),
    Null,
    Undefined,
}

impl<T> Nullish<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Nullish::Value(v) => Some(v),
            Nullish::Null | Nullish::Undefined => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        !matches!(self, Nullish::Value(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Nullish<U> {
        match self {
            Nullish::Value(v) => Nullish::Value(f(v)),
            Nullish::Null => Nullish::Null,
            Nullish::Undefined => Nullish::Undefined,
        }
    }
}

impl<T> From<Sentinel> for Nullish<T> {
    fn from(sentinel: Sentinel) -> Self {
        match sentinel {
            Sentinel::Null => Nullish::Null,
            Sentinel::Undefined => Nullish::Undefined,
        }
    }
}

/// Run `accessor` on `input`, turning null/undefined access failures into
/// [`Nullish::Null`] / [`Nullish::Undefined`].
pub fn safe_access<I, T>(
    input: I,
    accessor: impl FnOnce(I) -> Result<T, Thrown>,
) -> Result<Nullish<T>, Thrown> {
    safe_access_with(Classifier::global(), input, accessor)
}

/// [`safe_access`] with an explicit classifier.
pub fn safe_access_with<I, T>(
    classifier: &Classifier,
    input: I,
    accessor: impl FnOnce(I) -> Result<T, Thrown>,
) -> Result<Nullish<T>, Thrown> {
    match accessor(input) {
        Ok(value) => Ok(Nullish::Value(value)),
        Err(Thrown::TypeError(message)) => match classifier.classify(&message) {
            Some(sentinel) => Ok(sentinel.into()),
            None => Err(Thrown::TypeError(message)),
        },
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Just enough of a JavaScript value to walk property chains.
    #[derive(Debug, Clone, PartialEq)]
    enum Js {
        Null,
        Undefined,
        Num(f64),
        Str(&'static str),
        Obj(HashMap<&'static str, Js>),
        Arr(Vec<Js>),
        /// Property whose getter throws
        Throws(Thrown),
    }

    fn obj(entries: Vec<(&'static str, Js)>) -> Js {
        Js::Obj(entries.into_iter().collect())
    }

    fn get(value: &Js, key: &str) -> Result<Js, Thrown> {
        let found = match value {
            Js::Null | Js::Undefined => {
                let sentinel = if *value == Js::Null { "null" } else { "undefined" };
                return Err(Thrown::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    sentinel, key
                )));
            }
            Js::Obj(map) => map.get(key).cloned().unwrap_or(Js::Undefined),
            Js::Arr(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Js::Undefined),
            _ => Js::Undefined,
        };
        match found {
            Js::Throws(err) => Err(err),
            other => Ok(other),
        }
    }

    /// Calling anything in this model fails the way calling a string does.
    fn call(_callee: &Js, name: &str) -> Result<Js, Thrown> {
        Err(Thrown::type_error(format!("{} is not a function", name)))
    }

    #[test]
    fn test_returns_properties_that_exist() {
        let a = obj(vec![("b", obj(vec![("c", Js::Num(123.0))]))]);
        let result = safe_access(&a, |a| get(&get(a, "b")?, "c"));
        assert_eq!(result, Ok(Nullish::Value(Js::Num(123.0))));
    }

    #[test]
    fn test_rethrows_non_access_errors() {
        let error = Thrown::error("Error", "Expected error.");
        let a = obj(vec![("b", Js::Throws(error.clone()))]);
        let result = safe_access(&a, |a| get(&get(a, "b")?, "c"));
        assert_eq!(result, Err(error));
    }

    #[test]
    fn test_calling_a_non_method_throws() {
        let a = obj(vec![("b", Js::Str("I am a string"))]);
        let result = safe_access(&a, |a| call(&get(a, "b")?, "_.b"));
        assert_eq!(result, Err(Thrown::type_error("_.b is not a function")));
    }

    #[test]
    fn test_intermediate_null_and_undefined() {
        let a = obj(vec![("b", Js::Null)]);
        assert_eq!(safe_access(&a, |a| get(&get(a, "b")?, "c")), Ok(Nullish::Null));

        let a = obj(vec![("b", Js::Undefined)]);
        assert_eq!(safe_access(&a, |a| get(&get(a, "b")?, "c")), Ok(Nullish::Undefined));
    }

    #[test]
    fn test_undefined_array_index() {
        let a = obj(vec![("b", Js::Arr(vec![]))]);
        let result = safe_access(&a, |a| get(&get(&get(a, "b")?, "0")?, "c"));
        assert_eq!(result, Ok(Nullish::Undefined));
    }

    #[test]
    fn test_capitalized_messages() {
        let a = obj(vec![("b", Js::Throws(Thrown::type_error("b is NULL")))]);
        assert_eq!(safe_access(&a, |a| get(&get(a, "b")?, "c")), Ok(Nullish::Null));

        let a = obj(vec![("b", Js::Throws(Thrown::type_error("b is UNDEFINED")))]);
        assert_eq!(safe_access(&a, |a| get(&get(a, "b")?, "c")), Ok(Nullish::Undefined));
    }

    #[test]
    fn test_other_engine_wording() {
        let safari = Classifier::for_engine(Engine::JavaScriptCore).unwrap();
        let result: Result<Nullish<()>, Thrown> = safe_access_with(&safari, (), |_| {
            Err(Thrown::type_error("null is not an object (evaluating '_.b.c')"))
        });
        assert_eq!(result, Ok(Nullish::Null));
    }

    #[test]
    fn test_nullish_helpers() {
        assert_eq!(Nullish::Value(2).map(|v| v * 2).value(), Some(4));
        assert!(Nullish::<u8>::Undefined.is_absent());
        assert_eq!(Nullish::<u8>::from(Sentinel::Null), Nullish::Null);
    }
}
