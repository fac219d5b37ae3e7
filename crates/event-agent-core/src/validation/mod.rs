//! Declarative payload validation
//!
//! Command payloads arrive as untyped JSON. Each command describes its
//! fields with a [`PayloadValidator`] and gets back typed values or the first
//! failing field's message:
//!
//! ```rust
//! use event_agent_core::validation::{Len, PayloadValidator, ValidationError};
//! use serde_json::json;
//!
//! struct Hangup {
//!     uuid: String,
//!     cause: String,
//! }
//!
//! fn validate(payload: &serde_json::Value) -> Result<Hangup, ValidationError> {
//!     let v = PayloadValidator::new(payload);
//!     Ok(Hangup {
//!         uuid: v.field("uuid").message("uuid must be between 2 and 63 characters").string(Len::between(2, 63))?,
//!         cause: v.field("cause").optional_string(Len::at_most(63))?,
//!     })
//! }
//!
//! let ok = validate(&json!({"uuid": "abc-123"})).unwrap();
//! assert_eq!(ok.uuid, "abc-123");
//! assert!(ok.cause.is_empty());
//! assert!(validate(&json!({"uuid": "x"})).is_err());
//! ```
//!
//! Rules are evaluated in the order the validation function calls them and
//! `?` stops at the first failure, so later fields are never looked at.

mod rules;

pub use rules::{Len, Range};

use serde_json::Value;
use thiserror::Error;

pub const ERR_MISSING_OR_INVALID: &str = "missing or invalid field";
pub const ERR_EXPECTED_STRING: &str = "expected string";
pub const ERR_EXPECTED_NUMBER: &str = "expected number";
pub const ERR_EXPECTED_BOOL: &str = "expected boolean";
pub const ERR_INVALID_VALUE: &str = "invalid value";

/// Human-readable reason a payload was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }

    pub fn into_message(self) -> String {
        self.0
    }
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Entry point for validating one payload
#[derive(Debug, Clone, Copy)]
pub struct PayloadValidator<'a> {
    payload: &'a Value,
}

impl<'a> PayloadValidator<'a> {
    pub fn new(payload: &'a Value) -> Self {
        Self { payload }
    }

    /// Start describing the rule for `name`
    pub fn field(&self, name: &'a str) -> Field<'a> {
        Field {
            payload: self.payload,
            name,
            message: None,
            capacity: None,
        }
    }
}

/// One field rule under construction
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    payload: &'a Value,
    name: &'a str,
    message: Option<&'a str>,
    capacity: Option<usize>,
}

impl<'a> Field<'a> {
    /// Message returned instead of the generic fallback on any failure
    pub fn message(mut self, message: &'a str) -> Self {
        self.message = Some(message);
        self
    }

    /// Truncate accepted strings to at most `bytes` bytes
    pub fn capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn string(self, len: Len) -> ValidationResult<String> {
        match self.lookup() {
            Some(value) => self.check_string(value, len),
            None => Err(self.fail(ERR_MISSING_OR_INVALID)),
        }
    }

    /// Absent fields yield an empty string
    pub fn optional_string(self, len: Len) -> ValidationResult<String> {
        match self.lookup() {
            Some(value) => self.check_string(value, len),
            None => Ok(String::new()),
        }
    }

    pub fn number(self, range: Range) -> ValidationResult<i64> {
        match self.lookup() {
            Some(value) => self.check_number(value, range),
            None => Err(self.fail(ERR_MISSING_OR_INVALID)),
        }
    }

    pub fn optional_number(self, range: Range) -> ValidationResult<Option<i64>> {
        self.lookup()
            .map(|value| self.check_number(value, range))
            .transpose()
    }

    pub fn boolean(self) -> ValidationResult<bool> {
        match self.lookup() {
            Some(value) => self.check_bool(value),
            None => Err(self.fail(ERR_MISSING_OR_INVALID)),
        }
    }

    pub fn optional_boolean(self) -> ValidationResult<Option<bool>> {
        self.lookup().map(|value| self.check_bool(value)).transpose()
    }

    /// Value must equal one of `candidates` exactly
    pub fn one_of(self, candidates: &[&str]) -> ValidationResult<String> {
        if candidates.is_empty() {
            return Err(self.fail(ERR_INVALID_VALUE));
        }
        match self.lookup() {
            Some(value) => self.check_enum(value, candidates),
            None => Err(self.fail(ERR_MISSING_OR_INVALID)),
        }
    }

    /// Absent fields yield an empty string
    pub fn optional_one_of(self, candidates: &[&str]) -> ValidationResult<String> {
        if candidates.is_empty() {
            return Err(self.fail(ERR_INVALID_VALUE));
        }
        match self.lookup() {
            Some(value) => self.check_enum(value, candidates),
            None => Ok(String::new()),
        }
    }

    // A non-object payload has no fields at all.
    fn lookup(&self) -> Option<&'a Value> {
        self.payload.as_object().and_then(|object| object.get(self.name))
    }

    fn fail(&self, fallback: &str) -> ValidationError {
        ValidationError::new(self.message.unwrap_or(fallback))
    }

    fn check_string(&self, value: &Value, len: Len) -> ValidationResult<String> {
        let input = value.as_str().ok_or_else(|| self.fail(ERR_EXPECTED_STRING))?;
        if !len.contains(input.len()) {
            return Err(self.fail(ERR_MISSING_OR_INVALID));
        }
        Ok(self.store(input))
    }

    fn check_number(&self, value: &Value, range: Range) -> ValidationResult<i64> {
        let number = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .ok_or_else(|| self.fail(ERR_EXPECTED_NUMBER))?,
            _ => return Err(self.fail(ERR_EXPECTED_NUMBER)),
        };
        if !range.contains(number) {
            return Err(self.fail(ERR_MISSING_OR_INVALID));
        }
        Ok(number)
    }

    fn check_bool(&self, value: &Value) -> ValidationResult<bool> {
        value.as_bool().ok_or_else(|| self.fail(ERR_EXPECTED_BOOL))
    }

    fn check_enum(&self, value: &Value, candidates: &[&str]) -> ValidationResult<String> {
        let input = value.as_str().ok_or_else(|| self.fail(ERR_EXPECTED_STRING))?;
        if candidates.iter().any(|candidate| *candidate == input) {
            Ok(self.store(input))
        } else {
            Err(self.fail(ERR_INVALID_VALUE))
        }
    }

    fn store(&self, input: &str) -> String {
        match self.capacity {
            Some(capacity) if input.len() > capacity => {
                let mut end = capacity;
                while !input.is_char_boundary(end) {
                    end -= 1;
                }
                input[..end].to_string()
            }
            _ => input.to_string(),
        }
    }
}
