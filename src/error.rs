// Copyright 2015 The coio Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors raised by the resolution engine and carried through rejections

use std::any::Any;
use std::result;

use thiserror::Error;

use crate::value::Value;

pub type Result<T> = result::Result<T, Error>;

/// Error values.
///
/// `AlreadySettled`, `InvalidArgument` and `BudgetExhausted` are usage bugs
/// and are returned to the caller of the offending operation. `Raised` and
/// `Cycle` end up as the outcome of a rejected promise.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("promise already settled with {outcome}")]
    AlreadySettled { outcome: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Raised(String),

    #[error("chaining cycle: a promise cannot be resolved with itself")]
    Cycle,

    #[error("scheduler exhausted its budget of {budget} jobs")]
    BudgetExhausted { budget: usize },
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Error {
        Error::InvalidArgument(msg.into())
    }

    /// Wrap an arbitrary raised value into an error.
    ///
    /// Errors pass through untouched. Aggregates (JSON objects and arrays)
    /// are serialized so the message stays a scalar string.
    pub fn normalize(raised: Value) -> Error {
        match raised {
            Value::Error(err) => err,
            Value::Json(serde_json::Value::String(s)) => Error::Raised(s),
            Value::Json(json) => {
                let msg = serde_json::to_string(&json).unwrap_or_else(|e| e.to_string());
                Error::Raised(msg)
            }
            other => Error::Raised(other.to_string()),
        }
    }

    /// Build an error from the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Error {
        let msg = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_owned(),
                Err(_) => "callback panicked".to_owned(),
            },
        };
        Error::Raised(msg)
    }
}
