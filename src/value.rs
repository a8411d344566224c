// Copyright 2015 The coio Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Dynamically typed promise outcomes

use std::fmt;

use serde_json::Value as Json;

use crate::error::Error;
use crate::promise::Promise;

/// The value a promise settles with
#[derive(Clone, Debug)]
pub enum Value {
    /// No value at all. This is the outcome of a pending promise.
    Undefined,
    Json(Json),
    Error(Error),
    Promise(Promise),
}

impl Value {
    /// Only `Undefined` counts as empty; `null`, `0`, `""` and `false` are values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        match *self {
            Value::Undefined => true,
            _ => false,
        }
    }

    pub fn as_json(&self) -> Option<&Json> {
        match *self {
            Value::Json(ref json) => Some(json),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Error> {
        match *self {
            Value::Error(ref err) => Some(err),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&Promise> {
        match *self {
            Value::Promise(ref p) => Some(p),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(Json::as_i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Json::as_str)
    }
}

impl Default for Value {
    fn default() -> Value {
        Value::Undefined
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (&Value::Undefined, &Value::Undefined) => true,
            (&Value::Json(ref a), &Value::Json(ref b)) => a == b,
            (&Value::Error(ref a), &Value::Error(ref b)) => a == b,
            (&Value::Promise(ref a), &Value::Promise(ref b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Undefined => f.write_str("undefined"),
            Value::Json(ref json) => write!(f, "{}", json),
            Value::Error(ref err) => write!(f, "Error: {}", err),
            Value::Promise(_) => f.write_str("[promise]"),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Value {
        Value::Json(json)
    }
}

impl From<Error> for Value {
    fn from(err: Error) -> Value {
        Value::Error(err)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Value {
        Value::Promise(p)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::Undefined
    }
}

macro_rules! from_json_impl {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Value {
                    Value::Json(Json::from(v))
                }
            }
        )*
    }
}

from_json_impl!(bool, i32, i64, u32, u64, f64, String, &str);
