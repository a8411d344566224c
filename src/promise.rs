// The MIT License (MIT)

// Copyright (c) 2015 Y. T. Chung <zonyitoo@gmail.com>

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE

//! Promise style deferred values

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::result;

use log::trace;

use crate::engine::{self, Continuation, Reaction};
use crate::error::Result;
use crate::scheduler::Defer;
use crate::value::Value;

/// Settlement state of a promise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

/// A user capability passed to `then`.
///
/// Returning `Err` raises the value: it is normalized into an error and
/// rejects the derived promise.
pub type Callback = Box<dyn FnOnce(Value) -> result::Result<Value, Value>>;

/// Box a closure as a `then` argument
pub fn callback<F>(f: F) -> Option<Callback>
    where F: FnOnce(Value) -> result::Result<Value, Value> + 'static
{
    Some(Box::new(f))
}

pub(crate) struct Inner {
    pub(crate) state: State,
    pub(crate) outcome: Value,
    pub(crate) on_fulfilled: Vec<Continuation>,
    pub(crate) on_rejected: Vec<Continuation>,
    pub(crate) parent: Option<WeakPromise>,
    pub(crate) sealed: bool,
}

impl Inner {
    pub(crate) fn queue_mut(&mut self, branch: State) -> &mut Vec<Continuation> {
        match branch {
            State::Rejected => &mut self.on_rejected,
            _ => &mut self.on_fulfilled,
        }
    }
}

/// A value that is not available yet.
///
/// `Promise` is a handle: clones refer to the same promise. Settlement is
/// never synchronous, `resolve` and `reject` defer the actual work onto the
/// `Defer` implementation the promise was created with.
#[derive(Clone)]
pub struct Promise {
    pub(crate) inner: Rc<RefCell<Inner>>,
    pub(crate) defer: Rc<dyn Defer>,
}

/// Non-owning reference to a promise, used for the parent link
#[derive(Clone)]
pub(crate) struct WeakPromise {
    inner: Weak<RefCell<Inner>>,
    defer: Rc<dyn Defer>,
}

impl WeakPromise {
    pub(crate) fn upgrade(&self) -> Option<Promise> {
        self.inner.upgrade().map(|inner| {
            Promise {
                inner: inner,
                defer: self.defer.clone(),
            }
        })
    }
}

impl Promise {
    /// Create a new pending promise
    pub fn new(defer: Rc<dyn Defer>) -> Promise {
        Promise {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                outcome: Value::Undefined,
                on_fulfilled: Vec::new(),
                on_rejected: Vec::new(),
                parent: None,
                sealed: false,
            })),
            defer: defer,
        }
    }

    fn derive(&self) -> Promise {
        let derived = Promise::new(self.defer.clone());
        derived.inner.borrow_mut().parent = Some(self.downgrade());
        derived
    }

    pub(crate) fn downgrade(&self) -> WeakPromise {
        WeakPromise {
            inner: Rc::downgrade(&self.inner),
            defer: self.defer.clone(),
        }
    }

    /// Schedule fulfillment with `value`
    pub fn resolve<V: Into<Value>>(&self, value: V) -> &Promise {
        self.schedule(State::Fulfilled, value.into());
        self
    }

    /// Schedule rejection with `value`
    pub fn reject<V: Into<Value>>(&self, value: V) -> &Promise {
        self.schedule(State::Rejected, value.into());
        self
    }

    fn schedule(&self, state: State, value: Value) {
        trace!("deferring settlement to {:?} with {}", state, value);
        let p = self.clone();
        self.defer.defer(Box::new(move || p.settle(state, value).map(|_| ())));
    }

    #[inline]
    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    /// The settled value, `Undefined` while pending
    pub fn outcome(&self) -> Value {
        self.inner.borrow().outcome.clone()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    /// Whether the promise is fulfilled or rejected.
    ///
    /// Stays false after `resolve` until the deferred settlement has run.
    #[inline]
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Whether both handles point to the same promise
    #[inline]
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register continuations and return the derived promise.
    ///
    /// `on_success` runs with the outcome once this promise fulfills,
    /// `on_failure` once it rejects; `None` skips that branch. The derived
    /// promise settles with what the callback returns, follows it if it is
    /// a promise, and rejects if the callback raises or panics.
    ///
    /// A failure callback that completes with `Value::Undefined` is an
    /// `Error::InvalidArgument`, returned here when this promise is already
    /// rejected and from the settling job otherwise.
    pub fn then(&self, on_success: Option<Callback>, on_failure: Option<Callback>) -> Result<Promise> {
        let derived = self.derive();

        if let Some(f) = on_success {
            self.register(State::Fulfilled, engine::chain(&derived, State::Fulfilled, f))?;
        }

        if let Some(f) = on_failure {
            self.register(State::Rejected, engine::chain(&derived, State::Rejected, f))?;
        }

        Ok(derived)
    }

    /// Execute the function if the promise fulfills
    pub fn success<F>(&self, f: F) -> Result<Promise>
        where F: FnOnce(Value) -> result::Result<Value, Value> + 'static
    {
        self.then(callback(f), None)
    }

    /// Execute the function if the promise rejects
    pub fn fail<F>(&self, f: F) -> Result<Promise>
        where F: FnOnce(Value) -> result::Result<Value, Value> + 'static
    {
        self.then(None, callback(f))
    }

    /// Register a raw continuation on `branch`.
    ///
    /// Pending promises queue it; a promise already settled to `branch` runs
    /// it right away with the outcome, and one settled the other way drops
    /// it. If it returns a promise while being drained, this promise adopts
    /// that promise's eventual settlement. An `Err` return rejects this
    /// promise once draining is done.
    pub fn vouch<F>(&self, branch: State, f: F) -> Result<()>
        where F: FnOnce(Value) -> result::Result<Value, Value> + 'static
    {
        self.register(branch,
                      Box::new(move |outcome: Value| {
                          Ok(match f(outcome) {
                              Ok(v) => Reaction::Returned(v),
                              Err(v) => Reaction::Raised(v),
                          })
                      }))
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Promise) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => {
                f.debug_struct("Promise")
                    .field("state", &inner.state)
                    .field("outcome", &format_args!("{}", inner.outcome))
                    .field("on_fulfilled", &inner.on_fulfilled.len())
                    .field("on_rejected", &inner.on_rejected.len())
                    .field("sealed", &inner.sealed)
                    .finish()
            }
            Err(_) => write!(f, "Promise {{ <borrowed> }}"),
        }
    }
}
