// Copyright 2015 The coio Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolution engine
//!
//! Everything that mutates a promise after creation lives here: registering
//! continuations, settling, draining, adoption and the wrapper `then`
//! installs around user callbacks.
//!
//! No `RefCell` borrow of a promise is held while a continuation runs, so a
//! continuation may call into any promise, including the one being drained.

use std::mem;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::promise::{Callback, Promise, State};
use crate::value::Value;

/// What a continuation hands back to the drain loop
pub(crate) enum Reaction {
    Returned(Value),
    Raised(Value),
}

pub(crate) type Continuation = Box<dyn FnOnce(Value) -> Result<Reaction>>;

impl Promise {
    pub(crate) fn register(&self, branch: State, continuation: Continuation) -> Result<()> {
        if branch == State::Pending {
            return Err(Error::invalid_argument("continuation branch must be fulfilled or rejected"));
        }

        let outcome = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == State::Pending {
                inner.queue_mut(branch).push(continuation);
                return Ok(());
            }

            if inner.state != branch {
                trace!("dropping {:?} continuation, promise is {:?}", branch, inner.state);
                return Ok(());
            }

            inner.outcome.clone()
        };

        continuation(outcome).map(|_| ())
    }

    /// Settle the promise synchronously and drain the matching continuations.
    ///
    /// Returns the promise itself, or the promise it started to adopt.
    pub(crate) fn settle(&self, state: State, value: Value) -> Result<Value> {
        if state == State::Pending {
            return Err(Error::invalid_argument("cannot settle a promise to pending"));
        }

        let continuations = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != State::Pending || inner.sealed {
                return Err(Error::AlreadySettled { outcome: inner.outcome.to_string() });
            }

            inner.state = state;
            inner.outcome = value;
            mem::replace(inner.queue_mut(state), Vec::new())
        };

        trace!("settling {:?} with {}, draining {} continuations",
               state,
               self.outcome(),
               continuations.len());

        let mut fallback = Value::Undefined;
        let mut raised = None;
        let mut continuations = continuations.into_iter();

        while let Some(continuation) = continuations.next() {
            match continuation(self.outcome())? {
                Reaction::Returned(Value::Promise(inner)) => {
                    return self.adopt(state, inner, continuations.collect());
                }
                Reaction::Returned(v) => {
                    if !v.is_empty() {
                        fallback = v;
                    }
                }
                Reaction::Raised(v) => raised = Some(v),
            }

            // Only deferred jobs may settle a promise, never a continuation.
            debug_assert_eq!(self.state(), state, "promise state moved while draining");
        }

        let (state, outcome, parent) = {
            let mut inner = self.inner.borrow_mut();
            inner.on_fulfilled.clear();
            inner.on_rejected.clear();

            if let Some(v) = raised {
                inner.state = State::Rejected;
                inner.outcome = Value::Error(Error::normalize(v));
            }

            inner.sealed = true;
            (inner.state, inner.outcome.clone(), inner.parent.as_ref().and_then(|p| p.upgrade()))
        };

        if let Some(parent) = parent {
            if parent.is_pending() {
                let value = if outcome.is_empty() { fallback } else { outcome };
                trace!("propagating {:?} to parent", state);
                match state {
                    State::Fulfilled => parent.resolve(value),
                    _ => parent.reject(value),
                };
            }
        }

        Ok(Value::Promise(self.clone()))
    }

    /// Re-arm to pending until `inner` settles.
    ///
    /// `rest` are the continuations the interrupted drain has not reached yet.
    fn adopt(&self, branch: State, inner: Promise, rest: Vec<Continuation>) -> Result<Value> {
        if inner.ptr_eq(self) {
            return Err(Error::invalid_argument("a promise cannot adopt itself"));
        }

        debug!("adopting {:?}, {} continuations held back", inner, rest.len());

        {
            let mut me = self.inner.borrow_mut();
            me.state = State::Pending;
            me.outcome = Value::Undefined;

            let queue = me.queue_mut(branch);
            debug_assert!(queue.is_empty());
            *queue = rest;
        }

        follow(self, &inner)?;
        Ok(Value::Promise(inner))
    }
}

/// Make `target` resolve or reject the way `source` eventually settles
fn follow(target: &Promise, source: &Promise) -> Result<()> {
    let p = target.clone();
    source.register(State::Fulfilled,
                  Box::new(move |v: Value| {
                      p.resolve(v);
                      Ok(Reaction::Returned(Value::Undefined))
                  }))?;

    let p = target.clone();
    source.register(State::Rejected,
                  Box::new(move |v: Value| {
                      p.reject(v);
                      Ok(Reaction::Returned(Value::Undefined))
                  }))
}

/// Wrap a user callback registered on `branch` so that its result settles `derived`.
pub(crate) fn chain(derived: &Promise, branch: State, f: Callback) -> Continuation {
    let derived = derived.clone();

    Box::new(move |outcome: Value| {
        let (candidate, failed) = match panic::catch_unwind(AssertUnwindSafe(|| f(outcome.clone()))) {
            Ok(Ok(v)) => (v, false),
            Ok(Err(v)) => (Value::Error(Error::normalize(v)), true),
            Err(payload) => (Value::Error(Error::from_panic(payload)), true),
        };

        if !derived.is_pending() {
            // Settled by hand, and it already pushed that outcome up to us.
            debug!("derived promise already {:?}, ignoring callback result", derived.state());
            return Ok(Reaction::Returned(Value::Undefined));
        }

        match candidate {
            Value::Promise(ref p) if p.ptr_eq(&derived) => {
                derived.settle(State::Rejected, Value::Error(Error::Cycle))?;
                Ok(Reaction::Returned(Value::Undefined))
            }
            Value::Promise(p) => {
                debug!("derived promise follows {:?}", p);
                {
                    let mut inner = derived.inner.borrow_mut();
                    inner.state = State::Pending;
                    inner.outcome = Value::Undefined;
                }
                follow(&derived, &p)?;
                Ok(Reaction::Returned(Value::Undefined))
            }
            candidate => {
                if branch == State::Rejected && candidate.is_empty() {
                    return Err(Error::invalid_argument("rejection handler completed without a value"));
                }

                let value = if candidate.is_empty() { outcome } else { candidate };
                let state = if failed { State::Rejected } else { State::Fulfilled };
                derived.settle(state, value.clone())?;
                Ok(Reaction::Returned(value))
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use crate::promise::callback;
    use crate::scheduler::Scheduler;

    fn settled(sched: &Scheduler, state: State, value: Value) -> Promise {
        let p = sched.promise();
        p.settle(state, value).unwrap();
        p
    }

    #[test]
    fn test_double_settle() {
        let sched = Scheduler::new();
        let p = settled(&sched, State::Fulfilled, Value::from(1));

        let err = p.settle(State::Rejected, Value::from(2)).unwrap_err();
        assert_eq!(err, Error::AlreadySettled { outcome: "1".to_owned() });
        assert_eq!(p.state(), State::Fulfilled);
        assert_eq!(p.outcome(), Value::from(1));
    }

    #[test]
    fn test_double_resolve_fails_second_job() {
        let sched = Scheduler::new();
        let p = sched.promise();

        p.resolve(1).resolve(2);
        assert_eq!(sched.run(), Err(Error::AlreadySettled { outcome: "1".to_owned() }));
        assert_eq!(p.outcome(), Value::from(1));
    }

    #[test]
    fn test_settle_to_pending_is_invalid() {
        let sched = Scheduler::new();
        let p = sched.promise();

        match p.settle(State::Pending, Value::from(1)) {
            Err(Error::InvalidArgument(..)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(p.is_pending());
    }

    #[test]
    fn test_register_on_fulfilled_runs_immediately() {
        let sched = Scheduler::new();
        let p = settled(&sched, State::Fulfilled, Value::from("v"));
        let calls = Rc::new(RefCell::new(Vec::new()));

        {
            let calls = calls.clone();
            p.vouch(State::Fulfilled, move |v| {
                    calls.borrow_mut().push(v);
                    Ok(Value::Undefined)
                })
                .unwrap();
        }

        assert_eq!(*calls.borrow(), vec![Value::from("v")]);
        assert_eq!(sched.work_count(), 0);
    }

    #[test]
    fn test_register_on_other_branch_is_dropped() {
        let sched = Scheduler::new();
        let p = settled(&sched, State::Rejected, Value::from("e"));
        let called = Rc::new(RefCell::new(false));

        {
            let called = called.clone();
            p.vouch(State::Fulfilled, move |v| {
                    *called.borrow_mut() = true;
                    Ok(v)
                })
                .unwrap();
        }

        assert!(!*called.borrow());
        assert!(p.inner.borrow().on_fulfilled.is_empty());
    }

    #[test]
    fn test_late_rejection_override() {
        let sched = Scheduler::new();
        let p = sched.promise();

        p.vouch(State::Fulfilled, |_| Err(Value::from(json!({"code": 1})))).unwrap();
        p.settle(State::Fulfilled, Value::from(5)).unwrap();

        assert_eq!(p.state(), State::Rejected);
        assert_eq!(p.outcome(), Value::Error(Error::Raised(r#"{"code":1}"#.to_owned())));
    }

    #[test]
    fn test_drain_clears_both_queues() {
        let sched = Scheduler::new();
        let p = sched.promise();

        p.vouch(State::Fulfilled, |v| Ok(v)).unwrap();
        p.vouch(State::Rejected, |v| Ok(v)).unwrap();
        p.settle(State::Fulfilled, Value::from(1)).unwrap();

        let inner = p.inner.borrow();
        assert!(inner.on_fulfilled.is_empty());
        assert!(inner.on_rejected.is_empty());
        assert!(inner.sealed);
    }

    #[test]
    fn test_adoption_rearms_and_keeps_rest() {
        let sched = Scheduler::new();
        let p = sched.promise();
        let q = sched.promise();
        let seen = Rc::new(RefCell::new(Vec::new()));

        {
            let q = q.clone();
            let seen = seen.clone();
            p.vouch(State::Fulfilled, move |v| {
                    seen.borrow_mut().push(("first", v));
                    Ok(Value::Promise(q))
                })
                .unwrap();
        }
        {
            let seen = seen.clone();
            p.vouch(State::Fulfilled, move |v| {
                    seen.borrow_mut().push(("second", v));
                    Ok(Value::Undefined)
                })
                .unwrap();
        }

        let ret = p.settle(State::Fulfilled, Value::from(1)).unwrap();
        assert_eq!(ret, Value::Promise(q.clone()));
        assert!(p.is_pending());
        assert_eq!(p.outcome(), Value::Undefined);
        assert_eq!(p.inner.borrow().on_fulfilled.len(), 1);
        assert_eq!(*seen.borrow(), vec![("first", Value::from(1))]);

        q.resolve(2);
        sched.run().unwrap();

        assert_eq!(p.state(), State::Fulfilled);
        assert_eq!(p.outcome(), Value::from(2));
        assert_eq!(*seen.borrow(),
                   vec![("first", Value::from(1)), ("second", Value::from(2))]);
    }

    #[test]
    fn test_adoption_of_rejected_promise() {
        let sched = Scheduler::new();
        let p = sched.promise();
        let q = settled(&sched, State::Rejected, Value::from("inner"));

        {
            let q = q.clone();
            p.vouch(State::Fulfilled, move |_| Ok(Value::Promise(q))).unwrap();
        }

        p.settle(State::Fulfilled, Value::from(1)).unwrap();
        assert!(p.is_pending());

        sched.run().unwrap();
        assert_eq!(p.state(), State::Rejected);
        assert_eq!(p.outcome(), Value::from("inner"));
    }

    #[test]
    fn test_self_adoption_is_invalid() {
        let sched = Scheduler::new();
        let p = sched.promise();

        {
            let me = p.clone();
            p.vouch(State::Fulfilled, move |_| Ok(Value::Promise(me))).unwrap();
        }

        match p.settle(State::Fulfilled, Value::from(1)) {
            Err(Error::InvalidArgument(..)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reverse_propagation() {
        let sched = Scheduler::new();
        let p = sched.promise();
        let derived = p.success(|v| Ok(v)).unwrap();

        derived.settle(State::Fulfilled, Value::from(0)).unwrap();
        assert!(p.is_pending());
        assert_eq!(sched.work_count(), 1);

        sched.run().unwrap();
        assert_eq!(p.state(), State::Fulfilled);
        assert_eq!(p.outcome(), Value::from(0));
        // the wrapper leaves the hand-settled derived promise alone
        assert_eq!(derived.outcome(), Value::from(0));
    }

    #[test]
    fn test_reverse_propagation_of_rejection() {
        let sched = Scheduler::new();
        let p = sched.promise();
        let derived = p.then(None, callback(|v| Ok(v))).unwrap();

        derived.reject("down");
        sched.run().unwrap();

        assert_eq!(derived.state(), State::Rejected);
        assert_eq!(p.state(), State::Rejected);
        assert_eq!(p.outcome(), Value::from("down"));
    }

    #[test]
    fn test_chain_cycle() {
        let sched = Scheduler::new();
        let p = sched.promise();
        let slot: Rc<RefCell<Option<Promise>>> = Rc::new(RefCell::new(None));

        let derived = {
            let slot = slot.clone();
            p.success(move |_| {
                    let me = slot.borrow_mut().take();
                    Ok(me.map(Value::Promise).unwrap_or(Value::Undefined))
                })
                .unwrap()
        };
        *slot.borrow_mut() = Some(derived.clone());

        p.resolve(1);
        sched.run().unwrap();

        assert_eq!(derived.state(), State::Rejected);
        assert_eq!(derived.outcome(), Value::Error(Error::Cycle));
    }

    #[test]
    fn test_panicking_callback_rejects() {
        let sched = Scheduler::new();
        let p = sched.promise();
        let derived = p.success(|_| panic!("exploded")).unwrap();

        p.resolve(1);
        sched.run().unwrap();

        assert_eq!(p.state(), State::Fulfilled);
        assert_eq!(derived.state(), State::Rejected);
        assert_eq!(derived.outcome(), Value::Error(Error::Raised("exploded".to_owned())));
    }
}
