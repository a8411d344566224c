// The MIT License (MIT)

// Copyright (c) 2015 Y. T. Chung <zonyitoo@gmail.com>

//  Permission is hereby granted, free of charge, to any person obtaining a
//  copy of this software and associated documentation files (the "Software"),
//  to deal in the Software without restriction, including without limitation
//  the rights to use, copy, modify, merge, publish, distribute, sublicense,
//  and/or sell copies of the Software, and to permit persons to whom the
//  Software is furnished to do so, subject to the following conditions:
//
//  The above copyright notice and this permission notice shall be included in
//  all copies or substantial portions of the Software.
//
//  THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
//  OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//  FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//  AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//  LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
//  FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
//  DEALINGS IN THE SOFTWARE.

//! Promises/A+ style deferred values on a single threaded job scheduler
//!
//! ```
//! use vouch::{Scheduler, Value};
//!
//! let sched = Scheduler::new();
//! let p = sched.promise();
//! let next = p.success(|v| Ok(Value::from(v.as_i64().unwrap_or(0) + 1))).unwrap();
//!
//! p.resolve(10);
//! assert!(!p.is_settled());
//!
//! sched.run().unwrap();
//! assert_eq!(next.outcome(), Value::from(11));
//! ```

pub use crate::error::{Error, Result};
pub use crate::options::Options;
pub use crate::promise::{callback, Callback, Promise, State};
pub use crate::scheduler::{Defer, Job, Scheduler};
pub use crate::value::Value;

pub mod error;
pub mod options;
pub mod promise;
pub mod scheduler;
pub mod value;
mod engine;

/// Create a new pending promise on `sched`
#[inline(always)]
pub fn promise(sched: &Scheduler) -> Promise {
    sched.promise()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_promise_factory() {
        let sched = Scheduler::new();
        let p = promise(&sched);
        assert_eq!(p.state(), State::Pending);
        assert_eq!(p.outcome(), Value::Undefined);
    }
}
