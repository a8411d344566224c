// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

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
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Deferred job scheduler

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use log::{error, trace, warn};

use crate::error::{Error, Result};
use crate::options::Options;
use crate::promise::Promise;

/// A unit of deferred work. Engine failures inside the job are returned.
pub type Job = Box<dyn FnOnce() -> Result<()>>;

/// Run a job on a later turn.
///
/// Implementations must never run `job` within the calling stack frame and
/// must keep jobs deferred by the same caller in FIFO order.
pub trait Defer {
    fn defer(&self, job: Job);
}

struct Inner {
    queue: VecDeque<Job>,
    opts: Options,
}

/// Single threaded FIFO event loop
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Scheduler {
    /// Create a new Scheduler with default configuration
    pub fn new() -> Scheduler {
        Scheduler::with_options(Options::new())
    }

    pub fn with_options(opts: Options) -> Scheduler {
        Scheduler {
            inner: Rc::new(RefCell::new(Inner {
                queue: VecDeque::new(),
                opts: opts,
            })),
        }
    }

    /// Name the scheduler, used for identification in log messages
    #[inline]
    pub fn name(self, name: String) -> Scheduler {
        self.inner.borrow_mut().opts.name(name);
        self
    }

    /// Limit the number of jobs one call to `run` may execute
    #[inline]
    pub fn budget(self, budget: usize) -> Scheduler {
        self.inner.borrow_mut().opts.budget(budget);
        self
    }

    /// Create a new pending promise whose settlement is deferred onto this scheduler
    pub fn promise(&self) -> Promise {
        Promise::new(Rc::new(self.clone()))
    }

    /// Get the number of queued jobs
    #[inline]
    pub fn work_count(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.work_count() == 0
    }

    /// Run the oldest queued job.
    ///
    /// Returns `Ok(false)` if there was nothing to run.
    pub fn turn(&self) -> Result<bool> {
        // The borrow must end before the job runs, jobs usually defer more jobs.
        let job = match self.inner.borrow_mut().queue.pop_front() {
            Some(job) => job,
            None => return Ok(false),
        };

        trace!("{}: running job, {} left", self, self.work_count());
        match job() {
            Ok(()) => Ok(true),
            Err(err) => {
                error!("{}: job failed: {}", self, err);
                Err(err)
            }
        }
    }

    /// Run queued jobs, including the ones they defer, until the queue is empty.
    ///
    /// Stops at the first failing job and returns its error; jobs behind it stay
    /// queued. Returns the number of jobs executed.
    pub fn run(&self) -> Result<usize> {
        let budget = self.inner.borrow().opts.budget;
        let mut count = 0;

        loop {
            if budget != 0 && count >= budget && !self.is_idle() {
                warn!("{}: budget of {} jobs exhausted with {} still queued",
                      self,
                      budget,
                      self.work_count());
                return Err(Error::BudgetExhausted { budget: budget });
            }

            if !self.turn()? {
                return Ok(count);
            }
            count += 1;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Scheduler {
        Scheduler::new()
    }
}

impl Defer for Scheduler {
    fn defer(&self, job: Job) {
        self.inner.borrow_mut().queue.push_back(job);
    }
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.borrow().opts.name {
            Some(ref name) => write!(f, "Scheduler({})", name),
            None => f.write_str("Scheduler"),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("opts", &inner.opts)
            .field("queued", &inner.queue.len())
            .finish()
    }
}
