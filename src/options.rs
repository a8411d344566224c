// Copyright 2015 The coio Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scheduler options

use std::default::Default;

/// Scheduler options
#[derive(Debug, Clone)]
pub struct Options {
    pub name: Option<String>,
    /// Maximum number of jobs a single `Scheduler::run` may execute, 0 for no limit
    pub budget: usize,
}

/// Default run budget, unlimited
pub const DEFAULT_BUDGET: usize = 0;

impl Options {
    pub fn new() -> Options {
        Options {
            name: None,
            budget: DEFAULT_BUDGET,
        }
    }

    pub fn budget(&mut self, budget: usize) -> &mut Options {
        self.budget = budget;
        self
    }

    pub fn name(&mut self, name: String) -> &mut Options {
        self.name = Some(name);
        self
    }
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}
