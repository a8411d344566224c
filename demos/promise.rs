// Copyright 2015 The coio Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

extern crate env_logger;
extern crate vouch;

use vouch::{callback, Scheduler, State, Value};

fn main() {
    env_logger::init();

    let sched = Scheduler::new().name("demo".to_owned());
    let p = sched.promise();

    let r = p.then(callback(|res| {
                     assert_eq!(res, Value::from(1.23));
                     Ok(Value::from(34))
                 }),
                 callback(|err| {
                     assert_eq!(err, Value::from("Final error"));
                     Ok(Value::from(35))
                 }))
        .unwrap();

    let inner = sched.clone();
    let adopted = r.success(move |v| {
            let q = inner.promise();
            q.resolve(format!("adopted {}", v));
            Ok(Value::Promise(q))
        })
        .unwrap();

    p.resolve(1.23);
    let jobs = sched.run().unwrap();

    assert_eq!(r.state(), State::Fulfilled);
    assert_eq!(r.outcome(), Value::from(34));
    println!("{} jobs, r = {}, adopted = {}", jobs, r.outcome(), adopted.outcome());
}
