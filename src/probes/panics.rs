// SPDX-License-Identifier: PMPL-1.0-or-later

//! Language-level fatal errors that go through the panic machinery

use crate::driver::kill_self;
use std::hint::black_box;

/// Environment variable that is never set, so reading it yields `None`
const NIL_VARIABLE: &str = "__CRASH_PROBE_NIL__";

pub fn fatal_panic() -> ! {
    panic!("crash-probe: intentional fatal error")
}

pub fn assertion_failure() -> ! {
    let healthy = black_box(false);
    assert!(healthy, "crash-probe: intentional assertion failure");
    kill_self()
}

pub fn unwrap_none() -> ! {
    let value = black_box(std::env::var_os(NIL_VARIABLE));
    black_box(value.unwrap());
    kill_self()
}

/// Index derived from the pid so the optimizer cannot fold the bounds check
pub fn index_out_of_bounds() -> ! {
    let values = [1u32, 2, 3];
    let index = black_box(std::process::id() as usize | 0x100);
    black_box(values[index]);
    kill_self()
}
