// SPDX-License-Identifier: PMPL-1.0-or-later

//! Memory access probes: hardware protection faults

use super::{map_page, GARBAGE_ADDRESS};
use crate::driver::kill_self;
use std::hint::black_box;
use std::ptr;

/// Read through a pointer that was never backed by a mapping
pub fn garbage_pointer_deref() -> ! {
    let garbage = black_box(GARBAGE_ADDRESS as *const u64);
    let value = unsafe { ptr::read_volatile(garbage) };
    black_box(value);
    kill_self()
}

pub fn write_to_read_only_page() -> ! {
    let page = black_box(map_page(libc::PROT_READ));
    unsafe { ptr::write_volatile(page, 0xa5) };
    kill_self()
}

/// Call into a readable, writable, but non-executable page
pub fn jump_to_non_executable_page() -> ! {
    let page = black_box(map_page(libc::PROT_READ | libc::PROT_WRITE));
    let entry = unsafe { std::mem::transmute::<*mut u8, extern "C" fn()>(page) };
    entry();
    kill_self()
}
