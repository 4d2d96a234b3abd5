// SPDX-License-Identifier: PMPL-1.0-or-later

//! Classic memory-safety violations

use crate::driver::kill_self;
use std::hint::black_box;

/// Served by `mmap`, so `free` returns the pages to the kernel
const UNMAPPED_BLOCK: usize = 4 << 20;
const SMALL_BLOCK: usize = 48;
const OVERRUN_BYTES: usize = 64 * 1024;
const RECURSION_PAD: usize = 1024;

pub fn use_after_free() -> ! {
    unsafe {
        let block = libc::malloc(UNMAPPED_BLOCK) as *mut u8;
        if block.is_null() {
            std::process::abort();
        }
        block.write_volatile(1);
        libc::free(block.cast());
        let stale = black_box(block);
        stale.write_volatile(0x41);
        stale.wrapping_add(UNMAPPED_BLOCK / 2).write_volatile(0x41);
    }
    kill_self()
}

pub fn double_free() -> ! {
    unsafe {
        let block = libc::malloc(SMALL_BLOCK);
        if block.is_null() {
            std::process::abort();
        }
        libc::free(block);
        libc::free(black_box(block));
    }
    kill_self()
}

pub fn stack_overflow() -> ! {
    let depth = recurse(black_box(0));
    black_box(depth);
    kill_self()
}

#[allow(unconditional_recursion)]
#[inline(never)]
fn recurse(depth: u64) -> u64 {
    let mut pad = [0u8; RECURSION_PAD];
    pad[0] = depth as u8;
    black_box(&mut pad);
    recurse(black_box(depth + 1)) + u64::from(pad[1])
}

/// Write far past the end of a small heap block, then make the allocator
/// walk the trampled neighbors.
pub fn buffer_overflow() -> ! {
    unsafe {
        let block = libc::malloc(SMALL_BLOCK) as *mut u8;
        if block.is_null() {
            std::process::abort();
        }
        let base = black_box(block);
        for offset in 0..OVERRUN_BYTES {
            base.wrapping_add(offset).write_volatile(0x41);
        }
        let neighbor = libc::malloc(OVERRUN_BYTES);
        libc::free(block.cast());
        libc::free(neighbor);
    }
    kill_self()
}
