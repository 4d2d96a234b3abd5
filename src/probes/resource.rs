// SPDX-License-Identifier: PMPL-1.0-or-later

//! Resource exhaustion: memory pressure and an unresponsive main thread

use super::workload::dispatch_workload;
use crate::driver::{arm_fallback, kill_self};
use std::alloc::{self, Layout};
use std::hint::black_box;
use std::ptr;
use std::time::{Duration, Instant};

const CHUNK_BYTES: usize = 512 << 20;
/// Watchdog deadline for the hang probe
const HANG_WATCHDOG: Duration = Duration::from_secs(10);
const HANG_FOR: Duration = Duration::from_secs(60);

/// Allocate and touch every page until the kernel steps in
pub fn out_of_memory() -> ! {
    loop {
        let chunk = unsafe { libc::malloc(CHUNK_BYTES) } as *mut u8;
        if chunk.is_null() {
            match Layout::from_size_align(CHUNK_BYTES, 1) {
                Ok(layout) => alloc::handle_alloc_error(layout),
                Err(_) => std::process::abort(),
            }
        }
        unsafe { ptr::write_bytes(black_box(chunk), 0x41, CHUNK_BYTES) };
    }
}

/// Keep the main thread busy with realistic work until a watchdog kills it
pub fn main_thread_hang() -> ! {
    arm_fallback(HANG_WATCHDOG);
    let mut rng = rand::thread_rng();
    let deadline = Instant::now() + HANG_FOR;
    while Instant::now() < deadline {
        dispatch_workload(&mut rng);
    }
    kill_self()
}
