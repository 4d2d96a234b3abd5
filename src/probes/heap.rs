// SPDX-License-Identifier: PMPL-1.0-or-later

//! Heap metadata corruption

use crate::driver::kill_self;
use std::hint::black_box;

const BLOCK_BYTES: usize = 64;
const SCRIBBLE: u64 = 0xdead_beef_dead_beef;

/// Overwrite the allocator's chunk header in front of a live block, then
/// hand the block back so the allocator trips over its own bookkeeping.
pub fn corrupt_malloc_tracking() -> ! {
    unsafe {
        let block = libc::malloc(BLOCK_BYTES) as *mut u64;
        if block.is_null() {
            std::process::abort();
        }
        let header = black_box(block).wrapping_sub(2);
        header.write_volatile(SCRIBBLE);
        header.wrapping_add(1).write_volatile(SCRIBBLE);
        libc::free(block.cast());
        black_box(libc::malloc(BLOCK_BYTES));
    }
    kill_self()
}
