// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stack corruption probes

use crate::driver::kill_self;
use std::hint::black_box;

const SMASH_PATTERN: u8 = 0xa5;
/// How far above a local buffer the upward smash reaches
const SMASH_SPAN: usize = 16 * 1024;
/// Start of the downward smash, clear of the current frame
const BOTTOM_CLEARANCE: usize = 4096;
/// Return target planted by the link register probe
const BOGUS_RETURN_ADDRESS: usize = 0x10;

/// Overwrite this frame's saved state and every caller frame above it, then return.
pub fn smash_stack_top() -> ! {
    smash_upward();
    kill_self()
}

#[inline(never)]
fn smash_upward() {
    let mut frame = [0u8; 16];
    let base = black_box(frame.as_mut_ptr());
    for offset in 0..SMASH_SPAN {
        unsafe { base.wrapping_add(offset).write_volatile(SMASH_PATTERN) };
    }
    black_box(&frame);
}

/// Scribble toward the stack limit until the guard region faults.
pub fn smash_stack_bottom() -> ! {
    let mut anchor = 0u8;
    let top = black_box(&mut anchor as *mut u8);
    let mut offset = BOTTOM_CLEARANCE;
    loop {
        unsafe { top.wrapping_sub(offset).write_volatile(SMASH_PATTERN) };
        offset = offset.wrapping_add(1);
    }
}

pub fn overwrite_link_register() -> ! {
    unsafe { return_to(BOGUS_RETURN_ADDRESS) }
}

#[cfg(target_arch = "x86_64")]
unsafe fn return_to(target: usize) -> ! {
    core::arch::asm!("push {0}", "ret", in(reg) target, options(noreturn))
}

#[cfg(target_arch = "aarch64")]
unsafe fn return_to(target: usize) -> ! {
    core::arch::asm!("mov x30, {0}", "ret", in(reg) target, options(noreturn))
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
unsafe fn return_to(_target: usize) -> ! {
    libc::raise(libc::SIGSEGV);
    kill_self()
}
