// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bad instruction probes.
//!
//! x86_64 and aarch64 execute the real opcode. Other targets raise the signal
//! the opcode would have produced.

use crate::driver::kill_self;

/// Opcode the CPU rejects outright (SIGILL)
pub fn undefined_instruction() -> ! {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("ud2", options(nomem, nostack));
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("udf #0", options(nomem, nostack));
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    unsafe {
        libc::raise(libc::SIGILL);
    }
    kill_self()
}

/// Supervisor-only opcode executed at user privilege
pub fn privileged_instruction() -> ! {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack));
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("mrs {0}, ttbr0_el1", out(reg) _, options(nomem, nostack));
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    unsafe {
        libc::raise(libc::SIGILL);
    }
    kill_self()
}

pub fn builtin_trap() -> ! {
    trap_instruction();
    kill_self()
}

/// Execute the architecture's debugger breakpoint (SIGTRAP).
pub(crate) fn trap_instruction() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("int3", options(nomem, nostack));
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("brk #0xf000", options(nomem, nostack));
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    unsafe {
        libc::raise(libc::SIGTRAP);
    }
}
