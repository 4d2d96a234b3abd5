// SPDX-License-Identifier: PMPL-1.0-or-later

//! Probe bodies, one module per fault family.
//!
//! Every public function here is a [`crate::types::ProbeAction`]: it takes no
//! arguments and never returns. Bodies whose fault depends on undefined
//! behavior end with [`crate::driver::kill_self`] so a probe that survives its
//! own corruption still terminates the process.

pub mod exception;
pub mod heap;
pub mod instruction;
pub mod memory;
pub mod panics;
pub mod resource;
pub mod runtime;
pub mod safety;
pub mod stack;
pub mod threading;
pub mod workload;

use std::ptr;

/// Low, page-aligned address that is never mapped in a user process
pub(crate) const GARBAGE_ADDRESS: usize = 0x4141_4140;

pub(crate) fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// Map one anonymous page with the given protection.
///
/// Aborts if the kernel refuses, since a probe has no error channel.
pub(crate) fn map_page(protection: libc::c_int) -> *mut u8 {
    let page = unsafe {
        libc::mmap(
            ptr::null_mut(),
            page_size(),
            protection,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };
    if page == libc::MAP_FAILED {
        eprintln!(
            "crash-probe: mmap failed: {}",
            std::io::Error::last_os_error()
        );
        std::process::abort();
    }
    page.cast()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn test_map_page_is_writable_when_requested() {
        let page = map_page(libc::PROT_READ | libc::PROT_WRITE);
        unsafe {
            page.write(0x5a);
            assert_eq!(page.read(), 0x5a);
            libc::munmap(page.cast(), page_size());
        }
    }
}
