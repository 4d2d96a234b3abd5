// SPDX-License-Identifier: PMPL-1.0-or-later

//! Language exception probes.
//!
//! The native dialect panics inside an `extern "C"` frame. The panic cannot
//! unwind through it, so the runtime aborts the process (SIGABRT) after the
//! panic hook reports the payload. The managed dialect lets a panic unwind out
//! of `main`, which ends the process with exit status 101.

use crate::driver::kill_self;
use std::alloc::{self, Layout};
use std::any::Any;
use std::fmt;
use std::hint::black_box;
use std::panic;

/// Far beyond any address space the allocator could satisfy
const BAD_ALLOC_BYTES: usize = 1 << 62;

/// Typed payload thrown by the native exception probes
#[derive(Debug)]
pub struct NativeException {
    pub code: i32,
    pub reason: &'static str,
}

impl fmt::Display for NativeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeException({}): {}", self.code, self.reason)
    }
}

/// Payload raised through `resume_unwind`
#[derive(Debug)]
pub struct ManagedException {
    pub name: &'static str,
    pub reason: &'static str,
}

/// Render a panic payload with its type, for diagnostics
pub fn describe_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        format!("&str: {}", text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("String: {}", text)
    } else if let Some(native) = payload.downcast_ref::<NativeException>() {
        native.to_string()
    } else if let Some(managed) = payload.downcast_ref::<ManagedException>() {
        format!("{}: {}", managed.name, managed.reason)
    } else {
        "opaque payload".to_string()
    }
}

extern "C" fn throw_typed() {
    panic::panic_any(NativeException {
        code: 0x0bad,
        reason: "uncaught typed exception from crash-probe",
    })
}

extern "C" fn throw_heap_string() {
    let message = format!(
        "uncaught heap string exception from crash-probe (pid {})",
        std::process::id()
    );
    panic::panic_any(message)
}

extern "C" fn throw_stack_string() {
    let mut buffer = [0u8; 64];
    let message = b"uncaught stack string exception from crash-probe";
    buffer[..message.len()].copy_from_slice(message);
    let text = std::str::from_utf8(&buffer[..message.len()]).unwrap_or("stack string");
    panic!("{}", black_box(text))
}

extern "C" fn throw_const_str() {
    panic::panic_any::<&'static str>("uncaught const char exception from crash-probe")
}

pub fn cpp_exception() -> ! {
    throw_typed();
    kill_self()
}

fn impossible_layout() -> Layout {
    match Layout::from_size_align(BAD_ALLOC_BYTES, 4096) {
        Ok(layout) => layout,
        Err(_) => std::process::abort(),
    }
}

/// Ask the global allocator for `layout`. The result escapes through
/// `black_box`, so the optimizer can neither drop the call nor assume success.
#[inline(never)]
fn request_block(layout: Layout) -> *mut u8 {
    let block = unsafe { alloc::alloc(black_box(layout)) };
    black_box(block)
}

/// Allocation failure routed through the runtime's out-of-memory handler
pub fn cpp_bad_alloc() -> ! {
    let layout = impossible_layout();
    let block = request_block(layout);
    if block.is_null() {
        alloc::handle_alloc_error(layout);
    }
    unsafe { alloc::dealloc(block, layout) };
    kill_self()
}

pub fn cpp_string_exception_heap() -> ! {
    throw_heap_string();
    kill_self()
}

pub fn cpp_string_exception_stack() -> ! {
    throw_stack_string();
    kill_self()
}

pub fn cpp_const_char_exception() -> ! {
    throw_const_str();
    kill_self()
}

pub fn managed_exception_throw() -> ! {
    panic!("ManagedException: uncaught exception thrown by crash-probe")
}

/// Raise through the unwinder directly; the panic hook never runs
pub fn managed_exception_raise() -> ! {
    panic::resume_unwind(Box::new(ManagedException {
        name: "ManagedException",
        reason: "uncaught exception raised by crash-probe",
    }))
}

/// Catch a native exception and raise a managed one from the handler
pub fn managed_exception_from_native() -> ! {
    let caught = panic::catch_unwind::<_, ()>(|| {
        panic::panic_any(NativeException {
            code: 0x0c99,
            reason: "native exception caught by crash-probe",
        })
    });
    match caught {
        Err(payload) => panic!(
            "ManagedException raised while handling {}",
            describe_payload(payload.as_ref())
        ),
        Ok(()) => kill_self(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_payload_variants() {
        let text: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(describe_payload(text.as_ref()), "&str: boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("heap"));
        assert_eq!(describe_payload(owned.as_ref()), "String: heap");

        let native: Box<dyn Any + Send> = Box::new(NativeException {
            code: 1,
            reason: "x",
        });
        assert_eq!(describe_payload(native.as_ref()), "NativeException(1): x");

        let other: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(describe_payload(other.as_ref()), "opaque payload");
    }

    #[test]
    fn test_impossible_allocation_reports_failure() {
        let block = request_block(impossible_layout());
        assert!(block.is_null());
    }

    #[test]
    fn test_native_payload_is_catchable_in_rust_frames() {
        let caught = panic::catch_unwind::<_, ()>(|| {
            panic::panic_any(NativeException {
                code: 2,
                reason: "caught",
            })
        });
        let payload = caught.expect_err("panic should propagate to catch_unwind");
        assert!(payload.downcast_ref::<NativeException>().is_some());
    }
}
