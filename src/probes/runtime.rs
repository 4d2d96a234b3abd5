// SPDX-License-Identifier: PMPL-1.0-or-later

//! Object-model corruption probes.
//!
//! Rust's runtime object model is the trait object: a data pointer paired
//! with a vtable pointer. These probes dispatch through freed data, through a
//! replaced vtable, and through a data pointer that was never an object.

use super::GARBAGE_ADDRESS;
use crate::driver::kill_self;
use std::alloc::{self, Layout};
use std::fmt;
use std::hint::black_box;
use std::mem;
use std::ptr;

/// Large enough that the allocator serves it straight from `mmap`, so freeing
/// it unmaps the pages.
const RECEIVER_SLOTS: usize = 64 * 1024;

/// Low address posing as an object in the formatting probe
const NON_OBJECT_ADDRESS: usize = 0x40;

/// Vtable with valid size/align words and null method slots
static HOLLOW_VTABLE: [usize; 8] = [0, 8, 8, 0, 0, 0, 0, 0];

trait Responder {
    fn respond(&self) -> u64;
}

#[repr(C)]
struct Receiver {
    slots: [u64; RECEIVER_SLOTS],
}

impl Responder for Receiver {
    fn respond(&self) -> u64 {
        unsafe { ptr::read_volatile(&self.slots[0]) }
    }
}

struct Counter {
    hits: u64,
}

impl Responder for Counter {
    fn respond(&self) -> u64 {
        self.hits
    }
}

fn allocate_receiver() -> Box<Receiver> {
    let layout = Layout::new::<Receiver>();
    let raw = unsafe { alloc::alloc_zeroed(layout) } as *mut Receiver;
    if raw.is_null() {
        alloc::handle_alloc_error(layout);
    }
    unsafe { Box::from_raw(raw) }
}

fn split(object: *const dyn Responder) -> [usize; 2] {
    unsafe { mem::transmute::<*const dyn Responder, [usize; 2]>(object) }
}

fn join(parts: [usize; 2]) -> *const dyn Responder {
    unsafe { mem::transmute::<[usize; 2], *const dyn Responder>(parts) }
}

/// Dispatch a method on an object after it has been deallocated
pub fn message_freed_object() -> ! {
    let object: Box<dyn Responder> = allocate_receiver();
    let dangling = Box::into_raw(object);
    unsafe { drop(Box::from_raw(dangling)) };
    let reply = unsafe { (*black_box(dangling)).respond() };
    black_box(reply);
    kill_self()
}

/// Replace a live object's type metadata, then dispatch through it
pub fn corrupt_object_model() -> ! {
    let live: Box<dyn Responder> = Box::new(Counter { hits: 7 });
    let mut parts = split(&*live);
    parts[1] = HOLLOW_VTABLE.as_ptr() as usize;
    let corrupted = black_box(join(parts));
    let reply = unsafe { (*corrupted).respond() };
    black_box(reply);
    drop(live);
    kill_self()
}

/// Dispatch through type metadata that points into unmapped memory
pub fn invalid_isa() -> ! {
    let live: Box<dyn Responder> = Box::new(Counter { hits: 7 });
    let mut parts = split(&*live);
    parts[1] = GARBAGE_ADDRESS;
    let corrupted = black_box(join(parts));
    let reply = unsafe { (*corrupted).respond() };
    black_box(reply);
    drop(live);
    kill_self()
}

/// Hand the formatter an integer dressed up as a `String`
pub fn format_non_object() -> ! {
    let text = String::from("crash-probe");
    let genuine: *const dyn fmt::Display = &text;
    let [_, vtable] = unsafe { mem::transmute::<*const dyn fmt::Display, [usize; 2]>(genuine) };
    let bogus = unsafe {
        mem::transmute::<[usize; 2], *const dyn fmt::Display>([NON_OBJECT_ADDRESS, vtable])
    };
    let rendered = format!("{}", unsafe { &*black_box(bogus) });
    black_box(rendered);
    kill_self()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fat_pointer_split_join_preserves_dispatch() {
        let live: Box<dyn Responder> = Box::new(Counter { hits: 42 });
        let parts = split(&*live);
        let rebuilt = join(parts);
        assert_eq!(unsafe { (*rebuilt).respond() }, 42);
    }

    #[test]
    fn test_receiver_exceeds_mmap_threshold() {
        assert!(mem::size_of::<Receiver>() >= 128 * 1024);
    }
}
