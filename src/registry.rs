// SPDX-License-Identifier: PMPL-1.0-or-later

//! The crash probe registry.
//!
//! An ordered, immutable table from probe name to descriptor. It is built once
//! at startup and handed around by reference. Lookups are explicit name
//! matches; there is no reflection and no global state.

use crate::error::{ProbeError, ProbeResult};
use crate::probes::{
    exception, heap, instruction, memory, panics, resource, runtime, safety, stack, threading,
};
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use std::convert::Infallible;

const FAULT: &[Signal] = &[Signal::Segv, Signal::Bus];
const ILLEGAL: &[Signal] = &[Signal::Ill];
const PRIVILEGED: &[Signal] = &[Signal::Segv, Signal::Ill, Signal::Bus];
const TRAP: &[Signal] = &[Signal::Trap];
const ABORT: &[Signal] = &[Signal::Abrt];
const GUARD: &[Signal] = &[Signal::Segv, Signal::Bus, Signal::Abrt, Signal::Kill];
const ANY_FAULT: &[Signal] = &[
    Signal::Segv,
    Signal::Bus,
    Signal::Ill,
    Signal::Trap,
    Signal::Abrt,
    Signal::Fpe,
    Signal::Kill,
];
const ALLOCATOR: &[Signal] = &[Signal::Abrt, Signal::Segv, Signal::Bus, Signal::Kill];
const STALE_ACCESS: &[Signal] = &[Signal::Segv, Signal::Bus, Signal::Kill];
const LOCK_HOLDER: &[Signal] = &[Signal::Trap, Signal::Ill, Signal::Kill];
const EXHAUSTION: &[Signal] = &[Signal::Kill, Signal::Abrt, Signal::Segv];
const WATCHDOG: &[Signal] = &[Signal::Kill];

const UNCAUGHT_PANIC: Termination = Termination::ExitCode(PANIC_EXIT_CODE);

#[derive(Debug, Clone)]
pub struct Registry {
    probes: Vec<ProbeDescriptor>,
}

impl Registry {
    /// The full built-in catalog, in declaration order
    pub fn builtin() -> Self {
        Self::from_probes(builtin_probes())
    }

    pub fn from_probes(probes: Vec<ProbeDescriptor>) -> Self {
        Self { probes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbeDescriptor> {
        self.probes.iter()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name).collect()
    }

    /// Categories that have at least one probe, in declaration order
    pub fn categories(&self) -> Vec<ProbeCategory> {
        ProbeCategory::all()
            .into_iter()
            .filter(|cat| self.probes.iter().any(|p| p.category == *cat))
            .collect()
    }

    pub fn in_category(&self, category: ProbeCategory) -> Vec<&ProbeDescriptor> {
        self.probes
            .iter()
            .filter(|p| p.category == category)
            .collect()
    }

    /// Resolve a name or alias, ignoring ASCII case
    pub fn lookup(&self, name: &str) -> ProbeResult<&ProbeDescriptor> {
        let query = name.trim();
        self.probes
            .iter()
            .find(|p| p.answers_to(query))
            .ok_or_else(|| ProbeError::UnknownProbe {
                name: query.to_string(),
                suggestion: self.suggest(query),
            })
    }

    /// Run a probe by name. Only returns when the name is unknown.
    pub fn invoke(&self, name: &str) -> ProbeResult<Infallible> {
        let probe = self.lookup(name)?;
        (probe.action)()
    }

    /// Random probe, optionally restricted to one category
    pub fn pick<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        category: Option<ProbeCategory>,
    ) -> ProbeResult<&ProbeDescriptor> {
        let candidates: Vec<&ProbeDescriptor> = match category {
            Some(cat) => self.in_category(cat),
            None => self.probes.iter().collect(),
        };
        candidates
            .choose(rng)
            .copied()
            .ok_or(match category {
                Some(cat) => ProbeError::NoProbes(cat),
                None => ProbeError::EmptyRegistry,
            })
    }

    fn suggest(&self, query: &str) -> Option<String> {
        let needle = query.to_ascii_lowercase();
        if needle.len() < 3 {
            return None;
        }
        self.probes
            .iter()
            .find(|p| {
                std::iter::once(p.name)
                    .chain(p.aliases.iter().copied())
                    .map(str::to_ascii_lowercase)
                    .any(|candidate| candidate.contains(&needle) || needle.contains(&candidate))
            })
            .map(|p| p.name.to_string())
    }
}

fn builtin_probes() -> Vec<ProbeDescriptor> {
    vec![
        // Memory access
        ProbeDescriptor {
            name: "GarbagePointerDeref",
            aliases: &[],
            category: ProbeCategory::MemoryAccess,
            display_name: "Garbage pointer deref",
            description: "Reads through a pointer to an address that was never mapped.",
            expected: Termination::Signal(FAULT),
            action: memory::garbage_pointer_deref,
        },
        ProbeDescriptor {
            name: "WriteToReadOnlyPage",
            aliases: &[],
            category: ProbeCategory::MemoryAccess,
            display_name: "Write to read-only page",
            description: "Maps a read-only page and stores into it.",
            expected: Termination::Signal(FAULT),
            action: memory::write_to_read_only_page,
        },
        ProbeDescriptor {
            name: "JumpToNonExecutablePage",
            aliases: &[],
            category: ProbeCategory::MemoryAccess,
            display_name: "Jump to non-executable page",
            description: "Calls into a writable page mapped without execute permission.",
            expected: Termination::Signal(FAULT),
            action: memory::jump_to_non_executable_page,
        },
        // Bad instruction
        ProbeDescriptor {
            name: "UndefinedInstruction",
            aliases: &[],
            category: ProbeCategory::BadInstruction,
            display_name: "Undefined instruction",
            description: "Executes an opcode the CPU rejects (ud2 / udf).",
            expected: Termination::Signal(ILLEGAL),
            action: instruction::undefined_instruction,
        },
        ProbeDescriptor {
            name: "PrivilegedInstruction",
            aliases: &[],
            category: ProbeCategory::BadInstruction,
            display_name: "Privileged instruction",
            description: "Executes a supervisor-only opcode in user mode (hlt / mrs ttbr0_el1).",
            expected: Termination::Signal(PRIVILEGED),
            action: instruction::privileged_instruction,
        },
        ProbeDescriptor {
            name: "BuiltinTrap",
            aliases: &[],
            category: ProbeCategory::BadInstruction,
            display_name: "Debug trap",
            description: "Executes the debugger breakpoint instruction (int3 / brk).",
            expected: Termination::Signal(TRAP),
            action: instruction::builtin_trap,
        },
        // Stack corruption
        ProbeDescriptor {
            name: "SmashStackTop",
            aliases: &[],
            category: ProbeCategory::StackCorruption,
            display_name: "Smash stack top",
            description: "Overwrites the current and caller frames with a fill pattern, then returns.",
            expected: Termination::Signal(ANY_FAULT),
            action: stack::smash_stack_top,
        },
        ProbeDescriptor {
            name: "SmashStackBottom",
            aliases: &[],
            category: ProbeCategory::StackCorruption,
            display_name: "Smash stack bottom",
            description: "Writes from the current frame toward the stack limit until the guard faults.",
            expected: Termination::Signal(GUARD),
            action: stack::smash_stack_bottom,
        },
        ProbeDescriptor {
            name: "OverwriteLinkRegister",
            aliases: &[],
            category: ProbeCategory::StackCorruption,
            display_name: "Overwrite link register",
            description: "Replaces the return address with a bogus one and returns through it.",
            expected: Termination::Signal(FAULT),
            action: stack::overwrite_link_register,
        },
        // Runtime corruption
        ProbeDescriptor {
            name: "MessageFreedObject",
            aliases: &[],
            category: ProbeCategory::RuntimeCorruption,
            display_name: "Message freed object",
            description: "Dispatches a trait method on an object whose memory was released.",
            expected: Termination::Signal(FAULT),
            action: runtime::message_freed_object,
        },
        ProbeDescriptor {
            name: "CorruptObjCRuntime",
            aliases: &[],
            category: ProbeCategory::RuntimeCorruption,
            display_name: "Corrupt object model",
            description: "Swaps a live trait object's vtable for a hollow one, then dispatches.",
            expected: Termination::Signal(FAULT),
            action: runtime::corrupt_object_model,
        },
        ProbeDescriptor {
            name: "InvalidISA",
            aliases: &["objcMsgSendInvalidISA"],
            category: ProbeCategory::RuntimeCorruption,
            display_name: "Dispatch through invalid type pointer",
            description: "Dispatches through a vtable pointer aimed at unmapped memory.",
            expected: Termination::Signal(FAULT),
            action: runtime::invalid_isa,
        },
        ProbeDescriptor {
            name: "NSLogNonObject",
            aliases: &["FormatNonObject"],
            category: ProbeCategory::RuntimeCorruption,
            display_name: "Format non-object",
            description: "Passes an integer disguised as a String to the formatter.",
            expected: Termination::Signal(FAULT),
            action: runtime::format_non_object,
        },
        // Language exception (native)
        ProbeDescriptor {
            name: "CPPException",
            aliases: &[],
            category: ProbeCategory::CppException,
            display_name: "Native exception",
            description: "Panics with a typed payload inside an extern \"C\" frame.",
            expected: Termination::Signal(ABORT),
            action: exception::cpp_exception,
        },
        ProbeDescriptor {
            name: "CPPBadAlloc",
            aliases: &[],
            category: ProbeCategory::CppException,
            display_name: "Allocation failure",
            description: "Requests an impossible allocation and hands the failure to the OOM handler.",
            expected: Termination::Signal(ABORT),
            action: exception::cpp_bad_alloc,
        },
        ProbeDescriptor {
            name: "CPPStringExceptionHeap",
            aliases: &[],
            category: ProbeCategory::CppException,
            display_name: "Native string exception (heap)",
            description: "Panics with a heap-allocated String inside an extern \"C\" frame.",
            expected: Termination::Signal(ABORT),
            action: exception::cpp_string_exception_heap,
        },
        ProbeDescriptor {
            name: "CPPStringExceptionStack",
            aliases: &[],
            category: ProbeCategory::CppException,
            display_name: "Native string exception (stack)",
            description: "Panics with a message built in a stack buffer inside an extern \"C\" frame.",
            expected: Termination::Signal(ABORT),
            action: exception::cpp_string_exception_stack,
        },
        ProbeDescriptor {
            name: "CPPConstCharException",
            aliases: &[],
            category: ProbeCategory::CppException,
            display_name: "Native static string exception",
            description: "Panics with a &'static str inside an extern \"C\" frame.",
            expected: Termination::Signal(ABORT),
            action: exception::cpp_const_char_exception,
        },
        // Language exception (managed)
        ProbeDescriptor {
            name: "ObjCExceptionThrow",
            aliases: &[],
            category: ProbeCategory::LanguageException,
            display_name: "Managed exception throw",
            description: "Panics and lets the unwind escape main.",
            expected: UNCAUGHT_PANIC,
            action: exception::managed_exception_throw,
        },
        ProbeDescriptor {
            name: "ObjCExceptionRaise",
            aliases: &[],
            category: ProbeCategory::LanguageException,
            display_name: "Managed exception raise",
            description: "Starts an unwind with resume_unwind, bypassing the panic hook.",
            expected: UNCAUGHT_PANIC,
            action: exception::managed_exception_raise,
        },
        ProbeDescriptor {
            name: "ObjCExceptionFromCPP",
            aliases: &[],
            category: ProbeCategory::LanguageException,
            display_name: "Managed exception from native handler",
            description: "Catches a native panic and raises an uncaught one from the handler.",
            expected: UNCAUGHT_PANIC,
            action: exception::managed_exception_from_native,
        },
        // Heap corruption
        ProbeDescriptor {
            name: "CorruptMallocTracking",
            aliases: &[],
            category: ProbeCategory::HeapCorruption,
            display_name: "Corrupt malloc tracking",
            description: "Scribbles over a chunk header, then frees the chunk.",
            expected: Termination::Signal(ALLOCATOR),
            action: heap::corrupt_malloc_tracking,
        },
        // Threading
        ProbeDescriptor {
            name: "PthreadLockHeld",
            aliases: &["pthreadCrashWithLockHeld"],
            category: ProbeCategory::Threading,
            display_name: "Crash with lock held",
            description: "A worker traps while holding the mutex the main thread is blocked on.",
            expected: Termination::Signal(LOCK_HOLDER),
            action: threading::pthread_lock_held,
        },
        // Memory safety
        ProbeDescriptor {
            name: "UseAfterFree",
            aliases: &[],
            category: ProbeCategory::MemorySafety,
            display_name: "Use after free",
            description: "Writes into an allocation after its pages were returned to the kernel.",
            expected: Termination::Signal(STALE_ACCESS),
            action: safety::use_after_free,
        },
        ProbeDescriptor {
            name: "DoubleFree",
            aliases: &[],
            category: ProbeCategory::MemorySafety,
            display_name: "Double free",
            description: "Frees the same block twice.",
            expected: Termination::Signal(ALLOCATOR),
            action: safety::double_free,
        },
        ProbeDescriptor {
            name: "StackOverflow",
            aliases: &[],
            category: ProbeCategory::MemorySafety,
            display_name: "Stack overflow",
            description: "Recurses without bound until the stack guard is hit.",
            expected: Termination::Signal(GUARD),
            action: safety::stack_overflow,
        },
        ProbeDescriptor {
            name: "BufferOverflow",
            aliases: &[],
            category: ProbeCategory::MemorySafety,
            display_name: "Buffer overflow",
            description: "Writes far past a small heap block, then exercises the allocator.",
            expected: Termination::Signal(ALLOCATOR),
            action: safety::buffer_overflow,
        },
        // Panic
        ProbeDescriptor {
            name: "Panic",
            aliases: &["swiftFatalError", "FatalError"],
            category: ProbeCategory::Panic,
            display_name: "panic!()",
            description: "Explicit panic that unwinds out of main.",
            expected: UNCAUGHT_PANIC,
            action: panics::fatal_panic,
        },
        ProbeDescriptor {
            name: "AssertionFailure",
            aliases: &["swiftAssertionFailure"],
            category: ProbeCategory::Panic,
            display_name: "assert!() failure",
            description: "Assertion on a value the optimizer cannot see is false.",
            expected: UNCAUGHT_PANIC,
            action: panics::assertion_failure,
        },
        ProbeDescriptor {
            name: "UnwrapNone",
            aliases: &["forceUnwrapNil"],
            category: ProbeCategory::Panic,
            display_name: "Unwrap None",
            description: "Unwraps an Option read from an unset environment variable.",
            expected: UNCAUGHT_PANIC,
            action: panics::unwrap_none,
        },
        ProbeDescriptor {
            name: "IndexOutOfBounds",
            aliases: &["arrayOutOfBounds"],
            category: ProbeCategory::Panic,
            display_name: "Index out of bounds",
            description: "Indexes a three-element array with a pid-derived index.",
            expected: UNCAUGHT_PANIC,
            action: panics::index_out_of_bounds,
        },
        // Resource exhaustion
        ProbeDescriptor {
            name: "OutOfMemory",
            aliases: &[],
            category: ProbeCategory::Resource,
            display_name: "Out of memory",
            description: "Allocates and touches 512 MiB chunks until the system intervenes.",
            expected: Termination::Signal(EXHAUSTION),
            action: resource::out_of_memory,
        },
        ProbeDescriptor {
            name: "MainThreadHang",
            aliases: &[],
            category: ProbeCategory::Resource,
            display_name: "Main thread hang",
            description: "Busy main thread killed by a 10 second watchdog.",
            expected: Termination::Signal(WATCHDOG),
            action: resource::main_thread_hang,
        },
    ]
}
