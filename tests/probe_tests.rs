// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end probe tests: every probe is fired in a child process and the
//! child's termination is checked against the probe's declared expectation.

#![cfg(unix)]

use crash_probe::types::ProbeCategory;
use crash_probe::Registry;
use std::ffi::OsStr;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, Output};

const STACK_LIMIT: libc::rlim_t = 8 * 1024 * 1024;

/// Set in a re-executed copy of this test binary: the probe to invoke
const INVOKE_IN_CHILD: &str = "CRASH_PROBE_TEST_INVOKE";

fn crash_probe() -> Command {
    contained(env!("CARGO_BIN_EXE_crash-probe"))
}

/// A child with no core files, a bounded stack, and no driver settings
/// leaking in from the environment
fn contained(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    for var in [
        "CRASH_PROBE_TYPE",
        "CRASH_PROBE_ON_LAUNCH",
        "CRASH_PROBE_RUN_ID",
        "CRASH_PROBE_FALLBACK_SECS",
        "CRASH_PROBE_CALL_CHAIN",
        "CRASH_PROBE_STATE_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("RUST_BACKTRACE", "0");

    // No core files, and a bounded main-thread stack for the stack probes.
    unsafe {
        cmd.pre_exec(|| {
            let no_core = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            libc::setrlimit(libc::RLIMIT_CORE, &no_core);
            let mut stack = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            if libc::getrlimit(libc::RLIMIT_STACK, &mut stack) == 0
                && (stack.rlim_cur == libc::RLIM_INFINITY || stack.rlim_cur > STACK_LIMIT)
            {
                stack.rlim_cur = STACK_LIMIT;
                libc::setrlimit(libc::RLIMIT_STACK, &stack);
            }
            Ok(())
        });
    }
    cmd
}

fn fire(name: &str, extra: &[&str]) -> Output {
    crash_probe()
        .args(["--quiet", "run", name, "--fallback-secs", "20"])
        .args(extra)
        .output()
        .expect("failed to spawn crash-probe")
}

fn assert_terminates_as_declared(name: &str) {
    let registry = Registry::builtin();
    let probe = registry.lookup(name).expect("probe should be registered");
    let output = fire(name, &["--no-chain"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        !output.status.success(),
        "{} exited cleanly\nstderr:\n{}",
        name,
        stderr
    );
    assert!(
        probe.expected.matches(&output.status),
        "{} ended with {:?} (signal {:?}), expected {}\nstderr:\n{}",
        name,
        output.status,
        output.status.signal(),
        probe.expected,
        stderr
    );
    assert!(
        stderr.contains(&format!("firing {} [{}] via direct", probe.name, probe.category)),
        "breadcrumb missing for {}\nstderr:\n{}",
        name,
        stderr
    );
}

macro_rules! probe_tests {
    ($($test:ident => $name:literal),+ $(,)?) => {
        $(
            #[test]
            fn $test() {
                assert_terminates_as_declared($name);
            }
        )+
    };
}

probe_tests! {
    test_garbage_pointer_deref => "GarbagePointerDeref",
    test_write_to_read_only_page => "WriteToReadOnlyPage",
    test_jump_to_non_executable_page => "JumpToNonExecutablePage",
    test_undefined_instruction => "UndefinedInstruction",
    test_privileged_instruction => "PrivilegedInstruction",
    test_builtin_trap => "BuiltinTrap",
    test_smash_stack_top => "SmashStackTop",
    test_smash_stack_bottom => "SmashStackBottom",
    test_overwrite_link_register => "OverwriteLinkRegister",
    test_message_freed_object => "MessageFreedObject",
    test_corrupt_object_model => "CorruptObjCRuntime",
    test_invalid_isa => "InvalidISA",
    test_format_non_object => "NSLogNonObject",
    test_native_exception => "CPPException",
    test_native_bad_alloc => "CPPBadAlloc",
    test_native_string_exception_heap => "CPPStringExceptionHeap",
    test_native_string_exception_stack => "CPPStringExceptionStack",
    test_native_const_char_exception => "CPPConstCharException",
    test_managed_exception_throw => "ObjCExceptionThrow",
    test_managed_exception_raise => "ObjCExceptionRaise",
    test_managed_exception_from_native => "ObjCExceptionFromCPP",
    test_corrupt_malloc_tracking => "CorruptMallocTracking",
    test_lock_held_by_crashing_thread => "PthreadLockHeld",
    test_use_after_free => "UseAfterFree",
    test_double_free => "DoubleFree",
    test_stack_overflow => "StackOverflow",
    test_buffer_overflow => "BufferOverflow",
    test_fatal_panic => "Panic",
    test_assertion_failure => "AssertionFailure",
    test_unwrap_none => "UnwrapNone",
    test_index_out_of_bounds => "IndexOutOfBounds",
}

#[test]
#[ignore = "allocates until the allocator gives up"]
fn test_out_of_memory() {
    assert_terminates_as_declared("OutOfMemory");
}

#[test]
#[ignore = "hangs the main thread until the watchdog fires"]
fn test_main_thread_hang() {
    assert_terminates_as_declared("MainThreadHang");
}

#[test]
fn test_every_quick_probe_has_a_test() {
    // Keep the table above in sync with the registry.
    let source = include_str!("probe_tests.rs");
    let registry = Registry::builtin();
    for probe in registry.iter() {
        assert!(
            source.contains(&format!("\"{}\"", probe.name)),
            "no end-to-end test fires {}",
            probe.name
        );
    }
}

#[test]
fn test_fire_through_call_chain() {
    let output = fire("GarbagePointerDeref", &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let registry = Registry::builtin();
    let probe = registry.lookup("GarbagePointerDeref").unwrap();

    assert!(probe.expected.matches(&output.status), "stderr:\n{}", stderr);
    let trail = stderr
        .lines()
        .find(|line| line.contains("firing GarbagePointerDeref"))
        .expect("breadcrumb line");
    let path = trail.split(" via ").nth(1).expect("call path");
    assert_ne!(path, "direct");
    assert!(path.split(" > ").count() >= 4, "short chain: {}", path);
}

#[test]
fn test_random_respects_category() {
    let output = crash_probe()
        .args(["--quiet", "random", "--category", "panic", "--no-chain"])
        .output()
        .expect("failed to spawn crash-probe");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(101), "stderr:\n{}", stderr);
    let registry = Registry::builtin();
    let fired = registry
        .in_category(ProbeCategory::Panic)
        .iter()
        .any(|p| stderr.contains(&format!("firing {} [", p.name)));
    assert!(fired, "no panic probe named in stderr:\n{}", stderr);
}

fn assert_stderr_names_payload(name: &str, expected: &str) {
    let output = fire(name, &["--no-chain"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.signal(), Some(libc::SIGABRT), "stderr:\n{}", stderr);
    assert!(
        stderr.contains(expected),
        "{} diagnostic lacks '{}'\nstderr:\n{}",
        name,
        expected,
        stderr
    );
}

#[test]
fn test_native_exception_names_payload_type() {
    assert_stderr_names_payload("CPPException", "uncaught NativeException(2989)");
}

#[test]
fn test_native_string_exceptions_name_payload_type() {
    assert_stderr_names_payload("CPPStringExceptionHeap", "uncaught String: ");
    assert_stderr_names_payload("CPPStringExceptionStack", "uncaught String: ");
    assert_stderr_names_payload("CPPConstCharException", "uncaught &str: ");
}

#[test]
fn test_registry_invoke_terminates_as_declared() {
    if let Ok(name) = std::env::var(INVOKE_IN_CHILD) {
        let registry = Registry::builtin();
        let returned = registry.invoke(&name);
        eprintln!("invoke returned for {}: {:?}", name, returned);
        std::process::exit(3);
    }

    let registry = Registry::builtin();
    let harness = std::env::current_exe().expect("test binary path");
    for name in ["GarbagePointerDeref", "BuiltinTrap", "CPPConstCharException", "Panic"] {
        let probe = registry.lookup(name).unwrap();
        let output = contained(&harness)
            .args([
                "test_registry_invoke_terminates_as_declared",
                "--exact",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(INVOKE_IN_CHILD, name)
            .output()
            .expect("failed to re-run test binary");
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert!(
            !stderr.contains("invoke returned"),
            "{} returned from invoke\nstderr:\n{}",
            name,
            stderr
        );
        assert!(
            probe.expected.matches(&output.status),
            "{} via invoke ended with {:?}, expected {}\nstderr:\n{}",
            name,
            output.status,
            probe.expected,
            stderr
        );
    }
}

#[test]
fn test_registry_invoke_unknown_name_returns() {
    let registry = Registry::builtin();
    let err = registry.invoke("NoSuchCrash").unwrap_err();
    assert!(err.to_string().contains("unknown probe 'NoSuchCrash'"));
}
