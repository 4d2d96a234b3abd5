// SPDX-License-Identifier: PMPL-1.0-or-later

//! Crash on a worker thread while it holds a lock the main thread waits on

use super::instruction::trap_instruction;
use crate::driver::kill_self;
use std::hint::black_box;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Long enough for the main thread to park inside `lock()`
const HOLD_BEFORE_CRASH: Duration = Duration::from_millis(200);

pub fn pthread_lock_held() -> ! {
    let lock = Arc::new(Mutex::new(0u64));
    let (ready_tx, ready_rx) = mpsc::channel();

    let held = Arc::clone(&lock);
    let spawned = thread::Builder::new()
        .name("crash-probe-lock-holder".to_string())
        .spawn(move || {
            let mut guard = held.lock().unwrap_or_else(PoisonError::into_inner);
            *guard += 1;
            let _ = ready_tx.send(());
            thread::sleep(HOLD_BEFORE_CRASH);
            trap_instruction();
            black_box(&mut *guard);
            kill_self();
        });
    if spawned.is_err() {
        std::process::abort();
    }

    let _ = ready_rx.recv();
    // Never acquired: the holder dies with the lock taken.
    let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    black_box(*guard);
    kill_self()
}
