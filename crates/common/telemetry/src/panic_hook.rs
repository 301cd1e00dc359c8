// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Panic reporting through `tracing`, with an optional parking_lot deadlock
//! watchdog behind the `deadlock_detection` feature.

#[cfg(feature = "deadlock_detection")]
use std::time::Duration;
use std::{
    panic,
    sync::atomic::{AtomicU64, Ordering},
    thread,
};

use backtrace::Backtrace;

static PANIC_COUNT: AtomicU64 = AtomicU64::new(0);

/// Panics observed since [`set_panic_hook`] was installed.
#[must_use]
pub fn panic_count() -> u64 { PANIC_COUNT.load(Ordering::Relaxed) }

/// Logs every panic as an `error!` event carrying the thread name, location
/// and a backtrace, then defers to the previous hook.
pub fn set_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic| {
        let backtrace = format!("{:?}", Backtrace::new());
        let current = thread::current();
        let thread_name = current.name().unwrap_or("<unnamed>");
        match panic.location() {
            Some(location) => tracing::error!(
                message = %panic,
                thread = thread_name,
                backtrace = %backtrace,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            ),
            None => tracing::error!(message = %panic, thread = thread_name, backtrace = %backtrace),
        }
        PANIC_COUNT.fetch_add(1, Ordering::Relaxed);
        default_hook(panic);
    }));

    #[cfg(feature = "deadlock_detection")]
    let _ = thread::Builder::new()
        .name("deadlock-watchdog".into())
        .spawn(|| {
            loop {
                thread::sleep(Duration::from_secs(5));
                let deadlocks = parking_lot::deadlock::check_deadlock();
                if deadlocks.is_empty() {
                    continue;
                }

                tracing::error!(count = deadlocks.len(), "Deadlocks detected");
                for (i, threads) in deadlocks.iter().enumerate() {
                    for t in threads {
                        tracing::error!(
                            deadlock = i,
                            thread_id = ?t.thread_id(),
                            backtrace = ?t.backtrace(),
                        );
                    }
                }
            }
        });
}
