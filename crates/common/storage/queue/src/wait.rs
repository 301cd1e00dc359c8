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

//! How long a blocking call may park.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard};
use snafu::ensure;

use crate::{Result, error::InvalidArgumentSnafu};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Wait {
    /// Never park.
    Immediate,
    /// Park until signalled.
    Forever,
    /// Park until signalled or `deadline` passes.
    Until { deadline: Instant, timeout: Duration },
}

impl Wait {
    /// Builds the wait policy from the `block`/`timeout` pair of `put` and
    /// `get`. `timeout` is in seconds; a negative or NaN value is rejected even
    /// when `block` is false.
    pub(crate) fn new(block: bool, timeout: Option<f64>) -> Result<Self> {
        if let Some(secs) = timeout {
            ensure!(
                secs >= 0.0,
                InvalidArgumentSnafu {
                    reason: format!("timeout must be a non-negative number, got {secs}"),
                }
            );
        }

        if !block {
            return Ok(Self::Immediate);
        }

        let Some(secs) = timeout else {
            return Ok(Self::Forever);
        };
        let wait = Duration::try_from_secs_f64(secs)
            .ok()
            .and_then(|timeout| {
                Instant::now()
                    .checked_add(timeout)
                    .map(|deadline| Self::Until { deadline, timeout })
            })
            .unwrap_or(Self::Forever);
        Ok(wait)
    }

    /// The configured timeout, if this wait can expire after parking.
    pub(crate) const fn timeout(self) -> Option<Duration> {
        match self {
            Self::Until { timeout, .. } => Some(timeout),
            Self::Immediate | Self::Forever => None,
        }
    }

    /// Parks on `signal` once. Returns `false` when the caller must not park
    /// again: the wait is `Immediate` or the deadline has passed.
    pub(crate) fn park<T>(self, signal: &Condvar, guard: &mut MutexGuard<'_, T>) -> bool {
        match self {
            Self::Immediate => false,
            Self::Forever => {
                signal.wait(guard);
                true
            }
            Self::Until { deadline, .. } => !signal.wait_until(guard, deadline).timed_out(),
        }
    }

    /// Parks until `ready` holds or the wait runs out. Returns whether
    /// `ready` held when it returned.
    pub(crate) fn wait_for<T>(
        self,
        signal: &Condvar,
        guard: &mut MutexGuard<'_, T>,
        mut ready: impl FnMut(&T) -> bool,
    ) -> bool {
        loop {
            if ready(&**guard) {
                return true;
            }
            if !self.park(signal, guard) {
                return ready(&**guard);
            }
        }
    }
}
