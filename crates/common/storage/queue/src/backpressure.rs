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

//! Capacity ceiling for `put`.
//!
//! Each admission runs one pass of:
//!
//! ```text
//! Checking ──► Proceed                 len < max_size (or no ceiling)
//!    │
//!    ├──────► Full                     at capacity, caller won't block
//!    │
//!    └──────► Waiting ──► Proceed      a get freed a slot
//!                    └──► Full         deadline passed
//! ```
//!
//! There is no retry after `Full`; callers that want another attempt call
//! `put` again.

use parking_lot::{Condvar, MutexGuard};
use tracing::trace;

use crate::{Result, core::QueueCore, error::FullSnafu, wait::Wait};

/// Outcome of the `Checking` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Proceed,
    AtCapacity { max_size: usize },
}

#[derive(Debug, Default)]
pub(crate) struct Backpressure {
    max_size: Option<usize>,
    /// Signalled whenever a `get` frees a slot.
    capacity: Condvar,
}

impl Backpressure {
    pub(crate) const fn new(max_size: Option<usize>) -> Self {
        Self {
            max_size,
            capacity: Condvar::new(),
        }
    }

    pub(crate) const fn check(&self, len: usize) -> Admission {
        match self.max_size {
            Some(max_size) if len >= max_size => Admission::AtCapacity { max_size },
            _ => Admission::Proceed,
        }
    }

    /// Admits one `put` or fails with `Full`. `core`'s mutex is released
    /// while parked on the capacity signal.
    pub(crate) fn admit(&self, core: &mut MutexGuard<'_, QueueCore>, wait: Wait) -> Result<()> {
        let Admission::AtCapacity { max_size } = self.check(core.len()) else {
            return Ok(());
        };

        trace!(max_size, "Queue at capacity, put waiting");
        if wait.wait_for(&self.capacity, core, |core| core.len() < max_size) {
            Ok(())
        } else {
            FullSnafu { max_size }.fail()
        }
    }

    /// Wakes one waiting `put` after a slot was freed.
    pub(crate) fn release(&self) {
        if self.max_size.is_some() {
            self.capacity.notify_one();
        }
    }
}
