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

use std::path::PathBuf;

use bytes::Bytes;
use tracing::info;

use crate::{
    QueueConfig, Result,
    backpressure::{Admission, Backpressure},
    core::QueueCore,
    error::FullSnafu,
};

/// Single-threaded variant of [`DiskQueue`](crate::DiskQueue).
///
/// Same on-disk format and durability, no locking. Since no other thread can
/// free capacity or add items, `put` on a full queue fails with `Full` and
/// `get` on an empty queue returns `None` instead of waiting.
#[derive(Debug)]
pub struct LocalQueue {
    config:       QueueConfig,
    core:         QueueCore,
    backpressure: Backpressure,
}

impl LocalQueue {
    /// # Errors
    ///
    /// See [`DiskQueue::open`](crate::DiskQueue::open).
    pub fn open(config: QueueConfig) -> Result<Self> {
        let core = QueueCore::open(&config)?;
        let backpressure = Backpressure::new(config.max_size);
        Ok(Self {
            config,
            core,
            backpressure,
        })
    }

    /// # Errors
    ///
    /// `Full` at capacity, or an I/O error from the flush this put triggered.
    pub fn put(&mut self, item: impl Into<Bytes>) -> Result<()> {
        if let Admission::AtCapacity { max_size } = self.backpressure.check(self.core.len()) {
            return FullSnafu { max_size }.fail();
        }
        self.core.push(item.into())
    }

    /// # Errors
    ///
    /// Fails when the next chunk cannot be loaded.
    pub fn get(&mut self) -> Result<Option<Bytes>> { self.core.pop() }

    /// # Errors
    ///
    /// See [`DiskQueue::peek`](crate::DiskQueue::peek).
    pub fn peek(&self, count: i64) -> Result<Vec<Bytes>> { self.core.peek(count) }

    /// # Errors
    ///
    /// Fails when the chunk or index write fails.
    pub fn sync(&mut self) -> Result<()> { self.core.sync() }

    #[must_use]
    pub fn len(&self) -> usize { self.core.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.core.is_empty() }

    #[must_use]
    pub const fn head(&self) -> u64 { self.core.index().head }

    #[must_use]
    pub const fn tail(&self) -> u64 { self.core.index().tail }

    #[must_use]
    pub fn path(&self) -> PathBuf { self.config.queue_dir() }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    /// # Errors
    ///
    /// Fails when writing the buffers back to disk fails.
    pub fn close(mut self) -> Result<()> {
        self.core.close()?;
        info!(path = ?self.core.dir(), len = self.core.len(), "Queue closed");
        Ok(())
    }
}
