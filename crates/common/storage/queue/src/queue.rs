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

//! Thread-safe queue handle.
//!
//! [`DiskQueue`] is the entry point for concurrent use. Every operation takes
//! one mutex around the engine state; blocking callers park on one of two
//! condition variables:
//! - `items`, signalled by every successful `put`, wakes blocked `get`s
//! - the backpressure capacity signal, raised by every successful `get`,
//!   wakes blocked `put`s
//!
//! ## Usage
//!
//! ```ignore
//! let queue = QueueBuilder::new("/path/to/data").queue_name("jobs").build()?;
//!
//! queue.put_nowait("hello")?;
//! let item = queue.get_nowait()?;
//!
//! queue.close()?;
//! ```

use std::{path::PathBuf, time::Duration};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use tracing::{info, trace};

use crate::{
    QueueConfig, Result,
    backpressure::Backpressure,
    core::QueueCore,
    error::TimeoutSnafu,
    wait::Wait,
};

/// A durable FIFO queue shared between threads.
///
/// Items live in memory until a put buffer reaches `cache_size` or
/// [`sync`](Self::sync) is called; only then do they survive a crash.
#[derive(Debug)]
pub struct DiskQueue {
    config:       QueueConfig,
    core:         Mutex<QueueCore>,
    /// Signalled whenever a `put` adds an item.
    items:        Condvar,
    backpressure: Backpressure,
}

impl DiskQueue {
    /// Opens the queue at `config.queue_dir()`, recovering any prior state.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for a bad configuration, or with the
    /// recovery error when the directory holds an unreadable index or chunk.
    pub fn open(config: QueueConfig) -> Result<Self> {
        let core = QueueCore::open(&config)?;
        let backpressure = Backpressure::new(config.max_size);
        Ok(Self {
            config,
            core: Mutex::new(core),
            items: Condvar::new(),
            backpressure,
        })
    }

    /// Appends `item` to the tail of the queue.
    ///
    /// With `block` false, a full queue fails immediately with `Full`. With
    /// `block` true, the call waits for a `get` to free a slot, for at most
    /// `timeout` seconds when given.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative timeout, `Full` when no slot became
    /// available, or an I/O error from the flush this put triggered. A failed
    /// put leaves the queue unchanged.
    pub fn put(&self, item: impl Into<Bytes>, block: bool, timeout: Option<f64>) -> Result<()> {
        let wait = Wait::new(block, timeout)?;
        let item = item.into();

        let mut core = self.core.lock();
        self.backpressure.admit(&mut core, wait)?;
        core.push(item)?;
        trace!(len = core.len(), "Item put");
        drop(core);

        self.items.notify_one();
        Ok(())
    }

    /// Non-blocking [`put`](Self::put).
    ///
    /// # Errors
    ///
    /// See [`put`](Self::put).
    pub fn put_nowait(&self, item: impl Into<Bytes>) -> Result<()> { self.put(item, false, None) }

    /// Blocking [`put`](Self::put) bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// See [`put`](Self::put).
    pub fn put_timeout(&self, item: impl Into<Bytes>, timeout: Duration) -> Result<()> {
        self.put(item, true, Some(timeout.as_secs_f64()))
    }

    /// Removes and returns the oldest item.
    ///
    /// With `block` false, an empty queue yields `Ok(None)`. With `block`
    /// true, the call waits for a `put`, forever unless `timeout` (seconds)
    /// is given.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative timeout, `Timeout` when a bounded wait
    /// expired, or a chunk error when the next chunk cannot be loaded.
    pub fn get(&self, block: bool, timeout: Option<f64>) -> Result<Option<Bytes>> {
        let wait = Wait::new(block, timeout)?;

        let mut core = self.core.lock();
        if !wait.wait_for(&self.items, &mut core, |core| !core.is_empty()) {
            return match wait.timeout() {
                Some(waited) => TimeoutSnafu { waited }.fail(),
                None => Ok(None),
            };
        }

        let item = core.pop()?;
        trace!(len = core.len(), "Item got");
        drop(core);

        if item.is_some() {
            self.backpressure.release();
        }
        Ok(item)
    }

    /// Non-blocking [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_nowait(&self) -> Result<Option<Bytes>> { self.get(false, None) }

    /// Blocking [`get`](Self::get) bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<Bytes>> {
        self.get(true, Some(timeout.as_secs_f64()))
    }

    /// Returns up to `count` items from the head without removing them.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative `count`, or a chunk error when a chunk
    /// between the two buffers cannot be read.
    pub fn peek(&self, count: i64) -> Result<Vec<Bytes>> { self.core.lock().peek(count) }

    /// Makes every item put so far durable.
    ///
    /// # Errors
    ///
    /// Fails when the chunk or index write fails; the items stay buffered.
    pub fn sync(&self) -> Result<()> { self.core.lock().sync() }

    #[must_use]
    pub fn len(&self) -> usize { self.core.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.core.lock().is_empty() }

    /// Sequence number of the oldest chunk still on disk.
    #[must_use]
    pub fn head(&self) -> u64 { self.core.lock().index().head }

    /// Sequence number the next flushed chunk will get.
    #[must_use]
    pub fn tail(&self) -> u64 { self.core.lock().index().tail }

    /// Directory holding the index and chunk files.
    #[must_use]
    pub fn path(&self) -> PathBuf { self.config.queue_dir() }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    /// Writes both buffers to disk and closes the queue.
    ///
    /// Items already loaded for `get` but not yet returned go back in front
    /// of the oldest chunk, so the next open yields them first.
    ///
    /// # Errors
    ///
    /// Fails when a chunk or index write fails.
    pub fn close(self) -> Result<()> {
        let mut core = self.core.into_inner();
        core.close()?;
        info!(path = ?core.dir(), len = core.len(), "Queue closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Instant};

    use tempfile::TempDir;

    use super::*;
    use crate::{FlushMode, QueueError};

    fn open(dir: &TempDir, cache_size: usize, max_size: Option<usize>) -> DiskQueue {
        DiskQueue::open(QueueConfig {
            base_path: dir.path().to_path_buf(),
            queue_name: "testq".to_string(),
            cache_size,
            max_size,
            flush_mode: FlushMode::Async,
        })
        .unwrap()
    }

    #[test]
    fn test_get_nowait_on_empty_queue() {
        let temp_dir = TempDir::new().unwrap();
        let queue = open(&temp_dir, 4, None);
        assert!(queue.get_nowait().unwrap().is_none());
    }

    #[test]
    fn test_get_timeout_expires() {
        let temp_dir = TempDir::new().unwrap();
        let queue = open(&temp_dir, 4, None);

        let started = Instant::now();
        let err = queue.get_timeout(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, QueueError::Timeout { .. }));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_put_nowait_fails_when_full() {
        let temp_dir = TempDir::new().unwrap();
        let queue = open(&temp_dir, 4, Some(2));

        queue.put_nowait("a").unwrap();
        queue.put_nowait("b").unwrap();
        let err = queue.put_nowait("c").unwrap_err();
        assert!(matches!(err, QueueError::Full { max_size: 2, .. }));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_put_timeout_when_full() {
        let temp_dir = TempDir::new().unwrap();
        let queue = open(&temp_dir, 4, Some(1));

        queue.put_nowait("a").unwrap();
        let err = queue
            .put_timeout("b", Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, QueueError::Full { .. }));
    }

    #[test]
    fn test_blocked_get_wakes_on_put() {
        let temp_dir = TempDir::new().unwrap();
        let queue = Arc::new(open(&temp_dir, 4, None));

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.get(true, Some(5.0)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.put_nowait("wake").unwrap();

        let item = consumer.join().unwrap().unwrap();
        assert_eq!(item.unwrap(), "wake");
    }

    #[test]
    fn test_head_and_tail_follow_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let queue = open(&temp_dir, 2, None);

        for i in 0..4 {
            queue.put_nowait(format!("{i}")).unwrap();
        }
        assert_eq!((queue.head(), queue.tail()), (0, 2));

        queue.get_nowait().unwrap();
        assert_eq!((queue.head(), queue.tail()), (1, 2));
    }
}
