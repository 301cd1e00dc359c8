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

//! Queue engine state and the disk protocol around it.
//!
//! [`QueueCore`] owns the index and both buffers as one block. It performs all
//! chunk and index I/O synchronously and knows nothing about locking or
//! blocking; [`DiskQueue`](crate::DiskQueue) wraps it in a mutex, and
//! [`LocalQueue`](crate::LocalQueue) uses it directly.
//!
//! ## Item flow
//!
//! ```text
//!  put ──► put buffer ──(cache_size reached / sync)──► chunk tail ──┐
//!              │                                                     │
//!              └──(no chunk on disk: promote)──┐          (load head)│
//!                                              ▼                     ▼
//!  get ◄──────────────────────────────────── get buffer ◄────────────┘
//! ```
//!
//! Every flush writes the chunk, then persists `tail + 1`. Every load reads
//! the chunk, persists `head + 1`, then deletes the file. In both cases the
//! in-memory state changes only after the index write succeeded.
//!
//! A clean close writes whatever is left in the get buffer back in front of
//! the head chunk, so loaded but unread items survive a restart. Only a crash
//! between a load and the matching `get` loses them.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use snafu::ensure;
use tracing::{debug, info, warn};

use crate::{
    FlushMode, QueueConfig, Result,
    buffer::Buffers,
    chunk::{self, MAX_PAYLOAD_LEN},
    error::InvalidArgumentSnafu,
    index::{self, Index},
    recovery::{self, RecoveryInfo},
};

#[derive(Debug)]
pub(crate) struct QueueCore {
    dir:           PathBuf,
    cache_size:    usize,
    flush_mode:    FlushMode,
    index:         Index,
    /// Exact number of items in chunks `head..tail`.
    items_on_disk: usize,
    buffers:       Buffers,
    delete_chunk:  fn(&Path, u64) -> Result<()>,
}

impl QueueCore {
    /// Opens or recovers the queue directory described by `config`.
    ///
    /// When chunks exist, the oldest one is loaded into the get buffer right
    /// away.
    pub(crate) fn open(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        let dir = config.queue_dir();

        let RecoveryInfo {
            index,
            items_on_disk,
        } = recovery::recover(&dir, config.flush_mode)?;

        let mut core = Self {
            dir,
            cache_size: config.cache_size,
            flush_mode: config.flush_mode,
            index,
            items_on_disk,
            buffers: Buffers::default(),
            delete_chunk: chunk::delete,
        };
        if !core.index.is_empty() {
            core.load_head_chunk()?;
        }

        info!(
            path = ?core.dir,
            head = core.index.head,
            tail = core.index.tail,
            len = core.len(),
            "Queue opened"
        );
        Ok(core)
    }

    pub(crate) fn len(&self) -> usize { self.items_on_disk + self.buffers.len() }

    pub(crate) fn is_empty(&self) -> bool { self.len() == 0 }

    pub(crate) const fn index(&self) -> Index { self.index }

    pub(crate) fn dir(&self) -> &Path { &self.dir }

    /// Appends `item`, flushing the put buffer once it holds `cache_size`
    /// items. A failed flush takes `item` back out, leaving the queue as it
    /// was before the call.
    pub(crate) fn push(&mut self, item: Bytes) -> Result<()> {
        ensure!(
            item.len() <= MAX_PAYLOAD_LEN,
            InvalidArgumentSnafu {
                reason: format!("payload of {} bytes exceeds {MAX_PAYLOAD_LEN}", item.len()),
            }
        );

        self.buffers.put.push_back(item);
        if self.buffers.put.len() < self.cache_size {
            return Ok(());
        }
        self.flush().inspect_err(|_| {
            self.buffers.put.pop_back();
        })
    }

    /// Removes and returns the oldest item, or `None` if the queue is empty.
    pub(crate) fn pop(&mut self) -> Result<Option<Bytes>> {
        while self.buffers.get.is_empty() {
            if self.index.is_empty() {
                self.buffers.promote();
                break;
            }
            self.load_head_chunk()?;
        }
        Ok(self.buffers.get.pop_front())
    }

    /// Returns up to `count` items in the order `pop` would yield them,
    /// reading chunks without consuming them.
    pub(crate) fn peek(&self, count: i64) -> Result<Vec<Bytes>> {
        ensure!(
            count >= 0,
            InvalidArgumentSnafu {
                reason: format!("peek count must be non-negative, got {count}"),
            }
        );
        let count = usize::try_from(count).unwrap_or(usize::MAX);

        let mut items: Vec<Bytes> = self.buffers.get.iter().take(count).cloned().collect();
        let mut seq = self.index.head;
        while items.len() < count && seq < self.index.tail {
            let remaining = count - items.len();
            items.extend(chunk::read(&self.dir, seq)?.into_iter().take(remaining));
            seq += 1;
        }
        let remaining = count - items.len();
        items.extend(self.buffers.put.iter().take(remaining).cloned());
        Ok(items)
    }

    /// Flushes a non-empty put buffer to a new chunk.
    pub(crate) fn sync(&mut self) -> Result<()> { self.flush() }

    /// Persists both buffers. Afterwards every item is in a chunk.
    pub(crate) fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.restore_get_buffer()
    }

    /// Puts the get buffer back on disk ahead of everything else.
    ///
    /// The items go into chunk `head - 1` when that slot is free. With
    /// `head == 0` they are merged in front of the head chunk instead, or
    /// become chunk 0 when no chunk exists.
    fn restore_get_buffer(&mut self) -> Result<()> {
        if self.buffers.get.is_empty() {
            return Ok(());
        }

        let restored = self.buffers.get.len();
        let Index { head, tail } = self.index;
        if head > 0 {
            let seq = head - 1;
            chunk::write(&self.dir, seq, &self.buffers.get, self.flush_mode)?;
            let next = Index { head: seq, tail };
            index::store(&self.dir, next, self.flush_mode)?;
            self.index = next;
        } else if head < tail {
            let mut items: Vec<Bytes> = self.buffers.get.iter().cloned().collect();
            items.extend(chunk::read(&self.dir, head)?);
            chunk::write(&self.dir, head, &items, self.flush_mode)?;
        } else {
            chunk::write(&self.dir, tail, &self.buffers.get, self.flush_mode)?;
            let next = Index { head, tail: tail + 1 };
            index::store(&self.dir, next, self.flush_mode)?;
            self.index = next;
        }

        self.items_on_disk += restored;
        self.buffers.get.clear();
        debug!(items = restored, index = %self.index, "Get buffer restored");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffers.put.is_empty() {
            return Ok(());
        }

        let seq = self.index.tail;
        chunk::write(&self.dir, seq, &self.buffers.put, self.flush_mode)?;

        let next = Index {
            head: self.index.head,
            tail: seq + 1,
        };
        index::store(&self.dir, next, self.flush_mode)?;

        let flushed = self.buffers.put.len();
        self.index = next;
        self.items_on_disk += flushed;
        self.buffers.put.clear();

        debug!(seq, items = flushed, %next, "Chunk flushed");
        Ok(())
    }

    fn load_head_chunk(&mut self) -> Result<()> {
        let seq = self.index.head;
        let items = chunk::read(&self.dir, seq)?;

        let next = Index {
            head: seq + 1,
            tail: self.index.tail,
        };
        index::store(&self.dir, next, self.flush_mode)?;

        let loaded = items.len();
        self.index = next;
        self.items_on_disk = self.items_on_disk.saturating_sub(loaded);
        self.buffers.get.extend(items);
        debug!(seq, items = loaded, %next, "Chunk loaded");

        if let Err(error) = (self.delete_chunk)(&self.dir, seq) {
            warn!(%error, seq, "Chunk consumed but its file could not be removed");
        }
        Ok(())
    }
}

impl Drop for QueueCore {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(path = ?self.dir, %error, "Failed to persist queue on drop");
        }
    }
}
