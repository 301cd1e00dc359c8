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

//! Durable head/tail index.
//!
//! The index is the single source of truth for which chunks exist: chunks
//! `head..tail` are on disk, in order. It is stored as plain text,
//! `"<head>,<tail>"`, in the reserved [`INDEX_FILE_NAME`] file and replaced
//! atomically on every change.
//!
//! [`INDEX_FILE_NAME`]: crate::path::INDEX_FILE_NAME

use std::{fmt, path::Path};

use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::{
    FlushMode, Result,
    error::{IndexCorruptionSnafu, IoSnafu},
    file::write_atomic,
    path::index_file_path,
};

/// Chunk sequence counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Index {
    /// Oldest chunk still to be loaded.
    pub head: u64,
    /// Next chunk number to assign on flush.
    pub tail: u64,
}

impl Index {
    /// Number of chunks on disk.
    #[must_use]
    pub const fn chunk_count(&self) -> u64 { self.tail - self.head }

    /// `true` when no chunk exists on disk.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.head == self.tail }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        let text = text.trim();
        let Some((head, tail)) = text.split_once(',') else {
            return IndexCorruptionSnafu {
                path,
                reason: format!("expected \"head,tail\", found {text:?}"),
            }
            .fail();
        };

        let parse = |field: &str, value: &str| {
            value.parse::<u64>().ok().ok_or_else(|| {
                IndexCorruptionSnafu {
                    path,
                    reason: format!("{field} {value:?} is not a non-negative integer"),
                }
                .build()
            })
        };
        let index = Self {
            head: parse("head", head)?,
            tail: parse("tail", tail)?,
        };

        ensure!(
            index.head <= index.tail,
            IndexCorruptionSnafu {
                path,
                reason: format!("head {} is past tail {}", index.head, index.tail),
            }
        );
        Ok(index)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{},{}", self.head, self.tail) }
}

/// Loads the index from `dir`.
///
/// A missing index file means a fresh queue: the directory is created and a
/// `0,0` index persisted before returning.
pub fn load(dir: &Path, mode: FlushMode) -> Result<Index> {
    let path = index_file_path(dir);

    if path.exists() {
        let text = std::fs::read_to_string(&path).context(IoSnafu { path: &path })?;
        let index = Index::parse(&path, &text)?;
        debug!(path = ?path, %index, "Index loaded");
        return Ok(index);
    }

    std::fs::create_dir_all(dir).context(IoSnafu { path: dir })?;
    let index = Index::default();
    store(dir, index, mode)?;
    debug!(path = ?path, "Fresh index created");
    Ok(index)
}

/// Atomically persists `index` to `dir`.
pub fn store(dir: &Path, index: Index, mode: FlushMode) -> Result<()> {
    write_atomic(&index_file_path(dir), index.to_string().as_bytes(), mode)?;
    debug!(%index, "Index persisted");
    Ok(())
}
