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

//! Crash recovery for the disk queue.
//!
//! Recovery reads the index and reconciles the directory with it:
//! 1. Load the index, or create it when the directory holds no chunks
//! 2. Remove `.tmp` files left by writes that never reached their rename
//! 3. Remove chunk files outside `head..tail`: a flush renamed into place
//!    whose index update never landed, or a consumed chunk whose delete was
//!    interrupted
//! 4. Sum the item counts of the live chunks, verifying their checksums
//!
//! Loading the head chunk into the get buffer is left to the engine, which
//! uses its regular refill path for it.

use std::path::Path;

use snafu::ensure;
use tracing::{info, warn};

use crate::{
    FlushMode, Result, chunk,
    error::IndexCorruptionSnafu,
    index::{self, Index},
    path::{index_file_path, scan_chunk_files, scan_temp_files},
};

/// State reconstructed from a queue directory.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RecoveryInfo {
    pub(crate) index:         Index,
    /// Items held by chunks `head..tail`.
    pub(crate) items_on_disk: usize,
}

pub(crate) fn recover(dir: &Path, mode: FlushMode) -> Result<RecoveryInfo> {
    info!(path = ?dir, "Starting queue recovery");

    let index_path = index_file_path(dir);
    if !index_path.exists() {
        let chunks = scan_chunk_files(dir)?.len();
        ensure!(
            chunks == 0,
            IndexCorruptionSnafu {
                path:   index_path,
                reason: format!("index file missing while {chunks} chunk files exist"),
            }
        );
    }
    let index = index::load(dir, mode)?;

    for tmp in scan_temp_files(dir)? {
        warn!(path = ?tmp, "Removing leftover temporary file");
        if let Err(error) = std::fs::remove_file(&tmp) {
            warn!(path = ?tmp, %error, "Failed to remove temporary file");
        }
    }

    for (seq, path) in scan_chunk_files(dir)? {
        if (index.head..index.tail).contains(&seq) {
            continue;
        }
        warn!(seq, path = ?path, %index, "Removing chunk outside the index range");
        if let Err(error) = std::fs::remove_file(&path) {
            warn!(seq, path = ?path, %error, "Failed to remove orphan chunk");
        }
    }

    let mut items_on_disk = 0usize;
    for seq in index.head..index.tail {
        items_on_disk += chunk::read_count(dir, seq)?;
    }

    info!(
        head = index.head,
        tail = index.tail,
        items_on_disk,
        "Queue recovery complete"
    );

    Ok(RecoveryInfo {
        index,
        items_on_disk,
    })
}
