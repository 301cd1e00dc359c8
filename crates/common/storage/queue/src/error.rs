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

use std::{io, path::PathBuf, time::Duration};

use snafu::Snafu;

/// Queue operation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum QueueError {
    /// A caller-supplied argument was rejected before any state changed.
    #[snafu(display("Invalid argument: {reason}"))]
    InvalidArgument {
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The queue holds `max_size` items and the caller would not (or could
    /// no longer) wait for capacity.
    #[snafu(display("Queue is full (max_size = {max_size})"))]
    Full {
        max_size: usize,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },

    /// A blocking `get` reached its deadline without an item to return.
    #[snafu(display("Timed out after {waited:?} waiting for an item"))]
    Timeout {
        waited: Duration,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The index file exists but does not hold a valid `head,tail` pair.
    #[snafu(display("Index file {} is corrupted: {reason}", path.display()))]
    IndexCorruption {
        path:   PathBuf,
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The index references a chunk that is missing on disk.
    #[snafu(display("Chunk {seq} not found at {}", path.display()))]
    ChunkNotFound {
        seq:  u64,
        path: PathBuf,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    /// A chunk file failed header or record validation.
    #[snafu(display("Chunk {seq} is corrupted: {reason}"))]
    ChunkCorrupted {
        seq:    u64,
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// A consumed chunk could not be removed. Leaks disk space only; the
    /// engine logs it and carries on.
    #[snafu(display("Failed to delete chunk {seq} at {}", path.display()))]
    ChunkDeleteFailed {
        seq:    u64,
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Filesystem I/O failure.
    #[snafu(display("IO error on {}", path.display()))]
    Io {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

impl QueueError {
    /// Returns `true` for conditions that may clear up if the caller tries
    /// again later (capacity or availability), as opposed to corruption and
    /// I/O failures.
    #[must_use]
    pub const fn is_retryable(&self) -> bool { matches!(self, Self::Full { .. } | Self::Timeout { .. }) }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let full = FullSnafu { max_size: 3usize }.build();
        let timeout = TimeoutSnafu {
            waited: Duration::from_millis(10),
        }
        .build();
        let corrupt = IndexCorruptionSnafu {
            path:   "/tmp/q/index",
            reason: "garbage",
        }
        .build();

        assert!(full.is_retryable());
        assert!(timeout.is_retryable());
        assert!(!corrupt.is_retryable());
    }

    #[test]
    fn test_display_names_the_chunk() {
        let err = ChunkNotFoundSnafu {
            seq:  7u64,
            path: "/tmp/q/00000007.chunk",
        }
        .build();
        assert_eq!(err.to_string(), "Chunk 7 not found at /tmp/q/00000007.chunk");
    }
}
