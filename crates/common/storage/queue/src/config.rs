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

use std::path::{Component, Path, PathBuf};

use snafu::ensure;

use crate::{Result, error::InvalidArgumentSnafu};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Directory that contains the queue directory.
    pub base_path:  PathBuf,
    /// Name of the queue directory under `base_path`.
    pub queue_name: String,
    /// Items per chunk; the put buffer is flushed when it reaches this size.
    pub cache_size: usize,
    /// Optional ceiling on `len()` enforced by backpressure.
    pub max_size:   Option<usize>,
    pub flush_mode: FlushMode,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            base_path:  PathBuf::from("./queue_data"),
            queue_name: "default".to_string(),
            cache_size: 1024,
            max_size:   None,
            flush_mode: FlushMode::Sync,
        }
    }
}

impl QueueConfig {
    /// Directory holding the index and chunk files: `base_path/queue_name`.
    #[must_use]
    pub fn queue_dir(&self) -> PathBuf { self.base_path.join(&self.queue_name) }

    /// Rejects configurations the engine cannot honour, before any file is
    /// touched.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cache_size >= 1,
            InvalidArgumentSnafu {
                reason: "cache_size must be at least 1",
            }
        );
        ensure!(
            u32::try_from(self.cache_size).is_ok(),
            InvalidArgumentSnafu {
                reason: format!("cache_size {} exceeds {}", self.cache_size, u32::MAX),
            }
        );
        ensure!(
            self.max_size != Some(0),
            InvalidArgumentSnafu {
                reason: "max_size must be at least 1 when set",
            }
        );

        let mut components = Path::new(&self.queue_name).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        ensure!(
            single_normal,
            InvalidArgumentSnafu {
                reason: format!(
                    "queue_name {:?} must be a single directory name",
                    self.queue_name
                ),
            }
        );
        Ok(())
    }
}

/// Durability applied to chunk and index writes.
///
/// Both modes write to a temporary file and rename it into place, so readers
/// never observe a partial file. `Sync` additionally fsyncs the file and the
/// queue directory before the write is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Leave write-back to the OS.
    Async,
    #[default]
    Sync,
}

impl FlushMode {
    pub(crate) const fn fsync(self) -> bool { matches!(self, Self::Sync) }
}
