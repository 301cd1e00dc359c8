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

//! Fluent construction of queues.

use std::path::PathBuf;

use crate::{DiskQueue, FlushMode, LocalQueue, QueueConfig, Result};

/// Builder for [`DiskQueue`] and [`LocalQueue`].
///
/// ```no_run
/// use diskq_queue::{FlushMode, QueueBuilder};
///
/// let queue = QueueBuilder::new("/var/lib/app")
///     .queue_name("jobs")
///     .cache_size(256)
///     .max_size(10_000)
///     .flush_mode(FlushMode::Async)
///     .build()?;
/// # Ok::<(), diskq_queue::QueueError>(())
/// ```
pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    /// Starts from the default config with queues stored under `base_path`.
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            config: QueueConfig {
                base_path: base_path.into(),
                ..Default::default()
            },
        }
    }

    /// Name of the queue directory inside the base path.
    #[must_use]
    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.config.queue_name = name.into();
        self
    }

    /// Items per chunk and per in-memory buffer.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.config.cache_size = size;
        self
    }

    /// Bounds the queue to `size` items. Unbounded when never called.
    #[must_use]
    pub const fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = Some(size);
        self
    }

    #[must_use]
    pub const fn flush_mode(mut self, mode: FlushMode) -> Self {
        self.config.flush_mode = mode;
        self
    }

    /// Opens a thread-safe queue.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config or when recovery of an existing directory
    /// fails.
    pub fn build(self) -> Result<DiskQueue> { DiskQueue::open(self.config) }

    /// Opens a single-owner queue that never blocks.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_local(self) -> Result<LocalQueue> { LocalQueue::open(self.config) }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::QueueError;

    #[test]
    fn test_builder_default_config() {
        let builder = QueueBuilder::new("/tmp/test_queue");
        assert_eq!(builder.config.base_path, PathBuf::from("/tmp/test_queue"));
        assert_eq!(builder.config.queue_name, "default");
        assert_eq!(builder.config.cache_size, 1024);
        assert_eq!(builder.config.max_size, None);
        assert_eq!(builder.config.flush_mode, FlushMode::Sync);
    }

    #[test]
    fn test_builder_custom_config() {
        let builder = QueueBuilder::new("/tmp/test_queue")
            .queue_name("jobs")
            .cache_size(16)
            .max_size(100)
            .flush_mode(FlushMode::Async);

        assert_eq!(builder.config.queue_name, "jobs");
        assert_eq!(builder.config.cache_size, 16);
        assert_eq!(builder.config.max_size, Some(100));
        assert_eq!(builder.config.flush_mode, FlushMode::Async);
    }

    #[test]
    fn test_build_creates_queue_directory() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path())
            .queue_name("jobs")
            .build()
            .unwrap();

        assert_eq!(queue.path(), temp_dir.path().join("jobs"));
        assert!(queue.path().join("index").exists());
    }

    #[test]
    fn test_build_rejects_invalid_config_before_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        let err = QueueBuilder::new(temp_dir.path())
            .queue_name("jobs")
            .cache_size(0)
            .build_local()
            .unwrap_err();

        assert!(matches!(err, QueueError::InvalidArgument { .. }));
        assert!(!temp_dir.path().join("jobs").exists());
    }
}
