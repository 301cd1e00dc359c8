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

//! Durable disk-backed FIFO queue.
//!
//! Items are buffered in memory and spilled to numbered chunk files once
//! `cache_size` of them accumulate. A small index file records which chunks
//! are live, so a reopened queue resumes exactly where the last sync left it.
//!
//! - [`DiskQueue`]: thread-safe, with blocking `put`/`get` and an optional
//!   `max_size` ceiling
//! - [`LocalQueue`]: the same engine for a single thread, never blocks

pub mod builder;
pub mod chunk;
pub mod config;
pub mod error;
pub mod index;
pub mod path;

mod backpressure;
mod buffer;
mod core;
mod file;
mod local;
mod queue;
mod recovery;
mod wait;

pub use builder::QueueBuilder;
pub use config::{FlushMode, QueueConfig};
pub use error::{QueueError, Result};
pub use index::Index;
pub use local::LocalQueue;
pub use queue::DiskQueue;
