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

use std::collections::VecDeque;

use bytes::Bytes;

/// The in-memory ends of the queue.
///
/// `get` holds the oldest items (loaded from a chunk or promoted), `put`
/// the newest items not yet flushed. Neither is durable on its own.
#[derive(Debug, Default)]
pub(crate) struct Buffers {
    pub(crate) put: VecDeque<Bytes>,
    pub(crate) get: VecDeque<Bytes>,
}

impl Buffers {
    pub(crate) fn len(&self) -> usize { self.put.len() + self.get.len() }

    /// Hands the whole put buffer to the get side. Only valid while no chunk
    /// sits between the two.
    pub(crate) fn promote(&mut self) {
        debug_assert!(self.get.is_empty());
        std::mem::swap(&mut self.get, &mut self.put);
    }
}
