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

//! Numbered, once-written chunk files.
//!
//! A chunk is the put buffer frozen at flush time. It is written exactly once
//! (via [`write_atomic`]), read back when it becomes the oldest chunk, and
//! deleted once its items sit in the get buffer.
//!
//! ## Binary Format
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                       │
//! ├─────────────────┬──────────────────────────────────────┤
//! │ magic: [u8; 4]  │ "DQCK"                               │
//! │ version: u32    │ Format version, currently 1          │
//! │ count: u32      │ Number of records                    │
//! │ checksum: u32   │ CRC32 of count and all records       │
//! ├─────────────────┴──────────────────────────────────────┤
//! │ Record[count]                                          │
//! │   length: u32 │ payload: [u8; length] │ crc32: u32     │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The record CRC covers the length prefix
//! and the payload; payloads are opaque to the queue.

use std::path::Path;

use bytes::{Buf, Bytes};
use crc32fast::Hasher;
use snafu::{OptionExt, ResultExt, ensure};

use crate::{
    FlushMode, Result,
    error::{
        ChunkCorruptedSnafu, ChunkDeleteFailedSnafu, ChunkNotFoundSnafu, InvalidArgumentSnafu,
        IoSnafu,
    },
    file::write_atomic,
    path::chunk_file_path,
};

/// Magic bytes identifying a chunk file: "DQCK"
pub const CHUNK_MAGIC: [u8; 4] = *b"DQCK";

/// Current chunk format version.
pub const CHUNK_VERSION: u32 = 1;

/// Size of the chunk header in bytes.
pub const CHUNK_HEADER_SIZE: usize = 16;

const RECORD_LENGTH_SIZE: usize = 4;
const RECORD_CRC_SIZE: usize = 4;

/// Largest payload a record can frame.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

#[inline]
fn record_crc(length: u32, payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&length.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

#[inline]
fn chunk_crc(count: u32, body: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&count.to_le_bytes());
    hasher.update(body);
    hasher.finalize()
}

/// Serializes `items` into the chunk format.
pub fn encode<'a, I>(items: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Bytes>,
{
    let mut body = Vec::new();
    let mut count = 0u32;

    for item in items {
        let length = u32::try_from(item.len()).ok().context(InvalidArgumentSnafu {
            reason: format!("payload of {} bytes exceeds {MAX_PAYLOAD_LEN}", item.len()),
        })?;
        body.extend_from_slice(&length.to_le_bytes());
        body.extend_from_slice(item);
        body.extend_from_slice(&record_crc(length, item).to_le_bytes());
        count = count.checked_add(1).context(InvalidArgumentSnafu {
            reason: "chunk holds more than u32::MAX items",
        })?;
    }

    let checksum = chunk_crc(count, &body);

    let mut data = Vec::with_capacity(CHUNK_HEADER_SIZE + body.len());
    data.extend_from_slice(&CHUNK_MAGIC);
    data.extend_from_slice(&CHUNK_VERSION.to_le_bytes());
    data.extend_from_slice(&count.to_le_bytes());
    data.extend_from_slice(&checksum.to_le_bytes());
    data.extend(body);
    Ok(data)
}

/// Header fields of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    count:    u32,
    checksum: u32,
}

fn parse_header(seq: u64, raw: &[u8]) -> Result<Header> {
    ensure!(
        raw.len() >= CHUNK_HEADER_SIZE,
        ChunkCorruptedSnafu {
            seq,
            reason: format!(
                "data too short: {} bytes, expected at least {CHUNK_HEADER_SIZE}",
                raw.len()
            ),
        }
    );

    let mut header = &raw[..CHUNK_HEADER_SIZE];
    let mut magic = [0u8; 4];
    header.copy_to_slice(&mut magic);
    ensure!(
        magic == CHUNK_MAGIC,
        ChunkCorruptedSnafu {
            seq,
            reason: format!("invalid magic: {magic:?}"),
        }
    );

    let version = header.get_u32_le();
    ensure!(
        version == CHUNK_VERSION,
        ChunkCorruptedSnafu {
            seq,
            reason: format!("unsupported version {version}"),
        }
    );

    Ok(Header {
        count:    header.get_u32_le(),
        checksum: header.get_u32_le(),
    })
}

/// Validates the header and the checksum over count and body, returning the
/// record count.
fn verify(seq: u64, data: &[u8]) -> Result<usize> {
    let header = parse_header(seq, data)?;
    let body = &data[CHUNK_HEADER_SIZE..];

    let computed = chunk_crc(header.count, body);
    ensure!(
        computed == header.checksum,
        ChunkCorruptedSnafu {
            seq,
            reason: format!(
                "checksum mismatch: stored={:#x}, computed={computed:#x}",
                header.checksum
            ),
        }
    );

    let count = header.count as usize;
    let max_records = body.len() / (RECORD_LENGTH_SIZE + RECORD_CRC_SIZE);
    ensure!(
        count <= max_records,
        ChunkCorruptedSnafu {
            seq,
            reason: format!("{count} records cannot fit in {} bytes", body.len()),
        }
    );
    Ok(count)
}

/// Parses a chunk image back into its payloads.
///
/// Payloads are zero-copy slices of `data`.
pub fn decode(seq: u64, data: Bytes) -> Result<Vec<Bytes>> {
    let count = verify(seq, &data)?;
    let body = data.slice(CHUNK_HEADER_SIZE..);

    let mut items = Vec::with_capacity(count);
    let mut offset = 0usize;
    for index in 0..count {
        let corrupted = |reason: &str| {
            ChunkCorruptedSnafu {
                seq,
                reason: format!("record {index}: {reason}"),
            }
            .build()
        };

        let Some(mut prefix) = body.get(offset..offset + RECORD_LENGTH_SIZE) else {
            return Err(corrupted("truncated length prefix"));
        };
        let length = prefix.get_u32_le();
        let start = offset + RECORD_LENGTH_SIZE;
        let end = start + length as usize;

        let Some(mut stored) = body.get(end..end + RECORD_CRC_SIZE) else {
            return Err(corrupted("truncated payload"));
        };
        let stored = stored.get_u32_le();

        let payload = body.slice(start..end);
        if record_crc(length, &payload) != stored {
            return Err(corrupted("crc mismatch"));
        }

        items.push(payload);
        offset = end + RECORD_CRC_SIZE;
    }

    ensure!(
        offset == body.len(),
        ChunkCorruptedSnafu {
            seq,
            reason: format!("{} trailing bytes after last record", body.len() - offset),
        }
    );
    Ok(items)
}

/// Writes chunk `seq` durably into `dir`.
pub fn write<'a, I>(dir: &Path, seq: u64, items: I, mode: FlushMode) -> Result<()>
where
    I: IntoIterator<Item = &'a Bytes>,
{
    let data = encode(items)?;
    write_atomic(&chunk_file_path(dir, seq), &data, mode)
}

/// Reads chunk `seq` from `dir`.
///
/// Fails with `ChunkNotFound` when the file is absent.
pub fn read(dir: &Path, seq: u64) -> Result<Vec<Bytes>> { decode(seq, Bytes::from(read_file(dir, seq)?)) }

fn read_file(dir: &Path, seq: u64) -> Result<Vec<u8>> {
    let path = chunk_file_path(dir, seq);
    match std::fs::read(&path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ChunkNotFoundSnafu { seq, path }.fail(),
        Err(e) => Err(e).context(IoSnafu { path }),
    }
}

/// Reads the item count of chunk `seq`, checking the chunk checksum but
/// without splitting it into records.
pub fn read_count(dir: &Path, seq: u64) -> Result<usize> { verify(seq, &read_file(dir, seq)?) }

/// Removes chunk `seq` from `dir`.
pub fn delete(dir: &Path, seq: u64) -> Result<()> {
    let path = chunk_file_path(dir, seq);
    std::fs::remove_file(&path).context(ChunkDeleteFailedSnafu { seq, path })
}
