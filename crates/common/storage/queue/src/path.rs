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

//! File naming inside a queue directory.
//!
//! ```text
//! <base_path>/<queue_name>/
//!   index                 head,tail
//!   00000003.chunk        oldest unconsumed chunk
//!   00000004.chunk
//!   00000004.chunk.tmp    write in flight (removed on recovery)
//! ```
//!
//! The index name carries no extension, so it can never be mistaken for a
//! chunk regardless of the sequence number.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use snafu::ResultExt;

use crate::{Result, error::IoSnafu};

/// Reserved name of the index file.
pub const INDEX_FILE_NAME: &str = "index";

/// Extension of chunk files.
pub const CHUNK_EXTENSION: &str = "chunk";

/// Suffix appended to a file name while it is being written.
pub const TEMP_EXTENSION: &str = "tmp";

/// Generates a chunk file name: `NNNNNNNN.chunk`.
#[must_use]
pub fn chunk_file_name(seq: u64) -> String { format!("{seq:08}.{CHUNK_EXTENSION}") }

/// Returns the full path to chunk `seq`.
pub fn chunk_file_path<P: AsRef<Path>>(dir: P, seq: u64) -> PathBuf { dir.as_ref().join(chunk_file_name(seq)) }

/// Returns the full path to the index file.
pub fn index_file_path<P: AsRef<Path>>(dir: P) -> PathBuf { dir.as_ref().join(INDEX_FILE_NAME) }

/// Returns the temporary sibling used while `path` is written.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(TEMP_EXTENSION);
    PathBuf::from(name)
}

/// Extracts the sequence number from a chunk file path.
#[must_use]
pub fn parse_chunk_seq(path: &Path) -> Option<u64> {
    if path.extension().and_then(|s| s.to_str()) != Some(CHUNK_EXTENSION) {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Lists chunk files in `dir`, sorted by sequence number.
pub fn scan_chunk_files<P: AsRef<Path>>(dir: P) -> Result<Vec<(u64, PathBuf)>> {
    let mut chunks: Vec<_> = list_files(dir.as_ref())?
        .into_iter()
        .filter_map(|path| parse_chunk_seq(&path).map(|seq| (seq, path)))
        .collect();
    chunks.sort_unstable_by_key(|(seq, _)| *seq);
    Ok(chunks)
}

/// Lists leftover temporary files in `dir`.
pub fn scan_temp_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    Ok(list_files(dir.as_ref())?
        .into_iter()
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some(TEMP_EXTENSION))
        .collect())
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).context(IoSnafu { path: dir })? {
        let path = entry.context(IoSnafu { path: dir })?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_chunk_file_name() {
        assert_eq!(chunk_file_name(0), "00000000.chunk");
        assert_eq!(chunk_file_name(42), "00000042.chunk");
        assert_eq!(chunk_file_name(123_456_789), "123456789.chunk");
    }

    #[test]
    fn test_index_never_aliases_chunk_zero() {
        let dir = Path::new("/queue");
        assert_ne!(index_file_path(dir), chunk_file_path(dir, 0));
        assert_eq!(parse_chunk_seq(&index_file_path(dir)), None);
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path(Path::new("/queue/00000001.chunk")),
            PathBuf::from("/queue/00000001.chunk.tmp")
        );
        assert_eq!(temp_path(Path::new("/queue/index")), PathBuf::from("/queue/index.tmp"));
    }

    #[test_case("/q/00000005.chunk", Some(5) ; "chunk")]
    #[test_case("/q/00000005.chunk.tmp", None ; "temp chunk")]
    #[test_case("/q/index", None ; "index")]
    #[test_case("/q/abc.chunk", None ; "non numeric")]
    fn test_parse_chunk_seq(path: &str, expected: Option<u64>) {
        assert_eq!(parse_chunk_seq(Path::new(path)), expected);
    }

    #[test]
    fn test_scan_chunk_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = temp_dir.path();

        for seq in [10, 2, 7] {
            std::fs::File::create(chunk_file_path(dir, seq)).unwrap();
        }
        std::fs::File::create(index_file_path(dir)).unwrap();
        std::fs::File::create(temp_path(&chunk_file_path(dir, 11))).unwrap();

        let seqs: Vec<u64> = scan_chunk_files(dir).unwrap().into_iter().map(|(s, _)| s).collect();
        assert_eq!(seqs, vec![2, 7, 10]);

        let temps = scan_temp_files(dir).unwrap();
        assert_eq!(temps, vec![temp_path(&chunk_file_path(dir, 11))]);
    }

    #[test]
    fn test_scan_missing_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(scan_chunk_files(temp_dir.path().join("absent")).unwrap().is_empty());
    }
}
