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

//! Crash-safe whole-file writes.
//!
//! Every file the queue produces is written once: the bytes go to a
//! `.tmp` sibling which is then renamed over the target. A crash at any
//! point leaves either the old file or the new one, never a mix.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use snafu::ResultExt;

use crate::{FlushMode, Result, error::IoSnafu, path::temp_path};

/// Atomically replaces `path` with `data`.
///
/// On failure the temporary file is removed so no partial output remains.
pub(crate) fn write_atomic(path: &Path, data: &[u8], mode: FlushMode) -> Result<()> {
    let tmp = temp_path(path);

    let result = write_then_rename(&tmp, path, data, mode);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result?;

    match path.parent() {
        Some(parent) if mode.fsync() => sync_dir(parent),
        _ => Ok(()),
    }
}

fn write_then_rename(tmp: &Path, path: &Path, data: &[u8], mode: FlushMode) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp)
        .context(IoSnafu { path: tmp })?;
    file.write_all(data).context(IoSnafu { path: tmp })?;
    if mode.fsync() {
        file.sync_all().context(IoSnafu { path: tmp })?;
    }
    drop(file);

    std::fs::rename(tmp, path).context(IoSnafu { path })
}

/// Makes a rename inside `dir` durable.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .context(IoSnafu { path: dir })
}

/// Directories cannot be opened for syncing here; renames are as durable as
/// the platform makes them.
#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<()> { Ok(()) }

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(FlushMode::Sync ; "sync")]
    #[test_case(FlushMode::Async ; "async")]
    fn test_write_atomic_creates_and_replaces(mode: FlushMode) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("target");

        write_atomic(&path, b"first", mode).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second", mode).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_missing_dir_leaves_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent").join("target");

        assert!(write_atomic(&path, b"data", FlushMode::Sync).is_err());
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }
}
