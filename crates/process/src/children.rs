/*
   Copyright The containerd Authors.

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Subprocess discovery through the kernel children listing,
//! `<procfs>/<pid>/task/<tid>/children`: a whitespace-separated list of
//! the child tasks of each thread. Only present when the kernel was
//! built with `CONFIG_PROC_CHILDREN`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Path probed to decide whether the kernel exposes children listings.
pub(crate) fn probe_path(procfs: &Path, pid: i32) -> PathBuf {
    procfs
        .join(pid.to_string())
        .join("task")
        .join(pid.to_string())
        .join("children")
}

pub(crate) fn supported(procfs: &Path, pid: i32) -> bool {
    probe_path(procfs, pid).exists()
}

/// Subprocesses of `pid` from the kernel children listing. Every task
/// directory is read so children forked from any thread are seen; a
/// task that exits mid-walk is skipped.
pub(crate) fn children(procfs: &Path, pid: i32) -> Result<Vec<i32>> {
    let task = procfs.join(pid.to_string()).join("task");
    let mut pids = Vec::new();

    for entry in fs::read_dir(task)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if let Ok(listing) = fs::read_to_string(entry.path().join("children")) {
            pids.extend(parse_children(&listing));
        }
    }

    Ok(pids)
}

/// Whitespace-separated pid tokens; anything else is skipped.
pub(crate) fn parse_children(listing: &str) -> Vec<i32> {
    listing
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pid_tokens() {
        assert_eq!(parse_children("123 456 789 "), vec![123, 456, 789]);
    }

    #[test]
    fn skips_junk_tokens() {
        assert_eq!(parse_children("123 abc 456\n7x 789"), vec![123, 456, 789]);
    }

    #[test]
    fn empty_listing() {
        assert!(parse_children("").is_empty());
        assert!(parse_children("\n").is_empty());
    }

    #[test]
    fn reads_every_task_listing() {
        let dir = tempfile::tempdir().unwrap();
        let task = dir.path().join("7").join("task");
        for (tid, listing) in [("7", "10 11"), ("8", "12")] {
            let tid = task.join(tid);
            fs::create_dir_all(&tid).unwrap();
            fs::write(tid.join("children"), listing).unwrap();
        }

        let mut pids = children(dir.path(), 7).unwrap();
        pids.sort_unstable();
        assert_eq!(pids, vec![10, 11, 12]);
    }

    #[test]
    fn probe_is_the_own_task_listing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!supported(dir.path(), 7));

        let tid = dir.path().join("7").join("task").join("7");
        fs::create_dir_all(&tid).unwrap();
        fs::write(tid.join("children"), "").unwrap();
        assert!(supported(dir.path(), 7));
    }
}
