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

//! Enumerate the process table for all processes or the descendants of
//! one process.
//!
//! A [`Source`] resolves the descendant set of a pid either by scanning
//! the process table under the procfs root or, where the kernel exposes
//! it, by reading the per-task children listings.

mod children;
mod error;
mod scan;
mod stat;

pub use error::{Error, Result};
pub use stat::{snapshot, Stat};

use std::env;
use std::path::{Path, PathBuf};

/// Default mount point for procfs filesystems. Overridden by the `PROC`
/// environment variable or [`SourceBuilder::procfs`].
pub const PROCFS: &str = "/proc";

/// Method for discovering subprocesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Prefer the kernel children listing, fall back to scanning.
    #[default]
    Auto,
    /// Walk the process table under the procfs root.
    Scan,
    /// Read the kernel children listing. Requires a kernel built with
    /// `CONFIG_PROC_CHILDREN`.
    KernelChildren,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolver {
    Scan,
    KernelChildren,
}

/// Descendant enumeration for one process.
#[derive(Debug, Clone)]
pub struct Source {
    pid: i32,
    procfs: PathBuf,
    resolver: Resolver,
}

impl Source {
    /// A source for the calling process with the default strategy and
    /// procfs root.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> SourceBuilder {
        SourceBuilder::default()
    }

    /// Process identifier the source enumerates descendants of.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// The procfs root the source reads from.
    pub fn procfs(&self) -> &Path {
        &self.procfs
    }

    /// Snapshot of the system process table.
    pub fn snapshot(&self) -> Result<Vec<Stat>> {
        stat::snapshot(&self.procfs)
    }

    /// The current descendant set of the pid, in no particular order.
    /// An empty set is not an error; a pid with no procfs entry is.
    pub fn children(&self) -> Result<Vec<i32>> {
        if !self.procfs.join(self.pid.to_string()).is_dir() {
            return Err(Error::NoSuchProcess(self.pid));
        }

        match self.resolver {
            Resolver::Scan => scan::children(&self.procfs, self.pid),
            Resolver::KernelChildren => children::children(&self.procfs, self.pid),
        }
    }
}

#[derive(Debug, Default)]
pub struct SourceBuilder {
    pid: Option<i32>,
    procfs: Option<PathBuf>,
    strategy: Strategy,
}

impl SourceBuilder {
    /// Enumerate descendants of `pid` instead of the calling process.
    pub fn pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Procfs mount point, overriding `$PROC` and the default.
    pub fn procfs(mut self, procfs: impl Into<PathBuf>) -> Self {
        self.procfs = Some(procfs.into());
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Resolve the procfs root and the discovery strategy. Fails when
    /// the root is not a procfs mount, or when the kernel children
    /// listing was requested but the kernel does not provide it.
    pub fn build(self) -> Result<Source> {
        let pid = self.pid.unwrap_or(std::process::id() as i32);

        let procfs = match self.procfs {
            Some(procfs) => procfs,
            None => env::var_os("PROC")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(PROCFS)),
        };
        if !procfs.is_absolute() {
            return Err(Error::NotMounted(procfs));
        }
        check_mounted(&procfs)?;

        let resolver = match self.strategy {
            Strategy::Scan => Resolver::Scan,
            Strategy::KernelChildren => {
                if !children::supported(&procfs, pid) {
                    return Err(Error::ChildrenUnsupported(children::probe_path(
                        &procfs, pid,
                    )));
                }
                Resolver::KernelChildren
            }
            Strategy::Auto => {
                if children::supported(&procfs, pid) {
                    Resolver::KernelChildren
                } else {
                    Resolver::Scan
                }
            }
        };

        Ok(Source {
            pid,
            procfs,
            resolver,
        })
    }
}

#[cfg(target_os = "linux")]
fn check_mounted(procfs: &Path) -> Result<()> {
    use nix::sys::statfs::{statfs, PROC_SUPER_MAGIC};

    match statfs(procfs) {
        Ok(fs) if fs.filesystem_type() == PROC_SUPER_MAGIC => Ok(()),
        _ => Err(Error::NotMounted(procfs.to_path_buf())),
    }
}

#[cfg(not(target_os = "linux"))]
fn check_mounted(procfs: &Path) -> Result<()> {
    if procfs.is_dir() {
        Ok(())
    } else {
        Err(Error::NotMounted(procfs.to_path_buf()))
    }
}

#[cfg(test)]
#[cfg(target_os = "linux")]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_calling_process() {
        let source = Source::new().unwrap();
        assert_eq!(source.pid(), std::process::id() as i32);
    }

    #[test]
    fn scan_finds_children_of_init() {
        let source = Source::builder()
            .pid(1)
            .strategy(Strategy::Scan)
            .build()
            .unwrap();
        assert!(!source.children().unwrap().is_empty());
    }

    #[test]
    fn snapshot_is_not_empty() {
        let source = Source::new().unwrap();
        assert!(!source.snapshot().unwrap().is_empty());
    }

    #[test]
    fn missing_pid_is_an_error() {
        let source = Source::builder().pid(0x7ffffffe).build().unwrap();
        match source.children() {
            Err(Error::NoSuchProcess(pid)) => assert_eq!(pid, 0x7ffffffe),
            other => panic!("expected NoSuchProcess, got {:?}", other),
        }
    }

    #[test]
    fn non_procfs_root_is_rejected() {
        let err = Source::builder().procfs("/bin").build().unwrap_err();
        assert!(matches!(err, Error::NotMounted(_)));
    }

    #[test]
    fn relative_procfs_root_is_rejected() {
        let err = Source::builder().procfs("proc").build().unwrap_err();
        assert!(matches!(err, Error::NotMounted(_)));
    }

    #[test]
    fn back_to_back_snapshots_agree_on_stable_rows() {
        let source = Source::new().unwrap();
        let pid = source.pid();

        // transient processes may differ between the two tables; our own
        // row is stable and must be identical in both
        let row = |table: &[Stat]| table.iter().find(|stat| stat.pid == pid).copied();
        let first = row(&source.snapshot().unwrap()).unwrap();
        let second = row(&source.snapshot().unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
