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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The configured procfs root is not a mounted procfs filesystem.
    #[error("{}: not a procfs mount", .0.display())]
    NotMounted(PathBuf),

    /// The kernel does not expose a children listing for this process.
    #[error("{}: proc children listing not available", .0.display())]
    ChildrenUnsupported(PathBuf),

    /// The root pid has no procfs entry.
    #[error("no such process: {0}")]
    NoSuchProcess(i32),

    /// A stat row could not be parsed.
    #[error("unable to parse stat")]
    ParseStat,

    #[error("Failed to read procfs: {0}")]
    Io(#[from] io::Error),
}
