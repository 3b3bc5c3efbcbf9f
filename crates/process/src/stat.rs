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

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// One row of the process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Process ID.
    pub pid: i32,
    /// Parent process ID.
    pub ppid: i32,
}

/// Parse the contents of a procfs `stat` file:
///
/// ```text
/// <pid> (<comm>) <state> <ppid> ...
/// 21230 (cat) R 9985 ...
/// ```
///
/// The command name may itself contain spaces, parentheses and newlines:
///
/// ```text
/// 21230 (cat foo) R 9985 ...
/// 21230 (cat (foo) S) R 9985 ...
/// ```
///
/// The pid is the leading integer and the command field ends at the last
/// `)` byte in the file; the state character and parent pid follow it.
pub(crate) fn parse_stat(stat: &str) -> Result<Stat> {
    let pid = stat
        .split_whitespace()
        .next()
        .and_then(|field| field.parse::<i32>().ok())
        .ok_or(Error::ParseStat)?;

    let bracket = stat.rfind(')').ok_or(Error::ParseStat)?;
    let mut fields = stat[bracket + 1..].split_whitespace();

    let state = fields.next().ok_or(Error::ParseStat)?;
    if state.chars().count() != 1 {
        return Err(Error::ParseStat);
    }

    let ppid = fields
        .next()
        .and_then(|field| field.parse::<i32>().ok())
        .ok_or(Error::ParseStat)?;

    Ok(Stat { pid, ppid })
}

pub(crate) fn read_stat(path: &Path) -> Result<Stat> {
    let stat = fs::read_to_string(path)?;
    parse_stat(&stat)
}

/// Snapshot of the system process table taken by walking the numeric
/// entries of the procfs root. Rows that fail to parse, or whose process
/// exits while the table is being read, are dropped.
pub fn snapshot(procfs: impl AsRef<Path>) -> Result<Vec<Stat>> {
    let mut table = Vec::new();

    for entry in fs::read_dir(procfs.as_ref())? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };

        let name = entry.file_name();
        let numeric = match name.to_str() {
            Some(name) => name.parse::<i32>().is_ok(),
            None => false,
        };
        if !numeric {
            continue;
        }

        if let Ok(stat) = read_stat(&entry.path().join("stat")) {
            table.push(stat);
        }
    }

    Ok(table)
}
