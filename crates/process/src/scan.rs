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

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::Result;
use crate::stat::{snapshot, Stat};

/// Subprocesses of `root` found by walking the process table.
pub(crate) fn children(procfs: &Path, root: i32) -> Result<Vec<i32>> {
    let table = snapshot(procfs)?;
    Ok(descendants(&table, root))
}

/// Transitive descendants of `root`, in no particular order. The parent
/// graph is acyclic, but the walk keeps a visited set so a torn snapshot
/// cannot loop it. `root` itself is never part of the result.
pub(crate) fn descendants(table: &[Stat], root: i32) -> Vec<i32> {
    let mut index: HashMap<i32, Vec<i32>> = HashMap::new();
    for stat in table {
        index.entry(stat.ppid).or_default().push(stat.pid);
    }

    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(pid) = stack.pop() {
        let subprocs = match index.get(&pid) {
            Some(subprocs) => subprocs,
            None => continue,
        };
        for &pid in subprocs {
            if pid != root && visited.insert(pid) {
                stack.push(pid);
            }
        }
    }

    visited.into_iter().collect()
}
