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

//! Set the process as the init for descendant processes.

use crate::error::Result;
#[cfg(any(target_os = "linux", target_os = "freebsd"))]
use crate::error::Error;

/// Set the current process as subreaper for its descendants.
///
/// A subreaper fulfills the role of `init` for its descendant processes.
/// When a process becomes orphaned (i.e., its immediate parent
/// terminates), it is reparented to the nearest still living ancestor
/// subreaper, which receives SIGCHLD when the orphan terminates and is
/// able to `wait()` on it to discover its termination status.
#[cfg(target_os = "linux")]
pub fn set() -> Result<()> {
    use nix::errno::Errno;

    prctl::set_child_subreaper(true).map_err(|code| Error::Prctl {
        context: "PR_SET_CHILD_SUBREAPER",
        errno: Errno::from_raw(code),
    })
}

/// Report whether the current process is the init process for its
/// descendants.
#[cfg(target_os = "linux")]
pub fn get() -> bool {
    prctl::get_child_subreaper().unwrap_or(false)
}

#[cfg(target_os = "freebsd")]
pub fn set() -> Result<()> {
    use nix::errno::Errno;
    use std::ptr;

    let res = unsafe { libc::procctl(libc::P_PID, 0, libc::PROC_REAP_ACQUIRE, ptr::null_mut()) };
    Errno::result(res).map(drop).map_err(Error::Nix)
}

#[cfg(target_os = "freebsd")]
pub fn get() -> bool {
    let mut status: libc::procctl_reaper_status = unsafe { std::mem::zeroed() };
    let res = unsafe {
        libc::procctl(
            libc::P_PID,
            0,
            libc::PROC_REAP_STATUS,
            &mut status as *mut _ as *mut libc::c_void,
        )
    };

    res == 0 && status.rs_flags & libc::REAPER_STATUS_OWNED != 0
}

/// Disabled on this platform.
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
pub fn set() -> Result<()> {
    Err(crate::error::Error::Unsupported)
}

/// Always false on this platform.
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
pub fn get() -> bool {
    false
}
