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

//! Inbound signal stream for the supervisor. One stream is installed per
//! supervisor; its reader is the foreground runner while the foreground
//! is alive and the reaper controller afterwards.

use libc::c_int;
use signal_hook_tokio::Signals;

use crate::error::{Error, Result};
use crate::io_error;

/// Signals delivered to the supervisor and considered for forwarding.
/// SIGKILL and SIGSTOP cannot be caught, and the hard fault signals must
/// keep their default disposition, so neither group is registered.
pub(crate) const RELAYED: &[c_int] = &[
    libc::SIGHUP,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGABRT,
    libc::SIGUSR1,
    libc::SIGUSR2,
    libc::SIGPIPE,
    libc::SIGALRM,
    libc::SIGTERM,
    libc::SIGCHLD,
    libc::SIGCONT,
    libc::SIGTSTP,
    libc::SIGTTIN,
    libc::SIGTTOU,
    libc::SIGURG,
    libc::SIGXCPU,
    libc::SIGXFSZ,
    libc::SIGVTALRM,
    libc::SIGPROF,
    libc::SIGWINCH,
    libc::SIGIO,
];

/// Register the supervisor's signal stream.
pub(crate) fn install() -> Result<Signals> {
    Signals::new(RELAYED).map_err(io_error!(e, "register signal handlers"))
}

/// Whether an inbound signal is forwarded to the descendant set.
/// SIGCHLD, SIGIO, SIGPIPE and SIGURG are bookkeeping signals consumed
/// by the supervisor itself.
pub(crate) fn should_forward(sig: c_int) -> bool {
    !matches!(
        sig,
        libc::SIGCHLD | libc::SIGIO | libc::SIGPIPE | libc::SIGURG
    )
}
