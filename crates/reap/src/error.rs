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

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The platform cannot grant subreaper status.
    #[error("subreaper unavailable on this platform")]
    Unsupported,

    /// A process attribute call failed.
    #[error("prctl({context}): {errno}")]
    Prctl {
        context: &'static str,
        errno: Errno,
    },

    /// The foreground command could not be spawned.
    #[error("{command}: {err}")]
    Spawn {
        command: String,
        #[source]
        err: io::Error,
    },

    /// The foreground exit status could not be collected.
    #[error("wait for foreground: {0}")]
    Wait(#[source] io::Error),

    #[error("{context} error: {err}")]
    IoError {
        context: String,
        #[source]
        err: io::Error,
    },

    #[error("Nix error: {0}")]
    Nix(#[from] nix::Error),

    #[error(transparent)]
    Process(#[from] reap_process::Error),

    #[error("Other: {0}")]
    Other(String),
}

impl Error {
    /// Exit status the supervisor reports for this error, following the
    /// shell convention's reserved values: 127 when the foreground could
    /// not be spawned, 128 when its exit status is unavailable, 2 for
    /// argument errors and 111 for supervisor setup failures.
    pub fn exit_status(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => 2,
            Error::Spawn { .. } => 127,
            Error::Wait(_) => 128,
            _ => 111,
        }
    }
}

#[macro_export]
macro_rules! io_error {
    ($e:ident, $($args:tt)+) => {
        |$e| Error::IoError {
            context: format_args!($($args)+).to_string(),
            err: $e,
        }
    };
}

#[macro_export]
macro_rules! other {
    ($($args:tt)*) => {
        Error::Other(format_args!($($args)*).to_string())
    };
}

#[macro_export]
macro_rules! other_error {
    ($e:ident, $s:expr) => {
        |$e| Error::Other($s.to_string() + &": ".to_string() + &$e.to_string())
    };
}
