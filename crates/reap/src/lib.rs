//! A process supervisor: run a foreground command as its init process,
//! forward inbound signals to every descendant, and terminate the
//! remaining process tree when the foreground exits.
//!
//! The supervisor acquires kernel subreaper status so that daemonized
//! grandchildren reparent to it instead of to PID 1, then harvests the
//! whole descendant set under a delay/deadline policy: the configured
//! signal is rebroadcast every `delay` until `deadline` elapses, after
//! which SIGKILL is used.
//!
//! ```no_run
//! use std::ffi::OsString;
//!
//! use reap::{Config, Reap};
//!
//! #[tokio::main]
//! async fn main() -> reap::Result<()> {
//!     let mut reap = Reap::new(Config::new())?;
//!
//!     let argv = vec!["sleep".to_string(), "30".to_string()];
//!     let env: Vec<(OsString, OsString)> = std::env::vars_os().collect();
//!     let status = reap.supervise(&argv, &env).await?;
//!
//!     std::process::exit(status)
//! }
//! ```

pub mod error;
pub mod logger;
pub mod subreaper;

mod reap;
mod signals;
mod util;

pub use error::{Error, Result};
pub use reap::{Config, Reap};

pub use reap_process as process;
