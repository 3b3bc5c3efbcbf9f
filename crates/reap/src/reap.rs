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

use std::ffi::OsString;
#[cfg(target_os = "linux")]
use std::os::unix::process::CommandExt;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use futures::StreamExt;
use libc::c_int;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use signal_hook_tokio::Signals;
use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};

use reap_process::{Source, Strategy};

use crate::error::{Error, Result};
use crate::signals::{install, should_forward};
use crate::subreaper;
use crate::util::asyncify;
use crate::other;

/// Supervisor options.
#[derive(Debug, Clone)]
pub struct Config {
    signal: c_int,
    deadline: Duration,
    delay: Duration,
    wait: bool,
    disable_setuid: bool,
    strategy: Strategy,
    procfs: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            signal: libc::SIGTERM,
            deadline: Duration::from_secs(60),
            delay: Duration::from_secs(1),
            wait: false,
            disable_setuid: false,
            strategy: Strategy::Auto,
            procfs: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Default::default()
    }

    /// Signal sent to subprocesses after the foreground process exits.
    pub fn with_signal(mut self, signal: c_int) -> Self {
        self.signal = signal;
        self
    }

    /// Timeout for subprocesses to exit after the foreground process
    /// exits. When the deadline is reached, subprocesses are signaled
    /// with SIGKILL. Zero disables the escalation.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Interval between signal broadcasts after the foreground process
    /// exits. Zero broadcasts at timer granularity.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wait for subprocesses to exit instead of signalling them.
    /// Externally delivered signals are still forwarded.
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Disallow setuid (unkillable) subprocesses.
    pub fn with_disable_setuid(mut self, disable_setuid: bool) -> Self {
        self.disable_setuid = disable_setuid;
        self
    }

    /// Method for discovering subprocesses.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Procfs mount point, overriding `$PROC` and the default.
    pub fn with_procfs(mut self, procfs: impl Into<PathBuf>) -> Self {
        self.procfs = Some(procfs.into());
        self
    }
}

/// A process supervisor: the init process for its subprocesses.
///
/// The supervisor runs one foreground command, forwards inbound signals
/// to every descendant while it runs, and terminates the remaining
/// descendant tree when the foreground exits.
pub struct Reap {
    config: Config,
    source: Source,
    signals: Option<Signals>,
    subreaper_err: Option<Error>,
}

impl std::fmt::Debug for Reap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reap")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("signals", &self.signals.is_some())
            .field("subreaper_err", &self.subreaper_err)
            .finish()
    }
}

impl Reap {
    /// Set the current process to act as a process supervisor. A failed
    /// subreaper acquisition is recorded here and reported by
    /// [`Reap::exec`].
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = Source::builder().strategy(config.strategy);
        if let Some(procfs) = &config.procfs {
            builder = builder.procfs(procfs);
        }
        let source = builder.build()?;

        let signals = install()?;
        let subreaper_err = subreaper::set().err();

        Ok(Reap {
            config,
            source,
            signals: Some(signals),
            subreaper_err,
        })
    }

    /// Process identifier of the supervisor.
    pub fn pid(&self) -> i32 {
        self.source.pid()
    }

    /// Current descendant set of the supervisor.
    pub fn children(&self) -> Result<Vec<i32>> {
        Ok(self.source.children()?)
    }

    /// Run the foreground command, then terminate and collect every
    /// remaining subprocess. Returns the foreground exit status
    /// following the shell convention: the exit code for a normal exit,
    /// 128 plus the signal number for a signal death.
    pub async fn supervise(
        &mut self,
        argv: &[String],
        env: &[(OsString, OsString)],
    ) -> Result<i32> {
        let status = self.exec(argv, env).await;
        self.reap().await?;
        status
    }

    /// Fork and execute the foreground process with inherited stdio,
    /// forwarding inbound signals to the descendant set while it runs.
    pub async fn exec(&mut self, argv: &[String], env: &[(OsString, OsString)]) -> Result<i32> {
        if let Some(err) = self.subreaper_err.take() {
            return Err(err);
        }

        let arg0 = argv
            .first()
            .ok_or_else(|| Error::InvalidArgument("empty command".to_string()))?;

        let mut cmd = Command::new(arg0);
        cmd.args(&argv[1..]);
        cmd.env_clear();
        cmd.envs(env.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())));

        // The foreground must not outlive its supervisor: have the
        // kernel deliver SIGKILL to it when this process dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                prctl::set_death_signal(libc::SIGKILL as isize)
                    .map_err(std::io::Error::from_raw_os_error)
            });
        }

        let disable_setuid = self.config.disable_setuid;
        let command = arg0.clone();
        let child = asyncify(move || {
            if disable_setuid {
                // no-new-privs is a thread attribute: set it and fork on
                // the same blocking-pool thread so it is inherited
                set_no_new_privs()?;
            }
            cmd.spawn().map_err(|err| Error::Spawn { command, err })
        })
        .await?;

        let (waitch_tx, mut waitch_rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let mut child = child;
            let _ = waitch_tx.send(child.wait());
        });

        let mut signals = self
            .signals
            .take()
            .ok_or_else(|| other!("signal stream already taken"))?;

        let status = loop {
            tokio::select! {
                sig = signals.next() => {
                    if let Some(sig) = sig {
                        if should_forward(sig) {
                            broadcast(&self.source, sig);
                        }
                    }
                }
                res = &mut waitch_rx => {
                    break match res {
                        Ok(Ok(status)) => {
                            if let Some(code) = status.code() {
                                Ok(code)
                            } else if let Some(sig) = status.signal() {
                                Ok(128 + sig)
                            } else {
                                Ok(128)
                            }
                        }
                        Ok(Err(err)) => Err(Error::Wait(err)),
                        Err(_) => Err(Error::Wait(std::io::Error::other(
                            "foreground wait channel closed",
                        ))),
                    };
                }
            }
        };

        self.signals = Some(signals);
        status
    }

    /// Terminate and collect all remaining descendants. A controller
    /// task periodically signals the descendant set while this task
    /// harvests zombies; the controller is stopped once no children
    /// remain.
    pub async fn reap(&mut self) -> Result<()> {
        let signals = self
            .signals
            .take()
            .ok_or_else(|| other!("signal stream already taken"))?;

        let (exit_tx, exit_rx) = oneshot::channel::<()>();
        let controller = tokio::spawn(reaper(
            self.config.clone(),
            self.source.clone(),
            signals,
            exit_rx,
        ));

        let result = harvest().await;

        drop(exit_tx);
        let _ = controller.await;

        result
    }
}

/// Controller loop for the reap phase. Owns the working signal: ticks
/// rebroadcast it, the deadline promotes it to SIGKILL for the rest of
/// the run, and inbound external signals are forwarded to the
/// descendant set even in wait mode.
async fn reaper(config: Config, source: Source, mut signals: Signals, mut exitch: oneshot::Receiver<()>) {
    let mut sig = config.signal;

    // a zero deadline never escalates
    let mut armed = !config.deadline.is_zero();
    let escalate = time::sleep(config.deadline);
    tokio::pin!(escalate);

    // a zero delay still needs a valid ticker period
    let delay = if config.delay.is_zero() {
        Duration::from_nanos(1)
    } else {
        config.delay
    };
    let mut tick = time::interval_at(time::Instant::now() + delay, delay);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if !config.wait {
        broadcast(&source, sig);
    }

    loop {
        tokio::select! {
            _ = &mut exitch => return,
            _ = &mut escalate, if armed => {
                debug!("deadline elapsed: escalating to SIGKILL");
                sig = libc::SIGKILL;
                armed = false;
            }
            inbound = signals.next() => {
                if let Some(inbound) = inbound {
                    if should_forward(inbound) {
                        broadcast(&source, inbound);
                    }
                }
            }
            _ = tick.tick() => {
                if !config.wait {
                    broadcast(&source, sig);
                }
            }
        }
    }
}

/// Collect terminated subprocesses until none remain. The blocking wait
/// runs off the async runtime; this is the only task waiting on child
/// processes during the reap phase.
async fn harvest() -> Result<()> {
    asyncify(|| loop {
        match waitpid(Some(Pid::from_raw(-1)), None) {
            Ok(_) => {}
            Err(Errno::EINTR) => {}
            Err(Errno::ECHILD) => return Ok(()),
            Err(errno) => return Err(errno.into()),
        }
    })
    .await
}

/// Deliver `sig` to every current descendant of the supervisor. The
/// fan-out is best effort: a pid that exited between the snapshot and
/// the send is skipped, and any other delivery failure is logged
/// without stopping the broadcast.
fn broadcast(source: &Source, sig: c_int) {
    let pids = match source.children() {
        Ok(pids) => pids,
        Err(err) => {
            warn!("enumerate subprocesses: {}", err);
            return;
        }
    };

    for pid in pids {
        debug!("{}: kill {} {}", source.pid(), sig, pid);
        kill(pid, sig);
    }
}

fn kill(pid: i32, sig: c_int) {
    match Errno::result(unsafe { libc::kill(pid, sig) }) {
        Ok(_) | Err(Errno::ESRCH) => {}
        Err(errno) => warn!("kill {} {}: {}", sig, pid, errno),
    }
}

#[cfg(target_os = "linux")]
fn set_no_new_privs() -> Result<()> {
    prctl::set_no_new_privileges(true).map_err(|code| Error::Prctl {
        context: "PR_SET_NO_NEW_PRIVS",
        errno: Errno::from_raw(code),
    })
}

#[cfg(not(target_os = "linux"))]
fn set_no_new_privs() -> Result<()> {
    Err(Error::Unsupported)
}
