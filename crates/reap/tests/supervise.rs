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

#![cfg(target_os = "linux")]

use std::ffi::OsString;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use tokio::sync::Mutex;

use reap::process::{Source, Strategy};
use reap::{Config, Reap};

lazy_static! {
    // every supervisor harvests with waitpid(-1); one test at a time may
    // own the process's children
    static ref SUPERVISED: Mutex<()> = Mutex::new(());
}

fn envs() -> Vec<(OsString, OsString)> {
    std::env::vars_os().collect()
}

async fn supervise(config: Config, argv: &[&str]) -> reap::Result<i32> {
    let argv: Vec<String> = argv.iter().map(|arg| arg.to_string()).collect();
    let mut reap = Reap::new(config)?;
    reap.supervise(&argv, &envs()).await
}

fn remaining_children() -> Vec<i32> {
    Source::new().unwrap().children().unwrap()
}

#[tokio::test]
async fn exposes_the_supervisor_pid_and_children() {
    let _guard = SUPERVISED.lock().await;

    let reap = Reap::new(Config::new()).unwrap();
    assert_eq!(reap.pid(), std::process::id() as i32);
    assert!(reap.children().unwrap().is_empty());
}

#[tokio::test]
async fn propagates_the_exit_code() {
    let _guard = SUPERVISED.lock().await;

    let status = supervise(Config::new(), &["sh", "-c", "exit 7"])
        .await
        .unwrap();
    assert_eq!(status, 7);
}

#[tokio::test]
async fn reports_signal_death_as_128_plus_signal() {
    let _guard = SUPERVISED.lock().await;

    let status = supervise(Config::new(), &["sh", "-c", "kill -9 $$"])
        .await
        .unwrap();
    assert_eq!(status, 137);
}

#[tokio::test]
async fn spawn_failure_maps_to_127() {
    let _guard = SUPERVISED.lock().await;

    let err = supervise(Config::new(), &["/nonexistent/reap-test-binary"])
        .await
        .unwrap_err();
    assert_eq!(err.exit_status(), 127);
}

#[tokio::test]
async fn disable_setuid_is_inherited_by_the_foreground() {
    let _guard = SUPERVISED.lock().await;

    let status = supervise(
        Config::new().with_disable_setuid(true),
        &[
            "sh",
            "-c",
            "grep -q '^NoNewPrivs:[[:space:]]*1' /proc/self/status",
        ],
    )
    .await
    .unwrap();
    assert_eq!(status, 0, "no-new-privs bit not set in the foreground");
}

#[tokio::test]
async fn terminates_backgrounded_subprocesses() {
    let _guard = SUPERVISED.lock().await;

    let status = supervise(
        Config::new(),
        &[
            "bash",
            "-c",
            "(exec -a reaptest-exec sleep 120) & (exec -a reaptest-exec sleep 120) & \
             (exec -a reaptest-exec sleep 120) &",
        ],
    )
    .await
    .unwrap();

    assert_eq!(status, 0);
    assert_eq!(remaining_children(), Vec::<i32>::new());
}

#[tokio::test]
async fn deadline_escalates_past_a_blocked_signal() {
    let _guard = SUPERVISED.lock().await;

    // force the table-scan resolver; the other tests run the default
    let config = Config::new()
        .with_signal(libc::SIGTERM)
        .with_deadline(Duration::from_secs(1))
        .with_strategy(Strategy::Scan);

    let start = Instant::now();
    let status = supervise(
        config,
        &[
            "bash",
            "-c",
            "trap '' TERM; (exec -a reaptest-deadline sleep 120) & \
             (exec -a reaptest-deadline sleep 120) &",
        ],
    )
    .await
    .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(status, 0);
    assert_eq!(remaining_children(), Vec::<i32>::new());
    assert!(
        elapsed >= Duration::from_millis(900),
        "returned before the deadline: {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_secs(30),
        "escalation took too long: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn wait_mode_does_not_signal_subprocesses() {
    let _guard = SUPERVISED.lock().await;

    // the background sleep outlives the foreground; a passive
    // supervisor must wait out its natural runtime instead of
    // terminating it
    let start = Instant::now();
    let status = supervise(Config::new().with_wait(true), &["sh", "-c", "sleep 0.5 &"])
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(status, 0);
    assert_eq!(remaining_children(), Vec::<i32>::new());
    assert!(
        elapsed >= Duration::from_millis(450),
        "subprocess did not run to completion: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn forwards_external_signals_to_descendants() {
    let _guard = SUPERVISED.lock().await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");
    // the trap is the expected exit path; the trailing write covers a
    // shell that leaves `wait` because the sleep died first
    let script = format!(
        "trap 'echo hit > {m}; exit 0' USR2; sleep 30 & wait $!; echo hit > {m}",
        m = marker.display()
    );

    let supervisor = std::process::id() as i32;
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        unsafe { libc::kill(supervisor, libc::SIGUSR2) };
    });

    let start = Instant::now();
    let status = supervise(Config::new(), &["sh", "-c", &script])
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(status, 0);
    assert!(marker.exists(), "signal was not forwarded to the shell");
    assert!(
        elapsed < Duration::from_secs(10),
        "signal was not forwarded to the process tree: {:?}",
        elapsed
    );
}
