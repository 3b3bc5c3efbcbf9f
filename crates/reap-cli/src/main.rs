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

use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::process;

use log::error;

use reap::{logger, Config, Reap};

mod args;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    process::exit(run().await);
}

async fn run() -> i32 {
    let argv: Vec<OsString> = env::args_os().collect();
    let name = program(&argv);

    let flags = match args::parse(argv.get(1..).unwrap_or_default()) {
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("{}", err);
            usage(&name);
            return 2;
        }
    };

    if flags.version {
        println!("{} v{}", name, VERSION);
        return 0;
    }

    if flags.command.is_empty() {
        usage(&name);
        return 2;
    }

    if let Err(err) = logger::init(flags.verbose) {
        eprintln!("failed to setup logger: {}", err);
        return 111;
    }

    let config = Config::new()
        .with_signal(flags.signal)
        .with_deadline(flags.deadline)
        .with_delay(flags.delay)
        .with_wait(flags.wait)
        .with_disable_setuid(flags.disable_setuid);

    let mut reap = match Reap::new(config) {
        Ok(reap) => reap,
        Err(err) => {
            error!("{}", err);
            return err.exit_status();
        }
    };

    let env: Vec<(OsString, OsString)> = env::vars_os().collect();
    match reap.supervise(&flags.command, &env).await {
        Ok(status) => status,
        Err(err) => {
            error!("{}", err);
            err.exit_status()
        }
    }
}

fn program(argv: &[OsString]) -> String {
    argv.first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reap".to_string())
}

fn usage(name: &str) {
    eprintln!(
        "{name} v{VERSION}
Usage: {name} [options] <command> <...>

Options:
  -deadline duration
    \ttimeout for subprocesses to exit after the foreground process
    \texits, 0 to disable (default 60s)
  -delay duration
    \tinterval between signal broadcasts (default 1s)
  -disable-setuid
    \tdisallow setuid (unkillable) subprocesses
  -signal int
    \tsignal sent to supervised processes (default 15)
  -verbose
    \tdebug output
  -version
    \tprint version and exit
  -wait
    \twait for subprocesses to exit"
    );
}
