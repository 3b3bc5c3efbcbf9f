use std::ffi::OsStr;
use std::time::Duration;

use go_flag::{self, FlagError};
use thiserror::Error;

/// Command line surface of the supervisor.
#[derive(Debug)]
pub struct Flags {
    /// Signal sent to supervised processes.
    pub signal: i32,
    /// Escalate to SIGKILL when subprocesses outlive this deadline.
    pub deadline: Duration,
    /// Interval between signal broadcasts.
    pub delay: Duration,
    /// Disallow setuid (unkillable) subprocesses.
    pub disable_setuid: bool,
    /// Wait for subprocesses to exit instead of signalling them.
    pub wait: bool,
    /// Debug output.
    pub verbose: bool,
    /// Print the version and exit.
    pub version: bool,
    /// Foreground command and arguments.
    pub command: Vec<String>,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            signal: 15,
            deadline: Duration::from_secs(60),
            delay: Duration::from_secs(1),
            disable_setuid: false,
            wait: false,
            verbose: false,
            version: false,
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Either bad or unknown flag.
    #[error("Invalid arg: {0}")]
    InvalidArg(String),
    /// Required flag argument is missing.
    #[error("Missing arg: {0}")]
    MissingArg(String),
    /// Syntax error.
    #[error("Parse failed: {0}")]
    ParseError(String),
}

/// Parse command line arguments (Go flag syntax: `-flag value`).
pub fn parse<S: AsRef<OsStr>>(args: &[S]) -> Result<Flags, Error> {
    let mut flags = Flags::default();
    let mut deadline = String::new();
    let mut delay = String::new();

    let command: Vec<String> = go_flag::parse_args(args, |f| {
        f.add_flag("signal", &mut flags.signal);
        f.add_flag("deadline", &mut deadline);
        f.add_flag("delay", &mut delay);
        f.add_flag("disable-setuid", &mut flags.disable_setuid);
        f.add_flag("wait", &mut flags.wait);
        f.add_flag("verbose", &mut flags.verbose);
        f.add_flag("version", &mut flags.version);
    })
    .map_err(|e| match e {
        FlagError::BadFlag { flag } => Error::InvalidArg(flag),
        FlagError::UnknownFlag { name } => Error::InvalidArg(name),
        FlagError::ArgumentNeeded { name } => Error::MissingArg(name),
        FlagError::ParseError { error } => Error::ParseError(format!("{:?}", error)),
    })?;

    if !deadline.is_empty() {
        flags.deadline = parse_duration(&deadline).map_err(Error::ParseError)?;
    }
    if !delay.is_empty() {
        flags.delay = parse_duration(&delay).map_err(Error::ParseError)?;
    }
    flags.command = command;

    Ok(flags)
}

/// Parse a Go-style duration: decimal numbers with optional fractions,
/// each followed by a unit (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`), e.g.
/// `300ms`, `1.5s`, `1m30s`. The bare string `0` is permitted.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    // longest units first so `ms` is not read as `m`
    const UNITS: &[(&str, f64)] = &[
        ("ns", 1e-9),
        ("us", 1e-6),
        ("µs", 1e-6),
        ("ms", 1e-3),
        ("s", 1.0),
        ("m", 60.0),
        ("h", 3600.0),
    ];

    let mut rest = s;
    let mut secs = 0f64;

    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(split);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration: {}", s))?;

        let (unit, scale) = UNITS
            .iter()
            .find(|(unit, _)| suffix.starts_with(unit))
            .ok_or_else(|| format!("missing unit in duration: {}", s))?;
        secs += value * scale;

        rest = &suffix[unit.len()..];
    }

    Duration::try_from_secs_f64(secs).map_err(|_| format!("duration out of range: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all() {
        let args = [
            "-signal",
            "9",
            "-deadline",
            "5s",
            "-delay",
            "250ms",
            "-disable-setuid",
            "-wait",
            "-verbose",
            "sh",
            "-c",
            "sleep 1",
        ];

        let flags = parse(&args).unwrap();

        assert_eq!(flags.signal, 9);
        assert_eq!(flags.deadline, Duration::from_secs(5));
        assert_eq!(flags.delay, Duration::from_millis(250));
        assert!(flags.disable_setuid);
        assert!(flags.wait);
        assert!(flags.verbose);
        assert!(!flags.version);
        assert_eq!(flags.command, vec!["sh", "-c", "sleep 1"]);
    }

    #[test]
    fn parse_defaults() {
        let args = ["sleep", "30"];

        let flags = parse(&args).unwrap();

        assert_eq!(flags.signal, 15);
        assert_eq!(flags.deadline, Duration::from_secs(60));
        assert_eq!(flags.delay, Duration::from_secs(1));
        assert!(!flags.disable_setuid);
        assert!(!flags.wait);
        assert!(!flags.verbose);
        assert_eq!(flags.command, vec!["sleep", "30"]);
    }

    #[test]
    fn parse_version() {
        let flags = parse(&["-version"]).unwrap();
        assert!(flags.version);
        assert!(flags.command.is_empty());
    }

    #[test]
    fn parse_unknown_flag() {
        assert!(parse(&["-frobnicate", "sleep"]).is_err());
    }

    #[test]
    fn parse_bad_duration() {
        assert!(parse(&["-deadline", "banana", "sleep"]).is_err());
        assert!(parse(&["-delay", "10", "sleep"]).is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("100ns").unwrap(), Duration::from_nanos(100));
        assert_eq!(parse_duration("5us").unwrap(), Duration::from_micros(5));
        assert_eq!(parse_duration("5µs").unwrap(), Duration::from_micros(5));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("1x").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("-1s").is_err());
    }
}
