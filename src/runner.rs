//! Running IPECMD as a child process.
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::{
    io::{ErrorKind, Read},
    process::{Child, Command, Stdio},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use crate::{
    command::CommandLine,
    constants::{PIPE_GRACE, POLL_INTERVAL},
    error::{Error, Result},
};

/// Captured result of one finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// `-1` when the child was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Abstraction of the process layer, so the facade can be driven without
/// spawning anything.
pub trait Runner {
    fn run(&self, cmd: &CommandLine, timeout: Duration) -> Result<InvocationResult>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, cmd: &CommandLine, timeout: Duration) -> Result<InvocationResult> {
        (**self).run(cmd, timeout)
    }
}

/// Spawns the executable directly, arguments are never shell-interpreted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, cmd: &CommandLine, timeout: Duration) -> Result<InvocationResult> {
        log::debug!("Spawning {} (timeout {:?})", cmd, timeout);
        let started = Instant::now();

        let mut command = Command::new(&cmd.program);
        command
            .args(cmd.args_os())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // own process group, so a timeout takes down anything IPECMD started
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::ToolNotFound {
                searched: vec![cmd.program.clone()],
            },
            _ => Error::Io(err),
        })?;

        // Drain both pipes concurrently so a chatty child can't block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {}
                Err(err) => {
                    terminate(&mut child);
                    return Err(err.into());
                }
            }
            if started.elapsed() >= timeout {
                log::debug!("Killing pid {} after {:?}", child.id(), timeout);
                terminate(&mut child);
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let deadline = Instant::now() + PIPE_GRACE;
        let stdout = collect(stdout, deadline);
        let stderr = collect(stderr, deadline);
        let duration = started.elapsed();

        match status {
            Some(status) => {
                let exit_code = status.code().unwrap_or(-1);
                log::debug!("IPECMD exited with {} after {:?}", exit_code, duration);
                log::trace!("stdout: {}", stdout);
                log::trace!("stderr: {}", stderr);
                Ok(InvocationResult {
                    exit_code,
                    stdout,
                    stderr,
                    duration,
                })
            }
            None => Err(Error::TimeoutExceeded {
                after: timeout,
                stdout,
                stderr,
            }),
        }
    }
}

/// Kill the child's process group (unix) and the child itself, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::{
            sys::signal::{Signal, killpg},
            unistd::Pid,
        };
        if let Err(err) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            log::trace!("killpg {}: {}", child.id(), err);
        }
    }
    // already exited if this fails, wait() reaps either way
    let _ = child.kill();
    let _ = child.wait();
}

/// Output of one pipe, filled by a reader thread.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: thread::JoinHandle<()>,
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Capture {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = buf.clone();
    let reader = thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut out) => out.extend_from_slice(&chunk[..n]),
                    Err(poisoned) => poisoned.into_inner().extend_from_slice(&chunk[..n]),
                },
            }
        }
    });
    Capture { buf, reader }
}

/// Text captured so far. A detached grandchild may keep the pipe open after
/// the child is gone, so readers only get until `deadline` to reach EOF.
fn collect(capture: Option<Capture>, deadline: Instant) -> String {
    let Some(capture) = capture else {
        return String::new();
    };
    while !capture.reader.is_finished() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    if capture.reader.is_finished() {
        let _ = capture.reader.join();
    }
    match capture.buf.lock() {
        Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
        Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
    }
}
