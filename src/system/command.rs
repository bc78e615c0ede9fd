//! Command executor - runs a single shell command and captures its result

use crate::error::{MaintainError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// How long output readers may linger once a timed-out command is killed
const READER_GRACE: Duration = Duration::from_millis(500);

/// Options recognized by the executor
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Echo output live while it is captured
    pub interactive: bool,

    /// Kill the command after this long (None = wait forever)
    pub timeout: Option<Duration>,

    /// Working directory override
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for options with live output enabled
    pub fn interactive() -> Self {
        Self::default().with_interactive(true)
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Result of one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// The command line that was run
    pub command: String,

    /// Exit status (-1 when killed by a signal or the timeout)
    pub exit_status: i32,

    /// Captured standard output
    pub output: String,

    /// Captured standard error
    pub stderr: String,

    /// Whether the command was killed by the timeout
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0 && !self.timed_out
    }

    /// Build the error describing this invocation's failure
    pub fn execution_error(&self) -> MaintainError {
        let output = if self.output.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.output.trim()
        };
        let output = if self.timed_out {
            format!("timed out; {}", output)
        } else {
            output.to_string()
        };

        MaintainError::CommandExecution {
            command: self.command.clone(),
            exit_status: self.exit_status,
            output,
        }
    }
}

/// Runs external commands on the host
///
/// Only `run` has to be provided. A non-zero exit never fails `run`; it is
/// reported through [`CommandResult::success`]. `execute_or_fail` is the one
/// variant that turns it into [`MaintainError::CommandExecution`].
pub trait CommandExecutor {
    /// Run a command and capture its status and output
    fn run(&self, command: &str, options: &CommandOptions) -> Result<CommandResult>;

    /// Return the output, failing when the command exits non-zero
    fn execute_or_fail(&self, command: &str, options: &CommandOptions) -> Result<String> {
        let result = self.run(command, options)?;
        if result.success() {
            Ok(result.output)
        } else {
            Err(result.execution_error())
        }
    }

    /// Return the output whatever the exit status
    fn execute_or_default(&self, command: &str, options: &CommandOptions) -> Result<String> {
        Ok(self.run(command, options)?.output)
    }

    fn execute_with_status(&self, command: &str, options: &CommandOptions) -> Result<(i32, String)> {
        let result = self.run(command, options)?;
        Ok((result.exit_status, result.output))
    }

    /// Probe: true when the command exits with status 0
    fn test_success(&self, command: &str, options: &CommandOptions) -> bool {
        match self.run(command, options) {
            Ok(result) => result.success(),
            Err(e) => {
                warn!("Failed to run probe '{}': {}", command, e);
                false
            }
        }
    }
}

/// Executor that hands command lines to a POSIX shell
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }
}

impl CommandExecutor for ShellExecutor {
    fn run(&self, command: &str, options: &CommandOptions) -> Result<CommandResult> {
        debug!(
            "Running command: {} (interactive: {}, timeout: {:?})",
            command, options.interactive, options.timeout
        );

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if options.interactive {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
        }
        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }
        // A timed command leads its own process group so expiry reaches every
        // process the shell forked. Interactive commands stay in the terminal's
        // foreground group to keep reading stdin.
        let own_group = options.timeout.is_some() && !options.interactive;
        if own_group {
            cmd.process_group(0);
        }

        let mut child = cmd.spawn()?;

        // Both pipes are drained concurrently so a chatty child never blocks
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr was not piped"))?;
        let stdout_reader = spawn_reader(stdout, options.interactive.then_some(Echo::Stdout));
        let stderr_reader = spawn_reader(stderr, options.interactive.then_some(Echo::Stderr));

        let (status, timed_out) = match options.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => (status, false),
                None => {
                    warn!("Command timed out after {:?}: {}", limit, command);
                    kill_command(&mut child, own_group)?;
                    (child.wait()?, true)
                }
            },
            None => (child.wait()?, false),
        };

        let grace = timed_out.then_some(READER_GRACE);
        let output = collect_output(stdout_reader, grace)?;
        let stderr = collect_output(stderr_reader, grace)?;
        let exit_status = if timed_out {
            -1
        } else {
            status.code().unwrap_or(-1)
        };

        debug!("Command '{}' exited with status {}", command, exit_status);

        Ok(CommandResult {
            command: command.to_string(),
            exit_status,
            output: String::from_utf8_lossy(&output).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            timed_out,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Echo {
    Stdout,
    Stderr,
}

/// Kill a timed-out command, taking its whole process group when it has one
fn kill_command(child: &mut Child, own_group: bool) -> Result<()> {
    if own_group {
        let pgid = Pid::from_raw(child.id() as i32);
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) => return Ok(()),
            Err(e) => warn!("Failed to kill process group {}: {}", pgid, e),
        }
    }
    child.kill()?;
    Ok(())
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    echo: Option<Echo>,
) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone only when the caller stopped waiting
        let _ = tx.send(read_pipe(pipe, echo));
    });
    rx
}

fn read_pipe<R: Read>(pipe: R, echo: Option<Echo>) -> io::Result<Vec<u8>> {
    let mut reader = BufReader::new(pipe);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        match echo {
            Some(Echo::Stdout) => {
                let mut out = io::stdout().lock();
                out.write_all(&line)?;
                out.flush()?;
            }
            Some(Echo::Stderr) => {
                let mut err = io::stderr().lock();
                err.write_all(&line)?;
                err.flush()?;
            }
            None => {}
        }
        captured.extend_from_slice(&line);
    }
    Ok(captured)
}

/// Wait for a reader to hit end of file
///
/// With a grace period the wait is bounded: a process that escaped the kill
/// may still hold the pipe open, and its output is then dropped.
fn collect_output(
    reader: Receiver<io::Result<Vec<u8>>>,
    grace: Option<Duration>,
) -> Result<Vec<u8>> {
    let received = match grace {
        Some(limit) => match reader.recv_timeout(limit) {
            Ok(received) => received,
            Err(RecvTimeoutError::Timeout) => {
                warn!("Output pipe still open {:?} after kill, dropping output", limit);
                return Ok(Vec::new());
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(io::Error::other("output reader thread panicked").into())
            }
        },
        None => reader
            .recv()
            .map_err(|_| io::Error::other("output reader thread panicked"))?,
    };
    Ok(received?)
}
