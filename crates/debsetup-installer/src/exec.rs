use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::types::Interrupted;

const OUTPUT_TAIL_LINES: usize = 20;
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Failure of an external command that ran and exited unsuccessfully.
///
/// Attached as the source error so callers can recover the exit code with
/// `downcast_ref` anywhere in the context chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub program: String,
    pub context: String,
    pub code: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(
                f,
                "{}: {} exited with status {}",
                self.context, self.program, code
            )?,
            None => write!(
                f,
                "{}: {} was terminated by a signal",
                self.context, self.program
            )?,
        }
        if !self.stderr.is_empty() {
            write!(f, " stderr='{}'", self.stderr)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

pub trait CommandExecutor {
    /// Runs `command` to completion; output is only surfaced on failure.
    fn run(&self, command: &mut Command, context: &str) -> Result<()>;

    /// Runs `command` and returns its captured stdout.
    fn capture(&self, command: &mut Command, context: &str) -> Result<String>;
}

/// Runs commands on the host. With an interrupt flag attached, a running
/// child is terminated and reaped as soon as the flag is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor {
    interrupt: Option<&'static AtomicBool>,
}

impl SystemExecutor {
    pub fn with_interrupt(flag: &'static AtomicBool) -> Self {
        Self {
            interrupt: Some(flag),
        }
    }
}

impl CommandExecutor for SystemExecutor {
    fn run(&self, command: &mut Command, context: &str) -> Result<()> {
        run_command(command, context, self.interrupt).map(|_| ())
    }

    fn capture(&self, command: &mut Command, context: &str) -> Result<String> {
        let output = run_command(command, context, self.interrupt)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub(crate) fn run_command(
    command: &mut Command,
    context: &str,
    interrupt: Option<&AtomicBool>,
) -> Result<Output> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().with_context(|| {
        format!(
            "{context}: failed to start {}",
            program_name(command)
        )
    })?;
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let status = loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("{context}: failed to wait for {}", program_name(command)))?
        {
            break status;
        }
        if interrupt.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            terminate(&mut child);
            return Err(Interrupted.into());
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = Output {
        status,
        stdout: stdout.map(join_reader).unwrap_or_default(),
        stderr: stderr.map(join_reader).unwrap_or_default(),
    };
    if output.status.success() {
        return Ok(output);
    }
    Err(command_failure(command, context, &output).into())
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// SIGTERM first so `sudo` relays it to its child, SIGKILL after the grace
/// period. Pipe readers are left detached; a grandchild may still hold them.
fn terminate(child: &mut Child) {
    request_termination(child);
    let deadline = Instant::now() + TERMINATE_GRACE;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn request_termination(child: &Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill has no memory preconditions; the pid is our unreaped child.
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_termination(_child: &Child) {}

fn command_failure(command: &Command, context: &str, output: &Output) -> CommandFailure {
    let stderr = String::from_utf8_lossy(&output.stderr);
    CommandFailure {
        program: program_name(command),
        context: context.to_string(),
        code: output.status.code(),
        stderr: tail_lines(stderr.trim(), OUTPUT_TAIL_LINES),
    }
}

fn tail_lines(text: &str, keep: usize) -> String {
    let lines = text.lines().collect::<Vec<_>>();
    lines[lines.len().saturating_sub(keep)..].join("\n")
}

pub fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

/// Renders `command` as a single shell-like line for plans and logs.
pub fn describe_command(command: &Command) -> String {
    let mut parts = vec![program_name(command)];
    parts.extend(command.get_args().map(|arg| {
        let arg = arg.to_string_lossy();
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            format!("'{}'", arg.replace('\'', "'\\''"))
        } else {
            arg.into_owned()
        }
    }));
    parts.join(" ")
}
