//! Shell command execution.

use crate::error::{Result, StagehandError};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// How often a streaming command checks whether it should stop.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,

    /// Whether the command was killed because a stop was requested.
    pub stopped: bool,
}

impl CommandResult {
    fn from_status(
        code: Option<i32>,
        success: bool,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code: code,
            stdout,
            stderr,
            duration,
            success,
            stopped: false,
        }
    }

    /// Last non-empty stderr lines, for failure messages.
    pub fn stderr_tail(&self, lines: usize) -> String {
        let tail: Vec<&str> = self
            .stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let start = tail.len().saturating_sub(lines);
        tail[start..].join("\n")
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,
}

/// Output line from command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

fn shell_command(command: &str, options: &CommandOptions) -> Command {
    let (shell, flag) = if cfg!(target_os = "windows") {
        ("cmd.exe", "/C")
    } else {
        ("/bin/sh", "-c")
    };

    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }
    cmd
}

fn forward_lines<R: Read + Send + 'static>(
    source: Option<R>,
    tx: mpsc::Sender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut collected = String::new();
        let Some(source) = source else {
            return collected;
        };
        for line in BufReader::new(source).lines().map_while(std::result::Result::ok) {
            collected.push_str(&line);
            collected.push('\n');
            let _ = tx.send(wrap(line));
        }
        collected
    })
}

fn kill(child: &mut Child, command: &str) {
    if let Err(e) = child.kill() {
        debug!("Could not kill '{}': {}", command, e);
    }
}

/// Execute a command, handing each output line to `on_line` as it arrives.
///
/// `should_stop` is polled while the command runs; when it returns true the
/// child is killed and the result is marked `stopped`.
pub fn execute_streaming(
    command: &str,
    options: &CommandOptions,
    on_line: &mut dyn FnMut(OutputLine),
    should_stop: &dyn Fn() -> bool,
) -> Result<CommandResult> {
    let start = Instant::now();

    let mut child = shell_command(command, options)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|_| StagehandError::CommandFailed {
            command: command.to_string(),
            code: None,
        })?;

    let (tx, rx) = mpsc::channel();
    let stdout_handle = forward_lines(child.stdout.take(), tx.clone(), OutputLine::Stdout);
    let stderr_handle = forward_lines(child.stderr.take(), tx, OutputLine::Stderr);

    let wait = |child: &mut Child| {
        child.wait().map_err(|_| StagehandError::CommandFailed {
            command: command.to_string(),
            code: None,
        })
    };

    loop {
        // Checked before every receive, not only on idle ticks.
        if should_stop() {
            debug!("Stopping '{}'", command);
            kill(&mut child, command);
            let status = wait(&mut child)?;
            // Grandchildren may still hold the pipes; the readers are left
            // to finish on their own.
            let mut result = CommandResult::from_status(
                status.code(),
                false,
                String::new(),
                String::new(),
                start.elapsed(),
            );
            result.stopped = true;
            return Ok(result);
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => on_line(line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    let status = wait(&mut child)?;

    Ok(CommandResult::from_status(
        status.code(),
        status.success(),
        stdout,
        stderr,
        start.elapsed(),
    ))
}
