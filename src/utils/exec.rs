//! External command execution.
//!
//! Every heavy operation in this pipeline (bundling, style compilation,
//! vendor prefixing, the supervised server) is an external tool. This module
//! provides the one builder they all go through, with stdin piping for
//! filter-style tools and optional PTY mode so compilers that detect a
//! terminal keep their colored diagnostics.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Bundler invocation
//! Cmd::from_slice(&resolved).cwd(root).run()?;
//!
//! // Vendor-prefixer pipe (css in on stdin, css out on stdout)
//! let output = Cmd::from_slice(&prefixer).stdin(css).run()?;
//! ```

use anyhow::{Context, Result};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::{Read, Write},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::OnceLock,
};

use crate::log;

// ============================================================================
// Builder
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    stdin_data: Option<Vec<u8>>,
    use_pty: bool,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g. `["sass", "--no-source-map"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument. Empty arguments are dropped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments. Empty arguments are dropped.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs
                .push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Enable PTY (pseudo-terminal) mode.
    ///
    /// PTY allows compilers to behave as if running in a real terminal,
    /// keeping colored output and progress display.
    pub fn pty(mut self, enable: bool) -> Self {
        self.use_pty = enable;
        self
    }

    /// Execute the command and return its output.
    ///
    /// A non-zero exit status is an error carrying the tool's diagnostics.
    pub fn run(self) -> Result<Output> {
        if self.stdin_data.is_some() {
            self.run_with_stdin()
        } else if self.use_pty {
            self.run_with_pty()
        } else {
            self.run_simple()
        }
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Simple execution without PTY or stdin.
    fn run_simple(self) -> Result<Output> {
        let name = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        if !output.status.success() {
            anyhow::bail!(format_error(&name, &output));
        }

        log_stderr(&name, &output);
        Ok(output)
    }

    /// Execution with stdin piping.
    fn run_with_stdin(self) -> Result<Output> {
        let name = self.program_name();
        let stdin_data = self.stdin_data.unwrap();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&stdin_data)
                .with_context(|| format!("Failed to write stdin to `{name}`"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))?;

        if !output.status.success() {
            anyhow::bail!(format_error(&name, &output));
        }

        Ok(output)
    }

    /// Execution with PTY support.
    fn run_with_pty(self) -> Result<Output> {
        let name = self.program_name();

        let mut cmd_builder = CommandBuilder::new(&self.program);
        cmd_builder.args(&self.args);

        for (k, v) in &self.envs {
            cmd_builder.env(k, v);
        }

        if let Some(dir) = &self.cwd {
            cmd_builder.cwd(dir);
        }

        let pty_system = NativePtySystem::default();
        let pair = pty_system.openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut child = pair.slave.spawn_command(cmd_builder)?;
        drop(pair.slave);

        // Read output in separate thread (PTY blocks until EOF)
        let mut reader = pair.master.try_clone_reader()?;
        let output_handle = std::thread::spawn(move || {
            let mut output = String::new();
            let _ = reader.read_to_string(&mut output);
            output
        });

        let status = child.wait()?;
        drop(pair.master);

        let output_str = output_handle
            .join()
            .map_err(|_| anyhow::anyhow!("Failed to join output reader thread"))?;

        if !status.success() {
            anyhow::bail!("Command `{name}` failed: {status:?}\n{output_str}");
        }

        // Convert to std::process::Output
        #[cfg(unix)]
        #[allow(clippy::cast_possible_wrap)]
        let std_status = {
            use std::os::unix::process::ExitStatusExt;
            std::process::ExitStatus::from_raw((status.exit_code() as i32) << 8)
        };
        #[cfg(windows)]
        let std_status = {
            use std::os::windows::process::ExitStatusExt;
            std::process::ExitStatus::from_raw(status.exit_code())
        };

        Ok(Output {
            status: std_status,
            stdout: output_str.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Pass a successful tool's stderr through the logger (warnings etc.).
fn log_stderr(name: &str, output: &Output) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<_> = stderr
        .lines()
        .filter(|line| !strip_ansi(line).trim().is_empty())
        .collect();
    if !lines.is_empty() {
        log!(name; "{}", lines.join("\n"));
    }
}

/// Format error message for a failed command.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    let stderr_trimmed = stderr.trim();
    if !stderr_trimmed.is_empty() {
        msg.push_str(stderr_trimmed);
    }

    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["sass", "--style=compressed"]);
        assert_eq!(cmd.program, OsString::from("sass"));
        assert_eq!(cmd.args, vec![OsString::from("--style=compressed")]);
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_simple_command() {
        let output = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_failed_command_is_error() {
        let result = Cmd::new("false").run();
        assert!(result.is_err());
    }

    #[test]
    fn test_stdin_pipe() {
        let output = Cmd::new("cat").stdin(b"test data").run().unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"test data");
    }
}
