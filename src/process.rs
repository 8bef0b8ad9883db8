//! # External Command Execution
//!
//! Every external program the updater touches (`git` and the generator) is
//! started through the [`CommandRunner`] trait. The production implementation,
//! [`SystemRunner`], spawns a real process and waits for it, optionally with a
//! deadline. Tests replace it with a scripted fake so the orchestration logic
//! can be exercised without touching real repositories.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        }
    }
}

/// Trait for running external commands - allows mocking in tests
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` in `cwd` and waits for it to finish.
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// [`CommandOutput::status`]. `Err` means the command could not be started
    /// or did not finish in time.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// A runner that waits for commands indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that kills commands still running after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<CommandOutput> {
        debug!("Running {} {} (in {})", program, args.join(" "), cwd.display());

        let mut command = Command::new(program);
        command.args(args).current_dir(cwd).stdin(Stdio::null());

        let Some(timeout) = self.timeout else {
            return command.output().map(CommandOutput::from);
        };

        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn()?;

        // Pipes are drained on their own threads so a chatty child cannot
        // block on a full pipe while we poll for its exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    stop(&mut child);
                    return Err(e);
                }
            }
            if Instant::now() >= deadline {
                stop(&mut child);
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "`{}` did not finish within {} seconds",
                        program,
                        timeout.as_secs_f64()
                    ),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(CommandOutput {
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
            status: status.code(),
        })
    }
}

/// Kill `child` and reap it. Errors are ignored; the child may already be gone.
fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(handle: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<String> {
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
