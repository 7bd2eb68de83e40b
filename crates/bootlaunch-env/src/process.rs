//! Bounded child-process execution.
//!
//! Every provisioning step runs through [`ProcessRunner`]. The system
//! implementation drains stdout/stderr on background threads while the child
//! runs and kills it once the bound elapses, so no step can wait forever.
//! On Unix each command leads its own process group and the whole group is
//! killed, so helpers spawned by the tool (build backends, ensurepip) stop
//! with it.

use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a child to exit.
pub const POLL_INTERVAL_MS: u64 = 50;

/// Why a command is being run. Used for logging and by test runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    VersionQuery,
    Probe,
    CreateEnvironment,
    InstallDependencies,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VersionQuery => "version query",
            Self::Probe => "verification probe",
            Self::CreateEnvironment => "environment creation",
            Self::InstallDependencies => "dependency install",
        };
        f.write_str(s)
    }
}

/// A command line plus the reason it is being run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub purpose: Purpose,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(purpose: Purpose, program: impl Into<PathBuf>) -> Self {
        Self {
            purpose,
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// What happened to one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited on its own. `code` is `None` when killed by a signal.
    Exited { code: Option<i32>, output: String },
    /// The bound elapsed; the child was killed.
    TimedOut { after: Duration, output: String },
    /// The child could not be started.
    SpawnFailed { not_found: bool, message: String },
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0), .. })
    }

    /// Combined stdout/stderr captured so far.
    pub fn output(&self) -> &str {
        match self {
            Self::Exited { output, .. } | Self::TimedOut { output, .. } => output,
            Self::SpawnFailed { message, .. } => message,
        }
    }
}

/// Runs a command to completion or until `timeout`.
pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> RunOutcome;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> RunOutcome {
        (**self).run(spec, timeout)
    }
}

/// Spawns real child processes with captured, combined output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> RunOutcome {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        tracing::debug!(purpose = %spec.purpose, "Running: {}", spec);

        match cmd.spawn() {
            Ok(mut child) => wait_with_timeout(&mut child, timeout),
            Err(e) => RunOutcome::SpawnFailed {
                not_found: e.kind() == std::io::ErrorKind::NotFound,
                message: e.to_string(),
            },
        }
    }
}

/// Wait for `child` to exit, killing it once `timeout` has elapsed.
///
/// stdout and stderr are read on background threads into one shared buffer
/// while the child runs. Without this a child writing more than a pipe
/// buffer (~64KB) would block on write and never exit.
///
/// On timeout the child's process group is killed as well (the child is
/// expected to lead it, as [`SystemRunner`] arranges). The reader threads are
/// not joined: a process outside the group can keep the pipes open.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> RunOutcome {
    let start = Instant::now();
    let sink = Arc::new(Mutex::new(Vec::<u8>::new()));

    let mut readers = Vec::new();
    if let Some(out) = child.stdout.take() {
        readers.push(spawn_reader(out, Arc::clone(&sink)));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(spawn_reader(err, Arc::clone(&sink)));
    }

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                for handle in readers {
                    let _ = handle.join();
                }
                return RunOutcome::Exited {
                    code: status.code(),
                    output: snapshot(&sink),
                };
            }
            Ok(None) => {}
            Err(e) => {
                kill_tree(child);
                return RunOutcome::SpawnFailed {
                    not_found: false,
                    message: format!("Failed to wait for process: {}", e),
                };
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            tracing::debug!(pid = child.id(), "Bound elapsed, killing process group");
            kill_tree(child);
            return RunOutcome::TimedOut {
                after: elapsed,
                output: snapshot(&sink),
            };
        }

        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS).min(timeout - elapsed));
    }
}

/// Kill the child and everything in its process group, then reap it.
/// The child is not reaped before the group signal, so its pid cannot have
/// been reused.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Ok(pid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<S: Read + Send + 'static>(
    mut stream: S,
    sink: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut out) = sink.lock() {
                        out.extend_from_slice(&buf[..n]);
                    }
                }
            }
        }
    })
}

fn snapshot(sink: &Arc<Mutex<Vec<u8>>>) -> String {
    sink.lock()
        .map(|out| String::from_utf8_lossy(&out).into_owned())
        .unwrap_or_default()
}
