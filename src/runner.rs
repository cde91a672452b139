//! Invocation of the external `go test` tool.
//!
//! The pipeline talks to the test tool only through [`TestRunner`], so the
//! enumeration and generation steps can be driven by a fake in tests.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{DeltaError, Result};

const NO_TEST_FILES: &str = "[no test files]";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result of one isolated test run that was spawned and waited for.
#[derive(Debug, Clone)]
pub struct RunStatus {
    pub success: bool,
    /// Captured stderr, used to explain a failed run.
    pub stderr: String,
}

/// A tool that can list the tests of a package and run one of them alone.
pub trait TestRunner {
    /// Raw listing output, one name or informational line per line.
    fn list(&self) -> Result<String>;

    /// Run exactly `test_name`, writing its coverage profile to `profile_path`.
    /// Blocks until the run completes.
    fn run_isolated(&self, test_name: &str, profile_path: &Path) -> Result<RunStatus>;
}

/// [`TestRunner`] backed by the real `go` binary.
#[derive(Debug, Clone)]
pub struct GoTestRunner {
    go: PathBuf,
    package_dir: PathBuf,
    timeout: Option<Duration>,
}

impl GoTestRunner {
    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        Self {
            go: PathBuf::from("go"),
            package_dir: package_dir.into(),
            timeout: None,
        }
    }

    /// Set a custom `go` binary path
    #[must_use]
    pub fn with_go(mut self, go: impl Into<PathBuf>) -> Self {
        self.go = go.into();
        self
    }

    /// Kill any single test run that exceeds `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.go);
        cmd.arg("test").current_dir(&self.package_dir);
        cmd
    }
}

impl TestRunner for GoTestRunner {
    fn list(&self) -> Result<String> {
        let output = self
            .command()
            .args(["-list", "."])
            .output()
            .map_err(|e| {
                DeltaError::EnumerationFailed(format!(
                    "could not start {}: {e}",
                    self.go.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // An empty package is not a failure.
            if stdout.contains(NO_TEST_FILES) || stderr.contains(NO_TEST_FILES) {
                return Ok(stdout);
            }
            return Err(DeltaError::EnumerationFailed(format!(
                "go test -list exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }

    fn run_isolated(&self, test_name: &str, profile_path: &Path) -> Result<RunStatus> {
        let failed = |reason: String| DeltaError::TestExecutionFailed {
            test_name: test_name.to_string(),
            reason,
        };

        let mut cmd = self.command();
        cmd.arg("-count=1")
            .arg("-run")
            .arg(format!("^{test_name}$"))
            .arg("-coverprofile")
            .arg(profile_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // `go test` forks the compiled test binary; a timeout must reach it too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd
            .spawn()
            .map_err(|e| failed(format!("could not start {}: {e}", self.go.display())))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => wait_with_deadline(&mut child, timeout)?,
            None => Some(child.wait()?),
        };

        // After a timeout the drain threads are left detached: a process that
        // escaped the group kill may still hold the pipes open.
        let Some(status) = status else {
            return Err(DeltaError::TestExecutionTimeout {
                test_name: test_name.to_string(),
                timeout: self.timeout.unwrap_or_default(),
            });
        };

        let stdout = join_drain(stdout);
        let stderr = join_drain(stderr);
        if !stdout.is_empty() {
            tracing::debug!(test = test_name, "go test output:\n{}", stdout.trim_end());
        }

        Ok(RunStatus {
            success: status.success(),
            stderr,
        })
    }
}

/// Wait for `child`, killing it once `timeout` elapses. Returns `None` on
/// timeout.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_tree(child)?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill `child` and, when it leads its own process group, everything it
/// spawned.
fn kill_tree(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
            return Ok(child.kill()?);
        };
        // SAFETY: killpg only sends a signal; it touches no memory of ours.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
    }
    child.kill()?;
    Ok(())
}

/// Read a child pipe to completion on a helper thread so a chatty child
/// cannot block on a full pipe while we wait for it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            // A read error only loses diagnostics.
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_drain(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}
