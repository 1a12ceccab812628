// Workbench Gate - Command Runner
//
// Runs external processes rooted at the workspace with a wall-clock
// timeout. Captures stdout/stderr as trimmed text and surfaces the exit
// code uninterpreted — a linter exiting nonzero is a result, not a fault.
// Shell command lines are checked against the allow-list before any
// process is spawned.

use crate::errors::{GateError, GateResult};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a finished child process.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

pub struct CommandRunner {
    workdir: PathBuf,
}

impl CommandRunner {
    /// Runner rooted at the workspace. The working directory is fixed at
    /// construction and never caller-influenced.
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
        }
    }

    /// Run `program` with `args`, killing the child when `timeout` expires.
    pub fn run(&self, program: &str, args: &[&str], timeout: Duration) -> GateResult<CommandOutput> {
        let child = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GateError::CommandFailure(format!("failed to spawn '{}': {}", program, e)))?;

        self.wait_with_timeout(child, timeout)
    }

    /// Run a full command line through `sh -c`. The caller is responsible
    /// for allow-list checks (see [`check_allowed`]) before reaching here.
    pub fn run_shell(&self, command_line: &str, timeout: Duration) -> GateResult<CommandOutput> {
        self.run("sh", &["-c", command_line], timeout)
    }

    /// Poll the child until it exits or the budget runs out. Output pipes
    /// are drained on threads so a chatty child can't deadlock on a full
    /// pipe buffer while we wait.
    fn wait_with_timeout(&self, mut child: Child, timeout: Duration) -> GateResult<CommandOutput> {
        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait(); // reap — never leave a zombie
                        return Err(GateError::CommandTimeout(timeout.as_secs()));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(GateError::CommandFailure(format!("wait failed: {}", e)));
                }
            }
        };

        let stdout = join_reader(stdout_handle);
        let stderr = join_reader(stderr_handle);

        Ok(CommandOutput {
            stdout: stdout.trim().to_string(),
            stderr: stderr.trim().to_string(),
            // Killed by signal → no exit code
            returncode: status.code().unwrap_or(-1),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    })
}

fn join_reader(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Enforce the shell allow-list: the base name of the first token must be
/// one of the permitted commands. Rejection happens before any spawn.
pub fn check_allowed(command_line: &str, allowlist: &[String]) -> GateResult<()> {
    let first = command_line
        .split_whitespace()
        .next()
        .ok_or_else(|| GateError::InvalidParameters("command is empty".to_string()))?;

    // Strip any leading path so /bin/ls and ls are judged the same
    let base = first.rsplit('/').next().unwrap_or(first);

    if allowlist.iter().any(|allowed| allowed == base) {
        Ok(())
    } else {
        Err(GateError::CommandNotAllowed(base.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn runner(dir: &Path) -> CommandRunner {
        CommandRunner::new(dir)
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let dir = tempdir().unwrap();
        let out = runner(dir.path())
            .run("echo", &["hello"], Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "");
        assert_eq!(out.returncode, 0);
    }

    #[test]
    fn nonzero_exit_is_a_result_not_an_error() {
        let dir = tempdir().unwrap();
        let out = runner(dir.path())
            .run_shell("exit 3", Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.returncode, 3);
    }

    #[test]
    fn runs_in_the_configured_workdir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let out = runner(dir.path())
            .run("cat", &["marker.txt"], Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.stdout, "here");
    }

    #[test]
    fn timeout_kills_the_child() {
        let dir = tempdir().unwrap();
        let started = Instant::now();
        let result = runner(dir.path()).run("sleep", &["10"], Duration::from_secs(1));
        assert!(matches!(result, Err(GateError::CommandTimeout(1))));
        // Returned promptly after the budget, not after the full sleep
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_binary_is_a_command_failure() {
        let dir = tempdir().unwrap();
        let result = runner(dir.path()).run(
            "definitely-not-a-real-binary-xyz",
            &[],
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(GateError::CommandFailure(_))));
    }

    #[test]
    fn allowlist_accepts_base_names_and_paths() {
        let allow = vec!["ls".to_string(), "echo".to_string()];
        assert!(check_allowed("ls -la", &allow).is_ok());
        assert!(check_allowed("/bin/ls", &allow).is_ok());
        assert!(check_allowed("echo hi there", &allow).is_ok());
    }

    #[test]
    fn allowlist_rejects_everything_else() {
        let allow = vec!["ls".to_string()];
        assert!(matches!(
            check_allowed("rm -rf /", &allow),
            Err(GateError::CommandNotAllowed(name)) if name == "rm"
        ));
        assert!(check_allowed("", &allow).is_err());
    }
}
