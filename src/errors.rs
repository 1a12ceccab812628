// Workbench Gate - Error Taxonomy
//
// Every fault a tool call can produce, in one enum. The gateway converts
// each of these into a failure descriptor with a single "error" field;
// nothing escapes the dispatch boundary as a crash.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    /// Path resolves outside the workspace root. Rejected before any I/O.
    #[error("access outside sandbox is not allowed: '{0}'")]
    SandboxViolation(String),

    /// Requested tool name absent from the registry.
    #[error("unknown tool: '{0}'")]
    ToolNotFound(String),

    /// Missing required parameter, unknown parameter, or wrong shape.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Shell command's base name not on the allow-list.
    #[error("command '{0}' not allowed")]
    CommandNotAllowed(String),

    /// Child process exceeded its wall-clock budget.
    #[error("command timed out after {0} seconds")]
    CommandTimeout(u64),

    /// Process could not be spawned or its output captured.
    #[error("command failed: {0}")]
    CommandFailure(String),

    /// Unexpected fault inside a handler (missing file, bad SQL, ...).
    #[error("{0}")]
    Handler(String),
}

impl From<std::io::Error> for GateError {
    fn from(e: std::io::Error) -> Self {
        GateError::Handler(e.to_string())
    }
}

impl From<rusqlite::Error> for GateError {
    fn from(e: rusqlite::Error) -> Self {
        GateError::Handler(e.to_string())
    }
}

impl From<csv::Error> for GateError {
    fn from(e: csv::Error) -> Self {
        GateError::Handler(e.to_string())
    }
}

impl GateError {
    /// Stable class name, used by transports to pick a status code.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::SandboxViolation(_) => "sandbox_violation",
            GateError::ToolNotFound(_) => "tool_not_found",
            GateError::InvalidParameters(_) => "invalid_parameters",
            GateError::CommandNotAllowed(_) => "command_not_allowed",
            GateError::CommandTimeout(_) => "command_timeout",
            GateError::CommandFailure(_) => "command_failure",
            GateError::Handler(_) => "handler_fault",
        }
    }
}

pub type GateResult<T> = Result<T, GateError>;
