// Workbench Gate - Development Tool Group
//
// Command-backed tools, all rooted at the workspace via the Command
// Runner. Results carry stdout/stderr/returncode uninterpreted — a
// linter exiting nonzero on findings is a normal result. run_shell is
// the only tool taking a raw command line, and it is allow-listed.

use crate::command;
use crate::errors::{GateError, GateResult};
use crate::registry::{JsonMap, ParamSpec, ParamType, ToolContext, ToolSpec};
use crate::tools::{opt_u64_arg, str_arg};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "run_python",
            "Run a Python code snippet in a subprocess inside the workspace.",
            vec![
                ParamSpec::required("code", ParamType::String, "Python source to execute"),
                ParamSpec::optional("timeout", ParamType::Integer, json!(5), "Seconds before the process is killed"),
            ],
            run_python,
        ),
        ToolSpec::new(
            "run_shell",
            "Run a limited shell command in the workspace. Only allow-listed commands are permitted.",
            vec![
                ParamSpec::required("command", ParamType::String, "Command line to execute"),
                ParamSpec::optional("timeout", ParamType::Integer, json!(5), "Seconds before the process is killed"),
            ],
            run_shell,
        ),
        ToolSpec::new(
            "run_tests",
            "Run pytest in the workspace and return results.",
            vec![ParamSpec::optional(
                "timeout",
                ParamType::Integer,
                json!(10),
                "Seconds before the run is killed",
            )],
            run_tests,
        ),
        ToolSpec::new(
            "lint_code",
            "Lint Python files with flake8.",
            vec![ParamSpec::optional(
                "path",
                ParamType::String,
                json!("."),
                "File or directory to lint, relative to the workspace",
            )],
            lint_code,
        ),
        ToolSpec::new(
            "format_code",
            "Format Python files with black.",
            vec![ParamSpec::optional(
                "path",
                ParamType::String,
                json!("."),
                "File or directory to format, relative to the workspace",
            )],
            format_code,
        ),
        ToolSpec::new(
            "install_package",
            "Install a Python package into the workspace using pip.",
            vec![ParamSpec::required(
                "package",
                ParamType::String,
                "Package name to install",
            )],
            install_package,
        ),
    ]
}

// ============================================================================
// HANDLERS
// ============================================================================

fn run_python(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let code = str_arg(args, "code")?;
    let timeout = ctx.config.clamp_timeout(opt_u64_arg(args, "timeout"));

    // Script lives inside the workspace and is removed when the handle drops
    let mut script = tempfile::Builder::new()
        .prefix("snippet-")
        .suffix(".py")
        .tempfile_in(&ctx.workspace)
        .map_err(|e| GateError::CommandFailure(format!("failed to stage script: {}", e)))?;
    script
        .write_all(code.as_bytes())
        .map_err(|e| GateError::CommandFailure(format!("failed to stage script: {}", e)))?;

    let script_path = script.path().to_string_lossy().to_string();
    let output = ctx
        .runner()
        .run("python3", &[script_path.as_str()], Duration::from_secs(timeout))?;
    Ok(json!(output))
}

fn run_shell(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let command_line = str_arg(args, "command")?;
    let timeout = ctx.config.clamp_timeout(opt_u64_arg(args, "timeout"));

    // Allow-list check happens before any process layer is touched
    command::check_allowed(command_line, &ctx.config.shell_allowlist)?;

    let output = ctx
        .runner()
        .run_shell(command_line, Duration::from_secs(timeout))?;
    Ok(json!(output))
}

fn run_tests(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let timeout = ctx.config.clamp_timeout(opt_u64_arg(args, "timeout"));
    let output = ctx
        .runner()
        .run("pytest", &["-q"], Duration::from_secs(timeout))?;
    Ok(json!(output))
}

fn lint_code(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let timeout = ctx.config.clamp_timeout(None);
    let output = ctx
        .runner()
        .run("flake8", &[path], Duration::from_secs(timeout))?;
    Ok(json!(output))
}

fn format_code(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let timeout = ctx.config.clamp_timeout(None);
    let output = ctx
        .runner()
        .run("black", &[path], Duration::from_secs(timeout))?;
    Ok(json!(output))
}

fn install_package(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let package = str_arg(args, "package")?;
    let target = ctx.workspace.to_string_lossy().to_string();
    let timeout = ctx.config.clamp_timeout(Some(ctx.config.max_timeout_secs));
    let output = ctx.runner().run(
        "pip",
        &["install", "--target", target.as_str(), package],
        Duration::from_secs(timeout),
    )?;
    Ok(json!(output))
}

// ============================================================================
// TESTS
// ============================================================================
