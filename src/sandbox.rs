// Workbench Gate - Path Sandbox Resolver
//
// Single source of truth for resolving caller-supplied paths against the
// workspace root. Pure logic, no filesystem access: `..` segments are
// collapsed logically before the containment check, so a raw-string prefix
// comparison can never be fooled by traversal.

use crate::errors::{GateError, GateResult};
use std::path::{Component, Path, PathBuf};

/// Resolve `relative` against `root`, rejecting anything that escapes.
///
/// Accepts absolute inputs only when they already lie inside the root
/// (an absolute path is otherwise an override attempt, not a mistake).
/// The returned path is normalized but not canonicalized — the target
/// may not exist yet (e.g. write_file to a fresh path).
pub fn resolve(root: &Path, relative: &str) -> GateResult<PathBuf> {
    let supplied = Path::new(relative);

    let mut resolved = root.to_path_buf();
    let mut depth: usize = 0; // components below the root

    for component in supplied.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    return Err(GateError::SandboxViolation(relative.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                // Absolute input: restart from it, then require containment.
                return resolve_absolute(root, supplied, relative);
            }
        }
    }

    Ok(resolved)
}

/// Containment check for absolute inputs: normalize, then require the
/// result to be the root itself or a descendant of it.
fn resolve_absolute(root: &Path, supplied: &Path, original: &str) -> GateResult<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in supplied.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(GateError::SandboxViolation(original.to_string()));
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized == root || normalized.starts_with(root) {
        Ok(normalized)
    } else {
        Err(GateError::SandboxViolation(original.to_string()))
    }
}

/// Relative form of a resolved path, for payloads that echo paths back
/// to the caller without leaking the workspace location.
pub fn relative_to_root(root: &Path, resolved: &Path) -> String {
    resolved
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| resolved.to_string_lossy().to_string())
}

// ============================================================================
// TESTS
// ============================================================================
