// Workbench Gate - Filesystem Tool Group
//
// Sandboxed file operations. Every path parameter resolves through the
// sandbox before any I/O; payload paths are echoed back relative to the
// workspace root.

use crate::errors::{GateError, GateResult};
use crate::registry::{JsonMap, ParamSpec, ParamType, ToolContext, ToolSpec};
use crate::sandbox;
use crate::tools::{bool_arg, str_arg};
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "list_files",
            "List all files in the given directory inside the sandbox.",
            vec![ParamSpec::optional(
                "path",
                ParamType::String,
                json!("."),
                "Directory to list, relative to the workspace",
            )],
            list_files,
        ),
        ToolSpec::new(
            "read_file",
            "Read the full content of a text file inside the sandbox.",
            vec![ParamSpec::required(
                "path",
                ParamType::String,
                "File to read, relative to the workspace",
            )],
            read_file,
        ),
        ToolSpec::new(
            "write_file",
            "Write text content to a file. Use overwrite=true to replace an existing file.",
            vec![
                ParamSpec::required("path", ParamType::String, "Destination file"),
                ParamSpec::required("content", ParamType::String, "Text content to write"),
                ParamSpec::optional(
                    "overwrite",
                    ParamType::Boolean,
                    json!(false),
                    "Replace the file if it already exists",
                ),
            ],
            write_file,
        ),
        ToolSpec::new(
            "delete_file",
            "Delete a file inside the sandbox directory.",
            vec![ParamSpec::required("path", ParamType::String, "File to delete")],
            delete_file,
        ),
        ToolSpec::new(
            "file_info",
            "Return metadata (size, type, last modified time) for a file or directory.",
            vec![ParamSpec::required("path", ParamType::String, "File or directory")],
            file_info,
        ),
        ToolSpec::new(
            "search_files",
            "Search for files by name containing a given keyword.",
            vec![
                ParamSpec::required("keyword", ParamType::String, "Substring to match in file names"),
                ParamSpec::optional("path", ParamType::String, json!("."), "Directory to search from"),
            ],
            search_files,
        ),
        ToolSpec::new(
            "search_text",
            "Search for text inside files, returning line matches.",
            vec![
                ParamSpec::required("keyword", ParamType::String, "Substring to match in file content"),
                ParamSpec::optional("path", ParamType::String, json!("."), "Directory to search from"),
            ],
            search_text,
        ),
        ToolSpec::new(
            "make_directory",
            "Create a new directory inside the sandbox.",
            vec![ParamSpec::required("path", ParamType::String, "Directory to create")],
            make_directory,
        ),
        ToolSpec::new(
            "list_directories",
            "List all directories in the given path inside the sandbox.",
            vec![ParamSpec::optional(
                "path",
                ParamType::String,
                json!("."),
                "Directory to list, relative to the workspace",
            )],
            list_directories,
        ),
        ToolSpec::new(
            "delete_directory",
            "Delete a directory (and its contents) inside the sandbox.",
            vec![ParamSpec::required("path", ParamType::String, "Directory to delete")],
            delete_directory,
        ),
    ]
}

// ============================================================================
// HANDLERS
// ============================================================================

fn list_files(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let target = sandbox::resolve(&ctx.workspace, str_arg(args, "path")?)?;
    let mut files: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(&target)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    files.sort();
    Ok(json!({ "files": files }))
}

fn read_file(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let target = sandbox::resolve(&ctx.workspace, str_arg(args, "path")?)?;
    let content = std::fs::read_to_string(&target)?;
    Ok(json!({ "content": content }))
}

fn write_file(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let content = str_arg(args, "content")?;
    let overwrite = bool_arg(args, "overwrite")?;

    let target = sandbox::resolve(&ctx.workspace, path)?;
    if target.exists() && !overwrite {
        return Err(GateError::Handler(format!(
            "File '{}' already exists. Use overwrite=true to replace it.",
            path
        )));
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, content)?;
    Ok(json!({ "status": format!("File '{}' written successfully.", path) }))
}

fn delete_file(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let target = sandbox::resolve(&ctx.workspace, path)?;
    if !target.exists() {
        return Err(GateError::Handler(format!("File '{}' does not exist.", path)));
    }
    if target.is_dir() {
        return Err(GateError::Handler(format!(
            "'{}' is a directory, not a file.",
            path
        )));
    }
    std::fs::remove_file(&target)?;
    Ok(json!({ "status": format!("File '{}' deleted successfully.", path) }))
}

fn file_info(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let target = sandbox::resolve(&ctx.workspace, path)?;
    if !target.exists() {
        return Err(GateError::Handler(format!("File '{}' does not exist.", path)));
    }
    let meta = std::fs::metadata(&target)?;
    let modified: DateTime<Local> = meta.modified()?.into();

    let mut info = json!({
        "path": path,
        "is_directory": meta.is_dir(),
        "size_bytes": meta.len(),
        "last_modified": modified.format("%Y-%m-%d %H:%M:%S").to_string(),
    });
    if meta.is_file() {
        info["checksum"] = json!(sha256_hex(&std::fs::read(&target)?));
    }
    Ok(info)
}

fn search_files(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let keyword = str_arg(args, "keyword")?.to_lowercase();
    let target = sandbox::resolve(&ctx.workspace, str_arg(args, "path")?)?;

    let mut matches: Vec<String> = Vec::new();
    for entry in WalkDir::new(&target).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.contains(&keyword) {
                matches.push(sandbox::relative_to_root(&ctx.workspace, entry.path()));
            }
        }
    }
    matches.sort();
    Ok(json!({ "matches": matches }))
}

fn search_text(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let keyword = str_arg(args, "keyword")?.to_lowercase();
    let target = sandbox::resolve(&ctx.workspace, str_arg(args, "path")?)?;

    let mut matches: Vec<Value> = Vec::new();
    for entry in WalkDir::new(&target).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        // Binary or unreadable files are skipped, not errors
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(c) => c,
            Err(_) => continue,
        };
        for (i, line) in content.lines().enumerate() {
            if line.to_lowercase().contains(&keyword) {
                matches.push(json!({
                    "file": sandbox::relative_to_root(&ctx.workspace, entry.path()),
                    "line_number": i + 1,
                    "line": line.trim(),
                }));
            }
        }
    }
    Ok(json!({ "matches": matches }))
}

fn make_directory(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let target = sandbox::resolve(&ctx.workspace, path)?;
    if target.exists() {
        return Err(GateError::Handler(format!(
            "Directory '{}' already exists.",
            path
        )));
    }
    std::fs::create_dir_all(&target)?;
    Ok(json!({ "status": format!("Directory '{}' created successfully.", path) }))
}

fn list_directories(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let target = sandbox::resolve(&ctx.workspace, str_arg(args, "path")?)?;
    let mut directories: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(&target)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            directories.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    directories.sort();
    Ok(json!({ "directories": directories }))
}

fn delete_directory(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let path = str_arg(args, "path")?;
    let target = sandbox::resolve(&ctx.workspace, path)?;
    if !target.exists() {
        return Err(GateError::Handler(format!(
            "Directory '{}' does not exist.",
            path
        )));
    }
    if !target.is_dir() {
        return Err(GateError::Handler(format!("'{}' is not a directory.", path)));
    }
    if target == ctx.workspace {
        return Err(GateError::Handler(
            "Cannot delete the workspace root.".to_string(),
        ));
    }
    std::fs::remove_dir_all(&target)?;
    Ok(json!({ "status": format!("Directory '{}' deleted successfully.", path) }))
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbenchConfig;
    use crate::gateway::{CallRequest, Gateway};
    use tempfile::tempdir;

    fn gateway_in(dir: &std::path::Path) -> Gateway {
        let config = WorkbenchConfig {
            workspace_root: dir.to_path_buf(),
            ..WorkbenchConfig::default()
        };
        Gateway::new(config).unwrap()
    }

    fn call(gw: &Gateway, name: &str, params: Value) -> Value {
        gw.dispatch(&CallRequest::new(
            name,
            params.as_object().cloned().unwrap_or_default(),
        ))
        .to_value()
    }

    #[test]
    fn write_then_read_round_trips_exactly() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        let content = "line one\nline two\n";

        let written = call(
            &gw,
            "FS: write_file",
            json!({"path": "notes.txt", "content": content, "overwrite": true}),
        );
        assert!(written.get("error").is_none(), "{:?}", written);

        let read = call(&gw, "FS: read_file", json!({"path": "notes.txt"}));
        assert_eq!(read["content"], content);
    }

    #[test]
    fn write_without_overwrite_refuses_to_clobber() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        call(&gw, "FS: write_file", json!({"path": "a.txt", "content": "1"}));
        let second = call(&gw, "FS: write_file", json!({"path": "a.txt", "content": "2"}));
        assert!(second["error"].as_str().unwrap().contains("already exists"));
        // Original content intact
        let read = call(&gw, "FS: read_file", json!({"path": "a.txt"}));
        assert_eq!(read["content"], "1");
    }

    #[test]
    fn list_files_is_idempotent_and_files_only() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        call(&gw, "FS: write_file", json!({"path": "b.txt", "content": "x"}));
        call(&gw, "FS: write_file", json!({"path": "a.txt", "content": "x"}));
        call(&gw, "FS: make_directory", json!({"path": "subdir"}));

        let first = call(&gw, "FS: list_files", json!({}));
        let second = call(&gw, "FS: list_files", json!({}));
        assert_eq!(first, second);
        assert_eq!(first["files"], json!(["a.txt", "b.txt"]));

        let dirs = call(&gw, "FS: list_directories", json!({}));
        assert_eq!(dirs["directories"], json!(["subdir"]));
    }

    #[test]
    fn traversal_is_blocked_before_any_io() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        let result = call(
            &gw,
            "FS: write_file",
            json!({"path": "../escape.txt", "content": "nope"}),
        );
        assert!(result["error"].as_str().unwrap().contains("sandbox"));
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());

        let read = call(&gw, "FS: read_file", json!({"path": "../../etc/passwd"}));
        assert!(read.get("error").is_some());
    }

    #[test]
    fn file_info_reports_size_type_and_checksum() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        call(&gw, "FS: write_file", json!({"path": "data.bin", "content": "abc"}));

        let info = call(&gw, "FS: file_info", json!({"path": "data.bin"}));
        assert_eq!(info["is_directory"], false);
        assert_eq!(info["size_bytes"], 3);
        // sha256("abc")
        assert_eq!(
            info["checksum"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let dir_info = call(&gw, "FS: file_info", json!({"path": "."}));
        assert_eq!(dir_info["is_directory"], true);
        assert!(dir_info.get("checksum").is_none());
    }

    #[test]
    fn search_finds_names_and_content_recursively() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        call(&gw, "FS: write_file", json!({"path": "src/main.rs", "content": "fn main() {}"}));
        call(&gw, "FS: write_file", json!({"path": "readme.md", "content": "hello MAIN docs"}));

        let by_name = call(&gw, "FS: search_files", json!({"keyword": "main"}));
        assert_eq!(by_name["matches"], json!(["src/main.rs"]));

        let by_text = call(&gw, "FS: search_text", json!({"keyword": "main"}));
        let matches = by_text["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().any(|m| m["file"] == "readme.md" && m["line_number"] == 1));
    }

    #[test]
    fn delete_directory_removes_contents() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        call(&gw, "FS: write_file", json!({"path": "tree/deep/leaf.txt", "content": "x"}));

        let deleted = call(&gw, "FS: delete_directory", json!({"path": "tree"}));
        assert!(deleted.get("error").is_none());
        assert!(!dir.path().join("tree").exists());

        let again = call(&gw, "FS: delete_directory", json!({"path": "tree"}));
        assert!(again["error"].as_str().unwrap().contains("does not exist"));
    }

    #[test]
    fn delete_file_rejects_directories() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        call(&gw, "FS: make_directory", json!({"path": "d"}));
        let result = call(&gw, "FS: delete_file", json!({"path": "d"}));
        assert!(result["error"].as_str().unwrap().contains("directory"));
    }
}
