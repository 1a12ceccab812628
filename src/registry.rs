// Workbench Gate - Tool Registry
//
// Immutable mapping from qualified tool names to handlers. Built once at
// startup by explicit registration of each handler group under a prefix
// ("FS: read_file") — no runtime introspection, every tool declares its
// parameter schema up front so the gateway can validate before invoking.

use crate::command::CommandRunner;
use crate::config::WorkbenchConfig;
use crate::errors::GateResult;
use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;

pub type JsonMap = serde_json::Map<String, Value>;

/// Shared, read-only context handed to every handler invocation.
pub struct ToolContext {
    pub config: WorkbenchConfig,
    /// Canonicalized workspace root. All sandboxed paths resolve under it.
    pub workspace: PathBuf,
}

impl ToolContext {
    pub fn new(config: WorkbenchConfig, workspace: PathBuf) -> Self {
        Self { config, workspace }
    }

    pub fn db_path(&self) -> PathBuf {
        self.workspace.join(&self.config.db_filename)
    }

    /// Command runner rooted at the workspace.
    pub fn runner(&self) -> CommandRunner {
        CommandRunner::new(&self.workspace)
    }
}

pub type Handler = Box<dyn Fn(&ToolContext, &JsonMap) -> GateResult<Value> + Send + Sync>;

/// Semantic type of one declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Object,
}

impl ParamType {
    /// JSON Schema type name, used in advertised inputSchema.
    pub fn schema_name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
        }
    }

    /// Shape check for a supplied value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// One declared parameter: name, type, required/optional, default.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            required: true,
            default: None,
            description,
        }
    }

    /// Optional parameter with a default filled in when absent.
    pub fn optional(
        name: &'static str,
        param_type: ParamType,
        default: Value,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type,
            required: false,
            default: Some(default),
            description,
        }
    }

    /// Optional parameter with no default — simply absent when unsupplied.
    pub fn opt(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            required: false,
            default: None,
            description,
        }
    }
}

/// An unregistered tool as declared by a handler group.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub handler: Handler,
}

impl ToolSpec {
    pub fn new<F>(
        name: &'static str,
        description: &'static str,
        params: Vec<ParamSpec>,
        handler: F,
    ) -> Self
    where
        F: Fn(&ToolContext, &JsonMap) -> GateResult<Value> + Send + Sync + 'static,
    {
        Self {
            name,
            description,
            params,
            handler: Box::new(handler),
        }
    }
}

/// One registered, invocable capability.
pub struct ToolDescriptor {
    pub qualified_name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    handler: Handler,
}

impl ToolDescriptor {
    pub fn invoke(&self, ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
        (self.handler)(ctx, args)
    }

    /// MCP-style inputSchema for tools/list advertisement.
    pub fn input_schema(&self) -> Value {
        let mut properties = JsonMap::new();
        let mut required: Vec<&str> = Vec::new();
        for param in &self.params {
            let mut prop = json!({
                "type": param.param_type.schema_name(),
                "description": param.description,
            });
            if let Some(ref default) = param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.to_string(), prop);
            if param.required {
                required.push(param.name);
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Process-wide tool table. Built once, read-only thereafter — safe for
/// unsynchronized concurrent reads.
#[derive(Default)]
pub struct ToolRegistry {
    index: HashMap<String, usize>,
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one handler group under a prefix. Qualified names are
    /// "<PREFIX>: <name>". A duplicate name is a startup fault, not a
    /// silent overwrite.
    pub fn register_group(&mut self, prefix: &str, specs: Vec<ToolSpec>) -> Result<()> {
        for spec in specs {
            let qualified_name = format!("{}: {}", prefix, spec.name);
            if self.index.contains_key(&qualified_name) {
                bail!("duplicate tool registration: '{}'", qualified_name);
            }
            let description = if spec.description.trim().is_empty() {
                "No description provided.".to_string()
            } else {
                spec.description.trim().to_string()
            };
            self.index.insert(qualified_name.clone(), self.tools.len());
            self.tools.push(ToolDescriptor {
                qualified_name,
                description,
                params: spec.params,
                handler: spec.handler,
            });
        }
        log::info!("Registered {} group: {} tools total", prefix, self.tools.len());
        Ok(())
    }

    /// Case-sensitive exact-match lookup.
    pub fn lookup(&self, qualified_name: &str) -> Option<&ToolDescriptor> {
        self.index.get(qualified_name).map(|&i| &self.tools[i])
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
