// Workbench Gate - Dispatch Gateway
//
// The single entry point transports call into. Looks the tool up,
// validates parameters against its declared schema, invokes the handler,
// and normalizes the outcome. Every handler fault is caught here and
// converted to a failure descriptor — one bad call never takes down the
// server or affects another call.

use crate::config::WorkbenchConfig;
use crate::errors::GateError;
use crate::registry::{JsonMap, ToolContext, ToolDescriptor, ToolRegistry};
use crate::tools;
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};

/// One tool invocation as received from a transport.
#[derive(Debug, Clone, Deserialize)]
pub struct CallRequest {
    #[serde(rename = "name")]
    pub tool_name: String,
    #[serde(default)]
    pub params: JsonMap,
}

impl CallRequest {
    pub fn new(tool_name: impl Into<String>, params: JsonMap) -> Self {
        Self {
            tool_name: tool_name.into(),
            params,
        }
    }
}

/// Outcome of one dispatch: a success payload or exactly one failure.
/// The serialized form carries an "error" field if and only if the call
/// failed — that field is the sole success/failure discriminant.
#[derive(Debug)]
pub enum CallResult {
    Success(Value),
    Failure(GateError),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    pub fn error(&self) -> Option<&GateError> {
        match self {
            CallResult::Success(_) => None,
            CallResult::Failure(e) => Some(e),
        }
    }

    /// Wire shape: the handler payload unchanged, or {"error": message}.
    pub fn to_value(&self) -> Value {
        match self {
            CallResult::Success(payload) => payload.clone(),
            CallResult::Failure(e) => json!({ "error": e.to_string() }),
        }
    }
}

/// Registry plus context, wired once at startup.
pub struct Gateway {
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl Gateway {
    /// Build the full gateway: ensure the workspace exists, then register
    /// the fixed handler groups. Registration order is presentation order.
    pub fn new(config: WorkbenchConfig) -> Result<Self> {
        let workspace = config.ensure_workspace()?;
        let ctx = ToolContext::new(config, workspace);

        let mut registry = ToolRegistry::new();
        registry.register_group("FS", tools::fs::specs())?;
        registry.register_group("DEV", tools::dev::specs())?;
        registry.register_group("DB", tools::db::specs())?;

        Ok(Self { registry, ctx })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn ctx(&self) -> &ToolContext {
        &self.ctx
    }

    /// RECEIVED → VALIDATED → EXECUTING → SUCCEEDED | FAILED.
    /// No retries, no partial invocation: validation failures return
    /// before the handler runs at all.
    pub fn dispatch(&self, request: &CallRequest) -> CallResult {
        let descriptor = match self.registry.lookup(&request.tool_name) {
            Some(d) => d,
            None => {
                log::debug!("dispatch: unknown tool '{}'", request.tool_name);
                return CallResult::Failure(GateError::ToolNotFound(request.tool_name.clone()));
            }
        };

        let args = match validate_params(descriptor, &request.params) {
            Ok(args) => args,
            Err(e) => return CallResult::Failure(e),
        };

        log::debug!("dispatch: invoking '{}'", descriptor.qualified_name);
        match descriptor.invoke(&self.ctx, &args) {
            Ok(payload) => CallResult::Success(payload),
            Err(e) => {
                log::warn!(
                    "dispatch: '{}' failed ({}): {}",
                    descriptor.qualified_name,
                    e.kind(),
                    e
                );
                CallResult::Failure(e)
            }
        }
    }
}

/// Check supplied parameters against the declared schema and produce the
/// validated argument map: required present, no unknown names, shapes
/// plausible, defaults filled. All offending fields are reported in one
/// error; the handler is never partially invoked.
fn validate_params(descriptor: &ToolDescriptor, supplied: &JsonMap) -> Result<JsonMap, GateError> {
    let mut problems: Vec<String> = Vec::new();
    let mut validated = JsonMap::new();

    for param in &descriptor.params {
        match supplied.get(param.name) {
            Some(value) => {
                if param.param_type.matches(value) {
                    validated.insert(param.name.to_string(), value.clone());
                } else {
                    problems.push(format!(
                        "'{}' must be a {}",
                        param.name,
                        param.param_type.schema_name()
                    ));
                }
            }
            None => {
                if param.required {
                    problems.push(format!("missing required parameter '{}'", param.name));
                } else if let Some(ref default) = param.default {
                    validated.insert(param.name.to_string(), default.clone());
                }
            }
        }
    }

    for name in supplied.keys() {
        if !descriptor.params.iter().any(|p| p.name == name) {
            problems.push(format!("unknown parameter '{}'", name));
        }
    }

    if problems.is_empty() {
        Ok(validated)
    } else {
        Err(GateError::InvalidParameters(problems.join("; ")))
    }
}

// ============================================================================
// TESTS
// ============================================================================
