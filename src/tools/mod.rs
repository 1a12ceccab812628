// Workbench Gate - Tool Handler Groups
//
// The fixed catalog: filesystem, development, database. Each group
// exposes `specs()` returning its declared tools; the gateway registers
// them under the FS / DEV / DB prefixes at startup.

pub mod db;
pub mod dev;
pub mod fs;

use crate::errors::{GateError, GateResult};
use crate::registry::JsonMap;
use serde_json::Value;

// Typed accessors for validated argument maps. The gateway has already
// checked presence, shape, and defaults; these only unwrap.

pub(crate) fn str_arg<'a>(args: &'a JsonMap, name: &str) -> GateResult<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| GateError::InvalidParameters(format!("missing string parameter '{}'", name)))
}

pub(crate) fn bool_arg(args: &JsonMap, name: &str) -> GateResult<bool> {
    args.get(name)
        .and_then(Value::as_bool)
        .ok_or_else(|| GateError::InvalidParameters(format!("missing boolean parameter '{}'", name)))
}

pub(crate) fn opt_u64_arg(args: &JsonMap, name: &str) -> Option<u64> {
    args.get(name).and_then(Value::as_u64)
}

pub(crate) fn obj_arg<'a>(args: &'a JsonMap, name: &str) -> GateResult<&'a JsonMap> {
    args.get(name)
        .and_then(Value::as_object)
        .ok_or_else(|| GateError::InvalidParameters(format!("missing object parameter '{}'", name)))
}
