// Workbench Gate - Library Root
//
// All modules exported here for use by the binary and tests.

pub mod command;
pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod http;
pub mod mcp;
pub mod registry;
pub mod sandbox;
pub mod tools;
