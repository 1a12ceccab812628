// Workbench Gate - Main Entry Point
//
// CLI and MCP stdio server. All tool calls route through the gateway.
// Usage:
//   workbench-gate serve                          # Run MCP server (stdio)
//   workbench-gate http [--host H] [--port P]     # Run HTTP bridge
//   workbench-gate call <tool> [params]           # One-shot tool call
//   workbench-gate tools                          # List registered tools

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use workbench_gate::config::WorkbenchConfig;
use workbench_gate::gateway::{CallRequest, Gateway};
use workbench_gate::registry::JsonMap;
use workbench_gate::{http, mcp};

#[derive(Parser)]
#[command(name = "workbench-gate")]
#[command(version)]
#[command(about = "Sandboxed tool-dispatch gateway - filesystem, SQLite, and dev tools over MCP stdio or HTTP")]
struct Cli {
    /// Config file (JSON). Defaults apply when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workspace root directory (overrides config)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run MCP server (stdio JSON-RPC)
    Serve,

    /// Run the HTTP bridge
    Http {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// One-shot tool call, result printed to stdout
    Call {
        /// Qualified tool name (e.g. "FS: read_file")
        name: String,

        /// Parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,
    },

    /// List registered tools
    Tools,
}

fn main() -> Result<()> {
    // Initialize logging (safe if already init)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WorkbenchConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => WorkbenchConfig::from_env(),
    };
    if let Some(workspace) = &cli.workspace {
        config.workspace_root = workspace.clone();
    }

    match &cli.command {
        Commands::Serve => {
            let gateway = Gateway::new(config).context("Failed to build gateway")?;
            mcp::run(&gateway);
        }

        Commands::Http { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            let gateway = Arc::new(Gateway::new(config).context("Failed to build gateway")?);
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(http::serve(gateway, &host, port))?;
        }

        Commands::Call { name, params } => {
            let params: JsonMap = serde_json::from_str(params)
                .with_context(|| format!("Invalid params JSON: {}", params))?;

            let gateway = Gateway::new(config).context("Failed to build gateway")?;
            let result = gateway.dispatch(&CallRequest::new(name.clone(), params));

            println!("{}", serde_json::to_string_pretty(&result.to_value())?);

            if !result.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Tools => {
            let gateway = Gateway::new(config).context("Failed to build gateway")?;
            for tool in gateway.registry().list() {
                let required: Vec<&str> = tool
                    .params
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name)
                    .collect();
                println!("{:<24} {}", tool.qualified_name, tool.description);
                if !required.is_empty() {
                    println!("{:<24} required: {}", "", required.join(", "));
                }
            }
        }
    }

    Ok(())
}
