mod cli;
mod observability;
mod rpc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use serde_json::json;
use skilllite_agent::ToolRegistry;
use skilllite_core::Sandbox;
use std::path::PathBuf;
use std::sync::Arc;

fn build_sandbox(cli: &Cli) -> Sandbox {
    if cli.roots.is_empty() {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Sandbox::new([cwd.clone()], cli.allow_network, Some(cwd))
    } else {
        let roots: Vec<PathBuf> = cli.roots.iter().map(PathBuf::from).collect();
        let workdir = roots.first().cloned();
        Sandbox::new(roots, cli.allow_network, workdir)
    }
}

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();
    let sandbox = Arc::new(build_sandbox(&cli));
    let registry = Arc::new(ToolRegistry::new(Some(sandbox)));

    match cli.command {
        Commands::Serve => rpc::serve_stdio(registry)?,
        Commands::ListTools => {
            let tools: Vec<_> = registry
                .all()
                .map(|d| {
                    json!({
                        "name": d.name,
                        "label": d.label,
                        "description": d.description,
                        "parameter_schema": d.parameter_schema,
                        "read_only": d.read_only,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Commands::Bash { command, timeout_ms } => {
            let tool = registry.get("bash").expect("bash tool is always registered");
            let params = json!({"command": command, "timeout_ms": timeout_ms});
            let runtime = tokio::runtime::Runtime::new()?;
            let (update_tx, _update_rx) = tokio::sync::mpsc::unbounded_channel();
            let result = runtime.block_on((tool.execute)(
                tokio_util::sync::CancellationToken::new(),
                "cli-bash".to_string(),
                params,
                update_tx,
            ))?;
            println!("{}", result.content);
            if result.is_error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
