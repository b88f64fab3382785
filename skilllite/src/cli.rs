use clap::{Parser, Subcommand};

/// skilllite - sandboxed tool-execution substrate for a local coding agent
#[derive(Parser, Debug)]
#[command(name = "skilllite")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Sandbox root directory (repeatable). Defaults to the current directory when omitted.
    #[arg(long = "root", global = true, value_name = "DIR")]
    pub roots: Vec<String>,

    /// Allow network-facing tools (webfetch, websearch) to reach the network
    #[arg(long, global = true, default_value = "false")]
    pub allow_network: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the JSON-RPC dispatch loop over stdio (newline-delimited JSON, one request per line)
    Serve,

    /// List registered tools and their parameter schemas as JSON
    ListTools,

    /// Run a single bash command through the policy engine and print its output
    Bash {
        /// The command to execute
        #[arg(value_name = "COMMAND")]
        command: String,

        /// Execution timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}
