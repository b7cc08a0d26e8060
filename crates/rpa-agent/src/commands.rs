use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

const LONG_ABOUT: &str = r#"rpa-agent connects out to a controller and executes UI automation commands.

The agent dials the controller's TCP address, reads one command per line and
answers each one on the same connection. When the connection drops it waits
for the backoff interval and dials again, until interrupted.

COMMANDS ON THE WIRE:
    ping                  Liveness check, answered with "pong" while a window is active
    goHome, goBack        Global navigation actions
    showRecents           Open the recent apps overview
    scrollUp, scrollDown  Scroll the first scrollable node
    getFullUI             Dump the UI tree (chunked, terminated by [END])
    clickBackButton       Click the first clickable back button
    <anything else>       Click the node whose text equals the line

EXAMPLES:
    # Serve a saved tree to a controller on another machine
    rpa-agent run --host 10.0.0.5 --port 12345 --tree screen.json

    # Inspect what getFullUI would send for a snapshot
    rpa-agent dump --tree screen.json"#;

#[derive(Parser)]
#[command(name = "rpa-agent")]
#[command(author, version)]
#[command(about = "Remote-controlled UI automation agent")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON where supported
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect to the controller and serve commands until interrupted
    Run {
        /// Controller host name or IP address
        #[arg(long, env = "RPA_IP")]
        host: Option<String>,

        /// Controller TCP port
        #[arg(short, long, env = "RPA_PORT")]
        port: Option<u16>,

        /// JSON tree snapshot to serve (default: no active window)
        #[arg(short, long)]
        tree: Option<PathBuf>,

        /// Delay between reconnect attempts in milliseconds
        #[arg(long, env = "RPA_RECONNECT_BACKOFF_MS")]
        backoff_ms: Option<u64>,
    },

    /// Print the full-tree serialization of a JSON snapshot
    Dump {
        /// JSON tree snapshot to read
        #[arg(short, long)]
        tree: PathBuf,
    },

    /// Show the effective configuration
    Env,
}
