use clap::Parser;

use rpa_agent::commands::Cli;
use rpa_agent::commands::Commands;
use rpa_agent::handlers;
use rpa_agent::telemetry::init_tracing;
use rpa_agent::CliError;
use rpa_agent::RunOptions;
use rpa_agent_daemon::AgentConfig;

fn main() {
    let telemetry = init_tracing("info");

    if let Err(e) = run() {
        drop(telemetry);
        eprintln!("Error: {}", e);
        eprintln!("Suggestion: {}", e.suggestion());
        if e.is_retryable() {
            eprintln!("(This error may be transient - retry may succeed)");
        }
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            host,
            port,
            tree,
            backoff_ms,
        } => handlers::handle_run(RunOptions {
            host,
            port,
            tree,
            backoff_ms,
        })?,
        Commands::Dump { tree } => handlers::handle_dump(&tree, &mut std::io::stdout().lock())?,
        Commands::Env => handlers::handle_env(
            &AgentConfig::from_env(),
            cli.json,
            &mut std::io::stdout().lock(),
        )?,
    }

    Ok(())
}
