use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rpa_agent_core::{serialize_tree, UiTreeProvider, UiTreeSnapshot};
use rpa_agent_daemon::{AgentConfig, ConnectionManager};
use serde_json::json;
use tracing::info;

use crate::error::CliError;
use crate::telemetry::LOG_FILE_ENV;

pub type HandlerResult = Result<(), CliError>;

const ENV_VARS: &[&str] = &[
    "RPA_IP",
    "RPA_PORT",
    "RPA_RECONNECT_BACKOFF_MS",
    "RPA_CONNECT_TIMEOUT_MS",
    "RPA_CHUNK_SIZE",
    "RPA_CHUNK_DELAY_MS",
    "RPA_WORKERS",
    "RPA_QUEUE_CAPACITY",
    "RPA_MAX_LINE_BYTES",
    "RPA_BACK_BUTTON_CLASS",
    LOG_FILE_ENV,
    "RUST_LOG",
];

/// Command-line overrides applied on top of the environment.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tree: Option<PathBuf>,
    pub backoff_ms: Option<u64>,
}

impl RunOptions {
    pub fn apply(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(host) = &self.host {
            config = config.with_host(host.clone());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(ms) = self.backoff_ms {
            config = config.with_reconnect_backoff(Duration::from_millis(ms));
        }
        config
    }
}

pub fn load_provider(tree: Option<&Path>) -> Result<Arc<dyn UiTreeProvider>, CliError> {
    match tree {
        Some(path) => {
            let snapshot = UiTreeSnapshot::from_path(path)?;
            info!(path = %path.display(), nodes = snapshot.len(), "Loaded tree snapshot");
            Ok(Arc::new(snapshot))
        }
        None => Ok(Arc::new(UiTreeSnapshot::empty())),
    }
}

pub fn handle_run(options: RunOptions) -> HandlerResult {
    let config = options.apply(AgentConfig::from_env());
    let provider = load_provider(options.tree.as_deref())?;
    let manager = Arc::new(ConnectionManager::new(config, provider));

    #[cfg(unix)]
    let _signals = rpa_agent_daemon::SignalHandler::setup(manager.clone())?;

    manager.run()?;
    Ok(())
}

pub fn handle_dump(tree: &Path, out: &mut impl Write) -> HandlerResult {
    let snapshot = UiTreeSnapshot::from_path(tree)?;
    let dump = serialize_tree(&snapshot, snapshot.root());
    // Broken pipe on stdout is not worth an error exit
    let _ = out.write_all(dump.as_bytes());
    Ok(())
}

pub fn handle_env(config: &AgentConfig, json: bool, out: &mut impl Write) -> HandlerResult {
    let vars: Vec<(&str, Option<String>)> = ENV_VARS
        .iter()
        .map(|name| (*name, std::env::var(name).ok()))
        .collect();

    if json {
        let environment: serde_json::Map<String, serde_json::Value> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), json!(value)))
            .collect();
        let body = json!({
            "config": {
                "address": config.address(),
                "reconnect_backoff_ms": config.reconnect_backoff.as_millis() as u64,
                "connect_timeout_ms": config.connect_timeout.as_millis() as u64,
                "chunk_size": config.chunk_size,
                "chunk_delay_ms": config.chunk_delay.as_millis() as u64,
                "workers": config.workers,
                "queue_capacity": config.queue_capacity,
                "max_line_bytes": config.max_line_bytes,
                "back_button_class": config.back_button_class,
            },
            "environment": environment,
        });
        let _ = writeln!(out, "{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let _ = writeln!(out, "Effective Configuration:");
    let _ = writeln!(out, "  Controller: {}", config.address());
    let _ = writeln!(out, "  Reconnect backoff: {:?}", config.reconnect_backoff);
    let _ = writeln!(out, "  Connect timeout: {:?}", config.connect_timeout);
    let _ = writeln!(
        out,
        "  Chunking: {} bytes, {:?} pacing",
        config.chunk_size, config.chunk_delay
    );
    let _ = writeln!(
        out,
        "  Workers: {} (queue {})",
        config.workers, config.queue_capacity
    );
    let _ = writeln!(out, "  Max line: {} bytes", config.max_line_bytes);
    let _ = writeln!(out, "  Back button class: {}", config.back_button_class);
    let _ = writeln!(out);
    let _ = writeln!(out, "Environment Variables:");
    for (name, value) in &vars {
        let value = value.as_deref().unwrap_or("(not set)");
        let _ = writeln!(out, "  {}: {}", name, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_options_override_config() {
        let options = RunOptions {
            host: Some("10.1.2.3".to_string()),
            port: Some(4444),
            tree: None,
            backoff_ms: Some(50),
        };
        let config = options.apply(AgentConfig::default());
        assert_eq!(config.address(), "10.1.2.3:4444");
        assert_eq!(config.reconnect_backoff, Duration::from_millis(50));
    }

    #[test]
    fn test_empty_options_keep_config() {
        let base = AgentConfig::default().with_host("example.org").with_port(7);
        let config = RunOptions::default().apply(base);
        assert_eq!(config.address(), "example.org:7");
    }

    #[test]
    fn test_missing_tree_means_no_window() {
        let provider = load_provider(None).unwrap();
        assert!(provider.root().is_none());
    }

    #[test]
    fn test_env_text_lists_config() {
        let config = AgentConfig::default().with_host("10.0.0.9").with_port(9000);
        let mut out = Vec::new();
        handle_env(&config, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Controller: 10.0.0.9:9000"));
        assert!(text.contains("RPA_CHUNK_SIZE"));
    }

    #[test]
    fn test_env_json_is_parseable() {
        let config = AgentConfig::default().with_chunk_size(128);
        let mut out = Vec::new();
        handle_env(&config, true, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["config"]["chunk_size"], 128);
        assert!(value["environment"].get("RPA_IP").is_some());
    }
}
