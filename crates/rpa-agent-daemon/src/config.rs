use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_BACK_BUTTON_CLASS: &str = "android.widget.ImageView";
const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 10_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CHUNK_SIZE: usize = 4000;
const DEFAULT_CHUNK_DELAY_MS: u64 = 10;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 128;
const DEFAULT_MAX_LINE_BYTES: usize = 1_048_576; // 1MB

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    pub reconnect_backoff: Duration,
    pub connect_timeout: Duration,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub workers: usize,
    pub queue_capacity: usize,
    pub max_line_bytes: usize,
    pub back_button_class: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reconnect_backoff: Duration::from_millis(DEFAULT_RECONNECT_BACKOFF_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            back_button_class: DEFAULT_BACK_BUTTON_CLASS.to_string(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AgentConfig {
    /// Defaults overridden by any `RPA_*` variable that parses.
    pub fn from_env() -> Self {
        Self {
            host: env::var("RPA_IP")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env_or("RPA_PORT", DEFAULT_PORT),
            reconnect_backoff: Duration::from_millis(env_or(
                "RPA_RECONNECT_BACKOFF_MS",
                DEFAULT_RECONNECT_BACKOFF_MS,
            )),
            connect_timeout: Duration::from_millis(env_or(
                "RPA_CONNECT_TIMEOUT_MS",
                DEFAULT_CONNECT_TIMEOUT_MS,
            )),
            chunk_size: env_or("RPA_CHUNK_SIZE", DEFAULT_CHUNK_SIZE).max(1),
            chunk_delay: Duration::from_millis(env_or("RPA_CHUNK_DELAY_MS", DEFAULT_CHUNK_DELAY_MS)),
            workers: env_or("RPA_WORKERS", DEFAULT_WORKERS).max(1),
            queue_capacity: env_or("RPA_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY).max(1),
            max_line_bytes: env_or("RPA_MAX_LINE_BYTES", DEFAULT_MAX_LINE_BYTES),
            back_button_class: env::var("RPA_BACK_BUTTON_CLASS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BACK_BUTTON_CLASS.to_string()),
        }
    }

    /// `host:port` as handed to the resolver.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    pub fn with_back_button_class(mut self, class_name: impl Into<String>) -> Self {
        self.back_button_class = class_name.into();
        self
    }
}
