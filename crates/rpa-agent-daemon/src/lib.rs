#![deny(clippy::all)]

mod chunked;
mod command;
mod config;
mod connection;
mod dispatcher;
mod error;
mod pool;
mod shutdown;
#[cfg(unix)]
mod signal_handler;
mod sleeper;
mod sync;
mod transport;

pub use chunked::split_chunks;
pub use chunked::ChunkedTransport;
pub use chunked::END_SENTINEL;
pub use command::Command;
pub use command::ScrollDirection;
pub use config::AgentConfig;
pub use config::DEFAULT_BACK_BUTTON_CLASS;
pub use config::DEFAULT_HOST;
pub use config::DEFAULT_PORT;
pub use connection::ConnectionManager;
pub use connection::ConnectionState;
pub use dispatcher::CommandDispatcher;
pub use dispatcher::Response;
pub use dispatcher::BACK_BUTTON_CLICKED;
pub use dispatcher::BACK_BUTTON_NOT_FOUND;
pub use dispatcher::NO_ACTIVE_WINDOW;
pub use dispatcher::NO_SCROLLABLE_NODE;
pub use error::AgentError;
pub use error::TransportError;
pub use shutdown::ShutdownNotifier;
pub use shutdown::ShutdownNotifierHandle;
pub use shutdown::ShutdownToken;
#[cfg(unix)]
pub use signal_handler::SignalHandler;
pub use sleeper::MockSleeper;
pub use sleeper::RealSleeper;
pub use sleeper::Sleeper;

pub type Result<T> = std::result::Result<T, AgentError>;
