#![deny(clippy::all)]

pub mod commands;
pub mod error;
pub mod handlers;
pub mod telemetry;

pub use error::CliError;
pub use handlers::HandlerResult;
pub use handlers::RunOptions;
