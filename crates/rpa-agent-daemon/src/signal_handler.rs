//! SIGINT/SIGTERM handling that stops the connection loop.

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread::{self, JoinHandle};
use tracing::info;

use crate::error::AgentError;
use crate::shutdown::ShutdownNotifierHandle;

pub struct SignalHandler {
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl SignalHandler {
    /// Notifies `notifier` on the first SIGINT or SIGTERM.
    ///
    /// The handler thread is detached; the process normally exits before it
    /// would need joining.
    pub fn setup(notifier: ShutdownNotifierHandle) -> Result<Self, AgentError> {
        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|e| AgentError::SignalSetup(e.to_string()))?;

        let handle = thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!(signal = sig, "Received signal, disconnecting from controller");
                    notifier.notify();
                }
            })
            .map_err(|e| AgentError::SignalSetup(format!("failed to spawn signal handler: {}", e)))?;

        Ok(Self { handle })
    }
}
