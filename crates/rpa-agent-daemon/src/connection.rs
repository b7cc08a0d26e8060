//! Controller connection lifecycle.
//!
//! One thread owns connect, read and reconnect. Every received line becomes a
//! job on the worker pool; responses come back over a per-connection channel
//! drained by a single writer thread, so concurrent replies and chunked
//! transfers never interleave on the wire. Any I/O failure tears the whole
//! socket down, waits out the backoff and dials again until `shutdown`.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;
use rpa_agent_core::UiTreeProvider;
use tracing::{debug, error, info, warn};

use crate::chunked::ChunkedTransport;
use crate::config::AgentConfig;
use crate::dispatcher::{CommandDispatcher, Response};
use crate::error::{AgentError, TransportError};
use crate::pool::{Job, WorkerPool};
use crate::shutdown::{ShutdownNotifier, ShutdownToken};
use crate::sleeper::Sleeper;
use crate::sync::mutex_lock_or_recover;
use crate::transport::LineReader;

const WRITER_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct ConnectionManager {
    config: AgentConfig,
    dispatcher: Arc<CommandDispatcher>,
    transport: ChunkedTransport,
    shutdown: ShutdownToken,
    state: Mutex<ConnectionState>,
    state_changed: Condvar,
    active: Mutex<Option<TcpStream>>,
    open_sockets: AtomicUsize,
    running: AtomicBool,
}

impl ConnectionManager {
    pub fn new(config: AgentConfig, provider: Arc<dyn UiTreeProvider>) -> Self {
        let dispatcher = CommandDispatcher::new(provider)
            .with_back_button_class(config.back_button_class.clone());
        let transport = ChunkedTransport::new(config.chunk_size, config.chunk_delay);
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            transport,
            shutdown: ShutdownToken::new(),
            state: Mutex::new(ConnectionState::Disconnected),
            state_changed: Condvar::new(),
            active: Mutex::new(None),
            open_sockets: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.transport = self.transport.with_sleeper(sleeper);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *mutex_lock_or_recover(&self.state)
    }

    /// Blocks until the state equals `target` or `timeout` elapses.
    pub fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = mutex_lock_or_recover(&self.state);
        while *state != target {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = match self.state_changed.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    /// Sockets currently held open. Never exceeds one.
    pub fn open_sockets(&self) -> usize {
        self.open_sockets.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the reconnect loop and closes the active socket.
    ///
    /// A connect attempt already in progress finishes (bounded by the connect
    /// timeout) before the loop observes the request.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.trigger();
        if let Some(stream) = mutex_lock_or_recover(&self.active).as_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Runs the connect/read/reconnect loop until `shutdown` is called.
    ///
    /// Only startup failures are returned; connection failures are retried
    /// forever.
    pub fn run(&self) -> Result<(), AgentError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(AgentError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        let address = self.config.address();
        self.resolve().map_err(|reason| AgentError::InvalidAddress {
            address: address.clone(),
            reason,
        })?;

        let pool = WorkerPool::new(
            self.config.workers,
            self.config.queue_capacity,
            Arc::clone(&self.dispatcher),
            self.shutdown.clone(),
        )
        .map_err(|e| AgentError::ThreadPool(e.to_string()))?;

        info!(
            address = %address,
            workers = pool.size(),
            backoff_ms = self.config.reconnect_backoff.as_millis() as u64,
            "Agent started"
        );

        while !self.shutdown.is_triggered() {
            self.set_state(ConnectionState::Connecting);
            match self.connect() {
                Ok(stream) => {
                    info!(address = %address, "Connected to controller");
                    self.set_state(ConnectionState::Connected);
                    match self.serve(stream, &pool) {
                        Ok(()) => info!("Controller closed the connection"),
                        Err(_) if self.shutdown.is_triggered() => {}
                        Err(e) => warn!(error = %e, "Connection lost"),
                    }
                }
                Err(e) => warn!(error = %e, "Connection attempt failed"),
            }
            self.set_state(ConnectionState::Disconnected);

            if self.shutdown.wait_timeout(self.config.reconnect_backoff) {
                break;
            }
            debug!("Reconnecting");
        }

        self.set_state(ConnectionState::Disconnected);
        pool.shutdown();
        info!("Agent stopped");
        Ok(())
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = mutex_lock_or_recover(&self.state);
        if *state != next {
            debug!(from = ?*state, to = ?next, "Connection state changed");
            *state = next;
            self.state_changed.notify_all();
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, String> {
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| e.to_string())?
            .collect();
        if addrs.is_empty() {
            return Err("host resolved to no addresses".to_string());
        }
        Ok(addrs)
    }

    fn connect(&self) -> Result<TcpStream, AgentError> {
        let address = self.config.address();
        let addrs = self.resolve().map_err(|reason| AgentError::InvalidAddress {
            address: address.clone(),
            reason,
        })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(AgentError::Connect {
            address,
            source: last_error.unwrap_or_else(|| std::io::Error::other("no addresses to try")),
        })
    }

    fn serve(&self, stream: TcpStream, pool: &WorkerPool) -> Result<(), TransportError> {
        let _socket = SocketGuard::register(self, &stream)?;
        if self.shutdown.is_triggered() {
            return Ok(());
        }

        let read_half = stream.try_clone()?;
        let write_half = stream;
        let (reply_tx, reply_rx) = channel::unbounded::<Response>();
        let done = AtomicBool::new(false);

        thread::scope(|scope| -> Result<(), TransportError> {
            let writer = thread::Builder::new()
                .name("controller-writer".to_string())
                .spawn_scoped(scope, || self.write_loop(write_half, reply_rx, &done))?;

            let result = self.read_loop(read_half, &reply_tx, pool);
            drop(reply_tx);
            done.store(true, Ordering::SeqCst);

            if writer.join().is_err() {
                error!("Writer thread panicked");
            }
            result
        })
    }

    fn read_loop(
        &self,
        stream: TcpStream,
        replies: &channel::Sender<Response>,
        pool: &WorkerPool,
    ) -> Result<(), TransportError> {
        let mut reader = LineReader::new(BufReader::new(stream), self.config.max_line_bytes);

        while let Some(line) = reader.read_line()? {
            if self.shutdown.is_triggered() {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            debug!(command = %line, in_flight = pool.in_flight(), "Received command");
            if let Err(job) = pool.execute(Job::new(line, replies.clone())) {
                warn!(command = %job.line, "Worker queue full, dropping command");
                let busy = Response::line(format!("Agent busy, dropped command: {}", job.line));
                let _ = replies.send(busy);
            }
        }
        Ok(())
    }

    fn write_loop(&self, stream: TcpStream, replies: channel::Receiver<Response>, done: &AtomicBool) {
        let mut writer = BufWriter::new(stream);
        loop {
            let response = match replies.recv_timeout(WRITER_POLL_INTERVAL) {
                Ok(response) => response,
                Err(channel::RecvTimeoutError::Timeout) => {
                    if done.load(Ordering::SeqCst) {
                        break;
                    }
                    continue;
                }
                Err(channel::RecvTimeoutError::Disconnected) => break,
            };

            if let Err(e) = self.write_response(&mut writer, &response) {
                warn!(error = %e, "Failed to write response, closing connection");
                let _ = writer.get_ref().shutdown(Shutdown::Both);
                break;
            }
        }
    }

    fn write_response(
        &self,
        writer: &mut BufWriter<TcpStream>,
        response: &Response,
    ) -> Result<(), TransportError> {
        match response {
            Response::Line(text) => {
                writer.write_all(text.as_bytes())?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
            Response::Chunked(text) => {
                writer.flush()?;
                let chunks = self.transport.send(writer.get_mut(), text)?;
                debug!(chunks, bytes = text.len(), "Sent chunked response");
            }
        }
        Ok(())
    }
}

impl ShutdownNotifier for ConnectionManager {
    fn notify(&self) {
        self.shutdown();
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Publishes the socket for `shutdown` and closes it on every exit path.
struct SocketGuard<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> SocketGuard<'a> {
    fn register(manager: &'a ConnectionManager, stream: &TcpStream) -> std::io::Result<Self> {
        let handle = stream.try_clone()?;
        *mutex_lock_or_recover(&manager.active) = Some(handle);
        manager.open_sockets.fetch_add(1, Ordering::SeqCst);
        Ok(Self { manager })
    }
}

impl Drop for SocketGuard<'_> {
    fn drop(&mut self) {
        if let Some(stream) = mutex_lock_or_recover(&self.manager.active).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.manager.open_sockets.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpa_agent_core::UiTreeSnapshot;

    fn manager(config: AgentConfig) -> ConnectionManager {
        ConnectionManager::new(config, Arc::new(UiTreeSnapshot::empty()))
    }

    #[test]
    fn test_initial_state() {
        let manager = manager(AgentConfig::default());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.open_sockets(), 0);
        assert!(!manager.is_running());
        assert!(!manager.is_shutdown());
    }

    #[test]
    fn test_wait_for_current_state_returns_immediately() {
        let manager = manager(AgentConfig::default());
        assert!(manager.wait_for_state(ConnectionState::Disconnected, Duration::ZERO));
        assert!(!manager.wait_for_state(ConnectionState::Connected, Duration::from_millis(10)));
    }

    #[test]
    fn test_unresolvable_host_is_rejected_at_startup() {
        let config = AgentConfig::default().with_host("not a host name");
        let manager = manager(config);
        let err = manager.run().unwrap_err();
        assert!(matches!(err, AgentError::InvalidAddress { .. }));
        assert_eq!(err.exit_code(), 64);
        assert!(!manager.is_running());
    }

    #[test]
    fn test_run_after_shutdown_returns_promptly() {
        let manager = manager(AgentConfig::default().with_port(1));
        manager.shutdown();
        let start = Instant::now();
        manager.run().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_notifier_triggers_shutdown() {
        let manager = manager(AgentConfig::default());
        manager.notify();
        assert!(manager.is_shutdown());
    }
}
