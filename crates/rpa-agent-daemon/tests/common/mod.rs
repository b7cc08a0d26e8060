//! Mock controller for exercising the agent over a real TCP socket.
//!
//! The controller is the server side of the protocol: it listens, the agent
//! dials in, and tests drive it one line at a time.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rpa_agent_core::UiTreeProvider;
use rpa_agent_daemon::{AgentConfig, ConnectionManager, MockSleeper};

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MockController {
    listener: TcpListener,
}

impl MockController {
    pub fn bind() -> Self {
        Self::from_listener(TcpListener::bind("127.0.0.1:0").expect("bind controller"))
    }

    pub fn from_listener(listener: TcpListener) -> Self {
        listener.set_nonblocking(true).expect("nonblocking listener");
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().expect("local addr").port()
    }

    /// Waits for the agent to dial in.
    pub fn accept(&self) -> ControllerSession {
        self.try_accept(IO_TIMEOUT)
            .expect("agent did not connect in time")
    }

    pub fn try_accept(&self, timeout: Duration) -> Option<ControllerSession> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => return Some(ControllerSession::new(stream)),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("accept failed: {e}"),
            }
        }
    }
}

pub struct ControllerSession {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl ControllerSession {
    fn new(stream: TcpStream) -> Self {
        stream.set_nonblocking(false).expect("blocking stream");
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .expect("read timeout");
        let writer = stream.try_clone().expect("clone stream");
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    pub fn send(&mut self, command: &str) {
        self.writer
            .write_all(format!("{command}\n").as_bytes())
            .expect("send command");
        self.writer.flush().expect("flush command");
    }

    /// Next response line without its newline.
    pub fn recv(&mut self) -> String {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).expect("read response");
        assert!(n > 0, "agent closed the connection");
        line.trim_end_matches('\n').to_string()
    }

    pub fn request(&mut self, command: &str) -> String {
        self.send(command);
        self.recv()
    }

    /// Raw bytes up to and including the `[END]` line.
    pub fn recv_chunked(&mut self) -> String {
        let mut raw = String::new();
        loop {
            let n = self.reader.read_line(&mut raw).expect("read chunk");
            assert!(n > 0, "agent closed the connection mid-transfer");
            if raw == "[END]\n" || raw.ends_with("\n[END]\n") {
                return raw;
            }
        }
    }

    /// True once the agent has closed its side.
    pub fn at_eof(&mut self) -> bool {
        let mut line = String::new();
        matches!(self.reader.read_line(&mut line), Ok(0))
    }

    pub fn close(self) {
        let _ = self.writer.shutdown(std::net::Shutdown::Both);
    }
}

pub fn test_config(port: u16) -> AgentConfig {
    AgentConfig::default()
        .with_host("127.0.0.1")
        .with_port(port)
        .with_reconnect_backoff(Duration::from_millis(100))
        .with_connect_timeout(Duration::from_secs(2))
        .with_chunk_delay(Duration::ZERO)
        .with_workers(2)
        .with_queue_capacity(16)
}

/// An agent running its connection loop on a background thread.
pub struct RunningAgent {
    pub manager: Arc<ConnectionManager>,
    pub sleeper: Arc<MockSleeper>,
    handle: Option<thread::JoinHandle<rpa_agent_daemon::Result<()>>>,
}

impl RunningAgent {
    pub fn start(config: AgentConfig, provider: Arc<dyn UiTreeProvider>) -> Self {
        let sleeper = Arc::new(MockSleeper::new());
        let manager =
            Arc::new(ConnectionManager::new(config, provider).with_sleeper(sleeper.clone()));
        let runner = Arc::clone(&manager);
        let handle = thread::spawn(move || runner.run());
        Self {
            manager,
            sleeper,
            handle: Some(handle),
        }
    }

    /// Shuts the agent down and returns how long `run` took to return.
    pub fn stop(mut self) -> Duration {
        let start = Instant::now();
        self.manager.shutdown();
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .expect("agent thread panicked")
                .expect("agent run failed");
        }
        start.elapsed()
    }
}

impl Drop for RunningAgent {
    fn drop(&mut self) {
        self.manager.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A port nothing is listening on.
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
