//! Fixed-size worker pool that executes commands off the read loop.
//!
//! Commands complete in whatever order their work finishes; each job carries
//! the outbound channel of the connection it arrived on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::dispatcher::{CommandDispatcher, Response};
use crate::shutdown::ShutdownToken;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Job {
    pub id: Uuid,
    pub line: String,
    pub reply: channel::Sender<Response>,
}

impl Job {
    pub fn new(line: String, reply: channel::Sender<Response>) -> Self {
        Self {
            id: Uuid::new_v4(),
            line,
            reply,
        }
    }
}

pub struct WorkerPool {
    workers: Vec<thread::JoinHandle<()>>,
    sender: channel::Sender<Job>,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(
        size: usize,
        capacity: usize,
        dispatcher: Arc<CommandDispatcher>,
        shutdown: ShutdownToken,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = channel::bounded::<Job>(capacity.max(1));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(size);

        for id in 0..size.max(1) {
            let receiver = receiver.clone();
            let dispatcher = Arc::clone(&dispatcher);
            let shutdown = shutdown.clone();
            let in_flight = Arc::clone(&in_flight);

            let handle = match thread::Builder::new()
                .name(format!("command-worker-{}", id))
                .spawn(move || loop {
                    if shutdown.is_triggered() {
                        break;
                    }

                    let job = match receiver.recv_timeout(POLL_INTERVAL) {
                        Ok(job) => job,
                        Err(channel::RecvTimeoutError::Timeout) => continue,
                        Err(channel::RecvTimeoutError::Disconnected) => break,
                    };

                    in_flight.fetch_add(1, Ordering::SeqCst);
                    run_job(&dispatcher, job);
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }) {
                Ok(h) => h,
                Err(e) => {
                    error!(worker_id = id, error = %e, "Failed to spawn worker");
                    continue;
                }
            };

            workers.push(handle);
        }

        if workers.is_empty() {
            return Err(std::io::Error::other("Failed to spawn any worker threads"));
        }

        if workers.len() < size {
            warn!(
                spawned = workers.len(),
                requested = size,
                "Only spawned partial worker threads"
            );
        }

        Ok(WorkerPool {
            workers,
            sender,
            in_flight,
        })
    }

    /// Queues a job without blocking. A full queue hands the job back.
    pub fn execute(&self, job: Job) -> Result<(), Job> {
        self.sender.try_send(job).map_err(|e| match e {
            channel::TrySendError::Full(job) | channel::TrySendError::Disconnected(job) => job,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn run_job(dispatcher: &CommandDispatcher, job: Job) {
    let span = tracing::info_span!("command", id = %job.id);
    let _enter = span.enter();

    debug!(command = %job.line, "Executing command");
    let response = dispatcher.dispatch_line(&job.line);
    if job.reply.send(response).is_err() {
        warn!(command = %job.line, "Connection closed before response could be sent");
    }
}
