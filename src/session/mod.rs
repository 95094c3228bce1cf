//! OLT session management and command execution.
//!
//! A session owns one transport to one device. A spawned task serializes
//! every source of activity — transport data arrivals, command submissions,
//! heartbeat ticks — through a single `select!` loop, so buffer processing
//! and dispatch always run to completion before the next event is handled.
//!
//! # Main Components
//!
//! - [`OltSession`] - Connected session built from a credential store
//! - [`SessionHandle`] - Command submission surface (`run` / `send`)
//! - [`CmdJob`] / [`Output`] - Command execution request and result
//! - [`machine::PromptMachine`] - Prompt-detection state machine
//!
//! Commands are executed in strict submission order, one at a time. Results
//! come back through per-command oneshot channels; a command that was in
//! flight or queued when the transport exits resolves to
//! [`SessionError::ChannelDisconnect`] rather than hanging forever. There is
//! no per-command timeout: a command that never produces a recognizable
//! prompt stalls the scheduler until the transport exits.

use std::time::Duration;

use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::config::CredentialStore;
use crate::error::SessionError;
use crate::snapshot::DeviceSnapshot;
use crate::transport::{self, TransportHandle};

pub mod machine;
mod scheduler;

pub use machine::{MachineEvent, Phase, PromptInfo, PromptMachine, PromptMode};

use machine::MachineEvent as Event;
use scheduler::CommandQueue;

/// How long to wait for the first prompt during construction.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// A command execution request.
pub struct CmdJob {
    /// Command text, written verbatim followed by a carriage return.
    pub command: String,
    /// Oneshot sender resolved with the captured output; `None` for
    /// fire-and-forget commands.
    pub responder: Option<oneshot::Sender<Result<Output, SessionError>>>,
}

/// The result of one completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Captured output, echoed command and surrounding prompt removed.
    pub content: String,
    /// Prompt that terminated the output.
    pub prompt: PromptInfo,
}

/// Tuning knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Password to write when the transport surfaces a password prompt
    /// in-band. `None` for transports that authenticate in-protocol; the
    /// machine then skips the password phase entirely.
    pub password: Option<String>,
    /// Idle heartbeat period.
    pub heartbeat: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            password: None,
            heartbeat: Duration::from_secs(10),
        }
    }
}

/// Command submission surface of a running session.
///
/// Cheap to clone; all clones feed the same serialized queue.
#[derive(Clone)]
pub struct SessionHandle {
    jobs: mpsc::Sender<CmdJob>,
}

impl SessionHandle {
    /// Submits a command and returns the receiver for its result.
    ///
    /// Returns immediately regardless of queue depth; the receiver resolves
    /// once the device prints the next prompt after this command.
    pub async fn run(
        &self,
        command: &str,
    ) -> Result<oneshot::Receiver<Result<Output, SessionError>>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(CmdJob {
                command: command.to_string(),
                responder: Some(tx),
            })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        Ok(rx)
    }

    /// Submits a fire-and-forget command with no result delivery.
    pub async fn send(&self, command: &str) -> Result<(), SessionError> {
        self.jobs
            .send(CmdJob {
                command: command.to_string(),
                responder: None,
            })
            .await
            .map_err(|_| SessionError::SessionClosed)
    }

    /// Submits a command and awaits its output.
    pub async fn run_wait(&self, command: &str) -> Result<Output, SessionError> {
        let rx = self.run(command).await?;
        rx.await.map_err(|_| SessionError::SessionClosed)?
    }
}

/// Spawns a session task over an already-established transport.
///
/// Returns the submission handle and a receiver resolving with the device
/// hostname once the first prompt is seen. The task ends when the transport
/// data channel closes; pending commands then resolve with
/// [`SessionError::ChannelDisconnect`].
pub fn spawn(
    transport: TransportHandle,
    mut data: mpsc::Receiver<String>,
    options: SessionOptions,
) -> (SessionHandle, oneshot::Receiver<String>) {
    let (jobs_tx, mut jobs_rx) = mpsc::channel::<CmdJob>(64);
    let (ready_tx, ready_rx) = oneshot::channel::<String>();

    tokio::spawn(async move {
        let mut machine = PromptMachine::new(options.password.is_some());
        let mut queue = CommandQueue::new();
        let mut ready_tx = Some(ready_tx);
        let mut jobs_open = true;

        let mut ticker = tokio::time::interval(options.heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval is immediate; consume it so the
        // heartbeat starts one full period from now.
        ticker.tick().await;

        loop {
            let write = tokio::select! {
                chunk = data.recv() => {
                    let Some(chunk) = chunk else {
                        debug!("transport exited, failing pending commands");
                        queue.fail_all();
                        break;
                    };
                    let mut writes = Vec::new();
                    for event in machine.feed(&chunk) {
                        match event {
                            Event::SendPassword => {
                                if let Some(password) = &options.password {
                                    writes.push(format!("{password}\r"));
                                }
                            }
                            Event::Ready { hostname } => {
                                if let Some(tx) = ready_tx.take() {
                                    let _ = tx.send(hostname);
                                }
                                writes.extend(queue.start());
                            }
                            Event::CommandFinished { output, prompt } => {
                                writes.extend(queue.complete(output, prompt));
                            }
                        }
                    }
                    writes
                },
                job = jobs_rx.recv(), if jobs_open => {
                    match job {
                        Some(job) => queue.submit(job).into_iter().collect(),
                        None => {
                            // All handles dropped; the session stays alive on
                            // heartbeats until the transport exits.
                            jobs_open = false;
                            Vec::new()
                        }
                    }
                },
                _ = ticker.tick() => queue.heartbeat().into_iter().collect(),
            };

            let mut failed = false;
            for line in write {
                if transport.write(line).await.is_err() {
                    failed = true;
                    break;
                }
            }
            if failed {
                debug!("transport write failed, failing pending commands");
                queue.fail_all();
                break;
            }
        }
    });

    (SessionHandle { jobs: jobs_tx }, ready_rx)
}

/// A connected, logged-in session to one OLT.
pub struct OltSession {
    handle: SessionHandle,
    hostname: String,
}

impl OltSession {
    /// Connects to a host using its credential record.
    ///
    /// Fails if the store has no record for the host, if the SSH transport
    /// cannot be established, or if the device produces no recognizable
    /// prompt within 60 seconds.
    pub async fn connect(host: &str, store: &CredentialStore) -> Result<Self, SessionError> {
        let creds = store
            .host(host)
            .ok_or_else(|| SessionError::MissingCredentials(host.to_string()))?;
        debug!(
            "connecting to {host}:{} as {}",
            creds.port, creds.username
        );

        let (transport, data) = transport::connect(host, creds).await?;
        // SSH authenticates in-protocol, so no in-band password phase.
        let (handle, ready) = spawn(transport, data, SessionOptions::default());

        let hostname = tokio::time::timeout(LOGIN_TIMEOUT, ready)
            .await
            .map_err(|_| SessionError::LoginTimeout)?
            .map_err(|_| SessionError::ChannelDisconnect)?;
        debug!("logged into {hostname}");

        Ok(Self { handle, hostname })
    }

    /// Hostname captured from the device's first prompt.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Command submission handle for this session.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Runs the bootstrap capture sequence and parses both dumps.
    pub async fn snapshot(&self) -> Result<DeviceSnapshot, SessionError> {
        crate::snapshot::collect(&self.handle).await
    }
}
