//! Error types for OLT session management.
//!
//! This module defines all errors that can occur while loading credentials,
//! establishing the SSH transport, and executing commands through a session.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

use crate::transport::TransportMsg;

/// Errors that can occur during session construction and command execution.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No credential record exists for the requested host.
    ///
    /// This is a construction-time failure: without a password the session
    /// cannot be established, and the caller must not proceed.
    #[error("no credentials for host {0}")]
    MissingCredentials(String),

    /// The transport closed while a command was in flight or queued.
    ///
    /// Every pending command receives this error when the remote shell
    /// exits; the command itself never completed.
    #[error("transport disconnected before command completion")]
    ChannelDisconnect,

    /// The session task has ended and no longer accepts commands.
    #[error("session closed")]
    SessionClosed,

    /// The device did not produce a recognizable prompt during login.
    #[error("timed out waiting for initial prompt")]
    LoginTimeout,

    /// Failed to read the credential file.
    #[error("failed to read credential file: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file is not valid JSON or is missing required fields.
    #[error("invalid credential file: {0}")]
    CredentialParse(#[from] serde_json::Error),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    Russh(#[from] russh::Error),

    /// Failed to send data to the transport task.
    #[error("failed to send data: {0}")]
    SendData(#[from] SendError<TransportMsg>),
}
