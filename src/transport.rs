//! Terminal transport to the remote shell.
//!
//! A session only needs a bidirectional byte channel: a handle it can write
//! command text to, and an mpsc receiver delivering shell output in
//! arbitrary, non-message-aligned chunks. The receiver closing is the exit
//! signal; no further data arrives after it.
//!
//! [`connect`] provides the real transport: an SSH connection with an
//! interactive PTY-backed shell, bridged to the channel pair by a spawned
//! I/O task. [`TransportHandle::from_channel`] is the seam for plugging in
//! any other transport (or a scripted one in tests).

use std::borrow::Cow;
use std::time::Duration;

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::{Config, ServerCheckMethod};
use log::{debug, trace};
use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{ChannelMsg, Preferred, cipher, compression, kex, mac};
use tokio::sync::mpsc;

use crate::config::HostCredentials;
use crate::error::SessionError;

/// Terminal size requested for the interactive shell.
const TERM_COLS: u32 = 80;
const TERM_ROWS: u32 = 30;

/// A message sent from the session to the transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMsg {
    /// Raw text to write to the remote shell.
    Data(String),
    /// Resize the remote terminal.
    Resize { cols: u32, rows: u32 },
}

/// Write side of a terminal transport.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    tx: mpsc::Sender<TransportMsg>,
}

impl TransportHandle {
    /// Wraps an existing channel sender as a transport handle.
    ///
    /// This is the integration point for transports other than [`connect`]:
    /// anything that consumes [`TransportMsg`] values and produces output
    /// chunks on an `mpsc::Receiver<String>` can back a session.
    pub fn from_channel(tx: mpsc::Sender<TransportMsg>) -> Self {
        Self { tx }
    }

    /// Writes text to the remote shell.
    pub async fn write(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.tx.send(TransportMsg::Data(text.into())).await?;
        Ok(())
    }

    /// Resizes the remote terminal.
    pub async fn resize(&self, cols: u32, rows: u32) -> Result<(), SessionError> {
        self.tx.send(TransportMsg::Resize { cols, rows }).await?;
        Ok(())
    }
}

/// Key exchanges offered, newest first; the tail carries the legacy
/// Diffie-Hellman variants aging OLT firmware frequently still requires.
const OLT_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::DH_G14_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_G1_SHA1,
    kex::DH_GEX_SHA1,
];

/// Host key algorithms offered, including legacy RSA and DSA.
const OLT_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
    Algorithm::Dsa,
];

/// Ciphers offered, including the CBC modes older devices negotiate.
const OLT_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CTR,
    cipher::AES_256_CTR,
    cipher::AES_128_CBC,
    cipher::AES_256_CBC,
];

const OLT_MAC_ALGORITHMS: &[mac::Name] = &[mac::HMAC_SHA256, mac::HMAC_SHA1];

const OLT_COMPRESSION_ALGORITHMS: &[compression::Name] = &[compression::NONE];

/// Algorithm preferences skewed towards what aging OLT firmware offers.
fn legacy_preferred() -> Preferred {
    Preferred {
        kex: Cow::Borrowed(OLT_KEX_ORDER),
        key: Cow::Borrowed(OLT_KEY_TYPES),
        cipher: Cow::Borrowed(OLT_CIPHERS),
        mac: Cow::Borrowed(OLT_MAC_ALGORITHMS),
        compression: Cow::Borrowed(OLT_COMPRESSION_ALGORITHMS),
    }
}

/// Opens an SSH transport to a host with an interactive shell.
///
/// Authenticates with the record's password, requests an `xterm` PTY sized
/// 80x30, and spawns the I/O task bridging the SSH channel to the returned
/// channel pair. When the remote shell exits, the data receiver closes.
pub async fn connect(
    host: &str,
    creds: &HostCredentials,
) -> Result<(TransportHandle, mpsc::Receiver<String>), SessionError> {
    let device_addr = format!("{}@{}:{}", creds.username, host, creds.port);

    let config = Config {
        preferred: legacy_preferred(),
        inactivity_timeout: Some(Duration::from_secs(60)),
        ..Default::default()
    };

    let client = Client::connect_with_config(
        (host.to_string(), creds.port),
        &creds.username,
        AuthMethod::with_password(&creds.password),
        ServerCheckMethod::NoCheck,
        config,
    )
    .await?;
    debug!("{device_addr} TCP connection successful");

    let mut channel = client.get_channel().await?;
    channel
        .request_pty(false, "xterm", TERM_COLS, TERM_ROWS, 0, 0, &[])
        .await?;
    channel.request_shell(false).await?;
    debug!("{device_addr} shell request successful");

    let (out_tx, mut out_rx) = mpsc::channel::<TransportMsg>(256);
    let (data_tx, data_rx) = mpsc::channel::<String>(256);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = out_rx.recv() => {
                    match msg {
                        Some(TransportMsg::Data(data)) => {
                            trace!("{device_addr} write {} bytes", data.len());
                            if let Err(e) = channel.data(data.as_bytes()).await {
                                debug!("{device_addr} failed to send data to shell: {e:?}");
                                break;
                            }
                        }
                        Some(TransportMsg::Resize { cols, rows }) => {
                            if let Err(e) = channel.window_change(cols, rows, 0, 0).await {
                                debug!("{device_addr} failed to resize terminal: {e:?}");
                                break;
                            }
                        }
                        None => {
                            let _ = channel.eof().await;
                            break;
                        }
                    }
                },
                msg = channel.wait() => {
                    match msg {
                        Some(ChannelMsg::Data { ref data }) => {
                            if let Ok(s) = std::str::from_utf8(data)
                                && data_tx.send(s.to_string()).await.is_err() {
                                    debug!("{device_addr} shell output receiver dropped, closing task");
                                    break;
                                }
                        }
                        Some(ChannelMsg::ExitStatus { exit_status }) => {
                            debug!("{device_addr} shell exited with status code: {exit_status}");
                            let _ = channel.eof().await;
                            break;
                        }
                        Some(ChannelMsg::Eof) | None => {
                            debug!("{device_addr} shell closed");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
        debug!("{device_addr} SSH I/O task ended");
    });

    Ok((TransportHandle::from_channel(out_tx), data_rx))
}
