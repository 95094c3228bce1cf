//! # rgpon - GPON OLT session automation
//!
//! `rgpon` drives an interactive command-line session on a GPON OLT over
//! SSH and scrapes the device's terminal output into typed models. The
//! device speaks no structured management protocol: the only interface is a
//! prompt-delimited character stream, arriving in arbitrary chunks, that
//! has to be segmented into login, hostname, and command-output events.
//!
//! ## Features
//!
//! - **Prompt State Machine**: segments the unframed terminal stream into
//!   discrete command results, surviving arbitrary chunk boundaries
//! - **Serialized Scheduler**: strict FIFO execution, exactly one command
//!   in flight, per-command result channels
//! - **Idle Heartbeat**: periodic no-op keepalive, sent only while idle
//! - **Configuration Parsing**: running-config dumps become a bidirectional
//!   VLAN/port membership model; ONU status dumps become per-unit records
//! - **Legacy-Friendly SSH**: algorithm preferences that still negotiate
//!   with aging OLT firmware
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rgpon::config::CredentialStore;
//! use rgpon::session::OltSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CredentialStore::from_path("credentials.json")?;
//!     let session = OltSession::connect("10.1.3.203", &store).await?;
//!     println!("logged into {}", session.hostname());
//!
//!     // One-off command with captured output.
//!     let output = session.handle().run_wait("show version").await?;
//!     println!("{}", output.content);
//!
//!     // Full capture: running config + ONU status, parsed.
//!     let snapshot = session.snapshot().await?;
//!     println!("{} VLANs", snapshot.config.vlan.by_vid.len());
//!     println!("{} ONUs", snapshot.status.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::OltSession`] - Session construction and bootstrap capture
//! - [`session::SessionHandle`] - Command submission surface
//! - [`parse`] - Running-config and ONU status-detail parsers
//! - [`model::ConfigModel`] / [`model::OnuStatusTable`] - Parsed models
//! - [`transport`] - SSH transport and the seam for custom transports
//! - [`error::SessionError`] - Error types

pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod session;
pub mod snapshot;
pub mod transport;
