//! Prompt-detection state machine.
//!
//! The remote shell has no message framing: output arrives in chunks of
//! arbitrary size, and the only delimiter is a recognizable prompt. The
//! machine accumulates every chunk into one buffer and, on each arrival,
//! searches the whole buffer for the pattern its current phase expects,
//! consuming exactly the portion up to and including a match so that a
//! prompt split across chunks is neither lost nor counted twice.

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `<user>@<host>'s password:` as printed by the login process.
static PASSWORD_PROMPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9A-Za-z_.-]+@[0-9A-Za-z_.:-]+'s password:").expect("valid password regex")
});

/// First prompt after login, anywhere in the buffer.
static FIRST_PROMPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<hostname>[A-Za-z][0-9A-Za-z_]*)[>#]").expect("valid first prompt regex")
});

/// Prompt at the end of command output, anchored to a newline.
static READY_PROMPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n(?P<hostname>[A-Za-z][0-9A-Za-z_]*)(?P<submode>[A-Za-z()\[\]-]*)(?P<term>[>#])")
        .expect("valid ready prompt regex")
});

/// Connection phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the transport to ask for a password.
    AwaitingPassword,
    /// Logged in, waiting for the first shell prompt.
    AwaitingHostname,
    /// Prompt seen; command output is now segmented prompt-to-prompt.
    Ready,
}

/// Mode indicated by the prompt terminator character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// `>` terminator.
    User,
    /// `#` terminator.
    Privileged,
}

/// Components of the most recently matched prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PromptInfo {
    /// Hostname token of the prompt.
    pub hostname: String,
    /// Submode token, e.g. `(config)`; empty outside submodes.
    pub submode: String,
    /// Mode implied by the terminator character.
    pub mode: PromptMode,
    /// The raw matched prompt text, trimmed.
    pub raw: String,
}

/// An event recognized in the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    /// A password prompt was consumed; the caller must write the password.
    SendPassword,
    /// The first shell prompt was consumed; the session is ready.
    Ready { hostname: String },
    /// A prompt terminated the in-flight command's output.
    CommandFinished { output: String, prompt: PromptInfo },
}

/// Accumulating prompt detector. Pure with respect to I/O: it only consumes
/// text and emits events; writing the password or dispatching commands is
/// the session task's job.
pub struct PromptMachine {
    phase: Phase,
    buffer: String,
    hostname: Option<String>,
    prompt: Option<PromptInfo>,
}

impl PromptMachine {
    /// Creates a machine in the initial phase.
    ///
    /// Transports that surface the login password prompt in-band (a spawned
    /// `ssh` child on a PTY) start at [`Phase::AwaitingPassword`]; transports
    /// that authenticate inside their own protocol never print one, so they
    /// start at [`Phase::AwaitingHostname`].
    pub fn new(expect_password_prompt: bool) -> Self {
        Self {
            phase: if expect_password_prompt {
                Phase::AwaitingPassword
            } else {
                Phase::AwaitingHostname
            },
            buffer: String::new(),
            hostname: None,
            prompt: None,
        }
    }

    /// Current connection phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Hostname captured from the first prompt, once known.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Most recently matched prompt descriptor.
    pub fn prompt(&self) -> Option<&PromptInfo> {
        self.prompt.as_ref()
    }

    /// Feeds one chunk of transport data and returns the events it completed.
    ///
    /// A single chunk may complete several transitions (for example the tail
    /// of one command's output plus the whole of the next), so detection
    /// loops until the buffer holds no further match.
    pub fn feed(&mut self, chunk: &str) -> Vec<MachineEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        loop {
            match self.phase {
                Phase::AwaitingPassword => {
                    let Some(end) = PASSWORD_PROMPT_RE.find(&self.buffer).map(|m| m.end()) else {
                        break;
                    };
                    self.buffer.drain(..end);
                    self.phase = Phase::AwaitingHostname;
                    debug!("password prompt seen");
                    events.push(MachineEvent::SendPassword);
                }
                Phase::AwaitingHostname => {
                    let Some((hostname, end)) = FIRST_PROMPT_RE
                        .captures(&self.buffer)
                        .and_then(|caps| {
                            let whole = caps.get(0)?;
                            Some((caps["hostname"].to_string(), whole.end()))
                        })
                    else {
                        break;
                    };
                    self.buffer.drain(..end);
                    self.phase = Phase::Ready;
                    debug!("hostname is {hostname}");
                    self.hostname = Some(hostname.clone());
                    events.push(MachineEvent::Ready { hostname });
                }
                Phase::Ready => {
                    let Some((prompt, start, end)) = READY_PROMPT_RE
                        .captures(&self.buffer)
                        .and_then(|caps| {
                            let whole = caps.get(0)?;
                            let mode = match caps.name("term")?.as_str() {
                                "#" => PromptMode::Privileged,
                                _ => PromptMode::User,
                            };
                            let prompt = PromptInfo {
                                hostname: caps["hostname"].to_string(),
                                submode: caps["submode"].to_string(),
                                mode,
                                raw: whole.as_str().trim().to_string(),
                            };
                            Some((prompt, whole.start(), whole.end()))
                        })
                    else {
                        break;
                    };
                    let output = self.buffer[..start].trim().to_string();
                    self.buffer.drain(..end);
                    trace!("prompt matched: {:?}", prompt.raw);
                    self.prompt = Some(prompt.clone());
                    events.push(MachineEvent::CommandFinished { output, prompt });
                }
            }
        }

        events
    }
}
