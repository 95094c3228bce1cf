//! Serialized command scheduler.
//!
//! At most one command is ever in flight; everything else waits in a FIFO
//! queue. The queue itself performs no I/O: each operation returns the text
//! that must be written to the transport, and the session task does the
//! writing. Results are delivered through oneshot responders, at most once
//! per command, and only after the command was actually written and a
//! prompt was matched for it.

use std::collections::VecDeque;

use log::{debug, trace};
use tokio::sync::oneshot;

use crate::error::SessionError;
use crate::session::machine::PromptInfo;
use crate::session::{CmdJob, Output};

struct InFlight {
    command: String,
    responder: Option<oneshot::Sender<Result<Output, SessionError>>>,
}

/// FIFO queue enforcing the one-in-flight invariant.
pub(crate) struct CommandQueue {
    queue: VecDeque<CmdJob>,
    in_flight: Option<InFlight>,
    /// Set once the session reaches Ready; nothing dispatches before that.
    ready: bool,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
            ready: false,
        }
    }

    /// True when the queue is empty and nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.ready && self.in_flight.is_none() && self.queue.is_empty()
    }

    /// Accepts a command. Returns the line to write if it dispatches now.
    pub fn submit(&mut self, job: CmdJob) -> Option<String> {
        if !self.ready || self.in_flight.is_some() {
            trace!("queueing command '{}'", job.command);
            self.queue.push_back(job);
            return None;
        }
        Some(self.dispatch(job))
    }

    /// Marks the session ready and dispatches the queue head, if any.
    pub fn start(&mut self) -> Option<String> {
        self.ready = true;
        let job = self.queue.pop_front()?;
        Some(self.dispatch(job))
    }

    /// Completes the in-flight command with its captured output.
    ///
    /// Resolves the responder (if the command carried one), then dispatches
    /// the next queued command. Returns the next line to write, if any.
    pub fn complete(&mut self, output: String, prompt: PromptInfo) -> Option<String> {
        if let Some(done) = self.in_flight.take() {
            let content = strip_echo(&output, &done.command).to_string();
            if let Some(responder) = done.responder {
                trace!("command '{}' finished", done.command);
                let _ = responder.send(Ok(Output { content, prompt }));
            }
        }

        let job = self.queue.pop_front();
        match job {
            Some(job) => Some(self.dispatch(job)),
            None => {
                debug!("no next command in queue, going idle");
                None
            }
        }
    }

    /// Heartbeat tick: dispatches a blank no-op command, but only when idle.
    pub fn heartbeat(&mut self) -> Option<String> {
        if !self.is_idle() {
            return None;
        }
        debug!("idle heartbeat, sending no-op command");
        Some(self.dispatch(CmdJob {
            command: String::new(),
            responder: None,
        }))
    }

    /// Fails the in-flight command and everything queued behind it.
    ///
    /// Called when the transport exits; each pending responder receives a
    /// disconnect error instead of silently never completing.
    pub fn fail_all(&mut self) {
        if let Some(done) = self.in_flight.take()
            && let Some(responder) = done.responder
        {
            let _ = responder.send(Err(SessionError::ChannelDisconnect));
        }
        for job in self.queue.drain(..) {
            if let Some(responder) = job.responder {
                let _ = responder.send(Err(SessionError::ChannelDisconnect));
            }
        }
    }

    fn dispatch(&mut self, job: CmdJob) -> String {
        trace!("dispatching command '{}'", job.command);
        let line = format!("{}\r", job.command);
        self.in_flight = Some(InFlight {
            command: job.command,
            responder: job.responder,
        });
        line
    }
}

/// Removes the echoed command from the head of captured output.
fn strip_echo<'a>(output: &'a str, command: &str) -> &'a str {
    if command.is_empty() {
        return output;
    }
    match output.strip_prefix(command) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']),
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::CommandQueue;
    use crate::error::SessionError;
    use crate::session::machine::{PromptInfo, PromptMode};
    use crate::session::CmdJob;
    use tokio::sync::oneshot;

    fn prompt() -> PromptInfo {
        PromptInfo {
            hostname: "OLT".to_string(),
            submode: String::new(),
            mode: PromptMode::User,
            raw: "OLT>".to_string(),
        }
    }

    fn job(command: &str) -> (CmdJob, oneshot::Receiver<Result<crate::session::Output, SessionError>>) {
        let (tx, rx) = oneshot::channel();
        (
            CmdJob {
                command: command.to_string(),
                responder: Some(tx),
            },
            rx,
        )
    }

    #[test]
    fn nothing_dispatches_before_ready() {
        let mut queue = CommandQueue::new();
        let (j, _rx) = job("show version");

        assert_eq!(queue.submit(j), None);
        assert_eq!(queue.start(), Some("show version\r".to_string()));
    }

    #[test]
    fn only_one_command_is_in_flight() {
        let mut queue = CommandQueue::new();
        queue.start();

        let (first, _rx1) = job("first");
        let (second, _rx2) = job("second");
        assert_eq!(queue.submit(first), Some("first\r".to_string()));
        assert_eq!(queue.submit(second), None);
    }

    #[test]
    fn completion_resolves_in_submission_order_exactly_once() {
        let mut queue = CommandQueue::new();
        queue.start();

        let (first, mut rx1) = job("first");
        let (second, mut rx2) = job("second");
        let (third, mut rx3) = job("third");
        queue.submit(first);
        queue.submit(second);
        queue.submit(third);

        assert!(rx1.try_recv().is_err());

        let next = queue.complete("first\r\nout-1".to_string(), prompt());
        assert_eq!(next, Some("second\r".to_string()));
        assert_eq!(rx1.try_recv().expect("first resolved").expect("ok").content, "out-1");
        assert!(rx2.try_recv().is_err());

        let next = queue.complete("second\r\nout-2".to_string(), prompt());
        assert_eq!(next, Some("third\r".to_string()));
        assert_eq!(rx2.try_recv().expect("second resolved").expect("ok").content, "out-2");

        let next = queue.complete("third\r\nout-3".to_string(), prompt());
        assert_eq!(next, None);
        assert_eq!(rx3.try_recv().expect("third resolved").expect("ok").content, "out-3");
        assert!(queue.is_idle());
    }

    #[test]
    fn heartbeat_fires_only_when_idle() {
        let mut queue = CommandQueue::new();

        // Not ready yet: no heartbeat.
        assert_eq!(queue.heartbeat(), None);

        queue.start();
        assert_eq!(queue.heartbeat(), Some("\r".to_string()));

        // The no-op is now in flight: no further heartbeat this cycle.
        assert_eq!(queue.heartbeat(), None);

        queue.complete(String::new(), prompt());
        assert_eq!(queue.heartbeat(), Some("\r".to_string()));
    }

    #[test]
    fn command_without_responder_completes_silently() {
        let mut queue = CommandQueue::new();
        queue.start();

        queue.submit(CmdJob {
            command: "terminal length 0".to_string(),
            responder: None,
        });
        assert_eq!(queue.complete("terminal length 0".to_string(), prompt()), None);
        assert!(queue.is_idle());
    }

    #[test]
    fn echoed_command_is_stripped_from_output() {
        let mut queue = CommandQueue::new();
        queue.start();

        let (j, mut rx) = job("show clock");
        queue.submit(j);
        queue.complete("show clock\r\n12:00:00 UTC".to_string(), prompt());

        let output = rx.try_recv().expect("resolved").expect("ok");
        assert_eq!(output.content, "12:00:00 UTC");
        assert_eq!(output.prompt.raw, "OLT>");
    }

    #[test]
    fn disconnect_fails_in_flight_and_queued_commands() {
        let mut queue = CommandQueue::new();
        queue.start();

        let (first, mut rx1) = job("first");
        let (second, mut rx2) = job("second");
        queue.submit(first);
        queue.submit(second);

        queue.fail_all();

        assert!(matches!(
            rx1.try_recv().expect("first resolved"),
            Err(SessionError::ChannelDisconnect)
        ));
        assert!(matches!(
            rx2.try_recv().expect("second resolved"),
            Err(SessionError::ChannelDisconnect)
        ));
    }

    #[test]
    fn spurious_prompt_with_nothing_in_flight_is_harmless() {
        let mut queue = CommandQueue::new();
        queue.start();
        assert_eq!(queue.complete("noise".to_string(), prompt()), None);
        assert!(queue.is_idle());
    }
}
