//! End-to-end session tests against a scripted device.
//!
//! The session task is driven through the channel seam instead of a real
//! SSH connection: the test plays the device, reading what the session
//! writes and feeding back terminal output in deliberately awkward chunks.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use rgpon::error::SessionError;
use rgpon::session::{self, SessionHandle, SessionOptions};
use rgpon::snapshot;
use rgpon::transport::{TransportHandle, TransportMsg};

const RUNNING_CONFIG: &str = include_str!("fixtures/running_config.txt");
const ONU_DETAIL: &str = include_str!("fixtures/onu_detail_info.txt");

/// The device end of a session: reads session writes, feeds back output.
struct FakeOlt {
    writes: mpsc::Receiver<TransportMsg>,
    data: mpsc::Sender<String>,
}

impl FakeOlt {
    async fn next_write(&mut self) -> String {
        match self.writes.recv().await.expect("session write") {
            TransportMsg::Data(text) => text,
            other => panic!("unexpected transport message: {other:?}"),
        }
    }

    async fn feed(&self, chunk: &str) {
        self.data
            .send(chunk.to_string())
            .await
            .expect("data channel open");
    }

    /// Asserts the next write, then replies with the given output.
    async fn respond(&mut self, expect: &str, reply: &str) {
        assert_eq!(self.next_write().await, expect);
        self.feed(reply).await;
    }
}

fn start(options: SessionOptions) -> (SessionHandle, oneshot::Receiver<String>, FakeOlt) {
    let (write_tx, write_rx) = mpsc::channel(64);
    let (data_tx, data_rx) = mpsc::channel(64);
    let transport = TransportHandle::from_channel(write_tx);
    let (handle, ready) = session::spawn(transport, data_rx, options);
    (
        handle,
        ready,
        FakeOlt {
            writes: write_rx,
            data: data_tx,
        },
    )
}

/// Options with the heartbeat pushed far enough out to stay quiet.
fn quiet() -> SessionOptions {
    SessionOptions {
        password: None,
        heartbeat: Duration::from_secs(600),
    }
}

#[tokio::test]
async fn login_answers_a_chunked_password_prompt() {
    let (_handle, ready, mut olt) = start(SessionOptions {
        password: Some("secret".to_string()),
        ..quiet()
    });

    olt.feed("Warning: unauthorized access is prohibited\r\n").await;
    olt.feed("admin@10.1.3").await;
    olt.feed(".203's password:").await;
    assert_eq!(olt.next_write().await, "secret\r");

    olt.feed("\r\n\r\nOLT>").await;
    assert_eq!(ready.await.expect("ready"), "OLT");
}

#[tokio::test]
async fn commands_execute_in_submission_order() {
    let (handle, ready, mut olt) = start(quiet());
    olt.feed("\r\nOLT>").await;
    ready.await.expect("ready");

    let rx1 = handle.run("show version").await.expect("submit");
    let mut rx2 = handle.run("show clock").await.expect("submit");
    let rx3 = handle.run("show vlan").await.expect("submit");

    // Only the head of the queue is written; the rest wait their turn.
    olt.respond("show version\r", "show version\r\nV5.2\r\nOLT>").await;
    let out1 = rx1.await.expect("resolved").expect("ok");
    assert_eq!(out1.content, "V5.2");
    assert!(rx2.try_recv().is_err());

    olt.respond("show clock\r", "show clock\r\n12:00:00 UTC\r\nOLT>").await;
    let out2 = rx2.await.expect("resolved").expect("ok");
    assert_eq!(out2.content, "12:00:00 UTC");

    olt.respond("show vlan\r", "show vlan\r\nnone\r\nOLT>").await;
    let out3 = rx3.await.expect("resolved").expect("ok");
    assert_eq!(out3.content, "none");
}

#[tokio::test]
async fn output_split_across_chunks_resolves_once_complete() {
    let (handle, ready, mut olt) = start(quiet());
    olt.feed("\r\nOLT>").await;
    ready.await.expect("ready");

    let mut rx = handle.run("show clock").await.expect("submit");
    assert_eq!(olt.next_write().await, "show clock\r");

    olt.feed("show clock\r\n12:00:").await;
    olt.feed("00 UTC\r\nOL").await;
    assert!(rx.try_recv().is_err());

    olt.feed("T>").await;
    let out = rx.await.expect("resolved").expect("ok");
    assert_eq!(out.content, "12:00:00 UTC");
    assert_eq!(out.prompt.raw, "OLT>");
}

#[tokio::test(start_paused = true)]
async fn heartbeat_runs_only_while_idle() {
    let (handle, ready, mut olt) = start(SessionOptions {
        password: None,
        heartbeat: Duration::from_secs(10),
    });
    olt.feed("\r\nOLT>").await;
    ready.await.expect("ready");

    // Idle: the ticker elapses and a bare carriage return goes out.
    assert_eq!(olt.next_write().await, "\r");
    olt.feed("\r\nOLT>").await;

    // A command in flight suppresses the heartbeat entirely.
    let rx = handle.run("show onu info").await.expect("submit");
    assert_eq!(olt.next_write().await, "show onu info\r");
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(olt.writes.try_recv().is_err());

    olt.feed("show onu info\r\nno onus\r\nOLT>").await;
    let out = rx.await.expect("resolved").expect("ok");
    assert_eq!(out.content, "no onus");

    // Idle again: the heartbeat resumes.
    assert_eq!(olt.next_write().await, "\r");
}

#[tokio::test]
async fn transport_exit_fails_pending_commands() {
    let (handle, ready, mut olt) = start(quiet());
    olt.feed("\r\nOLT>").await;
    ready.await.expect("ready");

    let rx1 = handle.run("first").await.expect("submit");
    let rx2 = handle.run("second").await.expect("submit");
    assert_eq!(olt.next_write().await, "first\r");

    drop(olt.data);

    assert!(matches!(
        rx1.await.expect("resolved"),
        Err(SessionError::ChannelDisconnect)
    ));
    assert!(matches!(
        rx2.await.expect("resolved"),
        Err(SessionError::ChannelDisconnect)
    ));

    // The session task is gone; new submissions fail immediately.
    assert!(matches!(
        handle.run("third").await,
        Err(SessionError::SessionClosed)
    ));
}

#[tokio::test]
async fn bootstrap_snapshot_parses_both_dumps() {
    let (handle, ready, mut olt) = start(quiet());
    olt.feed("\r\nOLT>").await;
    ready.await.expect("ready");

    let collect = tokio::spawn({
        let handle = handle.clone();
        async move { snapshot::collect(&handle).await }
    });

    olt.respond("enable\r", "enable\r\nOLT#").await;
    olt.respond("terminal length 0\r", "terminal length 0\r\nOLT#").await;
    olt.respond(
        "show running-config\r",
        &format!("show running-config\r\n{RUNNING_CONFIG}\r\nOLT#"),
    )
    .await;
    olt.respond("conf term\r", "conf term\r\nOLT(config)#").await;
    olt.respond(
        "show onu detail-info\r",
        &format!("show onu detail-info\r\n{ONU_DETAIL}\r\nOLT(config)#"),
    )
    .await;
    olt.respond("exit\r", "exit\r\nOLT#").await;

    let snap = collect.await.expect("task").expect("snapshot");

    let config = &snap.config;
    assert_eq!(config.hostname.as_deref(), Some("OLT"));
    assert_eq!(config.vlan.by_vid[&100].untagged, vec![1, 2]);
    assert_eq!(config.vlan.by_vid[&200].tagged, vec![3]);
    assert_eq!(config.vlan.by_vid[&201].tagged, vec![3]);
    assert_eq!(config.vlan.by_vid[&1].untagged, vec![4]);
    assert_eq!(config.vlan.by_vid[&100].description.as_deref(), Some("Guest"));
    assert_eq!(config.vlan.by_name["Office"], vec![200]);
    assert_eq!(config.ports[&1].pvid, Some(100));
    assert_eq!(config.ports[&2].pvid, Some(100));
    assert_eq!(config.ports[&3].tagged, vec![200, 201]);
    assert_eq!(config.ports[&3].description.as_deref(), Some("uplink to core"));
    assert_eq!(config.ports[&4].untagged, vec![1]);

    let status = &snap.status;
    assert_eq!(status.len(), 2);
    let onu1 = status.get(1, 1).expect("record at (1, 1)");
    assert_eq!(onu1.text("serialNumber"), Some("NOKA12345678"));
    assert_eq!(onu1.text("state"), Some("active"));
    assert_eq!(onu1.text("activatedTime"), Some("32:17:45:32"));
    assert_eq!(onu1.seconds("activatedTime_seconds"), Some(2_828_732));
    assert_eq!(onu1.text("rXPower"), Some("-18.4 dBm"));
    assert_eq!(onu1.text("distancem"), Some("1250"));
    let onu2 = status.get(1, 2).expect("record at (1, 2)");
    assert_eq!(onu2.text("state"), Some("inactive"));
    assert_eq!(onu2.seconds("inactiveTime_seconds"), Some(3_723));
}
