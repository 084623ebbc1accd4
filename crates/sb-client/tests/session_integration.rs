//! Session, dispatcher and batch integration tests
//!
//! Drives the full client stack over the in-memory loopback channel with a
//! counting fallback service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use sb_client::{
    BatchCoordinator, BatchJob, Channel, Dispatcher, ExecutionService, MemoryChannel, Session,
};
use sb_core::error::{ChannelError, RemoteError};
use sb_core::{BatchError, CappedHistory, DispatchError, ExecutionMode};
use sb_protocol::{ClientMessage, Server, ServerId, ServerMessage, ServerType};

/// Fallback service that counts calls and returns a fixed response
struct CountingExec {
    calls: AtomicUsize,
    response: Result<String, RemoteError>,
}

impl CountingExec {
    fn ok(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: Ok(message.to_string()),
        })
    }

    fn failing(error: RemoteError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: Err(error),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionService for CountingExec {
    async fn execute(&self, _server_id: ServerId, _command: &str) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

fn server(id: u64, status: bool) -> Server {
    Server {
        id: ServerId(id),
        name: format!("srv-{}", id),
        host: "10.0.0.1".to_string(),
        port: 9000,
        server_type: ServerType::Api,
        api_key: None,
        status,
    }
}

fn result(server_id: u64, success: bool, output: &str) -> ServerMessage {
    ServerMessage::CommandResult {
        server_id: ServerId(server_id),
        success,
        output: output.to_string(),
        message: String::new(),
    }
}

/// Answers every `execute_command` with a successful echo, except the
/// `(command, server)` pair given in `fail`
fn echo_responder(
    fail: Option<(&'static str, u64)>,
) -> impl Fn(&ClientMessage) -> Vec<ServerMessage> + Send + Sync + 'static {
    move |msg| match msg {
        ClientMessage::ExecuteCommand { server_id, command } => {
            let failed = fail == Some((command.as_str(), server_id.0));
            vec![result(
                server_id.0,
                !failed,
                &format!("{} on {}", command, server_id),
            )]
        }
        _ => Vec::new(),
    }
}

fn open_session(
    channel: Arc<dyn Channel>,
    inbound: mpsc::Receiver<ServerMessage>,
    servers: Vec<Server>,
) -> Arc<Session> {
    let session = Session::open(channel, inbound, Box::new(CappedHistory::default()));
    session.handle_message(ServerMessage::ServerList { servers });
    session
}

fn executed(channel: &MemoryChannel) -> Vec<(String, u64)> {
    channel
        .sent()
        .into_iter()
        .filter_map(|m| match m {
            ClientMessage::ExecuteCommand { server_id, command } => Some((command, server_id.0)),
            _ => None,
        })
        .collect()
}

async fn wait_for_executes(channel: &MemoryChannel, count: usize) {
    timeout(Duration::from_secs(2), async {
        while channel.execute_count() < count {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("dispatches were not issued in time");
}

fn pairs(items: &[(&str, u64)]) -> Vec<(String, u64)> {
    items.iter().map(|(c, s)| (c.to_string(), *s)).collect()
}

#[tokio::test]
async fn test_sequential_batch_runs_command_major() {
    let (channel, rx) = MemoryChannel::with_responder(echo_responder(None));
    let session = open_session(channel.clone(), rx, vec![server(1, true), server(2, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"));
    let batch = BatchCoordinator::new(dispatcher);

    let job = BatchJob::new(["A", "B"], [ServerId(1), ServerId(2)], ExecutionMode::Sequential);
    let report = batch.run_batch(job).await.unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(
        executed(&channel),
        pairs(&[("A", 1), ("A", 2), ("B", 1), ("B", 2)])
    );
    assert_eq!(report.outcomes[2].output, "B on 1");
}

#[tokio::test]
async fn test_sequential_batch_aborts_on_first_failure() {
    let (channel, rx) = MemoryChannel::with_responder(echo_responder(Some(("A", 2))));
    let session = open_session(channel.clone(), rx, vec![server(1, true), server(2, true)]);
    let batch = BatchCoordinator::new(Dispatcher::new(session.clone(), CountingExec::ok("unused")));

    let job = BatchJob::new(["A", "B"], [ServerId(1), ServerId(2)], ExecutionMode::Sequential);
    match batch.run_batch(job).await {
        Err(BatchError::BatchAborted { completed, failure }) => {
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].server_id, ServerId(1));
            assert_eq!(failure.command, "A");
            assert_eq!(failure.server_id, ServerId(2));
        }
        other => panic!("expected BatchAborted, got {:?}", other),
    }
    assert_eq!(executed(&channel), pairs(&[("A", 1), ("A", 2)]));
}

#[tokio::test]
async fn test_parallel_batch_issues_everything_before_any_result() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true), server(2, true)]);
    let batch = BatchCoordinator::new(Dispatcher::new(session.clone(), CountingExec::ok("unused")));

    let job = BatchJob::new(["A", "B"], [ServerId(1), ServerId(2)], ExecutionMode::Parallel);
    let handle = tokio::spawn(async move { batch.run_batch(job).await });

    wait_for_executes(&channel, 4).await;
    assert!(!handle.is_finished());
    assert_eq!(session.pending_count(), 4);
    assert_eq!(
        executed(&channel),
        pairs(&[("A", 1), ("A", 2), ("B", 1), ("B", 2)])
    );

    channel.push(result(2, true, "A2")).await;
    channel.push(result(1, true, "A1")).await;
    channel.push(result(1, true, "B1")).await;
    channel.push(result(2, true, "B2")).await;

    let report = handle.await.unwrap().unwrap();
    let outputs: Vec<_> = report.outcomes.iter().map(|o| o.output.as_str()).collect();
    assert_eq!(outputs, vec!["A1", "A2", "B1", "B2"]);
}

#[tokio::test]
async fn test_parallel_batch_reports_partial_failure() {
    let (channel, rx) = MemoryChannel::with_responder(echo_responder(Some(("B", 1))));
    let session = open_session(channel.clone(), rx, vec![server(1, true), server(2, true)]);
    let batch = BatchCoordinator::new(Dispatcher::new(session.clone(), CountingExec::ok("unused")));

    let job = BatchJob::new(["A", "B"], [ServerId(1), ServerId(2)], ExecutionMode::Parallel);
    match batch.run_batch(job).await {
        Err(BatchError::PartialBatchFailure {
            failed,
            failures,
            succeeded,
        }) => {
            assert_eq!(failed, 1);
            assert_eq!(failures[0].command, "B");
            assert_eq!(failures[0].server_id, ServerId(1));
            assert_eq!(succeeded.len(), 3);
        }
        other => panic!("expected PartialBatchFailure, got {:?}", other),
    }
    assert_eq!(channel.execute_count(), 4);
}

#[tokio::test]
async fn test_invalid_batch_dispatches_nothing() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let batch = BatchCoordinator::new(Dispatcher::new(session.clone(), CountingExec::ok("unused")));

    let no_targets = BatchJob::new(["ls"], Vec::<ServerId>::new(), ExecutionMode::Parallel);
    let blank_commands = BatchJob::from_script("\n  \n", [ServerId(1)], ExecutionMode::Sequential);

    assert!(matches!(
        batch.run_batch(no_targets).await,
        Err(BatchError::InvalidBatchJob(_))
    ));
    assert!(matches!(
        batch.run_batch(blank_commands).await,
        Err(BatchError::InvalidBatchJob(_))
    ));
    assert_eq!(channel.send_count(), 0);
}

#[tokio::test]
async fn test_disconnected_server_makes_no_network_calls() {
    let (channel, rx) = MemoryChannel::with_responder(echo_responder(None));
    let session = open_session(channel.clone(), rx, vec![server(1, false)]);
    let fallback = CountingExec::ok("ok");
    let dispatcher = Dispatcher::new(session.clone(), fallback.clone());

    let err = dispatcher.submit(ServerId(1), "ls").await.unwrap_err();
    assert!(matches!(err, DispatchError::ServerNotConnected(ServerId(1))));

    let err = dispatcher.submit(ServerId(42), "ls").await.unwrap_err();
    assert!(matches!(err, DispatchError::ServerNotConnected(ServerId(42))));

    assert_eq!(channel.send_count(), 0);
    assert_eq!(fallback.calls(), 0);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_blank_command_is_rejected_without_history() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let fallback = CountingExec::ok("ok");
    let dispatcher = Dispatcher::new(session.clone(), fallback.clone());

    let err = dispatcher.submit(ServerId(1), "   ").await.unwrap_err();
    assert!(matches!(err, DispatchError::EmptyCommand));
    assert_eq!(channel.send_count(), 0);
    assert_eq!(fallback.calls(), 0);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_closed_channel_uses_fallback_exactly_once() {
    let (channel, rx) = MemoryChannel::new();
    channel.set_open(false);
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let fallback = CountingExec::ok("Command executed successfully");
    let dispatcher = Dispatcher::new(session.clone(), fallback.clone());

    let outcome = dispatcher.submit(ServerId(1), "ls").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.output, "Command executed successfully");
    assert_eq!(outcome.message, "Command executed successfully");
    assert_eq!(fallback.calls(), 1);
    assert_eq!(channel.send_count(), 0);
    assert_eq!(session.pending_count(), 0);
    assert_eq!(session.ledger_entries().len(), 1);
}

#[tokio::test]
async fn test_fallback_error_is_remote_call_failed() {
    let (channel, rx) = MemoryChannel::new();
    channel.set_open(false);
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let fallback = CountingExec::failing(RemoteError::Status {
        status: 404,
        detail: "Server not found".to_string(),
    });
    let dispatcher = Dispatcher::new(session.clone(), fallback.clone());

    match dispatcher.submit(ServerId(1), "ls").await {
        Err(DispatchError::RemoteCallFailed(RemoteError::Status { status, detail })) => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Server not found");
        }
        other => panic!("expected RemoteCallFailed, got {:?}", other),
    }
    assert_eq!(fallback.calls(), 1);
    assert!(session.ledger_entries().is_empty());
}

/// Reports open but refuses every send, as a channel does in the moment
/// it goes down
struct DroppingChannel;

#[async_trait]
impl Channel for DroppingChannel {
    fn is_open(&self) -> bool {
        true
    }

    async fn send(&self, _message: ClientMessage) -> Result<(), ChannelError> {
        Err(ChannelError::Closed)
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn test_failed_send_falls_back_silently() {
    let (_tx, rx) = mpsc::channel(8);
    let session = open_session(Arc::new(DroppingChannel), rx, vec![server(1, true)]);
    let fallback = CountingExec::ok("done");
    let dispatcher = Dispatcher::new(session.clone(), fallback.clone());

    let outcome = dispatcher.submit(ServerId(1), "uptime").await.unwrap();
    assert_eq!(outcome.output, "done");
    assert_eq!(fallback.calls(), 1);
    assert_eq!(session.pending_count(), 0);
}

#[tokio::test]
async fn test_results_correlate_fifo_per_server() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"));

    let handle = tokio::spawn(async move {
        tokio::join!(
            dispatcher.submit(ServerId(1), "first"),
            dispatcher.submit(ServerId(1), "second")
        )
    });

    wait_for_executes(&channel, 2).await;
    channel.push(result(1, true, "one")).await;
    channel.push(result(1, true, "two")).await;

    let (first, second) = handle.await.unwrap();
    assert_eq!(first.unwrap().output, "one");
    assert_eq!(second.unwrap().output, "two");
}

#[tokio::test]
async fn test_timeout_keeps_fifo_aligned_for_late_result() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"))
        .with_deadline(Some(Duration::from_millis(50)));

    let err = dispatcher.submit(ServerId(1), "slow").await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::DispatchTimedOut {
            server_id: ServerId(1),
            ..
        }
    ));

    channel.push(result(1, true, "late")).await;

    let next = dispatcher.clone();
    let handle = tokio::spawn(async move { next.submit(ServerId(1), "fast").await });
    wait_for_executes(&channel, 2).await;
    channel.push(result(1, true, "fresh")).await;

    assert_eq!(handle.await.unwrap().unwrap().output, "fresh");

    let outputs: Vec<_> = session
        .ledger_entries()
        .into_iter()
        .map(|o| o.output)
        .collect();
    assert_eq!(outputs, vec!["late", "fresh"]);
}

#[tokio::test]
async fn test_close_resolves_pending_dispatches() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"));

    let pending = dispatcher.clone();
    let handle = tokio::spawn(async move { pending.submit(ServerId(1), "sleep 100").await });
    wait_for_executes(&channel, 1).await;

    session.close().await;

    assert!(matches!(
        handle.await.unwrap(),
        Err(DispatchError::SessionClosed)
    ));
    assert!(matches!(
        dispatcher.submit(ServerId(1), "ls").await,
        Err(DispatchError::SessionClosed)
    ));
    assert!(!channel.is_open());
}

#[tokio::test]
async fn test_backend_hang_up_is_distinct_from_close() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let exec = CountingExec::ok("via rest");
    let dispatcher = Dispatcher::new(session.clone(), exec.clone()).with_deadline(None);

    let pending = dispatcher.clone();
    let handle = tokio::spawn(async move { pending.submit(ServerId(1), "tail -f log").await });
    wait_for_executes(&channel, 1).await;

    // The channel ends without the session being closed
    channel.close().await;

    let err = timeout(Duration::from_secs(2), handle)
        .await
        .expect("hung-up dispatch did not resolve")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, DispatchError::ChannelLost));
    assert!(!session.is_closed());
    assert_eq!(exec.calls(), 0);

    // Later dispatches go through the fallback
    let outcome = dispatcher.submit(ServerId(1), "uptime").await.unwrap();
    assert_eq!(outcome.output, "via rest");
    assert_eq!(exec.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_racing_dispatches_never_strands_a_slot() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"))
        .with_deadline(None);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.submit(ServerId(1), &format!("cmd {}", i)).await })
        })
        .collect();
    session.close().await;

    for handle in handles {
        let result = timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatch left waiting after close")
            .unwrap();
        assert!(matches!(
            result,
            Err(DispatchError::SessionClosed) | Ok(_)
        ));
    }
    assert_eq!(session.pending_count(), 0);
}

#[tokio::test]
async fn test_history_records_intent_most_recent_first() {
    let (channel, rx) = MemoryChannel::with_responder(echo_responder(None));
    let session = open_session(channel.clone(), rx, vec![server(1, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"));

    for cmd in ["ls", "pwd", "ls"] {
        dispatcher.submit(ServerId(1), cmd).await.unwrap();
    }

    assert_eq!(session.history(), vec!["ls", "pwd"]);
}

#[tokio::test]
async fn test_export_lists_outcomes_in_append_order() {
    let (channel, rx) = MemoryChannel::with_responder(echo_responder(None));
    let session = open_session(channel.clone(), rx, vec![server(1, true), server(2, true)]);
    let dispatcher = Dispatcher::new(session.clone(), CountingExec::ok("unused"));

    dispatcher.submit(ServerId(1), "whoami").await.unwrap();
    dispatcher.submit(ServerId(2), "hostname").await.unwrap();

    let text = session.export_ledger();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] 1 OK whoami on 1"));
    assert!(lines[1].ends_with("] 2 OK hostname on 2"));

    session.clear_console();
    assert!(session.export_ledger().is_empty());
    assert_eq!(session.history(), vec!["hostname", "whoami"]);
}

#[tokio::test]
async fn test_status_patches_follow_snapshot_in_order() {
    let (channel, rx) = MemoryChannel::new();
    let session = open_session(channel.clone(), rx, vec![server(1, false), server(2, false)]);

    channel
        .push(ServerMessage::ServerStatusUpdate {
            server_id: ServerId(1),
            status: true,
            message: "Connected to srv-1".to_string(),
        })
        .await;
    channel
        .push(ServerMessage::ServerStatusUpdate {
            server_id: ServerId(7),
            status: true,
            message: "Connected to srv-7".to_string(),
        })
        .await;
    channel
        .push(ServerMessage::ServerStatusUpdate {
            server_id: ServerId(1),
            status: false,
            message: "Disconnected from srv-1".to_string(),
        })
        .await;

    timeout(Duration::from_secs(2), async {
        while session.system_messages().len() < 3 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    assert!(!session.is_connected(ServerId(1)));
    assert!(session.connected_ids().is_empty());
    assert_eq!(session.servers().len(), 2);
}
