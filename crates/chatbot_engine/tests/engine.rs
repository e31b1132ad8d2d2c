use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use chatbot_core::{
    PollTermination, ProgressHandle, ProgressState, Query, SubmissionResult, SubmissionStatus,
};
use chatbot_engine::{
    ClientError, ClientSettings, EngineEvent, EngineHandle, ProgressPoller, RequestSubmitter,
    StatusSource,
};

const WAIT: Duration = Duration::from_secs(5);

struct FakeSubmitter {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl RequestSubmitter for FakeSubmitter {
    async fn submit(&self, query: &Query) -> SubmissionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SubmissionResult {
            status: SubmissionStatus::Ok,
            message: format!("eco: {query}"),
            progress_key: Some(ProgressHandle::new("k")),
            limits: None,
        }
    }
}

/// Replays scripted replies; once exhausted it keeps reporting `queued`.
struct ScriptedSource {
    replies: Mutex<VecDeque<Result<ProgressState, ClientError>>>,
}

impl ScriptedSource {
    fn new(replies: Vec<Result<ProgressState, ClientError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_state(&self, _handle: &ProgressHandle) -> Result<ProgressState, ClientError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ProgressState::from_label("queued")))
    }
}

fn engine_with(
    replies: Vec<Result<ProgressState, ClientError>>,
) -> (EngineHandle, Arc<FakeSubmitter>, mpsc::Receiver<EngineEvent>) {
    let settings = ClientSettings {
        poll_interval: Duration::from_millis(5),
        ..ClientSettings::default()
    };
    let submitter = Arc::new(FakeSubmitter {
        calls: AtomicUsize::new(0),
    });
    let poller = ProgressPoller::new(Arc::new(ScriptedSource::new(replies)), &settings);
    let (event_tx, event_rx) = mpsc::channel();
    let engine = EngineHandle::with_parts(submitter.clone(), poller, event_tx).unwrap();
    (engine, submitter, event_rx)
}

#[test]
fn submit_reports_resolution_for_turn() {
    let (engine, submitter, events) = engine_with(Vec::new());
    engine.submit(3, Query::parse("hola").unwrap());

    let event = events.recv_timeout(WAIT).unwrap();
    match event {
        EngineEvent::SubmissionResolved { turn, result } => {
            assert_eq!(turn, 3);
            assert_eq!(result.message, "eco: hola");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn polling_reports_observations_then_termination() {
    let (engine, _submitter, events) = engine_with(vec![
        Ok(ProgressState::from_label("calling_llm")),
        Ok(ProgressState::from_label("done")),
    ]);
    engine.start_polling(1, ProgressHandle::new("k"));

    let received: Vec<_> = (0..3)
        .map(|_| events.recv_timeout(WAIT).unwrap())
        .collect();
    assert_eq!(
        received,
        vec![
            EngineEvent::ProgressObserved {
                turn: 1,
                state: ProgressState::from_label("calling_llm"),
            },
            EngineEvent::ProgressObserved {
                turn: 1,
                state: ProgressState::from_label("done"),
            },
            EngineEvent::PollTerminated {
                turn: 1,
                reason: PollTermination::Done,
            },
        ]
    );
}

#[test]
fn failed_query_terminates_without_observation() {
    let (engine, _submitter, events) =
        engine_with(vec![Err(ClientError::PollFailure("http status 500".into()))]);
    engine.start_polling(2, ProgressHandle::new("k"));

    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        EngineEvent::PollTerminated {
            turn: 2,
            reason: PollTermination::RequestFailed,
        }
    );
}

#[test]
fn cancel_polling_stops_a_running_loop() {
    let (engine, _submitter, events) = engine_with(Vec::new());
    engine.start_polling(4, ProgressHandle::new("k"));
    // Wait for the loop to be running before cancelling it.
    assert!(matches!(
        events.recv_timeout(WAIT).unwrap(),
        EngineEvent::ProgressObserved { turn: 4, .. }
    ));
    engine.cancel_polling(4);

    let terminated = std::iter::from_fn(|| events.recv_timeout(WAIT).ok())
        .find(|event| matches!(event, EngineEvent::PollTerminated { .. }));
    assert_eq!(
        terminated,
        Some(EngineEvent::PollTerminated {
            turn: 4,
            reason: PollTermination::Cancelled,
        })
    );
}

#[test]
fn scheduled_event_arrives_after_delay() {
    let (engine, _submitter, events) = engine_with(Vec::new());
    let started = std::time::Instant::now();
    engine.schedule(
        Duration::from_millis(30),
        EngineEvent::StatusResetDue { turn: 9 },
    );

    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        EngineEvent::StatusResetDue { turn: 9 }
    );
    assert!(started.elapsed() >= Duration::from_millis(30));
}
