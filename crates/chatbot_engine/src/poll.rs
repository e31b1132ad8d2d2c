use std::sync::{mpsc, Arc};
use std::time::Duration;

use chatbot_core::{Phase, PollTermination, ProgressHandle, ProgressState, TurnId};
use chatbot_logging::{chat_debug, chat_info, chat_warn};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::settings::ClientSettings;
use crate::types::map_reqwest_error;
use crate::{ClientError, EngineEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Observed(ProgressState),
    Terminated(PollTermination),
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PollEvent);
}

/// Forwards poll events for one turn to the engine event channel.
pub struct ChannelProgressSink {
    turn: TurnId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(turn: TurnId, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { turn, tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: PollEvent) {
        let turn = self.turn;
        let event = match event {
            PollEvent::Observed(state) => EngineEvent::ProgressObserved { turn, state },
            PollEvent::Terminated(reason) => EngineEvent::PollTerminated { turn, reason },
        };
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// Issues one status query for `handle`.
    async fn fetch_state(&self, handle: &ProgressHandle) -> Result<ProgressState, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ProgressPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<ProgressBody>,
}

#[derive(Debug, Deserialize)]
struct ProgressBody {
    #[serde(default)]
    state: Option<String>,
}

pub struct ReqwestStatusSource {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl ReqwestStatusSource {
    pub fn new(client: reqwest::Client, settings: ClientSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait::async_trait]
impl StatusSource for ReqwestStatusSource {
    async fn fetch_state(&self, handle: &ProgressHandle) -> Result<ProgressState, ClientError> {
        let url = self.settings.progress_url(handle.as_str())?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::PollFailure(format!("http status {status}")));
        }

        let payload: ProgressPayload = response.json().await.map_err(map_reqwest_error)?;
        if payload.status.as_deref() != Some("ok") {
            return Err(ClientError::PollFailure(format!(
                "status {:?}",
                payload.status.unwrap_or_default()
            )));
        }
        // A reply without a label carries nothing to show; treat it like a failed query.
        match payload
            .progress
            .and_then(|progress| progress.state)
            .filter(|state| !state.trim().is_empty())
        {
            Some(label) => Ok(ProgressState::from_label(&label)),
            None => Err(ClientError::Decode("missing progress state".to_string())),
        }
    }
}

/// Polls one job's status at a fixed cadence until a terminal state, a failed
/// query, the attempt cap, or cancellation.
#[derive(Clone)]
pub struct ProgressPoller {
    source: Arc<dyn StatusSource>,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl ProgressPoller {
    pub fn new(source: Arc<dyn StatusSource>, settings: &ClientSettings) -> Self {
        Self {
            source,
            interval: settings.poll_interval,
            max_attempts: settings.max_poll_attempts,
        }
    }

    pub async fn run(
        &self,
        handle: &ProgressHandle,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> PollTermination {
        chat_info!("poll loop started for {}", handle);
        let mut attempts: u32 = 0;

        let reason = loop {
            let fetched = tokio::select! {
                () = cancel.cancelled() => break PollTermination::Cancelled,
                fetched = self.source.fetch_state(handle) => fetched,
            };
            attempts = attempts.saturating_add(1);

            match fetched {
                Err(err) => {
                    chat_warn!("progress query for {} failed: {}", handle, err);
                    break PollTermination::RequestFailed;
                }
                Ok(state) => {
                    chat_debug!("progress for {}: {}", handle, state);
                    let terminal = match state {
                        ProgressState::Canonical(Phase::Done) => Some(PollTermination::Done),
                        ProgressState::Error => Some(PollTermination::Error),
                        _ => None,
                    };
                    sink.emit(PollEvent::Observed(state));
                    if let Some(reason) = terminal {
                        break reason;
                    }
                }
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                break PollTermination::Exhausted;
            }

            tokio::select! {
                () = cancel.cancelled() => break PollTermination::Cancelled,
                () = tokio::time::sleep(self.interval) => {}
            }
        };

        chat_info!(
            "poll loop for {} stopped after {} queries: {}",
            handle,
            attempts,
            reason
        );
        sink.emit(PollEvent::Terminated(reason));
        reason
    }

    /// Starts [`run`](Self::run) as a task on `runtime`.
    pub fn spawn(
        &self,
        runtime: &tokio::runtime::Handle,
        handle: ProgressHandle,
        sink: Arc<dyn ProgressSink>,
    ) -> PollHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let poller = self.clone();
        let task = runtime.spawn(async move { poller.run(&handle, sink.as_ref(), &token).await });
        PollHandle { cancel, task }
    }
}

/// Handle to a running poll loop.
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollTermination>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to stop. `None` if the task panicked or was aborted.
    pub async fn join(self) -> Option<PollTermination> {
        self.task.await.ok()
    }
}
