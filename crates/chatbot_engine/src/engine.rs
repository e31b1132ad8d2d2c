use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chatbot_core::{ProgressHandle, Query, TurnId};
use chatbot_logging::{chat_debug, chat_info};

use crate::poll::{ChannelProgressSink, PollHandle, ProgressPoller, ReqwestStatusSource};
use crate::settings::{build_client, ClientSettings};
use crate::submit::{ReqwestSubmitter, RequestSubmitter};
use crate::{ClientError, EngineEvent};

enum EngineCommand {
    Submit { turn: TurnId, query: Query },
    StartPolling { turn: TurnId, handle: ProgressHandle },
    CancelPolling { turn: TurnId },
    Schedule { delay: Duration, event: EngineEvent },
}

/// Runs submissions, poll loops and timers on a background tokio runtime and
/// reports their outcomes as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(
        settings: ClientSettings,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Result<Self, ClientError> {
        let client = build_client(&settings)?;
        let submitter = Arc::new(ReqwestSubmitter::new(client.clone(), settings.clone()));
        let source = Arc::new(ReqwestStatusSource::new(client, settings.clone()));
        let poller = ProgressPoller::new(source, &settings);
        Self::with_parts(submitter, poller, event_tx)
    }

    /// Builds an engine around caller-supplied collaborators.
    pub fn with_parts(
        submitter: Arc<dyn RequestSubmitter>,
        poller: ProgressPoller,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|err| ClientError::Runtime(err.to_string()))?;
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            let mut polls: HashMap<TurnId, PollHandle> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                polls.retain(|_, poll| !poll.is_finished());
                match command {
                    EngineCommand::Submit { turn, query } => {
                        let submitter = submitter.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = submitter.submit(&query).await;
                            let _ = event_tx.send(EngineEvent::SubmissionResolved { turn, result });
                        });
                    }
                    EngineCommand::StartPolling { turn, handle } => {
                        let sink = Arc::new(ChannelProgressSink::new(turn, event_tx.clone()));
                        let poll = poller.spawn(runtime.handle(), handle, sink);
                        polls.insert(turn, poll);
                    }
                    EngineCommand::CancelPolling { turn } => {
                        if let Some(poll) = polls.remove(&turn) {
                            chat_debug!("cancelling poll loop for turn {}", turn);
                            poll.cancel();
                        }
                    }
                    EngineCommand::Schedule { delay, event } => {
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = event_tx.send(event);
                        });
                    }
                }
            }

            chat_info!("engine shutting down, cancelling {} poll loops", polls.len());
            for poll in polls.values() {
                poll.cancel();
            }
        });

        Ok(Self { cmd_tx })
    }

    pub fn submit(&self, turn: TurnId, query: Query) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { turn, query });
    }

    pub fn start_polling(&self, turn: TurnId, handle: ProgressHandle) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::StartPolling { turn, handle });
    }

    pub fn cancel_polling(&self, turn: TurnId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelPolling { turn });
    }

    /// Emits `event` once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, event: EngineEvent) {
        let _ = self.cmd_tx.send(EngineCommand::Schedule { delay, event });
    }
}
