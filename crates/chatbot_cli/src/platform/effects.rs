use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use chatbot_core::{Effect, Msg};
use chatbot_engine::{ClientSettings, EngineEvent, EngineHandle};
use chatbot_logging::{chat_debug, chat_info};

use super::persistence;

pub struct EffectRunner {
    engine: EngineHandle,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(
        settings: ClientSettings,
        state_dir: PathBuf,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();
        let engine = EngineHandle::new(settings, event_tx).context("failed to start engine")?;
        spawn_event_loop(event_rx, msg_tx);
        Ok(Self { engine, state_dir })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit { turn, query } => {
                    chat_info!(
                        "Submit turn={} chars={}",
                        turn,
                        query.as_str().chars().count()
                    );
                    self.engine.submit(turn, query);
                }
                Effect::StartPolling { turn, handle } => {
                    chat_info!("StartPolling turn={} key={}", turn, handle);
                    self.engine.start_polling(turn, handle);
                }
                Effect::CancelPolling { turn } => {
                    chat_info!("CancelPolling turn={}", turn);
                    self.engine.cancel_polling(turn);
                }
                Effect::DeliverLater { turn, text, delay } => {
                    chat_debug!("DeliverLater turn={} delay={:?}", turn, delay);
                    self.engine
                        .schedule(delay, EngineEvent::MessageDue { turn, text });
                }
                Effect::ResetStatusLater { turn, delay } => {
                    self.engine
                        .schedule(delay, EngineEvent::StatusResetDue { turn });
                }
                Effect::MarkVisited => persistence::mark_visited(&self.state_dir),
            }
        }
    }
}

fn spawn_event_loop(event_rx: mpsc::Receiver<EngineEvent>, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while let Ok(event) = event_rx.recv() {
            if msg_tx.send(map_event(event)).is_err() {
                break;
            }
        }
    });
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SubmissionResolved { turn, result } => {
            Msg::SubmissionResolved { turn, result }
        }
        EngineEvent::ProgressObserved { turn, state } => Msg::ProgressObserved { turn, state },
        EngineEvent::PollTerminated { turn, reason } => Msg::PollTerminated { turn, reason },
        EngineEvent::MessageDue { turn, text } => Msg::DelayedMessageDue { turn, text },
        EngineEvent::StatusResetDue { turn } => Msg::StatusResetDue { turn },
    }
}
