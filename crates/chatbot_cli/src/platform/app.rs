use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use chatbot_core::{update, ConversationState, Msg};
use chatbot_logging::{chat_debug, chat_info};
use clap::Parser;

use super::config::{self, Cli};
use super::effects::EffectRunner;
use super::logging;
use super::persistence;
use super::ui::render::TranscriptRenderer;

pub fn run_app() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(&cli)?;
    logging::initialize(config.log, config.log_level);
    chat_info!("chatbot-cli starting against {}", config.client.base_url);

    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(config.client.clone(), config.state_dir.clone(), msg_tx.clone())?;
    spawn_stdin_reader(msg_tx.clone());

    let mut state = ConversationState::with_config(config.conversation.clone());
    let mut renderer = TranscriptRenderer::new(
        io::stdout(),
        Box::new(|| chrono::Local::now().format("%H:%M").to_string()),
    );

    if persistence::is_first_visit(&config.state_dir) {
        let _ = msg_tx.send(Msg::FirstVisit);
    }
    renderer
        .render(&state.view())
        .context("failed to write to stdout")?;

    while let Ok(msg) = msg_rx.recv() {
        chat_debug!("msg {:?}", msg);
        let (next, effects) = update(state, msg);
        state = next;
        runner.enqueue(effects);

        if state.consume_dirty() {
            renderer
                .render(&state.view())
                .context("failed to write to stdout")?;
        }

        if state.is_input_closed() && state.is_settled() {
            break;
        }
    }

    chat_info!("chatbot-cli exiting");
    Ok(())
}

/// One question per line; a trailing backslash joins the next line.
fn spawn_stdin_reader(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut pending = String::new();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(head) = line.strip_suffix('\\') {
                pending.push_str(head);
                pending.push('\n');
                continue;
            }
            pending.push_str(&line);
            let question = std::mem::take(&mut pending);
            if msg_tx.send(Msg::InputChanged(question)).is_err()
                || msg_tx.send(Msg::QuerySubmitted).is_err()
            {
                return;
            }
        }
        if !pending.is_empty() {
            let _ = msg_tx.send(Msg::InputChanged(pending));
            let _ = msg_tx.send(Msg::QuerySubmitted);
        }
        let _ = msg_tx.send(Msg::InputClosed);
    });
}
