use std::path::{Path, PathBuf};

use chatbot_engine::AtomicFileWriter;
use chatbot_logging::{chat_error, chat_info, chat_warn};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".chatbot_state.ron";

/// Client-side markers only; the conversation itself is never written out.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
struct PersistedState {
    #[serde(default)]
    visited: bool,
}

fn load_state(state_dir: &Path) -> PersistedState {
    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    let content = match writer.read(STATE_FILENAME) {
        Ok(Some(text)) => text,
        Ok(None) => return PersistedState::default(),
        Err(err) => {
            chat_warn!(
                "Failed to read persisted state from {:?}: {}",
                writer.path_of(STATE_FILENAME),
                err
            );
            return PersistedState::default();
        }
    };

    match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            chat_warn!("Failed to parse persisted state: {}", err);
            PersistedState::default()
        }
    }
}

pub(crate) fn is_first_visit(state_dir: &Path) -> bool {
    !load_state(state_dir).visited
}

pub(crate) fn mark_visited(state_dir: &Path) {
    let state = PersistedState { visited: true };
    let content = match ron::ser::to_string_pretty(&state, ron::ser::PrettyConfig::new()) {
        Ok(text) => text,
        Err(err) => {
            chat_error!("Failed to serialize persisted state: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    match writer.write(STATE_FILENAME, &content) {
        Ok(path) => chat_info!("Recorded first visit in {:?}", path),
        Err(err) => chat_error!(
            "Failed to write persisted state to {:?}: {}",
            state_dir,
            err
        ),
    }
}
