use std::io::{self, Write};

use chatbot_core::{ChatEntry, ConversationView, Role, StepMark};

use super::constants::*;

/// Writes new transcript entries and status changes to a terminal stream.
pub struct TranscriptRenderer<W: Write> {
    out: W,
    clock: Box<dyn Fn() -> String + Send>,
    rendered_entries: usize,
    last_status: Option<String>,
}

impl<W: Write> TranscriptRenderer<W> {
    pub fn new(out: W, clock: Box<dyn Fn() -> String + Send>) -> Self {
        Self {
            out,
            clock,
            rendered_entries: 0,
            last_status: None,
        }
    }

    pub fn render(&mut self, view: &ConversationView) -> io::Result<()> {
        for entry in view.transcript.iter().skip(self.rendered_entries) {
            let line = self.entry_line(entry);
            writeln!(self.out, "{line}")?;
        }
        self.rendered_entries = view.transcript.len();

        let status = status_line(view);
        if self.last_status.as_deref() != Some(status.as_str()) {
            writeln!(self.out, "{status}")?;
            self.last_status = Some(status);
        }
        self.out.flush()
    }

    fn entry_line(&self, entry: &ChatEntry) -> String {
        match entry {
            ChatEntry::Message { role, text } => {
                let label = match role {
                    Role::User => USER_LABEL,
                    Role::Assistant => ASSISTANT_LABEL,
                };
                format!("[{}] {}: {}", (self.clock)(), label, strip_markup(text))
            }
            ChatEntry::Notice(notice) => format!("{NOTICE_PREFIX} {}", notice.text()),
        }
    }
}

pub fn status_line(view: &ConversationView) -> String {
    let steps: Vec<&str> = view
        .steps
        .iter()
        .map(|step| match step.mark {
            StepMark::Untouched => STEP_UNTOUCHED,
            StepMark::Active => STEP_ACTIVE,
            StepMark::Complete => STEP_COMPLETE,
        })
        .collect();

    let mut line = format!("[{}]", view.badge.text());
    if view.indicator_visible {
        line.push(' ');
        line.push_str(&steps.join(" "));
    }
    if let Some(phase) = &view.phase {
        line.push(' ');
        line.push_str(&phase.title);
    }
    line.push_str(&format!(" | {} | {}", view.quota_minute, view.quota_day));
    line
}

/// Reduces server markup to plain terminal text: line breaks are kept, other tags dropped.
pub fn strip_markup(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        plain.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('>') else {
            plain.push_str(&rest[start..]);
            return plain;
        };
        let tag = rest[start + 1..start + len].trim().to_ascii_lowercase();
        if tag.starts_with("br") || tag == "/p" {
            plain.push('\n');
        }
        rest = &rest[start + len + 1..];
    }
    plain.push_str(rest);
    plain
}
