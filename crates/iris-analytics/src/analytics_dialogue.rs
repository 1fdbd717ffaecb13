//! Reconstructs structured speaker turns from raw transcript text.

use serde::Serialize;

/// Public enum `DialogueSender` classifying one transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueSender {
    User,
    Assistant,
    Unknown,
}

impl DialogueSender {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogueSender::User => "user",
            DialogueSender::Assistant => "assistant",
            DialogueSender::Unknown => "unknown",
        }
    }
}

/// Public struct `DialogueTurn` holding one parsed transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueTurn {
    pub sender: DialogueSender,
    pub text: String,
}

/// Parses a line-delimited transcript into ordered speaker turns.
///
/// Blank lines are discarded. Each remaining line splits on its first colon:
/// the prefix is the speaker label (classified `user` when it contains the
/// substring "user" case-insensitively, else `assistant`), the suffix is the
/// message text. A line with no colon becomes an `unknown` turn.
pub fn parse_dialogue(raw: Option<&str>) -> Vec<DialogueTurn> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(':') {
            Some((label, text)) => {
                let sender = if label.trim().to_lowercase().contains("user") {
                    DialogueSender::User
                } else {
                    DialogueSender::Assistant
                };
                DialogueTurn {
                    sender,
                    text: text.trim().to_string(),
                }
            }
            None => DialogueTurn {
                sender: DialogueSender::Unknown,
                text: line.to_string(),
            },
        })
        .collect()
}
