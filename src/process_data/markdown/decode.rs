//! Line oriented markdown to block decoding.
//!
//! The decoder is a two state machine. In [`State::Scanning`] every line is
//! classified on its own; a fence opener switches to [`State::InFence`],
//! which collects raw lines until a closing fence. End of input while in a
//! fence emits whatever was collected: an unterminated fence absorbs the rest
//! of the document.
//!
//! Inline styles are not reconstructed. Every text block carries its text as
//! one unstyled span. Markers are recognized on the trimmed line, but a
//! paragraph keeps the raw line so indentation survives.

use crate::process_data::language;

use super::{Block, HeadingLevel, Span};

const FENCE: &str = "```";

enum State {
    Scanning,
    InFence { language: String, lines: Vec<String> },
}

pub fn decode(document: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut state = State::Scanning;
    for line in document.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        state = match state {
            State::Scanning => scan_line(line, &mut blocks),
            State::InFence {
                language,
                mut lines,
            } => {
                if line.trim() == FENCE {
                    blocks.push(Block::code(language, lines.join("\n")));
                    State::Scanning
                } else {
                    lines.push(line.to_owned());
                    State::InFence { language, lines }
                }
            }
        };
    }
    if let State::InFence { language, lines } = state {
        blocks.push(Block::code(language, lines.join("\n")));
    }
    blocks
}

fn scan_line(line: &str, blocks: &mut Vec<Block>) -> State {
    let trimmed = line.trim();
    if let Some(block) = heading(trimmed) {
        blocks.push(block);
    } else if let Some(tag) = trimmed.strip_prefix(FENCE) {
        return State::InFence {
            language: language::normalize(tag),
            lines: Vec::new(),
        };
    } else if let Some(block) = todo(trimmed) {
        blocks.push(block);
    } else if let Some(text) = bullet(trimmed) {
        blocks.push(Block::BulletedItem(text_spans(text)));
    } else if let Some(text) = numbered(trimmed) {
        blocks.push(Block::NumberedItem(text_spans(text)));
    } else if let Some(text) = trimmed.strip_prefix("> ") {
        blocks.push(Block::Quote(text_spans(text)));
    } else if matches!(trimmed, "---" | "***" | "___") {
        blocks.push(Block::Divider);
    } else if !trimmed.is_empty() {
        blocks.push(Block::paragraph(line));
    }
    State::Scanning
}

fn text_spans(text: &str) -> Vec<Span> {
    vec![Span::plain(text.trim())]
}

fn heading(line: &str) -> Option<Block> {
    let depth = line.chars().take_while(|c| *c == '#').count();
    let level = HeadingLevel::from_depth(depth)?;
    let text = line[depth..].strip_prefix(' ')?;
    Some(Block::Heading {
        level,
        text: text_spans(text),
    })
}

fn bullet(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

fn todo(line: &str) -> Option<Block> {
    let rest = bullet(line)?;
    let (checked, text) = if let Some(text) = rest.strip_prefix("[ ] ") {
        (false, text)
    } else if let Some(text) = rest
        .strip_prefix("[x] ")
        .or_else(|| rest.strip_prefix("[X] "))
    {
        (true, text)
    } else {
        return None;
    };
    Some(Block::Todo {
        checked,
        text: text_spans(text),
    })
}

fn numbered(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}
