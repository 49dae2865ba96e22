//! Block to markdown encoding.
//!
//! Runs of three or more newlines collapse to one blank line everywhere
//! except inside code bodies, which are written verbatim.

use std::{fmt::Write as _, ops::Range, sync::LazyLock};

use regex::Regex;

use crate::process_data::language::PLAIN_TEXT;

use super::{Asset, Block, Span};

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

pub fn encode<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    let mut out = String::new();
    let mut previous: Option<&Block> = None;
    let mut number = 0usize;
    let mut verbatim = Vec::new();
    for block in blocks {
        if renders_nothing(block) {
            continue;
        }
        if previous.is_some_and(Block::is_list_item) && !block.is_list_item() {
            out.push('\n');
        }
        match block {
            Block::NumberedItem(_) if matches!(previous, Some(Block::NumberedItem(_))) => {
                number += 1
            }
            _ => number = 1,
        }
        if let Some(body) = write_block(&mut out, block, number) {
            verbatim.push(body);
        }
        previous = Some(block);
    }
    let out = collapse_blank_runs(&out, &verbatim);
    let mut out = out.trim().to_owned();
    out.push('\n');
    out
}

/// Unknown kinds without visible text are dropped from the document.
fn renders_nothing(block: &Block) -> bool {
    match block {
        Block::Unsupported { text, .. } => text.iter().all(|span| span.text.trim().is_empty()),
        _ => false,
    }
}

fn collapse_blank_runs(out: &str, verbatim: &[Range<usize>]) -> String {
    let mut collapsed = String::with_capacity(out.len());
    let mut last = 0;
    for body in verbatim {
        collapsed.push_str(&BLANK_RUNS.replace_all(&out[last..body.start], "\n\n"));
        collapsed.push_str(&out[body.clone()]);
        last = body.end;
    }
    collapsed.push_str(&BLANK_RUNS.replace_all(&out[last..], "\n\n"));
    collapsed
}

/// Appends one block. Returns the byte range of a code body, which must not
/// be touched by the blank-run collapse.
fn write_block(out: &mut String, block: &Block, number: usize) -> Option<Range<usize>> {
    match block {
        Block::Heading { level, text } => {
            out.push_str(&"#".repeat(level.depth()));
            out.push(' ');
            write_spans(out, text);
            out.push_str("\n\n");
        }
        Block::Paragraph(text) | Block::Unsupported { text, .. } => {
            write_spans(out, text);
            out.push_str("\n\n");
        }
        Block::BulletedItem(text) => {
            out.push_str("- ");
            write_spans(out, text);
            out.push('\n');
        }
        Block::NumberedItem(text) => {
            let _ = write!(out, "{number}. ");
            write_spans(out, text);
            out.push('\n');
        }
        Block::Todo { checked, text } => {
            out.push_str(if *checked { "- [x] " } else { "- [ ] " });
            write_spans(out, text);
            out.push('\n');
        }
        Block::Code { language, text } => {
            out.push_str("```");
            if language != PLAIN_TEXT {
                out.push_str(language);
            }
            out.push('\n');
            let start = out.len();
            if !text.is_empty() {
                out.push_str(text);
                out.push('\n');
            }
            let body = start..out.len();
            out.push_str("```\n\n");
            return Some(body);
        }
        Block::Divider => out.push_str("---\n\n"),
        Block::Quote(text) | Block::Callout(text) => {
            out.push_str("> ");
            write_spans(out, text);
            out.push_str("\n\n");
        }
        Block::Image(asset) => {
            if let Some(url) = asset.url() {
                let _ = write!(out, "![]({url})\n\n");
            }
        }
        Block::Video(asset) => write_asset_link(out, "video", asset),
        Block::Audio(asset) => write_asset_link(out, "audio", asset),
        Block::File { asset, name } => {
            write_asset_link(out, name.as_deref().unwrap_or("file"), asset)
        }
        Block::Bookmark { url } => {
            let _ = write!(out, "<{url}>\n\n");
        }
    }
    None
}

fn write_asset_link(out: &mut String, label: &str, asset: &Asset) {
    if let Some(url) = asset.url() {
        let _ = write!(out, "[{label}]({url})\n\n");
    }
}

fn write_spans(out: &mut String, spans: &[Span]) {
    for span in spans {
        write_span(out, span);
    }
}

/// Opens delimiters in the order bold, italic, inline code, strikethrough and
/// closes them in reverse. Surrounding whitespace stays outside the
/// delimiters.
fn write_span(out: &mut String, span: &Span) {
    let core = span.text.trim();
    if core.is_empty() {
        out.push_str(&span.text);
        return;
    }
    let start = span.text.len() - span.text.trim_start().len();
    let leading = &span.text[..start];
    let trailing = &span.text[start + core.len()..];

    let mut delimiters = Vec::new();
    if span.style.bold {
        delimiters.push("**");
    }
    if span.style.italic {
        delimiters.push("*");
    }
    if span.style.code {
        delimiters.push("`");
    }
    if span.style.strikethrough {
        delimiters.push("~~");
    }

    out.push_str(leading);
    if span.href.is_some() {
        out.push('[');
    }
    for delimiter in &delimiters {
        out.push_str(delimiter);
    }
    out.push_str(core);
    for delimiter in delimiters.iter().rev() {
        out.push_str(delimiter);
    }
    if let Some(href) = &span.href {
        let _ = write!(out, "]({href})");
    }
    out.push_str(trailing);
}
