//! Pattern-string layouts for file log output.
//!
//! Conversion-word syntax: `%d`/`%d{FMT}` (date), `%level`/`%p` with an
//! optional pad width like `%-5level`, `%logger`/`%c` (record target),
//! `%msg`/`%m`/`%message`, `%t`/`%thread`, `%n` (newline), `%%` (literal
//! percent). Unrecognized conversions render literally; parsing never fails.

use chrono::{DateTime, Local};
use log::Level;

/// Date format used by a bare `%d`.
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One parsed element of a pattern.
#[derive(Debug, Clone, PartialEq)]
enum Chunk {
    Literal(String),
    /// Date with a chrono strftime format.
    Date(String),
    Level(Option<Pad>),
    Logger,
    Message,
    Thread,
    Newline,
}

/// Field padding: `%-5level` pads left-justified to width 5.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pad {
    width: usize,
    left: bool,
}

/// A parsed log-line layout.
#[derive(Debug, Clone)]
pub(crate) struct PatternLayout {
    chunks: Vec<Chunk>,
}

impl PatternLayout {
    /// Parse a pattern string. Unknown conversion words are kept as literal
    /// text, so this cannot fail.
    pub(crate) fn parse(pattern: &str) -> Self {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '%' {
                literal.push(ch);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }

            // Consumed text, kept verbatim when the conversion is unknown.
            let mut consumed = String::from("%");
            let mut left = false;
            if chars.peek() == Some(&'-') {
                chars.next();
                consumed.push('-');
                left = true;
            }
            let mut width = String::new();
            while let Some(digit) = chars.peek().filter(|c| c.is_ascii_digit()) {
                width.push(*digit);
                consumed.push(*digit);
                chars.next();
            }
            let mut word = String::new();
            while let Some(letter) = chars.peek().filter(|c| c.is_ascii_alphabetic()) {
                word.push(*letter);
                consumed.push(*letter);
                chars.next();
            }
            let mut argument = None;
            if chars.peek() == Some(&'{') {
                chars.next();
                let mut arg = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                    arg.push(inner);
                }
                consumed.push('{');
                consumed.push_str(&arg);
                consumed.push('}');
                argument = Some(arg);
            }

            let pad = width.parse().ok().map(|width| Pad { width, left });
            let chunk = match word.as_str() {
                "d" | "date" => Chunk::Date(
                    argument
                        .as_deref()
                        .map(translate_date_format)
                        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
                ),
                "level" | "p" => Chunk::Level(pad),
                "logger" | "c" => Chunk::Logger,
                "msg" | "m" | "message" => Chunk::Message,
                "t" | "thread" => Chunk::Thread,
                "n" => Chunk::Newline,
                _ => {
                    literal.push_str(&consumed);
                    continue;
                }
            };
            if !literal.is_empty() {
                chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
            }
            chunks.push(chunk);
        }
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }
        Self { chunks }
    }

    /// Render one log line for the given record fields.
    pub(crate) fn render(
        &self,
        timestamp: DateTime<Local>,
        level: Level,
        target: &str,
        message: &str,
    ) -> String {
        let mut line = String::new();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => line.push_str(text),
                Chunk::Date(format) => line.push_str(&timestamp.format(format).to_string()),
                Chunk::Level(pad) => push_padded(&mut line, level.as_str(), *pad),
                Chunk::Logger => line.push_str(target),
                Chunk::Message => line.push_str(message),
                Chunk::Thread => {
                    line.push_str(std::thread::current().name().unwrap_or("unnamed"))
                }
                Chunk::Newline => line.push('\n'),
            }
        }
        line
    }
}

fn push_padded(line: &mut String, text: &str, pad: Option<Pad>) {
    match pad {
        Some(Pad { width, left: true }) => {
            line.push_str(&format!("{text:<width$}"));
        }
        Some(Pad { width, left: false }) => {
            line.push_str(&format!("{text:>width$}"));
        }
        None => line.push_str(text),
    }
}

/// Translate the common date tokens (`yyyy MM dd HH mm ss SSS`) into a
/// chrono strftime format. Unrecognized characters pass through literally.
fn translate_date_format(format: &str) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    while let Some(ch) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&ch) {
            chars.next();
            run += 1;
        }
        match ch {
            'y' => out.push_str(if run >= 4 { "%Y" } else { "%y" }),
            'M' => out.push_str("%m"),
            'd' => out.push_str("%d"),
            'H' => out.push_str("%H"),
            'm' => out.push_str("%M"),
            's' => out.push_str("%S"),
            'S' => out.push_str("%3f"),
            '%' => {
                for _ in 0..run {
                    out.push_str("%%");
                }
            }
            other => {
                for _ in 0..run {
                    out.push(other);
                }
            }
        }
    }
    out
}
