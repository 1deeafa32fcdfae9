// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Diagnostic log sink.
//!
//! Leveled text messages from any task land in a shared ring buffer rendered by the
//! on-demand log overlay (`D`). An optional mirror file gets every line as well,
//! which survives the alternate screen and is the only way to debug a live TUI.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use ratatui::style::Modifier;
use ratatui::text::Line;
use serde::Serialize;

use super::theme;

const MAX_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: Level,
    pub stamp: String,
    pub text: String,
}

impl LogLine {
    pub(crate) fn to_line(&self) -> Line<'static> {
        let style = match self.level {
            Level::Debug => theme::contrast_panel().add_modifier(Modifier::DIM),
            Level::Info => theme::contrast_panel(),
            Level::Warn => theme::contrast_panel().fg(theme::ORANGE),
            Level::Error => theme::contrast_panel().fg(theme::RED),
        };
        Line::styled(format!("{} {}", self.stamp, self.text), style)
    }
}

#[derive(Clone, Default)]
pub struct LogSink {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    lines: VecDeque<LogLine>,
    mirror: Option<PathBuf>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every line to `path` (created on first write).
    pub fn with_mirror(path: PathBuf) -> Self {
        let sink = Self::new();
        sink.inner.lock().expect("log sink lock").mirror = Some(path);
        sink
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.push(Level::Debug, text.into());
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(Level::Info, text.into());
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.push(Level::Warn, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(Level::Error, text.into());
    }

    /// Debug-dump a serializable value, for inspecting server payloads.
    pub fn debug_object(&self, label: &str, value: &impl Serialize) {
        let dump = serde_json::to_string(value).unwrap_or_else(|err| format!("<{err}>"));
        self.push(Level::Debug, format!("{label}: {dump}"));
    }

    /// Most recent `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogLine> {
        let inner = self.inner.lock().expect("log sink lock");
        inner.lines.iter().skip(inner.lines.len().saturating_sub(n)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("log sink lock").lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, level: Level, text: String) {
        let line = LogLine { level, stamp: wall_clock_stamp(), text };
        let mut inner = self.inner.lock().expect("log sink lock");
        if let Some(path) = &inner.mirror {
            // Best effort; a failing mirror must not take the sink down with it.
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{} {:5?} {}", line.stamp, line.level, line.text);
            }
        }
        inner.lines.push_back(line);
        while inner.lines.len() > MAX_LINES {
            inner.lines.pop_front();
        }
    }
}

/// "HH:MM:SS" in UTC; enough for an overlay, without pulling in a calendar crate.
fn wall_clock_stamp() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let (h, m, s) = (secs / 3600 % 24, secs / 60 % 60, secs % 60);
    let mut out = String::with_capacity(8);
    let _ = write!(out, "{h:02}:{m:02}:{s:02}");
    out
}

#[cfg(test)]
mod tests {
    use super::{Level, LogSink, MAX_LINES};

    #[test]
    fn tail_returns_most_recent_lines_oldest_first() {
        let sink = LogSink::new();
        sink.info("one");
        sink.warn("two");
        sink.error("three");

        let tail = sink.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].text, "two");
        assert_eq!(tail[0].level, Level::Warn);
        assert_eq!(tail[1].text, "three");
        assert_eq!(tail[1].level, Level::Error);
    }

    #[test]
    fn ring_buffer_caps_retained_lines() {
        let sink = LogSink::new();
        for i in 0..MAX_LINES + 50 {
            sink.debug(format!("line {i}"));
        }
        assert_eq!(sink.len(), MAX_LINES);
        assert_eq!(sink.tail(1)[0].text, format!("line {}", MAX_LINES + 49));
    }

    #[test]
    fn debug_object_serializes_the_value() {
        let sink = LogSink::new();
        sink.debug_object("pong", &serde_json::json!({"latency": 42}));
        let tail = sink.tail(1);
        assert!(tail[0].text.contains("\"latency\":42"), "{}", tail[0].text);
    }

    #[test]
    fn mirror_file_receives_lines() {
        let dir = std::env::temp_dir().join(format!("tesuji-log-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("mirror.log");
        let sink = LogSink::with_mirror(path.clone());
        sink.info("mirrored line");

        let contents = std::fs::read_to_string(&path).expect("mirror file");
        assert!(contents.contains("mirrored line"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
