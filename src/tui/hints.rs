// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Footer key hints.
//!
//! A hint is either `"KEY description"` (explicit key before the first space) or a
//! single word whose first letter is the key, e.g. `"Pass"` renders as a
//! reverse-video `P` followed by `ass`. The cross-page shortcuts are appended to
//! every hint line.

use ratatui::style::Modifier;
use ratatui::text::{Line, Span};

use super::theme;

/// Shortcuts available on every page, appended after page-specific hints.
pub(crate) const COMMON_HINTS: [&str; 5] = ["Home", "Next", "Watch", "Debug log", "quit"];

fn push_hint(spans: &mut Vec<Span<'static>>, desc: &str) {
    let key_style = theme::secondary().add_modifier(Modifier::REVERSED);
    match desc.split_once(' ') {
        Some((key, rest)) => {
            spans.push(Span::styled(key.to_owned(), key_style));
            spans.push(Span::styled(format!(" {rest}"), theme::secondary()));
        }
        None => {
            let mut chars = desc.chars();
            if let Some(first) = chars.next() {
                spans.push(Span::styled(first.to_string(), key_style));
                spans.push(Span::styled(chars.as_str().to_owned(), theme::secondary()));
            }
        }
    }
}

/// Builds a hint line from page-specific hints plus the common shortcuts.
pub(crate) fn hint_line(descs: &[&str]) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, desc) in descs.iter().chain(COMMON_HINTS.iter()).enumerate() {
        if i > 0 {
            spans.push(Span::styled(" ⋅ ".to_owned(), theme::tertiary()));
        }
        push_hint(&mut spans, desc);
    }
    Line::from(spans)
}
