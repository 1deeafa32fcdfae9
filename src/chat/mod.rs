// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Per-game chat timeline.
//!
//! Chat lines arrive over the live event stream out of order and occasionally more
//! than once (history replay on reconnect). [`ChatTimeline`] keeps one deduplicated
//! sequence per game, sorted by timestamp ascending with ties kept in arrival order,
//! so the chat table always renders a stable transcript.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::client::ChatLine;

#[derive(Debug, Default)]
pub struct ChatTimeline {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    seen: HashSet<String>,
    lines: Vec<ChatLine>,
}

impl ChatTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `line` at its timestamp position. Returns `false` (and changes
    /// nothing) when a line with the same chat id was inserted before.
    pub fn insert(&self, line: ChatLine) -> bool {
        let mut inner = self.inner.lock().expect("chat timeline lock");
        if !inner.seen.insert(line.id.clone()) {
            return false;
        }
        // partition_point on `<=` places equal timestamps after the ones already
        // present, which is what keeps ties in arrival order.
        let at = inner.lines.partition_point(|existing| existing.at_ms <= line.at_ms);
        inner.lines.insert(at, line);
        true
    }

    /// Current transcript, oldest first.
    pub fn snapshot(&self) -> Vec<ChatLine> {
        self.inner.lock().expect("chat timeline lock").lines.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("chat timeline lock").lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
