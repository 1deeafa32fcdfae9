// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Board rendering.
//!
//! Full-width glyphs keep the grid square in a terminal: one cell per
//! intersection, stones and grid characters all two columns wide.

use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};

use super::theme;
use crate::client::{Coord, GameState, Move, StoneColor};

const GRID: char = '〸';
const HOSHI: char = '＊';
const BLACK_STONE: char = '⚫';
const WHITE_STONE: char = '⚪';
const DEAD_BLACK_STONE: char = '◾';
const DEAD_WHITE_STONE: char = '◽';

fn hoshi_points(size: i16) -> &'static [(i16, i16)] {
    match size {
        9 => &[(2, 2), (2, 6), (4, 4), (6, 2), (6, 6)],
        13 => &[(3, 3), (3, 9), (6, 6), (9, 3), (9, 9)],
        19 => &[
            (3, 3),
            (3, 9),
            (3, 15),
            (9, 3),
            (9, 9),
            (9, 15),
            (15, 3),
            (15, 9),
            (15, 15),
        ],
        _ => &[],
    }
}

fn cell_glyph(state: &GameState, at: Coord) -> char {
    let dead = state.removed.contains(&at);
    match state.stone_at(at) {
        Some(StoneColor::Black) => {
            if dead {
                DEAD_BLACK_STONE
            } else {
                BLACK_STONE
            }
        }
        Some(StoneColor::White) => {
            if dead {
                DEAD_WHITE_STONE
            } else {
                WHITE_STONE
            }
        }
        None => {
            if hoshi_points(state.size()).contains(&(at.x, at.y)) {
                HOSHI
            } else {
                GRID
            }
        }
    }
}

fn cell_style(state: &GameState, at: Coord, cursor: Option<Coord>) -> Style {
    let base = Style::default().fg(theme::GRID_FG).bg(theme::BOARD_BG);
    if cursor == Some(at) {
        return base.bg(theme::CYAN);
    }
    if let Some(Move::Play(last)) = state.last_move {
        if last == at {
            return base.bg(theme::LAST_MOVE_BG);
        }
    }
    base
}

/// Renders the position (plus an optional cursor) as `size` lines of `size`
/// full-width cells.
pub(crate) fn board_text(state: &GameState, cursor: Option<Coord>) -> Text<'static> {
    let size = state.size();
    let mut lines = Vec::with_capacity(size as usize);
    for y in 0..size {
        let mut spans = Vec::with_capacity(size as usize);
        for x in 0..size {
            let at = Coord { x, y };
            spans.push(Span::styled(cell_glyph(state, at).to_string(), cell_style(state, at, cursor)));
        }
        lines.push(Line::from(spans));
    }
    Text::from(lines)
}
