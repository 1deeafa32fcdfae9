// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Solarized-dark palette and the handful of styles the pages share.

use ratatui::style::{Color, Modifier, Style};

pub(crate) const BASE03: Color = Color::Rgb(0x00, 0x2b, 0x36);
pub(crate) const BASE02: Color = Color::Rgb(0x07, 0x36, 0x42);
pub(crate) const BASE01: Color = Color::Rgb(0x58, 0x6e, 0x75);
pub(crate) const BASE00: Color = Color::Rgb(0x65, 0x7b, 0x83);
pub(crate) const BASE0: Color = Color::Rgb(0x83, 0x94, 0x96);
pub(crate) const BASE1: Color = Color::Rgb(0x93, 0xa1, 0xa1);
pub(crate) const ORANGE: Color = Color::Rgb(0xcb, 0x4b, 0x16);
pub(crate) const RED: Color = Color::Rgb(0xdc, 0x32, 0x2f);
pub(crate) const CYAN: Color = Color::Rgb(0x2a, 0xa1, 0x98);
pub(crate) const GREEN: Color = Color::Rgb(0x85, 0x99, 0x00);

// Board colors, picked to carry full-width stone glyphs.
pub(crate) const BOARD_BG: Color = Color::Rgb(0x7c, 0x4c, 0x38);
pub(crate) const GRID_FG: Color = Color::Rgb(0x1f, 0x1f, 0x1f);
pub(crate) const LAST_MOVE_BG: Color = Color::Rgb(0xa9, 0xa9, 0xa9);

pub(crate) fn base() -> Style {
    Style::default().fg(BASE0).bg(BASE03)
}

pub(crate) fn secondary() -> Style {
    base().fg(BASE1)
}

pub(crate) fn tertiary() -> Style {
    base().fg(BASE00)
}

/// Border/title style for a panel, brightened while it owns focus.
pub(crate) fn panel_border(focused: bool) -> Style {
    if focused {
        base().fg(BASE0).add_modifier(Modifier::BOLD)
    } else {
        base().fg(BASE01)
    }
}

pub(crate) fn selection() -> Style {
    base().add_modifier(Modifier::REVERSED | Modifier::BOLD)
}

pub(crate) fn error() -> Style {
    base().fg(RED)
}

pub(crate) fn warning() -> Style {
    base().fg(ORANGE)
}

pub(crate) fn success() -> Style {
    base().fg(GREEN)
}

pub(crate) fn contrast_panel() -> Style {
    Style::default().fg(BASE1).bg(BASE02)
}
