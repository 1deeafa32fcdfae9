// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Small shared drawing helpers: the navbar button row, centered modals, and
//! width-aware text trimming for table cells.

use ratatui::layout::{Alignment, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use super::theme;

pub(crate) const NAV_BUTTON_WIDTH: u16 = 10;

/// Trims `s` to at most `max` display columns, never splitting a wide character.
pub(crate) fn trim_to_width(s: &str, max: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for ch in s.chars() {
        width += ch.width().unwrap_or(0);
        if width > max {
            break;
        }
        out.push(ch);
    }
    out
}

/// A `width`x`height` rect centered inside `area`, clamped to it.
pub(crate) fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Draws the right-aligned row of navigation buttons; `focused` marks at most one.
pub(crate) fn draw_navbar(frame: &mut Frame<'_>, area: Rect, labels: &[&str], focused: Option<usize>) {
    let count = labels.len() as u16;
    if count == 0 || area.height == 0 {
        return;
    }
    let total = count * NAV_BUTTON_WIDTH + (count - 1);
    let mut x = area.right().saturating_sub(total).max(area.x);
    for (i, label) in labels.iter().enumerate() {
        let rect = Rect {
            x,
            y: area.y,
            width: NAV_BUTTON_WIDTH.min(area.right().saturating_sub(x)),
            height: 1,
        };
        if rect.width == 0 {
            break;
        }
        let style = if focused == Some(i) { theme::selection() } else { theme::contrast_panel() };
        frame.render_widget(
            Paragraph::new(Line::from(label.to_string())).alignment(Alignment::Center).style(style),
            rect,
        );
        x += NAV_BUTTON_WIDTH + 1;
    }
}

/// Draws a centered modal with a message and an optional button row; returns
/// nothing, callers route keys themselves.
pub(crate) fn draw_modal(
    frame: &mut Frame<'_>,
    area: Rect,
    message: &str,
    buttons: &[&str],
    selected: usize,
) {
    let width = (message.lines().map(str::len).max().unwrap_or(0) as u16 + 6)
        .max(buttons.len() as u16 * (NAV_BUTTON_WIDTH + 2))
        .clamp(24, area.width);
    let message_rows = message.lines().count() as u16;
    let height = (message_rows + if buttons.is_empty() { 2 } else { 4 }).min(area.height);
    let rect = centered_rect(area, width, height);

    frame.render_widget(Clear, rect);
    let block = Block::default().borders(Borders::ALL).style(theme::contrast_panel());
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let text_rect = Rect { height: message_rows.min(inner.height), ..inner };
    frame.render_widget(
        Paragraph::new(message.to_owned())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(theme::contrast_panel()),
        text_rect,
    );

    if !buttons.is_empty() && inner.height >= 2 {
        let row = Rect { y: inner.bottom() - 1, height: 1, ..inner };
        let total = buttons.len() as u16 * (NAV_BUTTON_WIDTH + 1);
        let mut x = row.x + row.width.saturating_sub(total) / 2;
        for (i, label) in buttons.iter().enumerate() {
            let rect = Rect { x, y: row.y, width: NAV_BUTTON_WIDTH, height: 1 };
            let style = if i == selected { theme::selection() } else { theme::tertiary() };
            frame.render_widget(
                Paragraph::new(Line::from(label.to_string()))
                    .alignment(Alignment::Center)
                    .style(style),
                rect,
            );
            x += NAV_BUTTON_WIDTH + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::layout::Rect;

    use super::{centered_rect, trim_to_width};

    #[test]
    fn trim_respects_display_width_of_wide_chars() {
        assert_eq!(trim_to_width("hello", 10), "hello");
        assert_eq!(trim_to_width("hello", 3), "hel");
        // Each stone glyph is two columns wide.
        assert_eq!(trim_to_width("⚫⚫⚫", 4), "⚫⚫");
        assert_eq!(trim_to_width("a⚫b", 2), "a");
    }

    #[test]
    fn centered_rect_is_clamped_and_centered() {
        let area = Rect::new(0, 0, 80, 24);
        let rect = centered_rect(area, 40, 10);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (20, 7, 40, 10));

        let big = centered_rect(area, 200, 100);
        assert_eq!((big.width, big.height), (80, 24));
    }
}
