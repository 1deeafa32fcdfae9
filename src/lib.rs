// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Tesuji — a terminal client for correspondence Go.
//!
//! The crate is organized around a single-consumer display loop: [`sched`] carries
//! work units from background tasks to the UI, [`load`] debounces slow fetches,
//! [`notify`] and [`chat`] hold the shared game state that arrives over the
//! [`client`] event streams, and [`tui`] owns the terminal.

pub mod chat;
pub mod client;
pub mod load;
pub mod notify;
pub mod sched;
pub mod tui;
