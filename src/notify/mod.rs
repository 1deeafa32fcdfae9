// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Turn notifications.
//!
//! [`TurnQueue`] tracks which of my games currently require an action, keyed by game
//! id. Server events drive [`TurnQueue::upsert`]; the `N` shortcut walks the queue
//! with [`TurnQueue::next`], which cycles through the present ids in ascending order
//! so every waiting game is visited exactly once per round, independent of arrival
//! order. Shared across tasks; the internal lock is never held across a redraw.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;

use crate::client::{ActiveGame, GameId};

#[derive(Debug, Default)]
pub struct TurnQueue {
    entries: Mutex<BTreeMap<GameId, ActiveGame>>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether `id` requires action. Inserts or replaces the summary when
    /// `actionable`, removes any entry otherwise. Idempotent.
    pub fn upsert(&self, id: GameId, summary: ActiveGame, actionable: bool) {
        let mut entries = self.entries.lock().expect("turn queue lock");
        if actionable {
            entries.insert(id, summary);
        } else {
            entries.remove(&id);
        }
    }

    /// Returns the entry after `current` in ascending id order, wrapping to the
    /// smallest id when `current` is the largest. When `current` is not in the
    /// queue at all (e.g. while on the home page) the smallest id is returned.
    /// `None` only when the queue is empty.
    pub fn next(&self, current: GameId) -> Option<ActiveGame> {
        let entries = self.entries.lock().expect("turn queue lock");
        let after = if entries.contains_key(&current) {
            entries.range((Bound::Excluded(current), Bound::Unbounded)).next()
        } else {
            None
        };
        after.or_else(|| entries.iter().next()).map(|(_, summary)| summary.clone())
    }

    /// Number of games awaiting action, shown as the `Next (n)` badge.
    pub fn count(&self) -> usize {
        self.entries.lock().expect("turn queue lock").len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::TurnQueue;
    use crate::client::{ActiveGame, Clock, GameId, Phase, Player, Seat, UserId};

    fn summary(id: i64) -> ActiveGame {
        let seat = |uid: i64| Seat {
            player: Player {
                id: UserId(uid),
                username: format!("p{uid}"),
                ranking: 15,
                professional: false,
            },
            accepted_stones: None,
        };
        ActiveGame {
            id: GameId(id),
            name: format!("game {id}"),
            width: 19,
            handicap: 0,
            private: false,
            move_number: 1,
            phase: Phase::Play,
            player_to_move: UserId(1),
            black: seat(1),
            white: seat(2),
            clock: Clock { current: UserId(1), black_ms: 0, white_ms: 0 },
        }
    }

    fn queue_with(ids: &[i64]) -> TurnQueue {
        let queue = TurnQueue::new();
        for &id in ids {
            queue.upsert(GameId(id), summary(id), true);
        }
        queue
    }

    #[rstest]
    #[case(5, 9)] // strictly after current
    #[case(9, 2)] // wraps from the largest
    #[case(1, 2)] // absent current falls back to the smallest
    #[case(3, 2)] // absent current between entries also falls back to the smallest
    fn next_cycles_in_ascending_order(#[case] current: i64, #[case] expected: i64) {
        let queue = queue_with(&[2, 5, 9]);
        let next = queue.next(GameId(current)).expect("non-empty queue");
        assert_eq!(next.id, GameId(expected));
    }

    #[test]
    fn next_visits_every_entry_once_per_cycle() {
        let queue = queue_with(&[2, 5, 9]);
        let mut current = GameId(2);
        let mut seen = Vec::new();
        for _ in 0..3 {
            current = queue.next(current).expect("non-empty queue").id;
            seen.push(current.0);
        }
        assert_eq!(seen, vec![5, 9, 2]);
    }

    #[test]
    fn next_on_empty_queue_is_none() {
        let queue = TurnQueue::new();
        assert!(queue.next(GameId(1)).is_none());
        assert_eq!(queue.count(), 0);
    }

    #[test]
    fn upsert_with_false_removes_and_is_idempotent() {
        let queue = queue_with(&[2, 5]);
        queue.upsert(GameId(5), summary(5), false);
        queue.upsert(GameId(5), summary(5), false);
        assert_eq!(queue.count(), 1);
        // A removed entry is never returned again.
        assert_eq!(queue.next(GameId(2)).expect("entry").id, GameId(2));
        assert_eq!(queue.next(GameId(5)).expect("entry").id, GameId(2));
    }

    #[test]
    fn upsert_replaces_the_summary_in_place() {
        let queue = queue_with(&[2]);
        let mut updated = summary(2);
        updated.move_number = 42;
        queue.upsert(GameId(2), updated, true);
        assert_eq!(queue.count(), 1);
        assert_eq!(queue.next(GameId(9)).expect("entry").move_number, 42);
    }

    #[tokio::test]
    async fn concurrent_upserts_settle_to_a_consistent_count() {
        let queue = Arc::new(TurnQueue::new());
        let mut handles = Vec::new();
        for id in 0..32 {
            let queue = queue.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                for round in 0..50 {
                    queue.upsert(GameId(id), summary(id), round % 2 == 0);
                }
                // Last round leaves even ids present.
                queue.upsert(GameId(id), summary(id), id % 2 == 0);
            }));
        }
        for handle in handles {
            handle.await.expect("writer");
        }
        assert_eq!(queue.count(), 16);
    }
}
