// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Offline demo server.
//!
//! [`DemoClient`] implements [`GameClient`] against in-memory games played versus a
//! scripted bot, so the interface can be exercised end to end without a network.
//! Queries answer instantly; the bot replies to moves and chat on a short delay
//! from plain threads, which keeps the client free of any runtime dependency.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{
    ActiveGame, ChatLine, ClientError, Clock, Coord, Game, GameClient, GameEvent, GameId,
    GameState, LiveGame, LiveGameList, Move, Overview, Phase, Player, Seat, ServerEvent,
    StoneColor, UserId,
};

const BOT_DELAY: Duration = Duration::from_millis(600);

pub struct DemoClient {
    me: Player,
    bot: Player,
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    server_subs: Mutex<Vec<UnboundedSender<ServerEvent>>>,
    game_subs: Mutex<HashMap<GameId, Vec<UnboundedSender<GameEvent>>>>,
}

struct Inner {
    games: BTreeMap<GameId, DemoGame>,
    chat_seq: u64,
}

struct DemoGame {
    game: Game,
    state: GameState,
    chats: Vec<ChatLine>,
    passes_in_a_row: u8,
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

impl Shared {
    fn emit_server(&self, event: ServerEvent) {
        let mut subs = self.server_subs.lock().expect("server subs lock");
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn emit_game(&self, id: GameId, event: GameEvent) {
        let mut subs = self.game_subs.lock().expect("game subs lock");
        if let Some(senders) = subs.get_mut(&id) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    fn next_chat_id(&self, inner: &mut Inner) -> String {
        inner.chat_seq += 1;
        format!("demo-{}", inner.chat_seq)
    }
}

fn summary(demo: &DemoGame) -> ActiveGame {
    ActiveGame {
        id: demo.game.id,
        name: demo.game.name.clone(),
        width: demo.game.width,
        handicap: demo.game.handicap,
        private: demo.game.private,
        move_number: demo.state.move_number,
        phase: demo.state.phase,
        player_to_move: demo.state.player_to_move,
        black: demo.game.black.clone(),
        white: demo.game.white.clone(),
        clock: demo.game.clock,
    }
}

/// First empty intersection scanning from a seed offset, so consecutive bot
/// moves spread over the board instead of stacking in one corner.
fn bot_point(state: &GameState) -> Option<Coord> {
    let size = state.size();
    let cells = (size as usize) * (size as usize);
    let seed = state.move_number as usize * 7 + 3;
    for step in 0..cells {
        let n = (seed + step * 11) % cells;
        let at = Coord { x: (n % size as usize) as i16, y: (n / size as usize) as i16 };
        if state.stone_at(at).is_none() {
            return Some(at);
        }
    }
    None
}

fn place(demo: &mut DemoGame, at: Coord, color: StoneColor, next: UserId) {
    demo.state.board[at.y as usize][at.x as usize] = Some(color);
    demo.state.last_move = Some(Move::Play(at));
    demo.state.move_number += 1;
    demo.state.player_to_move = next;
    demo.game.clock.current = next;
    demo.passes_in_a_row = 0;
}

impl DemoClient {
    pub fn new() -> Self {
        let me = Player {
            id: UserId(1),
            username: "you".to_owned(),
            ranking: 20,
            professional: false,
        };
        let bot = Player {
            id: UserId(2),
            username: "tenuki-bot".to_owned(),
            ranking: 23,
            professional: false,
        };
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner { games: BTreeMap::new(), chat_seq: 0 }),
            server_subs: Mutex::new(Vec::new()),
            game_subs: Mutex::new(HashMap::new()),
        });
        let client = Self { me, bot, shared };
        client.seed();
        client
    }

    fn seed(&self) {
        let mut inner = self.shared.inner.lock().expect("demo inner lock");
        inner.games.insert(
            GameId(101),
            self.make_game(GameId(101), "Friendly 9x9", 9, StoneColor::Black, true),
        );
        inner.games.insert(
            GameId(102),
            self.make_game(GameId(102), "Teaching game", 13, StoneColor::White, false),
        );
        for demo in inner.games.values_mut() {
            // A token opening so the board is not blank.
            let size = demo.state.size();
            demo.state.board[2][2] = Some(StoneColor::Black);
            demo.state.board[2][size as usize - 3] = Some(StoneColor::White);
            demo.state.move_number = 2;
        }
        let greeting = ChatLine {
            id: "demo-greeting-101".to_owned(),
            at_ms: now_ms() - 60_000,
            move_number: 1,
            from: self.bot.clone(),
            body: "Have a good game!".to_owned(),
        };
        if let Some(demo) = inner.games.get_mut(&GameId(101)) {
            demo.chats.push(greeting);
        }
    }

    fn make_game(
        &self,
        id: GameId,
        name: &str,
        width: u8,
        my_color: StoneColor,
        my_turn: bool,
    ) -> DemoGame {
        let (black, white) = match my_color {
            StoneColor::Black => (self.me.clone(), self.bot.clone()),
            StoneColor::White => (self.bot.clone(), self.me.clone()),
        };
        let to_move = if my_turn { self.me.id } else { self.bot.id };
        let game = Game {
            id,
            name: name.to_owned(),
            width,
            rules: "japanese".to_owned(),
            speed: "correspondence".to_owned(),
            komi: 6.5,
            handicap: 0,
            ranked: false,
            private: false,
            phase: Phase::Play,
            black: Seat { player: black, accepted_stones: None },
            white: Seat { player: white, accepted_stones: None },
            clock: Clock { current: to_move, black_ms: 86_400_000, white_ms: 82_800_000 },
        };
        let state = GameState {
            game_id: id,
            move_number: 0,
            phase: Phase::Play,
            player_to_move: to_move,
            board: vec![vec![None; width as usize]; width as usize],
            last_move: None,
            removed: Vec::new(),
            outcome: None,
        };
        DemoGame { game, state, chats: Vec::new(), passes_in_a_row: 0 }
    }

    fn my_color(&self, demo: &DemoGame) -> Option<StoneColor> {
        demo.game.color_of(self.me.id)
    }

    /// Bot answer on a delay: a move while playing, an acceptance in removal.
    fn schedule_bot(&self, id: GameId) {
        let shared = self.shared.clone();
        let bot = self.bot.clone();
        let me = self.me.id;
        thread::spawn(move || {
            thread::sleep(BOT_DELAY);
            let mut inner = shared.inner.lock().expect("demo inner lock");
            let Some(demo) = inner.games.get_mut(&id) else { return };
            match demo.state.phase {
                Phase::Play if demo.state.player_to_move == bot.id => {
                    let Some(at) = bot_point(&demo.state) else { return };
                    let color = demo.game.color_of(bot.id).unwrap_or(StoneColor::White);
                    place(demo, at, color, me);
                    let move_number = demo.state.move_number;
                    let active = summary(demo);
                    let clock = demo.game.clock;
                    let chat = (move_number % 5 == 0).then(|| ChatLine {
                        id: shared.next_chat_id(&mut inner),
                        at_ms: now_ms(),
                        move_number,
                        from: bot.clone(),
                        body: "Interesting position.".to_owned(),
                    });
                    if let Some(line) = &chat {
                        if let Some(demo) = inner.games.get_mut(&id) {
                            demo.chats.push(line.clone());
                        }
                    }
                    drop(inner);
                    shared.emit_game(id, GameEvent::Move { move_number, mv: Move::Play(at) });
                    shared.emit_game(id, GameEvent::Clock(clock));
                    if let Some(line) = chat {
                        shared.emit_game(id, GameEvent::Chat(line));
                    }
                    shared.emit_server(ServerEvent::ActiveGame(active));
                }
                Phase::StoneRemoval => {
                    let bot_seat = match demo.game.color_of(bot.id) {
                        Some(StoneColor::Black) => &mut demo.game.black,
                        _ => &mut demo.game.white,
                    };
                    bot_seat.accepted_stones = Some(String::new());
                    let both = demo.game.black.accepted_stones.is_some()
                        && demo.game.white.accepted_stones.is_some();
                    let outcome = both.then(|| "W+1.5".to_owned());
                    if both {
                        demo.state.phase = Phase::Finished;
                        demo.game.phase = Phase::Finished;
                        demo.state.outcome = outcome.clone();
                    }
                    let phase = demo.state.phase;
                    let active = summary(demo);
                    drop(inner);
                    shared.emit_game(
                        id,
                        GameEvent::RemovalAccepted { player: bot.id, phase, outcome },
                    );
                    if phase == Phase::Finished {
                        shared.emit_game(id, GameEvent::Phase(Phase::Finished));
                    }
                    shared.emit_server(ServerEvent::ActiveGame(active));
                }
                _ => {}
            }
        });
    }
}

impl Default for DemoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GameClient for DemoClient {
    fn user_id(&self) -> UserId {
        self.me.id
    }

    fn overview(&self) -> Result<Overview, ClientError> {
        let inner = self.shared.inner.lock().expect("demo inner lock");
        let active_games = inner
            .games
            .values()
            .filter(|demo| demo.state.phase != Phase::Finished)
            .map(summary)
            .collect();
        Ok(Overview { active_games })
    }

    fn live_games(&self, limit: usize) -> Result<LiveGameList, ClientError> {
        // The in-memory games come first so they can actually be spectated;
        // the synthetic entries only fill out the listing.
        let inner = self.shared.inner.lock().expect("demo inner lock");
        let mut results: Vec<LiveGame> = inner
            .games
            .values()
            .filter(|demo| demo.state.phase != Phase::Finished)
            .map(|demo| LiveGame {
                id: demo.game.id,
                name: demo.game.name.clone(),
                width: demo.game.width,
                handicap: demo.game.handicap,
                komi: demo.game.komi,
                move_number: demo.state.move_number,
                phase: demo.state.phase,
                bot_game: true,
                private: demo.game.private,
                black: demo.game.black.player.clone(),
                white: demo.game.white.player.clone(),
            })
            .collect();
        drop(inner);
        let synthetic: Vec<LiveGame> = (0..6)
            .map(|i| LiveGame {
                id: GameId(900 + i),
                name: format!("Spectator game {}", i + 1),
                width: if i % 2 == 0 { 19 } else { 9 },
                handicap: (i % 3) as u8,
                komi: 6.5,
                move_number: 40 + i as u32 * 17,
                phase: Phase::Play,
                bot_game: i % 3 == 0,
                private: false,
                black: Player {
                    id: UserId(500 + i),
                    username: format!("black{}", i + 1),
                    ranking: 25 + i as i32,
                    professional: false,
                },
                white: Player {
                    id: UserId(600 + i),
                    username: format!("white{}", i + 1),
                    ranking: 26 + i as i32,
                    professional: i == 5,
                },
            })
            .collect();
        results.extend(synthetic);
        results.truncate(limit);
        Ok(LiveGameList { total: results.len() as u32, results })
    }

    fn game(&self, id: GameId) -> Result<Game, ClientError> {
        let inner = self.shared.inner.lock().expect("demo inner lock");
        inner.games.get(&id).map(|demo| demo.game.clone()).ok_or(ClientError::GameNotFound(id))
    }

    fn game_state(&self, id: GameId) -> Result<GameState, ClientError> {
        let inner = self.shared.inner.lock().expect("demo inner lock");
        inner.games.get(&id).map(|demo| demo.state.clone()).ok_or(ClientError::GameNotFound(id))
    }

    fn connect_game(&self, id: GameId) -> Result<(), ClientError> {
        let inner = self.shared.inner.lock().expect("demo inner lock");
        inner.games.contains_key(&id).then_some(()).ok_or(ClientError::GameNotFound(id))
    }

    fn disconnect_game(&self, _id: GameId) -> Result<(), ClientError> {
        Ok(())
    }

    fn join_chat(&self, id: GameId) -> Result<(), ClientError> {
        self.connect_game(id)
    }

    fn submit_move(&self, id: GameId, at: Coord) -> Result<(), ClientError> {
        let mut inner = self.shared.inner.lock().expect("demo inner lock");
        let Some(demo) = inner.games.get_mut(&id) else {
            return Err(ClientError::GameNotFound(id));
        };
        if demo.state.phase != Phase::Play || demo.state.player_to_move != self.me.id {
            return Err(ClientError::Rejected("not your turn".to_owned()));
        }
        if demo.state.stone_at(at).is_some() {
            return Err(ClientError::Rejected("intersection is occupied".to_owned()));
        }
        let Some(color) = self.my_color(demo) else {
            return Err(ClientError::Rejected("not a player in this game".to_owned()));
        };
        place(demo, at, color, self.bot.id);
        let move_number = demo.state.move_number;
        let active = summary(demo);
        let clock = demo.game.clock;
        drop(inner);
        self.shared.emit_game(id, GameEvent::Move { move_number, mv: Move::Play(at) });
        self.shared.emit_game(id, GameEvent::Clock(clock));
        self.shared.emit_server(ServerEvent::ActiveGame(active));
        self.schedule_bot(id);
        Ok(())
    }

    fn pass(&self, id: GameId) -> Result<(), ClientError> {
        let mut inner = self.shared.inner.lock().expect("demo inner lock");
        let Some(demo) = inner.games.get_mut(&id) else {
            return Err(ClientError::GameNotFound(id));
        };
        if demo.state.phase != Phase::Play || demo.state.player_to_move != self.me.id {
            return Err(ClientError::Rejected("not your turn".to_owned()));
        }
        demo.state.last_move = Some(Move::Pass);
        demo.state.move_number += 1;
        demo.state.player_to_move = self.bot.id;
        demo.game.clock.current = self.bot.id;
        demo.passes_in_a_row += 1;
        // The scripted opponent answers a pass with a pass.
        let removal = demo.passes_in_a_row >= 1;
        if removal {
            demo.state.phase = Phase::StoneRemoval;
            demo.game.phase = Phase::StoneRemoval;
        }
        let move_number = demo.state.move_number;
        let active = summary(demo);
        drop(inner);
        self.shared.emit_game(id, GameEvent::Move { move_number, mv: Move::Pass });
        if removal {
            self.shared.emit_game(id, GameEvent::Phase(Phase::StoneRemoval));
        }
        self.shared.emit_server(ServerEvent::ActiveGame(active));
        Ok(())
    }

    fn resign(&self, id: GameId) -> Result<(), ClientError> {
        let mut inner = self.shared.inner.lock().expect("demo inner lock");
        let Some(demo) = inner.games.get_mut(&id) else {
            return Err(ClientError::GameNotFound(id));
        };
        if demo.state.phase == Phase::Finished {
            return Err(ClientError::Rejected("game is already over".to_owned()));
        }
        let outcome = match self.my_color(demo) {
            Some(StoneColor::Black) => "W+Res",
            Some(StoneColor::White) => "B+Res",
            None => return Err(ClientError::Rejected("not a player in this game".to_owned())),
        };
        demo.state.phase = Phase::Finished;
        demo.game.phase = Phase::Finished;
        demo.state.outcome = Some(outcome.to_owned());
        let active = summary(demo);
        drop(inner);
        self.shared.emit_game(id, GameEvent::Phase(Phase::Finished));
        self.shared.emit_server(ServerEvent::ActiveGame(active));
        Ok(())
    }

    fn accept_removal(&self, id: GameId) -> Result<(), ClientError> {
        let mut inner = self.shared.inner.lock().expect("demo inner lock");
        let Some(demo) = inner.games.get_mut(&id) else {
            return Err(ClientError::GameNotFound(id));
        };
        if demo.state.phase != Phase::StoneRemoval {
            return Err(ClientError::Rejected("game is not in stone removal".to_owned()));
        }
        let seat = match self.my_color(demo) {
            Some(StoneColor::Black) => &mut demo.game.black,
            Some(StoneColor::White) => &mut demo.game.white,
            None => return Err(ClientError::Rejected("not a player in this game".to_owned())),
        };
        seat.accepted_stones = Some(String::new());
        let phase = demo.state.phase;
        let active = summary(demo);
        drop(inner);
        self.shared
            .emit_game(id, GameEvent::RemovalAccepted { player: self.me.id, phase, outcome: None });
        self.shared.emit_server(ServerEvent::ActiveGame(active));
        self.schedule_bot(id);
        Ok(())
    }

    fn send_chat(&self, id: GameId, move_number: u32, body: &str) -> Result<(), ClientError> {
        let mut inner = self.shared.inner.lock().expect("demo inner lock");
        if !inner.games.contains_key(&id) {
            return Err(ClientError::GameNotFound(id));
        }
        let line = ChatLine {
            id: self.shared.next_chat_id(&mut inner),
            at_ms: now_ms(),
            move_number,
            from: self.me.clone(),
            body: body.to_owned(),
        };
        if let Some(demo) = inner.games.get_mut(&id) {
            demo.chats.push(line.clone());
        }
        drop(inner);
        self.shared.emit_game(id, GameEvent::Chat(line));
        Ok(())
    }

    fn ping(&self, _drift_ms: i64, _latency_ms: i64) -> Result<(), ClientError> {
        let shared = self.shared.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            shared.emit_server(ServerEvent::NetPong { drift_ms: 4, latency_ms: 32 });
        });
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.server_subs.lock().expect("server subs lock").push(tx);
        rx
    }

    /// Chat history is replayed into every new subscription, out of order on
    /// purpose so the timeline's sorting is exercised in the demo too.
    fn subscribe_game(&self, id: GameId) -> UnboundedReceiver<GameEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = self.shared.inner.lock().expect("demo inner lock");
        if let Some(demo) = inner.games.get(&id) {
            for line in demo.chats.iter().rev() {
                let _ = tx.send(GameEvent::Chat(line.clone()));
            }
        }
        drop(inner);
        self.shared.game_subs.lock().expect("game subs lock").entry(id).or_default().push(tx);
        rx
    }
}
