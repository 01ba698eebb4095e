use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

use crate::ai::{self, PriorityStrategy, Strategy};
use crate::card::{CardId, Color, Deck};
use crate::config::ServerConfig;
use crate::events::{ConnectionId, GameEvent, Seat, UnoMode};
use crate::game::{GameError, GameSession};
use crate::lobby::{lock_mutex, Lobby, LobbyCode, LobbyError};
use crate::logging;
use crate::net::protocol::ServerMessage;

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
	pub to: ConnectionId,
	pub message: ServerMessage,
}

/// Deferred work that re-enters the manager through [`LobbyManager::fire_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
	UnoGraceExpired { token: u64 },
	AiCallUno { seat: Seat, token: u64 },
	AiCatchUno { seat: Seat, token: u64 },
	AiTurn { seat: Seat, serial: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
	pub code: LobbyCode,
	pub delay: Duration,
	pub kind: TimerKind,
}

/// Everything an operation wants sent or scheduled. The gateway only transports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
	pub deliveries: Vec<Delivery>,
	pub timers: Vec<Timer>,
}

impl Reaction {
	fn send(&mut self, to: ConnectionId, message: ServerMessage) {
		self.deliveries.push(Delivery { to, message });
	}

	fn broadcast(&mut self, to: &[ConnectionId], message: &ServerMessage) {
		for &conn in to {
			self.send(conn, message.clone());
		}
	}

	fn error(to: ConnectionId, error: impl ToString) -> Self {
		let mut reaction = Self::default();
		reaction.send(to, ServerMessage::Error { error: error.to_string() });
		reaction
	}

	fn join_error(to: ConnectionId, error: impl ToString) -> Self {
		let mut reaction = Self::default();
		reaction.send(to, ServerMessage::JoinError { error: error.to_string() });
		reaction
	}

	pub fn extend(&mut self, other: Reaction) {
		self.deliveries.extend(other.deliveries);
		self.timers.extend(other.timers);
	}

	pub fn is_empty(&self) -> bool {
		self.deliveries.is_empty() && self.timers.is_empty()
	}

	pub fn messages_for(&self, conn: ConnectionId) -> impl Iterator<Item = &ServerMessage> {
		self.deliveries.iter().filter(move |d| d.to == conn).map(|d| &d.message)
	}
}

/// Where deliveries go once a lobby operation commits.
///
/// With a sink attached, messages are handed over while the lobby lock is
/// still held, so every recipient sees a lobby's updates in the order they
/// were applied. The returned [`Reaction`] then only carries timers.
pub trait MessageSink: Send + Sync {
	fn send(&self, delivery: Delivery);
}

type SharedLobby = Arc<Mutex<Lobby>>;

/// Registry of live lobbies.
///
/// The registry lock is only held to look up, insert or remove an entry. All
/// work on a lobby happens under that lobby's own lock, so actions for one
/// code run strictly one at a time while different lobbies proceed in
/// parallel. A lobby lock may take the registry lock (to drop an emptied
/// lobby) but never the reverse.
pub struct LobbyManager {
	config: ServerConfig,
	strategy: Box<dyn Strategy>,
	lobbies: Mutex<HashMap<LobbyCode, SharedLobby>>,
	rng: Mutex<StdRng>,
	sink: Option<Arc<dyn MessageSink>>,
}

impl LobbyManager {
	pub fn new(config: ServerConfig) -> Self {
		Self::with_strategy(config, Box::new(PriorityStrategy))
	}

	pub fn with_strategy(config: ServerConfig, strategy: Box<dyn Strategy>) -> Self {
		let rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};
		Self {
			config,
			strategy,
			lobbies: Mutex::new(HashMap::new()),
			rng: Mutex::new(rng),
			sink: None,
		}
	}

	pub fn set_sink(&mut self, sink: Arc<dyn MessageSink>) {
		self.sink = Some(sink);
	}

	/// Must be called with the lobby lock held.
	fn commit(&self, mut reaction: Reaction) -> Reaction {
		if let Some(sink) = &self.sink {
			for delivery in reaction.deliveries.drain(..) {
				sink.send(delivery);
			}
		}
		reaction
	}

	pub fn config(&self) -> &ServerConfig {
		&self.config
	}

	pub fn lobby_count(&self) -> usize {
		lock_mutex(&self.lobbies).len()
	}

	pub fn lobby_codes(&self) -> Vec<LobbyCode> {
		lock_mutex(&self.lobbies).keys().cloned().collect()
	}

	/// Runs `f` against a lobby under its lock. Test and tooling hook.
	pub fn inspect<T>(&self, code: &LobbyCode, f: impl FnOnce(&Lobby) -> T) -> Option<T> {
		let lobby = self.find(code)?;
		let guard = lock_mutex(&lobby);
		if guard.is_empty() {
			return None;
		}
		Some(f(&guard))
	}

	fn find(&self, code: &LobbyCode) -> Option<SharedLobby> {
		lock_mutex(&self.lobbies).get(code).cloned()
	}

	/// Drops the entry only if it still points at this lobby.
	fn remove_if_same(&self, code: &LobbyCode, lobby: &SharedLobby) {
		let mut lobbies = lock_mutex(&self.lobbies);
		if lobbies.get(code).is_some_and(|l| Arc::ptr_eq(l, lobby)) {
			lobbies.remove(code);
			logging::lobby::closed(code.as_str());
		}
	}

	pub fn create_lobby(&self, conn: ConnectionId, player_name: &str, password: Option<String>) -> (LobbyCode, Reaction) {
		let mut lobbies = lock_mutex(&self.lobbies);
		let code = {
			let mut rng = lock_mutex(&self.rng);
			loop {
				let code = LobbyCode::generate(&mut *rng);
				if !lobbies.contains_key(&code) {
					break code;
				}
			}
		};

		let lobby = Lobby::new(code.clone(), conn, player_name, password, self.config.max_players);
		let mut reaction = Reaction::default();
		reaction.send(conn, ServerMessage::LobbyCreated(lobby.snapshot()));
		lobbies.insert(code.clone(), Arc::new(Mutex::new(lobby)));
		// Queued before anyone can find the lobby to join it.
		let reaction = self.commit(reaction);
		drop(lobbies);

		logging::lobby::created(code.as_str(), player_name);
		(code, reaction)
	}

	pub fn join_lobby(
		&self,
		conn: ConnectionId,
		code: &LobbyCode,
		player_name: &str,
		password: Option<&str>,
	) -> Reaction {
		let Some(shared) = self.find(code) else {
			return Reaction::join_error(conn, LobbyError::NotFound);
		};
		let mut lobby = lock_mutex(&shared);
		if lobby.is_empty() {
			return Reaction::join_error(conn, LobbyError::NotFound);
		}

		let password = password.filter(|p| !p.is_empty());
		if let Err(e) = lobby.join(conn, player_name, password) {
			logging::lobby::rejected(code.as_str(), conn.0, &e.to_string());
			return Reaction::join_error(conn, e);
		}

		logging::lobby::joined(code.as_str(), player_name);
		let mut reaction = Reaction::default();
		reaction.send(conn, ServerMessage::LobbyJoined(lobby.snapshot()));
		reaction.broadcast(&lobby.connections(), &ServerMessage::LobbyUpdated(lobby.snapshot()));
		self.commit(reaction)
	}

	pub fn add_ai(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		self.with_lobby(conn, code, |lobby| {
			let name = lobby.add_ai(conn)?.name.clone();
			logging::lobby::ai_added(lobby.code().as_str(), &name);
			Ok(lobby_updated(lobby))
		})
	}

	/// An unknown id changes nothing, but the room still gets the current lobby.
	pub fn remove_ai(&self, conn: ConnectionId, code: &LobbyCode, ai_id: &str) -> Reaction {
		self.with_lobby(conn, code, |lobby| {
			if lobby.remove_ai(conn, ai_id)? {
				logging::lobby::ai_removed(lobby.code().as_str(), ai_id);
			}
			Ok(lobby_updated(lobby))
		})
	}

	/// Silently ignored when the lobby or the player is unknown.
	pub fn toggle_ready(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		let Some(shared) = self.find(code) else {
			return Reaction::default();
		};
		let mut lobby = lock_mutex(&shared);
		if !lobby.toggle_ready(conn) {
			return Reaction::default();
		}
		self.commit(lobby_updated(&lobby))
	}

	pub fn start_game(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		self.with_lobby(conn, code, |lobby| {
			let deck = Deck::build(&mut *lock_mutex(&self.rng));
			lobby.start_game(conn, deck, self.config.rules())?;

			let mut reaction = Reaction::default();
			for player in lobby.connections() {
				reaction.send(player, ServerMessage::GameStarted(lobby.snapshot_for(player)));
			}

			if let Some(game) = lobby.game() {
				logging::lobby::game_started(code.as_str(), game.seat_count());
				// Exposures at deal time only happen with one-card hands.
				let opening: Vec<GameEvent> = game
					.pending_uno()
					.map(|p| GameEvent::UnoExposed { seat: p.target })
					.into_iter()
					.collect();
				self.schedule(code, game, &opening, true, &mut reaction);
			}
			Ok(reaction)
		})
	}

	/// Relays an opaque action to everyone else in the room. Nothing here is
	/// validated beyond membership and a started game; clients are trusted
	/// with whatever they put in `action` and `data`.
	pub fn game_action(&self, conn: ConnectionId, code: &LobbyCode, action: Value, data: Value) -> Reaction {
		let Some(shared) = self.find(code) else {
			return Reaction::default();
		};
		let lobby = lock_mutex(&shared);
		if !lobby.game_started() || !lobby.is_member(conn) {
			return Reaction::default();
		}

		let others: Vec<ConnectionId> = lobby.connections().into_iter().filter(|&c| c != conn).collect();
		let mut reaction = Reaction::default();
		reaction.broadcast(&others, &ServerMessage::GameAction { action, data, player_id: conn });
		self.commit(reaction)
	}

	pub fn leave_lobby(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		match self.find(code) {
			Some(shared) => self.depart(conn, code, &shared),
			None => Reaction::default(),
		}
	}

	/// Leaves every lobby the connection occupies.
	pub fn disconnect(&self, conn: ConnectionId) -> Reaction {
		let all: Vec<(LobbyCode, SharedLobby)> = lock_mutex(&self.lobbies)
			.iter()
			.map(|(code, lobby)| (code.clone(), Arc::clone(lobby)))
			.collect();

		let mut reaction = Reaction::default();
		for (code, shared) in all {
			reaction.extend(self.depart(conn, &code, &shared));
		}
		reaction
	}

	fn depart(&self, conn: ConnectionId, code: &LobbyCode, shared: &SharedLobby) -> Reaction {
		let mut lobby = lock_mutex(shared);
		let Some(departure) = lobby.remove_player(conn) else {
			return Reaction::default();
		};
		logging::lobby::left(code.as_str(), conn.0);

		if lobby.is_empty() {
			self.remove_if_same(code, shared);
			return Reaction::default();
		}
		if let Some(host) = departure.new_host {
			logging::lobby::host_changed(code.as_str(), host.0);
		}

		let room = lobby.connections();
		let mut reaction = Reaction::default();
		reaction.broadcast(&room, &ServerMessage::PlayerLeft { player_id: conn });
		reaction.broadcast(&room, &ServerMessage::LobbyUpdated(lobby.snapshot()));
		if !departure.events.is_empty() {
			self.publish(&lobby, &departure.events, &mut reaction);
		}
		self.commit(reaction)
	}

	pub fn play_card(
		&self,
		conn: ConnectionId,
		code: &LobbyCode,
		card_id: CardId,
		chosen_color: Option<Color>,
	) -> Reaction {
		self.with_game(conn, code, |game, seat| game.play_card(seat, card_id, chosen_color))
	}

	/// Drawing on your turn takes one card and ends the turn.
	pub fn draw_card(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		self.with_game(conn, code, |game, seat| game.draw_for_turn(seat))
	}

	pub fn pass_turn(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		self.with_game(conn, code, |game, seat| game.pass_turn(seat))
	}

	pub fn call_uno(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		self.with_game(conn, code, |game, seat| game.call_uno(seat))
	}

	pub fn catch_uno(&self, conn: ConnectionId, code: &LobbyCode) -> Reaction {
		self.with_game(conn, code, |game, seat| game.catch_uno(seat))
	}

	/// Timers run under the same lobby lock as player actions. Anything the
	/// game has moved past since scheduling is dropped.
	pub fn fire_timer(&self, code: &LobbyCode, kind: TimerKind) -> Reaction {
		let Some(shared) = self.find(code) else {
			return Reaction::default();
		};
		let mut lobby = lock_mutex(&shared);
		let Some(game) = lobby.game_mut() else {
			return Reaction::default();
		};

		let events = match kind {
			TimerKind::UnoGraceExpired { token } => game.expire_grace(token),
			TimerKind::AiCallUno { seat, token } => {
				if !pending_matches(game, seat, token, UnoMode::Call) || !game.is_ai(seat) {
					Vec::new()
				} else {
					game.call_uno(seat).unwrap_or_default()
				}
			}
			TimerKind::AiCatchUno { seat, token } => {
				let open = game
					.pending_uno()
					.is_some_and(|p| p.token == token && p.mode == UnoMode::Catch && p.target != seat);
				if !open || !game.is_ai(seat) {
					Vec::new()
				} else {
					game.catch_uno(seat).unwrap_or_default()
				}
			}
			TimerKind::AiTurn { seat, serial } => {
				if game.is_over() || game.turn_serial() != serial || game.current_seat() != seat || !game.is_ai(seat) {
					Vec::new()
				} else {
					ai::play_turn(self.strategy.as_ref(), game, seat)
				}
			}
		};

		if events.is_empty() {
			logging::game::timer_ignored(code.as_str(), &format!("{:?}", kind), "stale");
			return Reaction::default();
		}

		let mut reaction = Reaction::default();
		self.publish(&lobby, &events, &mut reaction);
		self.commit(reaction)
	}

	fn with_lobby<F>(&self, conn: ConnectionId, code: &LobbyCode, f: F) -> Reaction
	where
		F: FnOnce(&mut Lobby) -> Result<Reaction, LobbyError>,
	{
		let Some(shared) = self.find(code) else {
			return Reaction::error(conn, LobbyError::NotFound);
		};
		let mut lobby = lock_mutex(&shared);
		if lobby.is_empty() {
			return Reaction::error(conn, LobbyError::NotFound);
		}

		let reaction = f(&mut *lobby).unwrap_or_else(|e| {
			logging::lobby::rejected(code.as_str(), conn.0, &e.to_string());
			Reaction::error(conn, e)
		});
		self.commit(reaction)
	}

	fn with_game<F>(&self, conn: ConnectionId, code: &LobbyCode, f: F) -> Reaction
	where
		F: FnOnce(&mut GameSession, Seat) -> Result<Vec<GameEvent>, GameError>,
	{
		self.with_lobby(conn, code, |lobby| {
			if !lobby.is_member(conn) {
				return Err(LobbyError::NotInLobby);
			}
			let game = lobby.game_mut().ok_or(LobbyError::GameNotStarted)?;
			let seat = game.seat_of(conn).ok_or(LobbyError::NotInLobby)?;
			let events = f(game, seat)?;

			let mut reaction = Reaction::default();
			self.publish(lobby, &events, &mut reaction);
			Ok(reaction)
		})
	}

	/// Sends each human their own view of the game after `events`, then
	/// schedules whatever the events set in motion.
	fn publish(&self, lobby: &Lobby, events: &[GameEvent], reaction: &mut Reaction) {
		let Some(game) = lobby.game() else {
			return;
		};
		let code = lobby.code();

		for event in events {
			logging::game::event(code.as_str(), &event.description());
			if let GameEvent::GameWon { seat } = event {
				let name = game.seats().get(seat.0).map(|s| s.name.as_str()).unwrap_or_default();
				logging::game::won(code.as_str(), seat.0, name);
			}
		}

		for conn in lobby.connections() {
			let state = game.view_for(game.seat_of(conn));
			reaction.send(conn, ServerMessage::GameUpdated { events: events.to_vec(), state });
		}

		let turn_moved = events.iter().any(|e| matches!(e, GameEvent::TurnChanged { .. }));
		self.schedule(code, game, events, turn_moved, reaction);
	}

	fn schedule(
		&self,
		code: &LobbyCode,
		game: &GameSession,
		events: &[GameEvent],
		turn_moved: bool,
		reaction: &mut Reaction,
	) {
		if game.is_over() {
			return;
		}
		let mut rng = lock_mutex(&self.rng);
		let mut timer = |delay: Duration, kind: TimerKind| {
			reaction.timers.push(Timer { code: code.clone(), delay, kind });
		};

		let pending = game.pending_uno();
		let mut turn_due = turn_moved;
		for event in events {
			match *event {
				GameEvent::UnoExposed { seat } => {
					let Some(p) = pending.filter(|p| p.target == seat && p.mode == UnoMode::Call) else {
						continue;
					};
					timer(self.config.uno_grace(), TimerKind::UnoGraceExpired { token: p.token });
					if game.is_ai(seat) {
						let delay = self.config.ai_call_delay_ms.sample(&mut *rng);
						timer(delay, TimerKind::AiCallUno { seat, token: p.token });
					}
				}
				GameEvent::UnoCatchOpened { seat: target } => {
					let Some(p) = pending.filter(|p| p.target == target && p.mode == UnoMode::Catch) else {
						continue;
					};
					for catcher in (0..game.seat_count()).map(Seat).filter(|&s| s != target && game.is_ai(s)) {
						let delay = self.config.ai_catch_delay_ms.sample(&mut *rng);
						timer(delay, TimerKind::AiCatchUno { seat: catcher, token: p.token });
					}
				}
				GameEvent::SeatTakenOver { seat } => {
					if let Some(p) = pending {
						if p.target == seat && p.mode == UnoMode::Call {
							let delay = self.config.ai_call_delay_ms.sample(&mut *rng);
							timer(delay, TimerKind::AiCallUno { seat, token: p.token });
						} else if p.target != seat && p.mode == UnoMode::Catch {
							let delay = self.config.ai_catch_delay_ms.sample(&mut *rng);
							timer(delay, TimerKind::AiCatchUno { seat, token: p.token });
						}
					}
					turn_due |= game.current_seat() == seat;
				}
				_ => {}
			}
		}

		let current = game.current_seat();
		if turn_due && game.is_ai(current) {
			let delay = self.config.ai_turn_delay_ms.sample(&mut *rng);
			timer(delay, TimerKind::AiTurn { seat: current, serial: game.turn_serial() });
		}
	}
}

fn lobby_updated(lobby: &Lobby) -> Reaction {
	let mut reaction = Reaction::default();
	reaction.broadcast(&lobby.connections(), &ServerMessage::LobbyUpdated(lobby.snapshot()));
	reaction
}

fn pending_matches(game: &GameSession, seat: Seat, token: u64, mode: UnoMode) -> bool {
	game.pending_uno()
		.is_some_and(|p| p.target == seat && p.token == token && p.mode == mode)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::DelayRange;

	const ALICE: ConnectionId = ConnectionId(1);
	const BOB: ConnectionId = ConnectionId(2);
	const CAROL: ConnectionId = ConnectionId(3);

	fn manager() -> LobbyManager {
		let config = ServerConfig {
			seed: Some(11),
			ai_turn_delay_ms: DelayRange::new(10, 10),
			ai_call_delay_ms: DelayRange::new(5, 5),
			ai_catch_delay_ms: DelayRange::new(20, 20),
			..ServerConfig::default()
		};
		LobbyManager::new(config)
	}

	fn errors(reaction: &Reaction, conn: ConnectionId) -> Vec<String> {
		reaction
			.messages_for(conn)
			.filter_map(|m| match m {
				ServerMessage::Error { error } | ServerMessage::JoinError { error } => Some(error.clone()),
				_ => None,
			})
			.collect()
	}

	#[test]
	fn test_create_registers_lobby() {
		let manager = manager();
		let (code, reaction) = manager.create_lobby(ALICE, "Alice", None);

		assert_eq!(manager.lobby_count(), 1);
		match reaction.messages_for(ALICE).next() {
			Some(ServerMessage::LobbyCreated(snapshot)) => {
				assert_eq!(snapshot.code, code);
				assert_eq!(snapshot.host_id, Some(ALICE));
			}
			other => panic!("unexpected: {:?}", other),
		}
	}

	#[test]
	fn test_codes_are_unique() {
		let manager = manager();
		for i in 0..200 {
			manager.create_lobby(ConnectionId(i), "P", None);
		}
		assert_eq!(manager.lobby_count(), 200);
	}

	#[test]
	fn test_join_unknown_lobby_is_join_error() {
		let manager = manager();
		let reaction = manager.join_lobby(BOB, &LobbyCode::new("ZZZZZZ"), "Bob", None);
		assert_eq!(
			reaction.messages_for(BOB).next(),
			Some(&ServerMessage::JoinError { error: "Lobby not found".into() })
		);
	}

	#[test]
	fn test_join_notifies_room() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		let reaction = manager.join_lobby(BOB, &code, "Bob", None);

		assert!(matches!(reaction.messages_for(BOB).next(), Some(ServerMessage::LobbyJoined(_))));
		assert!(reaction.messages_for(ALICE).any(|m| matches!(m, ServerMessage::LobbyUpdated(s) if s.players.len() == 2)));
	}

	#[test]
	fn test_errors_go_to_requester_only() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.join_lobby(BOB, &code, "Bob", None);

		let reaction = manager.add_ai(BOB, &code);
		assert_eq!(errors(&reaction, BOB), vec!["Only host can add AI players"]);
		assert_eq!(reaction.messages_for(ALICE).count(), 0);
	}

	#[test]
	fn test_toggle_ready_unknown_is_silent() {
		let manager = manager();
		assert!(manager.toggle_ready(ALICE, &LobbyCode::new("NOPE00")).is_empty());
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		assert!(manager.toggle_ready(CAROL, &code).is_empty());
	}

	#[test]
	fn test_last_leaver_closes_lobby() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.join_lobby(BOB, &code, "Bob", None);

		let reaction = manager.leave_lobby(ALICE, &code);
		assert!(reaction.messages_for(BOB).any(|m| *m == ServerMessage::PlayerLeft { player_id: ALICE }));
		assert_eq!(manager.inspect(&code, |l| l.host()), Some(Some(BOB)));

		manager.disconnect(BOB);
		assert_eq!(manager.lobby_count(), 0);
		assert!(manager.inspect(&code, |_| ()).is_none());
	}

	#[test]
	fn test_disconnect_leaves_every_lobby() {
		let manager = manager();
		let (first, _) = manager.create_lobby(ALICE, "Alice", None);
		let (second, _) = manager.create_lobby(BOB, "Bob", None);
		manager.join_lobby(ALICE, &second, "Alice", None);

		manager.disconnect(ALICE);
		assert!(manager.inspect(&first, |_| ()).is_none());
		assert_eq!(manager.inspect(&second, |l| l.players().len()), Some(1));
	}

	#[test]
	fn test_start_sends_each_player_their_hand() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.join_lobby(BOB, &code, "Bob", None);
		manager.toggle_ready(BOB, &code);

		let reaction = manager.start_game(ALICE, &code);
		for (conn, seat) in [(ALICE, Seat(0)), (BOB, Seat(1))] {
			match reaction.messages_for(conn).next() {
				Some(ServerMessage::GameStarted(snapshot)) => {
					let view = snapshot.game_state.as_ref().unwrap();
					assert_eq!(view.viewer, Some(seat));
					assert_eq!(view.hand.len(), 7);
				}
				other => panic!("unexpected: {:?}", other),
			}
		}
		assert!(reaction.timers.is_empty());
	}

	#[test]
	fn test_lobby_with_only_ai_left_closes() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.add_ai(ALICE, &code);
		manager.leave_lobby(ALICE, &code);
		assert_eq!(manager.lobby_count(), 0);
	}

	#[test]
	fn test_takeover_of_current_seat_schedules_ai_turn() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.join_lobby(BOB, &code, "Bob", None);
		manager.toggle_ready(BOB, &code);
		manager.start_game(ALICE, &code);

		let reaction = manager.leave_lobby(ALICE, &code);
		assert!(reaction.timers.iter().any(|t| t.kind == TimerKind::AiTurn { seat: Seat(0), serial: 0 }));
		assert!(reaction.messages_for(BOB).any(|m| matches!(
			m,
			ServerMessage::GameUpdated { events, .. } if events == &vec![GameEvent::SeatTakenOver { seat: Seat(0) }]
		)));
	}

	#[test]
	fn test_game_action_relays_to_others() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.join_lobby(BOB, &code, "Bob", None);

		let action = serde_json::json!("wave");
		assert!(manager.game_action(ALICE, &code, action.clone(), Value::Null).is_empty());

		manager.toggle_ready(BOB, &code);
		manager.start_game(ALICE, &code);
		let reaction = manager.game_action(ALICE, &code, action.clone(), Value::Null);
		assert_eq!(reaction.messages_for(ALICE).count(), 0);
		assert_eq!(
			reaction.messages_for(BOB).next(),
			Some(&ServerMessage::GameAction { action, data: Value::Null, player_id: ALICE })
		);
		assert!(manager.game_action(CAROL, &code, Value::Null, Value::Null).is_empty());
	}

	#[test]
	fn test_game_moves_need_a_started_game() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		let reaction = manager.draw_card(ALICE, &code);
		assert_eq!(errors(&reaction, ALICE), vec!["Game has not started"]);

		let reaction = manager.call_uno(BOB, &code);
		assert_eq!(errors(&reaction, BOB), vec!["You are not in this lobby"]);
	}

	#[derive(Default)]
	struct RecordingSink(Mutex<Vec<Delivery>>);

	impl MessageSink for RecordingSink {
		fn send(&self, delivery: Delivery) {
			lock_mutex(&self.0).push(delivery);
		}
	}

	#[test]
	fn test_sink_receives_deliveries_before_return() {
		let sink = Arc::new(RecordingSink::default());
		let mut manager = manager();
		manager.set_sink(sink.clone());

		let (code, reaction) = manager.create_lobby(ALICE, "Alice", None);
		assert!(reaction.deliveries.is_empty());
		let reaction = manager.join_lobby(BOB, &code, "Bob", None);
		assert!(reaction.deliveries.is_empty());

		let sent: Vec<ConnectionId> = lock_mutex(&sink.0).iter().map(|d| d.to).collect();
		assert_eq!(sent, vec![ALICE, BOB, ALICE, BOB]);
	}

	#[test]
	fn test_remove_unknown_ai_still_answers() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.add_ai(ALICE, &code);

		let reaction = manager.remove_ai(ALICE, &code, "ai-42");
		assert!(reaction.messages_for(ALICE).any(|m| matches!(m, ServerMessage::LobbyUpdated(s) if s.ai_players.len() == 1)));
	}

	#[test]
	fn test_stale_timers_are_ignored() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.add_ai(ALICE, &code);
		manager.start_game(ALICE, &code);

		assert!(manager.fire_timer(&code, TimerKind::UnoGraceExpired { token: 99 }).is_empty());
		assert!(manager.fire_timer(&code, TimerKind::AiTurn { seat: Seat(1), serial: 0 }).is_empty());
		assert!(manager.fire_timer(&LobbyCode::new("GONE00"), TimerKind::AiTurn { seat: Seat(0), serial: 0 }).is_empty());
	}

	#[test]
	fn test_ai_turn_timer_moves_the_game() {
		let manager = manager();
		let (code, _) = manager.create_lobby(ALICE, "Alice", None);
		manager.add_ai(ALICE, &code);
		manager.start_game(ALICE, &code);

		let reaction = manager.draw_card(ALICE, &code);
		let timer = reaction
			.timers
			.iter()
			.find(|t| matches!(t.kind, TimerKind::AiTurn { .. }))
			.cloned()
			.unwrap();
		assert_eq!(timer.delay, Duration::from_millis(10));

		let serial = manager.inspect(&code, |l| l.game().unwrap().turn_serial()).unwrap();
		let reaction = manager.fire_timer(&code, timer.kind);
		assert!(reaction.messages_for(ALICE).any(|m| matches!(m, ServerMessage::GameUpdated { .. })));
		let after = manager.inspect(&code, |l| l.game().unwrap().turn_serial()).unwrap();
		assert!(after > serial);

		// The same timer a second time is stale.
		assert!(manager.fire_timer(&code, timer.kind).is_empty());
	}
}
