mod error;
mod manager;

pub use error::{HostAction, LobbyError};
pub use manager::{Delivery, LobbyManager, MessageSink, Reaction, Timer, TimerKind};

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::card::Deck;
use crate::events::{ConnectionId, GameEvent, GameView};
use crate::game::{GameSession, Rules, SeatInfo};

pub const CODE_LENGTH: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A poisoned lobby is still usable; every mutation validates before it writes.
pub(crate) fn lock_mutex<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Six uppercase alphanumerics. Codes typed by players are normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LobbyCode(String);

impl LobbyCode {
	pub fn new(code: &str) -> Self {
		Self(code.trim().to_ascii_uppercase())
	}

	pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
		let code = (0..CODE_LENGTH)
			.map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
			.collect();
		Self(code)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for LobbyCode {
	fn from(code: String) -> Self {
		Self::new(&code)
	}
}

impl From<LobbyCode> for String {
	fn from(code: LobbyCode) -> Self {
		code.0
	}
}

impl fmt::Display for LobbyCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
	pub id: ConnectionId,
	pub name: String,
	pub is_ready: bool,
	pub is_host: bool,
}

/// Computer seat; always ready, never host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPlayer {
	pub id: String,
	pub name: String,
}

/// Wire form of a lobby. The password itself never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySnapshot {
	pub code: LobbyCode,
	pub host_id: Option<ConnectionId>,
	pub has_password: bool,
	pub players: Vec<Player>,
	pub ai_players: Vec<AiPlayer>,
	pub max_players: usize,
	pub game_started: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub game_state: Option<GameView>,
}

/// What happened when a player left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Departure {
	pub new_host: Option<ConnectionId>,
	pub events: Vec<GameEvent>,
}

#[derive(Debug)]
pub struct Lobby {
	code: LobbyCode,
	password: Option<String>,
	players: Vec<Player>,
	ai_players: Vec<AiPlayer>,
	max_players: usize,
	next_ai_id: u64,
	game: Option<GameSession>,
}

impl Lobby {
	pub fn new(
		code: LobbyCode,
		host: ConnectionId,
		host_name: &str,
		password: Option<String>,
		max_players: usize,
	) -> Self {
		Self {
			code,
			password: password.filter(|p| !p.is_empty()),
			players: vec![Player {
				id: host,
				name: host_name.to_string(),
				is_ready: false,
				is_host: true,
			}],
			ai_players: Vec::new(),
			max_players,
			next_ai_id: 0,
			game: None,
		}
	}

	pub fn code(&self) -> &LobbyCode {
		&self.code
	}

	pub fn host(&self) -> Option<ConnectionId> {
		self.players.iter().find(|p| p.is_host).map(|p| p.id)
	}

	pub fn is_member(&self, connection: ConnectionId) -> bool {
		self.players.iter().any(|p| p.id == connection)
	}

	pub fn players(&self) -> &[Player] {
		&self.players
	}

	pub fn ai_players(&self) -> &[AiPlayer] {
		&self.ai_players
	}

	pub fn seat_count(&self) -> usize {
		self.players.len() + self.ai_players.len()
	}

	pub fn is_full(&self) -> bool {
		self.seat_count() >= self.max_players
	}

	/// No humans left; the lobby is about to be dropped from the registry.
	pub fn is_empty(&self) -> bool {
		self.players.is_empty()
	}

	pub fn game_started(&self) -> bool {
		self.game.is_some()
	}

	pub fn game(&self) -> Option<&GameSession> {
		self.game.as_ref()
	}

	pub fn game_mut(&mut self) -> Option<&mut GameSession> {
		self.game.as_mut()
	}

	pub fn connections(&self) -> Vec<ConnectionId> {
		self.players.iter().map(|p| p.id).collect()
	}

	/// Joining a lobby you are already in is a no-op.
	pub fn join(
		&mut self,
		connection: ConnectionId,
		name: &str,
		password: Option<&str>,
	) -> Result<(), LobbyError> {
		if self.is_member(connection) {
			return Ok(());
		}
		if let Some(expected) = &self.password {
			if password != Some(expected.as_str()) {
				return Err(LobbyError::WrongPassword);
			}
		}
		if self.is_full() {
			return Err(LobbyError::LobbyFull);
		}
		if self.game_started() {
			return Err(LobbyError::GameAlreadyStarted);
		}

		self.players.push(Player {
			id: connection,
			name: name.to_string(),
			is_ready: false,
			is_host: false,
		});
		Ok(())
	}

	pub fn add_ai(&mut self, requester: ConnectionId) -> Result<&AiPlayer, LobbyError> {
		self.ensure_host(requester, HostAction::AddAi)?;
		if self.game_started() {
			return Err(LobbyError::GameAlreadyStarted);
		}
		if self.is_full() {
			return Err(LobbyError::LobbyFull);
		}

		self.next_ai_id += 1;
		let ai = AiPlayer {
			id: format!("ai-{}", self.next_ai_id),
			name: ai_name(self.ai_players.len()),
		};
		self.ai_players.push(ai);
		Ok(&self.ai_players[self.ai_players.len() - 1])
	}

	/// Returns whether an AI seat was actually removed. Remaining seats are
	/// renamed so the numbering has no gaps.
	pub fn remove_ai(&mut self, requester: ConnectionId, ai_id: &str) -> Result<bool, LobbyError> {
		self.ensure_host(requester, HostAction::RemoveAi)?;
		if self.game_started() {
			return Err(LobbyError::GameAlreadyStarted);
		}

		let before = self.ai_players.len();
		self.ai_players.retain(|ai| ai.id != ai_id);
		if self.ai_players.len() == before {
			return Ok(false);
		}

		for (i, ai) in self.ai_players.iter_mut().enumerate() {
			ai.name = ai_name(i);
		}
		Ok(true)
	}

	/// Flips the flag for that player; false when they are not here.
	pub fn toggle_ready(&mut self, connection: ConnectionId) -> bool {
		match self.players.iter_mut().find(|p| p.id == connection) {
			Some(player) => {
				player.is_ready = !player.is_ready;
				true
			}
			None => false,
		}
	}

	/// Seats are humans in join order followed by AI seats in add order.
	pub fn start_game(&mut self, requester: ConnectionId, deck: Deck, rules: Rules) -> Result<(), LobbyError> {
		self.ensure_host(requester, HostAction::StartGame)?;
		if self.game_started() {
			return Err(LobbyError::GameAlreadyStarted);
		}
		if self.seat_count() < 2 {
			return Err(LobbyError::NotEnoughPlayers);
		}
		if self.players.len() > 1 && self.players.iter().any(|p| !p.is_host && !p.is_ready) {
			return Err(LobbyError::NotAllReady);
		}

		let seats = self.players
			.iter()
			.map(|p| SeatInfo::human(p.name.clone(), p.id))
			.chain(self.ai_players.iter().map(|ai| SeatInfo::ai(ai.name.clone())))
			.collect();
		self.game = Some(GameSession::deal(seats, deck, rules)?);
		Ok(())
	}

	/// Removes a human. The host role passes to the earliest remaining player
	/// and a seat in a running game is handed to the AI.
	pub fn remove_player(&mut self, connection: ConnectionId) -> Option<Departure> {
		let index = self.players.iter().position(|p| p.id == connection)?;
		let leaving = self.players.remove(index);

		let mut departure = Departure::default();
		if leaving.is_host {
			if let Some(next) = self.players.first_mut() {
				next.is_host = true;
				departure.new_host = Some(next.id);
			}
		}

		if let Some(game) = self.game.as_mut().filter(|g| !g.is_over()) {
			if let Some(seat) = game.seat_of(connection) {
				departure.events = game.take_over(seat).unwrap_or_default();
			}
		}
		Some(departure)
	}

	pub fn snapshot(&self) -> LobbySnapshot {
		LobbySnapshot {
			code: self.code.clone(),
			host_id: self.host(),
			has_password: self.password.is_some(),
			players: self.players.clone(),
			ai_players: self.ai_players.clone(),
			max_players: self.max_players,
			game_started: self.game_started(),
			game_state: None,
		}
	}

	/// Snapshot including the game as seen from that connection's seat.
	pub fn snapshot_for(&self, viewer: ConnectionId) -> LobbySnapshot {
		let mut snapshot = self.snapshot();
		snapshot.game_state = self.view_for(viewer);
		snapshot
	}

	pub fn view_for(&self, viewer: ConnectionId) -> Option<GameView> {
		self.game.as_ref().map(|g| g.view_for(g.seat_of(viewer)))
	}

	fn ensure_host(&self, requester: ConnectionId, action: HostAction) -> Result<(), LobbyError> {
		if self.host() == Some(requester) {
			Ok(())
		} else {
			Err(LobbyError::Unauthorized(action))
		}
	}
}

fn ai_name(index: usize) -> String {
	format!("AI Player {}", index + 1)
}
