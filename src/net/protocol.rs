use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::card::{CardId, Color};
use crate::events::{ConnectionId, GameEvent, GameView};
use crate::lobby::{LobbyCode, LobbySnapshot};

/// Frames above this size close the connection.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("frame of {0} bytes exceeds the size limit")]
	FrameTooLarge(usize),
	#[error("invalid message: {0}")]
	Json(#[from] serde_json::Error),
	#[error("connection error: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
	CreateLobby {
		player_name: String,
		#[serde(default)]
		password: Option<String>,
	},
	JoinLobby {
		code: LobbyCode,
		player_name: String,
		#[serde(default)]
		password: Option<String>,
	},
	AddAi {
		code: LobbyCode,
	},
	RemoveAi {
		code: LobbyCode,
		ai_id: String,
	},
	ToggleReady {
		code: LobbyCode,
	},
	StartGame {
		code: LobbyCode,
	},
	/// Relayed to the rest of the room untouched.
	GameAction {
		code: LobbyCode,
		action: Value,
		#[serde(default)]
		data: Value,
	},
	LeaveLobby {
		code: LobbyCode,
	},
	PlayCard {
		code: LobbyCode,
		card_id: CardId,
		#[serde(default)]
		chosen_color: Option<Color>,
	},
	DrawCard {
		code: LobbyCode,
	},
	PassTurn {
		code: LobbyCode,
	},
	CallUno {
		code: LobbyCode,
	},
	CatchUno {
		code: LobbyCode,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
	Welcome {
		connection_id: ConnectionId,
	},
	LobbyCreated(LobbySnapshot),
	LobbyJoined(LobbySnapshot),
	JoinError {
		error: String,
	},
	Error {
		error: String,
	},
	LobbyUpdated(LobbySnapshot),
	PlayerLeft {
		player_id: ConnectionId,
	},
	GameStarted(LobbySnapshot),
	GameAction {
		action: Value,
		data: Value,
		player_id: ConnectionId,
	},
	GameUpdated {
		events: Vec<GameEvent>,
		state: GameView,
	},
}

pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
	let json = serde_json::to_vec(msg)?;
	if json.len() > MAX_FRAME_LEN {
		return Err(ProtocolError::FrameTooLarge(json.len()));
	}
	let len = json.len() as u32;
	let mut buf = len.to_be_bytes().to_vec();
	buf.extend(json);
	Ok(buf)
}

pub fn decode_length(buf: &[u8]) -> Option<u32> {
	if buf.len() < 4 {
		return None;
	}
	Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Pops one complete frame off the front of `buf`. `Ok(None)` means more
/// bytes are needed. A frame with bad JSON is consumed before the error is
/// returned, so the stream stays in sync.
pub fn try_decode_message<T: DeserializeOwned>(buf: &mut Vec<u8>) -> Result<Option<T>, ProtocolError> {
	let Some(len) = decode_length(buf) else {
		return Ok(None);
	};
	let len = len as usize;
	if len > MAX_FRAME_LEN {
		return Err(ProtocolError::FrameTooLarge(len));
	}
	if buf.len() < 4 + len {
		return Ok(None);
	}
	let frame: Vec<u8> = buf.drain(..4 + len).skip(4).collect();
	Ok(Some(serde_json::from_slice(&frame)?))
}
