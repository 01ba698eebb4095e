use std::fmt;

use thiserror::Error;

use crate::game::GameError;

/// Lobby operations only the host may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
	AddAi,
	RemoveAi,
	StartGame,
}

impl fmt::Display for HostAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HostAction::AddAi => write!(f, "add AI players"),
			HostAction::RemoveAi => write!(f, "remove AI players"),
			HostAction::StartGame => write!(f, "start the game"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LobbyError {
	#[error("Lobby not found")]
	NotFound,
	#[error("Only host can {0}")]
	Unauthorized(HostAction),
	#[error("Lobby is full")]
	LobbyFull,
	#[error("Game already started")]
	GameAlreadyStarted,
	#[error("Incorrect password")]
	WrongPassword,
	#[error("Need at least 2 players to start")]
	NotEnoughPlayers,
	#[error("All players must be ready")]
	NotAllReady,
	#[error("Game has not started")]
	GameNotStarted,
	#[error("You are not in this lobby")]
	NotInLobby,
	#[error(transparent)]
	Game(#[from] GameError),
}
