use std::fmt;

use thiserror::Error;

/// Why a play was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveViolation {
	NotYourTurn,
	CardNotInHand,
	DoesNotMatch,
	ColorRequired,
}

impl fmt::Display for MoveViolation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self {
			MoveViolation::NotYourTurn => "it is not your turn",
			MoveViolation::CardNotInHand => "that card is not in your hand",
			MoveViolation::DoesNotMatch => "cannot play that card",
			MoveViolation::ColorRequired => "a wild card needs a chosen color",
		};
		f.write_str(reason)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
	#[error("Illegal move: {0}")]
	IllegalMove(MoveViolation),
	#[error("No more cards to draw")]
	NoCardsToDraw,
	#[error("Cannot pass while cards remain to draw")]
	CannotPass,
	#[error("Nobody needs to call UNO")]
	UnoNotPending,
	#[error("Too late to call UNO")]
	UnoTooLate,
	#[error("Too early to catch, UNO can still be called")]
	UnoTooEarly,
	#[error("Cannot catch yourself")]
	CannotCatchSelf,
	#[error("Game is over")]
	GameOver,
	#[error("Unknown seat")]
	UnknownSeat,
	#[error("Not enough cards to deal")]
	NotEnoughCards,
}
