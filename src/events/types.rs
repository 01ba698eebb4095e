use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::{Card, Color};
use crate::turn::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seat(pub usize);

impl fmt::Display for Seat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Transport-level identity of a connected client; doubles as the player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "conn-{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
	Dealt,
	InProgress,
	Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnoMode {
	Call,
	Catch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrawReason {
	Voluntary,
	DrawTwo,
	WildDrawFour,
	UnoPenalty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
	CardPlayed {
		seat: Seat,
		card: Card,
		active_color: Color,
	},
	CardsDrawn {
		seat: Seat,
		count: usize,
		reason: DrawReason,
	},
	TurnPassed {
		seat: Seat,
	},
	DirectionChanged {
		direction: Direction,
	},
	TurnChanged {
		seat: Seat,
		skipped: Option<Seat>,
	},
	UnoExposed {
		seat: Seat,
	},
	UnoCalled {
		seat: Seat,
	},
	UnoCatchOpened {
		seat: Seat,
	},
	UnoCaught {
		target: Seat,
		catcher: Seat,
	},
	SeatTakenOver {
		seat: Seat,
	},
	GameWon {
		seat: Seat,
	},
}

impl GameEvent {
	pub fn description(&self) -> String {
		match self {
			GameEvent::CardPlayed { seat, card, active_color } => {
				if card.is_wild() {
					format!("seat {} plays {} and names {}", seat, card, active_color)
				} else {
					format!("seat {} plays {}", seat, card)
				}
			}
			GameEvent::CardsDrawn { seat, count, reason } => match reason {
				DrawReason::Voluntary => format!("seat {} draws {}", seat, count),
				DrawReason::DrawTwo | DrawReason::WildDrawFour => {
					format!("seat {} is forced to draw {}", seat, count)
				}
				DrawReason::UnoPenalty => format!("seat {} draws {} as UNO penalty", seat, count),
			},
			GameEvent::TurnPassed { seat } => format!("seat {} passes", seat),
			GameEvent::DirectionChanged { direction } => format!("direction is now {}", i8::from(*direction)),
			GameEvent::TurnChanged { seat, skipped: Some(skipped) } => {
				format!("seat {} is skipped, seat {} to play", skipped, seat)
			}
			GameEvent::TurnChanged { seat, skipped: None } => format!("seat {} to play", seat),
			GameEvent::UnoExposed { seat } => format!("seat {} is down to one card", seat),
			GameEvent::UnoCalled { seat } => format!("seat {} calls UNO", seat),
			GameEvent::UnoCatchOpened { seat } => format!("seat {} can be caught", seat),
			GameEvent::UnoCaught { target, catcher } => format!("seat {} catches seat {}", catcher, target),
			GameEvent::SeatTakenOver { seat } => format!("seat {} is now played by the house AI", seat),
			GameEvent::GameWon { seat } => format!("seat {} wins", seat),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
	pub seat: Seat,
	pub name: String,
	pub card_count: usize,
	pub is_ai: bool,
	pub uno_called: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUnoView {
	pub target: Seat,
	pub mode: UnoMode,
}

/// What one seat is allowed to see of a game; other hands are counts only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
	pub viewer: Option<Seat>,
	pub hand: Vec<Card>,
	pub seats: Vec<SeatView>,
	pub top_card: Card,
	pub active_color: Color,
	pub direction: Direction,
	pub current_seat: Seat,
	pub deck_count: usize,
	pub discard_count: usize,
	pub pending_uno: Option<PendingUnoView>,
	pub phase: Phase,
	pub winner: Option<Seat>,
}
