mod types;

pub use types::{
	ConnectionId, DrawReason, GameEvent, GameView, Phase, PendingUnoView, Seat, SeatView, UnoMode,
};
