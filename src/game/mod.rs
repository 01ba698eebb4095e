mod error;
mod session;

pub use error::{GameError, MoveViolation};
pub use session::{Controller, GameSession, PendingUno, Rules, SeatInfo, STARTING_HAND};
